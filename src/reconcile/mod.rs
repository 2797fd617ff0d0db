pub mod error;
pub mod month;
pub mod span;
