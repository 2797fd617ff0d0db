pub mod altitude;
pub mod error;
pub mod historic;
pub mod realtime;
pub mod source;
