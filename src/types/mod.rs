pub mod observation;
pub mod period;
pub mod station;
pub mod station_class;
