pub mod lookup;
pub mod ports;
