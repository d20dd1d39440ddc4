pub mod bbox;
pub mod overlap;
