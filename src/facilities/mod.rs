//! Facility records: locations, the tanks at them and their permits

mod models;

pub use models::*;
