pub mod datetime;
pub mod test_utils;

pub use datetime::*;
