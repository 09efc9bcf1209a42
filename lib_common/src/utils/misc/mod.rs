/// General helper functions (timestamps, dates, rounding).
pub mod utils;
