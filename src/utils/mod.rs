//! Date-window utilities shared by the measurement readers.

pub mod window;

pub use window::{day_window, month_range, year_window};
