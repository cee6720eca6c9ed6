//! Core value and identifier types

pub mod field;
pub mod identifiers;
pub mod time;

pub use field::Field;
pub use identifiers::{Address, Slot};
pub use time::{Delay, Timepoint};
