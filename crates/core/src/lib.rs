#![forbid(unsafe_code)]

pub mod bank;
pub mod error;
pub mod model;
pub mod shuffle;
pub mod time;

pub use error::{BankError, Error};
pub use time::Clock;
