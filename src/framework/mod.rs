//! A framework that loops transactions until the max retry times is reached, a transaction is cancelled, or a value is returned.

#![cfg(feature = "framework")]

mod state;

pub use state::*;
