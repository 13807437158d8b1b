//! Fakes and fixtures shared by unit and integration tests

pub mod fakes;
pub mod fixtures;

pub use fakes::*;
pub use fixtures::*;
