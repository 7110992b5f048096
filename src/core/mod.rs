pub mod classify;
pub mod ndef;
pub mod ops;
pub mod runner;
pub mod utils;
