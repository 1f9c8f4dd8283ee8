//! Helpers shared by the provider crates.

pub mod time;
