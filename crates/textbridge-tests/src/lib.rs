//! Integration test helpers: a mock bridge and a client wired to it.

pub mod harness;
