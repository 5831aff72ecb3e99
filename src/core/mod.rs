//! Core modules shared by the builder and the verifier.
//!
//! History providers, the town's cast and calendar, the per-run session and
//! the ambient pieces (errors, config, embedded assets, output).

pub mod address;
pub mod assets;
pub mod calendar;
pub mod config;
pub mod error;
pub mod fillers;
pub mod git;
pub mod history;
pub mod memory;
pub mod output;
pub mod people;
