//! Core types and utilities for the ecosim predator-prey simulation.

pub mod config;
pub mod error;
pub mod stats;
pub mod types;

pub use config::*;
pub use error::{Error, Result};
pub use stats::EcosystemStats;
pub use types::*;
