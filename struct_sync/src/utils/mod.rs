//! Utilities for StructSync

pub mod logging;

pub use logging::init_logging;
