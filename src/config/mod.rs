//! JSON configuration for the `bini` binary.

pub mod runtime;

pub use runtime::{load_config, OutputConfig, RuntimeConfig};
