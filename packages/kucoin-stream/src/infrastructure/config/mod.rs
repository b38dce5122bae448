//! Client configuration - credentials and options.

mod settings;

pub use settings::{ClientOptions, ConfigError, Credentials};
