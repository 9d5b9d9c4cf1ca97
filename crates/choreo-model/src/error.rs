//! Binding errors.

use std::error::Error;
use std::fmt;

use choreo_core::ConfigError;
use choreo_schedule::RegistryError;

/// Errors from binding a component to a scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindError {
    /// Step settings, declarations or couplings are invalid.
    Config(ConfigError),
    /// A functor could not be registered.
    Registry(RegistryError),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "binding configuration: {e}"),
            Self::Registry(e) => write!(f, "registration: {e}"),
        }
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Registry(e) => Some(e),
        }
    }
}

impl From<ConfigError> for BindError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RegistryError> for BindError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}
