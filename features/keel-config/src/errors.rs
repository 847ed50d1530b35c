use keel_di::{BuildError, LifecycleError, TypeInfo};

/// Errors of the config registry
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The required Config is not known
    #[error("The required Config type '{0}' is not known")]
    ConfigMissing(TypeInfo),
    /// The Config type is already registered
    #[error("The Config type '{0}' is already registered")]
    ConfigAlreadyRegistered(TypeInfo),
    /// The configs could not be turned into a container
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
