use thiserror::Error;

use crate::{component::Component, cycle::CycleError, lifecycle::Phase, types::DynError};

/// Fatal errors while building a container
#[derive(Error, Debug)]
pub enum BuildError {
    /// The resolver could not describe a type
    #[error("Failed to resolve '{type_name}'")]
    Resolve {
        type_name: &'static str,
        #[source]
        source: DynError,
    },
    /// The constructor of a component failed
    #[error("Failed to construct '{type_name}'")]
    Construct {
        type_name: &'static str,
        #[source]
        source: DynError,
    },
    /// A dependency field points at a type no component provides
    #[error("Missing resource '{field_type}' for field '{owner}.{field}'")]
    MissingResource {
        owner: &'static str,
        field: &'static str,
        field_type: &'static str,
    },
    /// A life-cycle method parameter has a type no component provides
    #[error("Missing resource '{param}' for parameter of '{owner}::{method}'")]
    MissingParameter {
        owner: &'static str,
        method: &'static str,
        param: &'static str,
    },
    /// The component found for a life-cycle parameter can not be seen as its type,
    /// e.g. the concrete type of a proxied component
    #[error("Parameter '{param}' of '{owner}::{method}' is unavailable as '{actual}' exposes it")]
    ParameterUnavailable {
        owner: &'static str,
        method: &'static str,
        param: &'static str,
        actual: &'static str,
    },
    /// The field setter refused a value
    #[error("Failed to inject field '{owner}.{field}'")]
    Inject {
        owner: &'static str,
        field: &'static str,
        #[source]
        source: DynError,
    },
    /// The proxy maker failed for a type
    #[error("Failed to create proxy for '{type_name}'")]
    Proxy {
        type_name: &'static str,
        #[source]
        source: DynError,
    },
    /// Life-cycle methods depend on each other in a loop
    #[error("Circular {phase} dependency: {source}")]
    Cycle {
        phase: Phase,
        #[source]
        source: CycleError,
    },
}

/// Report of a failed initialization pass
///
/// `initialized` lists the components this pass initialized, in order.
/// `uninitialized` lists the local components still waiting, the failed one excluded.
#[derive(Error, Debug)]
#[error("Failed to initialize '{failed}': {source}")]
pub struct InitializeError {
    pub failed: Component,
    pub initialized: Vec<Component>,
    pub uninitialized: Vec<Component>,
    #[source]
    pub source: DynError,
}

/// Report of a failed teardown pass
#[derive(Error, Debug)]
#[error("Failed to destroy '{failed}': {source}")]
pub struct ShutdownError {
    pub failed: Component,
    pub destroyed: Vec<Component>,
    pub undestroyed: Vec<Component>,
    #[source]
    pub source: DynError,
}

/// Errors of the container life-cycle
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// `initialize` was already called on this container
    #[error("Container was already initialized")]
    AlreadyInitialized,
    /// `shutdown` called before `initialize`
    #[error("Container was not initialized")]
    NotInitialized,
    /// `shutdown` was already called on this container
    #[error("Container was already shut down")]
    AlreadyShutdown,
    #[error(transparent)]
    Initialize(#[from] InitializeError),
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Errors when trying to require a certain type
#[derive(Error, Debug, Clone)]
pub enum RequireError {
    /// No component provides the required type
    #[error("The required type '{0}' is not known.")]
    TypeMissing(&'static str),
    /// A component is registered for the type, but its instance can not be seen as it
    #[error("Component '{actual_type}' can not be seen as '{required_type}'")]
    ViewUnavailable {
        required_type: &'static str,
        actual_type: &'static str,
    },
}

/// Errors of the default field setter
#[derive(Error, Debug, Clone)]
pub enum InjectError {
    #[error("Field owner is '{actual}', expected '{expected}'")]
    OwnerMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Value '{actual}' can not be seen as '{expected}'")]
    ValueMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Life-cycle method called with unsuitable arguments
#[derive(Error, Debug, Clone)]
pub enum ArgumentError {
    #[error("Method receiver is '{actual}', expected '{expected}'")]
    Receiver {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Expected {expected} arguments, got {actual}")]
    Count { expected: usize, actual: usize },
    #[error("Argument {index} is '{actual}', expected '{expected}'")]
    Type {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors of the default proxy maker and of intercepted calls
#[derive(Error, Debug, Clone)]
pub enum AspectError {
    #[error("No proxy registered for '{0}'")]
    NoProxy(&'static str),
    #[error("Proxy target is '{actual}', expected '{expected}'")]
    TargetMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Aspect handler changed the result type of '{method}', expected '{expected}'")]
    ResultType {
        method: &'static str,
        expected: &'static str,
    },
}
