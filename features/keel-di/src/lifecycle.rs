use std::fmt::Display;

use tracing::{debug, error};

use crate::{
    component::{Component, ComponentTable, LifecycleState},
    cycle::{self, CycleError, DependencyNode},
    errors::{InitializeError, ShutdownError},
    types::DynError,
};

/// The two ordered life-cycle passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Initialization, runs init methods
    PostConstruct,
    /// Teardown, runs teardown methods
    PreDestroy,
}

impl Phase {
    /// State a component must be in to take part in this pass
    pub fn source_state(self) -> LifecycleState {
        match self {
            Phase::PostConstruct => LifecycleState::Uninitialized,
            Phase::PreDestroy => LifecycleState::Initialized,
        }
    }

    /// State a component ends up in after this pass
    pub fn target_state(self) -> LifecycleState {
        match self {
            Phase::PostConstruct => LifecycleState::Initialized,
            Phase::PreDestroy => LifecycleState::Destroyed,
        }
    }

    /// Components which have to finish this pass before `component`
    pub fn dependencies(self, component: &Component) -> Vec<Component> {
        match self {
            Phase::PostConstruct => component.init_dependencies(),
            Phase::PreDestroy => component.teardown_dependencies(),
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::PostConstruct => f.write_str("post-construct"),
            Phase::PreDestroy => f.write_str("pre-destroy"),
        }
    }
}

/// A component seen through the dependency edges of one phase
#[derive(Clone, PartialEq)]
struct PhaseNode {
    phase: Phase,
    component: Component,
}

impl Display for PhaseNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.component, f)
    }
}

impl DependencyNode for PhaseNode {
    fn dependencies(&self) -> Vec<Self> {
        self.phase
            .dependencies(&self.component)
            .into_iter()
            .map(|component| PhaseNode {
                phase: self.phase,
                component,
            })
            .collect()
    }
}

/// Checks the life-cycle method dependencies of `component` for cycles
pub(crate) fn check_cycles(phase: Phase, component: &Component) -> Result<(), CycleError> {
    cycle::check(&PhaseNode {
        phase,
        component: component.clone(),
    })
}

struct PassFailure {
    failed: Component,
    done: Vec<Component>,
    remaining: Vec<Component>,
    source: DynError,
}

/// Initializes all `local` components, dependencies first
pub(crate) fn initialize(local: &ComponentTable) -> Result<Vec<Component>, InitializeError> {
    run_pass(Phase::PostConstruct, local).map_err(|failure| InitializeError {
        failed: failure.failed,
        initialized: failure.done,
        uninitialized: failure.remaining,
        source: failure.source,
    })
}

/// Destroys all initialized `local` components, dependencies first
pub(crate) fn shutdown(local: &ComponentTable) -> Result<Vec<Component>, ShutdownError> {
    run_pass(Phase::PreDestroy, local).map_err(|failure| ShutdownError {
        failed: failure.failed,
        destroyed: failure.done,
        undestroyed: failure.remaining,
        source: failure.source,
    })
}

fn run_pass(phase: Phase, local: &ComponentTable) -> Result<Vec<Component>, PassFailure> {
    let mut done = Vec::new();

    for component in local {
        if let Err((failed, source)) = visit(phase, component, &mut done) {
            let remaining = local
                .iter()
                .filter(|component| component.state() == phase.source_state() && **component != failed)
                .cloned()
                .collect();

            return Err(PassFailure {
                failed,
                done,
                remaining,
                source,
            });
        }
    }

    debug!("{} pass finished for {} components", phase, done.len());
    Ok(done)
}

fn visit(
    phase: Phase,
    component: &Component,
    done: &mut Vec<Component>,
) -> Result<(), (Component, DynError)> {
    if component.state() != phase.source_state() {
        return Ok(());
    }

    for dependency in phase.dependencies(component) {
        visit(phase, &dependency, done)?;
    }

    match component.advance(phase) {
        Ok(true) => done.push(component.clone()),
        Ok(false) => {}
        Err(source) => {
            error!("{} of '{}' failed: {}", phase, component, source);
            return Err((component.clone(), source));
        }
    }
    Ok(())
}
