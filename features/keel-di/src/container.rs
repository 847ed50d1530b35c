use std::{
    any::type_name,
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::debug;

use crate::{
    builder::ContainerBuilder,
    component::{Component, ComponentTable, Link, Links},
    descriptor::LifecycleMethod,
    errors::{BuildError, LifecycleError, RequireError},
    graph::ResolutionGraph,
    lifecycle::{self, Phase},
    types::TypeInfo,
};

/// Life-cycle state of a container, it only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContainerState {
    Uninitialized,
    Initialized,
    Shutdown,
}

/// Container holding all resolved components
///
/// Cheap to clone, equality is identity.
#[derive(Clone)]
pub struct Container(Arc<ContainerInner>);
struct ContainerInner {
    /// Local and inherited, first seen wins
    components: ComponentTable,
    local: ComponentTable,
    parents: Vec<Container>,
    state: Mutex<ContainerState>,
    /// Serializes the passes, the state lock is released before life-cycle methods run
    pass: Mutex<()>,
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("Container");
        for component in &self.0.components {
            let origin = if component.is_local() {
                "local"
            } else {
                "inherited"
            };
            map.field(component.type_info().type_name, &origin);
        }
        map.finish()
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Container {}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Freezes the resolution graph into components and checks life-cycle cycles
    pub(crate) fn freeze(graph: ResolutionGraph, parents: Vec<Container>) -> Result<Self, BuildError> {
        let all: Vec<Component> = graph
            .records
            .iter()
            .map(|record| match (&record.inherited, &record.descriptor) {
                (Some(inherited), _) => inherited.clone(),
                (None, descriptor) => Component::new(
                    record.type_info,
                    record.instance.clone(),
                    record.proxy.clone(),
                    descriptor.as_ref().and_then(|d| d.init_method.clone()),
                    descriptor.as_ref().and_then(|d| d.teardown_method.clone()),
                ),
            })
            .collect();

        for (index, record) in graph.records.iter().enumerate() {
            let Some(descriptor) = &record.descriptor else {
                continue;
            };
            let owner = &record.type_info;

            let fields = descriptor
                .dependency_fields
                .iter()
                .map(|field| graph.require(&field.field_type, owner, field.name))
                .collect::<Result<Vec<_>, _>>()?;
            let init_params = param_indices(&graph, &all, owner, descriptor.init_method.as_ref())?;
            let teardown_params = param_indices(&graph, &all, owner, descriptor.teardown_method.as_ref())?;

            let all_dependencies = fields.iter().chain(&init_params).chain(&teardown_params);
            all[index].link(Links {
                dependencies: links_without(&all, index, all_dependencies),
                init_dependencies: links_without(&all, index, &init_params),
                teardown_dependencies: links_without(&all, index, &teardown_params),
                init_args: init_params.iter().map(|i| Link::to(&all[*i])).collect(),
                teardown_args: teardown_params.iter().map(|i| Link::to(&all[*i])).collect(),
            });
        }

        let local: ComponentTable = all.iter().filter(|c| c.is_local()).cloned().collect();
        for component in &local {
            for phase in [Phase::PostConstruct, Phase::PreDestroy] {
                lifecycle::check_cycles(phase, component)
                    .map_err(|source| BuildError::Cycle { phase, source })?;
            }
        }

        debug!(
            "Built container with {} components, {} local",
            all.len(),
            local.len()
        );
        Ok(Container(Arc::new(ContainerInner {
            components: all.into_iter().collect(),
            local,
            parents,
            state: Mutex::new(ContainerState::Uninitialized),
            pass: Mutex::new(()),
        })))
    }

    /// Runs the init methods of all local components, dependencies first
    ///
    /// Can only be called once, the container counts as initialized even if this fails.
    pub fn initialize(&self) -> Result<&Self, LifecycleError> {
        let _pass = self.lock_pass();
        {
            let mut state = self.lock_state();
            if *state != ContainerState::Uninitialized {
                return Err(LifecycleError::AlreadyInitialized);
            }
            *state = ContainerState::Initialized;
        }

        lifecycle::initialize(&self.0.local)?;
        Ok(self)
    }

    /// Runs the teardown methods of all initialized local components, dependencies first
    ///
    /// Can only be called once after [Container::initialize].
    pub fn shutdown(&self) -> Result<&Self, LifecycleError> {
        let _pass = self.lock_pass();
        {
            let mut state = self.lock_state();
            match *state {
                ContainerState::Uninitialized => return Err(LifecycleError::NotInitialized),
                ContainerState::Shutdown => return Err(LifecycleError::AlreadyShutdown),
                ContainerState::Initialized => *state = ContainerState::Shutdown,
            }
        }

        lifecycle::shutdown(&self.0.local)?;
        Ok(self)
    }

    pub fn state(&self) -> ContainerState {
        *self.lock_state()
    }

    pub fn is_initialized(&self) -> bool {
        self.state() >= ContainerState::Initialized
    }

    pub fn is_shutdown(&self) -> bool {
        self.state() == ContainerState::Shutdown
    }

    /// Component of exactly this type, otherwise the first one that can be seen as it
    pub fn get_component(&self, type_info: &TypeInfo) -> Option<Component> {
        self.0.components.lookup(type_info).cloned()
    }

    /// The (possibly proxied) object of the component found for `T`
    pub fn get_object<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.get_component(&TypeInfo::of::<T>())?
            .instance()
            .view::<T>()
    }

    /// Attempts to get the requested type
    pub fn require<T: ?Sized + 'static>(&self) -> Result<Arc<T>, RequireError> {
        let component = self
            .get_component(&TypeInfo::of::<T>())
            .ok_or(RequireError::TypeMissing(type_name::<T>()))?;
        component
            .instance()
            .view::<T>()
            .ok_or(RequireError::ViewUnavailable {
                required_type: type_name::<T>(),
                actual_type: component.instance().info.type_name,
            })
    }

    /// Inherited components in parent order, then local ones in declaration order
    pub fn components(&self) -> &ComponentTable {
        &self.0.components
    }

    pub fn local_components(&self) -> &ComponentTable {
        &self.0.local
    }

    /// The direct parents
    pub fn parent_containers(&self) -> &[Container] {
        &self.0.parents
    }

    fn lock_state(&self) -> MutexGuard<'_, ContainerState> {
        self.0.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pass(&self) -> MutexGuard<'_, ()> {
        self.0.pass.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Indices of the components passed to `method`, in parameter order
///
/// Each parameter has to be visible on the exposed instance, the proxy for advised components.
fn param_indices(
    graph: &ResolutionGraph,
    all: &[Component],
    owner: &TypeInfo,
    method: Option<&LifecycleMethod>,
) -> Result<Vec<usize>, BuildError> {
    let Some(method) = method else {
        return Ok(Vec::new());
    };
    method
        .params
        .iter()
        .map(|param| {
            let index = graph.lookup(param).ok_or(BuildError::MissingParameter {
                owner: owner.type_name,
                method: method.name,
                param: param.type_name,
            })?;
            let exposed = all[index].instance();
            if !exposed.provides(param) {
                return Err(BuildError::ParameterUnavailable {
                    owner: owner.type_name,
                    method: method.name,
                    param: param.type_name,
                    actual: exposed.info.type_name,
                });
            }
            Ok(index)
        })
        .collect()
}

/// Links to the given components, without duplicates and without `owner` itself
fn links_without<'a>(
    all: &[Component],
    owner: usize,
    indices: impl IntoIterator<Item = &'a usize>,
) -> Vec<Link> {
    let mut seen: Vec<usize> = Vec::new();
    for index in indices {
        if *index != owner && !seen.contains(index) {
            seen.push(*index);
        }
    }
    seen.into_iter().map(|index| Link::to(&all[index])).collect()
}
