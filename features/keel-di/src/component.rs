use std::{
    any::TypeId,
    collections::HashMap,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    sync::{Arc, Mutex, OnceLock, PoisonError, Weak},
};

use tracing::debug;

use crate::{
    descriptor::LifecycleMethod,
    errors::RequireError,
    lifecycle::Phase,
    types::{DynError, Instance, TypeInfo},
};

/// Life-cycle state of a component, it only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Destroyed,
}

/// A resolved and instantiated unit of a container
///
/// Cheap to clone. Equality is identity: a component inherited by a child container
/// equals the parent's component, only [Component::is_local] differs.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
    local: bool,
}

pub(crate) struct ComponentInner {
    type_info: TypeInfo,
    instance: Instance,
    raw_instance: Instance,
    init_method: Option<LifecycleMethod>,
    teardown_method: Option<LifecycleMethod>,
    links: OnceLock<Links>,
    state: Mutex<LifecycleState>,
}

/// Weak reference to another component, as seen from the container that linked it
#[derive(Clone)]
pub(crate) struct Link {
    type_info: TypeInfo,
    inner: Weak<ComponentInner>,
    local: bool,
}

impl Link {
    pub(crate) fn to(component: &Component) -> Self {
        Link {
            type_info: component.inner.type_info,
            inner: Arc::downgrade(&component.inner),
            local: component.local,
        }
    }

    fn upgrade(&self) -> Option<Component> {
        self.inner.upgrade().map(|inner| Component {
            inner,
            local: self.local,
        })
    }
}

#[derive(Default)]
pub(crate) struct Links {
    pub dependencies: Vec<Link>,
    pub init_dependencies: Vec<Link>,
    pub teardown_dependencies: Vec<Link>,
    /// Parameters of the init method in declaration order, may point at the component itself
    pub init_args: Vec<Link>,
    pub teardown_args: Vec<Link>,
}

impl Component {
    pub(crate) fn new(
        type_info: TypeInfo,
        raw_instance: Instance,
        proxy: Option<Instance>,
        init_method: Option<LifecycleMethod>,
        teardown_method: Option<LifecycleMethod>,
    ) -> Self {
        Component {
            inner: Arc::new(ComponentInner {
                type_info,
                instance: proxy.unwrap_or_else(|| raw_instance.clone()),
                raw_instance,
                init_method,
                teardown_method,
                links: OnceLock::new(),
                state: Mutex::new(LifecycleState::Uninitialized),
            }),
            local: true,
        }
    }

    /// The same component as seen from a child container
    pub(crate) fn inherited(&self) -> Self {
        Component {
            inner: self.inner.clone(),
            local: false,
        }
    }

    /// Sets the dependency lists, a component is linked exactly once
    pub(crate) fn link(&self, links: Links) {
        let linked = self.inner.links.set(links);
        debug_assert!(linked.is_ok(), "'{}' was linked twice", self);
    }

    pub fn type_info(&self) -> TypeInfo {
        self.inner.type_info
    }

    /// The instance handed out by lookups, the proxy if the component was advised
    pub fn instance(&self) -> &Instance {
        &self.inner.instance
    }

    /// The constructed instance, life-cycle methods run against it
    pub fn raw_instance(&self) -> &Instance {
        &self.inner.raw_instance
    }

    pub fn is_proxied(&self) -> bool {
        !self.inner.instance.ptr_eq(&self.inner.raw_instance)
    }

    /// Whether the component was declared in the container it was obtained from
    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn init_method(&self) -> Option<&LifecycleMethod> {
        self.inner.init_method.as_ref()
    }

    pub fn teardown_method(&self) -> Option<&LifecycleMethod> {
        self.inner.teardown_method.as_ref()
    }

    /// Everything this component references through fields or life-cycle parameters
    pub fn dependencies(&self) -> Vec<Component> {
        self.linked(|links| &links.dependencies)
    }

    pub fn init_dependencies(&self) -> Vec<Component> {
        self.linked(|links| &links.init_dependencies)
    }

    pub fn teardown_dependencies(&self) -> Vec<Component> {
        self.linked(|links| &links.teardown_dependencies)
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == LifecycleState::Initialized
    }

    pub fn is_destroyed(&self) -> bool {
        self.state() == LifecycleState::Destroyed
    }

    fn linked(&self, select: impl Fn(&Links) -> &Vec<Link>) -> Vec<Component> {
        self.inner
            .links
            .get()
            .map(|links| select(links).iter().filter_map(Link::upgrade).collect())
            .unwrap_or_default()
    }

    /// Runs the method of `phase` and moves the state forward
    ///
    /// Returns `false` without running anything if the component is not in the phase's source state.
    /// The state lock is held while the method runs.
    pub(crate) fn advance(&self, phase: Phase) -> Result<bool, DynError> {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *state != phase.source_state() {
            return Ok(false);
        }

        let method = match phase {
            Phase::PostConstruct => &self.inner.init_method,
            Phase::PreDestroy => &self.inner.teardown_method,
        };
        let arg_links: &[Link] = match (self.inner.links.get(), phase) {
            (Some(links), Phase::PostConstruct) => &links.init_args,
            (Some(links), Phase::PreDestroy) => &links.teardown_args,
            (None, _) => &[],
        };

        if let Some(method) = method {
            let args = arg_links
                .iter()
                .map(|link| {
                    link.upgrade()
                        .map(|component| component.instance().clone())
                        .ok_or(RequireError::TypeMissing(link.type_info.type_name))
                })
                .collect::<Result<Vec<_>, _>>()?;

            method.invoke(&self.inner.raw_instance, &args)?;
            debug!("{} '{}' ran '{}'", phase, self, method.name);
        }

        *state = phase.target_state();
        Ok(true)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl Eq for Component {}

impl Hash for Component {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("type", &self.inner.type_info.type_name)
            .field("local", &self.local)
            .field("proxied", &self.is_proxied())
            .field("state", &self.state())
            .finish()
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.inner.type_info.type_name)
    }
}

/// Components in declaration order, keyed by their type
#[derive(Clone, Default)]
pub struct ComponentTable {
    components: Vec<Component>,
    index: HashMap<TypeId, usize>,
}

impl ComponentTable {
    /// Adds a component, keeping the existing one if the type is already present
    pub(crate) fn insert(&mut self, component: Component) -> bool {
        let type_id = component.type_info().type_id;
        if self.index.contains_key(&type_id) {
            return false;
        }
        self.index.insert(type_id, self.components.len());
        self.components.push(component);
        true
    }

    /// Component registered exactly under `type_info`
    pub fn get(&self, type_info: &TypeInfo) -> Option<&Component> {
        self.index
            .get(&type_info.type_id)
            .map(|index| &self.components[*index])
    }

    /// Exact key, otherwise the first component whose instance can be seen as `type_info`
    pub fn lookup(&self, type_info: &TypeInfo) -> Option<&Component> {
        self.get(type_info).or_else(|| {
            self.components
                .iter()
                .find(|component| component.instance().provides(type_info))
        })
    }

    pub fn contains(&self, type_info: &TypeInfo) -> bool {
        self.index.contains_key(&type_info.type_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    pub fn as_slice(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Debug for ComponentTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.components.iter()).finish()
    }
}

impl FromIterator<Component> for ComponentTable {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        let mut table = ComponentTable::default();
        for component in iter {
            table.insert(component);
        }
        table
    }
}

impl<'a> IntoIterator for &'a ComponentTable {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}
