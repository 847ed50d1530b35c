use std::sync::Arc;

use crate::{
    aspect::{self, ProxyMaker, ProxyRegistry},
    container::Container,
    descriptor::{FieldSetter, Markers, Resolver, SlotFieldSetter},
    errors::BuildError,
    graph::GraphBuilder,
    registry::Registry,
    types::{Injectable, Instance, TypeInfo},
};

enum Declaration {
    Type(TypeInfo),
    Instance(Instance),
}

/// Collects declarations and collaborators, then builds a [Container]
///
/// # Building happens in order
/// 1. Parent components are inherited, the first parent providing a type wins
/// 2. Declared types are resolved and constructed together with their dependencies
/// 3. Dependency fields are wired
/// 4. Aspect handlers advise other local components, fields are rewired to the proxies
/// 5. Components are frozen, life-cycle dependencies are checked for cycles
pub struct ContainerBuilder {
    declarations: Vec<Declaration>,
    parents: Vec<Container>,
    markers: Markers,
    resolver: Arc<dyn Resolver>,
    field_setter: Arc<dyn FieldSetter>,
    proxy_maker: Arc<dyn ProxyMaker>,
}
impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        ContainerBuilder {
            declarations: Vec::new(),
            parents: Vec::new(),
            markers: Markers::default(),
            resolver: Arc::new(Registry::new()),
            field_setter: Arc::new(SlotFieldSetter),
            proxy_maker: Arc::new(ProxyRegistry::new()),
        }
    }
}

impl ContainerBuilder {
    /// Declares a component type
    pub fn component<T: Injectable>(self) -> Self {
        self.component_type(TypeInfo::of::<T>())
    }

    pub fn component_type(mut self, type_info: TypeInfo) -> Self {
        self.declarations.push(Declaration::Type(type_info));
        self
    }

    pub fn component_types(mut self, types: impl IntoIterator<Item = TypeInfo>) -> Self {
        self.declarations
            .extend(types.into_iter().map(Declaration::Type));
        self
    }

    /// Declares an already constructed component, it has no dependency fields or life-cycle methods
    pub fn instance<T: Injectable>(self, instance: T) -> Self {
        self.add_instance(Instance::new(instance))
    }

    /// Like [ContainerBuilder::instance], for instances with capabilities
    pub fn add_instance(mut self, instance: Instance) -> Self {
        self.declarations.push(Declaration::Instance(instance));
        self
    }

    /// Adds a parent container, adding the same container twice has no effect
    pub fn parent(mut self, parent: &Container) -> Self {
        if !self.parents.contains(parent) {
            self.parents.push(parent.clone());
        }
        self
    }

    pub fn parents<'a>(self, parents: impl IntoIterator<Item = &'a Container>) -> Self {
        parents
            .into_iter()
            .fold(self, |builder, parent| builder.parent(parent))
    }

    /// Adds a dependency field marker, `resource` is used if none is given
    pub fn dependency_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.dependency.insert(marker.into());
        self
    }

    /// Adds an init method marker, `post_construct` is used if none is given
    pub fn init_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.init.insert(marker.into());
        self
    }

    /// Adds a teardown method marker, `pre_destroy` is used if none is given
    pub fn teardown_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.teardown.insert(marker.into());
        self
    }

    pub fn resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn field_setter(mut self, field_setter: impl FieldSetter + 'static) -> Self {
        self.field_setter = Arc::new(field_setter);
        self
    }

    pub fn proxy_maker(mut self, proxy_maker: impl ProxyMaker + 'static) -> Self {
        self.proxy_maker = Arc::new(proxy_maker);
        self
    }

    pub fn build(self) -> Result<Container, BuildError> {
        let markers = self.markers.or_standard();

        let mut graph = GraphBuilder::new(self.resolver.as_ref(), &markers);
        graph.inherit(&self.parents);
        for declaration in self.declarations {
            match declaration {
                Declaration::Type(type_info) => graph.resolve(type_info)?,
                Declaration::Instance(instance) => graph.add_instance(instance),
            }
        }
        let mut graph = graph.finish();

        graph.wire_fields(self.field_setter.as_ref())?;
        aspect::weave(&mut graph, self.proxy_maker.as_ref())?;
        graph.rewire_proxied(self.field_setter.as_ref())?;

        Container::freeze(graph, self.parents)
    }
}
