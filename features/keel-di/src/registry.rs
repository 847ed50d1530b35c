use std::{any::TypeId, collections::HashMap, fmt::Debug, sync::Arc};

use crate::{
    descriptor::{markers, Constructor, DependencyField, Descriptor, LifecycleMethod, Markers, Resolver},
    inject::{Injected, MethodArgs},
    types::{Capabilities, DynError, Injectable, TypeInfo},
};

/// A component type the [Registry] can describe
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use keel_di::{Definition, Describe, DynError, Injected};
///
/// #[derive(Default)]
/// struct Database;
/// impl Describe for Database {
///     fn construct() -> Result<Self, DynError> {
///         Ok(Database)
///     }
/// }
///
/// #[derive(Default)]
/// struct Repository {
///     database: Injected<Database>,
/// }
/// impl Describe for Repository {
///     fn construct() -> Result<Self, DynError> {
///         Ok(Repository::default())
///     }
///
///     fn describe(def: &mut Definition<Self>) {
///         def.field("database", |this| &this.database)
///             .post_construct("open", |_, (db,): (Arc<Database>,)| {
///                 drop(db);
///                 Ok(())
///             });
///     }
/// }
/// ```
pub trait Describe: Injectable + Sized {
    /// Zero-argument constructor, dependency slots start out empty
    fn construct() -> Result<Self, DynError>;

    /// Declares dependency fields, life-cycle methods and capabilities
    fn describe(def: &mut Definition<Self>) {
        let _ = def;
    }
}

/// Declarations of a single type, each tagged with its marker
pub struct Definition<T> {
    fields: Vec<(String, DependencyField)>,
    methods: Vec<(String, LifecycleMethod)>,
    capabilities: Capabilities<T>,
}

impl<T: Injectable> Definition<T> {
    fn new() -> Self {
        Definition {
            fields: Vec::new(),
            methods: Vec::new(),
            capabilities: Capabilities::new(),
        }
    }

    /// Dependency field marked as `resource`
    pub fn field<D>(
        &mut self,
        name: &'static str,
        accessor: impl Fn(&T) -> &Injected<D> + Send + Sync + 'static,
    ) -> &mut Self
    where
        D: ?Sized + Send + Sync + 'static,
    {
        self.field_marked(markers::RESOURCE, name, accessor)
    }

    pub fn field_marked<D>(
        &mut self,
        marker: &str,
        name: &'static str,
        accessor: impl Fn(&T) -> &Injected<D> + Send + Sync + 'static,
    ) -> &mut Self
    where
        D: ?Sized + Send + Sync + 'static,
    {
        self.fields
            .push((marker.to_string(), DependencyField::new(name, accessor)));
        self
    }

    /// Method marked as `post_construct`
    pub fn post_construct<A: MethodArgs + 'static>(
        &mut self,
        name: &'static str,
        method: impl Fn(&T, A) -> Result<(), DynError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.method_marked(markers::POST_CONSTRUCT, name, method)
    }

    /// Method marked as `pre_destroy`
    pub fn pre_destroy<A: MethodArgs + 'static>(
        &mut self,
        name: &'static str,
        method: impl Fn(&T, A) -> Result<(), DynError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.method_marked(markers::PRE_DESTROY, name, method)
    }

    pub fn method_marked<A: MethodArgs + 'static>(
        &mut self,
        marker: &str,
        name: &'static str,
        method: impl Fn(&T, A) -> Result<(), DynError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.methods
            .push((marker.to_string(), LifecycleMethod::new(name, method)));
        self
    }

    /// Makes instances visible as `C` as well, see [Capabilities::provides]
    pub fn provides<C>(&mut self, cast: impl Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.provides(cast);
        self
    }

    /// Keeps the declarations matching `markers`
    ///
    /// If several methods match the init (or teardown) markers the last one declared wins.
    fn into_descriptor(self, markers: &Markers, constructor: fn() -> Result<T, DynError>) -> Descriptor {
        let Definition {
            fields,
            methods,
            capabilities,
        } = self;

        let construct: Constructor =
            Arc::new(move || Ok(capabilities.instance(Arc::new(constructor()?))));

        let mut descriptor = Descriptor::new(TypeInfo::of::<T>()).with_constructor(construct);
        descriptor.dependency_fields = fields
            .into_iter()
            .filter(|(marker, _)| markers.is_dependency(marker))
            .map(|(_, field)| field)
            .collect();

        for (marker, method) in methods {
            if markers.is_init(&marker) {
                descriptor.init_method = Some(method.clone());
            }
            if markers.is_teardown(&marker) {
                descriptor.teardown_method = Some(method);
            }
        }
        descriptor
    }
}

type Blueprint = Arc<dyn Fn(&Markers) -> Descriptor + Send + Sync>;

/// [Resolver] over statically registered [Describe] types
///
/// Types which were never registered resolve to a descriptor without constructor.
#[derive(Clone, Default)]
pub struct Registry {
    blueprints: HashMap<TypeId, (TypeInfo, Blueprint)>,
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.blueprints.values().map(|(info, _)| info.type_name))
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Describe>(&mut self) -> &mut Self {
        let blueprint = |markers: &Markers| -> Descriptor {
            let mut def = Definition::<T>::new();
            T::describe(&mut def);
            def.into_descriptor(markers, T::construct)
        };

        let info = TypeInfo::of::<T>();
        self.blueprints
            .insert(info.type_id, (info, Arc::new(blueprint)));
        self
    }
}

impl Resolver for Registry {
    fn resolve(&self, type_info: &TypeInfo, markers: &Markers) -> Result<Descriptor, DynError> {
        Ok(match self.blueprints.get(&type_info.type_id) {
            Some((_, blueprint)) => blueprint(markers),
            None => Descriptor::new(*type_info),
        })
    }
}
