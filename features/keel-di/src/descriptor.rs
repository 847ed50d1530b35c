use std::{any::type_name, collections::BTreeSet, fmt::Debug, sync::Arc};

use crate::{
    errors::{ArgumentError, InjectError},
    inject::{Injected, MethodArgs},
    types::{DynError, Injectable, Instance, TypeInfo},
};

/// Names of the default markers
pub mod markers {
    /// Marks a dependency field
    pub const RESOURCE: &str = "resource";
    /// Marks the initialization method
    pub const POST_CONSTRUCT: &str = "post_construct";
    /// Marks the teardown method
    pub const PRE_DESTROY: &str = "pre_destroy";
}

/// The marker sets a [Resolver] matches declarations against
///
/// A field counts as a dependency if it carries any dependency marker,
/// a method counts as init / teardown method if it carries any init / teardown marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    pub dependency: BTreeSet<String>,
    pub init: BTreeSet<String>,
    pub teardown: BTreeSet<String>,
}

impl Markers {
    /// `resource`, `post_construct` and `pre_destroy`
    pub fn standard() -> Self {
        Markers::default().or_standard()
    }

    /// Replaces every empty set with its default marker
    pub fn or_standard(mut self) -> Self {
        fill(&mut self.dependency, markers::RESOURCE);
        fill(&mut self.init, markers::POST_CONSTRUCT);
        fill(&mut self.teardown, markers::PRE_DESTROY);
        self
    }

    pub fn is_dependency(&self, marker: &str) -> bool {
        self.dependency.contains(marker)
    }

    pub fn is_init(&self, marker: &str) -> bool {
        self.init.contains(marker)
    }

    pub fn is_teardown(&self, marker: &str) -> bool {
        self.teardown.contains(marker)
    }
}

fn fill(set: &mut BTreeSet<String>, marker: &str) {
    if set.is_empty() {
        set.insert(marker.to_string());
    }
}

type Injector = Arc<dyn Fn(&Instance, &Instance, bool) -> Result<(), InjectError> + Send + Sync>;

/// A dependency field: an [Injected] slot of the owning component
#[derive(Clone)]
pub struct DependencyField {
    pub name: &'static str,
    pub owner: TypeInfo,
    pub field_type: TypeInfo,
    injector: Injector,
}

impl Debug for DependencyField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyField")
            .field("name", &self.name)
            .field("owner", &self.owner.type_name)
            .field("field_type", &self.field_type.type_name)
            .finish()
    }
}

impl DependencyField {
    /// Describes the slot `accessor` returns for an owner of type `O`
    pub fn new<O, T>(
        name: &'static str,
        accessor: impl Fn(&O) -> &Injected<T> + Send + Sync + 'static,
    ) -> Self
    where
        O: Injectable,
        T: ?Sized + Send + Sync + 'static,
    {
        let injector = move |owner: &Instance, value: &Instance, weak: bool| -> Result<(), InjectError> {
            let this = owner.view::<O>().ok_or(InjectError::OwnerMismatch {
                expected: type_name::<O>(),
                actual: owner.info.type_name,
            })?;
            let value = value.view::<T>().ok_or(InjectError::ValueMismatch {
                expected: type_name::<T>(),
                actual: value.info.type_name,
            })?;
            let slot = accessor(&*this);
            if weak {
                slot.assign_weak(&value);
            } else {
                slot.assign(&value);
            }
            Ok(())
        };

        DependencyField {
            name,
            owner: TypeInfo::of::<O>(),
            field_type: TypeInfo::of::<T>(),
            injector: Arc::new(injector),
        }
    }

    /// Assigns `value` to this field of `owner`
    pub fn inject(&self, owner: &Instance, value: &Instance) -> Result<(), InjectError> {
        (self.injector)(owner, value, false)
    }

    /// Like [DependencyField::inject], the field does not keep `value` alive
    pub fn inject_weak(&self, owner: &Instance, value: &Instance) -> Result<(), InjectError> {
        (self.injector)(owner, value, true)
    }
}

type Invoker = Arc<dyn Fn(&Instance, &[Instance]) -> Result<(), DynError> + Send + Sync>;

/// An init or teardown method with its parameter types
#[derive(Clone)]
pub struct LifecycleMethod {
    pub name: &'static str,
    pub params: Vec<TypeInfo>,
    invoker: Invoker,
}

impl Debug for LifecycleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params: Vec<_> = self.params.iter().map(|param| param.type_name).collect();
        f.debug_struct("LifecycleMethod")
            .field("name", &self.name)
            .field("params", &params)
            .finish()
    }
}

impl LifecycleMethod {
    /// Describes `method` of `O`, its parameters are resolved from the tuple `A`
    pub fn new<O, A>(
        name: &'static str,
        method: impl Fn(&O, A) -> Result<(), DynError> + Send + Sync + 'static,
    ) -> Self
    where
        O: Injectable,
        A: MethodArgs + 'static,
    {
        let invoker = move |this: &Instance, args: &[Instance]| -> Result<(), DynError> {
            let receiver = this.view::<O>().ok_or(ArgumentError::Receiver {
                expected: type_name::<O>(),
                actual: this.info.type_name,
            })?;
            method(&*receiver, A::extract(args)?)
        };

        LifecycleMethod {
            name,
            params: A::param_types(),
            invoker: Arc::new(invoker),
        }
    }

    pub fn invoke(&self, this: &Instance, args: &[Instance]) -> Result<(), DynError> {
        (self.invoker)(this, args)
    }
}

/// Zero-argument constructor of a component instance
pub type Constructor = Arc<dyn Fn() -> Result<Instance, DynError> + Send + Sync>;

/// Static metadata about a type: its dependency fields and life-cycle methods
///
/// A descriptor without constructor describes a type that can not be instantiated,
/// e.g. a capability or a type the resolver does not know.
#[derive(Clone)]
pub struct Descriptor {
    pub type_info: TypeInfo,
    pub dependency_fields: Vec<DependencyField>,
    pub init_method: Option<LifecycleMethod>,
    pub teardown_method: Option<LifecycleMethod>,
    constructor: Option<Constructor>,
}

impl Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("type_info", &self.type_info.type_name)
            .field("dependency_fields", &self.dependency_fields)
            .field("init_method", &self.init_method)
            .field("teardown_method", &self.teardown_method)
            .field("instantiable", &self.is_instantiable())
            .finish()
    }
}

impl Descriptor {
    /// Empty descriptor of a type which can not be instantiated
    pub fn new(type_info: TypeInfo) -> Self {
        Descriptor {
            type_info,
            dependency_fields: Vec::new(),
            init_method: None,
            teardown_method: None,
            constructor: None,
        }
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn is_instantiable(&self) -> bool {
        self.constructor.is_some()
    }

    /// Creates a new instance, `None` if the type is not instantiable
    pub fn construct(&self) -> Option<Result<Instance, DynError>> {
        self.constructor.as_ref().map(|constructor| constructor())
    }

    /// Parameter types of the init method followed by those of the teardown method
    pub fn lifecycle_params(&self) -> impl Iterator<Item = &TypeInfo> {
        self.init_method
            .iter()
            .chain(self.teardown_method.iter())
            .flat_map(|method| method.params.iter())
    }
}

/// Produces the [Descriptor] of a type
pub trait Resolver: Send + Sync {
    fn resolve(&self, type_info: &TypeInfo, markers: &Markers) -> Result<Descriptor, DynError>;
}

/// Assigns a dependency value to a field of its owner
pub trait FieldSetter: Send + Sync {
    fn set(&self, field: &DependencyField, owner: &Instance, value: &Instance)
        -> Result<(), DynError>;

    /// Assigns a field closing a cycle of dependency fields
    ///
    /// The value (transitively) references `owner` already. Defaults to [FieldSetter::set].
    fn set_back_reference(
        &self,
        field: &DependencyField,
        owner: &Instance,
        value: &Instance,
    ) -> Result<(), DynError> {
        self.set(field, owner, value)
    }
}

impl<F> FieldSetter for F
where
    F: Fn(&DependencyField, &Instance, &Instance) -> Result<(), DynError> + Send + Sync,
{
    fn set(
        &self,
        field: &DependencyField,
        owner: &Instance,
        value: &Instance,
    ) -> Result<(), DynError> {
        self(field, owner, value)
    }
}

/// Default [FieldSetter], assigns into the owner's [Injected] slot
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotFieldSetter;

impl FieldSetter for SlotFieldSetter {
    fn set(
        &self,
        field: &DependencyField,
        owner: &Instance,
        value: &Instance,
    ) -> Result<(), DynError> {
        field.inject(owner, value).map_err(Into::into)
    }

    fn set_back_reference(
        &self,
        field: &DependencyField,
        owner: &Instance,
        value: &Instance,
    ) -> Result<(), DynError> {
        field.inject_weak(owner, value).map_err(Into::into)
    }
}
