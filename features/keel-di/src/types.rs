use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::Arc,
};

/// Boxed error of any collaborator (resolver, field setter, proxy maker, life-cycle method)
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Components are shared between containers and threads
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Type Name and Type Id
///
/// Identifies a component type, a capability (`dyn Trait`) or a dependency slot type.
/// Generic instantiations are distinct: `Boxed<String>` and `Boxed<i32>` never compare equal.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

type ErasedObject = Arc<dyn Any + Send + Sync>;
type ErasedCast = Arc<dyn Fn(&ErasedObject) -> Option<Box<dyn Any>> + Send + Sync>;

/// A type an [Instance] can be seen as, together with the cast producing `Arc<View>`
#[derive(Clone)]
struct View {
    info: TypeInfo,
    cast: ErasedCast,
}

/// A shared component object
///
/// Holds the object type-erased, plus every view it can be handed out as:
/// its own concrete type and each registered capability (`dyn Trait`).
/// Cloning an Instance never clones the object.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    object: ErasedObject,
    views: Arc<[View]>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let views: Vec<_> = self.views.iter().map(|view| view.info.type_name).collect();
        f.debug_struct("Instance")
            .field("type", &self.info.type_name)
            .field("views", &views)
            .finish()
    }
}

impl Instance {
    /// Wraps a value which is only visible as its own type
    pub fn new<T: Injectable>(value: T) -> Self {
        Capabilities::<T>::new().instance(Arc::new(value))
    }

    /// Returns the object as `Arc<T>` if it offers a view of `T`
    ///
    /// `T` can be the concrete type or any registered capability, e.g. `dyn Greeter`.
    pub fn view<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        let wanted = TypeId::of::<T>();
        let view = self.views.iter().find(|view| view.info.type_id == wanted)?;
        let casted = (view.cast)(&self.object)?;
        casted.downcast::<Arc<T>>().ok().map(|arc| *arc)
    }

    /// Whether the object can be seen as the given type
    pub fn provides(&self, info: &TypeInfo) -> bool {
        self.views.iter().any(|view| view.info.type_id == info.type_id)
    }

    /// All types this instance can be seen as, its own type first
    pub fn views(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.views.iter().map(|view| view.info)
    }

    /// Reference equality of the underlying objects
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

/// The capabilities (views) a value of type `T` is registered with
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use keel_di::types::Capabilities;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".to_string()
///     }
/// }
///
/// let mut capabilities = Capabilities::<English>::new();
/// capabilities.provides::<dyn Greeter>(|this| this);
///
/// let instance = capabilities.instance(Arc::new(English));
/// assert_eq!(instance.view::<dyn Greeter>().unwrap().greet(), "hello");
/// ```
pub struct Capabilities<T> {
    casts: Vec<(TypeInfo, Arc<dyn Fn(Arc<T>) -> Box<dyn Any> + Send + Sync>)>,
}
impl<T: Injectable> Default for Capabilities<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Injectable> Capabilities<T> {
    pub fn new() -> Self {
        Self { casts: Vec::new() }
    }

    /// Registers `C` as a view of `T`, usually a trait object implemented by `T`
    pub fn provides<C>(&mut self, cast: impl Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.casts.push((
            TypeInfo::of::<C>(),
            Arc::new(move |this: Arc<T>| -> Box<dyn Any> { Box::new(cast(this)) }),
        ));
        self
    }

    /// Wraps the object into an [Instance] with its own type and all registered views
    pub fn instance(&self, object: Arc<T>) -> Instance {
        let own = View {
            info: TypeInfo::of::<T>(),
            cast: Arc::new(|object: &ErasedObject| -> Option<Box<dyn Any>> {
                let this = object.clone().downcast::<T>().ok()?;
                Some(Box::new(this) as Box<dyn Any>)
            }),
        };

        let capabilities = self.casts.iter().map(|(info, cast)| {
            let cast = cast.clone();
            View {
                info: *info,
                cast: Arc::new(move |object: &ErasedObject| -> Option<Box<dyn Any>> {
                    let this = object.clone().downcast::<T>().ok()?;
                    Some(cast(this))
                }),
            }
        });

        let views: Vec<View> = std::iter::once(own).chain(capabilities).collect();
        Instance {
            info: TypeInfo::of::<T>(),
            object,
            views: views.into(),
        }
    }
}
