use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt::Debug,
    marker::PhantomData,
    sync::Arc,
};

use tracing::debug;

use crate::{
    errors::{AspectError, BuildError},
    graph::ResolutionGraph,
    types::{Capabilities, DynError, Injectable, Instance, TypeInfo},
};

/// Identifies an intercepted method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodInfo {
    /// The type (or capability) declaring the method
    pub owner: TypeInfo,
    pub name: &'static str,
}

impl MethodInfo {
    pub fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        MethodInfo {
            owner: TypeInfo::of::<T>(),
            name,
        }
    }
}

/// A single intercepted call
pub struct Invocation<'a> {
    pub method: MethodInfo,
    /// The wrapped instance
    pub target: &'a dyn Any,
    pub args: &'a [&'a dyn Any],
}

impl<'a> Invocation<'a> {
    pub fn new(method: MethodInfo, target: &'a dyn Any, args: &'a [&'a dyn Any]) -> Self {
        Invocation {
            method,
            target,
            args,
        }
    }

    /// The argument at `index` if it has type `T`
    pub fn arg<T: Any>(&self, index: usize) -> Option<&T> {
        self.args.get(index)?.downcast_ref()
    }
}

/// A component intercepting calls of other components
///
/// Components exposing the `dyn AspectHandler` capability are picked up by the container.
/// Each other local component is offered to the handlers in declaration order,
/// the first handler wanting its type gets it wrapped in a proxy.
pub trait AspectHandler: Send + Sync {
    fn wants_type(&self, type_info: &TypeInfo) -> bool;

    fn wants_method(&self, method: &MethodInfo) -> bool;

    fn before(&self, call: &Invocation<'_>) {
        let _ = call;
    }

    /// May replace the result, it has to keep the type of the original
    fn after_returning(&self, result: Box<dyn Any + Send>, call: &Invocation<'_>) -> Box<dyn Any + Send> {
        let _ = call;
        result
    }

    /// May recover with a result, or propagate an error
    fn after_throwing(
        &self,
        error: DynError,
        call: &Invocation<'_>,
    ) -> Result<Box<dyn Any + Send>, DynError> {
        let _ = call;
        Err(error)
    }
}

/// Runs `body` surrounded by the hooks of `handler`
///
/// Proxies forward every method through this function.
/// If the handler does not want the method the body runs unobserved.
pub fn intercept<R: Any + Send>(
    handler: &dyn AspectHandler,
    call: &Invocation<'_>,
    body: impl FnOnce() -> Result<R, DynError>,
) -> Result<R, DynError> {
    if !handler.wants_method(&call.method) {
        return body();
    }

    handler.before(call);
    let result = match body() {
        Ok(value) => handler.after_returning(Box::new(value), call),
        Err(error) => handler.after_throwing(error, call)?,
    };

    match result.downcast::<R>() {
        Ok(value) => Ok(*value),
        Err(_) => Err(AspectError::ResultType {
            method: call.method.name,
            expected: type_name::<R>(),
        }
        .into()),
    }
}

/// Creates proxies of one type bound to one handler
pub trait ProxySpec: Send + Sync {
    /// Wraps `target`, the result exposes the same capabilities as the target
    fn new_instance(&self, target: &Instance) -> Result<Instance, DynError>;
}

/// Produces a [ProxySpec] for a type and handler
pub trait ProxyMaker: Send + Sync {
    fn make(
        &self,
        type_info: &TypeInfo,
        handler: Arc<dyn AspectHandler>,
    ) -> Result<Box<dyn ProxySpec>, DynError>;
}

type Wrap<T, P> = Arc<dyn Fn(Arc<T>, Arc<dyn AspectHandler>) -> P + Send + Sync>;
type SpecFactory = Arc<dyn Fn(Arc<dyn AspectHandler>) -> Box<dyn ProxySpec> + Send + Sync>;

struct WrapperSpec<T, P> {
    wrap: Wrap<T, P>,
    capabilities: Arc<Capabilities<P>>,
    handler: Arc<dyn AspectHandler>,
    _target: PhantomData<fn() -> T>,
}

impl<T: Injectable, P: Injectable> ProxySpec for WrapperSpec<T, P> {
    fn new_instance(&self, target: &Instance) -> Result<Instance, DynError> {
        let target = target.view::<T>().ok_or(AspectError::TargetMismatch {
            expected: type_name::<T>(),
            actual: target.info.type_name,
        })?;
        let proxy = (self.wrap)(target, self.handler.clone());
        Ok(self.capabilities.instance(Arc::new(proxy)))
    }
}

/// [ProxyMaker] over hand-written wrapper types
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use keel_di::{intercept, AspectHandler, DynError, Invocation, MethodInfo, ProxyRegistry};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> Result<String, DynError>;
/// }
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> Result<String, DynError> {
///         Ok("hello".to_string())
///     }
/// }
///
/// struct GreeterProxy {
///     target: Arc<English>,
///     handler: Arc<dyn AspectHandler>,
/// }
/// impl Greeter for GreeterProxy {
///     fn greet(&self) -> Result<String, DynError> {
///         let call = Invocation::new(MethodInfo::of::<dyn Greeter>("greet"), &*self.target, &[]);
///         intercept(&*self.handler, &call, || self.target.greet())
///     }
/// }
///
/// let mut proxies = ProxyRegistry::new();
/// proxies.register::<English, _>(
///     |target, handler| GreeterProxy { target, handler },
///     |caps| {
///         caps.provides::<dyn Greeter>(|this| this);
///     },
/// );
/// ```
#[derive(Clone, Default)]
pub struct ProxyRegistry {
    factories: HashMap<TypeId, (TypeInfo, SpecFactory)>,
}

impl Debug for ProxyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.factories.values().map(|(info, _)| info.type_name))
            .finish()
    }
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the proxy type `P` for components of type `T`
    ///
    /// `capabilities` declares the views of the proxy, usually the same traits `T` provides.
    pub fn register<T, P>(
        &mut self,
        wrap: impl Fn(Arc<T>, Arc<dyn AspectHandler>) -> P + Send + Sync + 'static,
        capabilities: impl FnOnce(&mut Capabilities<P>),
    ) -> &mut Self
    where
        T: Injectable,
        P: Injectable,
    {
        let mut caps = Capabilities::<P>::new();
        capabilities(&mut caps);
        let caps = Arc::new(caps);
        let wrap: Wrap<T, P> = Arc::new(wrap);

        let factory = move |handler: Arc<dyn AspectHandler>| -> Box<dyn ProxySpec> {
            Box::new(WrapperSpec {
                wrap: wrap.clone(),
                capabilities: caps.clone(),
                handler,
                _target: PhantomData,
            })
        };

        let info = TypeInfo::of::<T>();
        self.factories
            .insert(info.type_id, (info, Arc::new(factory)));
        self
    }
}

impl ProxyMaker for ProxyRegistry {
    fn make(
        &self,
        type_info: &TypeInfo,
        handler: Arc<dyn AspectHandler>,
    ) -> Result<Box<dyn ProxySpec>, DynError> {
        let (_, factory) = self
            .factories
            .get(&type_info.type_id)
            .ok_or(AspectError::NoProxy(type_info.type_name))?;
        Ok(factory(handler))
    }
}

/// Replaces local components wanted by an aspect handler with proxies
///
/// Handlers themselves are never advised. Does nothing without handlers.
pub(crate) fn weave(graph: &mut ResolutionGraph, maker: &dyn ProxyMaker) -> Result<(), BuildError> {
    let handlers: Vec<(usize, Arc<dyn AspectHandler>)> = graph
        .records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.is_aspect_handler())
        .filter_map(|(index, record)| Some((index, record.instance.view::<dyn AspectHandler>()?)))
        .collect();

    if handlers.is_empty() {
        return Ok(());
    }

    for (index, record) in graph.records.iter_mut().enumerate() {
        if !record.is_local() || handlers.iter().any(|(handler, _)| *handler == index) {
            continue;
        }

        let Some((_, handler)) = handlers
            .iter()
            .find(|(_, handler)| handler.wants_type(&record.type_info))
        else {
            continue;
        };

        let proxy_error = |source| BuildError::Proxy {
            type_name: record.type_info.type_name,
            source,
        };
        let spec = maker
            .make(&record.type_info, handler.clone())
            .map_err(proxy_error)?;
        let proxy = spec.new_instance(&record.instance).map_err(proxy_error)?;

        debug!("Advised '{}' with a proxy", record.type_info);
        record.proxy = Some(proxy);
    }
    Ok(())
}
