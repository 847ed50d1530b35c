mod common;

use std::{
    any::Any,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::{init_logging, short_name};
use keel_di::{
    intercept, AspectHandler, BuildError, Container, Definition, Describe, DynError, Injected,
    Invocation, MethodInfo, ProxyRegistry, RequireError, TypeInfo,
};

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> Result<String, DynError>;
}

#[derive(Default)]
struct Prefix;
impl Describe for Prefix {
    fn construct() -> Result<Self, DynError> {
        Ok(Prefix)
    }
}

#[derive(Default)]
struct GreeterImpl {
    prefix: Injected<Prefix>,
    started: AtomicBool,
}
impl Greeter for GreeterImpl {
    fn greet(&self, name: &str) -> Result<String, DynError> {
        // Fails if the raw instance lost its wiring
        self.prefix.try_get().ok_or("prefix not wired")?;
        Ok(format!("hello {name}"))
    }
}
impl Describe for GreeterImpl {
    fn construct() -> Result<Self, DynError> {
        Ok(GreeterImpl::default())
    }

    fn describe(def: &mut Definition<Self>) {
        def.field("prefix", |this| &this.prefix)
            .post_construct("start", |this, ()| {
                this.started.store(true, Ordering::SeqCst);
                Ok(())
            })
            .provides::<dyn Greeter>(|this| this);
    }
}

struct GreeterProxy {
    target: Arc<GreeterImpl>,
    handler: Arc<dyn AspectHandler>,
}
impl Greeter for GreeterProxy {
    fn greet(&self, name: &str) -> Result<String, DynError> {
        let owned = name.to_string();
        let args: [&dyn Any; 1] = [&owned];
        let call = Invocation::new(MethodInfo::of::<dyn Greeter>("greet"), &*self.target, &args);
        intercept(&*self.handler, &call, || self.target.greet(name))
    }
}

/// Appends "-patched" to every greeting
#[derive(Default)]
struct Patcher;
impl AspectHandler for Patcher {
    fn wants_type(&self, type_info: &TypeInfo) -> bool {
        *type_info == TypeInfo::of::<GreeterImpl>() || *type_info == TypeInfo::of::<Patcher>()
    }

    fn wants_method(&self, method: &MethodInfo) -> bool {
        method.name == "greet"
    }

    fn after_returning(&self, result: Box<dyn Any + Send>, _: &Invocation<'_>) -> Box<dyn Any + Send> {
        match result.downcast::<String>() {
            Ok(greeting) => Box::new(format!("{greeting}-patched")),
            Err(other) => other,
        }
    }
}
impl Describe for Patcher {
    fn construct() -> Result<Self, DynError> {
        Ok(Patcher)
    }

    fn describe(def: &mut Definition<Self>) {
        def.provides::<dyn AspectHandler>(|this| this);
    }
}

#[derive(Default)]
struct Consumer {
    greeter: Injected<dyn Greeter>,
}
impl Describe for Consumer {
    fn construct() -> Result<Self, DynError> {
        Ok(Consumer::default())
    }

    fn describe(def: &mut Definition<Self>) {
        def.field("greeter", |this| &this.greeter);
    }
}

fn registry() -> keel_di::Registry {
    let mut registry = keel_di::Registry::new();
    registry
        .register::<Prefix>()
        .register::<GreeterImpl>()
        .register::<Patcher>()
        .register::<Consumer>();
    registry
}

fn proxies() -> ProxyRegistry {
    let mut proxies = ProxyRegistry::new();
    proxies.register::<GreeterImpl, _>(
        |target, handler| GreeterProxy { target, handler },
        |caps| {
            caps.provides::<dyn Greeter>(|this| this);
        },
    );
    proxies
}

fn advised() -> Container {
    Container::builder()
        .resolver(registry())
        .proxy_maker(proxies())
        .component::<Patcher>()
        .component::<GreeterImpl>()
        .component::<Consumer>()
        .build()
        .unwrap()
}

#[test]
fn lookups_return_the_proxy() {
    init_logging();
    let container = advised();

    let greeter = container.get_object::<dyn Greeter>().unwrap();

    assert_eq!(greeter.greet("keel").unwrap(), "hello keel-patched");
}

#[test]
fn fields_are_rewired_to_the_proxy() {
    let container = advised();

    let consumer = container.get_object::<Consumer>().unwrap();

    assert_eq!(
        consumer.greeter.get().greet("field").unwrap(),
        "hello field-patched"
    );
}

#[test]
fn lifecycle_runs_on_the_raw_instance() {
    let container = advised();
    container.initialize().unwrap();

    let component = container.get_component(&TypeInfo::of::<GreeterImpl>()).unwrap();
    let raw = component.raw_instance().view::<GreeterImpl>().unwrap();

    assert!(component.is_proxied());
    assert!(raw.started.load(Ordering::SeqCst));
    assert_eq!(raw.greet("raw").unwrap(), "hello raw");
}

#[test]
fn proxied_components_are_only_visible_through_capabilities() {
    let container = advised();

    assert!(container.get_object::<GreeterImpl>().is_none());
    assert!(matches!(
        container.require::<GreeterImpl>(),
        Err(RequireError::ViewUnavailable { .. })
    ));
}

#[test]
fn handlers_are_never_advised() {
    let container = advised();

    let patcher = container.get_component(&TypeInfo::of::<Patcher>()).unwrap();

    assert!(!patcher.is_proxied());
    assert!(!container
        .get_component(&TypeInfo::of::<Consumer>())
        .unwrap()
        .is_proxied());
}

#[test]
fn without_handlers_nothing_is_advised() {
    let container = Container::builder()
        .resolver(registry())
        .proxy_maker(proxies())
        .component::<Consumer>()
        .component::<GreeterImpl>()
        .build()
        .unwrap();

    let greeter = container.get_object::<dyn Greeter>().unwrap();
    assert_eq!(greeter.greet("plain").unwrap(), "hello plain");
    assert!(container.get_object::<GreeterImpl>().is_some());
}

#[test]
fn inherited_components_are_not_advised() {
    let parent = Container::builder()
        .resolver(registry())
        .component::<GreeterImpl>()
        .build()
        .unwrap();

    let child = Container::builder()
        .resolver(registry())
        .proxy_maker(proxies())
        .parent(&parent)
        .component::<Patcher>()
        .component::<Consumer>()
        .build()
        .unwrap();

    let consumer = child.get_object::<Consumer>().unwrap();
    assert_eq!(consumer.greeter.get().greet("parent").unwrap(), "hello parent");
}

#[test]
fn missing_proxy_fails_the_build() {
    let err = Container::builder()
        .resolver(registry())
        .component::<Patcher>()
        .component::<GreeterImpl>()
        .build()
        .unwrap_err();

    assert!(matches!(err, BuildError::Proxy { .. }));
}

/// Takes the advised greeter by its concrete type
#[derive(Default)]
struct ConcreteWorker;
impl Describe for ConcreteWorker {
    fn construct() -> Result<Self, DynError> {
        Ok(ConcreteWorker)
    }

    fn describe(def: &mut Definition<Self>) {
        def.post_construct("start", |_, (_,): (Arc<GreeterImpl>,)| Ok(()));
    }
}

/// Takes the advised greeter by its capability
#[derive(Default)]
struct Worker {
    greeting: std::sync::Mutex<String>,
}
impl Describe for Worker {
    fn construct() -> Result<Self, DynError> {
        Ok(Worker::default())
    }

    fn describe(def: &mut Definition<Self>) {
        def.post_construct("start", |this, (greeter,): (Arc<dyn Greeter>,)| {
            *this.greeting.lock().unwrap() = greeter.greet("worker")?;
            Ok(())
        });
    }
}

#[test]
fn parameters_see_the_proxy() {
    let mut registry = registry();
    registry.register::<Worker>();
    let container = Container::builder()
        .resolver(registry)
        .proxy_maker(proxies())
        .component::<Patcher>()
        .component::<GreeterImpl>()
        .component::<Worker>()
        .build()
        .unwrap();

    container.initialize().unwrap();

    let worker = container.require::<Worker>().unwrap();
    assert_eq!(*worker.greeting.lock().unwrap(), "hello worker-patched");
}

#[test]
fn concrete_parameters_of_proxied_components_fail_the_build() {
    let mut registry = registry();
    registry.register::<ConcreteWorker>();

    let err = Container::builder()
        .resolver(registry)
        .proxy_maker(proxies())
        .component::<Patcher>()
        .component::<GreeterImpl>()
        .component::<ConcreteWorker>()
        .build()
        .unwrap_err();

    let BuildError::ParameterUnavailable {
        owner,
        method,
        param,
        actual,
    } = err
    else {
        panic!("expected an unavailable parameter");
    };
    assert_eq!(short_name(owner), "ConcreteWorker");
    assert_eq!(method, "start");
    assert_eq!(short_name(param), "GreeterImpl");
    assert_eq!(short_name(actual), "GreeterProxy");
}
