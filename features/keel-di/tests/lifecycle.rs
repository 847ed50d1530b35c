mod common;

use std::sync::{Arc, Mutex, OnceLock};

use common::{init_logging, journal_container, names, short_name, Journal};
use keel_di::{
    BuildError, Container, ContainerState, Definition, Describe, DynError, Injected,
    LifecycleError, Phase, Registry, TypeInfo,
};
use rstest::rstest;

macro_rules! journaled {
    ($name:ident) => {
        #[derive(Default)]
        struct $name {
            journal: Injected<Journal>,
        }
        impl $name {
            fn log(&self, event: &str) {
                self.journal
                    .get()
                    .record(format!("{} {}", event, stringify!($name)));
            }
        }
    };
}

journaled!(A);
journaled!(B);
journaled!(C);

impl Describe for A {
    fn construct() -> Result<Self, DynError> {
        Ok(A::default())
    }

    fn describe(def: &mut Definition<Self>) {
        def.field("journal", |this| &this.journal)
            .post_construct("init", |this, ()| {
                this.log("init");
                Ok(())
            })
            .pre_destroy("destroy", |this, (_,): (Arc<B>,)| {
                this.log("destroy");
                Ok(())
            });
    }
}

impl Describe for B {
    fn construct() -> Result<Self, DynError> {
        Ok(B::default())
    }

    fn describe(def: &mut Definition<Self>) {
        def.field("journal", |this| &this.journal)
            .post_construct("init", |this, (_,): (Arc<A>,)| {
                this.log("init");
                Ok(())
            })
            .pre_destroy("destroy", |this, ()| {
                this.log("destroy");
                Ok(())
            });
    }
}

impl Describe for C {
    fn construct() -> Result<Self, DynError> {
        Ok(C::default())
    }

    fn describe(def: &mut Definition<Self>) {
        def.field("journal", |this| &this.journal)
            .post_construct("init", |this, (_, _): (Arc<A>, Arc<B>)| {
                this.log("init");
                Ok(())
            })
            .pre_destroy("destroy", |this, (_, _): (Arc<B>, Arc<A>)| {
                this.log("destroy");
                Ok(())
            });
    }
}

fn chain_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<A>().register::<B>().register::<C>();
    registry
}

fn declared(order: &str) -> Vec<TypeInfo> {
    order
        .chars()
        .map(|name| match name {
            'A' => TypeInfo::of::<A>(),
            'B' => TypeInfo::of::<B>(),
            _ => TypeInfo::of::<C>(),
        })
        .collect()
}

#[rstest]
#[case("ABC")]
#[case("ACB")]
#[case("BAC")]
#[case("BCA")]
#[case("CAB")]
#[case("CBA")]
fn passes_follow_dependencies_regardless_of_declaration(#[case] order: &str) {
    init_logging();
    let (journal_container, journal) = journal_container();

    let container = Container::builder()
        .parent(&journal_container)
        .resolver(chain_registry())
        .component_types(declared(order))
        .build()
        .unwrap();
    container.initialize().unwrap();
    container.shutdown().unwrap();

    assert_eq!(
        journal.entries(),
        vec![
            "init A",
            "init B",
            "init C",
            "destroy B",
            "destroy A",
            "destroy C"
        ]
    );
}

#[test]
fn lifecycle_dependencies_are_linked() {
    let (journal_container, _) = journal_container();

    let container = Container::builder()
        .parent(&journal_container)
        .resolver(chain_registry())
        .component::<C>()
        .build()
        .unwrap();

    let a = container.get_component(&TypeInfo::of::<A>()).unwrap();
    let b = container.get_component(&TypeInfo::of::<B>()).unwrap();
    let c = container.get_component(&TypeInfo::of::<C>()).unwrap();
    assert_eq!(b.init_dependencies(), vec![a.clone()]);
    assert_eq!(a.teardown_dependencies(), vec![b.clone()]);
    assert_eq!(c.init_dependencies(), vec![a.clone(), b.clone()]);
    assert_eq!(c.teardown_dependencies(), vec![b, a]);
    assert_eq!(names(container.local_components().as_slice()), vec!["C", "A", "B"]);
}

#[test]
fn container_usage_is_checked() {
    let (journal_container, _) = journal_container();
    let container = Container::builder()
        .parent(&journal_container)
        .resolver(chain_registry())
        .component::<A>()
        .build()
        .unwrap();

    assert!(!container.is_initialized());
    assert!(matches!(
        container.shutdown(),
        Err(LifecycleError::NotInitialized)
    ));

    container.initialize().unwrap();
    assert!(container.is_initialized());
    assert!(matches!(
        container.initialize(),
        Err(LifecycleError::AlreadyInitialized)
    ));

    container.shutdown().unwrap();
    assert!(container.is_shutdown());
    assert!(matches!(
        container.initialize(),
        Err(LifecycleError::AlreadyInitialized)
    ));
    assert!(matches!(
        container.shutdown(),
        Err(LifecycleError::AlreadyShutdown)
    ));
}

macro_rules! step {
    ($name:ident, fail_init = $fail_init:expr, fail_destroy = $fail_destroy:expr) => {
        journaled!($name);
        impl Describe for $name {
            fn construct() -> Result<Self, DynError> {
                Ok($name::default())
            }

            fn describe(def: &mut Definition<Self>) {
                def.field("journal", |this| &this.journal)
                    .post_construct("init", |this, ()| {
                        if $fail_init {
                            return Err(format!("{} refused to start", stringify!($name)).into());
                        }
                        this.log("init");
                        Ok(())
                    })
                    .pre_destroy("destroy", |this, ()| {
                        if $fail_destroy {
                            return Err(format!("{} refused to stop", stringify!($name)).into());
                        }
                        this.log("destroy");
                        Ok(())
                    });
            }
        }
    };
}

step!(StepA, fail_init = false, fail_destroy = false);
step!(StepB, fail_init = false, fail_destroy = true);
step!(ErrorC, fail_init = true, fail_destroy = false);
step!(StepD, fail_init = false, fail_destroy = false);

fn steps() -> Registry {
    let mut registry = Registry::new();
    registry
        .register::<StepA>()
        .register::<StepB>()
        .register::<ErrorC>()
        .register::<StepD>();
    registry
}

#[test]
fn failed_initialization_reports_progress() {
    init_logging();
    let (journal_container, journal) = journal_container();
    let container = Container::builder()
        .parent(&journal_container)
        .resolver(steps())
        .component::<StepA>()
        .component::<StepB>()
        .component::<ErrorC>()
        .component::<StepD>()
        .build()
        .unwrap();

    let Err(LifecycleError::Initialize(err)) = container.initialize() else {
        panic!("initialization should fail");
    };

    assert_eq!(short_name(err.failed.type_info().type_name), "ErrorC");
    assert!(!err.failed.is_initialized());
    assert_eq!(names(&err.initialized), vec!["StepA", "StepB"]);
    assert!(err.initialized.iter().all(|c| c.is_initialized()));
    assert_eq!(names(&err.uninitialized), vec!["StepD"]);
    assert!(err.uninitialized.iter().all(|c| !c.is_initialized()));
    assert_eq!(err.source.to_string(), "ErrorC refused to start");
    assert_eq!(journal.entries(), vec!["init StepA", "init StepB"]);

    // No retry, the container counts as initialized
    assert!(container.is_initialized());
    assert!(matches!(
        container.initialize(),
        Err(LifecycleError::AlreadyInitialized)
    ));
}

#[test]
fn failed_shutdown_reports_progress() {
    let (journal_container, journal) = journal_container();
    let container = Container::builder()
        .parent(&journal_container)
        .resolver(steps())
        .component::<StepA>()
        .component::<StepB>()
        .component::<StepD>()
        .build()
        .unwrap();
    container.initialize().unwrap();

    let Err(LifecycleError::Shutdown(err)) = container.shutdown() else {
        panic!("shutdown should fail");
    };

    assert_eq!(short_name(err.failed.type_info().type_name), "StepB");
    assert_eq!(names(&err.destroyed), vec!["StepA"]);
    assert_eq!(names(&err.undestroyed), vec!["StepD"]);
    assert!(err.failed.is_initialized());
    assert!(container.is_shutdown());
    assert_eq!(
        journal.entries(),
        vec!["init StepA", "init StepB", "init StepD", "destroy StepA"]
    );
}

#[test]
fn never_initialized_components_are_not_destroyed() {
    let (journal_container, journal) = journal_container();
    let container = Container::builder()
        .parent(&journal_container)
        .resolver(steps())
        .component::<StepA>()
        .component::<ErrorC>()
        .component::<StepD>()
        .build()
        .unwrap();

    assert!(container.initialize().is_err());
    container.shutdown().unwrap();

    assert_eq!(journal.entries(), vec!["init StepA", "destroy StepA"]);
    let error_c = container.get_component(&TypeInfo::of::<ErrorC>()).unwrap();
    assert!(!error_c.is_initialized() && !error_c.is_destroyed());
}

#[derive(Default)]
struct CycA;
#[derive(Default)]
struct CycB;
#[derive(Default)]
struct CycC;

impl Describe for CycA {
    fn construct() -> Result<Self, DynError> {
        Ok(CycA)
    }
    fn describe(def: &mut Definition<Self>) {
        def.post_construct("init", |_, (_,): (Arc<CycB>,)| Ok(()));
    }
}
impl Describe for CycB {
    fn construct() -> Result<Self, DynError> {
        Ok(CycB)
    }
    fn describe(def: &mut Definition<Self>) {
        def.post_construct("init", |_, (_,): (Arc<CycC>,)| Ok(()))
            .pre_destroy("destroy", |_, (_,): (Arc<CycC>,)| Ok(()));
    }
}
impl Describe for CycC {
    fn construct() -> Result<Self, DynError> {
        Ok(CycC)
    }
    fn describe(def: &mut Definition<Self>) {
        def.post_construct("init", |_, (_,): (Arc<CycA>,)| Ok(()))
            .pre_destroy("destroy", |_, (_,): (Arc<CycB>,)| Ok(()));
    }
}

fn cyclic() -> Registry {
    let mut registry = Registry::new();
    registry
        .register::<CycA>()
        .register::<CycB>()
        .register::<CycC>();
    registry
}

#[test]
fn init_cycle_fails_the_build() {
    let err = Container::builder()
        .resolver(cyclic())
        .component::<CycA>()
        .build()
        .unwrap_err();

    let BuildError::Cycle { phase, source } = err else {
        panic!("expected a cycle");
    };
    assert_eq!(phase, Phase::PostConstruct);
    let chain: Vec<_> = source.chain.iter().map(|name| short_name(name)).collect();
    assert_eq!(chain, vec!["CycA", "CycB", "CycC", "CycA"]);
}

#[test]
fn teardown_cycle_fails_the_build() {
    // Init methods are not marked, only teardown edges remain
    let err = Container::builder()
        .resolver(cyclic())
        .init_marker("never")
        .component::<CycB>()
        .build()
        .unwrap_err();

    let BuildError::Cycle { phase, source } = err else {
        panic!("expected a cycle");
    };
    assert_eq!(phase, Phase::PreDestroy);
    let chain: Vec<_> = source.chain.iter().map(|name| short_name(name)).collect();
    assert_eq!(chain, vec!["CycB", "CycC", "CycB"]);
}

#[derive(Default)]
struct Shared {
    starts: std::sync::atomic::AtomicUsize,
}
impl Describe for Shared {
    fn construct() -> Result<Self, DynError> {
        Ok(Shared::default())
    }
    fn describe(def: &mut Definition<Self>) {
        def.post_construct("start", |this, ()| {
            this.starts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });
    }
}

#[derive(Default)]
struct User;
impl Describe for User {
    fn construct() -> Result<Self, DynError> {
        Ok(User)
    }
    fn describe(def: &mut Definition<Self>) {
        def.post_construct("start", |_, (shared,): (Arc<Shared>,)| {
            assert_eq!(shared.starts.load(std::sync::atomic::Ordering::SeqCst), 1);
            Ok(())
        });
    }
}

#[test]
fn inherited_components_initialize_once() {
    let mut registry = Registry::new();
    registry.register::<Shared>().register::<User>();
    let parent = Container::builder()
        .resolver(registry.clone())
        .component::<Shared>()
        .build()
        .unwrap();

    let children: Vec<Container> = (0..4)
        .map(|_| {
            Container::builder()
                .resolver(registry.clone())
                .parent(&parent)
                .component::<User>()
                .build()
                .unwrap()
        })
        .collect();

    std::thread::scope(|scope| {
        for child in &children {
            scope.spawn(move || child.initialize().map(|_| ()).unwrap());
        }
    });

    let shared = parent.require::<Shared>().unwrap();
    assert_eq!(shared.starts.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(parent
        .get_component(&TypeInfo::of::<Shared>())
        .unwrap()
        .is_initialized());
}

static OBSERVED: OnceLock<Container> = OnceLock::new();

/// Records the state of [OBSERVED] from inside its own life-cycle methods
#[derive(Default)]
struct Observer {
    seen: Mutex<Option<ContainerState>>,
}
impl Observer {
    fn observe(&self) -> Result<(), DynError> {
        let container = OBSERVED.get().ok_or("container not published")?;
        *self.seen.lock().unwrap() = Some(container.state());
        Ok(())
    }
}
impl Describe for Observer {
    fn construct() -> Result<Self, DynError> {
        Ok(Observer::default())
    }
    fn describe(def: &mut Definition<Self>) {
        def.post_construct("start", |this, ()| this.observe())
            .pre_destroy("stop", |this, ()| this.observe());
    }
}

#[test]
fn lifecycle_methods_can_query_their_container() {
    let mut registry = Registry::new();
    registry.register::<Observer>();
    let container = OBSERVED.get_or_init(|| {
        Container::builder()
            .resolver(registry)
            .component::<Observer>()
            .build()
            .unwrap()
    });
    let observer = container.require::<Observer>().unwrap();

    container.initialize().unwrap();
    assert_eq!(*observer.seen.lock().unwrap(), Some(ContainerState::Initialized));

    container.shutdown().unwrap();
    assert_eq!(*observer.seen.lock().unwrap(), Some(ContainerState::Shutdown));
}
