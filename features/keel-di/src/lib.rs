//! Keel DI builds containers of components with ordered life-cycles.
//!
//! A container is built from declared component types. Every declared type is resolved
//! into a [Descriptor] (dependency fields and life-cycle methods), constructed eagerly and
//! wired through its [Injected] slots. Afterwards [Container::initialize] runs the init
//! methods, dependencies first, and [Container::shutdown] runs the teardown methods.
//!
//! Containers can inherit the components of parent containers, and components exposing
//! the `dyn AspectHandler` capability wrap other components in interception proxies.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use keel_di::{Container, Definition, Describe, DynError, Injected, Registry};
//!
//! #[derive(Default)]
//! struct Database {
//!     open: Mutex<bool>,
//! }
//! impl Describe for Database {
//!     fn construct() -> Result<Self, DynError> {
//!         Ok(Database::default())
//!     }
//!
//!     fn describe(def: &mut Definition<Self>) {
//!         def.post_construct("open", |this, ()| {
//!             *this.open.lock().unwrap() = true;
//!             Ok(())
//!         });
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Service {
//!     database: Injected<Database>,
//! }
//! impl Describe for Service {
//!     fn construct() -> Result<Self, DynError> {
//!         Ok(Service::default())
//!     }
//!
//!     fn describe(def: &mut Definition<Self>) {
//!         def.field("database", |this| &this.database)
//!             .post_construct("start", |this, (db,): (Arc<Database>,)| {
//!                 assert!(*db.open.lock().unwrap());
//!                 assert!(Arc::ptr_eq(&db, &this.database.get()));
//!                 Ok(())
//!             });
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.register::<Database>().register::<Service>();
//!
//! let container = Container::builder()
//!     .resolver(registry)
//!     .component::<Service>()
//!     .build()
//!     .unwrap();
//!
//! container.initialize().unwrap();
//! assert!(container.get_object::<Database>().is_some());
//! container.shutdown().unwrap();
//! ```

pub mod aspect;
pub mod builder;
pub mod component;
pub mod container;
pub mod cycle;
pub mod descriptor;
pub mod errors;
mod graph;
pub mod inject;
pub mod lifecycle;
pub mod registry;
pub mod types;

pub use aspect::{intercept, AspectHandler, Invocation, MethodInfo, ProxyMaker, ProxyRegistry, ProxySpec};
pub use builder::ContainerBuilder;
pub use component::{Component, ComponentTable, LifecycleState};
pub use container::{Container, ContainerState};
pub use descriptor::{
    markers, DependencyField, Descriptor, FieldSetter, LifecycleMethod, Markers, Resolver,
    SlotFieldSetter,
};
pub use errors::{
    BuildError, InitializeError, LifecycleError, RequireError, ShutdownError,
};
pub use inject::Injected;
pub use lifecycle::Phase;
pub use registry::{Definition, Describe, Registry};
pub use types::{Capabilities, DynError, Injectable, Instance, TypeInfo};
