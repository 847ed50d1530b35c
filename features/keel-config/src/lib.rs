//! Keel Config provides a registry of configs that can be injected in the rest of the
//! components.
//!
//! Keel Config is split into two parts:
//! 1. ConfigProvider: Used to create the registry of all configs
//! 2. Errors: for config errors
//!
//! A frozen provider is a [keel_di::Container] whose components are the configs.
//! Application containers use it as a parent and inject configs through `Injected<T>` slots.
//!
//! # Examples
//!
//! ```rust
//! use keel_config::provider::ConfigProvider;
//! use keel_di::{Container, Definition, Describe, DynError, Injected, Registry};
//!
//! struct AppConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! #[derive(Default)]
//! struct Server {
//!     config: Injected<AppConfig>,
//! }
//! impl Describe for Server {
//!     fn construct() -> Result<Self, DynError> {
//!         Ok(Server::default())
//!     }
//!
//!     fn describe(def: &mut Definition<Self>) {
//!         def.field("config", |this| &this.config);
//!     }
//! }
//!
//! let mut provider = ConfigProvider::initialize();
//! provider
//!     .add_config(AppConfig {
//!         host: "localhost".to_string(),
//!         port: 8080,
//!     })
//!     .unwrap();
//! let configs = provider.into_container().unwrap();
//!
//! let mut registry = Registry::new();
//! registry.register::<Server>();
//! let app = Container::builder()
//!     .parent(&configs)
//!     .resolver(registry)
//!     .component::<Server>()
//!     .build()
//!     .unwrap();
//!
//! let server = app.require::<Server>().unwrap();
//! assert_eq!(server.config.get().host, "localhost");
//! assert_eq!(server.config.get().port, 8080);
//! ```

pub mod errors;
pub mod provider;

pub use errors::ConfigError;
pub use provider::ConfigProvider;
