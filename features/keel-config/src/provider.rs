use std::{any::TypeId, collections::HashMap, sync::Arc};

use keel_di::{Capabilities, Container, Injectable, Instance, TypeInfo};
use tracing::debug;

use crate::errors::ConfigError;

/// A provider to register all configs.
///
/// Configs can be registered and retrieved based on type.
/// [ConfigProvider::into_container] turns the registry into a container,
/// so application containers can inherit the configs and inject them like any component.
#[derive(Debug, Default)]
pub struct ConfigProvider {
    configs: HashMap<TypeId, Instance>,
    order: Vec<TypeId>,
}

impl ConfigProvider {
    /// Initializes an empty Config Provider
    pub fn initialize() -> Self {
        Self::default()
    }

    /// Retrieve a config with specified type.
    ///
    /// Returns `None` if the config type is not registered
    pub fn get_config<T: Injectable>(&self) -> Option<Arc<T>> {
        self.configs.get(&TypeId::of::<T>())?.view::<T>()
    }

    /// Retrieve a config with specified type.
    ///
    /// If the config type is not available, it will return a [`ConfigError`]
    pub fn require_config<T: Injectable>(&self) -> Result<Arc<T>, ConfigError> {
        self.get_config()
            .ok_or(ConfigError::ConfigMissing(TypeInfo::of::<T>()))
    }

    /// Add a config to the registry.
    ///
    /// If the config type is already registered, it will return a
    /// [`ConfigError`] runtime error
    pub fn add_config<T: Injectable>(&mut self, config: T) -> Result<&mut Self, ConfigError> {
        self.insert(Instance::new(config))
    }

    /// Add a config which can also be seen as the capabilities in `capabilities`
    ///
    /// Useful to inject a config as a trait object, e.g. `Injected<dyn DatabaseSettings>`.
    pub fn add_config_with<T: Injectable>(
        &mut self,
        config: T,
        capabilities: &Capabilities<T>,
    ) -> Result<&mut Self, ConfigError> {
        self.insert(capabilities.instance(Arc::new(config)))
    }

    /// Can optionally add a config to the registry.
    ///
    /// If the config provided is `Some(T)`, it will be the same as calling [`ConfigProvider::add_config`]
    /// If the config provided is `None`, then the function just returns `Ok(self)` for chaining
    pub fn maybe_add_config<T: Injectable>(
        &mut self,
        config: Option<T>,
    ) -> Result<&mut Self, ConfigError> {
        match config {
            Some(c) => self.add_config(c),
            None => Ok(self),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Freezes all configs into an initialized container, in registration order
    pub fn into_container(mut self) -> Result<Container, ConfigError> {
        let builder = self
            .order
            .iter()
            .filter_map(|type_id| self.configs.remove(type_id))
            .fold(Container::builder(), |builder, config| {
                builder.add_instance(config)
            });

        let container = builder.build()?;
        container.initialize()?;
        debug!("Config container holds {} configs", container.components().len());
        Ok(container)
    }

    fn insert(&mut self, config: Instance) -> Result<&mut Self, ConfigError> {
        let type_id = config.info.type_id;
        if self.configs.contains_key(&type_id) {
            return Err(ConfigError::ConfigAlreadyRegistered(config.info));
        }

        self.configs.insert(type_id, config);
        self.order.push(type_id);
        Ok(self)
    }
}
