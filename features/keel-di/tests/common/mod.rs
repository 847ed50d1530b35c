#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use keel_di::{Component, Container};

/// Shared event log, handed to components through a parent container
#[derive(Debug, Default)]
pub struct Journal(Mutex<Vec<String>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An initialized container holding nothing but a [Journal]
pub fn journal_container() -> (Container, Arc<Journal>) {
    let container = Container::builder()
        .instance(Journal::default())
        .build()
        .unwrap();
    container.initialize().unwrap();
    let journal = container.require::<Journal>().unwrap();
    (container, journal)
}

/// Type name without its module path
pub fn short_name(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

pub fn names(components: &[Component]) -> Vec<&'static str> {
    components
        .iter()
        .map(|component| short_name(component.type_info().type_name))
        .collect()
}
