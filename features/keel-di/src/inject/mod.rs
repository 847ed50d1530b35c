mod args;

pub use args::{MethodArg, MethodArgs};

use std::{
    any::type_name,
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock, Weak},
};

/// Dependency slot of a component
///
/// The container wires the slot while building. A slot keeps its value alive,
/// except for the field closing a cycle of dependency fields: that one holds a
/// weak reference, so field cycles do not leak.
///
/// ### Panics
///
/// [Injected::get] panics if:
/// - It is accessed before the container finished building
/// - It is a back reference whose target is gone
///
/// Use [Injected::try_get] where either may happen.
pub struct Injected<T: ?Sized>(RwLock<Option<Held<T>>>);

enum Held<T: ?Sized> {
    Strong(Arc<T>),
    Weak(Weak<T>),
}

impl<T: ?Sized> Default for Injected<T> {
    fn default() -> Self {
        Injected(RwLock::new(None))
    }
}

impl<T: ?Sized> Debug for Injected<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.try_get() {
            Some(_) if self.is_back_reference() => "weak",
            Some(_) => "wired",
            None if self.is_wired() => "dropped",
            None => "empty",
        };
        f.debug_tuple("Injected")
            .field(&type_name::<T>())
            .field(&state)
            .finish()
    }
}

impl<T: ?Sized> Injected<T> {
    /// Points the slot at `value` and keeps it alive, replacing a previous wiring
    pub fn assign(&self, value: &Arc<T>) {
        *self.slot_mut() = Some(Held::Strong(value.clone()));
    }

    /// Points the slot at `value` without keeping it alive
    pub fn assign_weak(&self, value: &Arc<T>) {
        *self.slot_mut() = Some(Held::Weak(Arc::downgrade(value)));
    }

    /// Try to access the dependency
    pub fn try_get(&self) -> Option<Arc<T>> {
        let slot = self.0.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref()? {
            Held::Strong(value) => Some(value.clone()),
            Held::Weak(value) => value.upgrade(),
        }
    }

    /// Accesses the dependency
    ///
    /// # Panics
    /// - When the slot was never wired, or it is a back reference to a dropped component
    pub fn get(&self) -> Arc<T> {
        match self.try_get() {
            Some(value) => value,
            None if self.is_wired() => panic!(
                "Injected<{}> back reference accessed after its target was dropped",
                type_name::<T>()
            ),
            None => panic!("Injected<{}> accessed before it was wired", type_name::<T>()),
        }
    }

    /// Whether the container assigned a value to this slot
    pub fn is_wired(&self) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Whether the slot holds its value weakly
    pub fn is_back_reference(&self) -> bool {
        matches!(
            *self.0.read().unwrap_or_else(PoisonError::into_inner),
            Some(Held::Weak(_))
        )
    }

    fn slot_mut(&self) -> std::sync::RwLockWriteGuard<'_, Option<Held<T>>> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}
