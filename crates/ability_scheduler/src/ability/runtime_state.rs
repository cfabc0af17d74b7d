//! RuntimeState / Blackboard — per-activation scratch storage.
//!
//! Создаётся заново при каждом `run_ability`, живёт пока жив AbilityInstance.
//! Ключ = AbilityId владельца, payload = любой `Default` тип.

use std::any::Any;
use std::collections::HashMap;

use super::AbilityId;

/// Ability-defined payloads (один entry на ability за активацию)
#[derive(Default)]
pub struct Blackboard {
    entries: HashMap<AbilityId, Box<dyn Any + Send + Sync>>,
}

impl Blackboard {
    /// Lazy доступ к payload владельца.
    ///
    /// Если под этим ключом лежит payload другого типа, он заменяется
    /// свежим `T::default()` (один entry на ability). `None` только если
    /// downcast после замены не удался.
    pub fn get_or_create<T>(&mut self, owner: &AbilityId) -> Option<&mut T>
    where
        T: Default + Send + Sync + 'static,
    {
        let slot = self
            .entries
            .entry(owner.clone())
            .or_insert_with(|| Box::new(T::default()));

        if !(**slot).is::<T>() {
            *slot = Box::new(T::default());
        }

        slot.downcast_mut::<T>()
    }

    pub fn get<T: 'static>(&self, owner: &AbilityId) -> Option<&T> {
        self.entries.get(owner)?.downcast_ref::<T>()
    }

    pub fn remove(&mut self, owner: &AbilityId) -> bool {
        self.entries.remove(owner).is_some()
    }

    pub fn contains(&self, owner: &AbilityId) -> bool {
        self.entries.contains_key(owner)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Runtime state одной активации
#[derive(Debug, Default)]
pub struct RuntimeState {
    pub blackboard: Blackboard,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::default()
    }
}
