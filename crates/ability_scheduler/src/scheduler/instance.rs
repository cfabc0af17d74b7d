//! Ability instances + cooldown tracker
//!
//! Cooldown хранится как абсолютный end-timestamp (`now + cooldown`),
//! а не countdown: пауза часов хоста не требует bookkeeping.
//! `cooldown_end == 0.0` = не на cooldown / сразу доступна.
//!
//! Timestamps в `f64` (длинные сессии), длительности и ответы UI в `f32`.

use std::collections::HashMap;

use crate::ability::{AbilityId, AbilityRef, BoxedRoutine, RuntimeState};

/// Runtime record одной ability (in-flight или cooling down)
pub struct AbilityInstance {
    pub ability: AbilityRef,
    /// Suspended routine (None после завершения/отмены)
    pub routine: Option<BoxedRoutine>,
    pub cooldown_end: f64,
    pub state: RuntimeState,
}

impl AbilityInstance {
    pub fn new(ability: AbilityRef, routine: BoxedRoutine) -> Self {
        Self {
            ability,
            routine: Some(routine),
            cooldown_end: 0.0,
            state: RuntimeState::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.routine.is_some()
    }

    /// Running и cooldown window ещё не выставлен (mid-activation)
    pub fn is_in_use(&self, now: f64) -> bool {
        self.is_running() && (self.cooldown_end == 0.0 || now >= self.cooldown_end)
    }

    pub fn is_cooling_down(&self, now: f64) -> bool {
        now < self.cooldown_end
    }

    /// Можно собирать: routine закончилась и cooldown истёк
    pub fn is_expired(&self, now: f64) -> bool {
        !self.is_running() && now >= self.cooldown_end
    }
}

impl std::fmt::Debug for AbilityInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbilityInstance")
            .field("ability", &self.ability.id)
            .field("running", &self.is_running())
            .field("cooldown_end", &self.cooldown_end)
            .finish()
    }
}

/// Active-instance table: не больше одного instance на ability
#[derive(Debug, Default)]
pub struct CooldownTracker {
    pub instances: HashMap<AbilityId, AbilityInstance>,
}

impl CooldownTracker {
    pub fn get(&self, id: &AbilityId) -> Option<&AbilityInstance> {
        self.instances.get(id)
    }

    pub fn get_mut(&mut self, id: &AbilityId) -> Option<&mut AbilityInstance> {
        self.instances.get_mut(id)
    }

    pub fn insert(&mut self, instance: AbilityInstance) {
        self.instances.insert(instance.ability.id.clone(), instance);
    }

    pub fn remove(&mut self, id: &AbilityId) -> Option<AbilityInstance> {
        self.instances.remove(id)
    }

    pub fn contains(&self, id: &AbilityId) -> bool {
        self.instances.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Snapshot ключей (итерация никогда не идёт по живой таблице)
    pub fn snapshot(&self) -> Vec<AbilityId> {
        let mut ids: Vec<_> = self.instances.keys().cloned().collect();
        // Детерминированный порядок обхода
        ids.sort();
        ids
    }

    /// Snapshot ability с живой routine
    pub fn running_snapshot(&self) -> Vec<AbilityId> {
        let mut ids: Vec<_> = self
            .instances
            .iter()
            .filter(|(_, instance)| instance.is_running())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn start_cooldown(&mut self, id: &AbilityId, now: f64) {
        if let Some(instance) = self.instances.get_mut(id) {
            instance.routine = None;
            instance.cooldown_end = now + f64::from(instance.ability.cooldown());
        }
    }

    pub fn reset_cooldown(&mut self, id: &AbilityId) {
        if let Some(instance) = self.instances.get_mut(id) {
            instance.cooldown_end = 0.0;
        }
    }

    /// Удаляет instances без routine с истёкшим cooldown, возвращает сколько удалено
    pub fn cleanup_expired(&mut self, now: f64) -> usize {
        let before = self.instances.len();
        self.instances.retain(|_, instance| !instance.is_expired(now));
        before - self.instances.len()
    }

    pub fn is_running(&self, id: &AbilityId) -> bool {
        self.instances.get(id).is_some_and(AbilityInstance::is_running)
    }

    pub fn is_in_use(&self, id: &AbilityId, now: f64) -> bool {
        self.instances.get(id).is_some_and(|instance| instance.is_in_use(now))
    }

    pub fn is_on_cooldown(&self, id: &AbilityId, now: f64) -> bool {
        self.instances
            .get(id)
            .is_some_and(|instance| instance.is_cooling_down(now))
    }

    pub fn is_available(&self, id: &AbilityId, now: f64) -> bool {
        match self.instances.get(id) {
            Some(instance) => {
                let cooling = instance.cooldown_end > 0.0 && instance.is_cooling_down(now);
                !instance.is_running() && !cooling
            }
            None => true,
        }
    }

    pub fn cooldown_remaining(&self, id: &AbilityId, now: f64) -> f32 {
        self.instances
            .get(id)
            .map_or(0.0, |instance| (instance.cooldown_end - now).max(0.0) as f32)
    }

    /// remaining / total, clamped к [0, 1] (0 для abilities без cooldown)
    pub fn cooldown_percent(&self, id: &AbilityId, now: f64) -> f32 {
        let Some(instance) = self.instances.get(id) else {
            return 0.0;
        };
        let total = instance.ability.cooldown();
        if total <= 0.0 {
            return 0.0;
        }
        ((instance.cooldown_end - now) / f64::from(total)).clamp(0.0, 1.0) as f32
    }
}
