//! Ultimate extension
//!
//! Flow:
//! 1. `handle()`: trigger action нажат → ultimate ability в input buffer
//!    с высоким priority (перебивает обычные presses того же окна)
//! 2. run event для ultimate → вход в override mode + observation
//! 3. observation: пока ultimate "in use" — ждём, потом выходим из override
//!
//! Extension видит только публичный контракт scheduler'а.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AbilityExtension;
use crate::ability::AbilityRef;
use crate::scheduler::{AbilityOverrideMode, AbilityRunEvent, AbilitySystem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UltimateConfig {
    pub enabled: bool,
    /// Input action, который триггерит ultimate
    pub trigger_action: String,
    /// Priority в input buffer
    pub priority: i32,
}

impl Default for UltimateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_action: "Ultimate".to_string(),
            priority: 100,
        }
    }
}

pub struct UltimateExtension {
    config: UltimateConfig,
    ability: AbilityRef,
    mode: Arc<AbilityOverrideMode>,
    /// Override активен и ждёт окончания ultimate
    observing: bool,
}

impl UltimateExtension {
    pub fn new(ability: AbilityRef, mode: Arc<AbilityOverrideMode>) -> Self {
        Self {
            config: UltimateConfig::default(),
            ability,
            mode,
            observing: false,
        }
    }

    pub fn with_config(mut self, config: UltimateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    fn queue_ultimate(&self, system: &mut AbilitySystem) {
        system.queue_ability(&self.ability.id, self.config.priority);
    }

    fn on_start(&mut self, system: &mut AbilitySystem) {
        system.enter_override_mode(Arc::clone(&self.mode));
        // повторный старт перезапускает observation
        self.observing = true;
    }

    fn on_end(&mut self, system: &mut AbilitySystem) {
        self.observing = false;
        // override мог смениться чужим, его не трогаем
        let owns_override = system
            .current_override()
            .is_some_and(|current| Arc::ptr_eq(current, &self.mode));
        if owns_override {
            system.exit_override_mode();
        }
    }
}

impl AbilityExtension for UltimateExtension {
    fn name(&self) -> &str {
        "ultimate"
    }

    fn initialize(&mut self, system: &mut AbilitySystem) {
        system.register_ability(Arc::clone(&self.ability));
    }

    fn on_ability_run(&mut self, system: &mut AbilitySystem, event: &AbilityRunEvent) {
        if event.ability == self.ability.id {
            self.on_start(system);
        }
    }

    fn handle(&mut self, system: &mut AbilitySystem) {
        if self.observing && !system.is_ability_in_use(&self.ability.id) {
            self.on_end(system);
        }

        if !self.config.enabled {
            return;
        }

        let triggered = system
            .input_mut()
            .is_some_and(|input| input.consume_pressed(&self.config.trigger_action));
        if triggered {
            self.queue_ultimate(system);
        }
    }

    fn dispose(&mut self, _system: &mut AbilitySystem) {
        self.observing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::UltimateAbility;
    use crate::ability::{Ability, AbilityId};
    use crate::agent::KinematicAgent;
    use crate::scheduler::test_support::{long_probe, DT};
    use crate::scheduler::AbilityGroup;

    fn ultimate_system(config: UltimateConfig) -> AbilitySystem {
        let ultimate = Ability::new("ultimate", UltimateAbility)
            .with_cooldown(5.0)
            .with_duration(0.5)
            .into_ref();
        let (grapple, _) = long_probe("grapple", 2.0);
        let (overdrive_dash, _) = long_probe("overdrive_dash", 0.5);
        let mode = Arc::new(AbilityOverrideMode::new("overdrive", vec![overdrive_dash]));

        let mut system = AbilitySystem::default()
            .with_agent(KinematicAgent::default())
            .with_extension(UltimateExtension::new(ultimate, mode).with_config(config));
        system.set_swappable_abilities(vec![grapple]);
        system
    }

    fn press(system: &mut AbilitySystem, action: &str) {
        if let Some(input) = system.input_mut() {
            input.press(action);
        }
    }

    fn swappable_slot(system: &AbilitySystem) -> Option<AbilityId> {
        system
            .slot(AbilityGroup::Swappable, 0)
            .map(|ability| ability.id.clone())
    }

    #[test]
    fn test_trigger_enters_and_leaves_override() {
        let mut system = ultimate_system(UltimateConfig::default());
        let ultimate = AbilityId::from("ultimate");

        press(&mut system, "Ultimate");
        // press → buffer
        system.tick(DT);
        assert_eq!(system.buffered_inputs().len(), 1);
        assert_eq!(system.buffered_inputs()[0].priority, 100);

        // buffer → run → override
        system.tick(DT);
        assert!(system.is_ability_running(&ultimate));
        assert_eq!(
            system.current_override().map(|mode| mode.name.as_str()),
            Some("overdrive")
        );
        assert_eq!(swappable_slot(&system), Some(AbilityId::from("overdrive_dash")));

        // duration 0.5s + один тик на observation
        for _ in 0..40 {
            system.tick(DT);
        }
        assert!(system.current_override().is_none());
        assert_eq!(swappable_slot(&system), Some(AbilityId::from("grapple")));
        assert!(system.is_on_cooldown(&ultimate));
    }

    #[test]
    fn test_disabled_trigger_is_ignored() {
        let config = UltimateConfig {
            enabled: false,
            ..Default::default()
        };
        let mut system = ultimate_system(config);

        press(&mut system, "Ultimate");
        system.tick(DT);
        system.tick(DT);

        assert!(system.buffered_inputs().is_empty());
        assert!(!system.is_ability_running(&AbilityId::from("ultimate")));
        assert!(system.current_override().is_none());
    }

    #[test]
    fn test_manual_run_also_enters_override() {
        let mut system = ultimate_system(UltimateConfig::default());
        system.tick(DT);

        assert!(system.run_ability(&AbilityId::from("ultimate")));
        system.tick(DT);

        assert!(system.current_override().is_some());
    }

    #[test]
    fn test_cancelled_ultimate_exits_override() {
        let mut system = ultimate_system(UltimateConfig::default());
        let ultimate = AbilityId::from("ultimate");
        system.tick(DT);
        system.run_ability(&ultimate);
        system.tick(DT);
        assert!(system.current_override().is_some());

        system.cancel_ability(&ultimate);
        system.tick(DT);

        assert!(system.current_override().is_none());
        assert!(system.is_ability_available(&ultimate));
    }

    #[test]
    fn test_ending_ultimate_keeps_foreign_override() {
        let mut system = ultimate_system(UltimateConfig::default());
        let ultimate = AbilityId::from("ultimate");
        system.tick(DT);
        system.run_ability(&ultimate);
        system.tick(DT);

        // другой override вытесняет overdrive, пока ultimate ещё идёт
        let (claws, _) = long_probe("claws", 0.5);
        system.enter_override_mode(Arc::new(AbilityOverrideMode::new("beast", vec![claws])));

        for _ in 0..40 {
            system.tick(DT);
        }
        assert!(system.is_on_cooldown(&ultimate));
        assert_eq!(
            system.current_override().map(|mode| mode.name.as_str()),
            Some("beast")
        );
        assert_eq!(swappable_slot(&system), Some(AbilityId::from("claws")));
    }
}
