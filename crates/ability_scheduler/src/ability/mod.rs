//! Ability data model
//!
//! # Архитектура
//!
//! **Ability** — immutable descriptor (id + cooldown + duration + behavior):
//! - Шарится как `AbilityRef` (`Arc<Ability>`) между catalog, slots, override modes
//! - Identity = `AbilityId` (уникален в рамках одного scheduler'а)
//!
//! **AbilityBehavior** — pluggable activation routine + lifecycle hooks.
//! Scheduler только вызывает payload, эффекты (impulse, grapple, projectile)
//! живут в реализациях.
//!
//! **AbilityContext** — то, что видят routine и hooks: agent, blackboard,
//! deferred `SchedulerCommands` (единственный способ мутировать scheduler
//! изнутри hook'а).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod definition;
pub mod routine;
pub mod runtime_state;

pub use definition::{AbilityDefinition, AbilityKind, DefinitionError};
pub use routine::{BoxedRoutine, Routine, RoutineFault, RoutineResult, Step};
pub use runtime_state::{Blackboard, RuntimeState};

use crate::agent::{Agent, InputSource};
use crate::scheduler::SchedulerCommands;

// ============================================================================
// AbilityId
// ============================================================================

/// Stable ability key
///
/// # Examples
/// - "dash"
/// - "grapple"
/// - "ultimate"
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Reflect)]
#[serde(transparent)]
pub struct AbilityId(pub String);

impl From<&str> for AbilityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AbilityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for AbilityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// AbilityBehavior
// ============================================================================

/// Activation routine + lifecycle hooks
pub trait AbilityBehavior: Send + Sync {
    /// Новая routine для одной активации
    fn activate(&self, ability: &Ability) -> BoxedRoutine;

    fn on_start(&self, _ctx: &mut AbilityContext<'_>) {}

    /// Interruption (player cancel / toggle / StopAll без on_end)
    fn on_cancel(&self, _ctx: &mut AbilityContext<'_>) {}

    /// Нормальное завершение (перед стартом cooldown)
    fn on_end(&self, _ctx: &mut AbilityContext<'_>) {}

    /// User-defined eligibility (проверяется в `request_ability`)
    fn can_activate(&self, _agent: Option<&dyn Agent>) -> bool {
        true
    }

    /// Payload двигает агента: без агента активация тихо отклоняется
    fn requires_agent(&self) -> bool {
        false
    }
}

// ============================================================================
// Ability
// ============================================================================

/// Ability descriptor (externally authored, read-only в runtime)
pub struct Ability {
    pub id: AbilityId,
    /// Отображаемое имя
    pub name: String,
    /// Icon reference для slot UI
    pub icon: Option<String>,
    /// Custom input action (переопределяет action слота)
    pub action_name: Option<String>,
    cooldown: f32,
    duration: f32,
    behavior: Arc<dyn AbilityBehavior>,
}

pub type AbilityRef = Arc<Ability>;

impl Ability {
    pub fn new(id: impl Into<AbilityId>, behavior: impl AbilityBehavior + 'static) -> Self {
        Self::with_behavior(id, Arc::new(behavior))
    }

    pub fn with_behavior(id: impl Into<AbilityId>, behavior: Arc<dyn AbilityBehavior>) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            icon: None,
            action_name: None,
            cooldown: 0.0,
            duration: 0.0,
            behavior,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action_name = Some(action.into());
        self
    }

    /// Cooldown (секунды, отрицательные значения → 0)
    pub fn with_cooldown(mut self, cooldown: f32) -> Self {
        self.cooldown = cooldown.max(0.0);
        self
    }

    /// Nominal duration (секунды) для time-boxed активаций
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    pub fn into_ref(self) -> AbilityRef {
        Arc::new(self)
    }

    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn custom_action(&self) -> Option<&str> {
        self.action_name.as_deref().filter(|action| !action.is_empty())
    }

    pub fn behavior(&self) -> &dyn AbilityBehavior {
        self.behavior.as_ref()
    }
}

impl fmt::Debug for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ability")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cooldown", &self.cooldown)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AbilityContext
// ============================================================================

/// Контекст одного вызова routine/hook
pub struct AbilityContext<'a> {
    pub ability: &'a Ability,
    pub agent: Option<&'a mut (dyn Agent + 'static)>,
    pub state: &'a mut RuntimeState,
    /// Deferred мутации scheduler'а (применяются после текущей операции)
    pub commands: &'a mut SchedulerCommands,
    /// Время симуляции (секунды)
    pub now: f64,
    /// Длительность текущего тика (0 для hooks вне тика)
    pub delta: f32,
    pub tick: u64,
}

impl<'a> AbilityContext<'a> {
    pub fn agent(&self) -> Option<&dyn Agent> {
        self.agent.as_deref().map(|agent| agent as &dyn Agent)
    }

    pub fn agent_mut(&mut self) -> Option<&mut (dyn Agent + 'static)> {
        self.agent.as_deref_mut()
    }

    pub fn input_mut(&mut self) -> Option<&mut dyn InputSource> {
        self.agent.as_deref_mut()?.input_mut()
    }

    /// Blackboard payload этой ability (lazy)
    pub fn blackboard<T>(&mut self) -> Option<&mut T>
    where
        T: Default + Send + Sync + 'static,
    {
        self.state.blackboard.get_or_create::<T>(&self.ability.id)
    }
}
