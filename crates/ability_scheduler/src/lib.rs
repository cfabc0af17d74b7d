//! Ability Scheduler
//!
//! Tick-driven activation scheduler для abilities агента:
//! lifecycle instances, cooldowns, input buffer (priority arbitration),
//! override modes (ultimate loadout swap), extensions.
//!
//! Архитектура:
//! - `AbilitySystem` — Component на агенте, вся логика синхронная и
//!   однопоточная (cooperative routines, один шаг за тик)
//! - Bevy = driver: FixedUpdate 60Hz, events на границах (input → request,
//!   run → UI)
//! - Эффекты abilities (impulse, grapple) — payloads через `Agent` trait

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

// Публичные модули
pub mod abilities;
pub mod ability;
pub mod agent;
pub mod extensions;
pub mod logger;
pub mod scheduler;
pub mod systems;

// Re-export основных типов
pub use ability::definition::{AbilityLoadout, LoadoutDefinition};
pub use ability::{
    Ability, AbilityBehavior, AbilityContext, AbilityDefinition, AbilityId, AbilityKind,
    AbilityRef, DefinitionError, RoutineFault, RuntimeState, Step,
};
pub use agent::{ActionInput, Agent, InputSource, KinematicAgent};
pub use extensions::{AbilityExtension, UltimateConfig, UltimateExtension};
pub use logger::{init_logger, log, log_error, log_info, log_warning};
pub use scheduler::{
    AbilityGroup, AbilityOverrideMode, AbilityRunEvent, AbilitySystem, AbilitySystemConfig,
    ResetMask, SchedulerCommands, SlotBinding, SlotView,
};
pub use systems::{AbilityRequest, AbilityRun, RequestTarget};

/// Plugin: events + scheduler systems в FixedUpdate
///
/// Порядок выполнения:
/// 1. apply_ability_requests: input events → input buffer / toggle cancel
/// 2. tick_ability_systems: один тик каждого AbilitySystem
/// 3. publish_ability_runs: AbilityRun events для UI
pub struct SchedulerPlugin;

impl Plugin for SchedulerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AbilityRequest>()
            .add_event::<AbilityRun>()
            .add_systems(
                FixedUpdate,
                (
                    systems::apply_ability_requests,
                    systems::tick_ability_systems,
                    systems::publish_ability_runs,
                )
                    .chain(), // Последовательное выполнение для детерминизма
            );
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Частота FixedUpdate (тиков scheduler'а в секунду)
pub const TICK_RATE_HZ: f64 = 60.0;

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время ручное: каждый `app.update()` = ровно один fixed tick
/// (кроме первого, он только запускает часы).
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(TICK_RATE_HZ))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / TICK_RATE_HZ,
        )))
        .add_plugins(SchedulerPlugin);

    app
}
