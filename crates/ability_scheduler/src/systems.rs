//! Bevy surface: events + FixedUpdate systems
//!
//! Flow:
//! - Input layer → `AbilityRequest` event (по ability id или слоту)
//! - `apply_ability_requests` → `AbilitySystem::request_ability`
//! - `tick_ability_systems` → один тик каждого scheduler'а (Time<Fixed>)
//! - `publish_ability_runs` → `AbilityRun` events для UI/slot layer

use bevy::prelude::*;

use crate::ability::AbilityId;
use crate::scheduler::{AbilityGroup, AbilitySystem};

/// Куда направлен request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestTarget {
    Ability(AbilityId),
    Slot { group: AbilityGroup, index: usize },
}

/// Event: input layer хочет активировать ability (Input → ECS)
#[derive(Event, Debug, Clone)]
pub struct AbilityRequest {
    /// Entity с `AbilitySystem`
    pub agent: Entity,
    pub target: RequestTarget,
    /// Priority в input buffer
    pub weight: i32,
}

/// Event: ability прошла admission и запустилась (ECS → UI)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct AbilityRun {
    pub agent: Entity,
    pub ability: AbilityId,
    /// Тик scheduler'а агента
    pub tick: u64,
}

/// System: AbilityRequest events → scheduler
pub fn apply_ability_requests(
    mut requests: EventReader<AbilityRequest>,
    mut systems: Query<&mut AbilitySystem>,
) {
    for request in requests.read() {
        let Ok(mut system) = systems.get_mut(request.agent) else {
            crate::log(&format!(
                "AbilityRequest for {:?} ignored: no AbilitySystem",
                request.agent
            ));
            continue;
        };

        match &request.target {
            RequestTarget::Ability(id) => system.request_ability(id, request.weight),
            RequestTarget::Slot { group, index } => {
                let id = system.slot(*group, *index).map(|ability| ability.id.clone());
                if let Some(id) = id {
                    system.request_ability(&id, request.weight);
                }
            }
        }
    }
}

/// System: тик всех scheduler'ов
pub fn tick_ability_systems(mut systems: Query<&mut AbilitySystem>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for mut system in systems.iter_mut() {
        system.tick(delta);
    }
}

/// System: run events scheduler'ов → bevy events
pub fn publish_ability_runs(
    mut systems: Query<(Entity, &mut AbilitySystem)>,
    mut runs: EventWriter<AbilityRun>,
) {
    for (entity, mut system) in systems.iter_mut() {
        for event in system.drain_run_events() {
            runs.write(AbilityRun {
                agent: entity,
                ability: event.ability,
                tick: event.tick,
            });
        }
    }
}
