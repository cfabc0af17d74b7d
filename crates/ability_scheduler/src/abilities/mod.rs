//! Built-in abilities (payloads поверх `Agent`)
//!
//! Scheduler про них ничего не знает — это просто `AbilityBehavior`
//! реализации, которые authoring (`AbilityKind`) умеет собирать.

use bevy::prelude::*;

use crate::ability::routine::{self, Step};
use crate::ability::{Ability, AbilityBehavior, AbilityContext, BoxedRoutine};

// ============================================================================
// Dash
// ============================================================================

/// Импульс вдоль направления взгляда, ability завершается на следующем тике
#[derive(Debug, Clone)]
pub struct DashAbility {
    pub force: f32,
}

impl Default for DashAbility {
    fn default() -> Self {
        Self { force: 10.0 }
    }
}

impl AbilityBehavior for DashAbility {
    fn activate(&self, _ability: &Ability) -> BoxedRoutine {
        let force = self.force;
        routine::sequence(vec![
            routine::invoke(move |ctx: &mut AbilityContext<'_>| {
                // агент мог быть отцеплен посреди активации
                let Some(agent) = ctx.agent_mut() else {
                    return Ok(());
                };
                agent.cancel_gravity();
                let impulse = agent.look_direction() * force;
                agent.apply_impulse(impulse);
                Ok(())
            }),
            routine::next_tick(),
        ])
    }

    fn requires_agent(&self) -> bool {
        true
    }
}

// ============================================================================
// Grapple
// ============================================================================

/// Blackboard grapple'а
#[derive(Debug, Default, Clone)]
pub struct GrappleState {
    /// None до raycast'а
    pub target: Option<Vec3>,
    pub resolved: bool,
}

/// Raycast к anchor → тянем агента каждый тик до `stop_distance`
#[derive(Debug, Clone)]
pub struct GrappleAbility {
    pub max_distance: f32,
    pub pull_force: f32,
    pub stop_distance: f32,
}

impl Default for GrappleAbility {
    fn default() -> Self {
        Self {
            max_distance: 30.0,
            pull_force: 50.0,
            stop_distance: 1.5,
        }
    }
}

impl AbilityBehavior for GrappleAbility {
    fn activate(&self, _ability: &Ability) -> BoxedRoutine {
        let settings = self.clone();
        routine::from_fn(move |ctx: &mut AbilityContext<'_>| {
            let id = ctx.ability.id.clone();
            let Some(agent) = ctx.agent.as_deref() else {
                return Ok(Step::Finished);
            };
            let position = agent.position();
            let hit = agent.raycast(position, agent.look_direction(), settings.max_distance);

            let Some(state) = ctx.blackboard::<GrappleState>() else {
                return Ok(Step::Finished);
            };
            if !state.resolved {
                state.resolved = true;
                state.target = hit;
                if hit.is_none() {
                    crate::log(&format!("Grapple '{}': no target hit", id));
                }
            }

            let Some(target) = state.target else {
                return Ok(Step::Finished);
            };

            if position.distance_squared(target) <= settings.stop_distance * settings.stop_distance {
                return Ok(Step::Finished);
            }

            let pull = (target - position).normalize_or_zero() * settings.pull_force * ctx.delta;
            if let Some(agent) = ctx.agent_mut() {
                agent.apply_impulse(pull);
            }
            Ok(Step::Suspended)
        })
    }

    fn requires_agent(&self) -> bool {
        true
    }

    fn on_cancel(&self, ctx: &mut AbilityContext<'_>) {
        let target = ctx.blackboard::<GrappleState>().and_then(|state| state.target);
        crate::log(&format!(
            "Grapple '{}' released early (target: {:?})",
            ctx.ability.id, target
        ));
    }
}

// ============================================================================
// Ultimate
// ============================================================================

/// Time-boxed активация на nominal duration (override mode держит extension)
#[derive(Debug, Clone, Default)]
pub struct UltimateAbility;

impl AbilityBehavior for UltimateAbility {
    fn activate(&self, ability: &Ability) -> BoxedRoutine {
        routine::wait_seconds(ability.duration())
    }
}
