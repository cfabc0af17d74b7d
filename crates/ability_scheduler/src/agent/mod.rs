//! Agent collaborator — то, над чем abilities выполняют свои payloads.
//!
//! Scheduler не знает про физику: movement impulses, raycasts и input
//! приходят через узкий `Agent` trait. `KinematicAgent` — минимальная
//! реализация для headless симуляции и тестов.

use bevy::prelude::*;

pub mod input;

pub use input::{ActionInput, ActionSignal, InputSource};

/// Agent contract (player controller / NPC body)
pub trait Agent: Send + Sync {
    fn input(&self) -> Option<&dyn InputSource>;

    fn input_mut(&mut self) -> Option<&mut dyn InputSource>;

    fn position(&self) -> Vec3 {
        Vec3::ZERO
    }

    /// Направление взгляда (normalized)
    fn look_direction(&self) -> Vec3 {
        Vec3::NEG_Z
    }

    fn apply_impulse(&mut self, _impulse: Vec3) {}

    fn cancel_gravity(&mut self) {}

    /// Первая точка попадания луча в пределах `max_distance`
    fn raycast(&self, _origin: Vec3, _direction: Vec3, _max_distance: f32) -> Option<Vec3> {
        None
    }

    /// Вызывается scheduler'ом в конце каждого тика
    fn end_tick(&mut self, _delta: f32) {}
}

/// Simple kinematic body: position + velocity + gravity, без коллизий.
///
/// Raycast проверяет только заранее размеченные `anchors` (grapple points).
#[derive(Debug, Clone)]
pub struct KinematicAgent {
    pub position: Vec3,
    pub velocity: Vec3,
    pub look_direction: Vec3,
    pub gravity: f32,
    pub gravity_enabled: bool,
    /// Радиус попадания луча в anchor (метры)
    pub anchor_radius: f32,
    pub anchors: Vec<Vec3>,
    pub input: ActionInput,
}

impl Default for KinematicAgent {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            look_direction: Vec3::NEG_Z,
            gravity: 9.81,
            gravity_enabled: true,
            anchor_radius: 0.5,
            anchors: Vec::new(),
            input: ActionInput::new(),
        }
    }
}

impl KinematicAgent {
    pub fn with_anchor(mut self, anchor: Vec3) -> Self {
        self.anchors.push(anchor);
        self
    }
}

impl Agent for KinematicAgent {
    fn input(&self) -> Option<&dyn InputSource> {
        Some(&self.input)
    }

    fn input_mut(&mut self) -> Option<&mut dyn InputSource> {
        Some(&mut self.input)
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn look_direction(&self) -> Vec3 {
        self.look_direction.normalize_or_zero()
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        self.velocity += impulse;
    }

    fn cancel_gravity(&mut self) {
        self.velocity.y = self.velocity.y.max(0.0);
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Vec3> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }

        self.anchors
            .iter()
            .filter_map(|anchor| {
                let along = (*anchor - origin).dot(direction);
                if along < 0.0 || along > max_distance {
                    return None;
                }
                let closest = origin + direction * along;
                (closest.distance(*anchor) <= self.anchor_radius).then_some((along, *anchor))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, anchor)| anchor)
    }

    fn end_tick(&mut self, delta: f32) {
        if self.gravity_enabled {
            self.velocity.y -= self.gravity * delta;
        }
        self.position += self.velocity * delta;
        self.input.end_tick();
    }
}
