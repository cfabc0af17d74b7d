//! Scheduler configuration

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Параметры AbilitySystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct AbilitySystemConfig {
    /// Максимальный возраст buffered press (секунды)
    pub input_buffer_time: f32,
    /// Количество base слотов
    pub base_slot_count: usize,
    /// Количество swappable слотов
    pub swappable_slot_count: usize,
    /// Опрашивать slot actions агента каждый тик (press → request слота)
    pub slot_input: bool,
    /// Diagnostic логи (already running / on cooldown / dropped)
    pub debug: bool,
}

impl Default for AbilitySystemConfig {
    fn default() -> Self {
        Self {
            input_buffer_time: 0.08, // ~5 тиков при 60Hz
            base_slot_count: 4,
            swappable_slot_count: 4,
            slot_input: true,
            debug: false,
        }
    }
}
