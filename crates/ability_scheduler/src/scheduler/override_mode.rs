//! Override modes (single slot)
//!
//! Override временно подменяет swappable группу (например ultimate mode).
//! Reset masks определяют какие группы force-stop'ятся при входе/выходе.

use serde::{Deserialize, Serialize};

use crate::ability::AbilityRef;

bitflags::bitflags! {
    /// Bit flags над группами abilities (в RON пишутся числом: `reset_mask: 3`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(from = "u8", into = "u8")]
    pub struct ResetMask: u8 {
        const NONE = 0;
        const BASE = 1 << 0;
        const SWAPPABLE = 1 << 1;
        const ALL = Self::BASE.bits() | Self::SWAPPABLE.bits();
    }
}

impl Default for ResetMask {
    fn default() -> Self {
        Self::SWAPPABLE
    }
}

/// Неизвестные биты отбрасываются
impl From<u8> for ResetMask {
    fn from(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl From<ResetMask> for u8 {
    fn from(mask: ResetMask) -> Self {
        mask.bits()
    }
}

/// Override mode: список abilities для swappable группы + masks
#[derive(Debug, Clone)]
pub struct AbilityOverrideMode {
    pub name: String,
    pub abilities: Vec<AbilityRef>,
    /// Что force-stop'ить при входе
    pub reset_mask: ResetMask,
    /// Что force-stop'ить при выходе
    pub exit_reset_mask: ResetMask,
}

impl AbilityOverrideMode {
    pub fn new(name: impl Into<String>, abilities: Vec<AbilityRef>) -> Self {
        Self {
            name: name.into(),
            abilities,
            reset_mask: ResetMask::SWAPPABLE,
            exit_reset_mask: ResetMask::SWAPPABLE,
        }
    }

    pub fn with_masks(mut self, reset_mask: ResetMask, exit_reset_mask: ResetMask) -> Self {
        self.reset_mask = reset_mask;
        self.exit_reset_mask = exit_reset_mask;
        self
    }
}
