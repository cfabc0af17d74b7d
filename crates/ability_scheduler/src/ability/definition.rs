//! Authoring schema (RON)
//!
//! # Архитектура
//!
//! **AbilityDefinition** — externally authored descriptor:
//! id + display metadata + cooldown/duration (>= 0) + `AbilityKind`.
//! `build()` валидирует и собирает `AbilityRef` с built-in behavior.
//!
//! **LoadoutDefinition** — полный набор для одного агента:
//! config, abilities, base/swappable списки, slot bindings, override modes, ultimate.
//!
//! # Пример
//!
//! ```ron
//! (
//!     abilities: [
//!         (id: "dash", cooldown: 2.0, kind: Dash(force: 12.0)),
//!     ],
//!     base: ["dash"],
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::{Ability, AbilityBehavior, AbilityId, AbilityRef};
use crate::abilities::{DashAbility, GrappleAbility, UltimateAbility};
use crate::extensions::{UltimateConfig, UltimateExtension};
use crate::scheduler::{
    AbilityGroup, AbilityOverrideMode, AbilitySystem, AbilitySystemConfig, ResetMask, SlotBinding,
};

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("failed to parse definition: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("ability '{id}': {field} must be >= 0 (got {value})")]
    NegativeTiming {
        id: AbilityId,
        field: &'static str,
        value: f32,
    },

    #[error("duplicate ability id '{0}'")]
    DuplicateAbility(AbilityId),

    #[error("{context} references unknown ability '{id}'")]
    UnknownAbility { context: String, id: AbilityId },

    #[error("ultimate references unknown override mode '{0}'")]
    UnknownOverride(String),

    #[error("binding for {group:?} slot {index} is out of range ({count} slots)")]
    UnknownSlot {
        group: AbilityGroup,
        index: usize,
        count: usize,
    },
}

// ============================================================================
// AbilityDefinition
// ============================================================================

/// Activation routine, которую собирает authoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbilityKind {
    Dash {
        #[serde(default = "default_dash_force")]
        force: f32,
    },
    Grapple {
        #[serde(default = "default_grapple_distance")]
        max_distance: f32,
        #[serde(default = "default_grapple_pull")]
        pull_force: f32,
        #[serde(default = "default_grapple_stop")]
        stop_distance: f32,
    },
    Ultimate,
}

fn default_dash_force() -> f32 {
    10.0
}

fn default_grapple_distance() -> f32 {
    30.0
}

fn default_grapple_pull() -> f32 {
    50.0
}

fn default_grapple_stop() -> f32 {
    1.5
}

fn default_cooldown() -> f32 {
    2.0
}

impl AbilityKind {
    fn behavior(&self) -> Arc<dyn AbilityBehavior> {
        match self {
            AbilityKind::Dash { force } => Arc::new(DashAbility { force: *force }),
            AbilityKind::Grapple {
                max_distance,
                pull_force,
                stop_distance,
            } => Arc::new(GrappleAbility {
                max_distance: *max_distance,
                pull_force: *pull_force,
                stop_distance: *stop_distance,
            }),
            AbilityKind::Ultimate => Arc::new(UltimateAbility),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub id: AbilityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default = "default_cooldown")]
    pub cooldown: f32,
    #[serde(default)]
    pub duration: f32,
    pub kind: AbilityKind,
}

impl AbilityDefinition {
    pub fn build(&self) -> Result<AbilityRef, DefinitionError> {
        for (field, value) in [("cooldown", self.cooldown), ("duration", self.duration)] {
            if value.is_nan() || value < 0.0 {
                return Err(DefinitionError::NegativeTiming {
                    id: self.id.clone(),
                    field,
                    value,
                });
            }
        }

        let mut ability = Ability::with_behavior(self.id.clone(), self.kind.behavior())
            .with_cooldown(self.cooldown)
            .with_duration(self.duration);
        if let Some(name) = &self.name {
            ability = ability.named(name.clone());
        }
        if let Some(icon) = &self.icon {
            ability = ability.with_icon(icon.clone());
        }
        if let Some(action) = &self.action_name {
            ability = ability.with_action(action.clone());
        }

        Ok(ability.into_ref())
    }
}

// ============================================================================
// LoadoutDefinition
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideModeDefinition {
    pub name: String,
    pub abilities: Vec<AbilityId>,
    #[serde(default)]
    pub reset_mask: ResetMask,
    #[serde(default)]
    pub exit_reset_mask: ResetMask,
}

/// Input binding слота (`group` + `index` → action)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotBindingDefinition {
    pub group: AbilityGroup,
    pub index: usize,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub ability_overrides_action: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UltimateDefinition {
    pub ability: AbilityId,
    /// Имя override mode из `overrides`
    pub mode: String,
    #[serde(default)]
    pub config: UltimateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadoutDefinition {
    #[serde(default)]
    pub config: AbilitySystemConfig,
    pub abilities: Vec<AbilityDefinition>,
    #[serde(default)]
    pub base: Vec<AbilityId>,
    #[serde(default)]
    pub swappable: Vec<AbilityId>,
    #[serde(default)]
    pub bindings: Vec<SlotBindingDefinition>,
    #[serde(default)]
    pub overrides: Vec<OverrideModeDefinition>,
    #[serde(default)]
    pub ultimate: Option<UltimateDefinition>,
}

/// Собранный loadout (готов к `into_system`)
#[derive(Debug)]
pub struct AbilityLoadout {
    pub config: AbilitySystemConfig,
    pub abilities: HashMap<AbilityId, AbilityRef>,
    pub base: Vec<AbilityRef>,
    pub swappable: Vec<AbilityRef>,
    pub bindings: Vec<(AbilityGroup, usize, SlotBinding)>,
    pub overrides: HashMap<String, Arc<AbilityOverrideMode>>,
    pub ultimate: Option<(AbilityRef, Arc<AbilityOverrideMode>, UltimateConfig)>,
}

impl LoadoutDefinition {
    pub fn from_ron(source: &str) -> Result<Self, DefinitionError> {
        Ok(ron::from_str(source)?)
    }

    pub fn build(&self) -> Result<AbilityLoadout, DefinitionError> {
        let mut abilities = HashMap::new();
        for definition in &self.abilities {
            if abilities.contains_key(&definition.id) {
                return Err(DefinitionError::DuplicateAbility(definition.id.clone()));
            }
            abilities.insert(definition.id.clone(), definition.build()?);
        }

        let resolve = |context: &str, ids: &[AbilityId]| -> Result<Vec<AbilityRef>, DefinitionError> {
            ids.iter()
                .map(|id| {
                    abilities
                        .get(id)
                        .cloned()
                        .ok_or_else(|| DefinitionError::UnknownAbility {
                            context: context.to_string(),
                            id: id.clone(),
                        })
                })
                .collect()
        };

        let base = resolve("base group", &self.base)?;
        let swappable = resolve("swappable group", &self.swappable)?;

        let mut bindings = Vec::with_capacity(self.bindings.len());
        for definition in &self.bindings {
            let count = match definition.group {
                AbilityGroup::Base => self.config.base_slot_count,
                AbilityGroup::Swappable => self.config.swappable_slot_count,
            };
            if definition.index >= count {
                return Err(DefinitionError::UnknownSlot {
                    group: definition.group,
                    index: definition.index,
                    count,
                });
            }
            let binding = SlotBinding {
                action: definition.action.clone(),
                ability_overrides_action: definition.ability_overrides_action,
            };
            bindings.push((definition.group, definition.index, binding));
        }

        let mut overrides = HashMap::new();
        for definition in &self.overrides {
            let context = format!("override mode '{}'", definition.name);
            let mode = AbilityOverrideMode::new(
                definition.name.clone(),
                resolve(&context, &definition.abilities)?,
            )
            .with_masks(definition.reset_mask, definition.exit_reset_mask);
            overrides.insert(definition.name.clone(), Arc::new(mode));
        }

        let ultimate = match &self.ultimate {
            Some(definition) => {
                let ability = abilities.get(&definition.ability).cloned().ok_or_else(|| {
                    DefinitionError::UnknownAbility {
                        context: "ultimate".to_string(),
                        id: definition.ability.clone(),
                    }
                })?;
                let mode = overrides
                    .get(&definition.mode)
                    .cloned()
                    .ok_or_else(|| DefinitionError::UnknownOverride(definition.mode.clone()))?;
                Some((ability, mode, definition.config.clone()))
            }
            None => None,
        };

        Ok(AbilityLoadout {
            config: self.config.clone(),
            abilities,
            base,
            swappable,
            bindings,
            overrides,
            ultimate,
        })
    }
}

impl AbilityLoadout {
    /// Собирает AbilitySystem (без агента)
    pub fn into_system(self) -> AbilitySystem {
        let mut system = AbilitySystem::new(self.config);

        // детерминированный порядок регистрации
        let mut abilities: Vec<_> = self.abilities.into_values().collect();
        abilities.sort_by(|a, b| a.id.cmp(&b.id));
        for ability in abilities {
            system.register_ability(ability);
        }

        system.set_base_abilities(self.base);
        system.set_swappable_abilities(self.swappable);
        for (group, index, binding) in self.bindings {
            system.bind_slot(group, index, binding);
        }

        if let Some((ability, mode, config)) = self.ultimate {
            system = system.with_extension(UltimateExtension::new(ability, mode).with_config(config));
        }

        system
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOADOUT: &str = r#"
        (
            config: (base_slot_count: 2, swappable_slot_count: 2),
            abilities: [
                (id: "dash", cooldown: 2.0, kind: Dash(force: 12.0)),
                (id: "grapple", icon: Some("grapple.png"), action_name: Some("Hook"), cooldown: 4.0, kind: Grapple()),
                (id: "overdrive_dash", cooldown: 0.5, kind: Dash()),
                (id: "ultimate", cooldown: 15.0, duration: 6.0, kind: Ultimate),
            ],
            base: ["dash"],
            swappable: ["grapple"],
            bindings: [
                (group: Base, index: 0, action: Some("Dash")),
                (group: Swappable, index: 0, ability_overrides_action: true),
            ],
            overrides: [
                (name: "overdrive", abilities: ["overdrive_dash"], reset_mask: 3),
            ],
            ultimate: Some((ability: "ultimate", mode: "overdrive")),
        )
    "#;

    #[test]
    fn test_loadout_from_ron() {
        let definition = LoadoutDefinition::from_ron(LOADOUT).unwrap();
        assert_eq!(definition.abilities.len(), 4);
        assert_eq!(
            definition.abilities[0].kind,
            AbilityKind::Dash { force: 12.0 }
        );
        assert_eq!(
            definition.abilities[1].kind,
            AbilityKind::Grapple {
                max_distance: 30.0,
                pull_force: 50.0,
                stop_distance: 1.5,
            }
        );
        assert_eq!(definition.overrides[0].reset_mask, ResetMask::BASE | ResetMask::SWAPPABLE);
        // exit mask не указан → default
        assert_eq!(definition.overrides[0].exit_reset_mask, ResetMask::SWAPPABLE);

        let ultimate = definition.ultimate.as_ref().unwrap();
        assert_eq!(ultimate.config, UltimateConfig::default());
    }

    #[test]
    fn test_loadout_builds_system() {
        let loadout = LoadoutDefinition::from_ron(LOADOUT).unwrap().build().unwrap();
        assert_eq!(loadout.abilities.len(), 4);
        assert!(loadout.overrides.contains_key("overdrive"));

        let system = loadout.into_system();
        assert_eq!(system.config().base_slot_count, 2);
        assert_eq!(system.extension_count(), 1);
        assert_eq!(
            system.slot(AbilityGroup::Base, 0).map(|ability| ability.id.clone()),
            Some(AbilityId::from("dash"))
        );

        assert_eq!(system.slot_action(AbilityGroup::Base, 0).as_deref(), Some("Dash"));
        // custom action grapple'а перекрывает "Ability3"
        assert_eq!(system.slot_action(AbilityGroup::Swappable, 0).as_deref(), Some("Hook"));

        let grapple = system.ability(&AbilityId::from("grapple")).unwrap();
        assert_eq!(grapple.cooldown(), 4.0);
        assert_eq!(grapple.icon.as_deref(), Some("grapple.png"));
        assert!(system.is_registered(&AbilityId::from("ultimate")));
    }

    #[test]
    fn test_negative_timing_is_rejected() {
        let definition = AbilityDefinition {
            id: AbilityId::from("dash"),
            name: None,
            icon: None,
            action_name: None,
            cooldown: -1.0,
            duration: 0.0,
            kind: AbilityKind::Dash { force: 10.0 },
        };

        let err = definition.build().unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::NegativeTiming { field: "cooldown", .. }
        ));
    }

    #[test]
    fn test_unknown_group_member_is_rejected() {
        let source = r#"(
            abilities: [(id: "dash", kind: Dash())],
            base: ["dash", "teleport"],
        )"#;

        let err = LoadoutDefinition::from_ron(source).unwrap().build().unwrap_err();
        match err {
            DefinitionError::UnknownAbility { id, .. } => assert_eq!(id, AbilityId::from("teleport")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let source = r#"(
            abilities: [
                (id: "dash", kind: Dash()),
                (id: "dash", kind: Ultimate),
            ],
        )"#;

        let err = LoadoutDefinition::from_ron(source).unwrap().build().unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateAbility(_)));
    }

    #[test]
    fn test_unknown_override_is_rejected() {
        let source = r#"(
            abilities: [(id: "ultimate", kind: Ultimate)],
            ultimate: Some((ability: "ultimate", mode: "missing")),
        )"#;

        let err = LoadoutDefinition::from_ron(source).unwrap().build().unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownOverride(_)));
    }

    #[test]
    fn test_binding_outside_slot_range_is_rejected() {
        let source = r#"(
            config: (swappable_slot_count: 1),
            abilities: [(id: "dash", kind: Dash())],
            bindings: [(group: Swappable, index: 3, action: Some("Special"))],
        )"#;

        let err = LoadoutDefinition::from_ron(source).unwrap().build().unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::UnknownSlot {
                group: AbilityGroup::Swappable,
                index: 3,
                count: 1,
            }
        ));
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        let err = LoadoutDefinition::from_ron("(abilities: [").unwrap_err();
        assert!(matches!(err, DefinitionError::Parse(_)));
    }
}
