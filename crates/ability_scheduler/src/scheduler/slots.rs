//! Ability groups → numbered slots
//!
//! Slot table не подписывается на изменения списков: владелец явно зовёт
//! `apply(group, list)` когда authored список поменялся.
//!
//! Каждый слот привязан к input action. Номер слота сквозной (base, затем
//! swappable, с 1), default action = `Ability{N}`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ability::{Ability, AbilityId, AbilityRef};

/// Группа abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum AbilityGroup {
    Base,
    Swappable,
}

impl AbilityGroup {
    pub const ALL: [AbilityGroup; 2] = [AbilityGroup::Base, AbilityGroup::Swappable];
}

/// Input binding слота
#[derive(Debug, Clone, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotBinding {
    /// Action слота (None → `Ability{N}`)
    pub action: Option<String>,
    /// Custom action замапленной ability перекрывает action слота
    pub ability_overrides_action: bool,
}

impl SlotBinding {
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ability_overrides_action: false,
        }
    }

    pub fn with_ability_override(mut self) -> Self {
        self.ability_overrides_action = true;
        self
    }

    /// Action для слота с номером `number` (с 1), в котором лежит `ability`
    pub fn resolve(&self, number: usize, ability: &Ability) -> String {
        if self.ability_overrides_action {
            if let Some(custom) = ability.custom_action() {
                return custom.to_string();
            }
        }

        match self.action.as_deref() {
            Some(action) if !action.is_empty() => action.to_string(),
            _ => format!("Ability{number}"),
        }
    }
}

/// Read-only snapshot слота для UI (icon + cooldown bar + key hint)
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView {
    pub index: usize,
    pub ability: Option<AbilityId>,
    /// Resolved input action (None для пустого слота)
    pub action: Option<String>,
    pub icon: Option<String>,
    pub cooldown_remaining: f32,
    pub cooldown_percent: f32,
    pub available: bool,
}

#[derive(Debug, Default)]
pub struct SlotTable {
    base: Vec<Option<AbilityRef>>,
    swappable: Vec<Option<AbilityRef>>,
    base_bindings: Vec<SlotBinding>,
    swappable_bindings: Vec<SlotBinding>,
}

impl SlotTable {
    pub fn new(base_count: usize, swappable_count: usize) -> Self {
        Self {
            base: vec![None; base_count],
            swappable: vec![None; swappable_count],
            base_bindings: vec![SlotBinding::default(); base_count],
            swappable_bindings: vec![SlotBinding::default(); swappable_count],
        }
    }

    fn slots(&self, group: AbilityGroup) -> &[Option<AbilityRef>] {
        match group {
            AbilityGroup::Base => &self.base,
            AbilityGroup::Swappable => &self.swappable,
        }
    }

    fn bindings(&self, group: AbilityGroup) -> &[SlotBinding] {
        match group {
            AbilityGroup::Base => &self.base_bindings,
            AbilityGroup::Swappable => &self.swappable_bindings,
        }
    }

    /// Привязывает слот к action; `false` если слота нет
    pub fn bind(&mut self, group: AbilityGroup, index: usize, binding: SlotBinding) -> bool {
        let bindings = match group {
            AbilityGroup::Base => &mut self.base_bindings,
            AbilityGroup::Swappable => &mut self.swappable_bindings,
        };
        match bindings.get_mut(index) {
            Some(slot) => {
                *slot = binding;
                true
            }
            None => false,
        }
    }

    pub fn binding(&self, group: AbilityGroup, index: usize) -> Option<&SlotBinding> {
        self.bindings(group).get(index)
    }

    /// Сквозной номер слота (с 1)
    pub fn number(&self, group: AbilityGroup, index: usize) -> usize {
        match group {
            AbilityGroup::Base => index + 1,
            AbilityGroup::Swappable => self.base.len() + index + 1,
        }
    }

    /// Action занятого слота
    pub fn resolve_action(&self, group: AbilityGroup, index: usize) -> Option<String> {
        let ability = self.get(group, index)?;
        let binding = self.binding(group, index)?;
        Some(binding.resolve(self.number(group, index), ability))
    }

    /// Перемаппит слоты группы; слоты за концом списка очищаются
    pub fn apply(&mut self, group: AbilityGroup, abilities: &[AbilityRef]) {
        let slots = match group {
            AbilityGroup::Base => &mut self.base,
            AbilityGroup::Swappable => &mut self.swappable,
        };

        for (index, slot) in slots.iter_mut().enumerate() {
            *slot = abilities.get(index).cloned();
        }
    }

    pub fn get(&self, group: AbilityGroup, index: usize) -> Option<&AbilityRef> {
        self.slots(group).get(index)?.as_ref()
    }

    pub fn len(&self, group: AbilityGroup) -> usize {
        self.slots(group).len()
    }

    /// Ids abilities, замапленных сейчас в группу
    pub fn mapped_ids(&self, group: AbilityGroup) -> Vec<AbilityId> {
        self.slots(group)
            .iter()
            .flatten()
            .map(|ability| ability.id.clone())
            .collect()
    }

    pub fn iter(&self, group: AbilityGroup) -> impl Iterator<Item = (usize, Option<&AbilityRef>)> {
        self.slots(group)
            .iter()
            .enumerate()
            .map(|(index, slot)| (index, slot.as_ref()))
    }
}
