//! Deferred scheduler commands
//!
//! Hooks и routines вызываются пока scheduler держит &mut на active table,
//! поэтому мутировать его напрямую они не могут. Вместо этого — очередь
//! команд (как bevy `Commands`), которую scheduler применяет после текущей
//! операции, по порядку, каждую над свежим состоянием.

use std::collections::VecDeque;
use std::sync::Arc;

use super::override_mode::AbilityOverrideMode;
use crate::ability::AbilityId;

#[derive(Debug, Clone)]
pub enum SchedulerCommand {
    Run(AbilityId),
    Request { ability: AbilityId, weight: i32 },
    Queue { ability: AbilityId, priority: i32 },
    Stop { ability: AbilityId, completed: bool },
    StopAll { on_ability_end: bool },
    EnterOverride(Arc<AbilityOverrideMode>),
    ExitOverride,
}

#[derive(Debug, Default)]
pub struct SchedulerCommands {
    queue: VecDeque<SchedulerCommand>,
}

impl SchedulerCommands {
    pub fn push(&mut self, command: SchedulerCommand) {
        self.queue.push_back(command);
    }

    pub fn run(&mut self, ability: impl Into<AbilityId>) {
        self.push(SchedulerCommand::Run(ability.into()));
    }

    pub fn request(&mut self, ability: impl Into<AbilityId>, weight: i32) {
        self.push(SchedulerCommand::Request {
            ability: ability.into(),
            weight,
        });
    }

    pub fn queue(&mut self, ability: impl Into<AbilityId>, priority: i32) {
        self.push(SchedulerCommand::Queue {
            ability: ability.into(),
            priority,
        });
    }

    pub fn stop(&mut self, ability: impl Into<AbilityId>, completed: bool) {
        self.push(SchedulerCommand::Stop {
            ability: ability.into(),
            completed,
        });
    }

    pub fn stop_all(&mut self, on_ability_end: bool) {
        self.push(SchedulerCommand::StopAll { on_ability_end });
    }

    pub fn enter_override(&mut self, mode: Arc<AbilityOverrideMode>) {
        self.push(SchedulerCommand::EnterOverride(mode));
    }

    pub fn exit_override(&mut self) {
        self.push(SchedulerCommand::ExitOverride);
    }

    pub fn pop(&mut self) -> Option<SchedulerCommand> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
