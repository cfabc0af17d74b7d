//! Activation scheduler
//!
//! # Архитектура
//!
//! `AbilitySystem` — component на агенте, владеет:
//! - catalog (зарегистрированные abilities, id → AbilityRef)
//! - slots (base + swappable группы)
//! - CooldownTracker (active-instance table)
//! - InputBuffer (priority arbitration)
//! - override slot (один активный override)
//! - ExtensionHost (ultimate и т.п.)
//!
//! # Тик (порядок фиксирован)
//! 1. cleanup: удаляем instances без routine с истёкшим cooldown
//! 2. input buffer: один winner за тик
//! 3. slot input: нажатые slot actions → `request_ability` (в buffer)
//! 4. extensions: run events, затем `handle()`
//! 5. routines: один `resume()` на каждую running ability
//! 6. agent `end_tick` (интеграция тела, сброс input edges)
//!
//! # Re-entrancy
//! Hooks/routines мутируют scheduler только через `SchedulerCommands`,
//! очередь применяется после текущей операции. Итерация по active table —
//! всегда по snapshot ключей.
//!
//! # Ошибки
//! Публичный контракт не возвращает ошибок: unknown id / running / cooldown
//! = `false` или no-op (+ debug лог если `config.debug`).

use bevy::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod input_buffer;
pub mod instance;
pub mod override_mode;
pub mod slots;

#[cfg(test)]
pub(crate) mod test_support;

pub use commands::{SchedulerCommand, SchedulerCommands};
pub use config::AbilitySystemConfig;
pub use input_buffer::{InputBuffer, QueuedInput};
pub use instance::{AbilityInstance, CooldownTracker};
pub use override_mode::{AbilityOverrideMode, ResetMask};
pub use slots::{AbilityGroup, SlotBinding, SlotTable, SlotView};

use crate::ability::{AbilityContext, AbilityId, AbilityRef, Step};
use crate::agent::{Agent, InputSource};
use crate::extensions::{AbilityExtension, ExtensionHost};

/// Сколько команд применяем за один flush (защита от run → on_end → run циклов)
const MAX_COMMANDS_PER_FLUSH: usize = 256;

/// Сколько run events держим для внешних читателей, если их никто не забирает
const MAX_BUFFERED_RUN_EVENTS: usize = 64;

/// Ability запустилась (`run_ability` прошёл admission)
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityRunEvent {
    pub ability: AbilityId,
    /// Номер тика scheduler'а
    pub tick: u64,
    /// Время симуляции
    pub time: f64,
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Start,
    End,
    Cancel,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Completed,
    Cancelled,
}

/// Activation scheduler одного агента
#[derive(Component)]
pub struct AbilitySystem {
    config: AbilitySystemConfig,
    agent: Option<Box<dyn Agent>>,

    catalog: HashMap<AbilityId, AbilityRef>,
    base_abilities: Vec<AbilityRef>,
    swappable_abilities: Vec<AbilityRef>,
    slots: SlotTable,

    tracker: CooldownTracker,
    input_buffer: InputBuffer,
    current_override: Option<Arc<AbilityOverrideMode>>,
    extensions: ExtensionHost,

    commands: SchedulerCommands,
    flushing: bool,

    run_ticks: HashMap<AbilityId, u64>,
    extension_events: Vec<AbilityRunEvent>,
    outbox: Vec<AbilityRunEvent>,

    /// Накопленное время симуляции (f64: без дрейфа в длинных сессиях)
    now: f64,
    tick: u64,
    initialized: bool,
}

impl Default for AbilitySystem {
    fn default() -> Self {
        Self::new(AbilitySystemConfig::default())
    }
}

impl AbilitySystem {
    pub fn new(config: AbilitySystemConfig) -> Self {
        Self {
            slots: SlotTable::new(config.base_slot_count, config.swappable_slot_count),
            config,
            agent: None,
            catalog: HashMap::new(),
            base_abilities: Vec::new(),
            swappable_abilities: Vec::new(),
            tracker: CooldownTracker::default(),
            input_buffer: InputBuffer::default(),
            current_override: None,
            extensions: ExtensionHost::default(),
            commands: SchedulerCommands::default(),
            flushing: false,
            run_ticks: HashMap::new(),
            extension_events: Vec::new(),
            outbox: Vec::new(),
            now: 0.0,
            tick: 0,
            initialized: false,
        }
    }

    pub fn with_agent(mut self, agent: impl Agent + 'static) -> Self {
        self.agent = Some(Box::new(agent));
        self
    }

    pub fn with_extension(mut self, extension: impl AbilityExtension + 'static) -> Self {
        self.add_extension(Box::new(extension));
        self
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    pub fn config(&self) -> &AbilitySystemConfig {
        &self.config
    }

    pub fn set_agent(&mut self, agent: Box<dyn Agent>) {
        self.agent = Some(agent);
    }

    pub fn agent(&self) -> Option<&dyn Agent> {
        self.agent.as_deref().map(|agent| agent as &dyn Agent)
    }

    pub fn agent_mut(&mut self) -> Option<&mut (dyn Agent + 'static)> {
        self.agent.as_deref_mut()
    }

    pub fn input_mut(&mut self) -> Option<&mut dyn InputSource> {
        self.agent.as_deref_mut()?.input_mut()
    }

    /// Время симуляции (секунды)
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    // ========================================================================
    // Catalog & groups
    // ========================================================================

    /// Регистрирует ability. `false` если id уже занят другой ability.
    pub fn register_ability(&mut self, ability: AbilityRef) -> bool {
        match self.catalog.get(&ability.id) {
            Some(existing) if Arc::ptr_eq(existing, &ability) => true,
            Some(_) => {
                crate::log_warning(&format!(
                    "AbilitySystem: ability id '{}' is already registered, ignoring duplicate",
                    ability.id
                ));
                false
            }
            None => {
                self.catalog.insert(ability.id.clone(), ability);
                true
            }
        }
    }

    pub fn ability(&self, id: &AbilityId) -> Option<&AbilityRef> {
        self.catalog.get(id)
    }

    pub fn is_registered(&self, id: &AbilityId) -> bool {
        self.catalog.contains_key(id)
    }

    /// Apply + recompute base группы
    pub fn set_base_abilities(&mut self, abilities: Vec<AbilityRef>) {
        for ability in &abilities {
            self.register_ability(Arc::clone(ability));
        }
        self.base_abilities = abilities;
        self.slots.apply(AbilityGroup::Base, &self.base_abilities);
    }

    /// Apply + recompute swappable группы (слоты перемапятся только вне override)
    pub fn set_swappable_abilities(&mut self, abilities: Vec<AbilityRef>) {
        for ability in &abilities {
            self.register_ability(Arc::clone(ability));
        }
        self.swappable_abilities = abilities;
        if self.current_override.is_none() {
            self.slots.apply(AbilityGroup::Swappable, &self.swappable_abilities);
        }
    }

    pub fn base_abilities(&self) -> &[AbilityRef] {
        &self.base_abilities
    }

    pub fn swappable_abilities(&self) -> &[AbilityRef] {
        &self.swappable_abilities
    }

    pub fn slot(&self, group: AbilityGroup, index: usize) -> Option<&AbilityRef> {
        self.slots.get(group, index)
    }

    /// Snapshot слотов группы для UI
    pub fn slot_views(&self, group: AbilityGroup) -> Vec<SlotView> {
        self.slots
            .iter(group)
            .map(|(index, ability)| match ability {
                Some(ability) => SlotView {
                    index,
                    ability: Some(ability.id.clone()),
                    action: self.slots.resolve_action(group, index),
                    icon: ability.icon.clone(),
                    cooldown_remaining: self.cooldown_remaining(&ability.id),
                    cooldown_percent: self.cooldown_percent(&ability.id),
                    available: self.is_ability_available(&ability.id),
                },
                None => SlotView {
                    index,
                    ability: None,
                    action: None,
                    icon: None,
                    cooldown_remaining: 0.0,
                    cooldown_percent: 0.0,
                    available: false,
                },
            })
            .collect()
    }

    /// Slot-driven input (пустой слот = no-op)
    pub fn request_slot(&mut self, group: AbilityGroup, index: usize) {
        if let Some(id) = self.slots.get(group, index).map(|ability| ability.id.clone()) {
            self.request_ability(&id, 0);
        }
    }

    /// Привязывает слот к input action; `false` если слота нет
    pub fn bind_slot(&mut self, group: AbilityGroup, index: usize, binding: SlotBinding) -> bool {
        self.slots.bind(group, index, binding)
    }

    /// Action, который сейчас активирует слот (None для пустого слота)
    pub fn slot_action(&self, group: AbilityGroup, index: usize) -> Option<String> {
        self.slots.resolve_action(group, index)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Инициализация extensions (лениво на первом тике)
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        if self.agent.is_none() {
            crate::log_warning(
                "AbilitySystem: no agent attached, agent-bound abilities are skipped and input waits finish immediately",
            );
        }

        let mut host = std::mem::take(&mut self.extensions);
        host.initialize_all(self);
        self.restore_extensions(host);
        self.flush_commands();
    }

    /// Dispose всех extensions
    pub fn shutdown(&mut self) {
        let mut host = std::mem::take(&mut self.extensions);
        host.dispose_all(self);
        // всё, что добавили во время dispose, тоже уходит
        self.extensions = ExtensionHost::default();
        self.flush_commands();
    }

    pub fn add_extension(&mut self, mut extension: Box<dyn AbilityExtension>) {
        if self.initialized {
            extension.initialize(self);
        }
        self.extensions.push(extension);
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }

    fn restore_extensions(&mut self, mut host: ExtensionHost) {
        // extensions добавленные из hooks попали в self.extensions
        let added = std::mem::replace(&mut self.extensions, ExtensionHost::default());
        host.append(added);
        self.extensions = host;
    }

    /// Один тик scheduler'а
    pub fn tick(&mut self, delta: f32) {
        if !self.initialized {
            self.initialize();
        }

        let delta = delta.max(0.0);
        self.tick += 1;
        self.now += f64::from(delta);

        self.tracker.cleanup_expired(self.now);
        self.process_input_queue();
        self.flush_commands();
        self.poll_slot_inputs();
        self.handle_extensions();
        self.step_routines(delta);

        if let Some(agent) = self.agent.as_deref_mut() {
            agent.end_tick(delta);
        }
    }

    /// Press edge slot action'а → request ability этого слота
    fn poll_slot_inputs(&mut self) {
        if !self.config.slot_input {
            return;
        }

        let mut bound = Vec::new();
        for group in AbilityGroup::ALL {
            for index in 0..self.slots.len(group) {
                let Some(ability) = self.slots.get(group, index) else {
                    continue;
                };
                if let Some(action) = self.slots.resolve_action(group, index) {
                    bound.push((ability.id.clone(), action));
                }
            }
        }
        if bound.is_empty() {
            return;
        }

        let Some(input) = self.agent.as_deref_mut().and_then(|agent| agent.input_mut()) else {
            return;
        };
        let pressed: Vec<AbilityId> = bound
            .into_iter()
            .filter(|(_, action)| input.consume_pressed(action))
            .map(|(id, _)| id)
            .collect();

        for id in pressed {
            self.request_inner(&id, 0);
        }
        self.flush_commands();
    }

    fn handle_extensions(&mut self) {
        let events = std::mem::take(&mut self.extension_events);
        let mut host = std::mem::take(&mut self.extensions);
        host.dispatch(self, &events);
        self.restore_extensions(host);
        self.flush_commands();
    }

    fn step_routines(&mut self, delta: f32) {
        for id in self.tracker.running_snapshot() {
            let Some(instance) = self.tracker.instances.get_mut(&id) else {
                continue;
            };
            let Some(mut routine) = instance.routine.take() else {
                continue;
            };
            let ability = Arc::clone(&instance.ability);

            let result = {
                let mut ctx = AbilityContext {
                    ability: &ability,
                    agent: self.agent.as_deref_mut(),
                    state: &mut instance.state,
                    commands: &mut self.commands,
                    now: self.now,
                    delta,
                    tick: self.tick,
                };
                routine.resume(&mut ctx)
            };

            match result {
                Ok(Step::Suspended) => {
                    if let Some(instance) = self.tracker.get_mut(&id) {
                        instance.routine = Some(routine);
                    }
                }
                Ok(Step::Finished) => self.settle(&id, Outcome::Completed),
                Err(fault) => {
                    crate::log_error(&format!("AbilitySystem: {fault}, removing instance"));
                    self.settle(&id, Outcome::Cancelled);
                    self.tracker.remove(&id);
                }
            }

            self.flush_commands();
        }
    }

    // ========================================================================
    // Public contract
    // ========================================================================

    /// Запускает ability немедленно (без buffer'а)
    pub fn run_ability(&mut self, id: &AbilityId) -> bool {
        let ran = self.run_inner(id);
        self.flush_commands();
        ran
    }

    /// Slot/input entry point: toggle-cancel если running, иначе в buffer
    pub fn request_ability(&mut self, id: &AbilityId, weight: i32) {
        self.request_inner(id, weight);
        self.flush_commands();
    }

    /// Кладёт request в input buffer (resolve на следующем тике)
    pub fn queue_ability(&mut self, id: &AbilityId, priority: i32) {
        self.queue_inner(id, priority);
    }

    pub fn stop_ability(&mut self, id: &AbilityId, completed: bool) {
        self.stop_inner(id, completed);
        self.flush_commands();
    }

    pub fn cancel_ability(&mut self, id: &AbilityId) {
        self.stop_ability(id, false);
    }

    /// Останавливает все tracked abilities (по snapshot)
    pub fn stop_all_abilities(&mut self, on_ability_end: bool) {
        self.stop_all_inner(on_ability_end);
        self.flush_commands();
    }

    /// Обнуляет cooldown без hooks
    pub fn reset_cooldown(&mut self, id: &AbilityId) {
        self.tracker.reset_cooldown(id);
    }

    pub fn enter_override_mode(&mut self, mode: Arc<AbilityOverrideMode>) {
        self.enter_override_inner(mode);
        self.flush_commands();
    }

    pub fn exit_override_mode(&mut self) {
        self.exit_override_inner();
        self.flush_commands();
    }

    pub fn current_override(&self) -> Option<&Arc<AbilityOverrideMode>> {
        self.current_override.as_ref()
    }

    /// Забирает run events для внешних читателей (UI, bevy events)
    pub fn drain_run_events(&mut self) -> Vec<AbilityRunEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ========================================================================
    // Queries (unknown id → консервативный default)
    // ========================================================================

    pub fn is_ability_running(&self, id: &AbilityId) -> bool {
        self.tracker.is_running(id)
    }

    pub fn is_on_cooldown(&self, id: &AbilityId) -> bool {
        self.tracker.is_on_cooldown(id, self.now)
    }

    pub fn is_ability_available(&self, id: &AbilityId) -> bool {
        self.is_registered(id) && self.tracker.is_available(id, self.now)
    }

    pub fn is_ability_in_use(&self, id: &AbilityId) -> bool {
        self.tracker.is_in_use(id, self.now)
    }

    pub fn cooldown_remaining(&self, id: &AbilityId) -> f32 {
        self.tracker.cooldown_remaining(id, self.now)
    }

    pub fn cooldown_percent(&self, id: &AbilityId) -> f32 {
        self.tracker.cooldown_percent(id, self.now)
    }

    /// Ability запускалась в текущем тике
    pub fn ran_this_tick(&self, id: &AbilityId) -> bool {
        self.run_ticks.get(id) == Some(&self.tick)
    }

    pub fn active_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn buffered_inputs(&self) -> &[QueuedInput] {
        self.input_buffer.entries()
    }

    // ========================================================================
    // Internals (без flush — вызываются и из flush_commands)
    // ========================================================================

    fn debug_log(&self, message: impl FnOnce() -> String) {
        if self.config.debug {
            crate::log(&message());
        }
    }

    fn run_inner(&mut self, id: &AbilityId) -> bool {
        let Some(ability) = self.catalog.get(id).cloned() else {
            self.debug_log(|| format!("AbilitySystem: unknown ability '{id}'"));
            return false;
        };

        if self.tracker.is_running(id) {
            self.debug_log(|| format!("{} is already running!", ability.name));
            return false;
        }

        if self.tracker.is_on_cooldown(id, self.now) {
            self.debug_log(|| {
                format!(
                    "{} is on cooldown ({:.2}s left)",
                    ability.name,
                    self.cooldown_remaining(id)
                )
            });
            return false;
        }

        // об отсутствии агента уже предупредили в initialize()
        if self.agent.is_none() && ability.behavior().requires_agent() {
            self.debug_log(|| format!("{} needs an agent, skipped", ability.name));
            return false;
        }

        let routine = ability.behavior().activate(&ability);
        self.tracker.insert(AbilityInstance::new(Arc::clone(&ability), routine));
        self.fire_hook(id, Hook::Start);
        self.notify_run(id);
        true
    }

    fn request_inner(&mut self, id: &AbilityId, weight: i32) {
        let Some(ability) = self.catalog.get(id).cloned() else {
            return;
        };

        // toggle: повторный request прерывает, а не рестартит
        if self.tracker.is_running(id) {
            self.stop_inner(id, false);
            return;
        }

        if self.tracker.is_on_cooldown(id, self.now) {
            self.debug_log(|| format!("{} is cooling down.", ability.name));
            return;
        }

        if !ability.behavior().can_activate(self.agent.as_deref()) {
            self.debug_log(|| format!("{} rejected by its activation condition", ability.name));
            return;
        }

        self.queue_inner(id, weight);
    }

    fn queue_inner(&mut self, id: &AbilityId, priority: i32) {
        if !self.is_registered(id) {
            return;
        }
        self.input_buffer.push(id.clone(), priority, self.now);
    }

    fn process_input_queue(&mut self) {
        let Some(winner) = self
            .input_buffer
            .resolve(self.now, self.config.input_buffer_time)
        else {
            return;
        };

        if self.is_ability_available(&winner.ability) {
            self.run_inner(&winner.ability);
        } else {
            self.debug_log(|| format!("buffered {} is not admissible, dropped", winner.ability));
        }
    }

    fn stop_inner(&mut self, id: &AbilityId, completed: bool) {
        let Some(instance) = self.tracker.get_mut(id) else {
            return;
        };
        let was_running = instance.routine.take().is_some();

        // уже завершилась и в cooldown: повторный on_end не нужен
        if completed && !was_running {
            return;
        }

        let outcome = if completed {
            Outcome::Completed
        } else {
            Outcome::Cancelled
        };
        self.settle(id, outcome);
    }

    /// Administrative stop: без hooks, cooldown → 0
    fn stop_raw(&mut self, id: &AbilityId) {
        if let Some(instance) = self.tracker.get_mut(id) {
            instance.routine = None;
            instance.cooldown_end = 0.0;
        }
    }

    fn stop_all_inner(&mut self, on_ability_end: bool) {
        for id in self.tracker.snapshot() {
            self.stop_inner(&id, on_ability_end);
        }
    }

    fn settle(&mut self, id: &AbilityId, outcome: Outcome) {
        match outcome {
            Outcome::Completed => {
                self.fire_hook(id, Hook::End);
                self.tracker.start_cooldown(id, self.now);
            }
            Outcome::Cancelled => {
                self.fire_hook(id, Hook::Cancel);
                self.tracker.reset_cooldown(id);
            }
        }
    }

    fn fire_hook(&mut self, id: &AbilityId, hook: Hook) {
        let Some(instance) = self.tracker.instances.get_mut(id) else {
            return;
        };
        let ability = Arc::clone(&instance.ability);

        let mut ctx = AbilityContext {
            ability: &ability,
            agent: self.agent.as_deref_mut(),
            state: &mut instance.state,
            commands: &mut self.commands,
            now: self.now,
            delta: 0.0,
            tick: self.tick,
        };

        let behavior = ability.behavior();
        match hook {
            Hook::Start => behavior.on_start(&mut ctx),
            Hook::End => behavior.on_end(&mut ctx),
            Hook::Cancel => behavior.on_cancel(&mut ctx),
        }
    }

    fn notify_run(&mut self, id: &AbilityId) {
        let event = AbilityRunEvent {
            ability: id.clone(),
            tick: self.tick,
            time: self.now,
        };

        self.run_ticks.insert(id.clone(), self.tick);
        self.extension_events.push(event.clone());

        if self.outbox.len() >= MAX_BUFFERED_RUN_EVENTS {
            self.outbox.remove(0);
        }
        self.outbox.push(event);
    }

    fn enter_override_inner(&mut self, mode: Arc<AbilityOverrideMode>) {
        if mode.abilities.is_empty() {
            return;
        }

        // Один override за раз: предыдущий выходит со своей exit mask
        if let Some(previous) = self.current_override.as_ref() {
            crate::log_info(&format!(
                "AbilitySystem: override '{}' replaced by '{}', exiting the first",
                previous.name, mode.name
            ));
            self.exit_override_inner();
        }

        self.apply_reset_mask(mode.reset_mask);

        for ability in &mode.abilities {
            self.register_ability(Arc::clone(ability));
        }
        self.slots.apply(AbilityGroup::Swappable, &mode.abilities);
        self.current_override = Some(mode);
    }

    fn exit_override_inner(&mut self) {
        let Some(mode) = self.current_override.take() else {
            return;
        };

        // слоты всё ещё указывают на override abilities
        self.apply_reset_mask(mode.exit_reset_mask);
        self.slots.apply(AbilityGroup::Swappable, &self.swappable_abilities);
    }

    fn apply_reset_mask(&mut self, mask: ResetMask) {
        let mut targets = Vec::new();
        if mask.contains(ResetMask::SWAPPABLE) {
            targets.extend(self.slots.mapped_ids(AbilityGroup::Swappable));
        }
        if mask.contains(ResetMask::BASE) {
            targets.extend(self.slots.mapped_ids(AbilityGroup::Base));
        }

        for id in targets {
            if self.tracker.contains(&id) {
                self.stop_raw(&id);
            }
        }
    }

    fn apply_command(&mut self, command: SchedulerCommand) {
        match command {
            SchedulerCommand::Run(id) => {
                self.run_inner(&id);
            }
            SchedulerCommand::Request { ability, weight } => self.request_inner(&ability, weight),
            SchedulerCommand::Queue { ability, priority } => self.queue_inner(&ability, priority),
            SchedulerCommand::Stop { ability, completed } => self.stop_inner(&ability, completed),
            SchedulerCommand::StopAll { on_ability_end } => self.stop_all_inner(on_ability_end),
            SchedulerCommand::EnterOverride(mode) => self.enter_override_inner(mode),
            SchedulerCommand::ExitOverride => self.exit_override_inner(),
        }
    }

    fn flush_commands(&mut self) {
        if self.flushing {
            return;
        }
        self.flushing = true;

        let mut applied = 0;
        while let Some(command) = self.commands.pop() {
            if applied == MAX_COMMANDS_PER_FLUSH {
                crate::log_warning(&format!(
                    "AbilitySystem: command limit reached, dropping {} pending commands",
                    self.commands.len() + 1
                ));
                self.commands.clear();
                break;
            }
            self.apply_command(command);
            applied += 1;
        }

        self.flushing = false;
    }
}

impl std::fmt::Debug for AbilitySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbilitySystem")
            .field("tick", &self.tick)
            .field("now", &self.now)
            .field("registered", &self.catalog.len())
            .field("active", &self.tracker)
            .field(
                "override",
                &self.current_override.as_ref().map(|mode| mode.name.as_str()),
            )
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
