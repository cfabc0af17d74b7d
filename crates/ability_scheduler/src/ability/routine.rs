//! Resumable activation routines (cooperative, один шаг за тик)
//!
//! # Архитектура
//!
//! Routine = явная state machine. Scheduler вызывает `resume()` один раз
//! за тик, routine возвращает:
//! - `Step::Suspended` — ждём следующего тика (wait condition не выполнен)
//! - `Step::Finished` — активация завершена, scheduler стартует cooldown
//! - `Err(RoutineFault)` — routine упала, instance удаляется из active table
//!
//! Cancellation = scheduler просто дропает routine. Cleanup — только в
//! `on_cancel` hook (routine больше не резюмится).
//!
//! # Примитивы
//!
//! ```rust,ignore
//! // Dash: impulse, затем один тик ожидания
//! sequence(vec![
//!     invoke(|ctx| { /* apply impulse */ Ok(()) }),
//!     next_tick(),
//! ])
//! ```
//!
//! Timeout'ов по умолчанию нет: `wait_until` с вечным false висит вечно.
//! Для bounded ожидания — `with_timeout(routine, seconds)`.

use std::collections::VecDeque;

use super::{AbilityContext, AbilityId};

/// Результат одного шага routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Suspended,
    Finished,
}

/// Ошибка внутри шага routine.
///
/// Отсутствие агента/input — не fault: scheduler предупреждает об этом один раз
/// при инициализации, а input waits и built-in payloads деградируют в no-op.
#[derive(Debug, thiserror::Error)]
pub enum RoutineFault {
    #[error("ability '{ability}' failed: {reason}")]
    Failed { ability: AbilityId, reason: String },
}

pub type RoutineResult = Result<Step, RoutineFault>;

/// Suspend-capable activation routine
pub trait Routine: Send + Sync {
    fn resume(&mut self, ctx: &mut AbilityContext<'_>) -> RoutineResult;
}

pub type BoxedRoutine = Box<dyn Routine>;

// ============================================================================
// Primitives
// ============================================================================

/// Сразу завершается
pub struct Exit;

impl Routine for Exit {
    fn resume(&mut self, _ctx: &mut AbilityContext<'_>) -> RoutineResult {
        Ok(Step::Finished)
    }
}

/// Один тик ожидания
#[derive(Default)]
pub struct NextTick {
    yielded: bool,
}

impl Routine for NextTick {
    fn resume(&mut self, _ctx: &mut AbilityContext<'_>) -> RoutineResult {
        if self.yielded {
            return Ok(Step::Finished);
        }
        self.yielded = true;
        Ok(Step::Suspended)
    }
}

/// Ожидание `duration` секунд симуляции.
///
/// Первый resume (тик старта) время не накапливает: routine стартовавшая
/// в момент T завершается на первом тике где `now >= T + duration`.
pub struct WaitSeconds {
    duration: f32,
    elapsed: f32,
    started: bool,
}

impl WaitSeconds {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            elapsed: 0.0,
            started: false,
        }
    }
}

impl Routine for WaitSeconds {
    fn resume(&mut self, ctx: &mut AbilityContext<'_>) -> RoutineResult {
        if self.started {
            self.elapsed += ctx.delta;
        }
        self.started = true;

        if self.elapsed >= self.duration {
            Ok(Step::Finished)
        } else {
            Ok(Step::Suspended)
        }
    }
}

/// Какое input-событие ждём
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputWait {
    Press,
    Release,
    Hold,
}

/// Ожидание input edge/hold по имени action.
///
/// Без input source ждать нечего: routine сразу завершается.
pub struct WaitForInput {
    action: String,
    kind: InputWait,
}

impl WaitForInput {
    pub fn new(action: impl Into<String>, kind: InputWait) -> Self {
        Self {
            action: action.into(),
            kind,
        }
    }
}

impl Routine for WaitForInput {
    fn resume(&mut self, ctx: &mut AbilityContext<'_>) -> RoutineResult {
        let Some(input) = ctx.input_mut() else {
            return Ok(Step::Finished);
        };

        let satisfied = match self.kind {
            InputWait::Press => input.consume_pressed(&self.action),
            InputWait::Release => input.consume_released(&self.action),
            InputWait::Hold => input.held(&self.action),
        };

        Ok(if satisfied { Step::Finished } else { Step::Suspended })
    }
}

/// Ожидание predicate (без timeout)
pub struct WaitUntil<F> {
    condition: F,
}

impl<F> Routine for WaitUntil<F>
where
    F: FnMut(&mut AbilityContext<'_>) -> bool + Send + Sync,
{
    fn resume(&mut self, ctx: &mut AbilityContext<'_>) -> RoutineResult {
        Ok(if (self.condition)(ctx) {
            Step::Finished
        } else {
            Step::Suspended
        })
    }
}

/// One-shot действие (payload без ожидания)
pub struct Invoke<F> {
    action: Option<F>,
}

impl<F> Routine for Invoke<F>
where
    F: FnOnce(&mut AbilityContext<'_>) -> Result<(), RoutineFault> + Send + Sync,
{
    fn resume(&mut self, ctx: &mut AbilityContext<'_>) -> RoutineResult {
        if let Some(action) = self.action.take() {
            action(ctx)?;
        }
        Ok(Step::Finished)
    }
}

/// Произвольная state machine на closure (состояние — в blackboard или captures)
pub struct FnRoutine<F> {
    step: F,
}

impl<F> Routine for FnRoutine<F>
where
    F: FnMut(&mut AbilityContext<'_>) -> RoutineResult + Send + Sync,
{
    fn resume(&mut self, ctx: &mut AbilityContext<'_>) -> RoutineResult {
        (self.step)(ctx)
    }
}

/// Последовательность routines.
///
/// Завершившийся шаг сразу передаёт управление следующему в том же тике,
/// suspend происходит только на реальном ожидании.
pub struct Sequence {
    steps: VecDeque<BoxedRoutine>,
}

impl Routine for Sequence {
    fn resume(&mut self, ctx: &mut AbilityContext<'_>) -> RoutineResult {
        while let Some(current) = self.steps.front_mut() {
            match current.resume(ctx)? {
                Step::Suspended => return Ok(Step::Suspended),
                Step::Finished => {
                    self.steps.pop_front();
                }
            }
        }
        Ok(Step::Finished)
    }
}

/// Time-boxed обёртка: завершается когда завершился inner ИЛИ истёк limit
pub struct Timeout {
    inner: BoxedRoutine,
    limit: WaitSeconds,
}

impl Routine for Timeout {
    fn resume(&mut self, ctx: &mut AbilityContext<'_>) -> RoutineResult {
        if self.limit.resume(ctx)? == Step::Finished {
            return Ok(Step::Finished);
        }
        self.inner.resume(ctx)
    }
}

// ============================================================================
// Constructors
// ============================================================================

pub fn exit() -> BoxedRoutine {
    Box::new(Exit)
}

pub fn next_tick() -> BoxedRoutine {
    Box::new(NextTick::default())
}

pub fn wait_seconds(duration: f32) -> BoxedRoutine {
    Box::new(WaitSeconds::new(duration))
}

pub fn wait_for_press(action: impl Into<String>) -> BoxedRoutine {
    Box::new(WaitForInput::new(action, InputWait::Press))
}

pub fn wait_for_release(action: impl Into<String>) -> BoxedRoutine {
    Box::new(WaitForInput::new(action, InputWait::Release))
}

pub fn wait_for_hold(action: impl Into<String>) -> BoxedRoutine {
    Box::new(WaitForInput::new(action, InputWait::Hold))
}

pub fn wait_until<F>(condition: F) -> BoxedRoutine
where
    F: FnMut(&mut AbilityContext<'_>) -> bool + Send + Sync + 'static,
{
    Box::new(WaitUntil { condition })
}

pub fn invoke<F>(action: F) -> BoxedRoutine
where
    F: FnOnce(&mut AbilityContext<'_>) -> Result<(), RoutineFault> + Send + Sync + 'static,
{
    Box::new(Invoke {
        action: Some(action),
    })
}

pub fn from_fn<F>(step: F) -> BoxedRoutine
where
    F: FnMut(&mut AbilityContext<'_>) -> RoutineResult + Send + Sync + 'static,
{
    Box::new(FnRoutine { step })
}

pub fn sequence(steps: Vec<BoxedRoutine>) -> BoxedRoutine {
    Box::new(Sequence {
        steps: steps.into(),
    })
}

pub fn with_timeout(inner: BoxedRoutine, limit: f32) -> BoxedRoutine {
    Box::new(Timeout {
        inner,
        limit: WaitSeconds::new(limit),
    })
}
