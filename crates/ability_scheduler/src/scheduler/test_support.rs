//! Test helpers: abilities со счётчиками hooks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::ability::{routine, Ability, AbilityBehavior, AbilityContext, AbilityRef, BoxedRoutine, Step};

/// Тик 60Hz
pub const DT: f32 = 1.0 / 60.0;

#[derive(Debug, Default, Clone)]
pub struct HookCounters {
    start: Arc<AtomicUsize>,
    end: Arc<AtomicUsize>,
    cancel: Arc<AtomicUsize>,
}

impl HookCounters {
    pub fn starts(&self) -> usize {
        self.start.load(Ordering::SeqCst)
    }

    pub fn ends(&self) -> usize {
        self.end.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Routine висит `ticks` resume'ов, затем Finished
pub struct Probe {
    pub counters: HookCounters,
    pub ticks: u32,
}

impl AbilityBehavior for Probe {
    fn activate(&self, _ability: &Ability) -> BoxedRoutine {
        let mut left = self.ticks;
        routine::from_fn(move |_ctx: &mut AbilityContext<'_>| {
            if left == 0 {
                return Ok(Step::Finished);
            }
            left -= 1;
            Ok(Step::Suspended)
        })
    }

    fn on_start(&self, _ctx: &mut AbilityContext<'_>) {
        self.counters.start.fetch_add(1, Ordering::SeqCst);
    }

    fn on_end(&self, _ctx: &mut AbilityContext<'_>) {
        self.counters.end.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cancel(&self, _ctx: &mut AbilityContext<'_>) {
        self.counters.cancel.fetch_add(1, Ordering::SeqCst);
    }
}

/// Probe ability + её счётчики
pub fn probe(id: &str, cooldown: f32, ticks: u32) -> (AbilityRef, HookCounters) {
    let counters = HookCounters::default();
    let ability = Ability::new(
        id,
        Probe {
            counters: counters.clone(),
            ticks,
        },
    )
    .with_cooldown(cooldown)
    .into_ref();
    (ability, counters)
}

/// Probe, который не завершается сам
pub fn long_probe(id: &str, cooldown: f32) -> (AbilityRef, HookCounters) {
    probe(id, cooldown, u32::MAX)
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}
