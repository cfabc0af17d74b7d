//! Action input — press/release/held/consume-once семантика per named action.
//!
//! Raw polling и key-mapping живут снаружи (Godot/Bevy input layer).
//! Сюда приходят уже именованные actions: `press("Dash")`, `release("Dash")`.

use bevy::prelude::*;
use std::collections::HashMap;

/// Input contract, который используют suspension primitives и extensions.
pub trait InputSource: Send + Sync {
    /// Action был нажат в этом тике (не потребляет edge)
    fn was_pressed(&self, action: &str) -> bool;

    /// Потребляет press edge: true только один раз на нажатие
    fn consume_pressed(&mut self, action: &str) -> bool;

    /// Потребляет release edge
    fn consume_released(&mut self, action: &str) -> bool;

    /// Action удерживается
    fn held(&self, action: &str) -> bool;

    /// Контекстное значение action (axis, trigger pressure, ...)
    fn value(&self, action: &str) -> Vec2;

    /// Input layer: action нажат
    fn press(&mut self, action: &str);

    /// Input layer: action отпущен
    fn release(&mut self, action: &str);
}

/// Состояние одного action за текущий тик
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionSignal {
    pub pressed: bool,
    pub released: bool,
    pub held: bool,
    pub value: Vec2,
}

/// Reference `InputSource`: HashMap action → signal.
///
/// Edges (`pressed`/`released`) живут до `end_tick()`, `held` — до `release()`.
#[derive(Debug, Clone, Default)]
pub struct ActionInput {
    signals: HashMap<String, ActionSignal>,
}

impl ActionInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, action: &str, value: Vec2) {
        self.signals.entry(action.to_string()).or_default().value = value;
    }

    pub fn signal(&self, action: &str) -> ActionSignal {
        self.signals.get(action).copied().unwrap_or_default()
    }

    /// Сбрасывает edges в конце тика (held остаётся)
    pub fn end_tick(&mut self) {
        for signal in self.signals.values_mut() {
            signal.pressed = false;
            signal.released = false;
        }
    }
}

impl InputSource for ActionInput {
    fn was_pressed(&self, action: &str) -> bool {
        self.signal(action).pressed
    }

    fn consume_pressed(&mut self, action: &str) -> bool {
        match self.signals.get_mut(action) {
            Some(signal) if signal.pressed => {
                signal.pressed = false;
                true
            }
            _ => false,
        }
    }

    fn consume_released(&mut self, action: &str) -> bool {
        match self.signals.get_mut(action) {
            Some(signal) if signal.released => {
                signal.released = false;
                true
            }
            _ => false,
        }
    }

    fn held(&self, action: &str) -> bool {
        self.signal(action).held
    }

    fn value(&self, action: &str) -> Vec2 {
        self.signal(action).value
    }

    fn press(&mut self, action: &str) {
        let signal = self.signals.entry(action.to_string()).or_default();
        signal.pressed = true;
        signal.held = true;
    }

    fn release(&mut self, action: &str) {
        let signal = self.signals.entry(action.to_string()).or_default();
        signal.released = true;
        signal.held = false;
    }
}
