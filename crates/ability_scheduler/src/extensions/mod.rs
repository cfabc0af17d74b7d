//! Scheduler extensions
//!
//! Extension = observer/driver с фиксированным interface
//! {initialize, on_ability_run, handle, dispose}. Scheduler передаётся
//! явно в каждый hook (никаких глобальных back-references), extension
//! видит только публичный контракт `AbilitySystem`.
//!
//! Набор extensions собирается явно при старте (`with_extension`).

use crate::scheduler::{AbilityRunEvent, AbilitySystem};

pub mod ultimate;

pub use ultimate::{UltimateConfig, UltimateExtension};

pub trait AbilityExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Один раз, до первого тика (или сразу при добавлении в уже запущенный scheduler)
    fn initialize(&mut self, system: &mut AbilitySystem);

    /// Run event (доставляется в extension-фазе тика, до `handle`)
    fn on_ability_run(&mut self, _system: &mut AbilitySystem, _event: &AbilityRunEvent) {}

    /// Per-tick hook
    fn handle(&mut self, system: &mut AbilitySystem);

    fn dispose(&mut self, _system: &mut AbilitySystem) {}
}

/// Упорядоченный набор extensions
#[derive(Default)]
pub struct ExtensionHost {
    extensions: Vec<Box<dyn AbilityExtension>>,
}

impl ExtensionHost {
    pub fn push(&mut self, extension: Box<dyn AbilityExtension>) {
        self.extensions.push(extension);
    }

    pub fn append(&mut self, mut other: ExtensionHost) {
        self.extensions.append(&mut other.extensions);
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|extension| extension.name()).collect()
    }

    pub fn initialize_all(&mut self, system: &mut AbilitySystem) {
        for extension in &mut self.extensions {
            extension.initialize(system);
        }
    }

    /// Run events → каждому extension, затем per-tick `handle`
    pub fn dispatch(&mut self, system: &mut AbilitySystem, events: &[AbilityRunEvent]) {
        for extension in &mut self.extensions {
            for event in events {
                extension.on_ability_run(system, event);
            }
            extension.handle(system);
        }
    }

    pub fn dispose_all(&mut self, system: &mut AbilitySystem) {
        for extension in &mut self.extensions {
            extension.dispose(system);
        }
        self.extensions.clear();
    }
}
