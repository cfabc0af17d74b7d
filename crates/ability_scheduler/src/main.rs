//! Headless симуляция ability scheduler'а
//!
//! Один агент с default loadout, случайные нажатия slot actions (seeded RNG),
//! ultimate на 2-й секунде. Печатает run events и состояние слотов.

use ability_scheduler::{
    create_headless_app, AbilityGroup, AbilityRun, AbilitySystem, DeterministicRng,
    KinematicAgent, LoadoutDefinition,
};
use bevy::prelude::*;
use rand::Rng;

const LOADOUT: &str = include_str!("../assets/default_loadout.ron");

fn main() {
    let seed = 42;
    println!("Starting ability scheduler headless simulation (seed: {})", seed);

    let loadout = match LoadoutDefinition::from_ron(LOADOUT).and_then(|definition| definition.build()) {
        Ok(loadout) => loadout,
        Err(err) => {
            eprintln!("Invalid loadout: {err}");
            std::process::exit(1);
        }
    };

    let agent = KinematicAgent {
        gravity_enabled: false,
        ..default()
    }
    .with_anchor(Vec3::new(0.0, 0.0, -20.0));

    let mut app = create_headless_app(seed);
    let entity = app
        .world_mut()
        .spawn(loadout.into_system().with_agent(agent))
        .id();

    let mut runs = app.world().resource::<Events<AbilityRun>>().get_cursor();

    // 600 тиков = 10 секунд при 60Hz
    for tick in 0..600u32 {
        let roll: f32 = app.world_mut().resource_mut::<DeterministicRng>().rng.gen();

        let action = match roll {
            _ if tick == 120 => Some("Ultimate"),
            r if r < 0.04 => Some("Ability1"),
            r if r < 0.07 => Some("Ability3"),
            r if r < 0.09 => Some("Blink"),
            _ => None,
        };
        if let Some(action) = action {
            if let Some(mut system) = app.world_mut().get_mut::<AbilitySystem>(entity) {
                if let Some(input) = system.input_mut() {
                    input.press(action);
                }
            }
        }

        app.update();

        for run in runs.read(app.world().resource::<Events<AbilityRun>>()) {
            println!("Tick {}: {:?} ran '{}'", tick, run.agent, run.ability);
        }

        if tick % 100 == 0 {
            if let Some(system) = app.world().get::<AbilitySystem>(entity) {
                let mode = system
                    .current_override()
                    .map_or("none", |mode| mode.name.as_str());
                println!(
                    "Tick {}: {} active instances, override: {}",
                    tick,
                    system.active_count(),
                    mode
                );
                for view in system.slot_views(AbilityGroup::Swappable) {
                    println!(
                        "  swappable[{}] {:?} on '{}'",
                        view.index,
                        view.ability,
                        view.action.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }

    println!("Simulation complete!");
}
