//! Headless runner: builds a small contraption, runs it for ten seconds of
//! host time, and prints what happened.
//!
//! Run with: `cargo run --package doohickeys-data --example headless_runner [config-dir]`
//!
//! `RUST_LOG=doohickeys_core=debug` shows arcs, blasts, and network rebuilds.

use std::path::PathBuf;

use doohickeys_core::contraption::{Contraption, ContraptionError};
use doohickeys_core::engine::Simulation;
use doohickeys_core::event::EventKind;
use doohickeys_core::grid::GridPosition;
use doohickeys_core::part::PartType;
use doohickeys_core::physics::NullPhysics;
use tracing_subscriber::EnvFilter;

const FRAME: f64 = 1.0 / 60.0;
const FRAMES: u32 = 600;

fn build() -> Result<Contraption, ContraptionError> {
    let mut c = Contraption::new("headless demo");
    let at = GridPosition::new;

    // Steam line.
    c.place(PartType::CoalFurnace, at(0, 0))?;
    c.place(PartType::SteamBoiler, at(1, 0))?;
    c.place(PartType::PressureTank, at(2, 0))?;

    // Motor-driven wheel.
    c.place(PartType::GearBox, at(5, 0))?;
    c.place(PartType::ClockworkMotor, at(5, 1))?;
    c.place(PartType::SmallGear, at(6, 0))?;
    c.place(PartType::LargeGear, at(7, 0))?;
    c.place(PartType::CogWheel, at(5, -1))?;

    // Fuse.
    c.place(PartType::TimerSwitch, at(10, 0))?;
    c.place(PartType::Dynamite, at(11, 0))?;

    c.place(PartType::KameraMan, at(0, 2))?;
    Ok(c)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = doohickeys_data::load_from_dir(&config_dir).unwrap_or_else(|e| {
        panic!("failed to load config from {}: {e}", config_dir.display());
    });
    let contraption = build().unwrap_or_else(|e| panic!("failed to build contraption: {e}"));

    let mut sim = Simulation::with_config(contraption, NullPhysics, config)
        .unwrap_or_else(|e| panic!("invalid config: {e}"));
    sim.suppress(EventKind::PartStateChanged);

    let report = sim.validate();
    for issue in report.iter() {
        println!("  validation: {issue}");
    }

    sim.start();
    let mut explosions = 0;
    let mut removed = 0;
    for _ in 0..FRAMES {
        let tick = sim.update(FRAME);
        explosions += tick
            .events
            .iter()
            .filter(|e| e.kind() == EventKind::Explosion)
            .count();
        removed += tick.removed.len();
        if !sim.is_running() {
            break;
        }
    }

    let summary = sim.summary();
    println!("=== {} ===", sim.contraption().name());
    println!(
        "state={} ticks={} elapsed={:.2}s",
        sim.state(),
        sim.tick_count(),
        sim.elapsed()
    );
    println!(
        "parts={} connections={} mass={:.1} powered={}",
        summary.parts, summary.connections, summary.total_mass, summary.powered_parts
    );
    println!("explosions={explosions} removed={removed}");
    if let Some(durability) = summary.character_durability {
        println!("character durability={durability:.1}");
    }

    for snap in sim.snapshot_all_parts() {
        let s = &snap.state;
        println!(
            "  [{:>16}] {} temp={:.1} pressure={:.1} charge={:.1} speed={:.1}",
            snap.part_type.to_string(),
            snap.position,
            s.temperature,
            s.steam_pressure,
            s.electric_charge,
            s.rotation_speed
        );
    }
}
