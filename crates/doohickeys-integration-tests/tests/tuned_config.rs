//! Tuning tables loaded through `doohickeys-data` change how a run plays out.

use std::fs;
use std::path::{Path, PathBuf};

use doohickeys_core::contraption::Contraption;
use doohickeys_core::engine::Simulation;
use doohickeys_core::event::{Event, EventKind};
use doohickeys_core::part::PartType;
use doohickeys_core::physics::NullPhysics;
use doohickeys_core::test_utils::*;
use doohickeys_data::{DataLoadError, load_from_dir, load_sim_config};

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "doohickeys_tuned_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

fn pressurised_tank() -> Contraption {
    let mut c = Contraption::new("tank");
    let tank = place(&mut c, PartType::PressureTank, 0, 0);
    c.state_mut(tank).unwrap().steam_pressure = 150.0;
    c
}

fn explosions(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| e.kind() == EventKind::Explosion)
        .count()
}

#[test]
fn stock_tank_blows_and_tuned_tank_holds() {
    let mut stock = Simulation::new(pressurised_tank());
    stock.start();
    assert_eq!(explosions(&stock.update(0.1).events), 1);

    let dir = make_test_dir("threshold");
    fs::write(
        dir.join("simulation.toml"),
        "[explosions]\npressure_threshold = 180.0\n",
    )
    .unwrap();
    let config = load_from_dir(&dir).unwrap();
    assert_eq!(config.explosions.pressure_threshold, 180.0);

    let mut tuned = Simulation::with_config(pressurised_tank(), NullPhysics, config).unwrap();
    tuned.start();
    for _ in 0..10 {
        assert_eq!(explosions(&tuned.update(0.1).events), 0);
    }
    assert_eq!(tuned.contraption().part_count(), 1);

    cleanup(&dir);
}

#[test]
fn ron_config_disables_ground_arcs() {
    let dir = make_test_dir("ground");
    let path = dir.join("simulation.ron");
    fs::write(&path, "(electrical: (ground_arcs: false))").unwrap();
    let config = load_sim_config(&path).unwrap();

    let build = || {
        let mut c = Contraption::new("lone coil");
        let coil = place(&mut c, PartType::TeslaCoil, 0, 0);
        c.state_mut(coil).unwrap().is_active = true;
        (c, coil)
    };
    let count_arcs = |sim: &mut Simulation<NullPhysics>| {
        let mut arcs = Vec::new();
        for _ in 0..40 {
            for event in sim.update(0.1).events {
                if let Event::ElectricalArc { to, .. } = event {
                    arcs.push(to);
                }
            }
        }
        arcs
    };

    let (c, coil) = build();
    let mut grounded = Simulation::new(c);
    grounded.start();
    let arcs = count_arcs(&mut grounded);
    assert!(!arcs.is_empty());
    assert!(arcs.iter().all(Option::is_none));
    assert!(grounded.contraption().part(coil).unwrap().state.electric_charge < 80.0);

    let (c, coil) = build();
    let mut insulated = Simulation::with_config(c, NullPhysics, config).unwrap();
    insulated.start();
    assert!(count_arcs(&mut insulated).is_empty());
    assert_eq!(
        insulated.contraption().part(coil).unwrap().state.electric_charge,
        100.0
    );

    cleanup(&dir);
}

#[test]
fn json_config_unbounds_the_delta() {
    let dir = make_test_dir("json");
    fs::write(dir.join("simulation.json"), r#"{"max_dt": null}"#).unwrap();
    let config = load_from_dir(&dir).unwrap();
    assert_eq!(config.max_dt, None);

    let mut sim = Simulation::with_config(frame_row(2), NullPhysics, config).unwrap();
    sim.start();
    assert_eq!(sim.update(0.75).dt, 0.75);

    cleanup(&dir);
}

#[test]
fn invalid_tuning_never_reaches_the_engine() {
    let dir = make_test_dir("invalid");
    fs::write(
        dir.join("simulation.toml"),
        "[explosions]\nradius = -10.0\n",
    )
    .unwrap();
    assert!(matches!(
        load_from_dir(&dir),
        Err(DataLoadError::InvalidConfig { .. })
    ));
    cleanup(&dir);
}
