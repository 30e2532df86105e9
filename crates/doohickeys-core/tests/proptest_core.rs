//! Property-based tests for the DooHickeys core engine.
//!
//! Uses proptest to generate part states and run sequences, then verify
//! the propagation invariants hold.

use doohickeys_core::config::SimConfig;
use doohickeys_core::contraption::Contraption;
use doohickeys_core::engine::Simulation;
use doohickeys_core::part::{PartState, PartType};
use doohickeys_core::propagation::relax_rotation;
use doohickeys_core::sim::SimulationState;
use doohickeys_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// A host frame delta, at or under the default bound.
fn arb_dt() -> impl Strategy<Value = f64> {
    0.001..=0.1f64
}

#[derive(Debug, Clone)]
enum RunOp {
    Update(f64),
    Stop,
    Start,
    Trigger(usize),
}

fn arb_run(max_ops: usize) -> impl Strategy<Value = Vec<RunOp>> {
    proptest::collection::vec(
        prop_oneof![
            6 => arb_dt().prop_map(RunOp::Update),
            1 => Just(RunOp::Stop),
            1 => Just(RunOp::Start),
            1 => (0..8usize).prop_map(RunOp::Trigger),
        ],
        0..max_ops,
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Conduction across a rigid joint moves heat downhill and conserves it.
    #[test]
    fn rigid_conduction_conserves_heat(
        hot in 20.0..400.0f64,
        cold_fraction in 0.0..1.0f64,
        dt in arb_dt(),
    ) {
        let cold = 20.0 + (hot - 20.0) * cold_fraction;
        let mut c = Contraption::new("conduct");
        let a = place(&mut c, PartType::IronFrame, 0, 0);
        let b = place(&mut c, PartType::IronFrame, 1, 0);
        c.state_mut(a).unwrap().temperature = hot;
        c.state_mut(b).unwrap().temperature = cold;

        let mut sim = Simulation::new(c);
        sim.start();
        sim.update(dt);

        let ta = sim.contraption().part(a).unwrap().state.temperature;
        let tb = sim.contraption().part(b).unwrap().state.temperature;
        prop_assert!(ta <= hot);
        prop_assert!(tb >= cold);
        prop_assert!((ta + tb - (hot + cold)).abs() < 1e-9);
    }

    /// Pipe flow never widens the pressure gap between two open tanks.
    #[test]
    fn steam_flow_never_widens_gap(
        pa in 0.0..110.0f64,
        pb in 0.0..110.0f64,
        dt in arb_dt(),
    ) {
        let mut c = Contraption::new("pipe");
        let a = place(&mut c, PartType::PressureTank, 0, 0);
        let b = place(&mut c, PartType::PressureTank, 1, 0);
        c.state_mut(a).unwrap().steam_pressure = pa;
        c.state_mut(b).unwrap().steam_pressure = pb;

        let mut sim = Simulation::new(c);
        sim.start();
        sim.update(dt);

        let qa = sim.contraption().part(a).unwrap().state.steam_pressure;
        let qb = sim.contraption().part(b).unwrap().state.steam_pressure;
        prop_assert!((qa - qb).abs() <= (pa - pb).abs() + 1e-9);
    }

    /// An isolated gear pair settles within two sweeps at its gear ratio.
    #[test]
    fn gear_pair_reaches_fixed_point(
        small_speed in 0.0..200.0f64,
        large_speed in 0.0..200.0f64,
    ) {
        let mut c = Contraption::new("gears");
        let large = place(&mut c, PartType::LargeGear, 0, 0);
        let small = place(&mut c, PartType::SmallGear, 1, 0);
        c.state_mut(small).unwrap().rotation_speed = small_speed;
        c.state_mut(large).unwrap().rotation_speed = large_speed;

        let relaxation = relax_rotation(&mut c, &SimConfig::default());
        prop_assert!(relaxation.settled);
        prop_assert!(relaxation.sweeps <= 2);

        let s = c.part(small).unwrap().state.rotation_speed;
        let l = c.part(large).unwrap().state.rotation_speed;
        prop_assert!((l - s * 0.5).abs() <= 1e-6 * s.abs().max(1.0));
    }

    /// Resource fields of surviving parts stay inside their bounds.
    #[test]
    fn surviving_parts_stay_in_bounds(
        pressure in -50.0..1000.0f64,
        charge in -50.0..1000.0f64,
        temperature in -50.0..5000.0f64,
        dt in arb_dt(),
    ) {
        let mut c = Contraption::new("bounds");
        let part = place(&mut c, PartType::Capacitor, 0, 0);
        {
            let s = c.state_mut(part).unwrap();
            s.steam_pressure = pressure;
            s.electric_charge = charge;
            s.temperature = temperature;
        }
        let mut sim = Simulation::new(c);
        sim.start();
        sim.update(dt);

        let config = sim.config().clone();
        if let Some(p) = sim.contraption().part(part) {
            let s = &p.state;
            prop_assert!((0.0..=config.limits.max_pressure).contains(&s.steam_pressure));
            prop_assert!((0.0..=config.limits.max_charge).contains(&s.electric_charge));
            prop_assert!(
                (config.heat.ambient_temperature..=config.limits.max_temperature)
                    .contains(&s.temperature)
            );
        }
    }

    /// Reset after any run restores defaults and the Building state.
    #[test]
    fn reset_restores_defaults(ops in arb_run(60)) {
        let (mut c, _) = gear_train();
        place(&mut c, PartType::CoalFurnace, 4, 0);
        place(&mut c, PartType::SteamBoiler, 5, 0);
        place(&mut c, PartType::PressureTank, 6, 0);
        place(&mut c, PartType::TimerSwitch, 0, -1);

        let mut sim = Simulation::new(c);
        sim.start();
        for op in ops {
            match op {
                RunOp::Update(dt) => {
                    sim.update(dt);
                }
                RunOp::Stop => sim.stop(),
                RunOp::Start => sim.start(),
                RunOp::Trigger(index) => {
                    let ids = sim.contraption().part_ids();
                    if let Some(&id) = ids.get(index % ids.len().max(1)) {
                        sim.trigger(id).unwrap();
                    }
                }
            }
        }

        sim.reset();
        prop_assert_eq!(sim.state(), SimulationState::Building);
        prop_assert_eq!(sim.tick_count(), 0);
        for part in sim.contraption().parts() {
            prop_assert_eq!(&part.state, &PartState::default());
        }
    }
}
