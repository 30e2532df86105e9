//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available everywhere tests run (via the `test-utils` feature).

use std::collections::BTreeMap;

use crate::contraption::Contraption;
use crate::grid::GridPosition;
use crate::id::PartId;
use crate::part::PartType;
use crate::physics::{PhysicsBackend, Vec2};

// ===========================================================================
// Recording physics backend
// ===========================================================================

/// Physics backend that records every command it receives.
///
/// Positions and rotations are `None` unless set, so the engine falls back
/// to grid placement.
#[derive(Debug, Default)]
pub struct RecordingPhysics {
    positions: BTreeMap<PartId, Vec2>,
    rotations: BTreeMap<PartId, f64>,
    pub forces: Vec<(PartId, Vec2)>,
    pub impulses: Vec<(PartId, Vec2)>,
    pub torques: Vec<(PartId, f64)>,
}

impl RecordingPhysics {
    pub fn set_position(&mut self, part: PartId, position: Vec2) {
        self.positions.insert(part, position);
    }

    pub fn set_rotation(&mut self, part: PartId, radians: f64) {
        self.rotations.insert(part, radians);
    }

    pub fn forces_on(&self, part: PartId) -> Vec<Vec2> {
        collect_for(&self.forces, part)
    }

    pub fn impulses_on(&self, part: PartId) -> Vec<Vec2> {
        collect_for(&self.impulses, part)
    }

    pub fn torques_on(&self, part: PartId) -> Vec<f64> {
        collect_for(&self.torques, part)
    }

    pub fn clear(&mut self) {
        self.forces.clear();
        self.impulses.clear();
        self.torques.clear();
    }
}

fn collect_for<T: Copy>(log: &[(PartId, T)], part: PartId) -> Vec<T> {
    log.iter()
        .filter(|(id, _)| *id == part)
        .map(|(_, v)| *v)
        .collect()
}

impl PhysicsBackend for RecordingPhysics {
    fn position(&self, part: PartId) -> Option<Vec2> {
        self.positions.get(&part).copied()
    }

    fn rotation(&self, part: PartId) -> Option<f64> {
        self.rotations.get(&part).copied()
    }

    fn apply_force(&mut self, part: PartId, force: Vec2) {
        self.forces.push((part, force));
    }

    fn apply_impulse(&mut self, part: PartId, impulse: Vec2) {
        self.impulses.push((part, impulse));
    }

    fn apply_torque(&mut self, part: PartId, torque: f64) {
        self.torques.push((part, torque));
    }
}

// ===========================================================================
// Scenario builders
// ===========================================================================

pub fn at(x: i32, y: i32) -> GridPosition {
    GridPosition::new(x, y)
}

/// Place `part_type` and panic if the cell is taken.
pub fn place(contraption: &mut Contraption, part_type: PartType, x: i32, y: i32) -> PartId {
    contraption
        .place(part_type, at(x, y))
        .unwrap_or_else(|e| panic!("placing {part_type:?} at ({x}, {y}): {e}"))
}

/// Parts of the classic steam line.
#[derive(Debug, Clone, Copy)]
pub struct SteamLine {
    pub furnace: PartId,
    pub boiler: PartId,
    pub tank: PartId,
}

/// Furnace, boiler, and tank side by side, joined rigid then steam.
pub fn steam_line() -> (Contraption, SteamLine) {
    let mut c = Contraption::new("steam line");
    let furnace = place(&mut c, PartType::CoalFurnace, 0, 0);
    let boiler = place(&mut c, PartType::SteamBoiler, 1, 0);
    let tank = place(&mut c, PartType::PressureTank, 2, 0);
    (
        c,
        SteamLine {
            furnace,
            boiler,
            tank,
        },
    )
}

/// Parts of a motor driving a wheel through a gear pair.
#[derive(Debug, Clone, Copy)]
pub struct GearTrain {
    pub motor: PartId,
    pub gearbox: PartId,
    pub small: PartId,
    pub large: PartId,
}

/// Motor on top of a gearbox, which drives a small gear and then a large
/// one to its right.
pub fn gear_train() -> (Contraption, GearTrain) {
    let mut c = Contraption::new("gear train");
    let gearbox = place(&mut c, PartType::GearBox, 0, 0);
    let motor = place(&mut c, PartType::ClockworkMotor, 0, 1);
    let small = place(&mut c, PartType::SmallGear, 1, 0);
    let large = place(&mut c, PartType::LargeGear, 2, 0);
    (
        c,
        GearTrain {
            motor,
            gearbox,
            small,
            large,
        },
    )
}

/// A contraption of `count` brass frames in a row, for benchmarks.
pub fn frame_row(count: i32) -> Contraption {
    let mut c = Contraption::new("frames");
    for x in 0..count {
        place(&mut c, PartType::BrassFrame, x, 0);
    }
    c
}
