//! Seam to the host's rigid-body physics backend.
//!
//! The simulation never integrates motion itself. It reads body positions
//! and rotations and issues forces, impulses, and torques that the host's
//! physics step applies on its own schedule.

use serde::{Deserialize, Serialize};

use crate::id::PartId;

/// A 2D vector in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `angle` radians from the +x axis.
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Rigid-body operations the simulation issues against a part's body.
///
/// Queries return `None` when the host has no body for the part; the
/// simulation then falls back to the part's grid position and placement
/// rotation.
pub trait PhysicsBackend {
    fn position(&self, part: PartId) -> Option<Vec2>;

    /// Body rotation in radians.
    fn rotation(&self, part: PartId) -> Option<f64>;

    fn apply_force(&mut self, part: PartId, force: Vec2);

    fn apply_impulse(&mut self, part: PartId, impulse: Vec2);

    fn apply_torque(&mut self, part: PartId, torque: f64);
}

/// A backend with no bodies. Every command is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPhysics;

impl PhysicsBackend for NullPhysics {
    fn position(&self, _part: PartId) -> Option<Vec2> {
        None
    }

    fn rotation(&self, _part: PartId) -> Option<f64> {
        None
    }

    fn apply_force(&mut self, _part: PartId, _force: Vec2) {}

    fn apply_impulse(&mut self, _part: PartId, _impulse: Vec2) {}

    fn apply_torque(&mut self, _part: PartId, _torque: f64) {}
}

impl<P: PhysicsBackend + ?Sized> PhysicsBackend for Box<P> {
    fn position(&self, part: PartId) -> Option<Vec2> {
        (**self).position(part)
    }

    fn rotation(&self, part: PartId) -> Option<f64> {
        (**self).rotation(part)
    }

    fn apply_force(&mut self, part: PartId, force: Vec2) {
        (**self).apply_force(part, force)
    }

    fn apply_impulse(&mut self, part: PartId, impulse: Vec2) {
        (**self).apply_impulse(part, impulse)
    }

    fn apply_torque(&mut self, part: PartId, torque: f64) {
        (**self).apply_torque(part, torque)
    }
}
