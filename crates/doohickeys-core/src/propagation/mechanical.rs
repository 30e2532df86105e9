//! Stage 5: motors, springs, gear trains, flywheels, wheels, and propellers.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::contraption::Contraption;
use crate::id::PartId;
use crate::part::PartType;
use crate::physics::{PhysicsBackend, Vec2};

use super::StepContext;

/// Result of one rotation relaxation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relaxation {
    /// Sweeps over the drive links that were run.
    pub sweeps: u32,
    /// Whether every linked pair reached its ratio before the cap.
    pub settled: bool,
}

/// Speed ratio from `from` into `to` across a drive link.
///
/// Small into large gears halves the speed; large into small doubles it.
/// Every other pairing turns at the same speed.
pub fn gear_ratio(from: PartType, to: PartType, config: &SimConfig) -> f64 {
    let ratio = config.mechanical.small_to_large_ratio;
    match (from, to) {
        (PartType::SmallGear, PartType::LargeGear) => ratio,
        (PartType::LargeGear, PartType::SmallGear) => 1.0 / ratio,
        _ => 1.0,
    }
}

/// Relax rotation speeds across every chain and axle link until each pair
/// turns at its gear ratio, or the sweep cap is hit.
///
/// A pair `(a, b)` with ratio `r` is settled when `speed_b == speed_a * r`.
/// An unsettled pair is solved exactly: the faster side gives up half of
/// the excess and the slower side takes the rest at the ratio. Chains settle
/// over successive sweeps. Cyclic trains with inconsistent ratios never
/// settle and stop at the cap.
pub fn relax_rotation(contraption: &mut Contraption, config: &SimConfig) -> Relaxation {
    let links: Vec<(PartId, PartId, f64)> = contraption
        .connections()
        .filter(|(_, c)| c.connection_type.is_drive())
        .filter_map(|(_, c)| {
            let a = contraption.part(c.part_a)?;
            let b = contraption.part(c.part_b)?;
            Some((a.id, b.id, gear_ratio(a.part_type, b.part_type, config)))
        })
        .collect();

    if links.is_empty() {
        return Relaxation {
            sweeps: 0,
            settled: true,
        };
    }

    let eps = config.relaxation_epsilon;
    fn speed(c: &Contraption, id: PartId) -> f64 {
        c.part(id).map_or(0.0, |p| p.state.rotation_speed)
    }

    for sweep in 1..=config.relaxation_iteration_cap {
        let mut changed = false;
        for &(a, b, r) in &links {
            let (mut sa, mut sb) = (speed(contraption, a), speed(contraption, b));
            let error = sa * r - sb;
            let tolerance = eps * (sa * r).abs().max(sb.abs()).max(1.0);
            if error > tolerance {
                sb += error / 2.0;
                sa -= error / (2.0 * r);
            } else if error < -tolerance {
                let deficit = sb / r - sa;
                sa += deficit / 2.0;
                sb -= deficit * r / 2.0;
            } else {
                continue;
            }
            changed = true;
            if let Some(s) = contraption.state_mut(a) {
                s.rotation_speed = sa;
            }
            if let Some(s) = contraption.state_mut(b) {
                s.rotation_speed = sb;
            }
        }
        if !changed {
            return Relaxation {
                sweeps: sweep,
                settled: true,
            };
        }
    }

    tracing::warn!(
        cap = config.relaxation_iteration_cap,
        links = links.len(),
        "rotation relaxation hit its sweep cap without settling"
    );
    Relaxation {
        sweeps: config.relaxation_iteration_cap,
        settled: false,
    }
}

pub(crate) fn rotate<P: PhysicsBackend + ?Sized>(
    ctx: &mut StepContext<'_, P>,
    dt: f64,
) -> Relaxation {
    let config = ctx.config;
    let mech = &config.mechanical;

    for part in ctx.contraption.parts_mut() {
        let s = &mut part.state;
        match part.part_type {
            PartType::ClockworkMotor => {
                if s.is_active && s.mechanical_energy > 0.0 {
                    s.rotation_speed = mech.motor_speed;
                    s.mechanical_energy -= mech.motor_drain * dt;
                } else {
                    s.rotation_speed = (s.rotation_speed - mech.motor_spin_down * dt).max(0.0);
                }
            }
            PartType::WindupSpring if s.is_active && s.mechanical_energy > 0.0 => {
                let release = s.mechanical_energy.min(mech.spring_release_rate * dt);
                s.mechanical_energy -= release;
                s.rotation_speed = release * mech.spring_speed_factor;
            }
            _ => {}
        }
    }

    let relaxation = relax_rotation(ctx.contraption, config);

    for part in ctx.contraption.parts_mut() {
        if part.part_type != PartType::Flywheel {
            continue;
        }
        let s = &mut part.state;
        if s.rotation_speed > 0.0 {
            s.mechanical_energy += s.rotation_speed * mech.flywheel_storage * dt;
        } else if s.mechanical_energy > 0.0 {
            s.rotation_speed = s.mechanical_energy * mech.flywheel_release;
            s.mechanical_energy -= mech.flywheel_drain * dt;
        }
    }

    let spinning: Vec<(PartId, PartType, f64)> = ctx
        .contraption
        .parts()
        .filter(|p| {
            matches!(
                p.part_type,
                PartType::CogWheel | PartType::SpikedWheel | PartType::PropellerBlade
            ) && p.state.rotation_speed > 0.0
        })
        .map(|p| (p.id, p.part_type, p.state.rotation_speed))
        .collect();

    for (id, part_type, speed) in spinning {
        if part_type == PartType::PropellerBlade {
            let angle = ctx.rotation_of(id) + std::f64::consts::FRAC_PI_2;
            let thrust = Vec2::from_angle(angle).scale(speed * mech.propeller_thrust);
            ctx.physics.apply_force(id, thrust);
        } else {
            ctx.physics.apply_torque(id, speed * mech.wheel_torque);
        }
    }

    relaxation
}
