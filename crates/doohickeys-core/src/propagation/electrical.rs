//! Stage 4: tesla coils, capacitors, wire diffusion, lamps, and magnets.

use crate::event::Event;
use crate::id::PartId;
use crate::part::{ConnectionType, PartType};
use crate::physics::{PhysicsBackend, Vec2};

use super::{StepContext, update_pair};

pub(crate) fn flow<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, dt: f64) {
    let config = ctx.config;
    let elec = &config.electrical;

    for coil in ctx.contraption.ids_of_type(PartType::TeslaCoil) {
        let Some(state) = ctx.contraption.state_mut(coil) else {
            continue;
        };
        if !state.is_active {
            continue;
        }
        state.electric_charge =
            (state.electric_charge + elec.tesla_charge_rate * dt).min(elec.tesla_max_charge);
        if state.electric_charge > elec.tesla_discharge_threshold {
            discharge(ctx, coil);
        }
    }

    for part in ctx.contraption.parts_mut() {
        if part.part_type == PartType::Capacitor {
            let s = &mut part.state;
            s.electric_charge = (s.electric_charge - elec.capacitor_leak_rate * dt).max(0.0);
        }
    }

    for cid in ctx.contraption.connections_of_type(ConnectionType::Electrical) {
        update_pair(ctx.contraption, cid, |(_, a), (_, b)| {
            let flow = (a.electric_charge - b.electric_charge) * elec.flow_rate * dt;
            a.electric_charge -= flow;
            b.electric_charge += flow;
        });
    }

    let mut toggled = Vec::new();
    for part in ctx.contraption.parts_mut() {
        let threshold = match part.part_type {
            PartType::ArcLamp => elec.lamp_threshold,
            PartType::ElectromagneticCoil => elec.coil_threshold,
            _ => continue,
        };
        let lit = part.state.electric_charge > threshold;
        if lit != part.state.is_active {
            part.state.is_active = lit;
            toggled.push(part.id);
        }
    }
    for part in toggled {
        ctx.state_changed(part);
    }

    for coil in ctx.contraption.ids_of_type(PartType::ElectromagneticCoil) {
        if ctx.contraption.part(coil).is_some_and(|p| p.state.is_active) {
            attract(ctx, coil);
        }
    }
}

/// Throw an arc from `coil` to the nearest target within the Manhattan
/// radius. Contact triggers struck by the arc fire.
fn discharge<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, coil: PartId) {
    let config = ctx.config;
    let elec = &config.electrical;
    let Some(source) = ctx.contraption.part(coil) else {
        return;
    };
    let origin = source.position;
    let charge = source.state.electric_charge;

    let mut nearest: Option<(PartId, u32)> = None;
    for other in ctx.contraption.parts() {
        let kind = other.kind();
        if other.id == coil || !(kind.arc_target || kind.contact_trigger) {
            continue;
        }
        let distance = origin.manhattan_distance(&other.position);
        if distance > elec.arc_radius {
            continue;
        }
        if nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((other.id, distance));
        }
    }

    let start = ctx.position_of(coil).unwrap_or(Vec2::ZERO);
    let (to, end) = match nearest {
        Some((target, _)) => {
            let end = ctx.position_of(target).unwrap_or(start);
            if let Some(state) = ctx.contraption.state_mut(target) {
                state.electric_charge += charge * elec.arc_transfer;
            }
            let struck_trigger = ctx
                .contraption
                .part(target)
                .is_some_and(|p| p.kind().contact_trigger);
            if struck_trigger {
                if let Some(state) = ctx.contraption.state_mut(target) {
                    state.is_triggered = true;
                }
                ctx.state_changed(target);
            }
            (Some(target), end)
        }
        None if elec.ground_arcs => (None, start - Vec2::new(0.0, config.cell_size)),
        None => return,
    };

    if let Some(state) = ctx.contraption.state_mut(coil) {
        state.electric_charge = charge * (1.0 - elec.arc_transfer);
    }
    tracing::debug!(?coil, ?to, charge, "tesla arc");
    let tick = ctx.tick;
    ctx.emit(Event::ElectricalArc {
        from: coil,
        to,
        start,
        end,
        tick,
    });
}

/// Pull ferrous parts towards an energised coil with inverse-square falloff.
fn attract<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, coil: PartId) {
    let config = ctx.config;
    let elec = &config.electrical;
    let (Some(centre), Some(charge)) = (
        ctx.position_of(coil),
        ctx.contraption.part(coil).map(|p| p.state.electric_charge),
    ) else {
        return;
    };

    let targets: Vec<PartId> = ctx
        .contraption
        .parts()
        .filter(|p| p.id != coil && p.kind().ferrous)
        .map(|p| p.id)
        .collect();

    for target in targets {
        let Some(position) = ctx.position_of(target) else {
            continue;
        };
        let offset = centre - position;
        let dist_sq = offset.length_squared();
        if dist_sq <= elec.coil_min_range_sq || dist_sq >= elec.coil_range_sq {
            continue;
        }
        let magnitude = charge * elec.coil_strength / dist_sq;
        let force = offset.scale(magnitude / dist_sq.sqrt());
        ctx.physics.apply_force(target, force);
    }
}
