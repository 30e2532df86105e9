//! Stages 2 and 3: steam generation, pipe flow, and pistons.

use crate::part::{ConnectionType, PartType};
use crate::physics::PhysicsBackend;

use super::{StepContext, update_pair};

pub(crate) fn generate<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, dt: f64) {
    let config = ctx.config;
    let steam = &config.steam;

    for part in ctx.contraption.parts_mut() {
        let s = &mut part.state;
        match part.part_type {
            PartType::SteamBoiler if s.temperature > steam.boiling_point => {
                let rate = (s.temperature - steam.boiling_point) / steam.generation_span
                    * steam.generation_rate
                    * dt;
                s.steam_pressure = (s.steam_pressure + rate).min(steam.boiler_max_pressure);
            }
            PartType::PressureTank => {
                s.steam_pressure = (s.steam_pressure - steam.tank_leak_rate * dt).max(0.0);
            }
            _ => {}
        }
    }
}

pub(crate) fn propagate<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, dt: f64) {
    let config = ctx.config;
    let steam = &config.steam;

    for cid in ctx.contraption.connections_of_type(ConnectionType::Steam) {
        update_pair(ctx.contraption, cid, |(type_a, a), (type_b, b)| {
            // A closed valve at either end blocks this pipe only.
            let closed = |part_type: PartType, active: bool| {
                part_type == PartType::SteamValve && !active
            };
            if closed(type_a, a.is_active) || closed(type_b, b.is_active) {
                return;
            }
            let flow = (a.steam_pressure - b.steam_pressure) * steam.flow_rate * dt;
            a.steam_pressure -= flow;
            b.steam_pressure += flow;
        });
    }

    for part in ctx.contraption.parts_mut() {
        if part.part_type != PartType::Piston {
            continue;
        }
        let s = &mut part.state;
        if s.steam_pressure > steam.piston_threshold {
            s.mechanical_energy = s.steam_pressure * steam.piston_conversion;
            s.steam_pressure -= steam.piston_consumption * dt;
        }
    }
}
