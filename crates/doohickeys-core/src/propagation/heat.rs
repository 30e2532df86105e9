//! Stage 1: furnace heating and conduction across rigid joints.

use crate::part::{ConnectionType, PartType};
use crate::physics::PhysicsBackend;

use super::{StepContext, update_pair};

pub(crate) fn transfer<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, dt: f64) {
    let config = ctx.config;
    let heat = &config.heat;

    for part in ctx.contraption.parts_mut() {
        if part.part_type != PartType::CoalFurnace {
            continue;
        }
        let s = &mut part.state;
        s.temperature = if s.is_active {
            (s.temperature + heat.furnace_heating_rate * dt).min(heat.furnace_max_temperature)
        } else {
            (s.temperature - heat.furnace_cooling_rate * dt).max(heat.ambient_temperature)
        };
    }

    // Explicit diffusion. Large steps can overshoot; that is accepted.
    for cid in ctx.contraption.connections_of_type(ConnectionType::Rigid) {
        update_pair(ctx.contraption, cid, |(_, a), (_, b)| {
            let flow = (a.temperature - b.temperature) * heat.conduction * dt;
            a.temperature -= flow;
            b.temperature += flow;
        });
    }
}
