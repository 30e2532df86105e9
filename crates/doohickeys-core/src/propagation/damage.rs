//! Stages 7 and 8: explosions, blast damage, and removal of destroyed parts.

use std::collections::BTreeSet;

use crate::event::Event;
use crate::id::PartId;
use crate::physics::PhysicsBackend;

use super::StepContext;

/// Detonate every overloaded or ignited part, cascading until no new
/// candidates appear. Each part explodes at most once per tick.
pub(crate) fn resolve_explosions<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>) {
    let mut exploded = BTreeSet::new();
    loop {
        let candidates = candidates(ctx, &exploded);
        if candidates.is_empty() {
            break;
        }
        for part in candidates {
            if exploded.insert(part) {
                detonate(ctx, part);
            }
        }
    }
}

fn candidates<P: PhysicsBackend + ?Sized>(
    ctx: &mut StepContext<'_, P>,
    exploded: &BTreeSet<PartId>,
) -> Vec<PartId> {
    let config = ctx.config;
    let limits = &config.explosions;
    let mut out: Vec<PartId> = ctx
        .ignited
        .drain(..)
        .filter(|id| !exploded.contains(id))
        .collect();

    for part in ctx.contraption.parts() {
        if exploded.contains(&part.id) || out.contains(&part.id) {
            continue;
        }
        let kind = part.kind();
        let s = &part.state;
        let overloaded = s.steam_pressure > limits.pressure_threshold
            || (kind.flammable && s.temperature > limits.ignition_temperature)
            || (!kind.charge_store && s.electric_charge > limits.overcharge_threshold);
        if overloaded {
            out.push(part.id);
        }
    }
    out.retain(|id| ctx.contraption.contains(*id));
    out
}

fn detonate<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, source: PartId) {
    let config = ctx.config;
    let blast = &config.explosions;
    let Some(part) = ctx.contraption.part(source) else {
        return;
    };
    let part_type = part.part_type;
    let (radius, force) = if part.kind().flammable {
        (blast.ordnance_radius, blast.ordnance_force)
    } else {
        (blast.radius, blast.force)
    };
    let Some(origin) = ctx.position_of(source) else {
        return;
    };

    let others: Vec<PartId> = ctx
        .contraption
        .part_ids()
        .into_iter()
        .filter(|&id| id != source)
        .collect();

    for other in others {
        let Some(position) = ctx.position_of(other) else {
            continue;
        };
        let offset = position - origin;
        let distance = offset.length();
        if distance >= radius {
            continue;
        }
        let falloff = 1.0 - distance / radius;
        if distance > 0.0 {
            ctx.physics
                .apply_impulse(other, offset.scale(force * falloff / distance));
        }
        let Some(target) = ctx.contraption.part_mut(other) else {
            continue;
        };
        let kind = target.kind();
        let state = &mut target.state;
        state.durability -= config.damage.blast_damage * falloff;
        if kind.fragile && falloff > config.damage.fragile_falloff {
            state.durability = 0.0;
        }
        if kind.flammable && !ctx.ignited.contains(&other) {
            ctx.ignited.push(other);
        }
    }

    tracing::debug!(part = ?source, ?part_type, radius, "explosion");
    let tick = ctx.tick;
    ctx.emit(Event::Explosion {
        part: source,
        part_type,
        position: origin,
        radius,
        tick,
    });

    if let Ok(removed) = ctx.contraption.remove(source) {
        ctx.removed.push(source);
        ctx.emit(Event::PartDestroyed {
            part: source,
            part_type,
            tick,
        });
        if removed.is_character() {
            ctx.emit(Event::CharacterDestroyed { part: source, tick });
            ctx.character_lost = true;
        }
    }
}

/// Report character damage and remove every part with no durability left.
pub(crate) fn remove_destroyed<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>) {
    let tick = ctx.tick;
    let characters = std::mem::take(&mut ctx.character_durability);
    for &(id, before) in &characters {
        let Some(now) = ctx.contraption.part(id).map(|p| p.state.durability) else {
            continue;
        };
        if now <= 0.0 {
            ctx.emit(Event::CharacterDestroyed { part: id, tick });
            ctx.character_lost = true;
        } else if now != before {
            ctx.emit(Event::CharacterDamaged {
                part: id,
                durability: now,
                tick,
            });
        }
    }
    ctx.character_durability = characters;

    let doomed: Vec<PartId> = ctx
        .contraption
        .parts()
        .filter(|p| p.state.is_destroyed())
        .map(|p| p.id)
        .collect();

    for id in doomed {
        if let Ok(part) = ctx.contraption.remove(id) {
            tracing::debug!(part = ?id, part_type = ?part.part_type, "part destroyed");
            ctx.removed.push(id);
            ctx.emit(Event::PartDestroyed {
                part: id,
                part_type: part.part_type,
                tick,
            });
        }
    }
}
