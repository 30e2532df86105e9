//! Stage 6: timer countdowns and trigger effects on connected parts.

use crate::event::Event;
use crate::id::PartId;
use crate::part::PartType;
use crate::physics::{PhysicsBackend, Vec2};

use super::StepContext;

pub(crate) fn resolve<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, dt: f64) {
    let mut expired = Vec::new();
    for part in ctx.contraption.parts_mut() {
        if part.part_type != PartType::TimerSwitch || !part.state.is_active {
            continue;
        }
        let s = &mut part.state;
        s.mechanical_energy -= dt;
        if s.mechanical_energy <= 0.0 {
            s.is_triggered = true;
            s.is_active = false;
            expired.push(part.id);
        }
    }
    for timer in expired {
        ctx.state_changed(timer);
    }

    // Effects never raise new trigger flags, so one pass drains them all.
    let triggered: Vec<PartId> = ctx
        .contraption
        .parts()
        .filter(|p| p.state.is_triggered)
        .map(|p| p.id)
        .collect();

    for trigger in triggered {
        for neighbor in ctx.contraption.neighbors_of(trigger) {
            apply_effect(ctx, neighbor);
            ctx.state_changed(neighbor);
        }
        if let Some(state) = ctx.contraption.state_mut(trigger) {
            state.is_triggered = false;
        }
    }
}

fn apply_effect<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, target: PartId) {
    let Some(part_type) = ctx.contraption.part(target).map(|p| p.part_type) else {
        return;
    };
    match part_type {
        PartType::SteamValve
        | PartType::ClockworkMotor
        | PartType::TeslaCoil
        | PartType::CoalFurnace => {
            if let Some(state) = ctx.contraption.state_mut(target) {
                state.is_active = !state.is_active;
            }
        }
        PartType::WindupSpring => {
            if let Some(state) = ctx.contraption.state_mut(target) {
                state.is_active = true;
            }
        }
        PartType::Dynamite => {
            if !ctx.ignited.contains(&target) {
                ctx.ignited.push(target);
            }
        }
        PartType::Cannon => fire_cannon(ctx, target),
        PartType::Bellows => puff_bellows(ctx, target),
        _ => {}
    }
}

fn fire_cannon<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, cannon: PartId) {
    let config = ctx.config;
    let t = &config.triggers;
    let Some(origin) = ctx.position_of(cannon) else {
        return;
    };
    let facing = Vec2::from_angle(ctx.rotation_of(cannon));

    ctx.physics.apply_impulse(cannon, -facing.scale(t.cannon_recoil));

    let position = origin + facing.scale(t.cannon_muzzle_offset);
    let velocity = facing.scale(t.cannon_muzzle_velocity);
    tracing::debug!(?cannon, "cannon fired");
    let tick = ctx.tick;
    ctx.emit(Event::CannonFired {
        part: cannon,
        position,
        velocity,
        tick,
    });
}

/// Blow light parts away from the bellows along its facing.
fn puff_bellows<P: PhysicsBackend + ?Sized>(ctx: &mut StepContext<'_, P>, bellows: PartId) {
    let config = ctx.config;
    let t = &config.triggers;
    let Some(origin) = ctx.position_of(bellows) else {
        return;
    };
    let direction = Vec2::from_angle(ctx.rotation_of(bellows)).scale(t.bellows_strength);

    let light: Vec<PartId> = ctx
        .contraption
        .parts()
        .filter(|p| p.kind().mass < t.bellows_max_mass)
        .map(|p| p.id)
        .collect();

    for part in light {
        let Some(position) = ctx.position_of(part) else {
            continue;
        };
        let distance = (position - origin).length();
        if distance < t.bellows_range {
            let falloff = 1.0 - distance / t.bellows_range;
            ctx.physics.apply_impulse(part, direction.scale(falloff));
        }
    }

    let tick = ctx.tick;
    ctx.emit(Event::SteamRelease {
        part: bellows,
        position: origin,
        direction,
        tick,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::contraption::Contraption;
    use crate::event::EventKind;
    use crate::grid::GridPosition;
    use crate::physics::NullPhysics;
    use crate::test_utils::RecordingPhysics;

    fn at(x: i32, y: i32) -> GridPosition {
        GridPosition::new(x, y)
    }

    fn run(c: &mut Contraption, dt: f64) -> (Vec<Event>, Vec<PartId>) {
        let config = SimConfig::default();
        let mut physics = NullPhysics;
        let mut ctx = StepContext::new(c, &mut physics, &config, 1);
        resolve(&mut ctx, dt);
        (ctx.events, ctx.ignited)
    }

    #[test]
    fn timer_counts_down_then_fires_once() {
        let mut c = Contraption::new("timer");
        let timer = c.place(PartType::TimerSwitch, at(0, 0)).unwrap();
        let valve = c.place(PartType::SteamValve, at(1, 0)).unwrap();
        {
            let s = c.state_mut(timer).unwrap();
            s.is_active = true;
            s.mechanical_energy = 1.5;
        }

        run(&mut c, 1.0);
        assert!(!c.part(valve).unwrap().state.is_active);

        let (events, _) = run(&mut c, 1.0);
        assert!(c.part(valve).unwrap().state.is_active);
        let timer_state = &c.part(timer).unwrap().state;
        assert!(!timer_state.is_active);
        assert!(!timer_state.is_triggered);
        // Timer itself, then the valve.
        assert_eq!(events.len(), 2);

        // Spent timers stay quiet.
        run(&mut c, 1.0);
        assert!(c.part(valve).unwrap().state.is_active);
    }

    #[test]
    fn trigger_toggles_and_arms_neighbours() {
        let mut c = Contraption::new("fanout");
        let plate = c.place(PartType::TimerSwitch, at(1, 1)).unwrap();
        let furnace = c.place(PartType::CoalFurnace, at(0, 0)).unwrap();
        let spring = c.place(PartType::WindupSpring, at(1, 2)).unwrap();
        c.state_mut(plate).unwrap().is_triggered = true;

        let (events, _) = run(&mut c, 0.0);
        assert!(c.part(furnace).unwrap().state.is_active);
        assert!(c.part(spring).unwrap().state.is_active);
        assert!(!c.part(plate).unwrap().state.is_triggered);
        assert_eq!(
            events
                .iter()
                .filter(|e| e.kind() == EventKind::PartStateChanged)
                .count(),
            2
        );
    }

    #[test]
    fn dynamite_is_queued_not_detonated() {
        let mut c = Contraption::new("fuse");
        let wire = c.place(PartType::Tripwire, at(0, 0)).unwrap();
        let tnt = c.place(PartType::Dynamite, at(1, 0)).unwrap();
        c.state_mut(wire).unwrap().is_triggered = true;
        let (_, ignited) = run(&mut c, 0.0);
        assert_eq!(ignited, vec![tnt]);
        assert!(c.contains(tnt));
    }

    #[test]
    fn cannon_recoils_and_reports_projectile() {
        let mut c = Contraption::new("cannon");
        let wire = c.place(PartType::Tripwire, at(0, 0)).unwrap();
        let cannon = c.place(PartType::Cannon, at(1, 0)).unwrap();
        c.state_mut(wire).unwrap().is_triggered = true;

        let config = SimConfig::default();
        let mut physics = RecordingPhysics::default();
        let mut ctx = StepContext::new(&mut c, &mut physics, &config, 4);
        resolve(&mut ctx, 0.0);
        let events = ctx.events;

        assert_eq!(physics.impulses_on(cannon), vec![Vec2::new(-1000.0, 0.0)]);
        let fired = events
            .iter()
            .find(|e| e.kind() == EventKind::CannonFired)
            .unwrap();
        assert_eq!(
            fired,
            &Event::CannonFired {
                part: cannon,
                position: Vec2::new(104.0, 0.0),
                velocity: Vec2::new(800.0, 0.0),
                tick: 4,
            }
        );
    }

    #[test]
    fn bellows_push_light_parts() {
        let mut c = Contraption::new("bellows");
        let wire = c.place(PartType::Tripwire, at(0, 0)).unwrap();
        let bellows = c.place(PartType::Bellows, at(1, 0)).unwrap();
        let feather = c.place(PartType::Parachute, at(2, 0)).unwrap();
        let heavy = c.place(PartType::IronFrame, at(3, 0)).unwrap();
        c.state_mut(wire).unwrap().is_triggered = true;

        let config = SimConfig::default();
        let mut physics = RecordingPhysics::default();
        let mut ctx = StepContext::new(&mut c, &mut physics, &config, 1);
        resolve(&mut ctx, 0.0);
        let events = ctx.events;

        let pushed = physics.impulses_on(feather);
        assert_eq!(pushed.len(), 1);
        // 64 units away: falloff 1 - 64/200.
        assert!((pushed[0].x - 500.0 * 0.68).abs() < 1e-9);
        assert!(physics.impulses_on(heavy).is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            Event::SteamRelease { part, .. } if *part == bellows
        )));
    }
}
