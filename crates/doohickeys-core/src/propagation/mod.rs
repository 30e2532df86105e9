//! The per-tick propagation step.
//!
//! One call to [`advance`] runs eight stages in a fixed order. Every stage
//! mutates part state in place, so later stages see the writes of earlier
//! ones within the same tick:
//!
//! 1. **Heat** -- furnaces heat or cool; rigid joints conduct.
//! 2. **Steam generation** -- hot boilers raise pressure; tanks leak.
//! 3. **Steam flow** -- pipes equalise pressure; pistons bank energy.
//! 4. **Electrical** -- coils charge and arc; wires equalise; lamps and
//!    magnets react.
//! 5. **Mechanical** -- motors and springs drive; gear trains relax to
//!    their ratios; wheels and propellers push the physics bodies.
//! 6. **Triggers** -- timers count down; triggered parts act on neighbours.
//! 7. **Explosions** -- overloaded and ignited parts blow, cascading within
//!    the tick.
//! 8. **Damage** -- destroyed parts leave the graph; the character is
//!    checked.
//!
//! State bounds are enforced once, between stages 4 and 5.

mod damage;
mod electrical;
mod heat;
mod mechanical;
mod steam;
mod trigger;

pub use mechanical::{Relaxation, gear_ratio, relax_rotation};

use crate::config::SimConfig;
use crate::contraption::Contraption;
use crate::event::Event;
use crate::id::{ConnectionId, PartId};
use crate::part::{PartState, PartType};
use crate::physics::{PhysicsBackend, Vec2};

// ---------------------------------------------------------------------------
// Step context
// ---------------------------------------------------------------------------

/// Everything a stage reads or writes during one tick.
pub(crate) struct StepContext<'a, P: PhysicsBackend + ?Sized> {
    pub contraption: &'a mut Contraption,
    pub physics: &'a mut P,
    pub config: &'a SimConfig,
    pub tick: u64,
    pub events: Vec<Event>,
    /// Parts set off by a trigger, detonated in the explosion stage.
    pub ignited: Vec<PartId>,
    pub removed: Vec<PartId>,
    pub character_lost: bool,
    /// Character durability when the tick began.
    pub character_durability: Vec<(PartId, f64)>,
}

impl<'a, P: PhysicsBackend + ?Sized> StepContext<'a, P> {
    pub fn new(
        contraption: &'a mut Contraption,
        physics: &'a mut P,
        config: &'a SimConfig,
        tick: u64,
    ) -> Self {
        let character_durability = contraption
            .parts()
            .filter(|p| p.is_character())
            .map(|p| (p.id, p.state.durability))
            .collect();
        Self {
            contraption,
            physics,
            config,
            tick,
            events: Vec::new(),
            ignited: Vec::new(),
            removed: Vec::new(),
            character_lost: false,
            character_durability,
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn state_changed(&mut self, part: PartId) {
        let tick = self.tick;
        self.emit(Event::PartStateChanged { part, tick });
    }

    /// World position of a part: the physics body if the host has one,
    /// otherwise its grid origin scaled by the cell size.
    pub fn position_of(&self, part: PartId) -> Option<Vec2> {
        self.physics.position(part).or_else(|| {
            self.contraption
                .part(part)
                .map(|p| p.world_position(self.config.cell_size))
        })
    }

    /// Body rotation in radians, falling back to the placement rotation.
    pub fn rotation_of(&self, part: PartId) -> f64 {
        self.physics.rotation(part).unwrap_or_else(|| {
            self.contraption
                .part(part)
                .map(|p| p.rotation.radians())
                .unwrap_or(0.0)
        })
    }
}

/// Run `f` over the states of both endpoints of a connection.
///
/// Returns `false` without calling `f` if the connection or either endpoint
/// is gone.
pub(crate) fn update_pair(
    contraption: &mut Contraption,
    connection: ConnectionId,
    f: impl FnOnce((PartType, &mut PartState), (PartType, &mut PartState)),
) -> bool {
    let Some(link) = contraption.connection(connection) else {
        return false;
    };
    let (a, b) = (link.part_a, link.part_b);
    let (Some(part_a), Some(part_b)) = (contraption.part(a), contraption.part(b)) else {
        return false;
    };
    let (type_a, type_b) = (part_a.part_type, part_b.part_type);
    let mut state_a = part_a.state.clone();
    let mut state_b = part_b.state.clone();

    f((type_a, &mut state_a), (type_b, &mut state_b));

    if let Some(state) = contraption.state_mut(a) {
        *state = state_a;
    }
    if let Some(state) = contraption.state_mut(b) {
        *state = state_b;
    }
    true
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// What one step did.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub events: Vec<Event>,
    /// Parts that left the graph, in removal order.
    pub removed: Vec<PartId>,
    /// A controlled character was destroyed this tick.
    pub character_lost: bool,
    pub relaxation: Relaxation,
    #[cfg(feature = "profiling")]
    pub profile: crate::profiling::TickProfile,
}

/// Clamp the resource fields to their configured bounds.
pub(crate) fn clamp_states(contraption: &mut Contraption, config: &SimConfig) {
    let limits = &config.limits;
    let ambient = config.heat.ambient_temperature;
    for part in contraption.parts_mut() {
        let s = &mut part.state;
        s.steam_pressure = s.steam_pressure.clamp(0.0, limits.max_pressure);
        s.electric_charge = s.electric_charge.clamp(0.0, limits.max_charge);
        s.temperature = s.temperature.clamp(ambient, limits.max_temperature);
    }
}

/// Advance the contraption by one tick of `dt` scaled seconds.
///
/// `dt` must already be sanitised (finite, non-negative). The step never
/// fails; destroyed parts are removed from `contraption` and reported.
pub fn advance<P: PhysicsBackend + ?Sized>(
    contraption: &mut Contraption,
    physics: &mut P,
    config: &SimConfig,
    tick: u64,
    dt: f64,
) -> StepOutcome {
    let mut ctx = StepContext::new(contraption, physics, config, tick);

    #[cfg(feature = "profiling")]
    let step_start = std::time::Instant::now();

    #[cfg(feature = "profiling")]
    let stage_start = std::time::Instant::now();
    heat::transfer(&mut ctx, dt);
    #[cfg(feature = "profiling")]
    let heat_dur = stage_start.elapsed();

    #[cfg(feature = "profiling")]
    let stage_start = std::time::Instant::now();
    steam::generate(&mut ctx, dt);
    steam::propagate(&mut ctx, dt);
    #[cfg(feature = "profiling")]
    let steam_dur = stage_start.elapsed();

    #[cfg(feature = "profiling")]
    let stage_start = std::time::Instant::now();
    electrical::flow(&mut ctx, dt);
    clamp_states(ctx.contraption, config);
    #[cfg(feature = "profiling")]
    let electrical_dur = stage_start.elapsed();

    #[cfg(feature = "profiling")]
    let stage_start = std::time::Instant::now();
    let relaxation = mechanical::rotate(&mut ctx, dt);
    #[cfg(feature = "profiling")]
    let mechanical_dur = stage_start.elapsed();

    #[cfg(feature = "profiling")]
    let stage_start = std::time::Instant::now();
    trigger::resolve(&mut ctx, dt);
    #[cfg(feature = "profiling")]
    let trigger_dur = stage_start.elapsed();

    #[cfg(feature = "profiling")]
    let stage_start = std::time::Instant::now();
    damage::resolve_explosions(&mut ctx);
    damage::remove_destroyed(&mut ctx);
    #[cfg(feature = "profiling")]
    let damage_dur = stage_start.elapsed();

    tracing::trace!(
        tick,
        dt,
        events = ctx.events.len(),
        removed = ctx.removed.len(),
        "propagation step"
    );

    StepOutcome {
        events: ctx.events,
        removed: ctx.removed,
        character_lost: ctx.character_lost,
        relaxation,
        #[cfg(feature = "profiling")]
        profile: crate::profiling::TickProfile {
            heat: heat_dur,
            steam: steam_dur,
            electrical: electrical_dur,
            mechanical: mechanical_dur,
            triggers: trigger_dur,
            damage: damage_dur,
            total: step_start.elapsed(),
            tick,
        },
    }
}
