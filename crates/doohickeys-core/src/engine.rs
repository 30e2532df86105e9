//! The simulation controller: owns a contraption and drives it through the
//! Building / Running / Failed / Succeeded lifecycle.
//!
//! # Architecture
//!
//! The `Simulation` owns:
//! - The [`Contraption`] (parts and connections)
//! - A physics backend implementing [`PhysicsBackend`]
//! - A [`SimConfig`] tuning table
//! - A derived [`PowerNetwork`], rebuilt on start and after structural change
//! - A [`SimClock`] (tick counter, elapsed time, speed multiplier)
//! - An [`EventBus`] for listeners
//!
//! Each `update(dt)` while running scales `dt`, runs one propagation step,
//! rebuilds the network if parts were removed, moves to `Failed` if the
//! character was lost, then delivers the tick's events to listeners.

use crate::config::{ConfigError, SimConfig};
use crate::contraption::{Contraption, ContraptionError};
use crate::event::{Event, EventBus, EventFilter, EventKind, Listener, SubscriberPriority};
use crate::id::PartId;
use crate::network::PowerNetwork;
use crate::part::PartType;
use crate::physics::{NullPhysics, PhysicsBackend};
use crate::profiling::{Hazard, PartDiagnostic};
use crate::propagation::{self, Relaxation};
use crate::query::{self, ContraptionSummary, PartSnapshot};
use crate::sim::{SimClock, SimulationState, TickReport};
use crate::validation::{ValidationReport, validate_contraption};

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Drives a contraption through its run lifecycle.
pub struct Simulation<P: PhysicsBackend = NullPhysics> {
    contraption: Contraption,
    physics: P,
    config: SimConfig,
    network: PowerNetwork,
    state: SimulationState,
    clock: SimClock,

    /// Listener registry and per-kind event buffers.
    pub event_bus: EventBus,

    last_relaxation: Relaxation,

    /// Timing profile for the most recent tick (profiling feature only).
    #[cfg(feature = "profiling")]
    last_profile: Option<crate::profiling::TickProfile>,
}

impl<P: PhysicsBackend> std::fmt::Debug for Simulation<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("contraption", &self.contraption.name())
            .field("parts", &self.contraption.part_count())
            .field("state", &self.state)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Simulation<NullPhysics> {
    /// A simulation with no physics host and default tuning.
    pub fn new(contraption: Contraption) -> Self {
        Self::with_physics(contraption, NullPhysics)
    }
}

impl<P: PhysicsBackend> Simulation<P> {
    pub fn with_physics(contraption: Contraption, physics: P) -> Self {
        let config = SimConfig::default();
        let network = PowerNetwork::build(&contraption);
        Self {
            contraption,
            physics,
            event_bus: EventBus::new(config.event_buffer_capacity),
            config,
            network,
            state: SimulationState::Building,
            clock: SimClock::new(),
            last_relaxation: Relaxation::default(),
            #[cfg(feature = "profiling")]
            last_profile: None,
        }
    }

    /// A simulation with custom tuning. Fails if `config` is out of range.
    pub fn with_config(
        contraption: Contraption,
        physics: P,
        config: SimConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut sim = Self::with_physics(contraption, physics);
        sim.event_bus = EventBus::new(config.event_buffer_capacity);
        sim.config = config;
        Ok(sim)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin a run. No-op while already running.
    ///
    /// Rebuilds the power network and arms the sources: furnaces light,
    /// motors wind up and run, springs get a partial reserve, and timers
    /// start counting down.
    pub fn start(&mut self) {
        if self.state.is_running() {
            return;
        }
        self.network.rebuild(&self.contraption);
        self.arm_sources();

        let report = validate_contraption(&self.contraption);
        if let Some(first) = report.iter().next() {
            tracing::warn!(
                issues = report.len(),
                first = %first,
                "starting a contraption with validation issues"
            );
        }

        let events: Vec<Event> = self.transition(SimulationState::Running).into_iter().collect();
        self.publish(&events);
    }

    /// Halt the run, keeping all accumulated part state.
    pub fn stop(&mut self) {
        let events: Vec<Event> = self.transition(SimulationState::Building).into_iter().collect();
        self.publish(&events);
    }

    /// Halt and restore every part to its default state.
    pub fn reset(&mut self) {
        self.contraption.reset_states();
        self.clock.rewind();
        self.event_bus.clear_all();
        self.network.rebuild(&self.contraption);
        self.last_relaxation = Relaxation::default();
        let events: Vec<Event> = self.transition(SimulationState::Building).into_iter().collect();
        self.publish(&events);
    }

    /// Advance one tick of `dt` host seconds. Returns an empty report unless
    /// running.
    ///
    /// The simulated delta is `dt * speed`, bounded by
    /// [`SimConfig::max_dt`] (0.1 s by default). A one-second host frame
    /// therefore simulates a tenth of a second unless the bound is lifted.
    pub fn update(&mut self, dt: f64) -> TickReport {
        if !self.state.is_running() {
            return TickReport::default();
        }

        let dt = self.config.scaled_dt(dt, self.clock.speed);
        self.clock.tick += 1;
        self.clock.elapsed += dt;
        let tick = self.clock.tick;

        let outcome = propagation::advance(
            &mut self.contraption,
            &mut self.physics,
            &self.config,
            tick,
            dt,
        );
        let mut events = outcome.events;
        self.last_relaxation = outcome.relaxation;

        #[cfg(feature = "profiling")]
        {
            self.last_profile = Some(outcome.profile);
        }

        if self.network.is_stale(&self.contraption) {
            self.network.rebuild(&self.contraption);
        }

        if outcome.character_lost {
            events.extend(self.transition(SimulationState::Failed));
        }

        self.publish(&events);
        TickReport {
            tick,
            dt,
            events,
            removed: outcome.removed,
        }
    }

    /// The host detected the goal. Running becomes Succeeded; otherwise
    /// nothing happens. Returns whether the transition was taken.
    pub fn reach_goal(&mut self) -> bool {
        if !self.state.is_running() {
            return false;
        }
        let mut events = vec![Event::GoalReached {
            tick: self.clock.tick,
        }];
        events.extend(self.transition(SimulationState::Succeeded));
        self.publish(&events);
        true
    }

    /// Flag `part` as triggered. The effect applies on the next tick.
    pub fn trigger(&mut self, part: PartId) -> Result<(), ContraptionError> {
        let state = self
            .contraption
            .state_mut(part)
            .ok_or(ContraptionError::PartNotFound(part))?;
        state.is_triggered = true;
        Ok(())
    }

    fn arm_sources(&mut self) {
        let startup = &self.config.startup;
        for part in self.contraption.parts_mut() {
            let s = &mut part.state;
            match part.part_type {
                PartType::CoalFurnace => s.is_active = true,
                PartType::ClockworkMotor => {
                    s.mechanical_energy = startup.motor_energy;
                    s.is_active = true;
                }
                PartType::WindupSpring => s.mechanical_energy = startup.spring_energy,
                PartType::TimerSwitch => {
                    s.mechanical_energy = startup.timer_seconds;
                    s.is_active = true;
                }
                _ => {}
            }
        }
    }

    fn transition(&mut self, to: SimulationState) -> Option<Event> {
        let from = self.state;
        if from == to {
            return None;
        }
        self.state = to;
        tracing::info!(
            contraption = self.contraption.name(),
            %from,
            %to,
            tick = self.clock.tick,
            "simulation state changed"
        );
        Some(Event::StateChanged {
            from,
            to,
            tick: self.clock.tick,
        })
    }

    fn publish(&mut self, events: &[Event]) {
        for event in events {
            self.event_bus.emit(event.clone());
        }
        self.event_bus.deliver();
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Listen for `kind`. Listeners run synchronously at the end of each
    /// `update`, in the order the tick emitted its events, so listeners on
    /// several kinds see a cascade in the order it happened.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.event_bus.on(kind, listener);
    }

    pub fn on_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) {
        self.event_bus.on_filtered(kind, priority, filter, listener);
    }

    /// Stop delivering `kind` to listeners. Tick reports still carry it.
    pub fn suppress(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn contraption(&self) -> &Contraption {
        &self.contraption
    }

    /// Mutable access for the editing layer. Structural edits made while
    /// running are picked up by the network on the next tick.
    pub fn contraption_mut(&mut self) -> &mut Contraption {
        &mut self.contraption
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn network(&self) -> &PowerNetwork {
        &self.network
    }

    pub fn is_powered(&self, part: PartId) -> bool {
        self.network.is_powered(part)
    }

    /// Set the delta multiplier. Negative or non-finite values are ignored.
    /// The scaled delta is still bounded by [`SimConfig::max_dt`], so a
    /// large multiplier on long host frames runs below its nominal rate.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() && speed >= 0.0 {
            self.clock.speed = speed;
        } else {
            tracing::warn!(speed, "ignoring invalid simulation speed");
        }
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed
    }

    /// Scaled seconds simulated since the last reset.
    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed
    }

    pub fn tick_count(&self) -> u64 {
        self.clock.tick
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// How the gear trains settled in the most recent tick.
    pub fn last_relaxation(&self) -> Relaxation {
        self.last_relaxation
    }

    pub fn validate(&self) -> ValidationReport {
        validate_contraption(&self.contraption)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn snapshot_part(&self, part: PartId) -> Option<PartSnapshot> {
        query::snapshot_part(&self.contraption, &self.network, self.config.cell_size, part)
    }

    pub fn snapshot_all_parts(&self) -> Vec<PartSnapshot> {
        query::snapshot_all_parts(&self.contraption, &self.network, self.config.cell_size)
    }

    pub fn summary(&self) -> ContraptionSummary {
        query::summarize(&self.contraption, &self.network, self.config.cell_size)
    }

    /// Explain a part's current state: power, links, and exceeded limits.
    pub fn diagnose_part(&self, part: PartId) -> Option<PartDiagnostic> {
        let p = self.contraption.part(part)?;
        let kind = p.kind();
        let s = &p.state;
        let limits = &self.config.explosions;

        let mut hazards = Vec::new();
        if s.steam_pressure > limits.pressure_threshold {
            hazards.push(Hazard::Overpressure);
        }
        if !kind.charge_store && s.electric_charge > limits.overcharge_threshold {
            hazards.push(Hazard::Overcharge);
        }
        if kind.flammable && s.temperature > limits.ignition_temperature {
            hazards.push(Hazard::Ignition);
        }
        if s.is_destroyed() {
            hazards.push(Hazard::Worn);
        }

        Some(PartDiagnostic {
            part,
            part_type: p.part_type,
            state: s.clone(),
            powered: self.network.is_powered(part),
            sources: self.network.sources_powering(part),
            connections: self.contraption.connections_of(part).count(),
            hazards,
        })
    }

    /// Timing of the most recent tick.
    #[cfg(feature = "profiling")]
    pub fn last_tick_profile(&self) -> Option<&crate::profiling::TickProfile> {
        self.last_profile.as_ref()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::part::PartState;
    use crate::test_utils::{gear_train, place, steam_line};

    fn recorder(sim: &mut Simulation, kind: EventKind) -> Rc<RefCell<Vec<Event>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        sim.on(kind, Box::new(move |e: &Event| sink.borrow_mut().push(e.clone())));
        seen
    }

    #[test]
    fn starts_in_building_and_update_is_noop() {
        let (c, line) = steam_line();
        let mut sim = Simulation::new(c);
        assert_eq!(sim.state(), SimulationState::Building);
        let report = sim.update(1.0);
        assert!(!report.ran());
        assert_eq!(sim.tick_count(), 0);
        let furnace = sim.contraption().part(line.furnace).unwrap();
        assert_eq!(furnace.state, PartState::default());
    }

    #[test]
    fn start_arms_sources() {
        let mut c = Contraption::new("arm");
        let furnace = place(&mut c, PartType::CoalFurnace, 0, 0);
        let motor = place(&mut c, PartType::ClockworkMotor, 3, 0);
        let spring = place(&mut c, PartType::WindupSpring, 5, 0);
        let timer = place(&mut c, PartType::TimerSwitch, 7, 0);
        let mut sim = Simulation::new(c);
        sim.start();

        let state = |id| sim.contraption().part(id).unwrap().state.clone();
        assert!(state(furnace).is_active);
        assert!(state(motor).is_active);
        assert_eq!(state(motor).mechanical_energy, 100.0);
        assert!(!state(spring).is_active);
        assert_eq!(state(spring).mechanical_energy, 50.0);
        assert!(state(timer).is_active);
        assert_eq!(state(timer).mechanical_energy, 5.0);
        assert!(sim.is_running());
    }

    #[test]
    fn second_start_is_ignored() {
        let (c, line) = steam_line();
        let mut sim = Simulation::new(c);
        let changes = recorder(&mut sim, EventKind::StateChanged);
        sim.start();
        sim.update(1.0);
        let temp = sim.contraption().part(line.furnace).unwrap().state.temperature;
        sim.start();
        assert_eq!(
            sim.contraption().part(line.furnace).unwrap().state.temperature,
            temp
        );
        assert_eq!(changes.borrow().len(), 1);
    }

    #[test]
    fn stop_keeps_state_and_reset_clears_it() {
        let (c, line) = steam_line();
        let mut sim = Simulation::new(c);
        sim.start();
        for _ in 0..5 {
            sim.update(1.0);
        }
        sim.stop();
        assert_eq!(sim.state(), SimulationState::Building);
        let hot = sim.contraption().part(line.furnace).unwrap().state.temperature;
        assert!(hot > 20.0);
        assert!(!sim.update(1.0).ran());

        sim.reset();
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.elapsed(), 0.0);
        for part in sim.contraption().parts() {
            assert_eq!(part.state, PartState::default());
        }
    }

    #[test]
    fn furnace_feeds_boiler_over_time() {
        let (c, line) = steam_line();
        let mut sim = Simulation::new(c);
        sim.start();
        for _ in 0..120 {
            sim.update(1.0);
        }
        let part = |id| sim.contraption().part(id).unwrap().state.clone();
        assert!(part(line.furnace).temperature > 20.0);
        assert!(part(line.boiler).steam_pressure > 0.0);
        assert_eq!(sim.tick_count(), 120);
    }

    #[test]
    fn speed_scales_elapsed_time() {
        let (c, _) = steam_line();
        let mut sim = Simulation::new(c);
        sim.set_speed(2.0);
        sim.set_speed(f64::NAN);
        assert_eq!(sim.speed(), 2.0);
        sim.start();
        let report = sim.update(0.02);
        assert_eq!(report.dt, 0.04);
        assert_eq!(sim.elapsed(), 0.04);
        // Long frames are bounded.
        assert_eq!(sim.update(1.0).dt, 0.1);
    }

    #[test]
    fn speed_multiplier_is_bounded_by_max_dt() {
        let (c, _) = steam_line();
        let mut sim = Simulation::new(c);
        sim.set_speed(5.0);
        sim.start();
        // Five times a 30 fps frame would be a sixth of a second.
        assert_eq!(sim.update(1.0 / 30.0).dt, 0.1);

        let (c, _) = steam_line();
        let config = SimConfig {
            max_dt: None,
            ..SimConfig::default()
        };
        let mut sim = Simulation::with_config(c, NullPhysics, config).unwrap();
        sim.set_speed(5.0);
        sim.start();
        assert!((sim.update(1.0 / 30.0).dt - 5.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn losing_the_character_fails_once() {
        let mut c = Contraption::new("doomed");
        let kam = place(&mut c, PartType::KameraMan, 0, 0);
        let mut sim = Simulation::new(c);
        let destroyed = recorder(&mut sim, EventKind::CharacterDestroyed);
        sim.start();
        sim.contraption_mut().state_mut(kam).unwrap().durability = 0.0;

        let report = sim.update(0.1);
        assert_eq!(sim.state(), SimulationState::Failed);
        assert_eq!(report.removed, vec![kam]);
        assert!(matches!(
            report.events.last(),
            Some(Event::StateChanged {
                to: SimulationState::Failed,
                ..
            })
        ));
        assert!(!sim.update(0.1).ran());
        assert_eq!(destroyed.borrow().len(), 1);
    }

    #[test]
    fn goal_only_counts_while_running() {
        let (c, _) = steam_line();
        let mut sim = Simulation::new(c);
        assert!(!sim.reach_goal());
        sim.start();
        let goals = recorder(&mut sim, EventKind::GoalReached);
        assert!(sim.reach_goal());
        assert_eq!(sim.state(), SimulationState::Succeeded);
        assert_eq!(goals.borrow().len(), 1);
        sim.reset();
        assert_eq!(sim.state(), SimulationState::Building);
    }

    #[test]
    fn host_trigger_fires_next_tick() {
        let mut c = Contraption::new("plate");
        let plate = place(&mut c, PartType::PressurePlate, 0, 1);
        let tnt = place(&mut c, PartType::Dynamite, 0, 0);
        let mut sim = Simulation::new(c);
        sim.start();
        sim.trigger(plate).unwrap();
        let report = sim.update(0.1);
        assert!(report.removed.contains(&tnt));
        assert!(sim.trigger(tnt).is_err());
    }

    #[test]
    fn suppressed_kinds_still_reach_the_report() {
        let (c, train) = gear_train();
        let mut sim = Simulation::new(c);
        let seen = recorder(&mut sim, EventKind::PartStateChanged);
        sim.suppress(EventKind::PartStateChanged);
        sim.start();
        sim.trigger(train.gearbox).unwrap();
        let report = sim.update(0.1);
        assert!(
            report
                .events
                .iter()
                .any(|e| e.kind() == EventKind::PartStateChanged)
        );
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn listeners_see_every_event_past_buffer_capacity() {
        let mut c = Contraption::new("lamps");
        for i in 0..20 {
            let lamp = place(&mut c, PartType::ArcLamp, i * 2, 0);
            c.state_mut(lamp).unwrap().electric_charge = 31.0;
        }
        let config = SimConfig {
            event_buffer_capacity: 8,
            ..SimConfig::default()
        };
        let mut sim = Simulation::with_config(c, NullPhysics, config).unwrap();
        let seen = recorder(&mut sim, EventKind::PartStateChanged);
        sim.start();
        let report = sim.update(0.0);

        let toggled = report
            .events
            .iter()
            .filter(|e| e.kind() == EventKind::PartStateChanged)
            .count();
        assert_eq!(toggled, 20);
        assert_eq!(seen.borrow().len(), 20);
        assert_eq!(sim.event_bus.total_emitted(EventKind::PartStateChanged), 20);
    }

    #[test]
    fn listeners_see_events_in_emission_order() {
        let mut c = Contraption::new("plate");
        let plate = place(&mut c, PartType::PressurePlate, 0, 1);
        place(&mut c, PartType::Dynamite, 0, 0);
        let kam = place(&mut c, PartType::KameraMan, 1, 0);
        c.state_mut(kam).unwrap().durability = 10.0;
        let mut sim = Simulation::new(c);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in EventKind::ALL {
            let sink = Rc::clone(&seen);
            sim.on(kind, Box::new(move |e: &Event| sink.borrow_mut().push(e.clone())));
        }
        sim.start();
        seen.borrow_mut().clear();
        sim.trigger(plate).unwrap();
        let report = sim.update(0.1);

        assert_eq!(sim.state(), SimulationState::Failed);
        assert_eq!(*seen.borrow(), report.events);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimConfig::default();
        config.steam.flow_rate = -1.0;
        let err = Simulation::with_config(Contraption::new("bad"), NullPhysics, config).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn diagnosis_reports_power_and_hazards() {
        let (c, train) = gear_train();
        let mut sim = Simulation::new(c);
        let wheel = place(sim.contraption_mut(), PartType::CogWheel, 0, -1);
        sim.start();
        let diag = sim.diagnose_part(wheel).unwrap();
        assert!(diag.powered);
        assert_eq!(diag.sources, vec![train.motor]);
        assert!(!diag.is_at_risk());

        sim.contraption_mut().state_mut(train.small).unwrap().steam_pressure = 130.0;
        let diag = sim.diagnose_part(train.small).unwrap();
        assert_eq!(diag.hazards, vec![Hazard::Overpressure]);
    }
}
