//! DooHickeys Core -- the contraption simulation engine.
//!
//! This crate provides the part catalog, the contraption graph with
//! automatic connection inference, power networks, the per-tick resource
//! propagation step, and the run controller that every DooHickeys host
//! depends on. Rendering, audio, and rigid-body physics live outside; the
//! engine talks to physics through the [`physics::PhysicsBackend`] trait.
//!
//! # Eight-Stage Tick
//!
//! Each call to [`engine::Simulation::update`] while running advances the
//! contraption by one tick through these stages, in order:
//!
//! 1. **Heat** -- furnaces heat or cool; rigid joints conduct.
//! 2. **Steam generation** -- hot boilers raise pressure; tanks leak.
//! 3. **Steam flow** -- pipes equalise; closed valves block; pistons bank energy.
//! 4. **Electrical** -- tesla coils charge and arc; wires equalise; lamps and
//!    magnets react.
//! 5. **Mechanical** -- motors and springs drive; gear trains relax to their
//!    ratios; wheels and propellers push their bodies.
//! 6. **Triggers** -- timers count down; triggered parts act on neighbours.
//! 7. **Explosions** -- overloaded or ignited parts blow, cascading in-tick.
//! 8. **Damage** -- worn-out parts leave the graph; the character is checked.
//!
//! # Building a Contraption
//!
//! Parts are placed on a grid and connect to compatible neighbours on their
//! own:
//!
//! ```rust,ignore
//! let mut contraption = Contraption::new("first flight");
//! let furnace = contraption.place(PartType::CoalFurnace, GridPosition::new(0, 0))?;
//! let boiler = contraption.place(PartType::SteamBoiler, GridPosition::new(1, 0))?;
//! let mut sim = Simulation::new(contraption);
//! sim.start();
//! let report = sim.update(1.0 / 60.0);
//! ```
//!
//! # Key Types
//!
//! - [`engine::Simulation`] -- Run controller and tick orchestrator.
//! - [`contraption::Contraption`] -- Parts, connections, and grid occupancy.
//! - [`part::PartType`] / [`part::PartKind`] -- The static part catalog.
//! - [`network::PowerNetwork`] -- Per-source reachable consumers.
//! - [`config::SimConfig`] -- Every tuning constant of the step.
//! - [`event::EventBus`] -- Listener registry with per-kind buffers.

pub mod config;
pub mod contraption;
pub mod engine;
pub mod event;
pub mod grid;
pub mod id;
pub mod network;
pub mod part;
pub mod physics;
pub mod profiling;
pub mod propagation;
pub mod query;
pub mod sim;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::SimConfig;
pub use contraption::{Connection, Contraption, ContraptionError};
pub use engine::Simulation;
pub use event::{Event, EventKind};
pub use grid::{AttachmentSide, GridPosition, Rotation};
pub use id::{ConnectionId, PartId};
pub use part::{ConnectionType, PartState, PartType};
pub use physics::{NullPhysics, PhysicsBackend, Vec2};
pub use sim::{SimulationState, TickReport};
