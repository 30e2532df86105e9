//! Controller states and per-tick bookkeeping types.

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::id::PartId;

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Lifecycle of a simulation run.
///
/// `Building` is the initial and editing state. `start` moves to `Running`;
/// from there `stop` returns to `Building`, losing the character moves to
/// `Failed`, and reaching the goal moves to `Succeeded`. `reset` always lands
/// back in `Building`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimulationState {
    #[default]
    Building,
    Running,
    Failed,
    Succeeded,
}

impl SimulationState {
    pub fn is_running(self) -> bool {
        self == SimulationState::Running
    }

    /// A run that ended on its own and needs a reset before restarting.
    pub fn is_finished(self) -> bool {
        matches!(self, SimulationState::Failed | SimulationState::Succeeded)
    }
}

impl std::fmt::Display for SimulationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SimulationState::Building => "building",
            SimulationState::Running => "running",
            SimulationState::Failed => "failed",
            SimulationState::Succeeded => "succeeded",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Run clock tracked by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Ticks advanced since the last reset.
    pub tick: u64,
    /// Scaled simulation seconds since the last reset.
    pub elapsed: f64,
    /// Multiplier applied to every host-supplied delta.
    pub speed: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
            speed: 1.0,
        }
    }

    /// Zero the counters. The speed multiplier is a host preference and
    /// survives resets.
    pub fn rewind(&mut self) {
        self.tick = 0;
        self.elapsed = 0.0;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// What one `update` call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Tick number of this step; zero when nothing ran.
    pub tick: u64,
    /// Scaled delta actually applied.
    pub dt: f64,
    /// Events in the order they happened.
    pub events: Vec<Event>,
    /// Parts removed from the contraption during the tick.
    pub removed: Vec<PartId>,
}

impl TickReport {
    /// Whether the call advanced the simulation at all.
    pub fn ran(&self) -> bool {
        self.tick > 0
    }
}
