//! Profiling and diagnostic instrumentation for the simulation engine.
//!
//! - [`TickProfile`] captures per-stage timing from the most recent tick.
//!   It is only filled in when the `profiling` feature is enabled.
//! - [`PartDiagnostic`] explains why a part is in its current state. Always
//!   available.

use std::time::Duration;

use crate::id::PartId;
use crate::part::{PartState, PartType};

/// Per-stage timing from the most recent tick.
#[derive(Debug, Clone, Default)]
pub struct TickProfile {
    pub heat: Duration,
    pub steam: Duration,
    pub electrical: Duration,
    pub mechanical: Duration,
    pub triggers: Duration,
    pub damage: Duration,
    pub total: Duration,
    pub tick: u64,
}

impl TickProfile {
    /// Returns the name and duration of the slowest stage.
    pub fn bottleneck_stage(&self) -> (&'static str, Duration) {
        let stages = [
            ("heat", self.heat),
            ("steam", self.steam),
            ("electrical", self.electrical),
            ("mechanical", self.mechanical),
            ("triggers", self.triggers),
            ("damage", self.damage),
        ];
        stages
            .into_iter()
            .fold(("heat", Duration::ZERO), |best, stage| {
                if stage.1 > best.1 { stage } else { best }
            })
    }
}

/// What would make a part fail this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    Overpressure,
    Overcharge,
    Ignition,
    Worn,
}

/// Diagnostic info about one part.
#[derive(Debug, Clone)]
pub struct PartDiagnostic {
    pub part: PartId,
    pub part_type: PartType,
    pub state: PartState,
    /// Reachable from a running power source.
    pub powered: bool,
    /// Power sources whose network includes this part.
    pub sources: Vec<PartId>,
    pub connections: usize,
    /// Thresholds the part currently exceeds.
    pub hazards: Vec<Hazard>,
}

impl PartDiagnostic {
    pub fn is_at_risk(&self) -> bool {
        !self.hazards.is_empty()
    }
}
