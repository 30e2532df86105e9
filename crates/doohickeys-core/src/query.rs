//! Read-only query API for inspecting simulation state.
//!
//! Snapshot types are owned copies, never references into the contraption,
//! so hosts can hand them to rendering or UI code freely.

use serde::{Deserialize, Serialize};

use crate::contraption::Contraption;
use crate::grid::{GridPosition, Rotation};
use crate::id::{ConnectionId, PartId};
use crate::network::PowerNetwork;
use crate::part::{PartState, PartType};
use crate::physics::Vec2;

// ---------------------------------------------------------------------------
// Part snapshot
// ---------------------------------------------------------------------------

/// A read-only view of a single part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSnapshot {
    pub id: PartId,
    pub part_type: PartType,
    pub position: GridPosition,
    /// Grid origin in world units.
    pub world_position: Vec2,
    pub rotation: Rotation,
    pub state: PartState,
    pub powered: bool,
    pub connections: Vec<ConnectionId>,
}

pub fn snapshot_part(
    contraption: &Contraption,
    network: &PowerNetwork,
    cell_size: f64,
    id: PartId,
) -> Option<PartSnapshot> {
    let part = contraption.part(id)?;
    Some(PartSnapshot {
        id,
        part_type: part.part_type,
        position: part.position,
        world_position: part.world_position(cell_size),
        rotation: part.rotation,
        state: part.state.clone(),
        powered: network.is_powered(id),
        connections: contraption.connections_of(id).map(|(cid, _)| cid).collect(),
    })
}

pub fn snapshot_all_parts(
    contraption: &Contraption,
    network: &PowerNetwork,
    cell_size: f64,
) -> Vec<PartSnapshot> {
    contraption
        .part_ids()
        .into_iter()
        .filter_map(|id| snapshot_part(contraption, network, cell_size, id))
        .collect()
}

// ---------------------------------------------------------------------------
// Contraption summary
// ---------------------------------------------------------------------------

/// Aggregate figures for a HUD or a log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContraptionSummary {
    pub parts: usize,
    pub connections: usize,
    pub total_mass: f64,
    pub center_of_mass: Option<Vec2>,
    pub powered_parts: usize,
    /// Durability of the controlled character, if one is placed.
    pub character_durability: Option<f64>,
}

pub fn summarize(
    contraption: &Contraption,
    network: &PowerNetwork,
    cell_size: f64,
) -> ContraptionSummary {
    ContraptionSummary {
        parts: contraption.part_count(),
        connections: contraption.connection_count(),
        total_mass: contraption.total_mass(),
        center_of_mass: contraption.center_of_mass(cell_size),
        powered_parts: network.powered_parts().len(),
        character_durability: contraption.character().map(|p| p.state.durability),
    }
}
