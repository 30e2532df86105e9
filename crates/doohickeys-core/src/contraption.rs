//! The contraption graph: placed parts, their grid cells, and the typed
//! connections between adjacent parts.
//!
//! Parts live in a `SlotMap` keyed by [`PartId`]; connections in a second
//! `SlotMap` keyed by [`ConnectionId`]. Per-part adjacency lists are kept in a
//! `SecondaryMap` and a cell index maps every occupied grid cell back to its
//! part, so footprint-aware lookups are O(log n).
//!
//! Every structural mutation bumps [`Contraption::revision`], which the
//! simulation uses to know when its power network is stale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

use crate::grid::{AttachmentSide, GridPosition, Rotation};
use crate::id::{ConnectionId, PartId};
use crate::part::{ConnectionType, Part, PartState, PartType};
use crate::physics::Vec2;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by contraption mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContraptionError {
    #[error("part not found: {0:?}")]
    PartNotFound(PartId),
    #[error("connection not found: {0:?}")]
    ConnectionNotFound(ConnectionId),
    #[error("cell {cell} is already occupied by {by:?}")]
    CellOccupied { cell: GridPosition, by: PartId },
    #[error("cell {cell} is outside the build area")]
    OutOfBounds { cell: GridPosition },
    #[error("cannot connect {0:?} to itself")]
    SelfConnection(PartId),
    #[error("{a:?} and {b:?} do not touch")]
    NotAdjacent { a: PartId, b: PartId },
    #[error("{a:?} and {b:?} touch, but not on attachment sides that face each other")]
    IncompatibleSides { a: PartId, b: PartId },
    #[error("{a:?} and {b:?} cannot share a {connection_type:?} connection")]
    IncompatibleConnection {
        a: PartId,
        b: PartId,
        connection_type: ConnectionType,
    },
    #[error("{a:?} and {b:?} are already connected on that side")]
    DuplicateConnection { a: PartId, b: PartId },
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// A typed link between two adjacent parts. `side_b` is always the exact
/// opposite of `side_a`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub part_a: PartId,
    pub part_b: PartId,
    pub side_a: AttachmentSide,
    pub side_b: AttachmentSide,
    pub connection_type: ConnectionType,
}

impl Connection {
    fn new(
        part_a: PartId,
        part_b: PartId,
        side_a: AttachmentSide,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            part_a,
            part_b,
            side_a,
            side_b: side_a.opposite(),
            connection_type,
        }
    }

    pub fn involves(&self, part: PartId) -> bool {
        self.part_a == part || self.part_b == part
    }

    /// The endpoint that is not `part`, if `part` is an endpoint at all.
    pub fn other(&self, part: PartId) -> Option<PartId> {
        if self.part_a == part {
            Some(self.part_b)
        } else if self.part_b == part {
            Some(self.part_a)
        } else {
            None
        }
    }

    /// The side of `part` this connection leaves from.
    pub fn side_of(&self, part: PartId) -> Option<AttachmentSide> {
        if self.part_a == part {
            Some(self.side_a)
        } else if self.part_b == part {
            Some(self.side_b)
        } else {
            None
        }
    }

    fn joins(&self, a: PartId, side_a: AttachmentSide, b: PartId) -> bool {
        (self.part_a == a && self.part_b == b && self.side_a == side_a)
            || (self.part_b == a && self.part_a == b && self.side_b == side_a)
    }
}

// ---------------------------------------------------------------------------
// Contraption
// ---------------------------------------------------------------------------

/// The player-built assembly of parts and connections.
#[derive(Debug, Clone, Default)]
pub struct Contraption {
    name: String,
    parts: SlotMap<PartId, Part>,
    connections: SlotMap<ConnectionId, Connection>,
    adjacency: SecondaryMap<PartId, Vec<ConnectionId>>,
    cells: BTreeMap<GridPosition, PartId>,
    /// Optional build area `(width, height)` anchored at the origin.
    bounds: Option<(u32, u32)>,
    revision: u64,
}

impl Contraption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Restrict placement to the cells `[0, width) x [0, height)`.
    pub fn with_bounds(mut self, width: u32, height: u32) -> Self {
        self.bounds = Some((width, height));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Incremented on every structural change (parts or connections).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Place an unrotated part with its footprint origin at `position`.
    pub fn place(
        &mut self,
        part_type: PartType,
        position: GridPosition,
    ) -> Result<PartId, ContraptionError> {
        self.place_with(part_type, position, Rotation::None, false)
    }

    /// Place a part and connect it to every compatible neighbour.
    pub fn place_with(
        &mut self,
        part_type: PartType,
        position: GridPosition,
        rotation: Rotation,
        flipped: bool,
    ) -> Result<PartId, ContraptionError> {
        self.check_placement(part_type, position, rotation, None)?;

        let id = self.parts.insert_with_key(|id| Part {
            id,
            part_type,
            position,
            rotation,
            flipped,
            state: PartState::default(),
        });
        self.adjacency.insert(id, Vec::new());
        self.index_cells(id);
        self.auto_connect(id);
        self.touch();
        Ok(id)
    }

    /// Whether a part could be placed here without overlapping anything.
    pub fn can_place(&self, part_type: PartType, position: GridPosition, rotation: Rotation) -> bool {
        self.check_placement(part_type, position, rotation, None)
            .is_ok()
    }

    fn check_placement(
        &self,
        part_type: PartType,
        position: GridPosition,
        rotation: Rotation,
        ignore: Option<PartId>,
    ) -> Result<(), ContraptionError> {
        let footprint = part_type.kind().footprint.rotated(rotation);
        if let Some(cell) = footprint.overflowing_cell(position) {
            return Err(ContraptionError::OutOfBounds { cell });
        }
        for cell in footprint.cells(position) {
            if let Some((width, height)) = self.bounds
                && (cell.x < 0
                    || cell.y < 0
                    || i64::from(cell.x) >= i64::from(width)
                    || i64::from(cell.y) >= i64::from(height))
            {
                return Err(ContraptionError::OutOfBounds { cell });
            }
            if let Some(&by) = self.cells.get(&cell)
                && Some(by) != ignore
            {
                return Err(ContraptionError::CellOccupied { cell, by });
            }
        }
        Ok(())
    }

    /// Move and/or rotate an existing part. Its connections are dropped and
    /// re-inferred at the new placement.
    pub fn relocate(
        &mut self,
        id: PartId,
        position: GridPosition,
        rotation: Rotation,
    ) -> Result<(), ContraptionError> {
        let part_type = self.part(id).ok_or(ContraptionError::PartNotFound(id))?.part_type;
        self.check_placement(part_type, position, rotation, Some(id))?;

        self.drop_connections(id);
        self.unindex_cells(id);
        if let Some(part) = self.parts.get_mut(id) {
            part.position = position;
            part.rotation = rotation;
        }
        self.index_cells(id);
        self.auto_connect(id);
        self.touch();
        Ok(())
    }

    /// Remove a part and every connection touching it.
    pub fn remove(&mut self, id: PartId) -> Result<Part, ContraptionError> {
        if !self.parts.contains_key(id) {
            return Err(ContraptionError::PartNotFound(id));
        }
        self.drop_connections(id);
        self.unindex_cells(id);
        self.adjacency.remove(id);
        let part = self
            .parts
            .remove(id)
            .ok_or(ContraptionError::PartNotFound(id))?;
        self.touch();
        Ok(part)
    }

    fn index_cells(&mut self, id: PartId) {
        let Some(part) = self.parts.get(id) else {
            return;
        };
        let cells: Vec<GridPosition> = part.cells().collect();
        for cell in cells {
            self.cells.insert(cell, id);
        }
    }

    fn unindex_cells(&mut self, id: PartId) {
        self.cells.retain(|_, owner| *owner != id);
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Connect a freshly placed part to every compatible neighbour. One
    /// connection per distinct neighbour per side.
    fn auto_connect(&mut self, id: PartId) {
        let Some(part) = self.parts.get(id) else {
            return;
        };
        let footprint = part.footprint();
        let origin = part.position;
        let kind = part.kind();
        let sides: Vec<AttachmentSide> = part.attachment_sides().collect();

        let mut links = Vec::new();
        for side in sides {
            let mut seen: Vec<PartId> = Vec::new();
            for cell in footprint.border_cells(origin, side) {
                let Some(&neighbor_id) = self.cells.get(&cell) else {
                    continue;
                };
                if neighbor_id == id || seen.contains(&neighbor_id) {
                    continue;
                }
                seen.push(neighbor_id);

                let Some(neighbor) = self.parts.get(neighbor_id) else {
                    continue;
                };
                if !neighbor.attaches_on(side.opposite()) {
                    continue;
                }
                if let Some(connection_type) = kind.shared_connection(neighbor.kind()) {
                    links.push(Connection::new(id, neighbor_id, side, connection_type));
                }
            }
        }

        for link in links {
            self.insert_connection(link);
        }
    }

    fn insert_connection(&mut self, connection: Connection) -> ConnectionId {
        let (a, b) = (connection.part_a, connection.part_b);
        let cid = self.connections.insert(connection);
        if let Some(list) = self.adjacency.get_mut(a) {
            list.push(cid);
        }
        if let Some(list) = self.adjacency.get_mut(b) {
            list.push(cid);
        }
        cid
    }

    /// Explicitly connect two adjacent parts with a given connection type.
    ///
    /// The parts must touch across a side that both can attach on, both must
    /// support `connection_type`, and that side pair must not already carry a
    /// connection.
    pub fn connect(
        &mut self,
        a: PartId,
        b: PartId,
        connection_type: ConnectionType,
    ) -> Result<ConnectionId, ContraptionError> {
        if a == b {
            return Err(ContraptionError::SelfConnection(a));
        }
        let part_a = self.part(a).ok_or(ContraptionError::PartNotFound(a))?;
        let part_b = self.part(b).ok_or(ContraptionError::PartNotFound(b))?;

        if !part_a.kind().supports(connection_type) || !part_b.kind().supports(connection_type) {
            return Err(ContraptionError::IncompatibleConnection {
                a,
                b,
                connection_type,
            });
        }

        let footprint = part_a.footprint();
        let touching: Vec<AttachmentSide> = AttachmentSide::ALL
            .into_iter()
            .filter(|&side| {
                footprint
                    .border_cells(part_a.position, side)
                    .any(|cell| self.cells.get(&cell) == Some(&b))
            })
            .collect();
        if touching.is_empty() {
            return Err(ContraptionError::NotAdjacent { a, b });
        }

        let side = touching
            .into_iter()
            .find(|&side| part_a.attaches_on(side) && part_b.attaches_on(side.opposite()))
            .ok_or(ContraptionError::IncompatibleSides { a, b })?;

        if self
            .connections_of(a)
            .any(|(_, c)| c.joins(a, side, b))
        {
            return Err(ContraptionError::DuplicateConnection { a, b });
        }

        let cid = self.insert_connection(Connection::new(a, b, side, connection_type));
        self.touch();
        Ok(cid)
    }

    /// Remove a single connection.
    pub fn disconnect(&mut self, cid: ConnectionId) -> Result<Connection, ContraptionError> {
        let connection = self
            .connections
            .remove(cid)
            .ok_or(ContraptionError::ConnectionNotFound(cid))?;
        for endpoint in [connection.part_a, connection.part_b] {
            if let Some(list) = self.adjacency.get_mut(endpoint) {
                list.retain(|&c| c != cid);
            }
        }
        self.touch();
        Ok(connection)
    }

    fn drop_connections(&mut self, id: PartId) {
        let attached: Vec<ConnectionId> = self.adjacency.get(id).cloned().unwrap_or_default();
        for cid in attached {
            if let Some(connection) = self.connections.remove(cid)
                && let Some(other) = connection.other(id)
                && let Some(list) = self.adjacency.get_mut(other)
            {
                list.retain(|&c| c != cid);
            }
        }
        if let Some(list) = self.adjacency.get_mut(id) {
            list.clear();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    /// Part state is the only part data open to outside mutation; placement
    /// goes through [`Contraption::relocate`] so the cell index stays valid.
    pub fn state_mut(&mut self, id: PartId) -> Option<&mut PartState> {
        self.parts.get_mut(id).map(|part| &mut part.state)
    }

    pub(crate) fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(id)
    }

    pub fn contains(&self, id: PartId) -> bool {
        self.parts.contains_key(id)
    }

    /// The part covering `cell`, footprint-aware.
    pub fn part_at(&self, cell: GridPosition) -> Option<&Part> {
        self.cells.get(&cell).and_then(|&id| self.parts.get(id))
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub(crate) fn parts_mut(&mut self) -> impl Iterator<Item = &mut Part> {
        self.parts.values_mut()
    }

    /// Snapshot of every part id. Use this when parts may be removed while
    /// walking the list.
    pub fn part_ids(&self) -> Vec<PartId> {
        self.parts.keys().collect()
    }

    /// Ids of every part with the given tag.
    pub fn ids_of_type(&self, part_type: PartType) -> Vec<PartId> {
        self.parts
            .iter()
            .filter(|(_, p)| p.part_type == part_type)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn connection(&self, cid: ConnectionId) -> Option<&Connection> {
        self.connections.get(cid)
    }

    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &Connection)> {
        self.connections.iter()
    }

    /// Snapshot of the connections carrying `connection_type`.
    pub fn connections_of_type(&self, connection_type: ConnectionType) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|(_, c)| c.connection_type == connection_type)
            .map(|(cid, _)| cid)
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections with `part` as an endpoint.
    pub fn connections_of(&self, part: PartId) -> impl Iterator<Item = (ConnectionId, &Connection)> {
        self.adjacency
            .get(part)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|&cid| self.connections.get(cid).map(|c| (cid, c)))
    }

    /// Parts connected to `part`, one entry per connection.
    pub fn neighbors_of(&self, part: PartId) -> Vec<PartId> {
        self.connections_of(part)
            .filter_map(|(_, c)| c.other(part))
            .collect()
    }

    /// The first controlled character, if any.
    pub fn character(&self) -> Option<&Part> {
        self.parts.values().find(|p| p.is_character())
    }

    pub fn has_character(&self) -> bool {
        self.character().is_some()
    }

    pub fn total_mass(&self) -> f64 {
        self.parts.values().map(|p| p.kind().mass).sum()
    }

    /// Mass-weighted centre of the part origins in world units.
    pub fn center_of_mass(&self, cell_size: f64) -> Option<Vec2> {
        let total = self.total_mass();
        if self.parts.is_empty() || total <= 0.0 {
            return None;
        }
        let (sx, sy) = self.parts.values().fold((0.0, 0.0), |(sx, sy), p| {
            let m = p.kind().mass;
            (sx + p.position.x as f64 * m, sy + p.position.y as f64 * m)
        });
        Some(Vec2::new(sx / total * cell_size, sy / total * cell_size))
    }

    /// Reset every part to its default state. Topology is untouched.
    pub fn reset_states(&mut self) {
        for part in self.parts.values_mut() {
            part.state = PartState::default();
        }
    }

    /// Cells claimed by more than one part. Always empty when the graph is
    /// only mutated through this API.
    pub(crate) fn overlapping_cells(&self) -> Vec<GridPosition> {
        let mut claims: BTreeMap<GridPosition, u32> = BTreeMap::new();
        for part in self.parts.values() {
            for cell in part.cells() {
                *claims.entry(cell).or_default() += 1;
            }
        }
        claims
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(cell, _)| cell)
            .collect()
    }
}
