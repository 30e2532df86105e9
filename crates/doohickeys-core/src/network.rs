//! Power and transmission networks.
//!
//! For every power source, a breadth-first walk over the connections the
//! source can transmit through. Traversal passes through any part; only parts
//! that require power are recorded as reached. The result is derived data:
//! it is rebuilt whenever the contraption's structure changes.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::contraption::Contraption;
use crate::id::PartId;
use crate::part::{ConnectionType, PartType};

/// Connection types a source of the given type pushes power through.
pub fn transmits(part_type: PartType) -> &'static [ConnectionType] {
    match part_type {
        PartType::SteamBoiler | PartType::PressureTank => {
            &[ConnectionType::Steam, ConnectionType::Pneumatic]
        }
        PartType::TeslaCoil | PartType::Capacitor => &[ConnectionType::Electrical],
        PartType::ClockworkMotor | PartType::WindupSpring => {
            &[ConnectionType::Chain, ConnectionType::Axle]
        }
        PartType::CoalFurnace => &[ConnectionType::Rigid],
        _ => &[],
    }
}

/// Reachable consumers per power source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerNetwork {
    reach: BTreeMap<PartId, BTreeSet<PartId>>,
    /// Contraption revision this network was built from.
    revision: Option<u64>,
}

impl PowerNetwork {
    pub fn build(contraption: &Contraption) -> Self {
        let mut network = Self::default();
        network.rebuild(contraption);
        network
    }

    /// Recompute every source's reachable set from scratch.
    pub fn rebuild(&mut self, contraption: &Contraption) {
        self.reach.clear();

        for source in contraption.parts().filter(|p| p.kind().is_powered) {
            let allowed = transmits(source.part_type);
            let mut reached = BTreeSet::new();
            let mut visited = BTreeSet::from([source.id]);
            let mut queue = VecDeque::from([source.id]);

            while let Some(current) = queue.pop_front() {
                for (_, connection) in contraption.connections_of(current) {
                    if !allowed.contains(&connection.connection_type) {
                        continue;
                    }
                    let Some(next) = connection.other(current) else {
                        continue;
                    };
                    if !visited.insert(next) {
                        continue;
                    }
                    if let Some(part) = contraption.part(next)
                        && part.kind().requires_power
                    {
                        reached.insert(next);
                    }
                    queue.push_back(next);
                }
            }

            self.reach.insert(source.id, reached);
        }

        self.revision = Some(contraption.revision());
        tracing::debug!(
            sources = self.reach.len(),
            powered = self.powered_parts().len(),
            revision = contraption.revision(),
            "power network rebuilt"
        );
    }

    /// Whether the contraption changed structurally since the last build.
    pub fn is_stale(&self, contraption: &Contraption) -> bool {
        self.revision != Some(contraption.revision())
    }

    pub fn sources(&self) -> impl Iterator<Item = PartId> + '_ {
        self.reach.keys().copied()
    }

    /// Consumers reached from `source`, or `None` if it is not a source.
    pub fn reachable_from(&self, source: PartId) -> Option<&BTreeSet<PartId>> {
        self.reach.get(&source)
    }

    /// Whether any source reaches `part`.
    pub fn is_powered(&self, part: PartId) -> bool {
        self.reach.values().any(|set| set.contains(&part))
    }

    /// Sources whose network includes `part`.
    pub fn sources_powering(&self, part: PartId) -> Vec<PartId> {
        self.reach
            .iter()
            .filter(|(_, set)| set.contains(&part))
            .map(|(&source, _)| source)
            .collect()
    }

    /// Union of every source's reachable set.
    pub fn powered_parts(&self) -> BTreeSet<PartId> {
        self.reach.values().flatten().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.reach.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reach.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridPosition;

    fn at(x: i32, y: i32) -> GridPosition {
        GridPosition::new(x, y)
    }

    #[test]
    fn motor_reaches_wheel_through_gears() {
        let mut c = Contraption::new("drive");
        let motor = c.place(PartType::ClockworkMotor, at(0, 1)).unwrap();
        // Motor attaches top/bottom; a gear box below it routes sideways.
        let gear_box = c.place(PartType::GearBox, at(0, 0)).unwrap();
        let wheel = c.place(PartType::CogWheel, at(0, -1)).unwrap();

        let network = PowerNetwork::build(&c);
        let reached = network.reachable_from(motor).unwrap();
        assert!(reached.contains(&wheel));
        // The gear box is traversed but does not require power.
        assert!(!reached.contains(&gear_box));
        assert!(network.is_powered(wheel));
        assert_eq!(network.sources_powering(wheel), vec![motor]);
    }

    #[test]
    fn traversal_is_restricted_to_transmitted_types() {
        let mut c = Contraption::new("mismatch");
        let furnace = c.place(PartType::CoalFurnace, at(0, 0)).unwrap();
        // Rigid link from the furnace, but wheels only take axles.
        let frame = c.place(PartType::BrassFrame, at(1, 0)).unwrap();
        c.place(PartType::CogWheel, at(1, -1)).unwrap();

        let network = PowerNetwork::build(&c);
        assert!(network.reachable_from(furnace).unwrap().is_empty());
        assert!(!network.is_powered(frame));
    }

    #[test]
    fn only_powered_kinds_are_sources() {
        let mut c = Contraption::new("sources");
        let boiler = c.place(PartType::SteamBoiler, at(0, 0)).unwrap();
        let tank = c.place(PartType::PressureTank, at(1, 0)).unwrap();
        let network = PowerNetwork::build(&c);
        assert_eq!(network.sources().collect::<Vec<_>>(), vec![boiler]);
        assert!(network.reachable_from(tank).is_none());
    }

    #[test]
    fn staleness_follows_revision() {
        let mut c = Contraption::new("stale");
        c.place(PartType::TeslaCoil, at(0, 0)).unwrap();
        let mut network = PowerNetwork::build(&c);
        assert!(!network.is_stale(&c));
        c.place(PartType::CopperWire, at(0, -1)).unwrap();
        assert!(network.is_stale(&c));
        network.rebuild(&c);
        assert!(!network.is_stale(&c));
        assert_eq!(network.len(), 1);
    }

    #[test]
    fn empty_contraption_has_no_network() {
        let network = PowerNetwork::build(&Contraption::new("empty"));
        assert!(network.is_empty());
        assert!(network.powered_parts().is_empty());
    }

    #[test]
    fn transmit_table() {
        assert_eq!(
            transmits(PartType::SteamBoiler),
            &[ConnectionType::Steam, ConnectionType::Pneumatic]
        );
        assert_eq!(transmits(PartType::CoalFurnace), &[ConnectionType::Rigid]);
        assert!(transmits(PartType::BrassFrame).is_empty());
    }
}
