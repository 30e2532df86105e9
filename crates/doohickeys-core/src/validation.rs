//! Pre-flight checks run before a contraption is simulated.
//!
//! Validation never mutates and never refuses a run on its own. The
//! controller logs the report; the host decides what to do with it.

use crate::contraption::Contraption;
use crate::grid::GridPosition;
use crate::id::{ConnectionId, PartId};
use crate::network::PowerNetwork;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One problem found in a contraption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// No controlled character was placed.
    MissingCharacter,
    /// More than one controlled character was placed.
    MultipleCharacters(Vec<PartId>),
    /// A part that needs power is not reachable from any source.
    Unpowered(PartId),
    /// A connection whose two sides do not face each other.
    MismatchedSides(ConnectionId),
    /// A connection referencing a part that no longer exists.
    DanglingConnection(ConnectionId),
    /// A grid cell claimed by more than one part.
    OverlappingCell(GridPosition),
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::MissingCharacter => write!(f, "no character placed"),
            ValidationIssue::MultipleCharacters(ids) => {
                write!(f, "{} characters placed", ids.len())
            }
            ValidationIssue::Unpowered(id) => write!(f, "{id:?} is not reachable from a power source"),
            ValidationIssue::MismatchedSides(cid) => write!(f, "{cid:?} joins non-opposite sides"),
            ValidationIssue::DanglingConnection(cid) => write!(f, "{cid:?} references a missing part"),
            ValidationIssue::OverlappingCell(cell) => write!(f, "cell {cell} is claimed twice"),
        }
    }
}

/// Every issue found by [`validate_contraption`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter()
    }

    /// Issues that break the graph invariants rather than the puzzle.
    pub fn structural(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| {
            matches!(
                issue,
                ValidationIssue::MismatchedSides(_)
                    | ValidationIssue::DanglingConnection(_)
                    | ValidationIssue::OverlappingCell(_)
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Check a contraption for problems that would make a run pointless or
/// indicate a corrupted graph.
pub fn validate_contraption(contraption: &Contraption) -> ValidationReport {
    let mut issues = Vec::new();

    let characters: Vec<PartId> = contraption
        .parts()
        .filter(|p| p.is_character())
        .map(|p| p.id)
        .collect();
    match characters.len() {
        0 => issues.push(ValidationIssue::MissingCharacter),
        1 => {}
        _ => issues.push(ValidationIssue::MultipleCharacters(characters)),
    }

    let network = PowerNetwork::build(contraption);
    for part in contraption.parts() {
        if part.kind().requires_power && !network.is_powered(part.id) {
            issues.push(ValidationIssue::Unpowered(part.id));
        }
    }

    for (cid, link) in contraption.connections() {
        if !contraption.contains(link.part_a) || !contraption.contains(link.part_b) {
            issues.push(ValidationIssue::DanglingConnection(cid));
        } else if link.side_a.opposite() != link.side_b {
            issues.push(ValidationIssue::MismatchedSides(cid));
        }
    }

    issues.extend(
        contraption
            .overlapping_cells()
            .into_iter()
            .map(ValidationIssue::OverlappingCell),
    );

    ValidationReport { issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PartType;
    use crate::test_utils::place;

    #[test]
    fn empty_contraption_lacks_character() {
        let report = validate_contraption(&Contraption::new("empty"));
        assert_eq!(report.issues, vec![ValidationIssue::MissingCharacter]);
        assert_eq!(report.structural().count(), 0);
    }

    #[test]
    fn two_characters_are_flagged() {
        let mut c = Contraption::new("crowd");
        let a = place(&mut c, PartType::KameraMan, 0, 0);
        let b = place(&mut c, PartType::KameraMan, 3, 0);
        let report = validate_contraption(&c);
        assert_eq!(
            report.issues,
            vec![ValidationIssue::MultipleCharacters(vec![a, b])]
        );
    }

    #[test]
    fn unreachable_consumer_is_unpowered() {
        let mut c = Contraption::new("dark");
        place(&mut c, PartType::KameraMan, 5, 5);
        let wheel = place(&mut c, PartType::CogWheel, 0, 0);
        let report = validate_contraption(&c);
        assert_eq!(report.issues, vec![ValidationIssue::Unpowered(wheel)]);
    }

    #[test]
    fn powered_consumer_passes() {
        let mut c = Contraption::new("lit");
        place(&mut c, PartType::KameraMan, 5, 5);
        place(&mut c, PartType::ClockworkMotor, 0, 0);
        place(&mut c, PartType::GearBox, 0, -1);
        place(&mut c, PartType::CogWheel, 0, -2);
        let report = validate_contraption(&c);
        assert!(report.is_ok(), "{:?}", report.issues);
    }

    #[test]
    fn issues_render_for_logs() {
        let issue = ValidationIssue::OverlappingCell(GridPosition::new(1, 2));
        assert_eq!(issue.to_string(), "cell (1, 2) is claimed twice");
    }
}
