//! Build-grid geometry: cells, attachment sides, rotations, and footprints.
//!
//! The grid is y-up: [`AttachmentSide::Top`] points towards `+y`. A part's
//! position is the cell of its footprint origin (bottom-left corner).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GridPosition
// ---------------------------------------------------------------------------

/// A cell on the build grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub const ZERO: GridPosition = GridPosition { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Saturates at the edge of the `i32` range.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    /// Manhattan distance to another cell. Saturates at `u32::MAX`.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// The four edge-adjacent cells, in side order (top, right, bottom, left).
    pub fn neighbors(self) -> [GridPosition; 4] {
        AttachmentSide::ALL.map(|side| side.step(self))
    }
}

impl std::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// AttachmentSide
// ---------------------------------------------------------------------------

/// One of the four faces of a part that can carry a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentSide {
    Top = 0,
    Right = 1,
    Bottom = 2,
    Left = 3,
}

impl AttachmentSide {
    pub const ALL: [AttachmentSide; 4] = [
        AttachmentSide::Top,
        AttachmentSide::Right,
        AttachmentSide::Bottom,
        AttachmentSide::Left,
    ];

    fn from_index(index: u8) -> Self {
        Self::ALL[(index % 4) as usize]
    }

    /// The side facing this one across a shared edge.
    pub fn opposite(self) -> Self {
        Self::from_index(self as u8 + 2)
    }

    /// Rotate clockwise by `steps` quarter turns.
    pub fn rotated(self, steps: u8) -> Self {
        Self::from_index(self as u8 + steps % 4)
    }

    /// Unit cell offset in this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            AttachmentSide::Top => (0, 1),
            AttachmentSide::Right => (1, 0),
            AttachmentSide::Bottom => (0, -1),
            AttachmentSide::Left => (-1, 0),
        }
    }

    /// The cell one step away from `from` in this direction.
    pub fn step(self, from: GridPosition) -> GridPosition {
        let (dx, dy) = self.offset();
        from.offset(dx, dy)
    }

    /// Angle of the side's outward normal in radians, measured from `Top`.
    pub fn angle(self) -> f64 {
        self as u8 as f64 * std::f64::consts::FRAC_PI_2
    }
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Placement rotation of a part, in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn all() -> [Rotation; 4] {
        [
            Rotation::None,
            Rotation::Cw90,
            Rotation::Cw180,
            Rotation::Cw270,
        ]
    }

    /// Build from degrees. Anything that is not a multiple of 90 snaps down
    /// to the previous quarter turn; negative angles wrap.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) / 90 {
            0 => Rotation::None,
            1 => Rotation::Cw90,
            2 => Rotation::Cw180,
            _ => Rotation::Cw270,
        }
    }

    pub fn degrees(self) -> i32 {
        self.steps() as i32 * 90
    }

    pub fn radians(self) -> f64 {
        (self.degrees() as f64).to_radians()
    }

    /// Number of clockwise quarter turns.
    pub fn steps(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    pub fn rotate_cw(self) -> Self {
        Self::from_degrees(self.degrees() + 90)
    }

    pub fn rotate_ccw(self) -> Self {
        Self::from_degrees(self.degrees() - 90)
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// Width and height of a part in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn single() -> Self {
        Self::new(1, 1)
    }

    /// For 90 and 270 degrees, width and height are swapped.
    pub fn rotated(self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::None | Rotation::Cw180 => self,
            Rotation::Cw90 | Rotation::Cw270 => Self::new(self.height, self.width),
        }
    }

    /// The first corner of this footprint at `origin` that, together with
    /// the ring of border cells around it, does not fit in `i32`. Reported
    /// saturated. `None` when the footprint and its border are representable.
    pub fn overflowing_cell(self, origin: GridPosition) -> Option<GridPosition> {
        let lo = i32::MIN as i64 + 1;
        let hi = i32::MAX as i64 - 1;
        let x0 = origin.x as i64;
        let y0 = origin.y as i64;
        let x1 = x0 + self.width.max(1) as i64 - 1;
        let y1 = y0 + self.height.max(1) as i64 - 1;
        let saturate = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        [(x0, y0), (x1, y1)]
            .into_iter()
            .find(|&(x, y)| x < lo || x > hi || y < lo || y > hi)
            .map(|(x, y)| GridPosition::new(saturate(x), saturate(y)))
    }

    /// Every cell covered by this footprint when its origin sits at `origin`.
    pub fn cells(self, origin: GridPosition) -> impl Iterator<Item = GridPosition> {
        let w = self.width as i32;
        let h = self.height as i32;
        (0..h).flat_map(move |dy| (0..w).map(move |dx| origin.offset(dx, dy)))
    }

    /// Cells just outside the footprint edge on `side`.
    pub fn border_cells(
        self,
        origin: GridPosition,
        side: AttachmentSide,
    ) -> impl Iterator<Item = GridPosition> {
        let w = self.width as i32;
        let h = self.height as i32;
        let (span, fixed_x, fixed_y): (i32, Option<i32>, Option<i32>) = match side {
            AttachmentSide::Top => (w, None, origin.y.checked_add(h)),
            AttachmentSide::Bottom => (w, None, origin.y.checked_sub(1)),
            AttachmentSide::Right => (h, origin.x.checked_add(w), None),
            AttachmentSide::Left => (h, origin.x.checked_sub(1), None),
        };
        // A side that leaves the i32 range has no border cells.
        let span = if fixed_x.is_some() || fixed_y.is_some() { span } else { 0 };
        (0..span).filter_map(move |i| {
            Some(GridPosition::new(
                fixed_x.or_else(|| origin.x.checked_add(i))?,
                fixed_y.or_else(|| origin.y.checked_add(i))?,
            ))
        })
    }

    pub fn area(self) -> u32 {
        self.width.saturating_mul(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = GridPosition::new(1, 2);
        let b = GridPosition::new(4, -2);
        assert_eq!(a.manhattan_distance(&b), 7);
        assert_eq!(b.manhattan_distance(&a), 7);
    }

    #[test]
    fn sides_have_exact_opposites() {
        for side in AttachmentSide::ALL {
            assert_ne!(side, side.opposite());
            assert_eq!(side.opposite().opposite(), side);
            let (dx, dy) = side.offset();
            let (ox, oy) = side.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn rotation_cycles_sides() {
        assert_eq!(AttachmentSide::Top.rotated(1), AttachmentSide::Right);
        assert_eq!(AttachmentSide::Left.rotated(1), AttachmentSide::Top);
        assert_eq!(AttachmentSide::Bottom.rotated(2), AttachmentSide::Top);
        assert_eq!(AttachmentSide::Right.rotated(4), AttachmentSide::Right);
    }

    #[test]
    fn rotation_from_degrees_wraps() {
        assert_eq!(Rotation::from_degrees(0), Rotation::None);
        assert_eq!(Rotation::from_degrees(450), Rotation::Cw90);
        assert_eq!(Rotation::from_degrees(-90), Rotation::Cw270);
        assert_eq!(Rotation::Cw270.rotate_cw(), Rotation::None);
        assert_eq!(Rotation::None.rotate_ccw(), Rotation::Cw270);
    }

    #[test]
    fn footprint_rotation_swaps_dimensions() {
        let tall = Footprint::new(1, 2);
        assert_eq!(tall.rotated(Rotation::Cw90), Footprint::new(2, 1));
        assert_eq!(tall.rotated(Rotation::Cw180), tall);
    }

    #[test]
    fn footprint_cells_cover_area() {
        let fp = Footprint::new(2, 2);
        let cells: Vec<_> = fp.cells(GridPosition::new(3, 4)).collect();
        assert_eq!(cells.len(), 4);
        assert!(cells.contains(&GridPosition::new(4, 5)));
    }

    #[test]
    fn border_cells_of_tall_footprint() {
        let fp = Footprint::new(1, 2);
        let origin = GridPosition::ZERO;
        let top: Vec<_> = fp.border_cells(origin, AttachmentSide::Top).collect();
        assert_eq!(top, vec![GridPosition::new(0, 2)]);
        let right: Vec<_> = fp.border_cells(origin, AttachmentSide::Right).collect();
        assert_eq!(right, vec![GridPosition::new(1, 0), GridPosition::new(1, 1)]);
        let bottom: Vec<_> = fp.border_cells(origin, AttachmentSide::Bottom).collect();
        assert_eq!(bottom, vec![GridPosition::new(0, -1)]);
    }

    #[test]
    fn edge_of_range_has_no_outer_border() {
        let fp = Footprint::single();
        let corner = GridPosition::new(i32::MAX, i32::MIN);
        assert_eq!(fp.border_cells(corner, AttachmentSide::Right).count(), 0);
        assert_eq!(fp.border_cells(corner, AttachmentSide::Bottom).count(), 0);
        let left: Vec<_> = fp.border_cells(corner, AttachmentSide::Left).collect();
        assert_eq!(left, vec![GridPosition::new(i32::MAX - 1, i32::MIN)]);
        assert_eq!(corner.offset(1, -1), corner);
        assert_eq!(corner.checked_offset(1, 0), None);
    }

    #[test]
    fn overflowing_cell_checks_footprint_and_border() {
        let tall = Footprint::new(1, 2);
        assert_eq!(tall.overflowing_cell(GridPosition::new(5, -3)), None);
        assert_eq!(tall.overflowing_cell(GridPosition::new(0, i32::MAX - 2)), None);
        assert_eq!(
            tall.overflowing_cell(GridPosition::new(0, i32::MAX - 1)),
            Some(GridPosition::new(0, i32::MAX))
        );
        assert_eq!(
            tall.overflowing_cell(GridPosition::new(0, i32::MAX)),
            Some(GridPosition::new(0, i32::MAX))
        );
        assert_eq!(
            Footprint::single().overflowing_cell(GridPosition::new(i32::MIN, 0)),
            Some(GridPosition::new(i32::MIN, 0))
        );
        assert!(
            Footprint::single()
                .overflowing_cell(GridPosition::new(i32::MIN + 1, i32::MAX - 1))
                .is_none()
        );
    }

    #[test]
    fn manhattan_distance_across_the_whole_range() {
        let a = GridPosition::new(i32::MIN, i32::MIN);
        let b = GridPosition::new(i32::MAX, 0);
        assert_eq!(a.manhattan_distance(&b), u32::MAX);
    }
}
