//! Axis-aligned geometry: axes, block faces and bounding boxes.
//!
//! Boxes are stored as a middle point and a size, matching the way the
//! Java server reasons about collision. All block-relative boxes have their
//! origin at the block's minimum corner.

use glam::{DVec3, IVec3};

/// Slack used by every collision comparison.
pub const COLLISION_TOLERANCE: f64 = 0.00001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// The component of `v` along this axis.
    pub fn choose(self, v: DVec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    /// A vector with `amount` on this axis and zero elsewhere.
    pub fn vector(self, amount: f64) -> DVec3 {
        match self {
            Axis::X => DVec3::new(amount, 0.0, 0.0),
            Axis::Y => DVec3::new(0.0, amount, 0.0),
            Axis::Z => DVec3::new(0.0, 0.0, amount),
        }
    }
}

/// One of the six block faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    /// Java 3D data value order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Look up by Java 3D data value (0 = down … 5 = east).
    pub fn from_index(index: u8) -> Option<Direction> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn from_name(name: &str) -> Option<Direction> {
        match name {
            "down" => Some(Direction::Down),
            "up" => Some(Direction::Up),
            "north" => Some(Direction::North),
            "south" => Some(Direction::South),
            "west" => Some(Direction::West),
            "east" => Some(Direction::East),
            _ => None,
        }
    }

    pub fn unit_vector(self) -> IVec3 {
        match self {
            Direction::Down => IVec3::NEG_Y,
            Direction::Up => IVec3::Y,
            Direction::North => IVec3::NEG_Z,
            Direction::South => IVec3::Z,
            Direction::West => IVec3::NEG_X,
            Direction::East => IVec3::X,
        }
    }

    pub fn reversed(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::Down | Direction::Up => Axis::Y,
            Direction::North | Direction::South => Axis::Z,
            Direction::West | Direction::East => Axis::X,
        }
    }

    pub fn is_vertical(self) -> bool {
        self.axis() == Axis::Y
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub middle: DVec3,
    pub size: DVec3,
}

impl BoundingBox {
    pub fn new(middle: DVec3, size: DVec3) -> Self {
        Self { middle, size }
    }

    pub fn from_min_max(min: DVec3, max: DVec3) -> Self {
        Self {
            middle: (min + max) / 2.0,
            size: max - min,
        }
    }

    /// Full 1×1×1 cube at a block origin.
    pub fn solid() -> Self {
        Self::new(DVec3::splat(0.5), DVec3::ONE)
    }

    pub fn min(&self) -> DVec3 {
        self.middle - self.size / 2.0
    }

    pub fn max(&self) -> DVec3 {
        self.middle + self.size / 2.0
    }

    pub fn bottom_center(&self) -> DVec3 {
        DVec3::new(self.middle.x, self.middle.y - self.size.y / 2.0, self.middle.z)
    }

    pub fn translate(&mut self, v: DVec3) {
        self.middle += v;
    }

    pub fn translated(mut self, v: DVec3) -> Self {
        self.translate(v);
        self
    }

    /// Stretch the box by `v`, keeping the face opposite to `v` in place.
    pub fn extend(&mut self, v: DVec3) {
        self.middle += v / 2.0;
        self.size += v.abs();
    }

    pub fn extended(mut self, v: DVec3) -> Self {
        self.extend(v);
        self
    }

    /// Intersection with `other` when this box is shifted by `offset`.
    /// Touching faces do not intersect.
    pub fn intersects(&self, offset: DVec3, other: &BoundingBox) -> bool {
        Axis::ALL
            .iter()
            .all(|&axis| self.overlaps_in_axis(offset, other, axis))
    }

    fn overlaps_in_axis(&self, offset: DVec3, other: &BoundingBox, axis: Axis) -> bool {
        let distance = (axis.choose(self.middle + offset) - axis.choose(other.middle)).abs();
        distance * 2.0 < axis.choose(self.size) + axis.choose(other.size)
    }

    /// How far `moving` may travel along `axis` (at most `offset`) before
    /// touching this box shifted by `self_offset`.
    pub fn max_offset(
        &self,
        self_offset: DVec3,
        moving: &BoundingBox,
        axis: Axis,
        mut offset: f64,
    ) -> f64 {
        let overlaps_elsewhere = Axis::ALL
            .iter()
            .filter(|&&a| a != axis)
            .all(|&a| self.overlaps_in_axis(self_offset, moving, a));
        if !overlaps_elsewhere {
            return offset;
        }
        if offset > 0.0 {
            let min = axis.choose(self.min() + self_offset);
            let max = axis.choose(moving.max());
            if min - max >= -2.0 * COLLISION_TOLERANCE {
                offset = offset.min(min - max);
            }
        } else if offset < 0.0 {
            let min = axis.choose(moving.min());
            let max = axis.choose(self.max() + self_offset);
            if min - max >= -2.0 * COLLISION_TOLERANCE {
                offset = offset.max(max - min);
            }
        }
        offset
    }

    /// Distance this box must move towards `side` to rest against that
    /// face of `other`.
    pub fn intersection_size(&self, other: &BoundingBox, side: Direction) -> f64 {
        match side {
            Direction::Down => self.max().y - other.min().y,
            Direction::Up => other.max().y - self.min().y,
            Direction::North => self.max().z - other.min().z,
            Direction::South => other.max().z - self.min().z,
            Direction::West => self.max().x - other.min().x,
            Direction::East => other.max().x - self.min().x,
        }
    }
}
