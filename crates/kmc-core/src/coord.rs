// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use core::cmp::Ordering;

/// Relative lattice offset from a reference site.
///
/// * Components are in the same length unit as the lattice vectors supplied
///   by the topology provider (Cartesian, not fractional).
/// * Equality used by the matcher is tolerance-aware; the derived
///   `PartialEq` is exact and meant for tests and hashing-free comparisons.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    data: [f64; 3],
}

impl Coordinate {
    /// The zero offset (the reference site itself).
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates an offset from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { data: [x, y, z] }
    }

    /// Returns the components as an array.
    pub fn to_array(self) -> [f64; 3] {
        self.data
    }

    /// X component.
    pub fn x(&self) -> f64 {
        self.data[0]
    }

    /// Y component.
    pub fn y(&self) -> f64 {
        self.data[1]
    }

    /// Z component.
    pub fn z(&self) -> f64 {
        self.data[2]
    }

    /// Adds two offsets.
    pub fn add(&self, other: &Self) -> Self {
        Self::new(self.x() + other.x(), self.y() + other.y(), self.z() + other.z())
    }

    /// Subtracts another offset.
    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.x() - other.x(), self.y() - other.y(), self.z() - other.z())
    }

    /// Euclidean length of the offset, i.e. its distance from the reference site.
    pub fn norm(&self) -> f64 {
        (self.x() * self.x() + self.y() * self.y() + self.z() * self.z()).sqrt()
    }

    /// Lexicographic x, y, z comparison on a grid of spacing `tol`.
    ///
    /// Components are snapped to the nearest multiple of `tol` before being
    /// compared so the order stays total. A zero `tol` compares raw values.
    pub fn cmp_with_tolerance(&self, other: &Self, tol: f64) -> Ordering {
        for (a, b) in self.data.iter().zip(other.data.iter()) {
            let ord = cmp_quantized(*a, *b, tol);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Returns `true` when every component agrees within `tol`.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl From<[f64; 3]> for Coordinate {
    fn from(value: [f64; 3]) -> Self {
        Self { data: value }
    }
}

/// Total order over scalars snapped to a grid of spacing `tol`.
pub(crate) fn cmp_quantized(a: f64, b: f64, tol: f64) -> Ordering {
    // `+ 0.0` folds -0.0 into +0.0; `total_cmp` would order them apart.
    if tol > 0.0 {
        ((a / tol).round() + 0.0).total_cmp(&((b / tol).round() + 0.0))
    } else {
        (a + 0.0).total_cmp(&(b + 0.0))
    }
}
