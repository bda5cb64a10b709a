// THEORY:
// A `Region` is the static description of one parking spot: a stable identifier
// and the polygon a user traced around the spot on a still image. It is a "dumb"
// data container, immutable once loaded. Its position in the configured sequence
// is its identity for everything downstream: the cached geometry record and the
// status slot at the same index belong to it.
//
// Nothing here validates the polygon. Vertex counts and areas are checked by the
// geometry initializer, which is the one place allowed to reject a region.

use imageproc::point::Point;

pub type SpotId = u32;
pub type Vertex = Point<i32>;

/// A configured polygonal area corresponding to one parking spot.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// The identifier carried over from the region file.
    pub id: SpotId,
    /// Vertices in frame coordinates, in traversal order. The polygon is closed implicitly.
    pub polygon: Vec<Vertex>,
}

impl Region {
    pub fn new(id: SpotId, polygon: Vec<Vertex>) -> Self {
        Self { id, polygon }
    }

    /// Builds a region from `[x, y]` pairs, the shape used by the region file.
    pub fn from_pairs(id: SpotId, pairs: &[[i32; 2]]) -> Self {
        let polygon = pairs.iter().map(|&[x, y]| Point::new(x, y)).collect();
        Self { id, polygon }
    }

    /// The vertices as `[x, y]` pairs.
    pub fn pairs(&self) -> Vec<[i32; 2]> {
        self.polygon.iter().map(|p| [p.x, p.y]).collect()
    }

    /// The human-facing label drawn next to the spot.
    pub fn label(&self) -> String {
        (self.id + 1).to_string()
    }
}
