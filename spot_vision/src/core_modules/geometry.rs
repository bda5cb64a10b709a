// THEORY:
// The geometry initializer turns each static `Region` into the two things the
// per-frame test needs: the axis-aligned `Bound` to crop with and a binary `Mask`
// that says which pixels of that crop actually belong to the spot.
//
// Both are derived exactly once per run and never change afterwards, so they are
// kept together in a single `RegionGeometry` record. The detector holds these in
// the same order as the configured regions, which makes index alignment a
// property of construction instead of a convention between parallel lists.
//
// Mask membership is sampled at pixel centres of the bound-local grid. Vertices
// are doubled so every centre lands on odd integer coordinates, and the whole
// point-in-polygon test runs in exact `i64` arithmetic. Points lying on an edge
// are inside; the interior follows the even-odd rule. A lattice polygon with
// positive area always has an edge midpoint or interior point on a pixel centre,
// so every mask that passes the degenerate checks is non-empty.
//
// The bound is checked against the frame before the mask is rasterized. Past that
// check every local coordinate is bounded by the frame size.

use crate::core_modules::region::{Region, SpotId, Vertex};
use crate::error::VisionError;
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::info;

/// Binary membership raster over a bound's local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    width: u32,
    height: u32,
    /// Row-major membership flags, `width * height` long.
    cells: Vec<bool>,
}

impl RegionMask {
    /// Fills `local_polygon` over a `width` x `height` grid.
    pub fn rasterize(local_polygon: &[Vertex], width: u32, height: u32) -> Self {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(covers_pixel_centre(local_polygon, x, y));
            }
        }
        Self { width, height, cells }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.height
            && self.cells[y as usize * self.width as usize + x as usize]
    }

    /// Number of pixels inside the polygon.
    pub fn covered(&self) -> usize {
        self.cells.iter().filter(|&&inside| inside).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }
}

/// The cached geometry of a single region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGeometry {
    /// The identifier of the region this record was derived from.
    pub id: SpotId,
    /// The polygon in frame coordinates.
    pub polygon: Vec<Vertex>,
    /// The polygon shifted by `(-bound.x, -bound.y)`.
    pub local_polygon: Vec<Vertex>,
    /// The minimal enclosing rectangle of `polygon`.
    pub bound: Rect,
    /// Membership of each pixel of `bound`.
    pub mask: RegionMask,
}

impl RegionGeometry {
    /// Derives bound and mask for one region inside a `frame_width` x `frame_height`
    /// frame, rejecting degenerate polygons and bounds that leave the frame.
    pub fn build(region: &Region, frame_width: u32, frame_height: u32) -> Result<Self, VisionError> {
        let degenerate = |reason: String| VisionError::DegenerateRegion { id: region.id, reason };

        let distinct = distinct_vertices(&region.polygon);
        if distinct < 3 {
            return Err(degenerate(format!("only {distinct} distinct vertices, at least 3 required")));
        }

        let bound = bounding_rect(&region.polygon).ok_or_else(|| {
            degenerate("zero-area bounding rectangle".to_string())
        })?;

        if !rect_fits_within(bound, frame_width, frame_height) {
            return Err(VisionError::RegionOutOfFrame {
                id: region.id,
                x: bound.left(),
                y: bound.top(),
                width: bound.width(),
                height: bound.height(),
                frame_width,
                frame_height,
            });
        }

        if twice_signed_area(&region.polygon) == 0 {
            return Err(degenerate("vertices are collinear".to_string()));
        }

        let local_polygon: Vec<Vertex> = region
            .polygon
            .iter()
            .map(|p| Point::new(p.x - bound.left(), p.y - bound.top()))
            .collect();

        let mask = RegionMask::rasterize(&local_polygon, bound.width(), bound.height());

        Ok(Self {
            id: region.id,
            polygon: region.polygon.clone(),
            local_polygon,
            bound,
            mask,
        })
    }
}

fn rect_fits_within(bound: Rect, frame_width: u32, frame_height: u32) -> bool {
    bound.left() >= 0
        && bound.top() >= 0
        && bound.left() as i64 + bound.width() as i64 <= frame_width as i64
        && bound.top() as i64 + bound.height() as i64 <= frame_height as i64
}

/// Builds the geometry records for every region, in order, against a frame of the given size.
pub fn build_all(
    regions: &[Region],
    frame_width: u32,
    frame_height: u32,
) -> Result<Vec<RegionGeometry>, VisionError> {
    let records = regions
        .iter()
        .map(|region| RegionGeometry::build(region, frame_width, frame_height))
        .collect::<Result<Vec<_>, _>>()?;

    let covered: usize = records.iter().map(|r| r.mask.covered()).sum();
    info!(
        regions = records.len(),
        covered_pixels = covered,
        frame_width,
        frame_height,
        "Region geometry initialized"
    );
    Ok(records)
}

/// The minimal rectangle enclosing every vertex, or `None` when it has no area.
pub fn bounding_rect(polygon: &[Vertex]) -> Option<Rect> {
    let first = polygon.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &polygon[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    let width = (max_x as i64 - min_x as i64) as u32;
    let height = (max_y as i64 - min_y as i64) as u32;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Rect::at(min_x, min_y).of_size(width, height))
}

fn distinct_vertices(polygon: &[Vertex]) -> usize {
    let mut coords: Vec<(i32, i32)> = polygon.iter().map(|p| (p.x, p.y)).collect();
    coords.sort_unstable();
    coords.dedup();
    coords.len()
}

/// Shoelace sum; zero for collinear vertex sets.
fn twice_signed_area(polygon: &[Vertex]) -> i128 {
    let n = polygon.len();
    (0..n)
        .map(|i| {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128
        })
        .sum()
}

/// Tests the centre of local pixel `(x, y)` against the polygon in doubled coordinates.
fn covers_pixel_centre(polygon: &[Vertex], x: u32, y: u32) -> bool {
    let px = 2 * x as i64 + 1;
    let py = 2 * y as i64 + 1;
    let n = polygon.len();
    let mut inside = false;

    for i in 0..n {
        let (ax, ay) = (2 * polygon[i].x as i64, 2 * polygon[i].y as i64);
        let next = polygon[(i + 1) % n];
        let (bx, by) = (2 * next.x as i64, 2 * next.y as i64);

        let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
        if cross == 0
            && px >= ax.min(bx)
            && px <= ax.max(bx)
            && py >= ay.min(by)
            && py <= ay.max(by)
        {
            return true;
        }

        if (ay > py) != (by > py) {
            let lhs = (px - ax) * (by - ay);
            let rhs = (py - ay) * (bx - ax);
            let left_of_crossing = if by > ay { lhs < rhs } else { lhs > rhs };
            if left_of_crossing {
                inside = !inside;
            }
        }
    }

    inside
}
