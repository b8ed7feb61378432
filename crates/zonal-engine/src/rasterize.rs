//! Geometry rasterization into window-sized boolean masks.
//!
//! Areal geometries are filled with a half-open even-odd scanline evaluated
//! at cell centres. Under [`TouchRule::AllTouched`] every cell whose open
//! interior is crossed by a ring edge is added as well, so a boundary that
//! runs exactly along a grid line never pulls in the neighbouring cells.
//! Linear geometries mark the cells their segments pass through under both
//! rules.

use std::borrow::Cow;

use geo::{coord, Coord, Geometry, Line, MultiPolygon, Polygon, Rect};
use serde::{Deserialize, Serialize};

use zonal_common::{BoundingBox, GridDescriptor, GridWindow, ZonalResult};

/// Which cells a geometry claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchRule {
    /// Every cell the geometry's boundary or interior meets.
    #[default]
    AllTouched,
    /// Only cells whose centre lies inside the geometry.
    CellCenter,
}

impl std::fmt::Display for TouchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllTouched => write!(f, "all_touched"),
            Self::CellCenter => write!(f, "cell_center"),
        }
    }
}

/// Boolean mask over a [`GridWindow`], row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowMask {
    window: GridWindow,
    cells: Vec<bool>,
}

impl WindowMask {
    pub fn new(window: GridWindow) -> Self {
        Self {
            window,
            cells: vec![false; window.len()],
        }
    }

    pub fn window(&self) -> &GridWindow {
        &self.window
    }

    pub fn get(&self, local_row: usize, local_col: usize) -> bool {
        self.cells[local_row * self.window.cols + local_col]
    }

    fn set(&mut self, local_row: usize, local_col: usize) {
        self.cells[local_row * self.window.cols + local_col] = true;
    }

    /// Marked cells as window-local (row, col), in row-major order.
    pub fn marked(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.window.cols;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &on)| on)
            .map(move |(i, _)| (i / cols, i % cols))
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&on| on).count()
    }
}

/// Replace bare points with the polygon of the grid cell that encloses them.
///
/// A zero-area geometry rasterizes to nothing, so points are expanded before
/// their bounding box and window are computed.
pub fn boxify_points<'a>(geometry: &'a Geometry<f64>, grid: &GridDescriptor) -> Cow<'a, Geometry<f64>> {
    match geometry {
        Geometry::Point(p) => Cow::Owned(Geometry::Rect(enclosing_cell(grid, p.0))),
        Geometry::MultiPoint(mp) => Cow::Owned(Geometry::MultiPolygon(MultiPolygon::new(
            mp.iter()
                .map(|p| enclosing_cell(grid, p.0).to_polygon())
                .collect(),
        ))),
        _ => Cow::Borrowed(geometry),
    }
}

/// Rasterize a geometry into a mask sized to `window`.
pub fn rasterize(
    geometry: &Geometry<f64>,
    grid: &GridDescriptor,
    window: &GridWindow,
    rule: TouchRule,
) -> ZonalResult<WindowMask> {
    let mut polygons: Vec<Cow<'_, Polygon<f64>>> = Vec::new();
    let mut segments: Vec<Line<f64>> = Vec::new();
    collect_parts(geometry, grid, &mut polygons, &mut segments)?;

    let mut mask = WindowMask::new(*window);
    if window.is_empty() {
        return Ok(mask);
    }

    for polygon in &polygons {
        fill_centers(polygon, grid, &mut mask);
        if rule == TouchRule::AllTouched {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                for line in ring.lines() {
                    mark_segment(line, grid, &mut mask);
                }
            }
        }
    }

    for line in &segments {
        mark_segment(*line, grid, &mut mask);
    }

    Ok(mask)
}

fn enclosing_cell(grid: &GridDescriptor, c: Coord<f64>) -> Rect<f64> {
    let (row, col) = grid.cell_containing(c.x, c.y);
    let b = grid.cell_bounds(row, col);
    Rect::new(coord! { x: b.min_x, y: b.min_y }, coord! { x: b.max_x, y: b.max_y })
}

fn collect_parts<'a>(
    geometry: &'a Geometry<f64>,
    grid: &GridDescriptor,
    polygons: &mut Vec<Cow<'a, Polygon<f64>>>,
    segments: &mut Vec<Line<f64>>,
) -> ZonalResult<()> {
    match geometry {
        Geometry::Polygon(p) => polygons.push(Cow::Borrowed(p)),
        Geometry::MultiPolygon(mp) => polygons.extend(mp.iter().map(Cow::Borrowed)),
        Geometry::Rect(r) => polygons.push(Cow::Owned(r.to_polygon())),
        Geometry::Triangle(t) => polygons.push(Cow::Owned(t.to_polygon())),
        Geometry::Point(p) => polygons.push(Cow::Owned(enclosing_cell(grid, p.0).to_polygon())),
        Geometry::MultiPoint(mp) => polygons.extend(
            mp.iter()
                .map(|p| Cow::Owned(enclosing_cell(grid, p.0).to_polygon())),
        ),
        Geometry::Line(l) => segments.push(*l),
        Geometry::LineString(ls) => segments.extend(ls.lines()),
        Geometry::MultiLineString(mls) => {
            for ls in mls.iter() {
                segments.extend(ls.lines());
            }
        }
        Geometry::GeometryCollection(gc) => {
            for member in gc.iter() {
                collect_parts(member, grid, polygons, segments)?;
            }
        }
    }
    Ok(())
}

/// Even-odd scanline fill evaluated at each window row's cell centres.
fn fill_centers(polygon: &Polygon<f64>, grid: &GridDescriptor, mask: &mut WindowMask) {
    let window = *mask.window();
    let mut crossings: Vec<f64> = Vec::new();

    for local_row in 0..window.rows {
        let (row, _) = window.to_grid(local_row, 0);
        let (_, yc) = grid.cell_center(row, 0);

        crossings.clear();
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            for line in ring.lines() {
                let (a, b) = (line.start, line.end);
                if (a.y <= yc) != (b.y <= yc) {
                    crossings.push(a.x + (yc - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            // Centres in [x0, x1): col + 0.5 >= col_at(x0)
            let first = (grid.col_at(span[0]) - 0.5).ceil() as isize;
            let last = (grid.col_at(span[1]) - 0.5).ceil() as isize;
            let lo = (first - window.col_start).max(0);
            let hi = (last - window.col_start).min(window.cols as isize);
            for local_col in lo..hi {
                mask.set(local_row, local_col as usize);
            }
        }
    }
}

/// Mark every window cell whose open interior the segment meets.
fn mark_segment(line: Line<f64>, grid: &GridDescriptor, mask: &mut WindowMask) {
    let window = *mask.window();
    let seg_box = BoundingBox::new(
        line.start.x.min(line.end.x),
        line.start.y.min(line.end.y),
        line.start.x.max(line.end.x),
        line.start.y.max(line.end.y),
    );

    // Candidate cells: the segment's own window, padded by one cell so that
    // degenerate (axis-aligned) segments still get candidates on both sides.
    let cand = grid.window_for_bbox(&seg_box);
    let row_lo = (cand.row_start - 1).max(window.row_start);
    let row_hi = (cand.row_start + cand.rows as isize + 1).min(window.row_start + window.rows as isize);
    let col_lo = (cand.col_start - 1).max(window.col_start);
    let col_hi = (cand.col_start + cand.cols as isize + 1).min(window.col_start + window.cols as isize);

    for row in row_lo..row_hi {
        for col in col_lo..col_hi {
            if segment_meets_open_cell(line, &grid.cell_bounds(row, col)) {
                mask.set(
                    (row - window.row_start) as usize,
                    (col - window.col_start) as usize,
                );
            }
        }
    }
}

/// Liang-Barsky clip against the closed cell, then test the midpoint of the
/// clipped chord against the open cell. A chord that only runs along an edge
/// or touches a corner has its midpoint on the boundary.
fn segment_meets_open_cell(line: Line<f64>, cell: &BoundingBox) -> bool {
    let a = line.start;
    let dx = line.end.x - a.x;
    let dy = line.end.y - a.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [
        (-dx, a.x - cell.min_x),
        (dx, cell.max_x - a.x),
        (-dy, a.y - cell.min_y),
        (dy, cell.max_y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }
    }

    let tm = (t0 + t1) / 2.0;
    cell.interior_contains(a.x + tm * dx, a.y + tm * dy)
}
