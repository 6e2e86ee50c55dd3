use geo::{BoundingRect, Simplify};
use geo_types::{Coord, LineString};

use crate::models::{BoundingBox, GeoPoint};

/// Minimum number of distinct vertices a selection ring needs.
pub const MIN_POLYGON_POINTS: usize = 3;

/// A closed selection ring with at least [`MIN_POLYGON_POINTS`] vertices.
///
/// The last vertex is implicitly connected back to the first; rings built by
/// a committed gesture also repeat the first vertex at the end, which the
/// containment test tolerates (the zero-length closing edge never crosses).
#[derive(Clone, Debug, PartialEq)]
pub struct AreaPolygon {
    ring: Vec<GeoPoint>,
}

impl AreaPolygon {
    /// Returns `None` for fewer than three distinct points.
    pub fn new(ring: Vec<GeoPoint>) -> Option<Self> {
        if distinct_vertices(&ring) < MIN_POLYGON_POINTS {
            return None;
        }
        Some(Self { ring })
    }

    /// Build from a gesture buffer, appending the first point to close the ring.
    pub fn closed_from(mut points: Vec<GeoPoint>) -> Option<Self> {
        // A, B, A has three samples but no area
        if distinct_vertices(&points) < MIN_POLYGON_POINTS {
            return None;
        }
        if points.first() != points.last() {
            let first = points[0];
            points.push(first);
        }
        Some(Self { ring: points })
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.ring
    }

    pub fn envelope(&self) -> Option<BoundingBox> {
        envelope(&self.ring)
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point_in_polygon(point, &self.ring)
    }
}

// Ray casting (even-odd rule) with a ray cast from the point towards
// increasing longitude. For each edge (v[j], v[i]) where j is the index
// preceding i (wrapping), the edge is crossed when exactly one endpoint lies
// strictly north of the point and the crossing longitude is strictly east of
// it.
//
// Boundary convention that follows from the strict comparisons: for an
// axis-aligned ring, points on the southern or western edges count as inside,
// points on the northern or eastern edges count as outside. Vertices follow
// the same split.
pub fn point_in_polygon(point: &GeoPoint, polygon: &[GeoPoint]) -> bool {
    let n = polygon.len();
    if n < MIN_POLYGON_POINTS {
        return false;
    }

    let lat = point.latitude;
    let lng = point.longitude;
    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let vi = &polygon[i];
        let vj = &polygon[j];

        let crosses = (vi.latitude > lat) != (vj.latitude > lat)
            && lng
                < (vj.longitude - vi.longitude) * (lat - vi.latitude)
                    / (vj.latitude - vi.latitude)
                    + vi.longitude;

        if crosses {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn distinct_vertices(points: &[GeoPoint]) -> usize {
    let mut seen: Vec<&GeoPoint> = Vec::with_capacity(points.len());
    for p in points {
        if !seen.contains(&p) {
            seen.push(p);
        }
    }
    seen.len()
}

fn to_line_string(points: &[GeoPoint]) -> LineString<f64> {
    points
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect()
}

fn from_line_string(line: &LineString<f64>) -> Vec<GeoPoint> {
    line.coords().map(|c| GeoPoint::new(c.y, c.x)).collect()
}

/// Axis-aligned envelope of a point set, `None` when empty.
pub fn envelope(points: &[GeoPoint]) -> Option<BoundingBox> {
    let rect = to_line_string(points).bounding_rect()?;
    Some(BoundingBox::new(
        rect.min().y,
        rect.min().x,
        rect.max().y,
        rect.max().x,
    ))
}

/// Squared planar distance in degrees, used for sample throttling.
pub fn distance_sq_deg(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = a.latitude - b.latitude;
    let d_lng = a.longitude - b.longitude;
    d_lat * d_lat + d_lng * d_lng
}

/// Reduce a closed ring to at most `max_vertices` points for the wire.
///
/// Ramer-Douglas-Peucker with an escalating tolerance first; if that cannot
/// get under the cap without collapsing the ring, fall back to keeping every
/// k-th vertex. The output stays closed and keeps at least three distinct
/// vertices whenever the input had them.
pub fn reduce_ring(ring: &[GeoPoint], max_vertices: usize) -> Vec<GeoPoint> {
    if ring.len() <= max_vertices || max_vertices < MIN_POLYGON_POINTS + 1 {
        return ring.to_vec();
    }

    let line = to_line_string(ring);
    let env = envelope(ring);
    let span = env
        .map(|b| (b.max_lat - b.min_lat).max(b.max_lng - b.min_lng))
        .unwrap_or(0.0);

    let mut epsilon = (span * 1e-4).max(1e-9);
    for _ in 0..24 {
        let simplified = line.simplify(&epsilon);
        let count = simplified.0.len();
        if count <= max_vertices {
            // closed ring: first == last, so distinct vertices = count - 1
            if count > MIN_POLYGON_POINTS {
                return from_line_string(&simplified);
            }
            break;
        }
        epsilon *= 2.0;
    }

    decimate_ring(ring, max_vertices)
}

fn decimate_ring(ring: &[GeoPoint], max_vertices: usize) -> Vec<GeoPoint> {
    let closed = ring.len() > 1 && ring.first() == ring.last();
    let open = if closed { &ring[..ring.len() - 1] } else { ring };

    let budget = max_vertices - 1;
    let stride = (open.len() + budget - 1) / budget;
    let mut out: Vec<GeoPoint> = open.iter().step_by(stride.max(1)).copied().collect();
    out.truncate(budget);
    if let Some(first) = out.first().copied() {
        out.push(first);
    }
    out
}
