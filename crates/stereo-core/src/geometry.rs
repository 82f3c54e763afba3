//! Pure geometry for region-of-interest computation
//!
//! Works on four-corner field quadrilaterals: the perspective-interpolated
//! line-of-scrimmage band, overlapping grid bands, and the axis-aligned
//! regions handed to the detector.

use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Linear interpolation from `self` to `other` at parameter `t`.
    pub fn lerp(&self, other: &Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A field quadrilateral with corners ordered far-left, far-right,
/// near-right, near-left.
///
/// "Far" and "near" are relative to the camera: the far edge is the short
/// side at the back of the field of play, the near edge the side closest
/// to the camera. The far and near edges are the two long edges used for
/// band interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub far_left: Point,
    pub far_right: Point,
    pub near_right: Point,
    pub near_left: Point,
}

impl Quad {
    pub fn new(far_left: Point, far_right: Point, near_right: Point, near_left: Point) -> Self {
        Self {
            far_left,
            far_right,
            near_right,
            near_left,
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [self.far_left, self.far_right, self.near_right, self.near_left]
    }

    pub fn far_edge_len(&self) -> f32 {
        self.far_left.distance_to(&self.far_right)
    }

    pub fn near_edge_len(&self) -> f32 {
        self.near_left.distance_to(&self.near_right)
    }

    /// Interpolate the far and near edges at parameter `t`, returning the
    /// (far point, near point) pair.
    pub fn interpolate_edges(&self, t: f32) -> (Point, Point) {
        (
            self.far_left.lerp(&self.far_right, t),
            self.near_left.lerp(&self.near_right, t),
        )
    }

    /// The sub-quadrilateral between parameters `t0` and `t1` along the
    /// far and near edges.
    pub fn sub_band(&self, t0: f32, t1: f32) -> Quad {
        let (far_a, near_a) = self.interpolate_edges(t0);
        let (far_b, near_b) = self.interpolate_edges(t1);
        Quad::new(far_a, far_b, near_b, near_a)
    }

    /// Axis-aligned bounding box of the corners, rounded outward.
    pub fn aabb(&self) -> Region {
        Region::around(&self.corners())
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Quad {
        let t = |p: Point| Point::new(p.x + dx, p.y + dy);
        Quad::new(
            t(self.far_left),
            t(self.far_right),
            t(self.near_right),
            t(self.near_left),
        )
    }
}

/// An axis-aligned integer rectangle. Valid only when `x2 > x1` and
/// `y2 > y1` after clamping to image bounds; invalid regions are skipped
/// by the detector rather than crashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Region {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// The full image as a region.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// Smallest region containing all of the given points, rounded
    /// outward.
    pub fn around(points: &[Point]) -> Self {
        let x1 = points.iter().map(|p| p.x).fold(f32::MAX, f32::min);
        let y1 = points.iter().map(|p| p.y).fold(f32::MAX, f32::min);
        let x2 = points.iter().map(|p| p.x).fold(f32::MIN, f32::max);
        let y2 = points.iter().map(|p| p.y).fold(f32::MIN, f32::max);
        Self::new(
            x1.floor() as i32,
            y1.floor() as i32,
            x2.ceil() as i32,
            y2.ceil() as i32,
        )
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    /// Grow the region by `margin` pixels on each side.
    pub fn expand(&self, margin: i32) -> Region {
        Region::new(
            self.x1 - margin,
            self.y1 - margin,
            self.x2 + margin,
            self.y2 + margin,
        )
    }

    /// Clamp to an image of the given dimensions.
    pub fn clamp(&self, width: u32, height: u32) -> Region {
        Region::new(
            self.x1.clamp(0, width as i32),
            self.y1.clamp(0, height as i32),
            self.x2.clamp(0, width as i32),
            self.y2.clamp(0, height as i32),
        )
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Region {
        Region::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

/// Compute the axis-aligned bounding box of the perspective band at
/// parameter `t` across the quadrilateral.
///
/// The band is a trapezoid around the segment connecting the far-edge and
/// near-edge interpolation points: `width` pixels wide at the near point
/// and `width × far_len/near_len` at the far point (ratio 1.0 when the
/// near edge has zero length), expanded by `margin` on each side.
///
/// Returns `None` when the far→near segment is degenerate (zero length);
/// callers fall back to the field-of-play region.
pub fn band_aabb(quad: &Quad, t: f32, width: f32, margin: f32) -> Option<Region> {
    let near_len = quad.near_edge_len();
    let ratio = if near_len == 0.0 {
        1.0
    } else {
        quad.far_edge_len() / near_len
    };

    let (far_pt, near_pt) = quad.interpolate_edges(t);
    let dx = near_pt.x - far_pt.x;
    let dy = near_pt.y - far_pt.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return None;
    }

    // Unit perpendicular to the far->near segment.
    let px = -dy / len;
    let py = dx / len;

    let far_half = width * ratio / 2.0;
    let near_half = width / 2.0;

    let corners = [
        Point::new(far_pt.x + px * far_half, far_pt.y + py * far_half),
        Point::new(far_pt.x - px * far_half, far_pt.y - py * far_half),
        Point::new(near_pt.x - px * near_half, near_pt.y - py * near_half),
        Point::new(near_pt.x + px * near_half, near_pt.y + py * near_half),
    ];

    Some(Region::around(&corners).expand(margin.round() as i32))
}

/// Parameter ranges for `num_bands` equal segments of [0, 1], each
/// expanded by `overlap / 2` on both ends and clamped to [0, 1].
pub fn band_ranges(num_bands: usize, overlap: f32) -> Vec<(f32, f32)> {
    let n = num_bands as f32;
    (0..num_bands)
        .map(|i| {
            let t0 = (i as f32 / n - overlap / 2.0).max(0.0);
            let t1 = ((i as f32 + 1.0) / n + overlap / 2.0).min(1.0);
            (t0, t1)
        })
        .collect()
}

/// Divide the quadrilateral into `num_bands` overlapping bands via far/near
/// edge interpolation.
pub fn grid_bands(quad: &Quad, num_bands: usize, overlap: f32) -> Vec<Quad> {
    band_ranges(num_bands, overlap)
        .into_iter()
        .map(|(t0, t1)| quad.sub_band(t0, t1))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn field_quad() -> Quad {
        // Trapezoid narrowing toward the far edge, like a field seen from
        // behind one end.
        Quad::new(
            Point::new(200.0, 100.0),
            Point::new(600.0, 100.0),
            Point::new(700.0, 500.0),
            Point::new(100.0, 500.0),
        )
    }

    fn contains(region: &Region, p: &Point) -> bool {
        p.x >= region.x1 as f32
            && p.x <= region.x2 as f32
            && p.y >= region.y1 as f32
            && p.y <= region.y2 as f32
    }

    #[test]
    fn test_band_aabb_at_extremes_contains_edge_corners() {
        let quad = field_quad();
        let margin = 10.0;

        // t=0: the band runs from the far-left to the near-left corner.
        let at_start = band_aabb(&quad, 0.0, 40.0, margin).unwrap();
        assert!(contains(&at_start, &quad.far_left));
        assert!(contains(&at_start, &quad.near_left));

        // t=1: far-right to near-right.
        let at_end = band_aabb(&quad, 1.0, 40.0, margin).unwrap();
        assert!(contains(&at_end, &quad.far_right));
        assert!(contains(&at_end, &quad.near_right));
    }

    #[test]
    fn test_band_aabb_degenerate_segment() {
        // Far and near edges coincide, so every interpolated segment has
        // zero length.
        let p1 = Point::new(100.0, 100.0);
        let p2 = Point::new(500.0, 100.0);
        let quad = Quad::new(p1, p2, p2, p1);
        assert!(band_aabb(&quad, 0.5, 40.0, 10.0).is_none());
    }

    #[test]
    fn test_band_aabb_zero_near_edge_uses_unit_ratio() {
        // Near edge collapsed to a point; width ratio falls back to 1.0.
        let near = Point::new(400.0, 500.0);
        let quad = Quad::new(
            Point::new(200.0, 100.0),
            Point::new(600.0, 100.0),
            near,
            near,
        );
        let region = band_aabb(&quad, 0.5, 40.0, 0.0).unwrap();
        assert!(region.is_valid());
    }

    #[test]
    fn test_band_ranges_expansion_and_clamping() {
        let ranges = band_ranges(10, 0.2);
        assert_eq!(ranges.len(), 10);

        // Band 0 clamps its lower bound to 0.
        assert_eq!(ranges[0].0, 0.0);
        assert!((ranges[0].1 - 0.2).abs() < 1e-6);

        // An interior band spans [i/10 - 0.1, (i+1)/10 + 0.1].
        assert!((ranges[4].0 - 0.3).abs() < 1e-6);
        assert!((ranges[4].1 - 0.6).abs() < 1e-6);

        // Band 9 clamps its upper bound to 1.
        assert!((ranges[9].0 - 0.8).abs() < 1e-6);
        assert_eq!(ranges[9].1, 1.0);
    }

    #[test]
    fn test_grid_bands_cover_quad() {
        let quad = field_quad();
        let bands = grid_bands(&quad, 4, 0.2);
        assert_eq!(bands.len(), 4);

        // The first band starts on the left edge corners, the last ends on
        // the right edge corners.
        assert_eq!(bands[0].far_left, quad.far_left);
        assert_eq!(bands[0].near_left, quad.near_left);
        assert_eq!(bands[3].far_right, quad.far_right);
        assert_eq!(bands[3].near_right, quad.near_right);
    }

    #[test]
    fn test_region_clamp_and_validity() {
        let region = Region::new(-20, -10, 50, 40).clamp(30, 30);
        assert_eq!(region, Region::new(0, 0, 30, 30));
        assert!(region.is_valid());

        // Fully outside the image clamps to an empty, invalid region.
        let outside = Region::new(100, 100, 200, 200).clamp(30, 30);
        assert!(!outside.is_valid());
    }

    #[test]
    fn test_quad_aabb_rounds_outward() {
        let quad = Quad::new(
            Point::new(10.4, 10.6),
            Point::new(20.5, 10.2),
            Point::new(20.9, 30.1),
            Point::new(10.1, 30.8),
        );
        let aabb = quad.aabb();
        assert_eq!(aabb, Region::new(10, 10, 21, 31));
    }
}
