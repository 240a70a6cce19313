//! # Plane
//!
//! A single clip plane in the form `a*x + b*y + c*z + d = 0`. Six of these
//! make up a [`Frustum`](crate::geometry::Frustum).

use cgmath::Point3;

use super::aabb::Aabb;

/// Slack applied to the half-space test, in world units.
///
/// Points slightly on the negative side of a plane still count as inside,
/// which prevents popping artifacts for boxes that graze a frustum plane.
/// Tunable; the cost of a larger value is a few extra draws near the screen
/// edges.
pub const INSIDE_TOLERANCE: f32 = -0.5;

/// A plane described by its normal `(a, b, c)` and offset `d`.
///
/// After [`Plane::normalize`] the normal has unit length and, for frustum
/// planes, points towards the inside of the frustum.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plane {
    /// X component of the plane normal.
    pub a: f32,
    /// Y component of the plane normal.
    pub b: f32,
    /// Z component of the plane normal.
    pub c: f32,
    /// Offset of the plane from the origin along the normal.
    pub d: f32,
}

impl Plane {
    /// Creates a plane from raw coefficients.
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// The magnitude of the (possibly unnormalized) plane normal.
    pub fn normal_magnitude(&self) -> f32 {
        (self.a * self.a + self.b * self.b + self.c * self.c).sqrt()
    }

    /// Scales the plane so its normal has unit length, making
    /// [`Plane::signed_distance`] a true world-space distance.
    pub fn normalize(&mut self) {
        let r = 1.0 / self.normal_magnitude();
        self.a *= r;
        self.b *= r;
        self.c *= r;
        self.d *= r;
    }

    /// Signed distance from `point` to the plane. Positive values are on
    /// the side the normal points towards.
    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.a * point.x + self.b * point.y + self.c * point.z + self.d
    }

    /// Whether `point` lies on the inner side of the plane, within
    /// [`INSIDE_TOLERANCE`].
    pub fn point_inside(&self, point: Point3<f32>) -> bool {
        self.signed_distance(point) > INSIDE_TOLERANCE
    }

    /// Whether any corner of `aabb` lies on the inner side of the plane.
    ///
    /// A box only fails this test when all eight vertices are outside, so
    /// the test is conservative for boxes that straddle the plane. An
    /// unexpanded box counts as inside: its infinite corners would turn a
    /// zero plane coefficient into a NaN distance, and a region whose
    /// voxels have not arrived yet must never be culled.
    pub fn aabb_inside(&self, aabb: &Aabb) -> bool {
        if aabb.is_empty() {
            return true;
        }
        (0..8).any(|index| self.point_inside(aabb.vertex(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_normal() {
        let mut plane = Plane::new(0.0, 3.0, 4.0, 10.0);
        plane.normalize();

        assert!((plane.normal_magnitude() - 1.0).abs() < 1e-6);
        assert!((plane.d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn signed_distance_matches_axis_plane() {
        // The plane x = 0 with normal +x.
        let plane = Plane::new(1.0, 0.0, 0.0, 0.0);

        assert_eq!(plane.signed_distance(Point3::new(3.0, 9.0, -4.0)), 3.0);
        assert_eq!(plane.signed_distance(Point3::new(-2.0, 0.0, 0.0)), -2.0);
    }

    #[test]
    fn tolerance_keeps_grazing_points_inside() {
        let plane = Plane::new(1.0, 0.0, 0.0, 0.0);

        assert!(plane.point_inside(Point3::new(-0.4, 0.0, 0.0)));
        assert!(!plane.point_inside(Point3::new(-0.6, 0.0, 0.0)));
    }

    #[test]
    fn aabb_with_one_corner_inside_passes() {
        let plane = Plane::new(1.0, 0.0, 0.0, 0.0);

        let straddling = Aabb::new(Point3::new(-2.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let outside = Aabb::new(Point3::new(-5.0, 0.0, 0.0), Point3::new(-3.0, 1.0, 1.0));

        assert!(plane.aabb_inside(&straddling));
        assert!(!plane.aabb_inside(&outside));
    }

    #[test]
    fn unexpanded_box_is_trivially_inside() {
        // An empty box has +/- infinity corners, so at least one corner
        // lands on the inner side of any plane.
        let plane = Plane::new(0.0, 1.0, 0.0, -100.0);
        assert!(plane.aabb_inside(&Aabb::empty()));
    }
}
