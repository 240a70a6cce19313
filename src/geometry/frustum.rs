//! # View Frustum
//!
//! The six clip planes of the current camera, extracted algebraically from
//! the combined projection-view matrix once per frame. Regions whose
//! bounding box fails the test are skipped wholesale, which is the main
//! payoff of keeping a per-region [`Aabb`].
//!
//! The test is a separating-plane approximation. It can report a box as
//! visible when it merely straddles two plane extensions outside the actual
//! frustum volume (that only wastes a draw call), but a box fully inside is
//! never rejected.

use cgmath::Matrix4;

use super::aabb::Aabb;
use super::plane::Plane;

/// The six inward-facing planes of a camera frustum.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    /// Plane facing right, clipping geometry left of the view volume.
    pub left: Plane,
    /// Plane facing left, clipping geometry right of the view volume.
    pub right: Plane,
    /// Plane facing up, clipping geometry below the view volume.
    pub bottom: Plane,
    /// Plane facing down, clipping geometry above the view volume.
    pub top: Plane,
    /// Plane just in front of the camera.
    pub near: Plane,
    /// Plane at the far clip distance.
    pub far: Plane,
}

impl Frustum {
    /// Extracts the frustum planes from a combined projection-view matrix.
    ///
    /// Uses the standard row combination construction: each plane is the
    /// sum or difference of the matrix's fourth row with one of the other
    /// rows. All planes are normalized so the box test operates on real
    /// world-space distances.
    ///
    /// # Arguments
    /// * `view_projection` - `projection * view` for the current frame
    pub fn from_view_projection(view_projection: &Matrix4<f32>) -> Self {
        // cgmath matrices are column major: `m.x` is the first column and
        // `m.x.w` is that column's fourth-row element.
        let m = view_projection;

        let mut left = Plane::new(
            m.x.w + m.x.x,
            m.y.w + m.y.x,
            m.z.w + m.z.x,
            m.w.w + m.w.x,
        );
        let mut right = Plane::new(
            m.x.w - m.x.x,
            m.y.w - m.y.x,
            m.z.w - m.z.x,
            m.w.w - m.w.x,
        );
        let mut bottom = Plane::new(
            m.x.w + m.x.y,
            m.y.w + m.y.y,
            m.z.w + m.z.y,
            m.w.w + m.w.y,
        );
        let mut top = Plane::new(
            m.x.w - m.x.y,
            m.y.w - m.y.y,
            m.z.w - m.z.y,
            m.w.w - m.w.y,
        );
        let mut near = Plane::new(
            m.x.w + m.x.z,
            m.y.w + m.y.z,
            m.z.w + m.z.z,
            m.w.w + m.w.z,
        );
        let mut far = Plane::new(
            m.x.w - m.x.z,
            m.y.w - m.y.z,
            m.z.w - m.z.z,
            m.w.w - m.w.z,
        );

        left.normalize();
        right.normalize();
        bottom.normalize();
        top.normalize();
        near.normalize();
        far.normalize();

        Self {
            left,
            right,
            bottom,
            top,
            near,
            far,
        }
    }

    /// The planes as an array, in no particular order.
    pub fn planes(&self) -> [&Plane; 6] {
        [
            &self.left,
            &self.right,
            &self.bottom,
            &self.top,
            &self.near,
            &self.far,
        ]
    }

    /// Whether `aabb` is at least partially inside the frustum.
    ///
    /// Rejects the box as soon as one plane has all eight corners on its
    /// outer side.
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        self.planes().iter().all(|plane| plane.aabb_inside(aabb))
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Point3, SquareMatrix};

    use super::*;

    fn test_frustum() -> Frustum {
        let projection = cgmath::perspective(Deg(45.0), 1.0, 0.1, 100.0);
        let view = Matrix4::identity();
        Frustum::from_view_projection(&(projection * view))
    }

    #[test]
    fn planes_are_normalized() {
        let frustum = test_frustum();
        for plane in frustum.planes() {
            assert!((plane.normal_magnitude() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn box_around_origin_is_inside() {
        let frustum = test_frustum();
        let aabb = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));

        assert!(frustum.contains_aabb(&aabb));
    }

    #[test]
    fn box_beyond_far_plane_is_rejected() {
        let frustum = test_frustum();
        let aabb = Aabb::new(
            Point3::new(-10.0, -10.0, -200.0),
            Point3::new(-5.0, -5.0, -150.0),
        );

        assert!(!frustum.contains_aabb(&aabb));
    }

    #[test]
    fn box_fully_inside_is_never_rejected() {
        let frustum = test_frustum();

        // Sample boxes along the view axis, all well within the volume.
        for z in [-2.0_f32, -10.0, -50.0, -90.0] {
            let half = 0.1 * z.abs().min(10.0) / 10.0;
            let aabb = Aabb::new(
                Point3::new(-half, -half, z - half),
                Point3::new(half, half, z + half),
            );
            assert!(frustum.contains_aabb(&aabb), "box at z={} was culled", z);
        }
    }

    #[test]
    fn empty_box_is_trivially_inside() {
        let frustum = test_frustum();
        assert!(frustum.contains_aabb(&Aabb::empty()));
    }
}
