//! # Axis-Aligned Bounding Box
//!
//! An AABB is kept per region and grown incrementally as voxels are added.
//! The whole region is then tested against the view frustum with a single
//! box test instead of one test per voxel.

use cgmath::Point3;

/// An axis-aligned box described by its componentwise minimum and maximum
/// corners.
///
/// A freshly constructed box is "empty": `min` is `+infinity` on every axis
/// and `max` is `-infinity`, so the first [`Aabb::expand_to_point`] call
/// collapses it to a single point. An empty box behaves conservatively in
/// the frustum test (it is never culled), which is the safe default for a
/// region whose voxels have not arrived yet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Componentwise minimum corner.
    pub min: Point3<f32>,
    /// Componentwise maximum corner.
    pub max: Point3<f32>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Creates an empty box that will collapse to a point on the first
    /// expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Creates a box from explicit corners.
    ///
    /// # Panics
    /// Panics if `min` exceeds `max` on any axis.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "invalid bounds, min must not exceed max"
        );
        Self { min, max }
    }

    /// Whether no point has been folded into this box yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Grows the box just enough to contain `point`.
    pub fn expand_to_point(&mut self, point: Point3<f32>) {
        if self.is_empty() {
            self.min = point;
            self.max = point;
            return;
        }

        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);

        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// The midpoint of the box.
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// The edge lengths of the box.
    pub fn size(&self) -> cgmath::Vector3<f32> {
        cgmath::Vector3::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }

    /// Returns one of the eight corner vertices.
    ///
    /// Bit 0 of `index` selects the x extreme, bit 1 the y extreme and
    /// bit 2 the z extreme, so indices `0..8` enumerate every corner.
    pub fn vertex(&self, index: usize) -> Point3<f32> {
        let x = if index & 1 == 0 { self.min.x } else { self.max.x };
        let y = if index & 2 == 0 { self.min.y } else { self.max.y };
        let z = if index & 4 == 0 { self.min.z } else { self.max.z };
        Point3::new(x, y, z)
    }

    /// Whether `point` lies inside or on the surface of the box.
    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Whether two boxes overlap, sharing at least a face, edge or corner.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_collapses_to_first_point() {
        let mut aabb = Aabb::empty();
        assert!(aabb.is_empty());

        aabb.expand_to_point(Point3::new(3.0, -2.0, 7.0));
        assert_eq!(aabb.min, Point3::new(3.0, -2.0, 7.0));
        assert_eq!(aabb.max, Point3::new(3.0, -2.0, 7.0));
        assert!(!aabb.is_empty());
    }

    #[test]
    fn expansion_keeps_every_folded_point_inside() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(-5.0, 2.0, 1.0),
            Point3::new(4.0, -9.0, 3.5),
            Point3::new(0.5, 0.5, -12.0),
        ];

        let mut aabb = Aabb::empty();
        for point in points {
            aabb.expand_to_point(point);
        }

        for point in points {
            assert!(aabb.contains_point(point), "{:?} escaped the bounds", point);
        }
        assert_eq!(aabb.min, Point3::new(-5.0, -9.0, -12.0));
        assert_eq!(aabb.max, Point3::new(4.0, 2.0, 3.5));
    }

    #[test]
    fn vertex_enumerates_all_corners() {
        let aabb = Aabb::new(Point3::new(-1.0, -2.0, -3.0), Point3::new(1.0, 2.0, 3.0));

        let mut xs = Vec::new();
        for i in 0..8 {
            xs.push(aabb.vertex(i));
        }
        xs.sort_by(|a, b| (a.x, a.y, a.z).partial_cmp(&(b.x, b.y, b.z)).unwrap());
        xs.dedup();
        assert_eq!(xs.len(), 8);
        assert!(xs.iter().all(|v| aabb.contains_point(*v)));
    }

    #[test]
    fn intersection_is_inclusive_of_touching_faces() {
        let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let c = Aabb::new(Point3::new(2.5, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0));

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    #[should_panic]
    fn inverted_bounds_are_rejected() {
        let _ = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 1.0));
    }
}
