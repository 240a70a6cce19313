//! # Ray
//!
//! A world-space ray used for voxel picking. Intersection against an
//! [`Aabb`] uses the slab method.

use cgmath::{InnerSpace, Point3, Vector3};

use super::aabb::Aabb;

/// A half-infinite line with an origin and a unit direction.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// Starting point of the ray.
    pub origin: Point3<f32>,
    /// Unit-length direction.
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Creates a ray; `direction` is normalized on construction.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// The point `t` units along the ray.
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Distance along the ray at which it enters `aabb`, if it hits at all.
    ///
    /// Returns the entry distance for hits in front of the origin, the exit
    /// distance when the origin is inside the box, and `None` for misses.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut tmin = (aabb.min.x - self.origin.x) / self.direction.x;
        let mut tmax = (aabb.max.x - self.origin.x) / self.direction.x;
        if tmin > tmax {
            std::mem::swap(&mut tmin, &mut tmax);
        }

        let mut tymin = (aabb.min.y - self.origin.y) / self.direction.y;
        let mut tymax = (aabb.max.y - self.origin.y) / self.direction.y;
        if tymin > tymax {
            std::mem::swap(&mut tymin, &mut tymax);
        }

        if tmin > tymax || tymin > tmax {
            return None;
        }
        tmin = tmin.max(tymin);
        tmax = tmax.min(tymax);

        let mut tzmin = (aabb.min.z - self.origin.z) / self.direction.z;
        let mut tzmax = (aabb.max.z - self.origin.z) / self.direction.z;
        if tzmin > tzmax {
            std::mem::swap(&mut tzmin, &mut tzmax);
        }

        if tmin > tzmax || tzmin > tmax {
            return None;
        }
        tmin = tmin.max(tzmin);
        tmax = tmax.min(tzmax);

        if tmax < 0.0 {
            return None;
        }
        Some(if tmin > 0.0 { tmin } else { tmax })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_box_straight_on() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let aabb = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));

        let t = ray.intersect_aabb(&aabb).expect("should hit");
        assert!((t - 4.0).abs() < 1e-6);
        assert!((ray.at(t).z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ray_pointing_away_misses() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 1.0));
        let aabb = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));

        assert!(ray.intersect_aabb(&aabb).is_none());
    }

    #[test]
    fn offset_ray_misses_narrow_box() {
        let ray = Ray::new(Point3::new(5.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let aabb = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));

        assert!(ray.intersect_aabb(&aabb).is_none());
    }

    #[test]
    fn origin_inside_box_returns_exit_distance() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let aabb = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));

        let t = ray.intersect_aabb(&aabb).expect("should hit");
        assert!((t - 1.0).abs() < 1e-6);
    }
}
