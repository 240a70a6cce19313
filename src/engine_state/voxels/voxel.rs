//! # Voxel Module
//!
//! The single-voxel data model: a world position plus a material type.
//! Voxels are immutable once created and owned by exactly one region.

use cgmath::{Point3, Vector3};
use num_derive::FromPrimitive;

use crate::geometry::{Aabb, Ray};

/// Material of a voxel, matching the wire codes of the terrain endpoint.
///
/// `Air` exists only on the wire; it is skipped during region loading and
/// never stored. `FromPrimitive` (via [`VoxelType::from_code`]) converts the
/// raw codes coming from a terrain provider.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(i8)]
pub enum VoxelType {
    /// Empty space. Never materialized as a voxel.
    Air = -1,
    /// Plain dirt.
    Dirt = 0,
    /// Grass surface voxel.
    Grass = 1,
    /// Stone below the dirt layer.
    Stone = 2,
    /// Shoreline sand.
    Sand = 3,
    /// Water. Renderable but see-through, so it never occludes neighbors.
    Water = 4,
}

/// The renderable material types, in wire-code order. One instance group
/// exists per entry.
pub const RENDERABLE_TYPES: [VoxelType; 5] = [
    VoxelType::Dirt,
    VoxelType::Grass,
    VoxelType::Stone,
    VoxelType::Sand,
    VoxelType::Water,
];

/// Number of renderable material types.
pub const MATERIAL_COUNT: usize = RENDERABLE_TYPES.len();

impl VoxelType {
    /// Converts a terrain wire code into a voxel type.
    ///
    /// Returns `None` for codes outside the known range, which callers
    /// treat the same as air.
    pub fn from_code(code: i8) -> Option<Self> {
        num::FromPrimitive::from_i8(code)
    }

    /// Whether light passes through this material. Transparent neighbors
    /// never occlude a voxel.
    pub fn is_transparent(self) -> bool {
        matches!(self, VoxelType::Air | VoxelType::Water)
    }

    /// Index of this material's instance group, or `None` for air.
    pub fn material_index(self) -> Option<usize> {
        match self {
            VoxelType::Air => None,
            other => Some(other as i8 as usize),
        }
    }
}

/// A unit cube at an integer world position with a single material.
#[derive(Clone, Copy, Debug)]
pub struct Voxel {
    /// World position of the voxel center.
    pub position: Point3<i32>,
    /// Material of the voxel.
    pub voxel_type: VoxelType,
}

impl Voxel {
    /// Creates a voxel at `position` with the given material.
    pub fn new(position: Point3<i32>, voxel_type: VoxelType) -> Self {
        Self {
            position,
            voxel_type,
        }
    }

    /// The unit-cube bounds of this voxel, centred on its position.
    pub fn bounds(&self) -> Aabb {
        let center = Point3::new(
            self.position.x as f32,
            self.position.y as f32,
            self.position.z as f32,
        );
        Aabb::new(
            center + Vector3::new(-0.5, -0.5, -0.5),
            center + Vector3::new(0.5, 0.5, 0.5),
        )
    }

    /// Distance along `ray` at which it enters this voxel, if it does.
    pub fn intersects_ray(&self, ray: &Ray) -> Option<f32> {
        ray.intersect_aabb(&self.bounds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_round_trip() {
        assert_eq!(VoxelType::from_code(-1), Some(VoxelType::Air));
        assert_eq!(VoxelType::from_code(0), Some(VoxelType::Dirt));
        assert_eq!(VoxelType::from_code(1), Some(VoxelType::Grass));
        assert_eq!(VoxelType::from_code(2), Some(VoxelType::Stone));
        assert_eq!(VoxelType::from_code(3), Some(VoxelType::Sand));
        assert_eq!(VoxelType::from_code(4), Some(VoxelType::Water));
        assert_eq!(VoxelType::from_code(5), None);
        assert_eq!(VoxelType::from_code(-2), None);
    }

    #[test]
    fn only_air_and_water_are_transparent() {
        for voxel_type in RENDERABLE_TYPES {
            assert_eq!(
                voxel_type.is_transparent(),
                voxel_type == VoxelType::Water,
                "{voxel_type:?}"
            );
        }
        assert!(VoxelType::Air.is_transparent());
    }

    #[test]
    fn material_indices_follow_wire_order() {
        assert_eq!(VoxelType::Air.material_index(), None);
        for (expected, voxel_type) in RENDERABLE_TYPES.iter().enumerate() {
            assert_eq!(voxel_type.material_index(), Some(expected));
        }
    }

    #[test]
    fn voxel_ray_pick_hits_the_unit_cube() {
        let voxel = Voxel::new(Point3::new(0, 0, -5), VoxelType::Stone);
        let ray = Ray::new(
            Point3::new(0.0, 0.0, 0.0),
            cgmath::Vector3::new(0.0, 0.0, -1.0),
        );

        let t = voxel.intersects_ray(&ray).expect("should hit");
        assert!((t - 4.5).abs() < 1e-6);
    }
}
