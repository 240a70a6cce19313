//! # Region Module
//!
//! A region is the unit of streaming, culling and destruction: a cubic
//! volume of voxels fetched from a terrain provider, grouped per material
//! into GPU instance sets and drawn with one indirect instanced draw per
//! material.
//!
//! Construction happens in two phases. [`RegionData`] is the CPU half,
//! built on the streaming worker: the voxel map, the incrementally grown
//! bounds and the occlusion-filtered visible position lists. [`Region`] is
//! the GPU half, built on the main thread from a finished `RegionData`,
//! and is the only phase that owns device resources. Nothing can observe a
//! region before its buffers exist.

use std::collections::HashMap;

use cgmath::Point3;
use log::debug;

use crate::engine_state::rendering::{
    Gpu, IndirectBufferManager, InstanceBufferManager, RenderResources,
};
use crate::engine_state::voxels::grid::RegionKey;
use crate::engine_state::voxels::voxel::{Voxel, VoxelType, MATERIAL_COUNT, RENDERABLE_TYPES};
use crate::geometry::{Aabb, Frustum, Ray};
use crate::terrain::{validate_payload, TerrainError, REGION_DIMENSION, REGION_HALF};

/// Offsets to the six face-adjacent neighbor cells.
const NEIGHBOR_OFFSETS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// The CPU phase of a region: voxels, bounds and per-material visible
/// position lists, ready for upload. Built off the render thread.
pub struct RegionData {
    /// Grid cell this data belongs to.
    pub key: RegionKey,
    /// Every materialized voxel, keyed by world position.
    pub voxels: HashMap<Point3<i32>, Voxel>,
    /// Bounds grown over every voxel position as it was inserted.
    pub bounds: Aabb,
    /// Occlusion-filtered instance positions, one list per material.
    pub visible: [Vec<[f32; 3]>; MATERIAL_COUNT],
}

impl RegionData {
    /// Builds region data from one terrain payload.
    ///
    /// The payload holds one code per cell, x outermost and z innermost.
    /// Cell `(x, y, z)` lands at world `key.center + (x, y, z) - half`, so
    /// the region spans `[center - half, center + half)`. Air and unknown
    /// codes are skipped. Occlusion is computed once after the whole
    /// volume is inserted; it cannot be done per insert because a voxel's
    /// neighbors are not complete until the load finishes.
    pub fn from_codes(key: RegionKey, codes: &[i8]) -> Result<Self, TerrainError> {
        validate_payload(codes)?;

        let mut voxels = HashMap::new();
        let mut bounds = Aabb::empty();

        let mut index = 0;
        for x in 0..REGION_DIMENSION {
            for y in 0..REGION_DIMENSION {
                for z in 0..REGION_DIMENSION {
                    let code = codes[index];
                    index += 1;

                    let voxel_type = match VoxelType::from_code(code) {
                        None | Some(VoxelType::Air) => continue,
                        Some(voxel_type) => voxel_type,
                    };

                    let position = Point3::new(
                        key.center.x + x - REGION_HALF,
                        key.center.y + y - REGION_HALF,
                        key.center.z + z - REGION_HALF,
                    );
                    bounds.expand_to_point(Point3::new(
                        position.x as f32,
                        position.y as f32,
                        position.z as f32,
                    ));
                    voxels.insert(position, Voxel::new(position, voxel_type));
                }
            }
        }

        let visible = Self::visible_by_material(&voxels);

        Ok(Self {
            key,
            voxels,
            bounds,
            visible,
        })
    }

    /// Whether the voxel at `position` can contribute no visible face.
    ///
    /// True only when all six face neighbors exist and none of them is
    /// transparent. A missing neighbor counts as exposure: air is never
    /// stored, so absence means the face borders empty space (or the
    /// region boundary, where we conservatively keep the voxel).
    fn is_occluded(voxels: &HashMap<Point3<i32>, Voxel>, position: Point3<i32>) -> bool {
        NEIGHBOR_OFFSETS.iter().all(|(dx, dy, dz)| {
            let neighbor = Point3::new(position.x + dx, position.y + dy, position.z + dz);
            voxels
                .get(&neighbor)
                .is_some_and(|voxel| !voxel.voxel_type.is_transparent())
        })
    }

    /// Groups the non-occluded voxel positions by material.
    fn visible_by_material(
        voxels: &HashMap<Point3<i32>, Voxel>,
    ) -> [Vec<[f32; 3]>; MATERIAL_COUNT] {
        let mut visible: [Vec<[f32; 3]>; MATERIAL_COUNT] = Default::default();

        for voxel in voxels.values() {
            if Self::is_occluded(voxels, voxel.position) {
                continue;
            }
            let Some(material_index) = voxel.voxel_type.material_index() else {
                continue;
            };
            visible[material_index].push([
                voxel.position.x as f32,
                voxel.position.y as f32,
                voxel.position.z as f32,
            ]);
        }

        visible
    }

    /// Total number of visible instances across all materials.
    pub fn visible_instance_count(&self) -> usize {
        self.visible.iter().map(Vec::len).sum()
    }
}

/// One material's GPU-resident draw state inside a region.
struct InstanceGroup {
    voxel_type: VoxelType,
    visible_count: usize,
    instances: InstanceBufferManager,
    indirect: IndirectBufferManager,
}

/// A loaded region holding its voxels and one instance group per material.
pub struct Region {
    key: RegionKey,
    voxels: HashMap<Point3<i32>, Voxel>,
    bounds: Aabb,
    groups: Vec<InstanceGroup>,
}

impl Region {
    /// Completes a region by creating its GPU state and uploading every
    /// material's visible positions.
    pub fn new(gpu: &Gpu, resources: &RenderResources, data: RegionData) -> Self {
        let RegionData {
            key,
            voxels,
            bounds,
            visible,
        } = data;

        let mut groups = Vec::with_capacity(MATERIAL_COUNT);
        for (material_index, positions) in visible.into_iter().enumerate() {
            let voxel_type = RENDERABLE_TYPES[material_index];
            let label = format!(
                "region ({},{},{}) {:?}",
                key.center.x, key.center.y, key.center.z, voxel_type
            );

            let mut instances = InstanceBufferManager::new(gpu, positions.len(), &label);
            let indirect = IndirectBufferManager::new(gpu, resources.mesh.index_count, &label);

            let visible_count = positions.len();
            if let Some(count) = instances.set_instances(gpu, positions) {
                indirect.update(&gpu.queue, count);
            }

            groups.push(InstanceGroup {
                voxel_type,
                visible_count,
                instances,
                indirect,
            });
        }

        debug!(
            "region ({},{},{}) loaded: {} voxels, {} visible instances",
            key.center.x,
            key.center.y,
            key.center.z,
            voxels.len(),
            groups.iter().map(|g| g.visible_count).sum::<usize>(),
        );

        Self {
            key,
            voxels,
            bounds,
            groups,
        }
    }

    /// Grid cell of this region.
    pub fn key(&self) -> RegionKey {
        self.key
    }

    /// Bounds containing every voxel this region owns.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Number of voxels this region owns.
    pub fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// Drives any pending instance uploads for this region's groups.
    pub fn maintain(&mut self, gpu: &Gpu) {
        for group in &mut self.groups {
            if let Some(count) = group.instances.maintain(gpu) {
                group.indirect.update(&gpu.queue, count);
            }
        }
    }

    /// Records this region's draws into `render_pass`.
    ///
    /// The shared pipeline and the camera bind group must already be set
    /// on the pass. Returns whether anything was drawn: a region with no
    /// instance groups or with bounds outside `frustum` draws nothing, and
    /// the frustum rejection is the whole point of carrying bounds, since
    /// one box test replaces thousands of per-voxel tests.
    pub fn render<'a, 'b>(
        &'a self,
        render_pass: &mut wgpu::RenderPass<'b>,
        frustum: &Frustum,
        resources: &'a RenderResources,
    ) -> bool
    where
        'a: 'b,
    {
        if self.groups.is_empty() {
            return false;
        }

        if !frustum.contains_aabb(&self.bounds) {
            return false;
        }

        let mut drew = false;
        for group in &self.groups {
            if group.visible_count == 0 {
                continue;
            }
            let Some(material_index) = group.voxel_type.material_index() else {
                continue;
            };

            render_pass.set_bind_group(1, resources.materials[material_index].bind_group(), &[]);
            render_pass.set_vertex_buffer(0, resources.mesh.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, resources.mesh.color_buffer.slice(..));
            render_pass.set_vertex_buffer(2, resources.mesh.texcoord_buffer.slice(..));
            render_pass.set_vertex_buffer(3, group.instances.instance_buffer().slice(..));
            render_pass
                .set_index_buffer(resources.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed_indirect(group.indirect.buffer(), 0);
            drew = true;
        }

        drew
    }

    /// Nearest voxel hit by `ray`, as a position and entry distance.
    ///
    /// The region bounds act as a cheap pre-filter before per-voxel tests.
    pub fn pick(&self, ray: &Ray) -> Option<(Point3<i32>, f32)> {
        ray.intersect_aabb(&self.bounds)?;

        self.voxels
            .values()
            .filter_map(|voxel| voxel.intersects_ray(ray).map(|t| (voxel.position, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Releases the region's GPU buffers. Uploads still in flight are
    /// abandoned rather than flushed.
    pub fn destroy(self) {
        for group in self.groups {
            group.instances.destroy();
            group.indirect.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{CODE_AIR, CODE_GRASS, CODE_STONE, CODE_WATER, REGION_VOLUME};

    fn key_at_origin() -> RegionKey {
        RegionKey {
            center: Point3::new(0, 0, 0),
        }
    }

    /// Flat payload with `cells` set and air everywhere else. Cell
    /// coordinates are local, x outermost and z innermost.
    fn codes_with(cells: &[((i32, i32, i32), i8)]) -> Vec<i8> {
        let mut codes = vec![CODE_AIR; REGION_VOLUME];
        for ((x, y, z), code) in cells {
            let index = (x * REGION_DIMENSION * REGION_DIMENSION + y * REGION_DIMENSION + z)
                as usize;
            codes[index] = *code;
        }
        codes
    }

    #[test]
    fn short_payload_is_rejected() {
        let result = RegionData::from_codes(key_at_origin(), &[0, 1, 2]);
        assert!(result.is_err());
    }

    #[test]
    fn single_grass_voxel_lands_at_world_origin() {
        // Local cell (16, 16, 16) recenters to world (0, 0, 0) for a key
        // centered at the origin.
        let codes = codes_with(&[((16, 16, 16), CODE_GRASS)]);
        let data = RegionData::from_codes(key_at_origin(), &codes).unwrap();

        assert_eq!(data.voxels.len(), 1);
        let voxel = data.voxels.get(&Point3::new(0, 0, 0)).expect("voxel at origin");
        assert_eq!(voxel.voxel_type, VoxelType::Grass);

        let grass_index = VoxelType::Grass.material_index().unwrap();
        for (material_index, positions) in data.visible.iter().enumerate() {
            if material_index == grass_index {
                assert_eq!(positions.as_slice(), &[[0.0, 0.0, 0.0]]);
            } else {
                assert!(positions.is_empty());
            }
        }

        assert_eq!(data.bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(data.bounds.max, Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn bounds_contain_every_voxel() {
        let codes = codes_with(&[
            ((0, 0, 0), CODE_STONE),
            ((31, 31, 31), CODE_STONE),
            ((5, 20, 11), CODE_GRASS),
        ]);
        let data = RegionData::from_codes(key_at_origin(), &codes).unwrap();

        for voxel in data.voxels.values() {
            let p = voxel.position;
            assert!(data
                .bounds
                .contains_point(Point3::new(p.x as f32, p.y as f32, p.z as f32)));
        }
        assert_eq!(data.bounds.min, Point3::new(-16.0, -16.0, -16.0));
        assert_eq!(data.bounds.max, Point3::new(15.0, 15.0, 15.0));
    }

    /// A 3x3x3 stone block centred on local (16, 16, 16).
    fn solid_block() -> Vec<((i32, i32, i32), i8)> {
        let mut cells = Vec::new();
        for x in 15..18 {
            for y in 15..18 {
                for z in 15..18 {
                    cells.push(((x, y, z), CODE_STONE));
                }
            }
        }
        cells
    }

    #[test]
    fn fully_enclosed_voxel_is_culled() {
        let data = RegionData::from_codes(key_at_origin(), &codes_with(&solid_block())).unwrap();

        assert_eq!(data.voxels.len(), 27);
        assert_eq!(data.visible_instance_count(), 26);

        let stone = VoxelType::Stone.material_index().unwrap();
        assert!(!data.visible[stone].contains(&[0.0, 0.0, 0.0]));
    }

    #[test]
    fn removing_any_neighbor_exposes_the_center() {
        for (dx, dy, dz) in NEIGHBOR_OFFSETS {
            let mut cells = solid_block();
            cells.retain(|((x, y, z), _)| (*x, *y, *z) != (16 + dx, 16 + dy, 16 + dz));

            let data = RegionData::from_codes(key_at_origin(), &codes_with(&cells)).unwrap();
            let stone = VoxelType::Stone.material_index().unwrap();
            assert!(
                data.visible[stone].contains(&[0.0, 0.0, 0.0]),
                "center should be exposed with neighbor ({dx},{dy},{dz}) gone"
            );
        }
    }

    #[test]
    fn transparent_neighbor_exposes_the_center() {
        let mut cells = solid_block();
        for cell in &mut cells {
            if cell.0 == (17, 16, 16) {
                cell.1 = CODE_WATER;
            }
        }

        let data = RegionData::from_codes(key_at_origin(), &codes_with(&cells)).unwrap();
        let stone = VoxelType::Stone.material_index().unwrap();
        assert!(data.visible[stone].contains(&[0.0, 0.0, 0.0]));
    }

    #[test]
    fn every_voxel_belongs_to_exactly_one_material_group() {
        let codes = codes_with(&[
            ((1, 2, 3), CODE_GRASS),
            ((4, 5, 6), CODE_STONE),
            ((7, 8, 9), CODE_WATER),
        ]);
        let data = RegionData::from_codes(key_at_origin(), &codes).unwrap();

        // All three voxels are isolated, so all are visible, each in the
        // group matching its material.
        assert_eq!(data.visible_instance_count(), 3);
        for voxel in data.voxels.values() {
            let material_index = voxel.voxel_type.material_index().unwrap();
            let position = [
                voxel.position.x as f32,
                voxel.position.y as f32,
                voxel.position.z as f32,
            ];
            let appearances = data
                .visible
                .iter()
                .filter(|positions| positions.contains(&position))
                .count();
            assert_eq!(appearances, 1);
            assert!(data.visible[material_index].contains(&position));
        }
    }
}
