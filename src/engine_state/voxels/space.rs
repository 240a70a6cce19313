//! # Voxel Space
//!
//! The top of the voxel world: the map of loaded regions, glued to the
//! grid planner and the streaming loader. The space reacts to viewer
//! movement by queueing loads for regions entering range and destroying
//! regions that left it, feeds the loader one key at a time, and renders
//! whatever is resident each frame.

use std::collections::HashMap;

use cgmath::Point3;
use log::{debug, error, warn};

use crate::engine_state::rendering::{Gpu, RenderResources};
use crate::engine_state::voxels::grid::{RegionGrid, RegionKey};
use crate::engine_state::voxels::region::Region;
use crate::engine_state::voxels::streaming::{LoadSchedule, RegionLoader};
use crate::geometry::{Frustum, Ray};
use crate::terrain::TerrainProvider;

/// Per-frame counters exposed instead of writing status text anywhere.
/// Callers query these and present them however they like.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpaceStats {
    /// Regions that actually drew something this frame.
    pub rendered: usize,
    /// Regions currently resident.
    pub loaded: usize,
    /// Keys waiting in the load queue.
    pub queued: usize,
    /// Whether a region load is currently running.
    pub load_in_flight: bool,
}

/// Updates the schedule for a viewer position and reports which loaded
/// regions are now out of range.
///
/// Target keys missing from `loaded` are appended to the queue in scan
/// order, skipping anything already pending. Queued keys beyond the unload
/// distance are pruned; the in-flight load, if any, is left to finish and
/// filtered on arrival. Pure planning, shared by the engine and the tests.
fn replan<V>(
    grid: &RegionGrid,
    schedule: &mut LoadSchedule,
    position: Point3<f32>,
    loaded: &HashMap<RegionKey, V>,
) -> Vec<RegionKey> {
    for key in grid.target_keys(position) {
        if !loaded.contains_key(&key) {
            schedule.enqueue(key);
        }
    }

    schedule.prune(|key| !grid.should_unload(position, *key));

    loaded
        .keys()
        .filter(|key| grid.should_unload(position, **key))
        .copied()
        .collect()
}

/// The streamed voxel world around a moving viewer.
pub struct VoxelSpace {
    grid: RegionGrid,
    position: Option<Point3<f32>>,
    regions: HashMap<RegionKey, Region>,
    schedule: LoadSchedule,
    loader: RegionLoader,
}

impl VoxelSpace {
    /// Creates an empty space streaming from `provider`.
    pub fn new(grid: RegionGrid, provider: Box<dyn TerrainProvider>) -> Self {
        Self {
            grid,
            position: None,
            regions: HashMap::new(),
            schedule: LoadSchedule::new(),
            loader: RegionLoader::spawn(provider),
        }
    }

    /// Moves the viewer and replans loads and unloads.
    ///
    /// A no-op while the position is unchanged, so calling this every tick
    /// costs nothing unless the viewer actually moved.
    pub fn set_position(&mut self, position: Point3<f32>) {
        if self.position == Some(position) {
            return;
        }
        self.position = Some(position);

        let to_unload = replan(&self.grid, &mut self.schedule, position, &self.regions);
        for key in to_unload {
            if let Some(region) = self.regions.remove(&key) {
                debug!(
                    "unloading region ({},{},{})",
                    key.center.x, key.center.y, key.center.z
                );
                region.destroy();
            }
        }
    }

    /// Advances the streaming pipeline by one tick.
    ///
    /// Drains any finished load first, then dispatches the next queued key
    /// if the in-flight slot is free. An outcome whose key has since left
    /// the unload range, or was somehow loaded in the meantime, is
    /// discarded instead of inserted. A failed fetch is logged and its key
    /// dropped; the next boundary crossing replans it, so one bad response
    /// cannot starve the queue.
    pub fn pump(&mut self, gpu: &Gpu, resources: &RenderResources) {
        while let Some(outcome) = self.loader.try_take_outcome() {
            self.schedule.complete(outcome.key);
            let key = outcome.key;

            match outcome.result {
                Ok(data) => {
                    let stale = self.regions.contains_key(&key)
                        || self
                            .position
                            .is_some_and(|position| self.grid.should_unload(position, key));
                    if stale {
                        debug!(
                            "discarding stale load for region ({},{},{})",
                            key.center.x, key.center.y, key.center.z
                        );
                        continue;
                    }
                    self.regions.insert(key, Region::new(gpu, resources, data));
                }
                Err(err) => {
                    warn!(
                        "region ({},{},{}) failed to load: {err}",
                        key.center.x, key.center.y, key.center.z
                    );
                }
            }
        }

        if let Some(key) = self.schedule.start_next() {
            if !self.loader.request(key) {
                error!("region loader worker is gone; cannot load further regions");
                self.schedule.complete(key);
            }
        }
    }

    /// Drives pending instance uploads for every loaded region.
    pub fn maintain(&mut self, gpu: &Gpu) {
        for region in self.regions.values_mut() {
            region.maintain(gpu);
        }
    }

    /// Renders every loaded region that survives the frustum test.
    ///
    /// The shared pipeline and camera bind group must already be set on
    /// the pass.
    pub fn render<'a, 'b>(
        &'a self,
        render_pass: &mut wgpu::RenderPass<'b>,
        frustum: &Frustum,
        resources: &'a RenderResources,
    ) -> SpaceStats
    where
        'a: 'b,
    {
        let mut rendered = 0;
        for region in self.regions.values() {
            if region.render(render_pass, frustum, resources) {
                rendered += 1;
            }
        }

        SpaceStats {
            rendered,
            loaded: self.regions.len(),
            queued: self.schedule.queued_len(),
            load_in_flight: self.schedule.in_flight().is_some(),
        }
    }

    /// Nearest voxel hit by `ray` across all loaded regions.
    pub fn pick(&self, ray: &Ray) -> Option<(Point3<i32>, f32)> {
        self.regions
            .values()
            .filter_map(|region| region.pick(ray))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Number of resident regions.
    pub fn loaded_count(&self) -> usize {
        self.regions.len()
    }

    /// Number of keys waiting to load.
    pub fn queued_count(&self) -> usize {
        self.schedule.queued_len()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    fn grid() -> RegionGrid {
        RegionGrid::new(
            32,
            Vector3::new(64.0, 32.0, 64.0),
            Vector3::new(96.0, 64.0, 96.0),
        )
    }

    /// Drives `replan` plus a simulated loader: every started key
    /// completes immediately and becomes loaded.
    struct Harness {
        grid: RegionGrid,
        schedule: LoadSchedule,
        loaded: HashMap<RegionKey, ()>,
        load_log: Vec<RegionKey>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                grid: grid(),
                schedule: LoadSchedule::new(),
                loaded: HashMap::new(),
                load_log: Vec::new(),
            }
        }

        fn move_to(&mut self, position: Point3<f32>) {
            let unload = replan(&self.grid, &mut self.schedule, position, &self.loaded);
            for key in unload {
                self.loaded.remove(&key);
            }
        }

        fn drain_loads(&mut self) {
            while let Some(key) = self.schedule.start_next() {
                self.schedule.complete(key);
                self.loaded.insert(key, ());
                self.load_log.push(key);
            }
        }

        fn assert_invariants(&self) {
            // The queue never holds a loaded key and never holds dupes.
            let mut seen = Vec::new();
            for key in self.schedule.queued_keys() {
                assert!(!self.loaded.contains_key(key), "{key:?} queued while loaded");
                assert!(!seen.contains(key), "{key:?} queued twice");
                seen.push(*key);
            }
        }
    }

    #[test]
    fn oscillating_inside_the_hysteresis_band_never_reloads() {
        let mut harness = Harness::new();
        let key = RegionKey {
            center: Point3::new(16, 16, 16),
        };

        // Close enough to load.
        let near = Point3::new(40.0, 16.0, 16.0);
        // Outside load distance but inside unload distance.
        let band = Point3::new(90.0, 16.0, 16.0);

        harness.move_to(near);
        harness.drain_loads();
        assert!(harness.loaded.contains_key(&key));

        for _ in 0..50 {
            harness.move_to(band);
            harness.drain_loads();
            assert!(harness.loaded.contains_key(&key), "region was unloaded");

            harness.move_to(near);
            harness.drain_loads();
            harness.assert_invariants();
        }

        // The region at the oscillation boundary loaded exactly once
        // across every position update.
        let loads_of_key = harness.load_log.iter().filter(|k| **k == key).count();
        assert_eq!(loads_of_key, 1);
    }

    #[test]
    fn regions_unload_beyond_the_unload_distance() {
        let mut harness = Harness::new();
        let key = RegionKey {
            center: Point3::new(16, 16, 16),
        };

        harness.move_to(Point3::new(16.0, 16.0, 16.0));
        harness.drain_loads();
        assert!(harness.loaded.contains_key(&key));

        harness.move_to(Point3::new(300.0, 16.0, 16.0));
        assert!(!harness.loaded.contains_key(&key));
        harness.assert_invariants();
    }

    #[test]
    fn queue_never_contains_loaded_or_duplicate_keys() {
        let mut harness = Harness::new();

        // Replan repeatedly without completing loads in between.
        for x in [16.0, 20.0, 45.0, 16.0, 90.0, 16.0] {
            harness.move_to(Point3::new(x, 16.0, 16.0));
            harness.assert_invariants();
        }

        harness.drain_loads();
        harness.move_to(Point3::new(17.0, 16.0, 16.0));
        harness.assert_invariants();
    }

    #[test]
    fn faraway_queued_keys_are_pruned_on_replan() {
        let mut harness = Harness::new();

        harness.move_to(Point3::new(16.0, 16.0, 16.0));
        assert!(harness.schedule.queued_len() > 0);

        // Teleport far away before anything loaded; the old neighborhood
        // must leave the queue.
        harness.move_to(Point3::new(2000.0, 16.0, 16.0));
        for key in harness.schedule.queued_keys() {
            assert!((2000.0 - key.center.x as f32).abs() <= 96.0);
        }
    }
}
