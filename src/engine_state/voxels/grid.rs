//! # Region Grid
//!
//! Pure planning logic for the streaming grid: which region keys should be
//! resident for a given viewer position, and which loaded regions have
//! drifted far enough away to be destroyed. No I/O happens here.
//!
//! Load and unload use two different thresholds. A region is only loaded
//! when it comes within `load_distance`, and only unloaded once it exceeds
//! `unload_distance`, so a region hovering between the two stays resident
//! without being reloaded. That band is what keeps a viewer pacing back and
//! forth across a region boundary from thrashing loads.

use cgmath::{Point3, Vector3};

/// Identifies one region's grid cell by its quantized center.
///
/// The center is `floor(position / side) * side + side / 2` per axis, so
/// every world position maps to exactly one key and keys are usable as
/// order-irrelevant map keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionKey {
    /// World-space center of the region cell.
    pub center: Point3<i32>,
}

impl RegionKey {
    /// The key of the region cell containing `position`.
    pub fn from_position(position: Point3<f32>, side: i32) -> Self {
        let quantize = |v: f32| (v / side as f32).floor() as i32 * side + side / 2;
        Self {
            center: Point3::new(
                quantize(position.x),
                quantize(position.y),
                quantize(position.z),
            ),
        }
    }

    /// The center as floating-point world coordinates.
    pub fn center_f32(&self) -> Point3<f32> {
        Point3::new(
            self.center.x as f32,
            self.center.y as f32,
            self.center.z as f32,
        )
    }
}

/// Streaming thresholds and quantization for the region grid.
pub struct RegionGrid {
    side: i32,
    load_distance: Vector3<f32>,
    unload_distance: Vector3<f32>,
}

impl RegionGrid {
    /// Creates a grid with the given region side length and per-axis
    /// streaming thresholds.
    ///
    /// # Panics
    /// Panics if `side` is not positive or `unload_distance` is smaller
    /// than `load_distance` on any axis, which would make regions unload
    /// the moment they finish loading.
    pub fn new(side: i32, load_distance: Vector3<f32>, unload_distance: Vector3<f32>) -> Self {
        assert!(side > 0, "region side length must be positive");
        assert!(
            unload_distance.x >= load_distance.x
                && unload_distance.y >= load_distance.y
                && unload_distance.z >= load_distance.z,
            "unload distance must not be smaller than load distance"
        );
        Self {
            side,
            load_distance,
            unload_distance,
        }
    }

    /// Edge length of one region in world units.
    pub fn side(&self) -> i32 {
        self.side
    }

    /// The key of the region cell containing `position`.
    pub fn key_at(&self, position: Point3<f32>) -> RegionKey {
        RegionKey::from_position(position, self.side)
    }

    /// All keys whose centers lie within the load distance of `position`.
    ///
    /// Distance is taken per axis: a key qualifies only when all three
    /// axis distances are within their bound. Keys are produced in a
    /// deterministic x, then y, then z scan order around the viewer.
    pub fn target_keys(&self, position: Point3<f32>) -> Vec<RegionKey> {
        let current = self.key_at(position).center;
        let side = self.side;

        // One extra ring beyond the threshold guarantees the scan covers
        // every center the per-axis filter could accept.
        let steps = |distance: f32| (distance / side as f32).ceil() as i32 + 1;
        let steps_x = steps(self.load_distance.x);
        let steps_y = steps(self.load_distance.y);
        let steps_z = steps(self.load_distance.z);

        let mut keys = Vec::new();
        for x in -steps_x..=steps_x {
            for y in -steps_y..=steps_y {
                for z in -steps_z..=steps_z {
                    let key = RegionKey {
                        center: Point3::new(
                            current.x + x * side,
                            current.y + y * side,
                            current.z + z * side,
                        ),
                    };
                    if self.within(position, key, self.load_distance) {
                        keys.push(key);
                    }
                }
            }
        }
        keys
    }

    /// Whether a loaded region at `key` is out of range and should be
    /// destroyed. Strictly greater than the unload distance on any axis.
    pub fn should_unload(&self, position: Point3<f32>, key: RegionKey) -> bool {
        !self.within(position, key, self.unload_distance)
    }

    fn within(&self, position: Point3<f32>, key: RegionKey, distance: Vector3<f32>) -> bool {
        let center = key.center_f32();
        (position.x - center.x).abs() <= distance.x
            && (position.y - center.y).abs() <= distance.y
            && (position.z - center.z).abs() <= distance.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> RegionGrid {
        RegionGrid::new(
            32,
            Vector3::new(64.0, 32.0, 64.0),
            Vector3::new(96.0, 64.0, 96.0),
        )
    }

    #[test]
    fn keys_quantize_to_cell_centers() {
        let key = RegionKey::from_position(Point3::new(0.0, 0.0, 0.0), 32);
        assert_eq!(key.center, Point3::new(16, 16, 16));

        let key = RegionKey::from_position(Point3::new(-0.5, 31.9, 33.0), 32);
        assert_eq!(key.center, Point3::new(-16, 16, 48));

        // Every position inside a cell maps to the same key.
        let a = RegionKey::from_position(Point3::new(1.0, 1.0, 1.0), 32);
        let b = RegionKey::from_position(Point3::new(31.0, 31.0, 31.0), 32);
        assert_eq!(a, b);
    }

    #[test]
    fn target_keys_respect_per_axis_distance() {
        let grid = grid();
        let position = Point3::new(16.0, 16.0, 16.0);
        let keys = grid.target_keys(position);

        assert!(keys.contains(&RegionKey {
            center: Point3::new(16, 16, 16)
        }));
        for key in &keys {
            let center = key.center_f32();
            assert!((position.x - center.x).abs() <= 64.0);
            assert!((position.y - center.y).abs() <= 32.0);
            assert!((position.z - center.z).abs() <= 64.0);
        }

        // The y axis bound is tighter than x and z.
        assert!(!keys.contains(&RegionKey {
            center: Point3::new(16, 80, 16)
        }));
        assert!(keys.contains(&RegionKey {
            center: Point3::new(80, 16, 16)
        }));
    }

    #[test]
    fn target_keys_have_no_duplicates() {
        let keys = grid().target_keys(Point3::new(5.0, -3.0, 90.0));
        let mut deduped = keys.clone();
        deduped.sort_by_key(|k| (k.center.x, k.center.y, k.center.z));
        deduped.dedup();
        assert_eq!(deduped.len(), keys.len());
    }

    #[test]
    fn unload_uses_the_wider_threshold() {
        let grid = grid();
        let key = RegionKey {
            center: Point3::new(16, 16, 16),
        };

        // Inside load distance: keep.
        assert!(!grid.should_unload(Point3::new(40.0, 16.0, 16.0), key));
        // Between the thresholds: keep, even though it would not be loaded
        // from here.
        assert!(!grid.should_unload(Point3::new(100.0, 16.0, 16.0), key));
        // Beyond unload distance on one axis: destroy.
        assert!(grid.should_unload(Point3::new(113.0, 16.0, 16.0), key));
    }

    #[test]
    #[should_panic]
    fn unload_threshold_below_load_threshold_is_rejected() {
        let _ = RegionGrid::new(
            32,
            Vector3::new(64.0, 64.0, 64.0),
            Vector3::new(32.0, 64.0, 64.0),
        );
    }
}
