//! # Voxels Module
//!
//! The voxel world: the data model for single voxels, the region unit of
//! streaming and rendering, the grid planner deciding what should be
//! resident, the streaming pipeline that loads it, and the space tying
//! them together.

pub mod grid;
pub mod region;
pub mod space;
pub mod streaming;
pub mod voxel;

pub use grid::{RegionGrid, RegionKey};
pub use region::{Region, RegionData};
pub use space::{SpaceStats, VoxelSpace};
pub use voxel::{Voxel, VoxelType};
