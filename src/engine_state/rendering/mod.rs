//! # Rendering Module
//!
//! GPU-facing state for the voxel world: the shared cube mesh, per-material
//! textures, the one instanced render pipeline, the depth buffer, and the
//! per-group instance and indirect buffer managers.
//!
//! The module only depends on the wgpu capability surface it actually uses
//! (buffer create/map/copy, texture upload, pipeline creation, indirect
//! draws); nothing here cares which native backend is underneath.

pub mod depth_texture;
pub mod indirect;
pub mod instance_buffer;
pub mod material;
pub mod mesh;
pub mod pipeline;

pub use depth_texture::DepthTexture;
pub use indirect::IndirectBufferManager;
pub use instance_buffer::InstanceBufferManager;
pub use material::Material;
pub use mesh::{Mesh, MeshBuffers};

/// The shared GPU handles. Cloning is cheap; wgpu resources are reference
/// counted internally.
#[derive(Clone)]
pub struct Gpu {
    /// The WebGPU device.
    pub device: wgpu::Device,
    /// The device's command queue.
    pub queue: wgpu::Queue,
}

/// Everything the voxel world shares across regions while drawing: the
/// pipeline, the cube mesh buffers and one material per voxel type.
pub struct RenderResources {
    /// The instanced voxel pipeline.
    pub pipeline: wgpu::RenderPipeline,
    /// The shared cube mesh.
    pub mesh: MeshBuffers,
    /// Materials indexed by material index.
    pub materials: Vec<Material>,
}
