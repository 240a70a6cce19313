//! # Indirect Buffer Manager
//!
//! Holds the five-word indexed-indirect draw arguments for one instance
//! group. The index count is fixed by the shared cube mesh; only the
//! instance count changes, rewritten whenever an instance upload commits.

use wgpu::util::DrawIndexedIndirectArgs;

use super::Gpu;

/// A GPU buffer holding one `DrawIndexedIndirectArgs` record.
pub struct IndirectBufferManager {
    buffer: wgpu::Buffer,
    index_count: u32,
}

impl IndirectBufferManager {
    /// Creates the indirect buffer with `index_count` indices and zero
    /// instances, so an untouched group draws nothing.
    pub fn new(gpu: &Gpu, index_count: u32, label: &str) -> Self {
        let args = DrawIndexedIndirectArgs {
            index_count,
            instance_count: 0,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        };

        let buffer = wgpu::util::DeviceExt::create_buffer_init(
            &gpu.device,
            &wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} indirect args")),
                contents: args.as_bytes(),
                usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            },
        );

        Self {
            buffer,
            index_count,
        }
    }

    /// Rewrites the arguments with a new instance count.
    pub fn update(&self, queue: &wgpu::Queue, instance_count: u32) {
        let args = DrawIndexedIndirectArgs {
            index_count: self.index_count,
            instance_count,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        };
        queue.write_buffer(&self.buffer, 0, args.as_bytes());
    }

    /// The buffer passed to `draw_indexed_indirect`.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Releases the buffer.
    pub fn destroy(self) {
        self.buffer.destroy();
    }
}
