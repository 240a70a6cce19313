//! # Instance Buffer Manager
//!
//! Owns the GPU-resident buffer of per-instance voxel positions that one
//! instanced draw reads, plus the staging buffer used to fill it.
//!
//! An upload runs as map staging, write positions, unmap, then a device
//! copy from staging into the instance buffer. The map completes
//! asynchronously (observed through [`InstanceBufferManager::maintain`]
//! after `Device::poll`), so uploads can overlap in wall time. Overlaps
//! are resolved with a latest-wins rule: the manager keeps at most one
//! queued upload, each tagged with a monotonic version, and an upload that
//! gets overtaken before its turn is discarded outright. A frame can show
//! the previous instance set while a newer one is queued, but never a
//! stale set after a newer one was committed.

use std::sync::mpsc::{channel, Receiver, Sender};

use log::{debug, error};

use super::Gpu;

/// Bytes per instance position, three 32-bit floats.
pub const POSITION_STRIDE: u64 = 12;

/// Returns the capacity to reallocate at, or `None` when the current
/// capacity already fits.
///
/// Growth is exact fit rather than geometric. Region instance counts are
/// set once per load and rarely change afterwards, so reserving slack
/// would mostly waste GPU memory.
pub(crate) fn grown_capacity(current: usize, required: usize) -> Option<usize> {
    (required > current).then_some(required)
}

/// One upload waiting for the staging buffer to become writable.
struct QueuedUpload {
    version: u64,
    positions: Vec<[f32; 3]>,
}

/// Completion notice from a staging map request.
struct MapEvent {
    generation: u64,
    result: Result<(), wgpu::BufferAsyncError>,
}

/// Whether the staging buffer is currently writable.
enum StagingState {
    /// Mapped and ready for the next upload.
    Mapped,
    /// A map request is outstanding; uploads wait in the queue slot.
    MapPending,
}

/// Manages one instance-position buffer and its staged uploads.
pub struct InstanceBufferManager {
    label: String,
    instance_buffer: wgpu::Buffer,
    staging_buffer: wgpu::Buffer,
    /// Capacity of both buffers, in positions.
    capacity: usize,
    /// Bumped whenever the buffers are replaced, so map completions for a
    /// dead staging buffer can be recognized and ignored.
    generation: u64,
    /// Bumped on every `set_instances` call; tags queued uploads.
    version: u64,
    staging_state: StagingState,
    queued: Option<QueuedUpload>,
    map_sender: Sender<MapEvent>,
    map_receiver: Receiver<MapEvent>,
}

impl InstanceBufferManager {
    /// Creates the instance and staging buffers sized for `capacity`
    /// positions (at least one). The staging buffer starts mapped, so the
    /// first upload commits without waiting.
    pub fn new(gpu: &Gpu, capacity: usize, label: &str) -> Self {
        let capacity = capacity.max(1);
        let (map_sender, map_receiver) = channel();
        let instance_buffer = Self::create_instance_buffer(&gpu.device, capacity, label);
        let staging_buffer = Self::create_staging_buffer(&gpu.device, capacity, label);

        Self {
            label: label.to_owned(),
            instance_buffer,
            staging_buffer,
            capacity,
            generation: 0,
            version: 0,
            staging_state: StagingState::Mapped,
            queued: None,
            map_sender,
            map_receiver,
        }
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize, label: &str) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} instance positions")),
            size: capacity as u64 * POSITION_STRIDE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_staging_buffer(device: &wgpu::Device, capacity: usize, label: &str) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} instance staging")),
            size: capacity as u64 * POSITION_STRIDE,
            usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: true,
        })
    }

    /// Current capacity of the buffers, in positions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Version of the most recently requested upload.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The buffer the instanced draw reads positions from.
    pub fn instance_buffer(&self) -> &wgpu::Buffer {
        &self.instance_buffer
    }

    /// Replaces the instance set with `positions`.
    ///
    /// Grows both buffers to exactly fit when the current capacity is
    /// exceeded; otherwise the existing allocations are reused. The upload
    /// commits immediately when the staging buffer is writable, in which
    /// case the committed instance count is returned for the caller's
    /// indirect-args buffer. Otherwise it is queued, replacing (and
    /// discarding) any older still-uncommitted upload.
    pub fn set_instances(&mut self, gpu: &Gpu, positions: Vec<[f32; 3]>) -> Option<u32> {
        self.version += 1;

        if let Some(new_capacity) = grown_capacity(self.capacity, positions.len()) {
            // Both buffers are replaced together so the copy source and
            // destination always agree on size. The fresh staging buffer
            // is born mapped, so the pending map of the old one (if any)
            // no longer matters.
            self.instance_buffer.destroy();
            self.staging_buffer.destroy();
            self.instance_buffer = Self::create_instance_buffer(&gpu.device, new_capacity, &self.label);
            self.staging_buffer = Self::create_staging_buffer(&gpu.device, new_capacity, &self.label);
            self.capacity = new_capacity;
            self.generation += 1;
            self.staging_state = StagingState::Mapped;
        }

        if let Some(stale) = self.queued.replace(QueuedUpload {
            version: self.version,
            positions,
        }) {
            debug!(
                "{}: discarding upload v{} in favor of v{}",
                self.label, stale.version, self.version
            );
        }

        self.pump(gpu)
    }

    /// Commits the queued upload if the staging buffer is writable.
    fn pump(&mut self, gpu: &Gpu) -> Option<u32> {
        if !matches!(self.staging_state, StagingState::Mapped) {
            return None;
        }
        let upload = self.queued.take()?;
        let count = upload.positions.len() as u32;

        if count > 0 {
            let byte_len = upload.positions.len() as u64 * POSITION_STRIDE;
            {
                let mut mapped = self.staging_buffer.slice(0..byte_len).get_mapped_range_mut();
                mapped.copy_from_slice(bytemuck::cast_slice(&upload.positions));
            }
            self.staging_buffer.unmap();

            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some(&format!("{} upload", self.label)),
                });
            encoder.copy_buffer_to_buffer(&self.staging_buffer, 0, &self.instance_buffer, 0, byte_len);
            gpu.queue.submit([encoder.finish()]);

            // Request the next mapping right away so a follow-up upload
            // only has to wait for one round trip.
            self.staging_state = StagingState::MapPending;
            let sender = self.map_sender.clone();
            let generation = self.generation;
            self.staging_buffer
                .slice(..)
                .map_async(wgpu::MapMode::Write, move |result| {
                    let _ = sender.send(MapEvent { generation, result });
                });
        }

        Some(count)
    }

    /// Processes finished map requests and commits any queued upload.
    ///
    /// Call once per tick after `Device::poll`. Returns the committed
    /// instance count when an upload went through.
    pub fn maintain(&mut self, gpu: &Gpu) -> Option<u32> {
        while let Ok(event) = self.map_receiver.try_recv() {
            if event.generation != self.generation {
                // Completion for a staging buffer that was replaced.
                continue;
            }
            match event.result {
                Ok(()) => {
                    self.staging_state = StagingState::Mapped;
                }
                Err(err) => {
                    error!("{}: staging map failed: {err}", self.label);
                    // Replace the staging buffer with a fresh mapped one
                    // so uploads can continue.
                    self.staging_buffer.destroy();
                    self.staging_buffer =
                        Self::create_staging_buffer(&gpu.device, self.capacity, &self.label);
                    self.generation += 1;
                    self.staging_state = StagingState::Mapped;
                }
            }
        }

        self.pump(gpu)
    }

    /// Releases both buffers. Any in-flight map completion is ignored.
    pub fn destroy(self) {
        self.instance_buffer.destroy();
        self.staging_buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_grows_to_exact_fit() {
        assert_eq!(grown_capacity(500, 501), Some(501));
        assert_eq!(grown_capacity(500, 10_000), Some(10_000));
    }

    #[test]
    fn capacity_never_shrinks_or_reallocates_when_it_fits() {
        assert_eq!(grown_capacity(500, 500), None);
        assert_eq!(grown_capacity(500, 10), None);
        assert_eq!(grown_capacity(500, 0), None);
    }
}
