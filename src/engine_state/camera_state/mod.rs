//! # Camera State Management
//!
//! Owns the camera, its GPU uniform buffer and bind group, and the input
//! controller. The engine asks this module once per logic tick whether the
//! camera moved; a changed position is what triggers region replanning.

use cgmath::{Matrix4, Point3};
use std::time::Duration;

use crate::engine_state::rendering::Gpu;
use crate::engine_state::PlayerAction;

pub mod camera;

use camera::{Camera, CameraController, CameraUniform, Projection};

/// The camera system: state, controller and GPU resources.
pub struct CameraState {
    /// The current camera position and orientation.
    pub camera: Camera,
    camera_uniform: CameraUniform,
    camera_controller: CameraController,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    view_projection: Matrix4<f32>,
}

impl CameraState {
    /// Creates the camera at the origin along with its uniform buffer and
    /// bind group.
    pub fn new(gpu: &Gpu, projection: &Projection) -> Self {
        let camera = Camera::new(
            Point3::new(0.0, 0.0, 0.0),
            cgmath::Deg(0.0),
            cgmath::Deg(0.0),
        );
        let camera_controller = CameraController::new(16.0, 2.0);

        let mut camera_uniform = CameraUniform::new();
        let view_projection = camera_uniform.update_view_proj_and_pos(&camera, projection);

        let uniform_buffer = wgpu::util::DeviceExt::create_buffer_init(
            &gpu.device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("camera uniform"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        let bind_group_layout =
            gpu.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("camera bind group layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        CameraState {
            camera,
            camera_uniform,
            camera_controller,
            uniform_buffer,
            bind_group_layout,
            bind_group,
            view_projection,
        }
    }

    /// Feeds this tick's player actions into the controller.
    pub fn intake_actions(&mut self, actions: &PlayerAction) {
        self.camera_controller.intake_actions(actions);
    }

    /// Applies pending input, refreshes the GPU uniform and reports the
    /// new viewer position if anything changed.
    pub fn update(
        &mut self,
        gpu: &Gpu,
        dt: Duration,
        projection: &Projection,
    ) -> Option<Point3<f32>> {
        if !self.camera_controller.has_updates() {
            return None;
        }

        self.camera
            .apply_controller_and_reset(&mut self.camera_controller, dt);
        self.view_projection = self
            .camera_uniform
            .update_view_proj_and_pos(&self.camera, projection);
        gpu.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );

        Some(self.camera.position)
    }

    /// Rewrites the uniform after a projection change (viewport resize).
    pub fn refresh_projection(&mut self, gpu: &Gpu, projection: &Projection) {
        self.view_projection = self
            .camera_uniform
            .update_view_proj_and_pos(&self.camera, projection);
        gpu.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
    }

    /// The combined view-projection matrix of the last update, used for
    /// frustum extraction.
    pub fn view_projection(&self) -> &Matrix4<f32> {
        &self.view_projection
    }

    /// Layout for pipeline creation.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Bind group set at slot 0 while drawing the world.
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
