//! # Engine State Module
//!
//! The core engine composition: GPU handles, camera, render resources and
//! the streamed voxel space, driven by two independently paced loops. A
//! fixed-rate logic tick advances the camera, replans region streaming and
//! drives pending uploads; the display-paced render pass draws whatever
//! region state is currently committed.

use std::time::Duration;

use cgmath::{Point3, Vector3};
use log::{error, info};

use camera_state::camera::Projection;
use camera_state::CameraState;
use rendering::{DepthTexture, Gpu, Material, Mesh, MeshBuffers, RenderResources};
use voxels::space::SpaceStats;
use voxels::{RegionGrid, VoxelSpace, VoxelType};

use crate::geometry::{Frustum, Ray};
use crate::terrain::{
    HttpTerrainProvider, NoiseTerrainProvider, TerrainProvider, REGION_DIMENSION,
};

pub mod camera_state;
pub mod rendering;
pub mod voxels;

/// Fixed interval of the logic loop, thirty ticks per second.
const LOGIC_TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 30);

/// Per-axis distance within which regions are loaded.
const LOAD_DISTANCE: Vector3<f32> = Vector3::new(64.0, 32.0, 64.0);
/// Per-axis distance beyond which regions are destroyed. Wider than the
/// load distance so boundary hovering cannot thrash loads.
const UNLOAD_DISTANCE: Vector3<f32> = Vector3::new(96.0, 64.0, 96.0);

/// Environment variable naming the remote region endpoint. Without it the
/// engine generates terrain locally.
const REGION_ENDPOINT_VAR: &str = "REGION_ENDPOINT";

/// Whether the logic loop is advancing.
///
/// An explicit two-state machine with idempotent transitions: pausing a
/// paused engine or resuming a running one does nothing. Rendering keeps
/// presenting the last committed state while paused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Logic ticks are running.
    Running,
    /// Logic ticks are suspended.
    Paused,
}

impl LoopState {
    /// Whether logic ticks should advance.
    pub fn is_running(self) -> bool {
        matches!(self, LoopState::Running)
    }
}

/// Player actions for one tick, derived from raw input by the application
/// layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlayerAction {
    /// Move along the view direction.
    pub move_forward: bool,
    /// Move against the view direction.
    pub move_backward: bool,
    /// Strafe left.
    pub move_left: bool,
    /// Strafe right.
    pub move_right: bool,
    /// Ascend.
    pub move_up: bool,
    /// Descend.
    pub move_down: bool,
    /// Mouse look delta, if the mouse moved.
    pub rotate_view: Option<(f64, f64)>,
    /// Toggle the logic loop between running and paused.
    pub toggle_pause: bool,
    /// Cast a pick ray along the view direction.
    pub pick_voxel: bool,
}

/// The main state container for the voxel engine.
pub struct EngineState {
    gpu: Gpu,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,
    /// Camera state, public so the application layer can inspect the
    /// viewer position.
    pub camera_state: CameraState,
    camera_projection: Projection,
    resources: RenderResources,
    space: VoxelSpace,
    player_actions: PlayerAction,
    loop_state: LoopState,
    update_accumulator: Duration,
    stats: SpaceStats,
}

/// Fallback solid color for a voxel material, used when no texture assets
/// are supplied.
fn material_color(voxel_type: VoxelType) -> [u8; 4] {
    match voxel_type {
        VoxelType::Air => [0, 0, 0, 0],
        VoxelType::Dirt => [134, 96, 67, 255],
        VoxelType::Grass => [106, 170, 64, 255],
        VoxelType::Stone => [136, 140, 141, 255],
        VoxelType::Sand => [218, 210, 158, 255],
        VoxelType::Water => [64, 96, 220, 255],
    }
}

/// Picks the terrain source for this session: the remote endpoint when
/// one is configured, local noise generation otherwise.
fn create_terrain_provider() -> Box<dyn TerrainProvider> {
    match std::env::var(REGION_ENDPOINT_VAR) {
        Ok(endpoint) if !endpoint.is_empty() => {
            info!("streaming terrain from {}", endpoint);
            Box::new(HttpTerrainProvider::new(endpoint))
        }
        _ => {
            info!("generating terrain locally");
            Box::new(NoiseTerrainProvider::new(0))
        }
    }
}

impl EngineState {
    /// Creates the engine around an initialized surface and device.
    pub fn new(
        surface: wgpu::Surface<'static>,
        surface_config: wgpu::SurfaceConfiguration,
        device: wgpu::Device,
        queue: wgpu::Queue,
    ) -> Self {
        let gpu = Gpu { device, queue };

        let camera_projection = Projection::new(
            surface_config.width,
            surface_config.height,
            cgmath::Deg(60.0),
            0.1,
            1000.0,
        );
        let camera_state = CameraState::new(&gpu, &camera_projection);

        let material_layout = Material::bind_group_layout(&gpu.device);
        let materials = voxels::voxel::RENDERABLE_TYPES
            .iter()
            .map(|voxel_type| {
                Material::solid_color(
                    &gpu,
                    &material_layout,
                    &format!("{voxel_type:?} material"),
                    material_color(*voxel_type),
                )
            })
            .collect();

        let pipeline = rendering::pipeline::create_instance_pipeline(
            &gpu.device,
            surface_config.format,
            camera_state.bind_group_layout(),
            &material_layout,
        );

        let resources = RenderResources {
            pipeline,
            mesh: MeshBuffers::new(&gpu, &Mesh::cube()),
            materials,
        };

        let depth_texture = DepthTexture::new(&gpu.device, &surface_config);

        let grid = RegionGrid::new(REGION_DIMENSION, LOAD_DISTANCE, UNLOAD_DISTANCE);
        let mut space = VoxelSpace::new(grid, create_terrain_provider());
        space.set_position(camera_state.camera.position);

        Self {
            gpu,
            surface,
            surface_config,
            depth_texture,
            camera_state,
            camera_projection,
            resources,
            space,
            player_actions: PlayerAction::default(),
            loop_state: LoopState::Running,
            update_accumulator: Duration::ZERO,
            stats: SpaceStats::default(),
        }
    }

    /// Installs this tick's player actions and handles the pause toggle.
    pub fn set_player_actions(&mut self, actions: PlayerAction) {
        if actions.toggle_pause {
            match self.loop_state {
                LoopState::Running => self.pause(),
                LoopState::Paused => self.resume(),
            }
        }
        self.player_actions = actions;
    }

    /// Suspends the logic loop. Idempotent.
    pub fn pause(&mut self) {
        if self.loop_state.is_running() {
            info!("logic loop paused");
            self.loop_state = LoopState::Paused;
        }
    }

    /// Resumes the logic loop. Idempotent.
    pub fn resume(&mut self) {
        if !self.loop_state.is_running() {
            info!("logic loop resumed");
            self.loop_state = LoopState::Running;
        }
    }

    /// Current loop state.
    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    /// Advances the fixed-rate logic loop by however much wall time has
    /// passed since the last call.
    pub fn process_update(&mut self, wait_dt: Duration) {
        if !self.loop_state.is_running() {
            return;
        }

        self.update_accumulator += wait_dt;
        while self.update_accumulator >= LOGIC_TICK_INTERVAL {
            self.update_accumulator -= LOGIC_TICK_INTERVAL;
            self.tick(LOGIC_TICK_INTERVAL);
        }
    }

    /// One logic tick: camera, streaming replan, load pipeline, uploads.
    fn tick(&mut self, dt: Duration) {
        self.camera_state.intake_actions(&self.player_actions);

        if let Some(position) = self
            .camera_state
            .update(&self.gpu, dt, &self.camera_projection)
        {
            self.space.set_position(position);
        }

        if self.player_actions.pick_voxel {
            self.pick_at_view_center();
            self.player_actions.pick_voxel = false;
        }

        self.space.pump(&self.gpu, &self.resources);

        // Drive map callbacks, then let regions commit pending uploads.
        let _ = self.gpu.device.poll(wgpu::PollType::Poll);
        self.space.maintain(&self.gpu);
    }

    fn pick_at_view_center(&self) {
        let camera = &self.camera_state.camera;
        let ray = Ray::new(camera.position, camera.view_direction());
        match self.space.pick(&ray) {
            Some((position, distance)) => info!(
                "picked voxel ({},{},{}) at distance {:.2}",
                position.x, position.y, position.z, distance
            ),
            None => info!("pick ray hit nothing"),
        }
    }

    /// Renders one frame and refreshes the frame stats.
    pub fn render(&mut self) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface
                    .configure(&self.gpu.device, &self.surface_config);
                return;
            }
            Err(err) => {
                error!("failed to acquire frame: {err}");
                return;
            }
        };

        let view = frame.texture.create_view(&Default::default());
        let frustum = Frustum::from_view_projection(self.camera_state.view_projection());

        let mut encoder = self.gpu.device.create_command_encoder(&Default::default());
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.2,
                            b: 0.3,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            render_pass.set_pipeline(&self.resources.pipeline);
            render_pass.set_bind_group(0, self.camera_state.bind_group(), &[]);
            self.stats = self
                .space
                .render(&mut render_pass, &frustum, &self.resources);
        }

        self.gpu.queue.submit([encoder.finish()]);
        frame.present();
    }

    /// Streaming and visibility counters from the most recent frame.
    pub fn stats(&self) -> SpaceStats {
        self.stats
    }

    /// Reconfigures the surface, depth buffer and projection for a new
    /// window size.
    pub fn resize_surface(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface
            .configure(&self.gpu.device, &self.surface_config);

        let old_depth = std::mem::replace(
            &mut self.depth_texture,
            DepthTexture::new(&self.gpu.device, &self.surface_config),
        );
        old_depth.destroy();

        self.camera_projection.resize(size.width, size.height);
        self.camera_state
            .refresh_projection(&self.gpu, &self.camera_projection);
    }

    /// The viewer's current world position.
    pub fn viewer_position(&self) -> Point3<f32> {
        self.camera_state.camera.position
    }
}
