//! # Graphics Resources Builder
//!
//! Two-phase creation of the WebGPU context. Adapter and device requests
//! are asynchronous, so the builder runs them to completion and delivers a
//! finished [`Graphics`] back to the event loop as a user event. Nothing
//! downstream ever sees a half-initialized GPU handle.

use std::future::Future;
use std::sync::Arc;

use wgpu::{Adapter, Device, Instance, Queue, Surface, SurfaceConfiguration};
use winit::{
    event_loop::{ActiveEventLoop, EventLoopProxy},
    window::Window,
};

/// The fully initialized graphics resources.
///
/// Fields are `Option` only so the struct can be `take`n apart when the
/// engine state is constructed; a delivered `Graphics` always has every
/// field populated.
#[derive(Default)]
pub struct Graphics {
    /// The application window.
    pub window: Option<Arc<Window>>,
    /// The wgpu instance the surface was created from.
    pub instance: Option<Instance>,
    /// The window surface.
    pub surface: Option<Surface<'static>>,
    /// The surface configuration in effect.
    pub surface_config: Option<SurfaceConfiguration>,
    /// The chosen adapter.
    pub adapter: Option<Adapter>,
    /// The device.
    pub device: Option<Device>,
    /// The device queue.
    pub queue: Option<Queue>,
}

/// Creates the window, surface, adapter and device.
///
/// # Panics
/// Panics when no suitable adapter or device exists. That is a fatal
/// setup error; there is nothing to render with and no point continuing.
fn create_graphics(event_loop: &ActiveEventLoop) -> impl Future<Output = Graphics> + 'static {
    let window_attrs = Window::default_attributes().with_title("voxel space");
    let window = Arc::new(event_loop.create_window(window_attrs).unwrap());

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        flags: wgpu::InstanceFlags::empty(),
        backend_options: wgpu::BackendOptions::from_env_or_default(),
    });

    let surface = instance.create_surface(window.clone()).unwrap();

    async move {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .unwrap();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .unwrap();

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        Graphics {
            window: Some(window),
            instance: Some(instance),
            surface: Some(surface),
            surface_config: Some(surface_config),
            adapter: Some(adapter),
            device: Some(device),
            queue: Some(queue),
        }
    }
}

/// Helper managing the one-shot graphics initialization.
pub struct GraphicsBuilder {
    event_loop_proxy: Option<EventLoopProxy<Graphics>>,
}

/// The states of graphics initialization.
pub enum MaybeGraphics {
    /// Waiting for the event loop to resume so resources can be built.
    Builder(GraphicsBuilder),
    /// Resources are ready and waiting to be consumed.
    Graphics(Graphics),
    /// Resources were moved into the engine state.
    Moved,
}

impl GraphicsBuilder {
    /// Creates a builder that will deliver through `event_loop_proxy`.
    pub fn new(event_loop_proxy: EventLoopProxy<Graphics>) -> Self {
        Self {
            event_loop_proxy: Some(event_loop_proxy),
        }
    }

    /// Builds the graphics resources and sends them to the event loop.
    /// Does nothing if they were already built.
    pub fn build_and_send(&mut self, event_loop: &ActiveEventLoop) {
        let Some(event_loop_proxy) = self.event_loop_proxy.take() else {
            return;
        };

        let gfx = pollster::block_on(create_graphics(event_loop));
        assert!(event_loop_proxy.send_event(gfx).is_ok());
    }
}
