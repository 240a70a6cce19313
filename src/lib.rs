#![warn(missing_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Space
//!
//! A streaming voxel world renderer built with Rust and WGPU.
//!
//! The world is partitioned into fixed-size cubic regions that stream in
//! and out around the moving camera. Each region fetches its voxels from a
//! terrain provider, culls fully enclosed voxels, groups the rest by
//! material and draws every group with one indexed-indirect instanced call.
//! Whole regions are skipped per frame with a single frustum-versus-bounds
//! test.
//!
//! ## Key Modules
//!
//! * `geometry` - bounding boxes, planes, frustums and rays
//! * `terrain` - the region data providers (local noise or remote HTTP)
//! * `engine_state` - the engine core: voxel space, streaming, rendering
//! * `application_state` - window, input and lifecycle management
//!
//! ## Architecture
//!
//! Two independently paced loops drive the engine: a fixed-rate logic loop
//! (camera movement, region replanning, the streaming pipeline and buffer
//! uploads) and a display-paced render loop that draws whatever region
//! state is currently committed. Region loads run on a worker thread, one
//! at a time, so streaming pressure on the GPU stays bounded.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_space::run();
//! }
//! ```
//!
//! Set `REGION_ENDPOINT` to stream terrain from a region server instead of
//! generating it locally, and `RUST_LOG` to control logging.

use application_state::{
    graphics_resources_builder::{GraphicsBuilder, MaybeGraphics},
    ApplicationState,
};
use log::info;
use winit::event_loop::EventLoop;

pub mod application_state;
pub mod engine_state;
pub mod geometry;
pub mod terrain;

/// Initializes logging, builds the event loop and runs the application
/// until the window closes.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("logger initialized");
    let event_loop = EventLoop::with_user_event().build().unwrap();

    let mut state = ApplicationState::new(MaybeGraphics::Builder(GraphicsBuilder::new(
        event_loop.create_proxy(),
    )));

    let _ = event_loop.run_app(&mut state);
}
