//! # Application State Management
//!
//! The winit application handler: graphics initialization handoff, raw
//! input tracking, the frame pump that drives the engine's logic loop, and
//! window lifecycle events.

pub mod graphics_resources_builder;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use graphics_resources_builder::{Graphics, MaybeGraphics};
use log::debug;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::engine_state::{EngineState, PlayerAction};

/// Number of frame pumps between streaming stats log lines.
const STATS_LOG_INTERVAL: u32 = 120;

/// Tracks raw input between frame pumps.
#[derive(Default)]
struct InputTracker {
    held: HashSet<KeyCode>,
    just_pressed: HashSet<KeyCode>,
    mouse_delta: Option<(f64, f64)>,
}

impl InputTracker {
    fn key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        match event.state {
            ElementState::Pressed => {
                if self.held.insert(code) {
                    self.just_pressed.insert(code);
                }
            }
            ElementState::Released => {
                self.held.remove(&code);
            }
        }
    }

    fn mouse_motion(&mut self, delta: (f64, f64)) {
        let accumulated = self.mouse_delta.unwrap_or((0.0, 0.0));
        self.mouse_delta = Some((accumulated.0 + delta.0, accumulated.1 + delta.1));
    }

    fn reset(&mut self) {
        self.held.clear();
        self.just_pressed.clear();
        self.mouse_delta = None;
    }

    /// Produces this tick's player actions and clears the one-shot state.
    fn take_actions(&mut self) -> PlayerAction {
        let actions = PlayerAction {
            move_forward: self.held.contains(&KeyCode::KeyW),
            move_backward: self.held.contains(&KeyCode::KeyS),
            move_left: self.held.contains(&KeyCode::KeyA),
            move_right: self.held.contains(&KeyCode::KeyD),
            move_up: self.held.contains(&KeyCode::Space),
            move_down: self.held.contains(&KeyCode::ShiftLeft),
            rotate_view: self.mouse_delta,
            toggle_pause: self.just_pressed.contains(&KeyCode::KeyP),
            pick_voxel: self.just_pressed.contains(&KeyCode::KeyK),
        };
        self.just_pressed.clear();
        self.mouse_delta = None;
        actions
    }
}

/// The running application after graphics initialization completed.
pub struct InitializedApplicationState {
    /// The core engine state.
    pub engine_state: EngineState,
    /// Handle to the application window.
    pub window: Arc<Window>,
    input: InputTracker,
    last_wait_time: Instant,
    frames_since_stats: u32,
}

/// Top-level application state handed to the winit event loop.
pub struct ApplicationState {
    /// Graphics resources in whatever initialization state they are in.
    pub graphics: MaybeGraphics,
    /// The running application, once graphics exist.
    pub state: Option<InitializedApplicationState>,
}

impl ApplicationState {
    /// Creates the pre-initialization application state.
    pub fn new(graphics: MaybeGraphics) -> Self {
        Self {
            graphics,
            state: None,
        }
    }

    /// Consumes delivered graphics resources into the running engine.
    fn initialize_application_state(&mut self) {
        if let MaybeGraphics::Graphics(gfx) = &mut self.graphics {
            let taken_gfx = std::mem::take(gfx);
            let window = taken_gfx.window.expect("window is missing");
            let engine_state = EngineState::new(
                taken_gfx.surface.expect("surface is missing"),
                taken_gfx
                    .surface_config
                    .expect("surface configuration is missing"),
                taken_gfx.device.expect("device is missing"),
                taken_gfx.queue.expect("queue is missing"),
            );

            self.state = Some(InitializedApplicationState {
                engine_state,
                window,
                input: InputTracker::default(),
                last_wait_time: Instant::now(),
                frames_since_stats: 0,
            });

            self.graphics = MaybeGraphics::Moved;
        }
    }
}

impl ApplicationHandler<Graphics> for ApplicationState {
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            if matches!(event, WindowEvent::CloseRequested) {
                event_loop.exit();
            }
            return;
        };

        match event {
            WindowEvent::Resized(size) => {
                state.engine_state.resize_surface(size);
            }
            WindowEvent::Focused(false) => {
                state.input.reset();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    event_loop.exit();
                    return;
                }
                state.input.key_event(&event);
            }
            WindowEvent::RedrawRequested => {
                state.engine_state.render();
            }
            WindowEvent::CloseRequested => event_loop.exit(),
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            if let DeviceEvent::MouseMotion { delta } = event {
                state.input.mouse_motion(delta);
            }
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let MaybeGraphics::Builder(builder) = &mut self.graphics {
            builder.build_and_send(event_loop);
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, graphics: Graphics) {
        self.graphics = MaybeGraphics::Graphics(graphics);
        self.initialize_application_state();
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            let now = Instant::now();
            let wait_dt = now - state.last_wait_time;
            state.last_wait_time = now;

            let actions = state.input.take_actions();
            state.engine_state.set_player_actions(actions);
            state.engine_state.process_update(wait_dt);

            state.frames_since_stats += 1;
            if state.frames_since_stats >= STATS_LOG_INTERVAL {
                state.frames_since_stats = 0;
                let stats = state.engine_state.stats();
                debug!(
                    "regions: {} rendered of {} loaded, {} queued, load in flight: {}",
                    stats.rendered, stats.loaded, stats.queued, stats.load_in_flight
                );
            }

            state.window.request_redraw();
        }
    }
}
