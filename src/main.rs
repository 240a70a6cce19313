//! # Voxel Space Application Entry Point
//!
//! Native entry point; all the work happens in the library's `run()`.
//!
//! ```bash
//! cargo run --release
//! ```

fn main() {
    voxel_space::run();
}
