//! # Geometry Module
//!
//! Stateless math primitives shared by the culling and picking code:
//! axis-aligned bounding boxes, planes, view frustums, and rays.
//!
//! None of these types touch the GPU. They exist so that the streaming and
//! rendering layers can reason about visibility with plain `cgmath` values.

pub mod aabb;
pub mod frustum;
pub mod plane;
pub mod ray;

pub use aabb::Aabb;
pub use frustum::Frustum;
pub use plane::Plane;
pub use ray::Ray;
