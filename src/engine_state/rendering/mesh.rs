//! # Mesh Module
//!
//! The shared per-voxel cube mesh, described as parallel arrays of vertex
//! positions, vertex colors, texture coordinates and triangle indices.
//! The same format deserializes from a JSON mesh asset; the built-in cube
//! is used when no asset is supplied. One mesh upload is shared by every
//! region and instance group.

use serde::Deserialize;

use super::Gpu;

/// A triangle mesh in parallel-array form.
///
/// `vertices` and `colors` hold three floats per vertex, `texcoords` two.
/// Indices are 16-bit; a cube needs 24 vertices and 36 indices.
#[derive(Clone, Debug, Deserialize)]
pub struct Mesh {
    /// Vertex positions, xyz per vertex.
    pub vertices: Vec<f32>,
    /// Vertex colors, rgb per vertex.
    pub colors: Vec<f32>,
    /// Texture coordinates, uv per vertex.
    pub texcoords: Vec<f32>,
    /// Triangle list indices.
    pub indices: Vec<u16>,
}

/// Corner positions for each cube face, wound counter-clockwise when
/// viewed from outside so back-face culling keeps the outside visible.
#[rustfmt::skip]
const CUBE_FACES: [[[f32; 3]; 4]; 6] = [
    // +x
    [[ 0.5, -0.5,  0.5], [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5]],
    // -x
    [[-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5]],
    // +y
    [[-0.5,  0.5,  0.5], [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5], [-0.5,  0.5, -0.5]],
    // -y
    [[-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5]],
    // +z
    [[-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5]],
    // -z
    [[ 0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5]],
];

impl Mesh {
    /// Parses a mesh from its JSON asset form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// The built-in unit cube, spanning half a unit around the origin on
    /// every axis to match voxel bounds.
    pub fn cube() -> Self {
        let mut vertices = Vec::with_capacity(6 * 4 * 3);
        let mut colors = Vec::with_capacity(6 * 4 * 3);
        let mut texcoords = Vec::with_capacity(6 * 4 * 2);
        let mut indices = Vec::with_capacity(6 * 6);

        for (face_index, corners) in CUBE_FACES.iter().enumerate() {
            for corner in corners {
                vertices.extend_from_slice(corner);
                colors.extend_from_slice(&[1.0, 1.0, 1.0]);
            }
            texcoords.extend_from_slice(&[0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);

            let base = (face_index * 4) as u16;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            vertices,
            colors,
            texcoords,
            indices,
        }
    }

    /// Number of vertices described by the parallel arrays.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Whether the parallel arrays agree on the vertex count and every
    /// index points at a real vertex.
    pub fn is_consistent(&self) -> bool {
        let vertex_count = self.vertex_count();
        self.vertices.len() % 3 == 0
            && self.colors.len() == vertex_count * 3
            && self.texcoords.len() == vertex_count * 2
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|i| (*i as usize) < vertex_count)
    }
}

/// The mesh uploaded to the GPU, one buffer per attribute array.
pub struct MeshBuffers {
    /// Vertex position buffer.
    pub vertex_buffer: wgpu::Buffer,
    /// Vertex color buffer.
    pub color_buffer: wgpu::Buffer,
    /// Texture coordinate buffer.
    pub texcoord_buffer: wgpu::Buffer,
    /// 16-bit index buffer, padded to a four-byte multiple.
    pub index_buffer: wgpu::Buffer,
    /// Number of indices to draw (before padding).
    pub index_count: u32,
}

impl MeshBuffers {
    /// Uploads `mesh` to the device.
    ///
    /// # Panics
    /// Panics if the mesh's parallel arrays are inconsistent; a malformed
    /// shared mesh would poison every draw in the application.
    pub fn new(gpu: &Gpu, mesh: &Mesh) -> Self {
        assert!(mesh.is_consistent(), "mesh parallel arrays are inconsistent");

        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh vertex positions"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let color_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh vertex colors"),
                contents: bytemuck::cast_slice(&mesh.colors),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let texcoord_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh texcoords"),
                contents: bytemuck::cast_slice(&mesh.texcoords),
                usage: wgpu::BufferUsages::VERTEX,
            });

        // Index data must be a multiple of four bytes; u16 indices need a
        // pad entry when the count is odd.
        let mut indices = mesh.indices.clone();
        if indices.len() % 2 == 1 {
            indices.push(0);
        }
        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh indices"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            color_buffer,
            texcoord_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_arrays_are_consistent() {
        let cube = Mesh::cube();

        assert!(cube.is_consistent());
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices.len(), 36);
    }

    #[test]
    fn cube_spans_half_a_unit_in_every_direction() {
        let cube = Mesh::cube();
        for chunk in cube.vertices.chunks(3) {
            for component in chunk {
                assert!(component.abs() == 0.5);
            }
        }
    }

    #[test]
    fn json_asset_round_trips() {
        let json = r#"{
            "vertices": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            "colors": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            "texcoords": [0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            "indices": [0, 1, 2]
        }"#;

        let mesh = Mesh::from_json(json).expect("should parse");
        assert!(mesh.is_consistent());
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn inconsistent_arrays_are_detected() {
        let mut mesh = Mesh::cube();
        mesh.colors.pop();
        assert!(!mesh.is_consistent());

        let mut mesh = Mesh::cube();
        mesh.indices.push(99);
        assert!(!mesh.is_consistent());
    }
}
