//! Torus mesh generation and its GPU buffers.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glow::HasContext;

use crate::error::{Error, Result};

/// Distance from the torus center to the center of the tube.
pub const MAJOR_RADIUS: f32 = 0.7;
/// Radius of the tube.
pub const MINOR_RADIUS: f32 = 0.3;
/// Smallest accepted subdivision count.
pub const MIN_TESSELLATION: u32 = 3;
/// Largest accepted subdivision count.
pub const MAX_TESSELLATION: u32 = 64;

/// Vertex attribute location of the position.
pub const ATTRIB_POSITION: u32 = 0;
/// Vertex attribute location of the normal.
pub const ATTRIB_NORMAL: u32 = 1;

/// A mesh vertex, ready for the GPU.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Unit normal.
    pub normal: [f32; 3],
}

/// An indexed triangle mesh of a torus lying in the XY plane.
#[derive(Debug, Clone)]
pub struct TorusMesh {
    n: u32,
    m: u32,
    /// Interleaved vertices, `(n + 1) * (m + 1)` of them (seams duplicated).
    pub vertices: Vec<Vertex>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl TorusMesh {
    /// Build a torus with `n` subdivisions around the axis of revolution and
    /// `m` around the tube. Both are clamped to
    /// [`MIN_TESSELLATION`]..=[`MAX_TESSELLATION`].
    #[allow(clippy::cast_precision_loss)]
    pub fn new(n: u32, m: u32) -> Self {
        let n = n.clamp(MIN_TESSELLATION, MAX_TESSELLATION);
        let m = m.clamp(MIN_TESSELLATION, MAX_TESSELLATION);

        let mut vertices = Vec::with_capacity(((n + 1) * (m + 1)) as usize);
        for i in 0..=n {
            let (sin_u, cos_u) = (TAU * i as f32 / n as f32).sin_cos();
            for j in 0..=m {
                let (sin_v, cos_v) = (TAU * j as f32 / m as f32).sin_cos();
                let ring = MAJOR_RADIUS + MINOR_RADIUS * cos_v;
                vertices.push(Vertex {
                    position: [ring * cos_u, ring * sin_u, MINOR_RADIUS * sin_v],
                    normal: [cos_v * cos_u, cos_v * sin_u, sin_v],
                });
            }
        }

        let stride = m + 1;
        let mut indices = Vec::with_capacity((6 * n * m) as usize);
        for i in 0..n {
            for j in 0..m {
                let a = i * stride + j;
                let b = (i + 1) * stride + j;
                let c = (i + 1) * stride + j + 1;
                let d = i * stride + j + 1;
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }

        Self {
            n,
            m,
            vertices,
            indices,
        }
    }

    /// Subdivisions around the axis of revolution.
    pub fn tessellation_n(&self) -> u32 {
        self.n
    }

    /// Subdivisions around the tube.
    pub fn tessellation_m(&self) -> u32 {
        self.m
    }

    /// Triangles drawn per instance.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A torus uploaded to a vertex array object.
pub struct TorusBuffers {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ebo: glow::Buffer,
    index_count: i32,
    tessellation: (u32, u32),
}

impl TorusBuffers {
    /// Create the buffers and upload `mesh`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if a GL object cannot be created.
    pub unsafe fn new(gl: &glow::Context, mesh: &TorusMesh) -> Result<Self> {
        let (vao, vbo, ebo) = unsafe {
            let vao = gl
                .create_vertex_array()
                .map_err(|e| Error::gl_object("vertex array", e))?;
            let vbo = gl.create_buffer().map_err(|e| Error::gl_object("buffer", e))?;
            let ebo = gl.create_buffer().map_err(|e| Error::gl_object("buffer", e))?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));

            // Vertex is 24 bytes, well within i32 range.
            #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let stride = std::mem::size_of::<Vertex>() as i32;
            gl.enable_vertex_attrib_array(ATTRIB_POSITION);
            gl.vertex_attrib_pointer_f32(ATTRIB_POSITION, 3, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(ATTRIB_NORMAL);
            gl.vertex_attrib_pointer_f32(ATTRIB_NORMAL, 3, glow::FLOAT, false, stride, 12);
            gl.bind_vertex_array(None);

            (vao, vbo, ebo)
        };

        let mut buffers = Self {
            vao,
            vbo,
            ebo,
            index_count: 0,
            tessellation: (0, 0),
        };
        unsafe { buffers.upload(gl, mesh)? };
        Ok(buffers)
    }

    /// Replace the uploaded mesh.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Fails if the index count does not fit a GL draw count. Nothing is
    /// uploaded in that case.
    pub unsafe fn upload(&mut self, gl: &glow::Context, mesh: &TorusMesh) -> Result<()> {
        let index_count = i32::try_from(mesh.indices.len()).map_err(|_| {
            Error::gl_object("index buffer", format!("{} indices", mesh.indices.len()))
        })?;
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.vertices),
                glow::STATIC_DRAW,
            );
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.ebo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.indices),
                glow::STATIC_DRAW,
            );
            gl.bind_vertex_array(None);
        }
        self.index_count = index_count;
        self.tessellation = (mesh.tessellation_n(), mesh.tessellation_m());
        tracing::debug!(
            n = mesh.tessellation_n(),
            m = mesh.tessellation_m(),
            triangles = mesh.triangle_count(),
            "torus uploaded"
        );
        Ok(())
    }

    /// `(n, m)` of the uploaded mesh.
    pub fn tessellation(&self) -> (u32, u32) {
        self.tessellation
    }

    /// Bind the vertex array for a run of draws.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn bind(&self, gl: &glow::Context) {
        unsafe { gl.bind_vertex_array(Some(self.vao)) };
    }

    /// Unbind the vertex array.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn unbind(gl: &glow::Context) {
        unsafe { gl.bind_vertex_array(None) };
    }

    /// Draw the bound torus once with `primitive` (`TRIANGLES` or `PATCHES`).
    ///
    /// # Safety
    ///
    /// Requires the vertex array to be bound via [`bind`](Self::bind).
    pub unsafe fn draw(&self, gl: &glow::Context, primitive: u32) {
        unsafe { gl.draw_elements(primitive, self.index_count, glow::UNSIGNED_INT, 0) };
    }

    /// Release the GL objects.
    ///
    /// # Safety
    ///
    /// Must be called exactly once, with the creating context current.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
            gl.delete_buffer(self.ebo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_tessellation() {
        let mesh = TorusMesh::new(8, 5);
        assert_eq!(mesh.vertices.len(), 9 * 6);
        assert_eq!(mesh.triangle_count(), 2 * 8 * 5);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn tessellation_is_clamped() {
        let low = TorusMesh::new(0, 1);
        assert_eq!((low.tessellation_n(), low.tessellation_m()), (3, 3));
        let high = TorusMesh::new(500, 65);
        assert_eq!((high.tessellation_n(), high.tessellation_m()), (64, 64));
    }

    #[test]
    fn vertices_lie_on_the_surface() {
        let mesh = TorusMesh::new(16, 12);
        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            let ring = (x * x + y * y).sqrt() - MAJOR_RADIUS;
            let tube = (ring * ring + z * z).sqrt();
            assert!((tube - MINOR_RADIUS).abs() < 1e-5);

            let [nx, ny, nz] = v.normal;
            assert!(((nx * nx + ny * ny + nz * nz).sqrt() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn outer_radius_is_one() {
        let mesh = TorusMesh::new(32, 32);
        let max = mesh
            .vertices
            .iter()
            .map(|v| (v.position[0].powi(2) + v.position[1].powi(2)).sqrt())
            .fold(0.0f32, f32::max);
        assert!((max - 1.0).abs() < 1e-5);
    }
}
