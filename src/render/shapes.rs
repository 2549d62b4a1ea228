//! Shape generation for 2D primitives, and a surface that collects them

use glam::Vec2;
use std::f32::consts::PI;

use super::Surface;
use super::vertex::Vertex;

/// Generate vertices for a filled circle
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 3) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        // Triangle from center to edge
        vertices.push(Vertex::new(center.x, center.y, color));
        vertices.push(Vertex::new(
            center.x + radius * theta1.cos(),
            center.y + radius * theta1.sin(),
            color,
        ));
        vertices.push(Vertex::new(
            center.x + radius * theta2.cos(),
            center.y + radius * theta2.sin(),
            color,
        ));
    }

    vertices
}

/// Generate vertices for a ring (hollow circle)
pub fn ring(
    center: Vec2,
    inner_radius: f32,
    outer_radius: f32,
    color: [f32; 4],
    segments: u32,
) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 6) as usize);
    let inner_radius = inner_radius.max(0.0);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;
        let (dir1, dir2) = (
            Vec2::new(theta1.cos(), theta1.sin()),
            Vec2::new(theta2.cos(), theta2.sin()),
        );

        let inner1 = center + dir1 * inner_radius;
        let outer1 = center + dir1 * outer_radius;
        let inner2 = center + dir2 * inner_radius;
        let outer2 = center + dir2 * outer_radius;

        // Two triangles per segment
        vertices.push(Vertex::new(inner1.x, inner1.y, color));
        vertices.push(Vertex::new(outer1.x, outer1.y, color));
        vertices.push(Vertex::new(inner2.x, inner2.y, color));

        vertices.push(Vertex::new(inner2.x, inner2.y, color));
        vertices.push(Vertex::new(outer1.x, outer1.y, color));
        vertices.push(Vertex::new(outer2.x, outer2.y, color));
    }

    vertices
}

/// Text the host should rasterize on top of the mesh
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub pos: Vec2,
    pub text: String,
    pub size: f32,
    pub color: [f32; 4],
}

/// Surface that tessellates every draw call into a triangle list.
///
/// A GPU host uploads `vertices` as-is and rasterizes `texts` with its own
/// font path. Headless runs and tests inspect the same buffers.
#[derive(Debug, Clone)]
pub struct MeshSurface {
    pub vertices: Vec<Vertex>,
    pub texts: Vec<TextRun>,
    pub clear_color: Option<[f32; 4]>,
    offset: Vec2,
    segments: u32,
}

impl MeshSurface {
    pub fn new(segments: u32) -> Self {
        Self {
            vertices: Vec::new(),
            texts: Vec::new(),
            clear_color: None,
            offset: Vec2::ZERO,
            segments: segments.max(3),
        }
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Vertex data ready for a buffer upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

impl Surface for MeshSurface {
    fn clear(&mut self, color: [f32; 4]) {
        self.vertices.clear();
        self.texts.clear();
        self.clear_color = Some(color);
    }

    fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: [f32; 4]) {
        if radius <= 0.0 || color[3] <= 0.0 {
            return;
        }
        self.vertices
            .extend(circle(center + self.offset, radius, color, self.segments));
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: [f32; 4]) {
        if radius <= 0.0 || width <= 0.0 || color[3] <= 0.0 {
            return;
        }
        let half = width * 0.5;
        self.vertices.extend(ring(
            center + self.offset,
            radius - half,
            radius + half,
            color,
            self.segments,
        ));
    }

    fn text(&mut self, pos: Vec2, text: &str, size: f32, color: [f32; 4]) {
        if text.is_empty() || color[3] <= 0.0 {
            return;
        }
        self.texts.push(TextRun {
            pos: pos + self.offset,
            text: text.to_string(),
            size,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_vertex_count() {
        let verts = circle(Vec2::ZERO, 10.0, [1.0; 4], 16);
        assert_eq!(verts.len(), 48);
        for v in verts.iter().skip(1).step_by(3) {
            let p = Vec2::from(v.position);
            assert!((p.length() - 10.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_ring_vertex_count() {
        let verts = ring(Vec2::ZERO, 8.0, 10.0, [1.0; 4], 12);
        assert_eq!(verts.len(), 72);
    }

    #[test]
    fn test_mesh_surface_applies_offset() {
        let mut mesh = MeshSurface::new(8);
        mesh.clear([0.0; 4]);
        mesh.set_offset(Vec2::new(5.0, -5.0));
        mesh.fill_circle(Vec2::new(100.0, 100.0), 10.0, [1.0; 4]);
        mesh.text(Vec2::new(10.0, 10.0), "hi", 12.0, [1.0; 4]);
        assert_eq!(mesh.vertices[0].position, [105.0, 95.0]);
        assert_eq!(mesh.texts[0].pos, Vec2::new(15.0, 5.0));
        assert_eq!(mesh.triangle_count(), 8);
        assert_eq!(mesh.as_bytes().len(), 24 * Vertex::STRIDE);
    }

    #[test]
    fn test_mesh_surface_skips_invisible() {
        let mut mesh = MeshSurface::new(8);
        mesh.fill_circle(Vec2::ZERO, 10.0, [1.0, 1.0, 1.0, 0.0]);
        mesh.stroke_circle(Vec2::ZERO, 0.0, 2.0, [1.0; 4]);
        mesh.text(Vec2::ZERO, "", 12.0, [1.0; 4]);
        assert!(mesh.vertices.is_empty());
        assert!(mesh.texts.is_empty());
    }

    #[test]
    fn test_clear_resets_buffers() {
        let mut mesh = MeshSurface::new(8);
        mesh.fill_circle(Vec2::ZERO, 10.0, [1.0; 4]);
        mesh.clear([0.1, 0.1, 0.1, 1.0]);
        assert!(mesh.vertices.is_empty());
        assert_eq!(mesh.clear_color, Some([0.1, 0.1, 0.1, 1.0]));
    }
}
