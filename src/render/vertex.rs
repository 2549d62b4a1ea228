//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

/// Simple 2D vertex with position and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    /// Byte stride for a host's vertex buffer layout
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();
    /// Offset of `color` within a vertex
    pub const COLOR_OFFSET: usize = std::mem::size_of::<[f32; 2]>();
}

/// Scene colors
pub mod colors {
    pub const BACKGROUND: [f32; 4] = [0.02, 0.02, 0.05, 1.0];
    pub const STAR: [f32; 4] = [0.75, 0.8, 1.0, 1.0];
    pub const TOUGH_OUTLINE: [f32; 4] = [0.9, 0.85, 0.3, 1.0];
    pub const QUESTION_OUTLINE: [f32; 4] = [0.6, 0.2, 0.8, 1.0];
    pub const HOVER_GLOW: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    pub const LABEL: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    pub const SHOCKWAVE: [f32; 4] = [1.0, 0.9, 0.7, 1.0];
    /// Fill alpha for hidden bubbles
    pub const HIDDEN_ALPHA: f32 = 0.12;
}

/// Replace a color's alpha
#[inline]
pub fn with_alpha(color: [f32; 4], alpha: f32) -> [f32; 4] {
    [color[0], color[1], color[2], alpha.clamp(0.0, 1.0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_pod() {
        let verts = [Vertex::new(1.0, 2.0, [0.1, 0.2, 0.3, 0.4])];
        let bytes: &[u8] = bytemuck::cast_slice(&verts);
        assert_eq!(bytes.len(), Vertex::STRIDE);
        assert_eq!(Vertex::STRIDE, 24);
        assert_eq!(Vertex::COLOR_OFFSET, 8);
    }

    #[test]
    fn test_with_alpha() {
        assert_eq!(with_alpha([1.0, 0.5, 0.2, 1.0], 0.3), [1.0, 0.5, 0.2, 0.3]);
        assert_eq!(with_alpha([1.0; 4], 2.0)[3], 1.0);
    }
}
