//! Type declarations for the orrery solar system renderer.
//!
//! Everything in here is plain data shared between the simulation side
//! (`orrery`), the render routines (`orrery-routine`) and applications.

use std::{fmt, mem::size_of};

use bytemuck::{Pod, Zeroable};
pub use glam;
use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};
use thiserror::Error;

// WGPU REEXPORTS
#[doc(inline)]
pub use wgt::{Backend, Backends, Color, DeviceType, PresentMode, TextureFormat, TextureUsages};

/// Identity of every body in the solar system.
///
/// The set of bodies is closed; display strings live in [`BodyId::display_name`]
/// and are never used for comparisons.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyId {
    Sun,
    Mercury,
    Earth,
    Moon,
    Mars,
    Jupiter,
    Io,
    Saturn,
}

impl BodyId {
    pub const ALL: [BodyId; 8] = [
        BodyId::Sun,
        BodyId::Mercury,
        BodyId::Earth,
        BodyId::Moon,
        BodyId::Mars,
        BodyId::Jupiter,
        BodyId::Io,
        BodyId::Saturn,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            BodyId::Sun => "Sun",
            BodyId::Mercury => "Mercury",
            BodyId::Earth => "Earth",
            BodyId::Moon => "Moon",
            BodyId::Mars => "Mars",
            BodyId::Jupiter => "Jupiter",
            BodyId::Io => "Io",
            BodyId::Saturn => "Saturn",
        }
    }

    /// Whether the player can enter orbit around this body.
    ///
    /// The sun is the light source and is drawn unlit, so it only ever shows
    /// up as a selection candidate when the caller explicitly includes it.
    pub fn is_visitable(self) -> bool {
        !matches!(self, BodyId::Sun)
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How a translucent batch is combined with what is already in the target.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// No blending, writes replace the target.
    Opaque,
    /// `src * src_alpha + dst * (1 - src_alpha)`
    #[default]
    Alpha,
    /// `src * src_alpha + dst`
    Additive,
}

/// Coordinate space particles of an emitter live in.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ParticleSpace {
    /// Particles follow the emitter as it moves.
    Local,
    /// Particles stay where they were spawned.
    #[default]
    World,
}

/// Vertex layout shared by every mesh the renderer draws.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ModelVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl ModelVertex {
    pub const SIZE: u64 = size_of::<Self>() as u64;

    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self { position, normal, uv }
    }
}

/// The maximum amount of vertices any one mesh can have.
pub const MAX_VERTEX_COUNT: u32 = (1 << 24) - 1;

/// Error returned from mesh validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshValidationError {
    #[error("Mesh has {count} vertices when the vertex limit is {MAX_VERTEX_COUNT}")]
    ExceededMaxVertexCount { count: usize },
    #[error("Mesh has {count} indices which is not a multiple of three. Meshes are always composed of triangles")]
    IndexCountNotMultipleOfThree { count: usize },
    #[error(
        "Index at position {index} has the value {value} which is out of bounds for vertex buffers of {max} length"
    )]
    IndexOutOfBounds { index: usize, value: u32, max: u32 },
}

/// Triangle mesh in array-of-structures form, ready for upload.
#[derive(Debug, Default, Clone)]
pub struct Mesh {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Validates that all indices point at a vertex and form whole triangles.
    pub fn validate(&self) -> Result<(), MeshValidationError> {
        let vertex_count = self.vertices.len();
        let index_count = self.indices.len();

        if vertex_count > MAX_VERTEX_COUNT as usize {
            return Err(MeshValidationError::ExceededMaxVertexCount { count: vertex_count });
        }

        if index_count % 3 != 0 {
            return Err(MeshValidationError::IndexCountNotMultipleOfThree { count: index_count });
        }

        for (index, &value) in self.indices.iter().enumerate() {
            if value as usize >= vertex_count {
                return Err(MeshValidationError::IndexOutOfBounds {
                    index,
                    value,
                    max: vertex_count as u32,
                });
            }
        }

        Ok(())
    }
}

/// A bitmap image used as a data source for a texture.
#[derive(Debug, Clone)]
pub struct Texture {
    pub label: Option<String>,
    pub data: Vec<u8>,
    pub format: TextureFormat,
    pub size: UVec2,
}

impl Texture {
    /// Single texel texture used when a texture fails to load.
    pub fn fallback(color: [u8; 4]) -> Self {
        Self {
            label: Some(String::from("fallback texture")),
            data: color.to_vec(),
            format: TextureFormat::Rgba8UnormSrgb,
            size: UVec2::ONE,
        }
    }
}

/// Six faces of a cube map in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Debug, Clone)]
pub struct CubeTexture {
    pub label: Option<String>,
    pub faces: [Vec<u8>; 6],
    pub format: TextureFormat,
    pub size: u32,
}

impl CubeTexture {
    /// Uniformly colored single texel cube.
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            label: Some(String::from("solid cube texture")),
            faces: std::array::from_fn(|_| color.to_vec()),
            format: TextureFormat::Rgba8UnormSrgb,
            size: 1,
        }
    }
}

/// Per-instance data for instanced mesh batches.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct InstanceAbi {
    pub model: Mat4,
}

/// Per-instance data for one camera facing particle quad.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ParticleAbi {
    pub position: Vec3,
    pub size: f32,
    pub color: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_are_distinct() {
        let mut names: Vec<_> = BodyId::ALL.iter().map(|b| b.display_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BodyId::ALL.len());
    }

    #[test]
    fn sun_is_not_visitable() {
        assert!(!BodyId::Sun.is_visitable());
        assert!(BodyId::Moon.is_visitable());
    }

    #[test]
    fn mesh_validation() {
        let vertex = ModelVertex::default();
        let mut mesh = Mesh {
            vertices: vec![vertex; 3],
            indices: vec![0, 1, 2],
        };
        assert_eq!(mesh.validate(), Ok(()));

        mesh.indices.push(0);
        assert_eq!(
            mesh.validate(),
            Err(MeshValidationError::IndexCountNotMultipleOfThree { count: 4 })
        );

        mesh.indices = vec![0, 1, 3];
        assert_eq!(
            mesh.validate(),
            Err(MeshValidationError::IndexOutOfBounds {
                index: 2,
                value: 3,
                max: 3
            })
        );
    }

    #[test]
    fn abi_sizes() {
        assert_eq!(size_of::<ModelVertex>(), 32);
        assert_eq!(size_of::<ParticleAbi>(), 32);
        assert_eq!(size_of::<InstanceAbi>(), 64);
    }
}
