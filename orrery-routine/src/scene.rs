//! GPU copies of the scene's meshes and textures.

use std::ops::Range;

use glam::Mat4;
use orrery::{
    types::{BodyId, CubeTexture, InstanceAbi, Mesh, Texture},
    util::{bind_merge::BindGroupBuilder, typedefs::FastHashMap},
};
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    BindGroup, Buffer, BufferUsages, Device, IndexFormat, Queue, RenderPass,
};

use crate::{
    common::ShaderInterfaces,
    error::{allocated, RoutineError},
    upload::{GpuMesh, GpuTexture},
};

/// CPU side assets the routines upload once at startup.
pub struct SceneAssets {
    pub body_mesh: Mesh,
    pub marker_mesh: Mesh,
    pub ship_mesh: Mesh,
    pub asteroid_mesh: Mesh,
    /// Bodies without a texture are drawn with a plain white one.
    pub body_textures: Vec<(BodyId, Texture)>,
    pub belt_texture: Option<Texture>,
    pub skybox: CubeTexture,
    /// Belt-relative transforms of every asteroid.
    pub belt_instances: Vec<Mat4>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MeshKind {
    Body,
    Marker,
    Ship,
    Asteroid,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaterialKey {
    Body(BodyId),
    Belt,
    Plain,
}

/// One draw of one mesh with one slot of per-object uniforms.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ObjectDraw {
    pub mesh: MeshKind,
    pub material: MaterialKey,
    /// Dynamic offset into the object uniform buffer.
    pub offset: u32,
    pub stencil_reference: u32,
}

pub struct SceneResources {
    body: GpuMesh,
    marker: GpuMesh,
    ship: GpuMesh,
    asteroid: GpuMesh,
    body_materials: FastHashMap<BodyId, BindGroup>,
    belt_material: Option<BindGroup>,
    plain: BindGroup,
    belt_instances: Option<(Buffer, u32)>,
    pub skybox: GpuTexture,
}

impl SceneResources {
    pub fn new(
        device: &Device,
        queue: &Queue,
        interfaces: &ShaderInterfaces,
        assets: &SceneAssets,
    ) -> Result<Self, RoutineError> {
        profiling::scope!("SceneResources::new");

        let material = |texture: &Texture, label: &str| -> Result<BindGroup, RoutineError> {
            let gpu = GpuTexture::new_2d(device, queue, texture)?;
            Ok(BindGroupBuilder::new()
                .append_texture_view(&gpu.view)
                .build(device, Some(label), &interfaces.texture_bgl))
        };

        let mut body_materials = FastHashMap::default();
        for (id, texture) in &assets.body_textures {
            body_materials.insert(*id, material(texture, id.display_name())?);
        }
        let belt_material = assets
            .belt_texture
            .as_ref()
            .map(|texture| material(texture, "belt"))
            .transpose()?;
        let plain = material(&Texture::fallback([255; 4]), "plain")?;

        let belt_instances = if assets.belt_instances.is_empty() {
            None
        } else {
            let instances: Vec<InstanceAbi> = assets
                .belt_instances
                .iter()
                .map(|&model| InstanceAbi { model })
                .collect();
            let buffer = allocated(device, "belt instances", || {
                device.create_buffer_init(&BufferInitDescriptor {
                    label: Some("belt instances"),
                    contents: bytemuck::cast_slice(&instances),
                    usage: BufferUsages::VERTEX,
                })
            })?;
            Some((buffer, instances.len() as u32))
        };

        log::debug!(
            "Uploaded {} body textures and {} belt instances",
            body_materials.len(),
            assets.belt_instances.len()
        );

        Ok(Self {
            body: GpuMesh::new(device, "body mesh", &assets.body_mesh)?,
            marker: GpuMesh::new(device, "marker mesh", &assets.marker_mesh)?,
            ship: GpuMesh::new(device, "ship mesh", &assets.ship_mesh)?,
            asteroid: GpuMesh::new(device, "asteroid mesh", &assets.asteroid_mesh)?,
            body_materials,
            belt_material,
            plain,
            belt_instances,
            skybox: GpuTexture::new_cube(device, queue, &assets.skybox)?,
        })
    }

    fn mesh(&self, kind: MeshKind) -> &GpuMesh {
        match kind {
            MeshKind::Body => &self.body,
            MeshKind::Marker => &self.marker,
            MeshKind::Ship => &self.ship,
            MeshKind::Asteroid => &self.asteroid,
        }
    }

    fn material(&self, key: MaterialKey) -> &BindGroup {
        let material = match key {
            MaterialKey::Body(id) => self.body_materials.get(&id),
            MaterialKey::Belt => self.belt_material.as_ref(),
            MaterialKey::Plain => None,
        };
        material.unwrap_or(&self.plain)
    }

    pub fn belt_instances(&self) -> Option<(&Buffer, u32)> {
        self.belt_instances.as_ref().map(|(buffer, count)| (buffer, *count))
    }

    /// Binds groups 1 and 2 and the mesh, then draws it. The pipeline and group 0
    /// must already be set.
    pub fn record<'pass>(
        &'pass self,
        rpass: &mut RenderPass<'pass>,
        object_bg: &'pass BindGroup,
        draw: &ObjectDraw,
        instances: Range<u32>,
    ) {
        let mesh = self.mesh(draw.mesh);
        rpass.set_bind_group(1, object_bg, &[draw.offset]);
        rpass.set_bind_group(2, self.material(draw.material), &[]);
        rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        rpass.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
        rpass.draw_indexed(0..mesh.index_count, 0, instances);
    }
}
