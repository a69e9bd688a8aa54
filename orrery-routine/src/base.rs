//! Starter render graph wiring every routine together.
//!
//! [`BaseRenderGraph::prepare`] turns a [`FrameSnapshot`] into uniform writes
//! and draw lists, then [`BaseRenderGraph::add_to_graph`] adds one node per
//! scheduled pass. Nothing the graph runs looks at the snapshot again.

use glam::{Mat4, Quat, UVec2, Vec3, Vec4};
use orrery::{
    graph::{RenderGraph, RenderTargetHandle},
    world::FrameSnapshot,
};
use wgpu::{Device, Queue, TextureFormat, TextureView};

use crate::{
    bloom::{BloomRoutine, BloomSettings},
    common::{FrameBindings, Samplers, ShaderInterfaces},
    composite::CompositeRoutine,
    error::RoutineError,
    forward::ForwardRoutine,
    outline::OutlineRoutine,
    particles::ParticleRoutine,
    scene::{MaterialKey, MeshKind, ObjectDraw, SceneAssets, SceneResources},
    schedule::{frame_schedule, BloomSource, BlurTarget, ScheduledPass},
    skybox::SkyboxRoutine,
    state::STENCIL_HIGHLIGHT,
    targets::{FrameTarget, FrameTargets, HdrTargets},
    uniforms::{FrameUniforms, ObjectSlots, ObjectUniforms, FLAG_UNLIT},
};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderSettings {
    pub ambient: Vec4,
    /// Tint multiplier of unlit bodies, pushing them into the bloom.
    pub emissive_strength: f32,
    pub ship_tint: Vec4,
    pub outline_color: Vec4,
    /// Scale of the outline shell relative to the highlighted body.
    pub outline_scale: f32,
    /// Radius of the sphere drawn at fixed lights.
    pub marker_scale: f32,
    pub bloom: BloomSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.04, 0.04, 0.06, 1.0),
            emissive_strength: 3.0,
            ship_tint: Vec4::new(0.7, 0.72, 0.8, 1.0),
            outline_color: Vec4::new(1.0, 0.65, 0.1, 1.0),
            outline_scale: 1.05,
            marker_scale: 0.5,
            bloom: BloomSettings::default(),
        }
    }
}

/// Draw lists for one frame, every entry pointing at its slot of object uniforms.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameDraws {
    /// Bodies, then the ship.
    pub opaque: Vec<ObjectDraw>,
    pub belt: Option<ObjectDraw>,
    pub markers: Vec<ObjectDraw>,
    pub outline: Option<ObjectDraw>,
}

/// Fills `slots` with the per-object uniforms of everything in `snapshot` and
/// returns the draws referencing them. Objects past the slot limit are dropped.
pub fn build_draws(snapshot: &FrameSnapshot, settings: &RenderSettings, slots: &mut ObjectSlots) -> FrameDraws {
    profiling::scope!("build_draws");

    slots.clear();
    let mut draws = FrameDraws::default();
    let mut dropped = 0;
    let mut push = |uniforms: ObjectUniforms, mesh, material, stencil_reference| match slots.push(&uniforms) {
        Some(offset) => Some(ObjectDraw {
            mesh,
            material,
            offset,
            stencil_reference,
        }),
        None => {
            dropped += 1;
            None
        }
    };

    for body in &snapshot.bodies {
        let (tint, flags) = if body.unlit {
            (Vec3::splat(settings.emissive_strength).extend(1.0), FLAG_UNLIT)
        } else {
            (Vec4::ONE, 0)
        };
        let stencil = if snapshot.highlighted == Some(body.id) {
            STENCIL_HIGHLIGHT
        } else {
            0
        };
        draws.opaque.extend(push(
            ObjectUniforms::new(body.world, tint, flags),
            MeshKind::Body,
            MaterialKey::Body(body.id),
            stencil,
        ));
    }

    if let Some(ship) = snapshot.ship {
        draws.opaque.extend(push(
            ObjectUniforms::new(ship, settings.ship_tint, 0),
            MeshKind::Ship,
            MaterialKey::Plain,
            0,
        ));
    }

    if let Some(belt) = snapshot.belt {
        draws.belt = push(ObjectUniforms::new(belt, Vec4::ONE, 0), MeshKind::Asteroid, MaterialKey::Belt, 0);
    }

    for light in snapshot.lights.iter().filter(|light| light.marker) {
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(settings.marker_scale),
            Quat::IDENTITY,
            light.position,
        );
        let tint = (light.color * light.intensity).extend(1.0);
        draws.markers.extend(push(
            ObjectUniforms::new(model, tint, FLAG_UNLIT),
            MeshKind::Marker,
            MaterialKey::Plain,
            0,
        ));
    }

    let highlighted = snapshot
        .highlighted
        .and_then(|id| snapshot.bodies.iter().find(|body| body.id == id));
    if let Some(body) = highlighted {
        let model = body.world * Mat4::from_scale(Vec3::splat(settings.outline_scale));
        draws.outline = push(
            ObjectUniforms::new(model, settings.outline_color, FLAG_UNLIT),
            MeshKind::Body,
            MaterialKey::Plain,
            STENCIL_HIGHLIGHT,
        );
    }

    if dropped > 0 {
        log::warn!("Object uniform buffer is full, dropped {dropped} objects this frame");
    }

    draws
}

/// Owns every routine and the resources they share.
pub struct BaseRenderGraph {
    pub interfaces: ShaderInterfaces,
    pub samplers: Samplers,
    settings: RenderSettings,
    bindings: FrameBindings,
    resources: SceneResources,
    targets: FrameTargets,

    skybox: SkyboxRoutine,
    forward: ForwardRoutine,
    outline: OutlineRoutine,
    particles: ParticleRoutine,
    bloom: BloomRoutine,
    composite: CompositeRoutine,

    slots: ObjectSlots,
    draws: FrameDraws,
    schedule: Vec<ScheduledPass>,
}

impl BaseRenderGraph {
    pub fn new(
        device: &Device,
        queue: &Queue,
        surface_format: TextureFormat,
        resolution: UVec2,
        assets: &SceneAssets,
        settings: RenderSettings,
    ) -> Result<Self, RoutineError> {
        profiling::scope!("BaseRenderGraph::new");

        let interfaces = ShaderInterfaces::new(device);
        let samplers = Samplers::new(device);
        let bindings = FrameBindings::new(device, &interfaces, &samplers)?;
        let resources = SceneResources::new(device, queue, &interfaces, assets)?;
        let targets = FrameTargets::new(device, resolution)?;

        let skybox = SkyboxRoutine::new(device, &interfaces, &resources.skybox)?;
        let forward = ForwardRoutine::new(device, &interfaces)?;
        let outline = OutlineRoutine::new(device, &interfaces)?;
        let particles = ParticleRoutine::new(device, &interfaces)?;
        let mut bloom = BloomRoutine::new(device, &interfaces)?;
        let mut composite = CompositeRoutine::new(device, &interfaces, surface_format, &settings.bloom)?;

        bloom.rebind(device, &interfaces, &samplers, &targets);
        composite.rebind(device, &interfaces, &samplers, &targets);

        log::info!("Render routines ready for a {surface_format:?} surface at {resolution}");

        Ok(Self {
            interfaces,
            samplers,
            settings,
            bindings,
            resources,
            targets,
            skybox,
            forward,
            outline,
            particles,
            bloom,
            composite,
            slots: ObjectSlots::new(),
            draws: FrameDraws::default(),
            schedule: Vec::new(),
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn set_bloom(&mut self, queue: &Queue, bloom: BloomSettings) {
        self.settings.bloom = bloom;
        self.composite.set_settings(queue, &bloom);
    }

    pub fn resolution(&self) -> UVec2 {
        self.targets.resolution
    }

    /// Reallocates the frame targets and every bind group reading from them.
    pub fn resize(&mut self, device: &Device, resolution: UVec2) -> Result<(), RoutineError> {
        profiling::scope!("BaseRenderGraph::resize");

        self.targets = FrameTargets::new(device, resolution)?;
        self.bloom
            .rebind(device, &self.interfaces, &self.samplers, &self.targets);
        self.composite
            .rebind(device, &self.interfaces, &self.samplers, &self.targets);
        Ok(())
    }

    /// Uploads everything the passes need for `snapshot` and decides the pass order.
    pub fn prepare(&mut self, device: &Device, queue: &Queue, snapshot: &FrameSnapshot) {
        profiling::scope!("BaseRenderGraph::prepare");

        self.draws = build_draws(snapshot, &self.settings, &mut self.slots);
        self.bindings.write(
            queue,
            &FrameUniforms::new(snapshot, self.settings.ambient),
            &self.slots,
        );
        self.particles.prepare(device, queue, &snapshot.particles);
        self.schedule = frame_schedule(snapshot, self.settings.bloom.passes);
    }

    /// Pass order decided by the last [`prepare`](Self::prepare).
    pub fn schedule(&self) -> &[ScheduledPass] {
        &self.schedule
    }

    /// Adds a node for every scheduled pass, ending in `surface`.
    pub fn add_to_graph<'node>(&'node self, graph: &mut RenderGraph<'node>, surface: &'node TextureView) {
        profiling::scope!("BaseRenderGraph::add_to_graph");

        let import = |graph: &mut RenderGraph<'node>, target: &'node FrameTarget| {
            graph.add_render_target(target.desc.clone(), target.view())
        };

        let hdr = HdrTargets {
            color: import(graph, &self.targets.hdr_color),
            bright: import(graph, &self.targets.hdr_bright),
            depth: import(graph, &self.targets.hdr_depth),
        };
        let blur_a = import(graph, &self.targets.blur_a);
        let blur_b = import(graph, &self.targets.blur_b);
        let surface = graph.add_output_target(
            self.composite.surface_descriptor(self.targets.resolution),
            Some(surface),
        );

        let bloom_handle = |source: BloomSource| -> RenderTargetHandle {
            match source {
                BloomSource::Bright => hdr.bright,
                BloomSource::BlurA => blur_a,
                BloomSource::BlurB => blur_b,
            }
        };

        let bindings = &self.bindings;
        let resources = &self.resources;
        for pass in &self.schedule {
            match *pass {
                ScheduledPass::Skybox => self.skybox.add_to_graph(graph, hdr, bindings),
                ScheduledPass::Opaque => {
                    self.forward
                        .add_opaque_to_graph(graph, hdr, bindings, resources, &self.draws.opaque);
                }
                ScheduledPass::Instanced => {
                    if let Some(ref draw) = self.draws.belt {
                        self.forward
                            .add_instanced_to_graph(graph, hdr, bindings, resources, draw);
                    }
                }
                ScheduledPass::LightMarkers => {
                    self.forward
                        .add_markers_to_graph(graph, hdr, bindings, resources, &self.draws.markers);
                }
                ScheduledPass::Outline => {
                    if let Some(ref draw) = self.draws.outline {
                        self.outline.add_to_graph(graph, hdr, bindings, resources, draw);
                    }
                }
                ScheduledPass::Particles { batch, blend } => {
                    self.particles.add_to_graph(graph, hdr, bindings, batch, blend);
                }
                ScheduledPass::Blur(step) => {
                    let target = match step.target {
                        BlurTarget::A => blur_a,
                        BlurTarget::B => blur_b,
                    };
                    self.bloom.add_to_graph(graph, step, bloom_handle(step.source), target);
                }
                ScheduledPass::Composite { bloom } => {
                    self.composite
                        .add_to_graph(graph, hdr.color, bloom_handle(bloom), bloom, surface);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use orrery::{
        types::BodyId,
        world::{BodySnapshot, LightSnapshot},
    };

    use super::*;
    use crate::uniforms::{MAX_OBJECTS, OBJECT_UNIFORM_STRIDE};

    fn snapshot() -> FrameSnapshot {
        FrameSnapshot {
            elapsed: 0.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
            bodies: vec![
                BodySnapshot {
                    id: BodyId::Sun,
                    world: Mat4::from_scale(Vec3::splat(5.0)),
                    unlit: true,
                },
                BodySnapshot {
                    id: BodyId::Earth,
                    world: Mat4::from_translation(Vec3::new(20.0, 0.0, 0.0)),
                    unlit: false,
                },
            ],
            highlighted: None,
            selection: None,
            visiting: None,
            ship: None,
            lights: Vec::new(),
            belt: None,
            particles: Vec::new(),
        }
    }

    fn uniforms_at(slots: &ObjectSlots, offset: u32) -> ObjectUniforms {
        let start = offset as usize;
        let end = start + std::mem::size_of::<ObjectUniforms>();
        bytemuck::pod_read_unaligned(&slots.as_bytes()[start..end])
    }

    #[test]
    fn bodies_get_consecutive_slots() {
        let mut slots = ObjectSlots::new();
        let draws = build_draws(&snapshot(), &RenderSettings::default(), &mut slots);

        assert_eq!(draws.opaque.len(), 2);
        assert_eq!(draws.opaque[0].offset, 0);
        assert_eq!(draws.opaque[1].offset, OBJECT_UNIFORM_STRIDE as u32);
        assert_eq!(draws.opaque[1].material, MaterialKey::Body(BodyId::Earth));
        assert!(draws.outline.is_none());
        assert!(draws.belt.is_none());
    }

    #[test]
    fn unlit_bodies_are_emissive() {
        let settings = RenderSettings::default();
        let mut slots = ObjectSlots::new();
        let draws = build_draws(&snapshot(), &settings, &mut slots);

        let sun = uniforms_at(&slots, draws.opaque[0].offset);
        assert_eq!(sun.flags, FLAG_UNLIT);
        assert_eq!(sun.tint.x, settings.emissive_strength);

        let earth = uniforms_at(&slots, draws.opaque[1].offset);
        assert_eq!(earth.flags, 0);
        assert_eq!(earth.tint, Vec4::ONE);
    }

    #[test]
    fn highlighted_body_is_stenciled_and_outlined() {
        let mut snapshot = snapshot();
        snapshot.highlighted = Some(BodyId::Earth);

        let settings = RenderSettings::default();
        let mut slots = ObjectSlots::new();
        let draws = build_draws(&snapshot, &settings, &mut slots);

        assert_eq!(draws.opaque[0].stencil_reference, 0);
        assert_eq!(draws.opaque[1].stencil_reference, STENCIL_HIGHLIGHT);

        let outline = draws.outline.unwrap();
        assert_eq!(outline.mesh, MeshKind::Body);
        let uniforms = uniforms_at(&slots, outline.offset);
        let expected = snapshot.bodies[1].world * Mat4::from_scale(Vec3::splat(settings.outline_scale));
        assert_eq!(uniforms.model, expected);
        assert_eq!(uniforms.tint, settings.outline_color);
    }

    #[test]
    fn ship_and_markers() {
        let mut snapshot = snapshot();
        snapshot.ship = Some(Mat4::from_translation(Vec3::Z));
        snapshot.belt = Some(Mat4::IDENTITY);
        snapshot.lights = vec![
            LightSnapshot {
                position: Vec3::ZERO,
                color: Vec3::ONE,
                intensity: 1.0,
                marker: false,
            },
            LightSnapshot {
                position: Vec3::new(0.0, 40.0, 0.0),
                color: Vec3::new(1.0, 0.5, 0.25),
                intensity: 2.0,
                marker: true,
            },
        ];

        let mut slots = ObjectSlots::new();
        let draws = build_draws(&snapshot, &RenderSettings::default(), &mut slots);

        assert_eq!(draws.opaque.last().unwrap().mesh, MeshKind::Ship);
        assert_eq!(draws.belt.unwrap().mesh, MeshKind::Asteroid);
        assert_eq!(draws.markers.len(), 1);

        let marker = uniforms_at(&slots, draws.markers[0].offset);
        assert_eq!(marker.flags, FLAG_UNLIT);
        assert_eq!(marker.tint, Vec4::new(2.0, 1.0, 0.5, 1.0));
        assert_eq!(marker.model.w_axis.truncate(), Vec3::new(0.0, 40.0, 0.0));
    }

    #[test]
    fn too_many_objects_are_dropped() {
        let mut snapshot = snapshot();
        let body = snapshot.bodies[1];
        snapshot.bodies = vec![body; MAX_OBJECTS + 3];

        let mut slots = ObjectSlots::new();
        let draws = build_draws(&snapshot, &RenderSettings::default(), &mut slots);

        assert_eq!(draws.opaque.len(), MAX_OBJECTS);
        assert_eq!(slots.len(), MAX_OBJECTS);
    }
}
