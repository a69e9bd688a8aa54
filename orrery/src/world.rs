//! The simulation side of a frame.
//!
//! [`World::update`] runs the whole update phase in a fixed order and returns a
//! [`FrameSnapshot`]. Rendering only ever reads the snapshot, so everything the
//! render routines see for a frame was finished before the first pass is
//! recorded.

use glam::{Mat4, UVec2, Vec3};
use orrery_types::{BlendMode, BodyId, ParticleAbi};

use crate::{
    camera::{Camera, CameraError, CameraSettings},
    controls::CameraControls,
    particles::Emitter,
    scene::{
        ship_transform, BodyTransform, Hierarchy, OrbitCamSettings, OrbitalParams, Selection, Selector,
        SelectorSettings, ShipSettings, VisitMode, VisitTransition,
    },
};

/// At most this many lights reach the shaders.
pub const MAX_LIGHTS: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldSettings {
    pub camera: CameraSettings,
    pub selector: SelectorSettings,
    pub orbit: OrbitCamSettings,
    pub ship: ShipSettings,
    /// Added to the camera's base speed while boosting.
    pub boost_speed: f32,
    /// Added to the field of view while boosting, degrees.
    pub boost_fov: f32,
    /// How fast the field of view eases toward its target, per second.
    pub fov_rate: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            selector: SelectorSettings::default(),
            orbit: OrbitCamSettings::default(),
            ship: ShipSettings::default(),
            boost_speed: 1.0,
            boost_fov: 15.0,
            fov_rate: 4.0,
        }
    }
}

/// Where a light is.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LightSource {
    /// At the center of a body. No marker is drawn, the body is the marker.
    Body(BodyId),
    /// At a fixed point relative to the system root, drawn with a marker.
    Fixed(Vec3),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneLight {
    pub source: LightSource,
    pub color: Vec3,
    pub intensity: f32,
}

/// What an emitter is attached to.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum EmitterAttachment {
    /// Emits from a body's center with a fixed velocity.
    Body { id: BodyId, velocity: Vec3 },
    /// Emits from a point in ship space, opposite the direction of travel. Silent while visiting.
    Ship { offset: Vec3, speed: f32 },
    /// Emits from a point on its own orbit around the root, streaming away from the sun.
    Comet { orbit: OrbitalParams, speed: f32 },
}

#[derive(Debug, Clone)]
pub struct SceneEmitter {
    pub emitter: Emitter,
    pub attachment: EmitterAttachment,
}

/// Ring of instances rotating around the system root.
#[derive(Debug, Clone)]
pub struct Belt {
    /// Instance transforms relative to the belt.
    pub instances: Vec<Mat4>,
    /// Radians per second around the root's up axis.
    pub spin_rate: f32,
}

/// Everything the renderer needs to know about one frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub elapsed: f32,
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub bodies: Vec<BodySnapshot>,
    /// Body to outline this frame.
    pub highlighted: Option<BodyId>,
    pub selection: Option<Selection>,
    pub visiting: Option<BodyId>,
    pub ship: Option<Mat4>,
    pub lights: Vec<LightSnapshot>,
    pub belt: Option<Mat4>,
    pub particles: Vec<ParticleBatch>,
}

impl FrameSnapshot {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub world: Mat4,
    pub unlit: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightSnapshot {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Draw a marker at the light's position.
    pub marker: bool,
}

/// Live particles of one emitter, drawn as one instanced batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBatch {
    pub blend: BlendMode,
    pub instances: Vec<ParticleAbi>,
}

pub struct World {
    settings: WorldSettings,
    camera: Camera,
    hierarchy: Hierarchy,
    selector: Selector,
    visit: VisitMode,
    lights: Vec<SceneLight>,
    emitters: Vec<SceneEmitter>,
    belt: Option<Belt>,

    transforms: Vec<BodyTransform>,
    elapsed: f32,
}

impl World {
    pub fn new(settings: WorldSettings, hierarchy: Hierarchy, viewport: UVec2) -> Result<Self, CameraError> {
        let camera = Camera::new(settings.camera, viewport)?;
        let transforms = hierarchy.evaluate(0.0);

        log::info!("World created with {} bodies", transforms.len());

        Ok(Self {
            camera,
            selector: Selector::new(settings.selector),
            visit: VisitMode::new(settings.orbit),
            hierarchy,
            lights: Vec::new(),
            emitters: Vec::new(),
            belt: None,
            transforms,
            elapsed: 0.0,
            settings,
        })
    }

    pub fn add_light(&mut self, light: SceneLight) {
        if self.lights.len() == MAX_LIGHTS {
            log::warn!("Ignoring light {:?}, at most {} lights are supported", light.source, MAX_LIGHTS);
            return;
        }
        self.lights.push(light);
    }

    pub fn add_emitter(&mut self, emitter: Emitter, attachment: EmitterAttachment) {
        self.emitters.push(SceneEmitter { emitter, attachment });
    }

    pub fn set_belt(&mut self, belt: Belt) {
        self.belt = Some(belt);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn visit(&self) -> &VisitMode {
        &self.visit
    }

    pub fn emitters(&self) -> &[SceneEmitter] {
        &self.emitters
    }

    pub fn belt(&self) -> Option<&Belt> {
        self.belt.as_ref()
    }

    pub fn transforms(&self) -> &[BodyTransform] {
        &self.transforms
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn resize(&mut self, viewport: UVec2) {
        self.camera.resize(viewport);
    }

    fn find(transforms: &[BodyTransform], id: BodyId) -> Option<&BodyTransform> {
        transforms.iter().find(|t| t.id == id)
    }

    /// Runs one frame of simulation. `dt` must already be sanitized by the caller's frame clock.
    pub fn update(&mut self, dt: f32, controls: &mut CameraControls) -> FrameSnapshot {
        profiling::scope!("World::update");

        let input = controls.take_frame();

        if input.toggle_visit {
            let transforms = &self.transforms;
            let transition = self.visit.toggle(&mut self.camera, &self.selector, |id| {
                Self::find(transforms, id).map(BodyTransform::position)
            });
            match transition {
                Some(VisitTransition::Entered(id)) => log::info!("Visiting {id}"),
                Some(VisitTransition::Exited(id)) => log::info!("Leaving {id}"),
                None => log::debug!("Nothing in range to visit"),
            }
        }

        let visiting = self.visit.is_visiting();

        // Input
        if visiting {
            if controls.dragging {
                self.visit.drag(input.look_delta.x, input.look_delta.y);
            }
            self.visit.zoom(input.scroll);
            self.camera.set_extra_speed(0.0);
        } else {
            if controls.forward {
                self.camera.move_forward();
            }
            if controls.backward {
                self.camera.move_backward();
            }
            if controls.left {
                self.camera.move_left();
            }
            if controls.right {
                self.camera.move_right();
            }
            self.camera.mouse_look(input.look_delta.x, input.look_delta.y);
            self.camera
                .set_extra_speed(if controls.boost { self.settings.boost_speed } else { 0.0 });
        }

        let boosting = controls.boost && !visiting;
        let target_fov = self.settings.camera.fov + if boosting { self.settings.boost_fov } else { 0.0 };
        let ease = 1.0 - (-self.settings.fov_rate * dt).exp();
        let fov = self.camera.fov();
        self.camera.set_fov(fov + (target_fov - fov) * ease);

        self.camera.update(dt);

        // Transforms
        self.elapsed += dt;
        self.hierarchy.evaluate_into(self.elapsed, &mut self.transforms);

        let ship = if visiting {
            None
        } else {
            Some(ship_transform(&self.camera, &self.settings.ship))
        };

        let player = ship.map_or(self.camera.position(), |s| s.w_axis.truncate());
        self.selector.update(&self.transforms, player, visiting);

        if let Some(target) = self.visit.target() {
            match Self::find(&self.transforms, target) {
                Some(body) => {
                    let radius = body.world.x_axis.truncate().length();
                    self.visit.apply(&mut self.camera, body.position(), radius);
                }
                None => {
                    log::warn!("Visited body {target} vanished, returning to free flight");
                    self.visit.exit(&mut self.camera);
                }
            }
        }

        self.update_emitters(dt, ship);

        self.snapshot(ship)
    }

    fn update_emitters(&mut self, dt: f32, ship: Option<Mat4>) {
        profiling::scope!("World::update_emitters");

        let sun = Self::find(&self.transforms, BodyId::Sun).map_or(Vec3::ZERO, BodyTransform::position);
        let root = self.hierarchy.root();

        for scene_emitter in &mut self.emitters {
            let source = match scene_emitter.attachment {
                EmitterAttachment::Body { id, velocity } => {
                    Self::find(&self.transforms, id).map(|b| (b.position(), velocity))
                }
                EmitterAttachment::Ship { offset, speed } => ship.map(|ship| {
                    let origin = ship.transform_point3(offset);
                    let backward = ship.transform_vector3(Vec3::Z).normalize_or_zero();
                    (origin, backward * speed)
                }),
                EmitterAttachment::Comet { orbit, speed } => {
                    let origin = root.transform_point3(orbit.translation(self.elapsed));
                    let away = (origin - sun).normalize_or_zero();
                    Some((origin, away * speed))
                }
            };

            if let Some((origin, velocity)) = source {
                scene_emitter.emitter.emit(dt, origin, velocity);
            }
            scene_emitter.emitter.step(dt);
        }
    }

    fn snapshot(&self, ship: Option<Mat4>) -> FrameSnapshot {
        let bodies = self
            .transforms
            .iter()
            .map(|t| BodySnapshot {
                id: t.id,
                world: t.world,
                unlit: self.hierarchy.get(t.id).map_or(false, |d| d.unlit),
            })
            .collect();

        let root = self.hierarchy.root();
        let lights = self
            .lights
            .iter()
            .filter_map(|light| {
                let (position, marker) = match light.source {
                    LightSource::Body(id) => (Self::find(&self.transforms, id)?.position(), false),
                    LightSource::Fixed(position) => (root.transform_point3(position), true),
                };
                Some(LightSnapshot {
                    position,
                    color: light.color,
                    intensity: light.intensity,
                    marker,
                })
            })
            .collect();

        let belt = self
            .belt
            .as_ref()
            .map(|belt| root * Mat4::from_rotation_y(belt.spin_rate * self.elapsed));

        let particles = self
            .emitters
            .iter()
            .filter(|e| e.emitter.live_count() > 0)
            .map(|e| {
                let mut instances = Vec::with_capacity(e.emitter.live_count());
                e.emitter.write_instances(&mut instances);
                ParticleBatch {
                    blend: e.emitter.settings().blend,
                    instances,
                }
            })
            .collect();

        let highlighted = if self.selector.can_visit() {
            self.selector.selection().map(|s| s.id)
        } else {
            None
        };

        FrameSnapshot {
            elapsed: self.elapsed,
            view: self.camera.view(),
            projection: self.camera.projection(),
            camera_position: self.camera.position(),
            bodies,
            highlighted,
            selection: self.selector.selection(),
            visiting: self.visit.target(),
            ship,
            lights,
            belt,
            particles,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, UVec2, Vec3};
    use orrery_types::{BlendMode, BodyId};

    use super::*;
    use crate::{
        particles::EmitterSettings,
        scene::{BodyDesc, OrbitalParams},
    };

    fn world() -> World {
        let bodies = vec![
            BodyDesc::new(BodyId::Sun, 0, OrbitalParams::fixed(5.0)).unlit(),
            BodyDesc::new(BodyId::Earth, 0, OrbitalParams::circular(20.0, 0.0, 0.0, 1.0)),
        ];
        let hierarchy = Hierarchy::new(Mat4::IDENTITY, bodies).unwrap();
        World::new(WorldSettings::default(), hierarchy, UVec2::new(800, 600)).unwrap()
    }

    #[test]
    fn snapshot_reflects_hierarchy() {
        let mut world = world();
        let mut controls = CameraControls::new();
        let snapshot = world.update(0.016, &mut controls);

        assert_eq!(snapshot.bodies.len(), 2);
        assert!(snapshot.bodies[0].unlit);
        assert!(!snapshot.bodies[1].unlit);
        assert!(snapshot.ship.is_some());
        assert_eq!(snapshot.visiting, None);
        assert!((snapshot.elapsed - 0.016).abs() < 1e-6);
    }

    #[test]
    fn nearby_body_is_highlighted_and_visitable() {
        let mut world = world();
        world.camera_mut().set_position(Vec3::new(0.0, 0.0, -20.0));
        let mut controls = CameraControls::new();
        let snapshot = world.update(0.016, &mut controls);
        assert_eq!(snapshot.highlighted, Some(BodyId::Earth));

        controls.press_visit();
        let snapshot = world.update(0.016, &mut controls);
        assert_eq!(snapshot.visiting, Some(BodyId::Earth));
        assert_eq!(snapshot.highlighted, None);
        assert_eq!(snapshot.ship, None);

        controls.press_visit();
        let snapshot = world.update(0.016, &mut controls);
        assert_eq!(snapshot.visiting, None);
    }

    #[test]
    fn far_away_selection_is_not_highlighted() {
        let mut world = world();
        world.camera_mut().set_position(Vec3::new(0.0, 0.0, -500.0));
        let mut controls = CameraControls::new();
        let snapshot = world.update(0.016, &mut controls);
        assert!(snapshot.selection.is_some());
        assert_eq!(snapshot.highlighted, None);

        controls.press_visit();
        let snapshot = world.update(0.016, &mut controls);
        assert_eq!(snapshot.visiting, None);
    }

    #[test]
    fn boost_widens_fov() {
        let mut world = world();
        let base = world.camera().fov();
        let mut controls = CameraControls::new();
        controls.boost = true;
        for _ in 0..120 {
            world.update(0.016, &mut controls);
        }
        assert!(world.camera().fov() > base + 10.0);

        controls.boost = false;
        for _ in 0..240 {
            world.update(0.016, &mut controls);
        }
        assert!((world.camera().fov() - base).abs() < 0.5);
    }

    #[test]
    fn emitters_produce_batches() {
        let mut world = world();
        world.add_emitter(
            Emitter::new(
                EmitterSettings {
                    blend: BlendMode::Alpha,
                    ..EmitterSettings::default()
                },
                1,
            ),
            EmitterAttachment::Body {
                id: BodyId::Sun,
                velocity: Vec3::Y,
            },
        );
        let mut controls = CameraControls::new();
        let snapshot = world.update(0.05, &mut controls);
        assert_eq!(snapshot.particles.len(), 1);
        assert_eq!(snapshot.particles[0].blend, BlendMode::Alpha);
        assert!(!snapshot.particles[0].instances.is_empty());
    }

    #[test]
    fn fixed_lights_get_markers() {
        let mut world = world();
        world.add_light(SceneLight {
            source: LightSource::Body(BodyId::Sun),
            color: Vec3::ONE,
            intensity: 1.0,
        });
        world.add_light(SceneLight {
            source: LightSource::Fixed(Vec3::new(0.0, 40.0, 0.0)),
            color: Vec3::ONE,
            intensity: 0.3,
        });
        let snapshot = world.update(0.016, &mut CameraControls::new());
        assert_eq!(snapshot.lights.len(), 2);
        assert!(!snapshot.lights[0].marker);
        assert!(snapshot.lights[1].marker);
        assert_eq!(snapshot.lights[1].position, Vec3::new(0.0, 40.0, 0.0));
    }

    #[test]
    fn light_count_is_capped() {
        let mut world = world();
        for _ in 0..MAX_LIGHTS + 2 {
            world.add_light(SceneLight {
                source: LightSource::Fixed(Vec3::ZERO),
                color: Vec3::ONE,
                intensity: 1.0,
            });
        }
        let snapshot = world.update(0.016, &mut CameraControls::new());
        assert_eq!(snapshot.lights.len(), MAX_LIGHTS);
    }
}
