//! The solar system this demo flies through.

use glam::{Mat4, Quat, Vec3, Vec4};
use orrery::{
    mesh,
    scene::{random_tilt, BodyDesc, Hierarchy, HierarchyError, OrbitalParams},
    types::{BlendMode, BodyId, ParticleSpace},
    world::{Belt, EmitterAttachment, LightSource, SceneLight},
    Emitter, EmitterSettings, World,
};
use orrery_framework::AssetLoader;
use orrery_routine::SceneAssets;
use rand::{rngs::StdRng, Rng};

/// Largest tilt of the whole system away from the horizontal, degrees.
const MAX_TILT: f32 = 12.0;
const MAX_ROOT_OFFSET: f32 = 4.0;

pub const BELT_COUNT: usize = 400;
const BELT_INNER: f32 = 62.0;
const BELT_OUTER: f32 = 72.0;
const BELT_SPIN: f32 = 0.02;

const SKYBOX_FACES: [&str; 6] = [
    "skybox/right.jpg",
    "skybox/left.jpg",
    "skybox/top.jpg",
    "skybox/bottom.jpg",
    "skybox/front.jpg",
    "skybox/back.jpg",
];

/// Pre-order body list. Moons are nested one level below their planet and
/// inherit its scale, so their orbit radius and size are in planet units.
pub fn bodies() -> Vec<BodyDesc> {
    vec![
        BodyDesc::new(BodyId::Sun, 0, OrbitalParams::circular(0.0, 0.0, 0.05, 8.0))
            .unlit()
            .with_texture("textures/sun.jpg"),
        BodyDesc::new(BodyId::Mercury, 0, OrbitalParams::circular(16.0, 0.45, 0.3, 0.8))
            .with_texture("textures/mercury.jpg"),
        BodyDesc::new(BodyId::Earth, 0, OrbitalParams::circular(28.0, 0.2, 0.8, 1.6))
            .with_texture("textures/earth.jpg"),
        BodyDesc::new(BodyId::Moon, 1, OrbitalParams::circular(2.5, 1.1, 0.4, 0.27))
            .with_texture("textures/moon.jpg"),
        BodyDesc::new(BodyId::Mars, 0, OrbitalParams::circular(40.0, 0.14, 0.7, 1.2))
            .with_texture("textures/mars.jpg"),
        BodyDesc::new(BodyId::Jupiter, 0, OrbitalParams::circular(88.0, 0.06, 1.2, 4.5))
            .with_texture("textures/jupiter.jpg"),
        BodyDesc::new(BodyId::Io, 1, OrbitalParams::circular(1.9, 0.9, 0.3, 0.12))
            .with_texture("textures/io.jpg"),
        BodyDesc::new(BodyId::Saturn, 0, OrbitalParams::circular(118.0, 0.04, 1.0, 3.8))
            .with_texture("textures/saturn.jpg"),
    ]
}

/// Hierarchy under a seeded random tilt.
pub fn hierarchy(rng: &mut StdRng) -> Result<Hierarchy, HierarchyError> {
    Hierarchy::new(random_tilt(rng, MAX_TILT, MAX_ROOT_OFFSET), bodies())
}

/// Belt-relative asteroid transforms: a flat ring between the inner and outer radius.
pub fn belt_instances(rng: &mut impl Rng, count: usize) -> Vec<Mat4> {
    (0..count)
        .map(|_| {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = rng.gen_range(BELT_INNER..BELT_OUTER);
            let height = rng.gen_range(-1.0..1.0);
            let scale = rng.gen_range(0.15..0.45);
            let axis = Vec3::new(rng.gen(), rng.gen(), rng.gen()).try_normalize().unwrap_or(Vec3::Y);
            let spin = Quat::from_axis_angle(axis, rng.gen_range(0.0..std::f32::consts::TAU));

            Mat4::from_scale_rotation_translation(
                Vec3::splat(scale),
                spin,
                Vec3::new(angle.cos() * radius, height, angle.sin() * radius),
            )
        })
        .collect()
}

/// Adds lights, emitters and the belt.
pub fn populate(world: &mut World, rng: &mut StdRng, belt: Vec<Mat4>) {
    world.add_light(SceneLight {
        source: LightSource::Body(BodyId::Sun),
        color: Vec3::new(1.0, 0.95, 0.85),
        intensity: 1.0,
    });
    world.add_light(SceneLight {
        source: LightSource::Fixed(Vec3::new(0.0, 45.0, -30.0)),
        color: Vec3::new(0.4, 0.5, 1.0),
        intensity: 0.35,
    });

    world.add_emitter(
        Emitter::new(
            EmitterSettings {
                capacity: 800,
                spawn_amount: 6,
                range: 8.5,
                life: 1.5,
                size: 0.9,
                color: Vec4::new(1.0, 0.6, 0.2, 1.0),
                blend: BlendMode::Additive,
                space: ParticleSpace::World,
                ..EmitterSettings::default()
            },
            rng.gen(),
        ),
        EmitterAttachment::Body {
            id: BodyId::Sun,
            velocity: Vec3::ZERO,
        },
    );
    world.add_emitter(
        Emitter::new(
            EmitterSettings {
                capacity: 300,
                spawn_amount: 2,
                range: 0.08,
                life: 0.6,
                size: 0.06,
                color: Vec4::new(0.4, 0.7, 1.0, 1.0),
                blend: BlendMode::Additive,
                space: ParticleSpace::Local,
                ..EmitterSettings::default()
            },
            rng.gen(),
        ),
        EmitterAttachment::Ship {
            offset: Vec3::new(0.0, 0.0, 1.0),
            speed: 1.5,
        },
    );
    world.add_emitter(
        Emitter::new(
            EmitterSettings {
                capacity: 600,
                spawn_amount: 3,
                range: 0.4,
                life: 3.0,
                size: 0.25,
                color: Vec4::new(0.8, 0.9, 1.0, 1.0),
                blend: BlendMode::Alpha,
                space: ParticleSpace::Local,
                ..EmitterSettings::default()
            },
            rng.gen(),
        ),
        EmitterAttachment::Comet {
            orbit: OrbitalParams {
                speed: Vec3::new(0.08, 0.08, 0.08),
                distance: Vec3::new(140.0, 20.0, 60.0),
                ..OrbitalParams::fixed(1.0)
            },
            speed: 2.0,
        },
    );

    world.set_belt(Belt {
        instances: belt,
        spin_rate: BELT_SPIN,
    });
}

/// Meshes and textures for everything [`populate`] adds. Missing textures fall back to flat colors.
pub fn load_assets(loader: &AssetLoader, hierarchy: &Hierarchy, belt_instances: Vec<Mat4>) -> SceneAssets {
    profiling::scope!("load_assets");

    let body_textures = hierarchy
        .bodies()
        .iter()
        .filter_map(|body| {
            let texture = loader.load_texture_or_fallback(body.texture?, fallback_color(body.id));
            Some((body.id, texture))
        })
        .collect();

    SceneAssets {
        body_mesh: mesh::uv_sphere(48),
        marker_mesh: mesh::uv_sphere(8),
        ship_mesh: mesh::ship(),
        asteroid_mesh: mesh::uv_sphere(5),
        body_textures,
        belt_texture: Some(loader.load_texture_or_fallback("textures/asteroid.jpg", [110, 100, 90, 255])),
        skybox: loader.load_cube_or_fallback(SKYBOX_FACES, [2, 2, 8, 255]),
        belt_instances,
    }
}

fn fallback_color(id: BodyId) -> [u8; 4] {
    match id {
        BodyId::Sun => [255, 200, 80, 255],
        BodyId::Mercury => [150, 140, 130, 255],
        BodyId::Earth => [60, 110, 200, 255],
        BodyId::Moon => [180, 180, 180, 255],
        BodyId::Mars => [190, 90, 50, 255],
        BodyId::Jupiter => [200, 160, 120, 255],
        BodyId::Io => [220, 200, 90, 255],
        BodyId::Saturn => [210, 190, 140, 255],
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec2;
    use orrery::{CameraControls, WorldSettings};
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn every_body_is_placed_once() {
        let mut rng = StdRng::seed_from_u64(0);
        let hierarchy = hierarchy(&mut rng).unwrap();
        assert_eq!(hierarchy.bodies().len(), BodyId::ALL.len());
        assert_eq!(hierarchy.parent_of(BodyId::Moon), Some(BodyId::Earth));
        assert_eq!(hierarchy.parent_of(BodyId::Io), Some(BodyId::Jupiter));
        assert_eq!(hierarchy.parent_of(BodyId::Earth), None);
    }

    #[test]
    fn moons_inherit_planet_scale() {
        let mut rng = StdRng::seed_from_u64(7);
        let hierarchy = hierarchy(&mut rng).unwrap();
        let transforms = hierarchy.evaluate(3.0);
        let radius = |id| {
            transforms
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.world.x_axis.truncate().length())
                .unwrap()
        };
        assert!((radius(BodyId::Moon) - 1.6 * 0.27).abs() < 1e-4);
        assert!((radius(BodyId::Earth) - 1.6).abs() < 1e-4);
    }

    #[test]
    fn same_seed_same_system() {
        let a = hierarchy(&mut StdRng::seed_from_u64(5)).unwrap();
        let b = hierarchy(&mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a.root(), b.root());
        assert_eq!(
            belt_instances(&mut StdRng::seed_from_u64(5), 10),
            belt_instances(&mut StdRng::seed_from_u64(5), 10)
        );
    }

    #[test]
    fn belt_stays_in_its_ring() {
        let belt = belt_instances(&mut StdRng::seed_from_u64(1), BELT_COUNT);
        assert_eq!(belt.len(), BELT_COUNT);
        for instance in belt {
            let position = instance.w_axis.truncate();
            let radius = Vec3::new(position.x, 0.0, position.z).length();
            assert!(radius >= BELT_INNER - 1e-3 && radius <= BELT_OUTER + 1e-3);
            assert!(position.y.abs() <= 1.0);
        }
    }

    #[test]
    fn populated_world_emits() {
        let mut rng = StdRng::seed_from_u64(3);
        let hierarchy = hierarchy(&mut rng).unwrap();
        let mut world = World::new(WorldSettings::default(), hierarchy, UVec2::new(800, 600)).unwrap();
        let belt = belt_instances(&mut rng, 16);
        populate(&mut world, &mut rng, belt);
        assert_eq!(world.emitters().len(), 3);
        assert_eq!(world.belt().map(|b| b.instances.len()), Some(16));

        let mut controls = CameraControls::new();
        let mut snapshot = world.update(0.0, &mut controls);
        for _ in 0..10 {
            snapshot = world.update(0.05, &mut controls);
        }
        assert_eq!(snapshot.lights.len(), 2);
        assert!(snapshot.lights.iter().any(|l| l.marker));
        assert!(snapshot.belt.is_some());
        assert!(!snapshot.particles.is_empty());
    }
}
