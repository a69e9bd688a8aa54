use glam::{Mat4, UVec2, Vec3};
use orrery::{
    scene::{BodyDesc, OrbitalParams},
    types::BodyId,
    world::{EmitterAttachment, LightSource, SceneLight},
    CameraControls, CameraSettings, Emitter, EmitterSettings, Hierarchy, World, WorldSettings,
};

fn system() -> Hierarchy {
    Hierarchy::new(
        Mat4::IDENTITY,
        vec![
            BodyDesc::new(BodyId::Sun, 0, OrbitalParams::fixed(3.0)).unlit(),
            BodyDesc::new(BodyId::Earth, 0, OrbitalParams::circular(10.0, 0.0, 0.5, 1.0)),
            BodyDesc::new(BodyId::Moon, 1, OrbitalParams::circular(2.0, 1.0, 0.0, 0.25)),
        ],
    )
    .unwrap()
}

fn world_near_earth() -> World {
    let settings = WorldSettings {
        camera: CameraSettings {
            spawn_position: Vec3::new(10.0, 2.0, -5.0),
            ..CameraSettings::default()
        },
        ..WorldSettings::default()
    };
    World::new(settings, system(), UVec2::new(1280, 720)).unwrap()
}

#[test]
fn moon_follows_earth() {
    let hierarchy = system();
    for t in [0.0, 1.5, 12.25] {
        let transforms = hierarchy.evaluate(t);
        assert_eq!(transforms, hierarchy.evaluate(t));

        let earth = transforms.iter().find(|b| b.id == BodyId::Earth).unwrap();
        let moon = transforms.iter().find(|b| b.id == BodyId::Moon).unwrap();
        let local = hierarchy.get(BodyId::Moon).unwrap().orbit.local_matrix(t);
        assert!(moon.world.abs_diff_eq(earth.world * local, 1e-5));
    }
}

#[test]
fn visit_round_trip_restores_the_camera() {
    let mut world = world_near_earth();
    let mut controls = CameraControls::new();

    let first = world.update(0.0, &mut controls);
    assert_eq!(first.selection.map(|s| s.id), Some(BodyId::Earth));
    assert!(world.selector().can_visit());
    let before = world.camera().pose();

    controls.press_visit();
    let visiting = world.update(0.016, &mut controls);
    assert_eq!(visiting.visiting, Some(BodyId::Earth));
    assert_eq!(visiting.ship, None);
    assert_ne!(world.camera().position(), before.position);

    controls.press_visit();
    let back = world.update(0.016, &mut controls);
    assert_eq!(back.visiting, None);
    assert!(back.ship.is_some());
    let after = world.camera().pose();
    assert_eq!(after.position, before.position);
    assert!(after.orientation.abs_diff_eq(before.orientation, 1e-6));
    assert_eq!(world.camera().velocity(), Vec3::ZERO);
}

#[test]
fn nothing_to_visit_out_of_range() {
    let settings = WorldSettings {
        camera: CameraSettings {
            spawn_position: Vec3::new(0.0, 200.0, 0.0),
            ..CameraSettings::default()
        },
        ..WorldSettings::default()
    };
    let mut world = World::new(settings, system(), UVec2::new(800, 600)).unwrap();
    let mut controls = CameraControls::new();

    world.update(0.0, &mut controls);
    assert!(!world.selector().can_visit());

    controls.press_visit();
    let snapshot = world.update(0.016, &mut controls);
    assert_eq!(snapshot.visiting, None);
    assert_eq!(snapshot.highlighted, None);
}

#[test]
fn emitters_stay_within_capacity() {
    let mut world = world_near_earth();
    world.add_light(SceneLight {
        source: LightSource::Body(BodyId::Sun),
        color: Vec3::ONE,
        intensity: 1.0,
    });
    world.add_emitter(
        Emitter::new(
            EmitterSettings {
                capacity: 20,
                spawn_amount: 8,
                ..EmitterSettings::default()
            },
            9,
        ),
        EmitterAttachment::Body {
            id: BodyId::Sun,
            velocity: Vec3::Y,
        },
    );

    let mut controls = CameraControls::new();
    controls.forward = true;
    for _ in 0..200 {
        let snapshot = world.update(0.05, &mut controls);
        let live = world.emitters()[0].emitter.live_count();
        assert!(live <= 20);
        let drawn: usize = snapshot.particles.iter().map(|batch| batch.instances.len()).sum();
        assert_eq!(drawn, live);
    }
}
