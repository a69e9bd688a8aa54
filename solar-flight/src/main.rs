use glam::UVec2;
use orrery::{
    types::PresentMode, CameraControls, FrameClock, FrameClockSettings, FrameSnapshot, World, WorldSettings,
};
use orrery_framework::{AssetLoader, Grabber};
use orrery_routine::{RenderSettings, SceneAssets};
use rand::{rngs::StdRng, SeedableRng};
use winit::{
    event::Event,
    window::{Fullscreen, Window, WindowBuilder},
};

mod input;
mod options;
mod scene;

use input::InputState;
use options::{Options, HELP};

struct SolarFlight {
    options: Options,
    clock: FrameClock,
    controls: CameraControls,
    input: InputState,
    world: Option<World>,
}

impl SolarFlight {
    fn new(options: Options) -> Self {
        Self {
            clock: FrameClock::new(FrameClockSettings {
                max_dt: options.max_dt,
            }),
            controls: CameraControls::new(),
            input: InputState::new(options.absolute_mouse),
            world: None,
            options,
        }
    }
}

impl orrery_framework::App for SolarFlight {
    fn present_mode(&self) -> PresentMode {
        if self.options.vsync {
            PresentMode::AutoVsync
        } else {
            PresentMode::AutoNoVsync
        }
    }

    fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            bloom: self.options.bloom(),
            ..RenderSettings::default()
        }
    }

    fn setup(&mut self, _window: &Window, resolution: UVec2) -> anyhow::Result<SceneAssets> {
        profiling::scope!("SolarFlight::setup");

        let mut rng = StdRng::seed_from_u64(self.options.seed);
        let hierarchy = scene::hierarchy(&mut rng)?;
        let belt = scene::belt_instances(&mut rng, scene::BELT_COUNT);

        let loader = AssetLoader::new_local(&self.options.assets);
        let assets = scene::load_assets(&loader, &hierarchy, belt.clone());

        let mut world = World::new(WorldSettings::default(), hierarchy, resolution)?;
        scene::populate(&mut world, &mut rng, belt);
        self.world = Some(world);

        log::info!("Scene built from seed {}", self.options.seed);
        Ok(assets)
    }

    fn handle_event(&mut self, window: &Window, grabber: &mut Grabber, event: &Event<()>) {
        self.input.handle_event(&mut self.controls, window, grabber, event);
    }

    fn resize(&mut self, resolution: UVec2) {
        if let Some(world) = &mut self.world {
            world.resize(resolution);
        }
    }

    fn update(&mut self, _window: &Window) -> FrameSnapshot {
        let dt = self.clock.tick();
        match &mut self.world {
            Some(world) => world.update(dt, &mut self.controls),
            None => FrameSnapshot::default(),
        }
    }
}

fn main() {
    let options = match Options::from_env() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}\n\n{HELP}");
            std::process::exit(1);
        }
    };
    if options.help {
        print!("{HELP}");
        return;
    }

    let mut window_builder = WindowBuilder::new().with_title("solar-flight");
    if options.fullscreen {
        window_builder = window_builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }

    if let Err(e) = orrery_framework::start(SolarFlight::new(options), window_builder) {
        eprintln!("solar-flight failed to start: {e:?}");
        std::process::exit(1);
    }
}
