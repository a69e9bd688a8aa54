//! Window, surface and frame loop shared by orrery applications.
//!
//! An [`App`] describes its scene and reacts to input; [`start`] owns the
//! winit event loop, the wgpu surface and the [`BaseRenderGraph`], and renders
//! one [`FrameSnapshot`] per redraw.

use std::{future::Future, pin::Pin, sync::Arc};

use glam::UVec2;
use orrery::{
    types::{PresentMode, TextureFormat},
    FrameSnapshot, InstanceAdapterDevice, RenderGraph, RendererInitializationError,
};
use orrery_routine::{BaseRenderGraph, RenderSettings, SceneAssets};
use wgpu::{CompositeAlphaMode, Device, Surface, SurfaceConfiguration, SurfaceError, TextureUsages};
use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

mod assets;
mod grab;

pub use assets::*;
pub use grab::*;

pub trait App {
    fn register_logger(&mut self) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    fn create_iad<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = anyhow::Result<InstanceAdapterDevice>> + 'a>> {
        Box::pin(async move { Ok(orrery::create_iad(None, None).await?) })
    }

    fn present_mode(&self) -> PresentMode {
        PresentMode::AutoVsync
    }

    fn render_settings(&self) -> RenderSettings {
        RenderSettings::default()
    }

    /// Builds the simulation and returns the assets the renderer uploads once.
    fn setup(&mut self, window: &Window, resolution: UVec2) -> anyhow::Result<SceneAssets>;

    /// Sees every event before the framework acts on it.
    fn handle_event(&mut self, window: &Window, grabber: &mut Grabber, event: &Event<()>) {
        let _ = (window, grabber, event);
    }

    /// Called with the new surface size. Never called with a zero sized surface.
    fn resize(&mut self, resolution: UVec2) {
        let _ = resolution;
    }

    /// Runs the update phase of one frame.
    fn update(&mut self, window: &Window) -> FrameSnapshot;
}

/// Picks an sRGB format if the surface offers one so the composite can skip its own gamma.
pub fn choose_surface_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
    formats
        .iter()
        .copied()
        .find(TextureFormat::is_srgb)
        .or_else(|| formats.first().copied())
}

/// Extent of a window in pixels, or `None` while minimized.
pub fn surface_extent(size: PhysicalSize<u32>) -> Option<UVec2> {
    if size.width == 0 || size.height == 0 {
        None
    } else {
        Some(UVec2::new(size.width, size.height))
    }
}

struct SurfaceState {
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    /// Frames are skipped while the window has no area.
    minimized: bool,
}

impl SurfaceState {
    fn configure(&self, device: &Device) {
        log::debug!(
            "Configuring {:?} surface at {}x{}",
            self.config.format,
            self.config.width,
            self.config.height
        );
        self.surface.configure(device, &self.config);
    }

    fn resize(&mut self, device: &Device, size: PhysicalSize<u32>) -> Option<UVec2> {
        let Some(extent) = surface_extent(size) else {
            self.minimized = true;
            return None;
        };
        self.minimized = false;
        self.config.width = extent.x;
        self.config.height = extent.y;
        self.configure(device);
        Some(extent)
    }
}

fn redraw<A: App>(
    app: &mut A,
    window: &Window,
    iad: &InstanceAdapterDevice,
    surface: &SurfaceState,
    base: &mut BaseRenderGraph,
) -> Result<(), SurfaceError> {
    profiling::scope!("redraw");

    let snapshot = app.update(window);
    if surface.minimized {
        return Ok(());
    }
    base.prepare(&iad.device, &iad.queue, &snapshot);

    let frame = match surface.surface.get_current_texture() {
        Ok(frame) => frame,
        Err(SurfaceError::Lost | SurfaceError::Outdated) => {
            log::debug!("Surface lost, reconfiguring");
            surface.configure(&iad.device);
            return Ok(());
        }
        Err(SurfaceError::Timeout) => {
            log::warn!("Timed out acquiring a surface texture, skipping frame");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut graph = RenderGraph::new();
    base.add_to_graph(&mut graph, &view);
    graph.execute(&iad.device, &iad.queue);

    window.pre_present_notify();
    frame.present();

    profiling::finish_frame!();
    Ok(())
}

pub async fn async_start<A: App + 'static>(mut app: A, window_builder: WindowBuilder) -> anyhow::Result<()> {
    app.register_logger();

    let event_loop = EventLoop::new()?;
    // Invisible until the first frame is ready.
    let window = Arc::new({
        profiling::scope!("creating window");
        window_builder.with_visible(false).build(&event_loop)?
    });
    let window_size = window.inner_size();

    let iad = app.create_iad().await?;

    let surface = iad
        .instance
        .create_surface(Arc::clone(&window))
        .map_err(RendererInitializationError::SurfaceCreation)?;
    let caps = surface.get_capabilities(&iad.adapter);
    let format = choose_surface_format(&caps.formats).ok_or(RendererInitializationError::UnsupportedSurface)?;

    let mut surface = SurfaceState {
        surface,
        config: SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: window_size.width.max(1),
            height: window_size.height.max(1),
            present_mode: app.present_mode(),
            desired_maximum_frame_latency: 2,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: Vec::new(),
        },
        minimized: surface_extent(window_size).is_none(),
    };
    surface.configure(&iad.device);

    let resolution = UVec2::new(surface.config.width, surface.config.height);
    let assets = app.setup(&window, resolution)?;
    let mut base = BaseRenderGraph::new(
        &iad.device,
        &iad.queue,
        format,
        resolution,
        &assets,
        app.render_settings(),
    )?;
    drop(assets);

    window.set_visible(true);

    let mut grabber = Grabber::new();

    event_loop.run(move |event, event_loop_window_target| {
        event_loop_window_target.set_control_flow(ControlFlow::Poll);

        app.handle_event(&window, &mut grabber, &event);

        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => event_loop_window_target.exit(),
            Event::WindowEvent {
                event: WindowEvent::Resized(size),
                ..
            } => {
                log::debug!("resize {:?}", size);
                if let Some(resolution) = surface.resize(&iad.device, size) {
                    if let Err(e) = base.resize(&iad.device, resolution) {
                        log::error!("Failed to resize render targets: {e}");
                    }
                    app.resize(resolution);
                }
            }
            Event::WindowEvent {
                event: WindowEvent::RedrawRequested,
                ..
            } => {
                if let Err(e) = redraw(&mut app, &window, &iad, &surface, &mut base) {
                    log::error!("Surface failure: {e}");
                    event_loop_window_target.exit();
                }
            }
            Event::AboutToWait => window.request_redraw(),
            _ => {}
        }
    })?;

    Ok(())
}

pub fn start<A: App + 'static>(app: A, window_builder: WindowBuilder) -> anyhow::Result<()> {
    pollster::block_on(async_start(app, window_builder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_surface_is_preferred() {
        let formats = [TextureFormat::Bgra8Unorm, TextureFormat::Bgra8UnormSrgb];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Bgra8UnormSrgb));
        assert_eq!(
            choose_surface_format(&[TextureFormat::Rgba16Float]),
            Some(TextureFormat::Rgba16Float)
        );
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn zero_sized_windows_have_no_extent() {
        assert_eq!(surface_extent(PhysicalSize::new(0, 600)), None);
        assert_eq!(surface_extent(PhysicalSize::new(800, 0)), None);
        assert_eq!(surface_extent(PhysicalSize::new(800, 600)), Some(UVec2::new(800, 600)));
    }
}
