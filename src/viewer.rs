//! Windowed host: owns the winit event loop and forwards input to a
//! slideshow engine running on its own thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, KeyEvent, MouseButton, Touch, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowAttributes},
};

use crate::config::Configuration;
use crate::engine::Slideshow;
use crate::events::{Direction, SliderEvent, SliderInput, TouchPhase};
use crate::gpu::texture::GpuTexture;
use crate::gpu::{GpuContext, WgpuRenderer};
use crate::loader::{TextureFactory, UrlImageSource};
use crate::render::SurfaceSize;

const INPUT_QUEUE: usize = 64;

#[derive(Debug, Clone, Copy)]
enum ViewerEvent {
    Cancelled,
    EngineStopped,
}

struct EngineHandle {
    inputs: mpsc::Sender<SliderInput>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl EngineHandle {
    fn send(&self, input: SliderInput) {
        if let Err(err) = self.inputs.try_send(input) {
            debug!(error = %err, "dropping slideshow input");
        }
    }

    fn join(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        match thread.join() {
            Ok(result) => result,
            Err(_) => anyhow::bail!("slideshow engine thread panicked"),
        }
    }
}

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    proxy: EventLoopProxy<ViewerEvent>,
    window: Option<Arc<Window>>,
    engine: Option<EngineHandle>,
    occluded: bool,
    cursor: PhysicalPosition<f64>,
    failure: Option<anyhow::Error>,
}

impl ViewerApp {
    fn new(cfg: Configuration, cancel: CancellationToken, proxy: EventLoopProxy<ViewerEvent>) -> Self {
        Self {
            cfg,
            cancel,
            proxy,
            window: None,
            engine: None,
            occluded: false,
            cursor: PhysicalPosition::new(0.0, 0.0),
            failure: None,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let settings = &self.cfg.window;
        let mut attrs = WindowAttributes::default()
            .with_title(settings.title.clone())
            .with_inner_size(LogicalSize::new(settings.width, settings.height));
        if settings.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create slideshow window");
                None
            }
        }
    }

    /// The engine needs a visible window with a real surface before it can
    /// load and draw anything.
    fn maybe_start_engine(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() || self.occluded || self.failure.is_some() {
            return;
        }
        let Some(window) = self.window.clone() else {
            return;
        };
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            debug!("window has no area yet; deferring engine start");
            return;
        }
        if let Err(err) = self.start_engine(window) {
            error!(error = ?err, "failed to start slideshow engine");
            self.failure = Some(err);
            event_loop.exit();
        }
    }

    fn start_engine(&mut self, window: Arc<Window>) -> Result<()> {
        let ctx = GpuContext::new(window).context("failed to initialize GPU")?;
        let gpu_max = ctx.max_texture_dimension();
        let max_dimension = self
            .cfg
            .max_texture_dimension
            .map_or(gpu_max, |limit| limit.min(gpu_max));
        let asset_root = self.cfg.asset_root.clone().unwrap_or_else(|| PathBuf::from("."));
        let source = Arc::new(UrlImageSource::new(asset_root, max_dimension));

        let (inputs_tx, inputs_rx) = mpsc::channel(INPUT_QUEUE);
        let cfg = self.cfg.clone();
        let cancel = self.cancel.clone();
        let proxy = self.proxy.clone();
        let thread = std::thread::Builder::new()
            .name("slideshow-engine".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .context("failed to build slideshow runtime")?;
                let result =
                    runtime.block_on(run_engine(cfg, ctx, source, inputs_rx, cancel));
                let _ = proxy.send_event(ViewerEvent::EngineStopped);
                result
            })
            .context("failed to spawn slideshow engine thread")?;

        info!(max_dimension, "slideshow engine started");
        self.engine = Some(EngineHandle {
            inputs: inputs_tx,
            thread: Some(thread),
        });
        Ok(())
    }

    fn send(&self, input: SliderInput) {
        if let Some(engine) = self.engine.as_ref() {
            engine.send(input);
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut engine) = self.engine.take() {
            engine.send(SliderInput::Unmount);
            if let Err(err) = engine.join() {
                error!(error = ?err, "slideshow engine failed");
                self.failure.get_or_insert(err);
            }
        }
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        match event.logical_key {
            Key::Named(NamedKey::ArrowLeft) => self.send(SliderInput::Navigate(Direction::Prev)),
            Key::Named(NamedKey::ArrowRight) => self.send(SliderInput::Navigate(Direction::Next)),
            Key::Named(NamedKey::Escape) => {
                info!("escape pressed; closing");
                self.cancel.cancel();
                self.shutdown(event_loop);
            }
            _ => {}
        }
    }

    fn handle_touch(&self, touch: Touch) {
        let phase = match touch.phase {
            winit::event::TouchPhase::Started => TouchPhase::Started,
            winit::event::TouchPhase::Moved => TouchPhase::Moved,
            winit::event::TouchPhase::Ended => TouchPhase::Ended,
            winit::event::TouchPhase::Cancelled => TouchPhase::Cancelled,
        };
        self.send(SliderInput::Touch {
            phase,
            x: touch.location.x as f32,
            y: touch.location.y as f32,
        });
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        if self.ensure_window(event_loop).is_none() {
            event_loop.exit();
            return;
        }
        self.maybe_start_engine(event_loop);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("slideshow window close requested");
                self.cancel.cancel();
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => {
                self.send(SliderInput::Resize(SurfaceSize::new(size.width, size.height)));
                self.maybe_start_engine(event_loop);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.send(SliderInput::Resize(SurfaceSize::new(size.width, size.height)));
            }
            WindowEvent::Occluded(occluded) => {
                self.occluded = occluded;
                self.send(SliderInput::Visibility(!occluded));
                self.maybe_start_engine(event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                self.send(SliderInput::Click {
                    x: self.cursor.x as f32,
                    y: self.cursor.y as f32,
                });
            }
            WindowEvent::Touch(touch) => self.handle_touch(touch),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, event),
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                self.shutdown(event_loop);
            }
            ViewerEvent::EngineStopped => {
                debug!("slideshow engine stopped");
                self.shutdown(event_loop);
            }
        }
    }
}

async fn run_engine(
    cfg: Configuration,
    ctx: GpuContext,
    source: Arc<UrlImageSource>,
    inputs: mpsc::Receiver<SliderInput>,
    cancel: CancellationToken,
) -> Result<()> {
    let factory: Arc<dyn TextureFactory<Texture = GpuTexture>> = Arc::new(ctx.texture_factory());
    let renderer = WgpuRenderer::new(ctx, cfg.fit, &cfg.overlay);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let logger = tokio::spawn(log_events(events_rx));

    let init = Slideshow::init(
        cfg.slides.clone(),
        cfg.slideshow_options(),
        renderer,
        source,
        factory,
        events_tx,
    );
    let slideshow = tokio::select! {
        _ = cancel.cancelled() => {
            info!("cancelled during slideshow initialization");
            return Ok(());
        }
        slideshow = init => slideshow.context("failed to initialize slideshow")?,
    };

    let result = slideshow.run(inputs, cancel).await;
    if let Err(err) = logger.await {
        warn!(error = %err, "event logger task failed");
    }
    result.context("slideshow stopped with an error")
}

async fn log_events(mut events: mpsc::UnboundedReceiver<SliderEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SliderEvent::Ready { slides } => info!(slides, "slideshow ready"),
            SliderEvent::TransitionStarted {
                from,
                to,
                direction,
                trigger,
            } => debug!(from, to, ?direction, ?trigger, "transition started"),
            SliderEvent::SlideChanged { index } => info!(index, "slide changed"),
            SliderEvent::TransitionAborted { from, to, reason } => {
                warn!(from, to, %reason, "transition aborted")
            }
            SliderEvent::CallToAction { index, link } => {
                info!(index, %link, "call to action activated")
            }
            SliderEvent::Disposed => debug!("slideshow disposed"),
        }
    }
}

/// Run the slideshow window on the calling thread until it closes or
/// `cancel` fires.
pub fn run_windowed(cfg: Configuration, cancel: CancellationToken) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        let proxy = proxy.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = ViewerApp::new(cfg, cancel, proxy);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("viewer event loop failed")?;
    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
