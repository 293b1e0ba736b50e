pub mod gesture;
pub mod schedule;
pub mod transition;

use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use slide_model::{EffectDefaults, ResolvedEffect, Slide};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{LoadError, SliderError};
use crate::events::{Direction, SliderEvent, SliderInput, TouchPhase, Trigger};
use crate::layout::{Hit, OverlayLayout};
use crate::loader::{ImageSource, ResourceLoader, TextureFactory, TextureSet};
use crate::render::{Caption, FrameBindings, Renderer, TransitionUniforms};

use gesture::SwipeRecognizer;
use schedule::{AutoplayScheduler, ResizeDebounce};
use transition::{Ticket, TransitionController};

pub type EventSender = mpsc::UnboundedSender<SliderEvent>;

#[derive(Debug, Clone)]
pub struct SlideshowOptions {
    pub autoplay: bool,
    /// Prev/next buttons are drawn and clickable.
    pub show_controls: bool,
    pub defaults: EffectDefaults,
    pub resize_debounce: Duration,
    pub frame_interval: Duration,
}

impl Default for SlideshowOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            show_controls: true,
            defaults: EffectDefaults::default(),
            resize_debounce: Duration::from_millis(100),
            frame_interval: Duration::from_millis(16),
        }
    }
}

type MapPair<T> = (Arc<T>, Arc<T>);

/// Displacement maps for one transition, requested together.
struct PendingLoad<T> {
    generation: u64,
    requested_at: Instant,
    effect: ResolvedEffect,
    maps: BoxFuture<'static, Result<MapPair<T>, LoadError>>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveEffect {
    intensity: f32,
    direction: f32,
}

/// One slideshow instance: textures, cache, state machine, timers.
pub struct Slideshow<R: Renderer> {
    slides: Vec<Slide>,
    options: SlideshowOptions,
    renderer: R,
    loader: ResourceLoader<R::Texture>,
    textures: Option<TextureSet<R::Texture>>,
    displacement: Option<Arc<R::Texture>>,
    controller: TransitionController,
    autoplay: AutoplayScheduler,
    resize: ResizeDebounce,
    swipe: SwipeRecognizer,
    layout: OverlayLayout,
    pending: Option<PendingLoad<R::Texture>>,
    active: Option<ActiveEffect>,
    last_uniforms: TransitionUniforms,
    visible: bool,
    /// Set by an aborted transition; only a completed one clears it.
    autoplay_suspended: bool,
    disposed: bool,
    events: EventSender,
}

impl<R: Renderer> Slideshow<R> {
    /// Load every texture, draw the first slide and arm autoplay.
    ///
    /// # Errors
    /// `InvalidConfiguration` for an empty slide list, `ResourceLoad` if any
    /// slide image or the default displacement map fails, `Render` if the
    /// first frame cannot be drawn.
    pub async fn init(
        slides: Vec<Slide>,
        options: SlideshowOptions,
        renderer: R,
        source: Arc<dyn ImageSource>,
        factory: Arc<dyn TextureFactory<Texture = R::Texture>>,
        events: EventSender,
    ) -> Result<Self, SliderError> {
        if slides.is_empty() {
            return Err(SliderError::InvalidConfiguration(
                "slides must include at least one entry".to_string(),
            ));
        }
        info!(slides = slides.len(), "initializing slideshow");
        let started = Instant::now();
        let mut loader = ResourceLoader::new(source, factory);
        let assets = loader
            .load_all(&slides, &options.defaults.displacement_map)
            .await?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "slideshow assets loaded"
        );

        let layout = OverlayLayout::compute(renderer.surface_size());
        let mut slideshow = Self {
            autoplay: AutoplayScheduler::new(options.autoplay && slides.len() > 1),
            resize: ResizeDebounce::new(options.resize_debounce),
            slides,
            options,
            renderer,
            loader,
            textures: Some(assets.textures),
            displacement: Some(assets.displacement),
            controller: TransitionController::new(0),
            swipe: SwipeRecognizer::default(),
            layout,
            pending: None,
            active: None,
            last_uniforms: TransitionUniforms::settled(),
            visible: true,
            autoplay_suspended: false,
            disposed: false,
            events,
        };
        slideshow.settle(0)?;
        slideshow.emit(SliderEvent::Ready {
            slides: slideshow.slides.len(),
        });
        slideshow.arm_autoplay(Instant::now());
        Ok(slideshow)
    }

    pub fn current_index(&self) -> usize {
        self.controller.current_index()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Drive the slideshow until cancelled, unmounted or the input side closes.
    ///
    /// Tears down before returning, including on error.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<SliderInput>,
        cancel: CancellationToken,
    ) -> Result<(), SliderError> {
        let result = self.event_loop(&mut inputs, &cancel).await;
        self.dispose();
        result
    }

    async fn event_loop(
        &mut self,
        inputs: &mut mpsc::Receiver<SliderInput>,
        cancel: &CancellationToken,
    ) -> Result<(), SliderError> {
        let mut frames = tokio::time::interval(self.options.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let animating = self.controller.is_animating();
            let autoplay_at = self.autoplay.deadline();
            let resize_at = self.resize.deadline();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("slideshow cancelled");
                    return Ok(());
                }
                input = inputs.recv() => match input {
                    Some(SliderInput::Unmount) | None => {
                        info!("slideshow unmounted");
                        return Ok(());
                    }
                    Some(input) => self.handle_input(input, Instant::now())?,
                },
                (generation, result) = next_pending(&mut self.pending) => {
                    self.pending = None;
                    if self.on_maps_loaded(generation, result, Instant::now())? {
                        frames.reset_immediately();
                    }
                }
                _ = sleep_until(resize_at) => {
                    self.on_resize_due(Instant::now())?;
                }
                _ = sleep_until(autoplay_at) => {
                    let now = Instant::now();
                    if self.autoplay.fire(now) {
                        debug!("autoplay timer fired");
                        self.navigate(Direction::Next, Trigger::Autoplay, now);
                    }
                }
                _ = frames.tick(), if animating => {
                    self.on_frame(Instant::now())?;
                }
            }
        }
    }

    fn handle_input(&mut self, input: SliderInput, now: Instant) -> Result<(), SliderError> {
        match input {
            SliderInput::Navigate(direction) => self.navigate(direction, Trigger::Manual, now),
            SliderInput::Click { x, y } => self.on_click(x, y, now),
            SliderInput::Touch { phase, x, y } => match phase {
                TouchPhase::Started => self.swipe.start(x, y, now),
                TouchPhase::Moved => {
                    self.swipe.moved(x, y);
                }
                TouchPhase::Ended => {
                    if let Some(direction) = self.swipe.end(x, y, now) {
                        debug!(?direction, "swipe recognized");
                        self.navigate(direction, Trigger::Manual, now);
                    }
                }
                TouchPhase::Cancelled => self.swipe.cancel(),
            },
            SliderInput::Resize(size) => {
                self.resize.schedule(now, size);
                if self.options.resize_debounce.is_zero() {
                    self.on_resize_due(now)?;
                }
            }
            SliderInput::Visibility(visible) => self.on_visibility(visible, now),
            // the event loop returns on unmount before dispatching here
            SliderInput::Unmount => {}
        }
        Ok(())
    }

    fn on_click(&mut self, x: f32, y: f32, now: Instant) {
        let index = self.current_index();
        let call_to_action = self.slides[index].call_to_action();
        let controls = self.options.show_controls;
        match self
            .layout
            .hit_test(x, y, controls, call_to_action.is_some())
        {
            Some(Hit::Prev) => self.navigate(Direction::Prev, Trigger::Manual, now),
            Some(Hit::Next) => self.navigate(Direction::Next, Trigger::Manual, now),
            Some(Hit::CallToAction) => {
                if let Some(cta) = call_to_action {
                    info!(index, link = %cta.link, "call-to-action activated");
                    self.emit(SliderEvent::CallToAction {
                        index,
                        link: cta.link,
                    });
                }
            }
            None => {}
        }
    }

    fn on_visibility(&mut self, visible: bool, now: Instant) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            debug!("slideshow visible");
            if self.autoplay_suspended {
                debug!("autoplay stays off after an aborted transition");
            } else if self.controller.is_idle() {
                self.arm_autoplay(now);
            }
        } else {
            debug!("slideshow hidden; autoplay paused");
            self.autoplay.disarm();
        }
    }

    /// Start a transition if idle; otherwise the request is dropped.
    fn navigate(&mut self, direction: Direction, trigger: Trigger, now: Instant) {
        if self.disposed {
            return;
        }
        if trigger == Trigger::Manual && self.autoplay.disarm() {
            debug!("autoplay disarmed by manual navigation");
        }
        let count = self.slides.len();
        let Some(ticket) = self.controller.request(direction, trigger, count) else {
            debug!(?direction, ?trigger, count, "navigation ignored");
            return;
        };

        let from_effect = self.slides[ticket.from].resolve_effect(&self.options.defaults);
        let to_effect = self.slides[ticket.to].resolve_effect(&self.options.defaults);
        // both requested before either is awaited
        let from_map = self.loader.load_displacement(&from_effect.displacement_map);
        let to_map = self.loader.load_displacement(&to_effect.displacement_map);
        info!(
            from = ticket.from,
            to = ticket.to,
            ?direction,
            ?trigger,
            generation = ticket.generation,
            intensity = from_effect.intensity,
            duration_ms = from_effect.transition.as_millis() as u64,
            map = %from_effect.displacement_map,
            "transition started"
        );
        self.pending = Some(PendingLoad {
            generation: ticket.generation,
            requested_at: now,
            effect: from_effect,
            maps: future::try_join(from_map, to_map).boxed(),
        });
        self.emit(SliderEvent::TransitionStarted {
            from: ticket.from,
            to: ticket.to,
            direction,
            trigger,
        });
    }

    /// Returns true when an animation began.
    fn on_maps_loaded(
        &mut self,
        generation: u64,
        loaded: Loaded<R::Texture>,
        now: Instant,
    ) -> Result<bool, SliderError> {
        if self.disposed {
            return Ok(false);
        }
        let Some(ticket) = self.controller.preparing(generation) else {
            debug!(generation, "stale displacement load ignored");
            return Ok(false);
        };
        let (effect, maps) = match loaded {
            Loaded { effect, result: Ok(maps), requested_at } => {
                debug!(
                    generation,
                    elapsed_ms = now.saturating_duration_since(requested_at).as_millis() as u64,
                    "displacement maps ready"
                );
                (effect, maps)
            }
            Loaded { result: Err(err), .. } => {
                self.abort(ticket, err);
                return Ok(false);
            }
        };
        let (from_map, _to_map) = maps;
        let bindings = self.textures.as_ref().and_then(|textures| {
            Some(FrameBindings {
                current: textures.get(ticket.from)?.clone(),
                next: textures.get(ticket.to)?.clone(),
                displacement: from_map.clone(),
            })
        });
        let Some(bindings) = bindings else {
            self.controller.abort(generation);
            return Ok(false);
        };
        self.renderer.bind(bindings);
        self.displacement = Some(from_map);
        let active = ActiveEffect {
            intensity: effect.intensity,
            direction: ticket.direction.sign(),
        };
        self.active = Some(active);
        self.controller
            .begin_animation(generation, now, effect.transition);
        self.draw(TransitionUniforms::new(0.0, active.intensity, active.direction))?;
        Ok(true)
    }

    fn abort(&mut self, ticket: Ticket, err: LoadError) {
        self.controller.abort(ticket.generation);
        self.autoplay_suspended = true;
        let aborted = SliderError::TransitionAborted {
            from: ticket.from,
            to: ticket.to,
            source: err.clone(),
        };
        warn!(error = %aborted, cause = %err, "transition aborted");
        self.emit(SliderEvent::TransitionAborted {
            from: ticket.from,
            to: ticket.to,
            reason: err.to_string(),
        });
    }

    fn on_frame(&mut self, now: Instant) -> Result<(), SliderError> {
        let (Some(tick), Some(active)) = (self.controller.tick(now), self.active) else {
            return Ok(());
        };
        trace!(progress = tick.progress, "transition frame");
        self.draw(TransitionUniforms::new(
            tick.progress,
            active.intensity,
            active.direction,
        ))?;
        if tick.finished {
            self.finish(now)?;
        }
        Ok(())
    }

    fn finish(&mut self, now: Instant) -> Result<(), SliderError> {
        let Some(ticket) = self.controller.complete() else {
            return Ok(());
        };
        self.active = None;
        self.autoplay_suspended = false;
        self.settle(ticket.to)?;
        info!(index = ticket.to, "slide changed");
        self.emit(SliderEvent::SlideChanged { index: ticket.to });
        self.arm_autoplay(now);
        Ok(())
    }

    /// Bind slide `index` on both sides, refresh the caption, draw once.
    fn settle(&mut self, index: usize) -> Result<(), SliderError> {
        let (Some(textures), Some(displacement)) = (self.textures.as_ref(), self.displacement.as_ref())
        else {
            return Ok(());
        };
        let Some(texture) = textures.get(index) else {
            return Ok(());
        };
        self.renderer.bind(FrameBindings {
            current: texture.clone(),
            next: texture.clone(),
            displacement: displacement.clone(),
        });
        let slide = &self.slides[index];
        self.renderer.set_caption(Caption {
            title: slide.title.clone(),
            description: slide.description.clone(),
            call_to_action: slide.call_to_action().map(|cta| cta.text),
        });
        self.draw(TransitionUniforms::settled())
    }

    fn on_resize_due(&mut self, now: Instant) -> Result<(), SliderError> {
        let Some(size) = self.resize.take_due(now) else {
            return Ok(());
        };
        if size.is_empty() {
            debug!("ignoring resize to an empty surface");
            return Ok(());
        }
        if size == self.renderer.surface_size() {
            debug!(width = size.width, height = size.height, "resize without change");
            return Ok(());
        }
        debug!(width = size.width, height = size.height, "applying resize");
        self.renderer.resize(size);
        self.layout = OverlayLayout::compute(self.renderer.surface_size());
        self.draw(self.last_uniforms)
    }

    fn arm_autoplay(&mut self, now: Instant) {
        if !self.visible || self.disposed {
            return;
        }
        let dwell = self.slides[self.current_index()]
            .resolve_effect(&self.options.defaults)
            .dwell;
        if self.autoplay.arm(now, dwell) {
            debug!(dwell_ms = dwell.as_millis() as u64, "autoplay armed");
        }
    }

    fn draw(&mut self, uniforms: TransitionUniforms) -> Result<(), SliderError> {
        self.last_uniforms = uniforms;
        match self.renderer.render(uniforms) {
            Ok(()) => Ok(()),
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "frame skipped");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn emit(&self, event: SliderEvent) {
        let _ = self.events.send(event);
    }

    /// Stop timers, abandon loads and release every resource.
    ///
    /// Returns `false` when already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.pending = None;
        self.active = None;
        self.autoplay.disarm();
        self.resize.cancel();
        self.swipe.cancel();
        self.controller.reset();
        self.renderer.release();
        let slides = self.textures.take().map_or(0, |set| set.len());
        self.displacement = None;
        let maps = self.loader.dispose();
        info!(slides, maps, "slideshow disposed");
        self.emit(SliderEvent::Disposed);
        true
    }
}

impl<R: Renderer> Drop for Slideshow<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct Loaded<T> {
    effect: ResolvedEffect,
    requested_at: Instant,
    result: Result<MapPair<T>, LoadError>,
}

async fn next_pending<T>(pending: &mut Option<PendingLoad<T>>) -> (u64, Loaded<T>) {
    match pending {
        Some(load) => {
            let result = (&mut load.maps).await;
            (
                load.generation,
                Loaded {
                    effect: load.effect.clone(),
                    requested_at: load.requested_at,
                    result,
                },
            )
        }
        None => future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
