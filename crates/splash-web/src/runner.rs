use splash_engine::{
    AnimationLoop, ClampedField, DrawSurface, FrameScheduler, FrameTicket, InputEvent, Result,
    SplashConfig, SplashEngine, Visibility,
};

/// What happened to one frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The ticket was from a stopped or hidden loop; nothing ran.
    Stale,
    /// A frame was simulated and presented.
    Rendered,
    /// A frame was simulated but nothing was presented.
    Skipped,
    /// A fatal error stopped the loop.
    Stopped,
}

/// Generic runner that wires the engine to a surface and a frame scheduler.
///
/// The web crate keeps one `thread_local!` instance and exports free
/// functions via `#[wasm_bindgen]`, because wasm-bindgen cannot export
/// generic structs directly.
pub struct SplashRunner<S: DrawSurface, H: FrameScheduler> {
    engine: SplashEngine,
    surface: S,
    scheduler: H,
    lifecycle: AnimationLoop,
}

impl<S: DrawSurface, H: FrameScheduler> SplashRunner<S, H> {
    pub fn new(config: SplashConfig, surface: S, scheduler: H) -> Result<Self> {
        let (width, height) = surface.size();
        let engine = SplashEngine::new(config, surface.capabilities(), width, height)?;
        Ok(Self {
            engine,
            surface,
            scheduler,
            lifecycle: AnimationLoop::new(),
        })
    }

    pub fn engine(&self) -> &SplashEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SplashEngine {
        &mut self.engine
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &H {
        &self.scheduler
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Begin requesting frames. A no-op when already running.
    pub fn start(&mut self) -> Result<()> {
        if let Some(ticket) = self.lifecycle.start() {
            self.request(ticket)?;
            log::info!("splash: started");
        }
        Ok(())
    }

    /// Stop requesting frames. Callbacks already in flight are ignored.
    pub fn stop(&mut self) {
        if self.lifecycle.stop() {
            self.scheduler.cancel();
            log::info!("splash: stopped");
        }
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.engine.push_input(event);
    }

    pub fn update_config(&mut self, json: &str) -> Result<Vec<ClampedField>> {
        self.engine.update_config_json(json)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface.resize(width, height)?;
        self.engine.resize(width, height);
        Ok(())
    }

    /// Pause while hidden; restart timing when shown again.
    pub fn set_visible(&mut self, visible: bool) -> Result<()> {
        match self.lifecycle.set_visible(visible) {
            Visibility::Hidden => {
                self.scheduler.cancel();
                self.engine.suspend();
            }
            Visibility::Shown(ticket) => {
                self.engine.resume();
                if let Some(ticket) = ticket {
                    self.request(ticket)?;
                }
            }
            Visibility::Unchanged => {}
        }
        Ok(())
    }

    /// Host callback for one display refresh.
    pub fn on_animation_frame(&mut self, ticket: FrameTicket, now_ms: f64) -> FrameOutcome {
        if !self.lifecycle.admit(ticket) {
            return FrameOutcome::Stale;
        }
        let outcome = match self.draw(now_ms) {
            Ok(true) => FrameOutcome::Rendered,
            Ok(false) => FrameOutcome::Skipped,
            Err(e) if e.is_fatal() => {
                log::error!("splash: {}", e);
                self.stop();
                return FrameOutcome::Stopped;
            }
            Err(e) => {
                log::warn!("splash: frame dropped: {}", e);
                FrameOutcome::Skipped
            }
        };
        if let Some(next) = self.lifecycle.next() {
            if self.request(next).is_err() {
                return FrameOutcome::Stopped;
            }
        }
        outcome
    }

    fn draw(&mut self, now_ms: f64) -> Result<bool> {
        let report = self.engine.frame(now_ms)?;
        if !report.needs_present() {
            return Ok(false);
        }
        if let Err(e) = self.surface.present(self.engine.raster(), &report.plan) {
            // The surface missed these pixels; repaint all of them next time.
            self.engine.invalidate();
            return Err(e);
        }
        Ok(true)
    }

    fn request(&mut self, ticket: FrameTicket) -> Result<()> {
        if let Err(e) = self.scheduler.request(ticket) {
            log::error!("splash: {}", e);
            self.lifecycle.stop();
            return Err(e);
        }
        Ok(())
    }
}
