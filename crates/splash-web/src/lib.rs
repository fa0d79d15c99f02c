//! WASM bridge: a canvas surface, a `requestAnimationFrame` loop, and the
//! exported functions a page calls to drive the splash effect.

pub mod runner;
pub mod scheduler;
pub mod surface;

pub use runner::{FrameOutcome, SplashRunner};
pub use scheduler::RafScheduler;
pub use surface::CanvasSurface;

use std::cell::RefCell;

use splash_engine::{InputEvent, SplashConfig, SplashError};
use wasm_bindgen::prelude::*;

type WebRunner = SplashRunner<CanvasSurface, RafScheduler>;

thread_local! {
    static RUNNER: RefCell<Option<WebRunner>> = RefCell::new(None);
}

fn with_runner<R>(f: impl FnOnce(&mut WebRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| match cell.borrow_mut().as_mut() {
        Some(runner) => Some(f(runner)),
        None => {
            log::warn!("splash: not initialized, call splash_init() first");
            None
        }
    })
}

fn to_js(e: SplashError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Attach the effect to `<canvas id={canvas_id}>`. `config_json` holds
/// overrides on top of the defaults and may be empty. Replaces any previous instance.
#[wasm_bindgen]
pub fn splash_init(canvas_id: &str, config_json: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let previous = RUNNER.with(|cell| cell.borrow_mut().take());
    if let Some(mut runner) = previous {
        runner.stop();
    }

    let config = if config_json.trim().is_empty() {
        SplashConfig::default()
    } else {
        SplashConfig::from_json(config_json).map_err(to_js)?
    };
    let surface = CanvasSurface::from_element_id(canvas_id).map_err(to_js)?;
    let scheduler = RafScheduler::new(|ticket, now| {
        with_runner(|r| r.on_animation_frame(ticket, now));
    })
    .map_err(to_js)?;
    let runner = SplashRunner::new(config, surface, scheduler).map_err(|e| {
        log::error!("splash: init failed: {}", e);
        to_js(e)
    })?;

    RUNNER.with(|cell| *cell.borrow_mut() = Some(runner));
    log::info!("splash: initialized on #{}", canvas_id);
    Ok(())
}

#[wasm_bindgen]
pub fn splash_start() -> Result<(), JsValue> {
    with_runner(|r| r.start()).unwrap_or(Ok(())).map_err(to_js)
}

#[wasm_bindgen]
pub fn splash_stop() {
    with_runner(|r| r.stop());
}

#[wasm_bindgen]
pub fn splash_reset() {
    with_runner(|r| r.reset());
}

/// Apply JSON overrides. Returns the clamped fields as a JSON array.
#[wasm_bindgen]
pub fn splash_update_config(json: &str) -> Result<String, JsValue> {
    let clamped = with_runner(|r| r.update_config(json))
        .unwrap_or_else(|| Ok(Vec::new()))
        .map_err(to_js)?;
    serde_json::to_string(&clamped).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn splash_pointer_move(x: f32, y: f32, t: f64) {
    with_runner(|r| r.push_input(InputEvent::PointerMove { x, y, t }));
}

#[wasm_bindgen]
pub fn splash_pointer_down(x: f32, y: f32, t: f64) {
    with_runner(|r| r.push_input(InputEvent::PointerDown { x, y, t }));
}

#[wasm_bindgen]
pub fn splash_pointer_up(x: f32, y: f32, t: f64) {
    with_runner(|r| r.push_input(InputEvent::PointerUp { x, y, t }));
}

#[wasm_bindgen]
pub fn splash_pointer_leave(t: f64) {
    with_runner(|r| r.push_input(InputEvent::PointerLeave { t }));
}

#[wasm_bindgen]
pub fn splash_resize(width: u32, height: u32) -> Result<(), JsValue> {
    with_runner(|r| r.resize(width, height))
        .unwrap_or(Ok(()))
        .map_err(to_js)
}

#[wasm_bindgen]
pub fn splash_visibility_changed(hidden: bool) -> Result<(), JsValue> {
    with_runner(|r| r.set_visible(!hidden))
        .unwrap_or(Ok(()))
        .map_err(to_js)
}

// ---- Telemetry ----

#[wasm_bindgen]
pub fn get_active_particle_count() -> u32 {
    with_runner(|r| r.engine().active_particle_count() as u32).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_current_fps() -> f32 {
    with_runner(|r| r.engine().current_fps()).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn get_quality_level() -> String {
    with_runner(|r| r.engine().current_quality_level().name().to_string()).unwrap_or_default()
}
