use std::cell::Cell;
use std::rc::Rc;

use splash_engine::{FrameScheduler, FrameTicket, Result, SplashError};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use crate::surface::js_message;

/// `requestAnimationFrame`-backed scheduler.
///
/// The browser callback carries only a timestamp, so the ticket for the
/// pending request is parked in a shared cell and handed to `on_frame`.
pub struct RafScheduler {
    window: web_sys::Window,
    callback: Closure<dyn FnMut(f64)>,
    pending: Rc<Cell<Option<FrameTicket>>>,
    handle: Option<i32>,
}

impl RafScheduler {
    pub fn new(mut on_frame: impl FnMut(FrameTicket, f64) + 'static) -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| SplashError::Schedule("no window".into()))?;
        let pending: Rc<Cell<Option<FrameTicket>>> = Rc::new(Cell::new(None));
        let slot = Rc::clone(&pending);
        let callback = Closure::wrap(Box::new(move |now: f64| {
            if let Some(ticket) = slot.take() {
                on_frame(ticket, now);
            }
        }) as Box<dyn FnMut(f64)>);
        Ok(Self {
            window,
            callback,
            pending,
            handle: None,
        })
    }
}

impl FrameScheduler for RafScheduler {
    fn request(&mut self, ticket: FrameTicket) -> Result<()> {
        self.pending.set(Some(ticket));
        let handle = self
            .window
            .request_animation_frame(self.callback.as_ref().unchecked_ref())
            .map_err(|e| SplashError::Schedule(js_message(&e)))?;
        self.handle = Some(handle);
        Ok(())
    }

    fn cancel(&mut self) {
        self.pending.set(None);
        if let Some(handle) = self.handle.take() {
            let _ = self.window.cancel_animation_frame(handle);
        }
    }
}

impl Drop for RafScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
