use splash_engine::{DrawSurface, RasterBuffer, RedrawPlan, Result, SplashError, SurfaceCaps};
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

/// A `<canvas>` element drawn through its 2D context with `putImageData`.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

impl CanvasSurface {
    /// Look up `<canvas id="...">` in the current document.
    pub fn from_element_id(id: &str) -> Result<Self> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| SplashError::SurfaceUnavailable("no document".into()))?;
        let canvas = document
            .get_element_by_id(id)
            .ok_or_else(|| SplashError::SurfaceUnavailable(format!("no element #{}", id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| SplashError::SurfaceUnavailable(format!("#{} is not a canvas", id)))?;
        Self::new(canvas)
    }

    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|e| SplashError::SurfaceUnavailable(js_message(&e)))?
            .ok_or_else(|| SplashError::SurfaceUnavailable("2d context unavailable".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SplashError::SurfaceUnavailable("unexpected context type".into()))?;
        Ok(Self { canvas, context })
    }
}

impl DrawSurface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn capabilities(&self) -> SurfaceCaps {
        SurfaceCaps::FULL
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        Ok(())
    }

    fn present(&mut self, raster: &RasterBuffer, plan: &RedrawPlan) -> Result<()> {
        if raster.is_empty() || plan.is_idle() {
            return Ok(());
        }
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(raster.as_bytes()),
            raster.width(),
            raster.height(),
        )
        .map_err(|e| SplashError::Present(js_message(&e)))?;

        let result = match plan {
            RedrawPlan::Idle => Ok(()),
            RedrawPlan::Full => self.context.put_image_data(&image, 0.0, 0.0),
            RedrawPlan::Regions(rects) => rects.iter().try_for_each(|r| {
                self.context
                    .put_image_data_with_dirty_x_and_dirty_y_and_dirty_width_and_dirty_height(
                        &image,
                        0.0,
                        0.0,
                        r.min.x as f64,
                        r.min.y as f64,
                        r.width() as f64,
                        r.height() as f64,
                    )
            }),
        };
        result.map_err(|e| SplashError::Present(js_message(&e)))
    }
}
