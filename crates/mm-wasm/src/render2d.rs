//! Canvas2D painter.
//!
//! Implements `mm_render::Painter` on top of an HTML `<canvas>` context.
//! All scene geometry arrives in model space; the view transform is set on
//! the context once per frame.

use mm_render::Painter;
use mm_core::{Affine, Line, Point, Rect};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

const BACKGROUND: &str = "#fafafa";
const DASH: f64 = 6.0;

pub struct CanvasPainter<'a> {
    ctx: &'a CanvasRenderingContext2d,
    width: f64,
    height: f64,
}

impl<'a> CanvasPainter<'a> {
    pub fn new(ctx: &'a CanvasRenderingContext2d, width: f64, height: f64) -> Self {
        Self { ctx, width, height }
    }
}

impl Painter for CanvasPainter<'_> {
    fn clear(&mut self) {
        let _ = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        self.ctx.set_fill_style_str(BACKGROUND);
        self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
    }

    fn set_transform(&mut self, transform: Affine) {
        let [a, b, c, d, e, f] = transform.as_coeffs();
        let _ = self.ctx.set_transform(a, b, c, d, e, f);
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: &str) {
        rounded_rect_path(self.ctx, rect, radius);
        self.ctx.set_fill_style_str(color);
        self.ctx.fill();
    }

    fn stroke_rounded_rect(&mut self, rect: Rect, radius: f64, color: &str, width: f64) {
        rounded_rect_path(self.ctx, rect, radius);
        self.ctx.set_stroke_style_str(color);
        self.ctx.set_line_width(width);
        self.ctx.stroke();
    }

    fn stroke_line(&mut self, line: Line, color: &str, width: f64, dashed: bool) {
        let ctx = self.ctx;
        ctx.begin_path();
        ctx.move_to(line.p0.x, line.p0.y);
        ctx.line_to(line.p1.x, line.p1.y);
        ctx.set_stroke_style_str(color);
        ctx.set_line_width(width);
        if dashed {
            let _ = ctx.set_line_dash(&js_sys::Array::of2(
                &JsValue::from_f64(DASH),
                &JsValue::from_f64(DASH),
            ));
        }
        ctx.stroke();
        if dashed {
            let _ = ctx.set_line_dash(&js_sys::Array::new());
        }
    }

    fn fill_text(&mut self, text: &str, anchor: Point, color: &str, font: &str) {
        let ctx = self.ctx;
        ctx.set_font(font);
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.set_fill_style_str(color);
        let _ = ctx.fill_text(text, anchor.x, anchor.y);
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
        let ctx = self.ctx;
        ctx.begin_path();
        let _ = ctx.arc(center.x, center.y, radius, 0.0, std::f64::consts::TAU);
        ctx.set_fill_style_str(color);
        ctx.fill();
    }
}

fn rounded_rect_path(ctx: &CanvasRenderingContext2d, rect: Rect, r: f64) {
    let (x, y, w, h) = (rect.x0, rect.y0, rect.width(), rect.height());
    let r = r.min(w / 2.0).min(h / 2.0);
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.line_to(x + w - r, y);
    ctx.arc_to(x + w, y, x + w, y + r, r).unwrap_or(());
    ctx.line_to(x + w, y + h - r);
    ctx.arc_to(x + w, y + h, x + w - r, y + h, r).unwrap_or(());
    ctx.line_to(x + r, y + h);
    ctx.arc_to(x, y + h, x, y + h - r, r).unwrap_or(());
    ctx.line_to(x, y + r);
    ctx.arc_to(x, y, x + r, y, r).unwrap_or(());
    ctx.close_path();
}
