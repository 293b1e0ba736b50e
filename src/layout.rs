//! Overlay geometry shared by the renderer and click hit-testing.

use crate::config::FitMode;
use crate::render::SurfaceSize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn inset(&self, amount: f32) -> Self {
        let inset = amount.max(0.0);
        Self {
            x: self.x + inset,
            y: self.y + inset,
            width: (self.width - inset * 2.0).max(0.0),
            height: (self.height - inset * 2.0).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Prev,
    Next,
    CallToAction,
}

/// Pixel positions of everything drawn over the slides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    pub size: SurfaceSize,
    pub prev: Rect,
    pub next: Rect,
    pub call_to_action: Rect,
    /// Centred text column.
    pub text: Rect,
    pub title_size: f32,
    pub body_size: f32,
    pub description_top: f32,
}

impl OverlayLayout {
    const DESCRIPTION_LINES: f32 = 3.0;

    pub fn compute(size: SurfaceSize) -> Self {
        let w = size.width as f32;
        let h = size.height as f32;
        let unit = w.min(h);

        let control = (unit * 0.08).clamp(36.0, 72.0);
        let margin = (w * 0.03).clamp(12.0, 48.0);
        let control_y = (h - control) * 0.5;
        let prev = Rect::new(margin, control_y, control, control);
        let next = Rect::new(w - margin - control, control_y, control, control);

        let text_left = margin * 2.0 + control;
        let text_width = (w - text_left * 2.0).max(0.0);
        let title_size = (unit * 0.08).clamp(24.0, 72.0);
        let body_size = (title_size * 0.4).clamp(14.0, 28.0);

        let title_top = h * 0.32;
        let description_top = title_top + title_size * 1.4;
        let cta_top = description_top + body_size * 1.4 * Self::DESCRIPTION_LINES + body_size;
        let cta_height = body_size * 2.6;
        let cta_width = (body_size * 11.0).min(text_width);
        let call_to_action = Rect::new((w - cta_width) * 0.5, cta_top, cta_width, cta_height);

        Self {
            size,
            prev,
            next,
            call_to_action,
            text: Rect::new(text_left, title_top, text_width, cta_top - title_top),
            title_size,
            body_size,
            description_top,
        }
    }

    /// Which control, if any, sits under the pointer. Hidden controls never hit.
    pub fn hit_test(
        &self,
        x: f32,
        y: f32,
        controls: bool,
        has_call_to_action: bool,
    ) -> Option<Hit> {
        if controls && circle_contains(&self.prev, x, y) {
            Some(Hit::Prev)
        } else if controls && circle_contains(&self.next, x, y) {
            Some(Hit::Next)
        } else if has_call_to_action && self.call_to_action.contains(x, y) {
            Some(Hit::CallToAction)
        } else {
            None
        }
    }
}

fn circle_contains(rect: &Rect, x: f32, y: f32) -> bool {
    let (cx, cy) = rect.center();
    let r = rect.width.min(rect.height) * 0.5;
    let (dx, dy) = (x - cx, y - cy);
    dx * dx + dy * dy <= r * r
}

/// Texture-coordinate scale about the centre for one slide.
///
/// `Cover` shrinks the sampled region along the overflowing axis so the
/// image fills the surface without distortion.
#[allow(clippy::cast_precision_loss)]
pub fn compute_uv_scale(fit: FitMode, surface: SurfaceSize, img_w: u32, img_h: u32) -> [f32; 2] {
    let ww = surface.width as f32;
    let wh = surface.height as f32;
    let iw = img_w as f32;
    let ih = img_h as f32;

    if fit == FitMode::Stretch || ww == 0.0 || wh == 0.0 || iw == 0.0 || ih == 0.0 {
        return [1.0, 1.0];
    }

    let win_ar = ww / wh;
    let img_ar = iw / ih;

    if img_ar > win_ar {
        // image wider than the surface: crop left/right
        [win_ar / img_ar, 1.0]
    } else {
        [1.0, img_ar / win_ar]
    }
}
