mod controls;

use std::path::PathBuf;
use std::str::FromStr;

use fontdb::{Database, Family, Query};
use glyphon::cosmic_text::{Align, Weight};
use glyphon::{
    Attrs, Buffer, Cache, Color, FamilyOwned, FontSystem, Metrics, Resolution, Shaping, SwashCache,
    TextArea, TextAtlas, TextBounds, TextRenderer, Viewport, Wrap,
};
use palette::{LinSrgba, Srgb, Srgba};
use tracing::warn;

use crate::config::OverlayConfig;
use crate::layout::{OverlayLayout, Rect};
use crate::render::Caption;

use controls::{ControlsRenderer, ControlsStyle};

const LINE_SPACING: f32 = 1.3;

/// Caption text, call-to-action label and navigation controls.
pub struct OverlayRenderer {
    viewport: Viewport,
    atlas: TextAtlas,
    text_renderer: TextRenderer,
    font_system: FontSystem,
    swash_cache: SwashCache,
    font_family: FamilyOwned,
    title: Buffer,
    description: Buffer,
    button: Buffer,
    caption: Caption,
    layout: OverlayLayout,
    text_colour: LinSrgba<f32>,
    button_text_colour: LinSrgba<f32>,
    controls: ControlsRenderer,
    controls_style: ControlsStyle,
}

impl OverlayRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        config: &OverlayConfig,
        layout: OverlayLayout,
    ) -> Self {
        let mut font_system = FontSystem::new();
        initialize_font_database(font_system.db_mut());
        let font_family = resolve_font_family(&font_system, config.font.as_deref());

        let mut new_buffer = || {
            let mut buffer = Buffer::new(&mut font_system, Metrics::new(32.0, 32.0 * LINE_SPACING));
            buffer.set_wrap(&mut font_system, Wrap::WordOrGlyph);
            buffer
        };
        let title = new_buffer();
        let description = new_buffer();
        let button = new_buffer();

        let cache = Cache::new(device);
        let viewport = Viewport::new(device, &cache);
        let mut atlas = TextAtlas::new(device, queue, &cache, format);
        let text_renderer =
            TextRenderer::new(&mut atlas, device, wgpu::MultisampleState::default(), None);

        let text_colour = resolve_colour(config.colors.text.as_deref(), "#FFFFFF");
        let accent_colour = resolve_colour(config.colors.accent.as_deref(), "#F59E0B");
        let controls_colour = resolve_colour(config.colors.controls.as_deref(), "#00000080");
        let controls_style = ControlsStyle {
            button_fill: to_linear_array(controls_colour),
            chevron: to_linear_array(text_colour),
            call_to_action: to_linear_array(accent_colour),
            show_controls: config.show_controls,
        };

        let mut overlay = Self {
            viewport,
            atlas,
            text_renderer,
            font_system,
            swash_cache: SwashCache::new(),
            font_family,
            title,
            description,
            button,
            caption: Caption::default(),
            layout,
            text_colour,
            button_text_colour: contrasting_text(accent_colour),
            controls: ControlsRenderer::new(device, format),
            controls_style,
        };
        overlay.relayout(device);
        overlay
    }

    pub fn set_caption(&mut self, device: &wgpu::Device, caption: Caption) {
        if self.caption == caption {
            return;
        }
        self.caption = caption;
        self.relayout(device);
    }

    pub fn resize(&mut self, device: &wgpu::Device, layout: OverlayLayout) {
        self.layout = layout;
        self.relayout(device);
    }

    fn relayout(&mut self, device: &wgpu::Device) {
        let layout = self.layout;
        let text_width = Some(layout.text.width);
        let family = self.font_family.as_family();

        let title_metrics = Metrics::new(layout.title_size, layout.title_size * LINE_SPACING);
        let title_attrs = Attrs::new().family(family).weight(Weight::BOLD);
        set_centered_text(
            &mut self.font_system,
            &mut self.title,
            title_metrics,
            text_width,
            &self.caption.title,
            &title_attrs,
        );

        let body_metrics = Metrics::new(layout.body_size, layout.body_size * LINE_SPACING);
        let body_attrs = Attrs::new().family(family);
        set_centered_text(
            &mut self.font_system,
            &mut self.description,
            body_metrics,
            text_width,
            &self.caption.description,
            &body_attrs,
        );

        let label = self.caption.call_to_action.as_deref().unwrap_or_default();
        let button_attrs = Attrs::new().family(family).weight(Weight::SEMIBOLD);
        set_centered_text(
            &mut self.font_system,
            &mut self.button,
            body_metrics,
            Some(layout.call_to_action.width),
            label,
            &button_attrs,
        );

        self.controls.update(
            device,
            &layout,
            &self.controls_style,
            self.caption.call_to_action.is_some(),
        );
    }

    /// Upload glyphs for this frame. `fade` is the caption opacity.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, fade: f32) {
        let size = self.layout.size;
        if size.is_empty() {
            return;
        }
        self.viewport.update(
            queue,
            Resolution {
                width: size.width,
                height: size.height,
            },
        );
        self.controls.set_fade(queue, fade);

        let layout = self.layout;
        let bounds = TextBounds {
            left: 0,
            top: 0,
            right: size.width as i32,
            bottom: size.height as i32,
        };
        let text_colour = to_text_color(self.text_colour, fade);
        let button_top = centred_top(&layout.call_to_action, layout.body_size * LINE_SPACING);
        let mut areas = vec![
            TextArea {
                buffer: &self.title,
                left: layout.text.x,
                top: layout.text.y,
                scale: 1.0,
                bounds,
                default_color: text_colour,
                custom_glyphs: &[],
            },
            TextArea {
                buffer: &self.description,
                left: layout.text.x,
                top: layout.description_top,
                scale: 1.0,
                bounds,
                default_color: text_colour,
                custom_glyphs: &[],
            },
        ];
        if self.caption.call_to_action.is_some() {
            areas.push(TextArea {
                buffer: &self.button,
                left: layout.call_to_action.x,
                top: button_top,
                scale: 1.0,
                bounds,
                default_color: to_text_color(self.button_text_colour, fade),
                custom_glyphs: &[],
            });
        }

        if let Err(err) = self.text_renderer.prepare(
            device,
            queue,
            &mut self.font_system,
            &mut self.atlas,
            &self.viewport,
            areas,
            &mut self.swash_cache,
        ) {
            warn!(error = %err, "overlay text prepare failed");
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.controls.draw(pass);
        if let Err(err) = self
            .text_renderer
            .render(&self.atlas, &self.viewport, pass)
        {
            warn!(error = %err, "overlay text draw failed");
        }
    }

    pub fn after_frame(&mut self) {
        self.atlas.trim();
    }
}

fn set_centered_text(
    font_system: &mut FontSystem,
    buffer: &mut Buffer,
    metrics: Metrics,
    width: Option<f32>,
    text: &str,
    attrs: &Attrs,
) {
    buffer.set_metrics_and_size(font_system, metrics, width, None);
    buffer.set_text(font_system, text, attrs, Shaping::Advanced, None);
    for line in &mut buffer.lines {
        line.set_align(Some(Align::Center));
    }
    buffer.shape_until_scroll(font_system, false);
}

fn centred_top(rect: &Rect, line_height: f32) -> f32 {
    rect.y + ((rect.height - line_height) * 0.5).max(0.0)
}

fn initialize_font_database(db: &mut Database) {
    db.load_system_fonts();
    let bundled_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
    if bundled_path.exists() {
        db.load_fonts_dir(&bundled_path);
    }
}

fn resolve_font_family(font_system: &FontSystem, requested: Option<&str>) -> FamilyOwned {
    let db = font_system.db();
    if let Some(name) = requested.map(str::trim).filter(|name| !name.is_empty()) {
        if font_available(db, name) {
            return FamilyOwned::Name(name.into());
        }
        warn!(font = %name, "overlay font missing; falling back");
    }

    if font_available(db, "DejaVu Sans") {
        FamilyOwned::Name("DejaVu Sans".into())
    } else {
        FamilyOwned::SansSerif
    }
}

fn font_available(db: &Database, name: &str) -> bool {
    let query = Query {
        families: &[Family::Name(name)],
        ..Default::default()
    };
    db.query(&query).is_some()
}

fn resolve_colour(source: Option<&str>, fallback: &str) -> LinSrgba<f32> {
    source
        .and_then(|value| {
            let parsed = parse_hex_color(value);
            if parsed.is_none() {
                warn!(colour = %value, "unparseable overlay colour; using default");
            }
            parsed
        })
        .or_else(|| parse_hex_color(fallback))
        .unwrap_or_else(|| LinSrgba::new(1.0, 1.0, 1.0, 1.0))
}

fn parse_hex_color(input: &str) -> Option<LinSrgba<f32>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(rgba) = Srgba::<u8>::from_str(trimmed) {
        let rgba_f32: Srgba<f32> = rgba.into_format();
        return Some(rgba_f32.into_linear());
    }

    let rgb = Srgb::<u8>::from_str(trimmed).ok()?;
    let rgba = Srgba::new(rgb.red, rgb.green, rgb.blue, 255);
    let rgba_f32: Srgba<f32> = rgba.into_format();
    Some(rgba_f32.into_linear())
}

fn to_text_color(color: LinSrgba<f32>, fade: f32) -> Color {
    let srgb: Srgba<f32> = Srgba::from_linear(color);
    let srgb_u8: Srgba<u8> = srgb.into_format();
    let alpha = (srgb_u8.alpha as f32 * fade.clamp(0.0, 1.0)).round() as u8;
    Color::rgba(srgb_u8.red, srgb_u8.green, srgb_u8.blue, alpha)
}

fn to_linear_array(color: LinSrgba<f32>) -> [f32; 4] {
    [color.red, color.green, color.blue, color.alpha]
}

/// Black or white, whichever reads better on `background`.
fn contrasting_text(background: LinSrgba<f32>) -> LinSrgba<f32> {
    let luminance =
        0.2126 * background.red + 0.7152 * background.green + 0.0722 * background.blue;
    if luminance > 0.35 {
        LinSrgba::new(0.0, 0.0, 0.0, 1.0)
    } else {
        LinSrgba::new(1.0, 1.0, 1.0, 1.0)
    }
}
