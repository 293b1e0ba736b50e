use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use slide_model::{EffectDefaults, Slide};

use crate::engine::SlideshowOptions;

/// How a slide texture is mapped onto the output surface.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Texture spans the whole quad regardless of aspect ratio.
    #[default]
    Stretch,
    /// Scale to fill the surface without distortion, cropping overflow.
    Cover,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Hero Slider".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct OverlayColorsConfig {
    pub text: Option<String>,
    pub accent: Option<String>,
    pub controls: Option<String>,
}

/// Caption, call-to-action and navigation controls drawn over the slides.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct OverlayConfig {
    pub font: Option<String>,
    pub show_controls: bool,
    pub colors: OverlayColorsConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font: None,
            show_controls: true,
            colors: OverlayColorsConfig::default(),
        }
    }
}

impl OverlayConfig {
    fn validate(&self) -> Result<()> {
        if let Some(font) = &self.font {
            ensure!(
                !font.trim().is_empty(),
                "overlay.font must not be blank when provided"
            );
        }
        for (field, value) in [
            ("text", &self.colors.text),
            ("accent", &self.colors.accent),
            ("controls", &self.colors.controls),
        ] {
            if let Some(color) = value {
                ensure!(
                    !color.trim().is_empty(),
                    "overlay.colors.{} must not be blank when provided",
                    field
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Slides in display order.
    pub slides: Vec<Slide>,
    /// Advance automatically after each slide's dwell time.
    pub autoplay: bool,
    /// Dwell for slides without an `effect.duration` override.
    pub autoplay_duration_ms: u64,
    /// Transition length in seconds for slides without an override.
    pub default_transition_duration: f32,
    pub displacement_intensity: f32,
    pub default_displacement_map: String,
    /// Directory that root-relative and bare image paths resolve against.
    /// Defaults to the directory holding the configuration file.
    pub asset_root: Option<PathBuf>,
    pub fit: FitMode,
    pub resize_debounce_ms: u64,
    /// Frame pacing while a transition animates.
    pub frame_interval_ms: u64,
    /// Optional clamp below the GPU's own texture size limit.
    pub max_texture_dimension: Option<u32>,
    pub window: WindowConfig,
    pub overlay: OverlayConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            slides: Vec::new(),
            autoplay: true,
            autoplay_duration_ms: Self::default_autoplay_duration_ms(),
            default_transition_duration: Self::default_transition_duration(),
            displacement_intensity: Self::default_displacement_intensity(),
            default_displacement_map: EffectDefaults::DEFAULT_DISPLACEMENT_MAP.to_string(),
            asset_root: None,
            fit: FitMode::default(),
            resize_debounce_ms: Self::default_resize_debounce_ms(),
            frame_interval_ms: Self::default_frame_interval_ms(),
            max_texture_dimension: None,
            window: WindowConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl Configuration {
    const fn default_autoplay_duration_ms() -> u64 {
        EffectDefaults::DEFAULT_DWELL_MS
    }

    const fn default_transition_duration() -> f32 {
        EffectDefaults::DEFAULT_TRANSITION_SECONDS
    }

    const fn default_displacement_intensity() -> f32 {
        EffectDefaults::DEFAULT_INTENSITY
    }

    const fn default_resize_debounce_ms() -> u64 {
        100
    }

    const fn default_frame_interval_ms() -> u64 {
        16
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)?;
        let mut cfg: Self = serde_yaml::from_str(&s)?;
        if cfg.asset_root.is_none() {
            cfg.asset_root = path.parent().map(Path::to_path_buf);
        }
        Ok(cfg)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.slides.is_empty(), "slides must include at least one entry");
        for (idx, slide) in self.slides.iter().enumerate() {
            let prefix = format!("slides[{idx}]");
            slide
                .validate(&prefix)
                .with_context(|| format!("invalid slide {idx}"))?;
            if slide.has_partial_call_to_action() {
                tracing::warn!(
                    slide = idx,
                    "button-text and button-link must both be set; call-to-action hidden"
                );
            }
        }
        ensure!(
            self.autoplay_duration_ms > 0,
            "autoplay-duration-ms must be greater than zero"
        );
        ensure!(
            self.default_transition_duration.is_finite() && self.default_transition_duration > 0.0,
            "default-transition-duration must be positive"
        );
        ensure!(
            self.displacement_intensity.is_finite() && self.displacement_intensity >= 0.0,
            "displacement-intensity must be non-negative"
        );
        ensure!(
            !self.default_displacement_map.trim().is_empty(),
            "default-displacement-map must not be empty"
        );
        ensure!(
            self.frame_interval_ms > 0,
            "frame-interval-ms must be greater than zero"
        );
        if let Some(max) = self.max_texture_dimension {
            ensure!(max > 0, "max-texture-dimension must be greater than zero");
        }
        ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window.width and window.height must be greater than zero"
        );
        self.overlay
            .validate()
            .context("invalid overlay configuration")?;
        Ok(self)
    }

    pub fn effect_defaults(&self) -> EffectDefaults {
        EffectDefaults {
            displacement_map: self.default_displacement_map.trim().to_string(),
            intensity: self.displacement_intensity,
            dwell: Duration::from_millis(self.autoplay_duration_ms),
            transition: Duration::try_from_secs_f32(self.default_transition_duration)
                .unwrap_or_else(|_| {
                    Duration::from_secs_f32(EffectDefaults::DEFAULT_TRANSITION_SECONDS)
                }),
        }
    }

    pub fn slideshow_options(&self) -> SlideshowOptions {
        SlideshowOptions {
            autoplay: self.autoplay,
            show_controls: self.overlay.show_controls,
            defaults: self.effect_defaults(),
            resize_debounce: Duration::from_millis(self.resize_debounce_ms),
            frame_interval: Duration::from_millis(self.frame_interval_ms.max(1)),
        }
    }
}
