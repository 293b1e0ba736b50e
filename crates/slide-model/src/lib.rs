use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

pub use effect::{EffectDefaults, ResolvedEffect, SlideEffect};

mod effect {
    use super::*;

    /// Optional per-slide override of the transition look and timing.
    #[derive(Debug, Clone, Deserialize, Default, PartialEq)]
    #[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
    pub struct SlideEffect {
        pub displacement_map: Option<String>,
        pub intensity: Option<f32>,
        /// Autoplay dwell in milliseconds once this slide has settled.
        pub duration: Option<u64>,
        /// Transition length in seconds when leaving this slide.
        pub transition_duration: Option<f32>,
    }

    /// Engine-wide values used wherever a slide leaves a field unset.
    #[derive(Debug, Clone, PartialEq)]
    pub struct EffectDefaults {
        pub displacement_map: String,
        pub intensity: f32,
        pub dwell: Duration,
        pub transition: Duration,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct ResolvedEffect {
        pub displacement_map: String,
        pub intensity: f32,
        pub dwell: Duration,
        pub transition: Duration,
    }

    impl EffectDefaults {
        pub const DEFAULT_DISPLACEMENT_MAP: &'static str = "/images/Displacements/fluid.jpg";
        pub const DEFAULT_INTENSITY: f32 = 0.7;
        pub const DEFAULT_DWELL_MS: u64 = 7000;
        pub const DEFAULT_TRANSITION_SECONDS: f32 = 2.0;
    }

    impl Default for EffectDefaults {
        fn default() -> Self {
            Self {
                displacement_map: Self::DEFAULT_DISPLACEMENT_MAP.to_string(),
                intensity: Self::DEFAULT_INTENSITY,
                dwell: Duration::from_millis(Self::DEFAULT_DWELL_MS),
                transition: Duration::from_secs_f32(Self::DEFAULT_TRANSITION_SECONDS),
            }
        }
    }

    impl SlideEffect {
        /// Fill every unset field from `defaults`. A zero duration counts as unset.
        pub fn resolve(&self, defaults: &EffectDefaults) -> ResolvedEffect {
            let displacement_map = self
                .displacement_map
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .unwrap_or(&defaults.displacement_map)
                .to_string();
            let intensity = self
                .intensity
                .filter(|value| value.is_finite() && *value >= 0.0)
                .unwrap_or(defaults.intensity);
            let dwell = self
                .duration
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.dwell);
            let transition = self
                .transition_duration
                .and_then(|secs| Duration::try_from_secs_f32(secs).ok())
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.transition);
            ResolvedEffect {
                displacement_map,
                intensity,
                dwell,
                transition,
            }
        }

        pub fn validate(&self, prefix: &str) -> Result<()> {
            if let Some(map) = &self.displacement_map {
                ensure!(
                    !map.trim().is_empty(),
                    "{}.displacement-map must not be blank when provided",
                    prefix
                );
            }
            if let Some(intensity) = self.intensity {
                ensure!(
                    intensity.is_finite() && intensity >= 0.0,
                    "{}.intensity must be non-negative",
                    prefix
                );
            }
            if let Some(duration) = self.duration {
                ensure!(
                    duration > 0,
                    "{}.duration must be greater than zero",
                    prefix
                );
            }
            if let Some(secs) = self.transition_duration {
                ensure!(
                    secs.is_finite() && secs > 0.0,
                    "{}.transition-duration must be positive",
                    prefix
                );
            }
            Ok(())
        }
    }
}

/// One entry of the hero carousel.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Slide {
    pub image_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub button_link: Option<String>,
    #[serde(default)]
    pub effect: Option<SlideEffect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallToAction {
    pub text: String,
    pub link: String,
}

impl Slide {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            title: String::new(),
            description: String::new(),
            button_text: None,
            button_link: None,
            effect: None,
        }
    }

    /// The button is only shown when both label and target are present.
    pub fn call_to_action(&self) -> Option<CallToAction> {
        let text = self.button_text.as_deref().map(str::trim)?;
        let link = self.button_link.as_deref().map(str::trim)?;
        if text.is_empty() || link.is_empty() {
            return None;
        }
        Some(CallToAction {
            text: text.to_string(),
            link: link.to_string(),
        })
    }

    /// True when exactly one of the two button fields is set.
    pub fn has_partial_call_to_action(&self) -> bool {
        let text = self.button_text.as_deref().is_some_and(|s| !s.trim().is_empty());
        let link = self.button_link.as_deref().is_some_and(|s| !s.trim().is_empty());
        text != link
    }

    pub fn resolve_effect(&self, defaults: &EffectDefaults) -> ResolvedEffect {
        match &self.effect {
            Some(effect) => effect.resolve(defaults),
            None => SlideEffect::default().resolve(defaults),
        }
    }

    pub fn validate(&self, prefix: &str) -> Result<()> {
        ensure!(
            !self.image_url.trim().is_empty(),
            "{}.image-url must not be blank",
            prefix
        );
        if let Some(effect) = &self.effect {
            effect.validate(&format!("{prefix}.effect"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slides_from_yaml(input: &str) -> Vec<Slide> {
        let slides: Vec<Slide> = serde_yaml::from_str(input).expect("valid yaml");
        for (idx, slide) in slides.iter().enumerate() {
            slide
                .validate(&format!("slides[{idx}]"))
                .expect("valid slide");
        }
        slides
    }

    #[test]
    fn parses_minimal_and_full_slides() {
        let slides = slides_from_yaml(
            r#"
- image-url: /images/hero/1.jpg
- image-url: /images/hero/2.jpg
  title: Craft
  description: Built to last
  button-text: Get a quote
  button-link: /quote
  effect:
    displacement-map: /images/Displacements/stripes.jpg
    intensity: 0.4
    duration: 9000
    transition-duration: 1.5
"#,
        );
        assert_eq!(slides.len(), 2);
        assert!(slides[0].title.is_empty());
        assert!(slides[0].effect.is_none());
        let effect = slides[1].effect.as_ref().expect("effect");
        assert_eq!(effect.duration, Some(9000));
        assert_eq!(
            slides[1].call_to_action(),
            Some(CallToAction {
                text: "Get a quote".into(),
                link: "/quote".into(),
            })
        );
    }

    #[test]
    fn resolve_falls_back_to_defaults() {
        let defaults = EffectDefaults::default();
        let resolved = Slide::new("/a.jpg").resolve_effect(&defaults);
        assert_eq!(resolved.displacement_map, "/images/Displacements/fluid.jpg");
        assert!((resolved.intensity - 0.7).abs() < f32::EPSILON);
        assert_eq!(resolved.dwell, Duration::from_millis(7000));
        assert_eq!(resolved.transition, Duration::from_secs(2));
    }

    #[test]
    fn resolve_keeps_explicit_zero_intensity() {
        let defaults = EffectDefaults::default();
        let effect = SlideEffect {
            intensity: Some(0.0),
            transition_duration: Some(0.5),
            ..SlideEffect::default()
        };
        let resolved = effect.resolve(&defaults);
        assert_eq!(resolved.intensity, 0.0);
        assert_eq!(resolved.transition, Duration::from_millis(500));
        assert_eq!(resolved.dwell, defaults.dwell);
    }

    #[test]
    fn call_to_action_requires_both_fields() {
        let mut slide = Slide::new("/a.jpg");
        slide.button_text = Some("Contact".into());
        assert!(slide.call_to_action().is_none());
        assert!(slide.has_partial_call_to_action());
        slide.button_link = Some("   ".into());
        assert!(slide.call_to_action().is_none());
        slide.button_link = Some("/contact".into());
        assert!(slide.call_to_action().is_some());
        assert!(!slide.has_partial_call_to_action());
    }

    #[test]
    fn rejects_blank_image_and_negative_intensity() {
        let blank = Slide::new("  ");
        assert!(blank.validate("slides[0]").is_err());

        let mut negative = Slide::new("/a.jpg");
        negative.effect = Some(SlideEffect {
            intensity: Some(-1.0),
            ..SlideEffect::default()
        });
        let err = negative.validate("slides[3]").unwrap_err();
        assert!(err.to_string().contains("slides[3].effect.intensity"));
    }

    #[test]
    fn rejects_unknown_effect_keys() {
        let parsed: Result<Vec<Slide>, _> = serde_yaml::from_str(
            r#"
- image-url: /a.jpg
  effect:
    speed: 3
"#,
        );
        assert!(parsed.is_err());
    }
}
