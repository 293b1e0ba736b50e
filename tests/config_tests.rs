use hero_slider::config::{Configuration, FitMode};
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn parse_minimal_config_uses_defaults() {
    let yaml = r#"
slides:
  - image-url: /images/one.jpg
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.slides.len(), 1);
    assert!(cfg.autoplay);
    assert_eq!(cfg.autoplay_duration_ms, 7000);
    assert!((cfg.default_transition_duration - 2.0).abs() < f32::EPSILON);
    assert!((cfg.displacement_intensity - 0.7).abs() < f32::EPSILON);
    assert_eq!(cfg.default_displacement_map, "/images/Displacements/fluid.jpg");
    assert_eq!(cfg.fit, FitMode::Stretch);
    assert!(cfg.overlay.show_controls);
}

#[test]
fn parse_full_slide_with_effect_override() {
    let yaml = r#"
autoplay-duration-ms: 5000
fit: cover
slides:
  - image-url: /images/hero.jpg
    title: Roofing done right
    description: Family owned since 1982.
    button-text: Get a quote
    button-link: /quote
    effect:
      displacement-map: /images/Displacements/stripes.jpg
      intensity: 0.3
      duration: 9000
      transition-duration: 1.5
  - image-url: /images/second.jpg
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.fit, FitMode::Cover);

    let defaults = cfg.effect_defaults();
    assert_eq!(defaults.dwell, Duration::from_millis(5000));

    let hero = &cfg.slides[0];
    let cta = hero.call_to_action().expect("call to action");
    assert_eq!(cta.text, "Get a quote");
    assert_eq!(cta.link, "/quote");

    let effect = hero.resolve_effect(&defaults);
    assert_eq!(effect.displacement_map, "/images/Displacements/stripes.jpg");
    assert!((effect.intensity - 0.3).abs() < f32::EPSILON);
    assert_eq!(effect.dwell, Duration::from_millis(9000));
    assert_eq!(effect.transition, Duration::from_millis(1500));

    let plain = cfg.slides[1].resolve_effect(&defaults);
    assert_eq!(plain.displacement_map, defaults.displacement_map);
    assert_eq!(plain.transition, Duration::from_secs(2));
}

#[test]
fn partial_call_to_action_is_hidden_not_rejected() {
    let yaml = r#"
slides:
  - image-url: /images/one.jpg
    button-text: Orphan label
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert!(cfg.slides[0].has_partial_call_to_action());
    assert!(cfg.slides[0].call_to_action().is_none());
}

#[test]
fn validation_rejects_empty_slides() {
    let cfg: Configuration = serde_yaml::from_str("slides: []").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(format!("{err:#}").contains("at least one"));
}

#[test]
fn validation_rejects_bad_numbers() {
    for yaml in [
        "autoplay-duration-ms: 0\nslides: [{image-url: a.jpg}]",
        "default-transition-duration: -1.0\nslides: [{image-url: a.jpg}]",
        "displacement-intensity: -0.5\nslides: [{image-url: a.jpg}]",
        "frame-interval-ms: 0\nslides: [{image-url: a.jpg}]",
        "slides: [{image-url: a.jpg, effect: {duration: 0}}]",
        "slides: [{image-url: '  '}]",
    ] {
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validated().is_err(), "accepted: {yaml}");
    }
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = r#"
slides:
  - image-url: a.jpg
    imageUrl: b.jpg
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn from_yaml_file_defaults_asset_root_to_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slider.yaml");
    std::fs::write(&path, "slides:\n  - image-url: /images/a.jpg\n").unwrap();

    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.asset_root, Some(dir.path().to_path_buf()));
}

#[test]
fn explicit_asset_root_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slider.yaml");
    std::fs::write(
        &path,
        "asset-root: /srv/site\nslides:\n  - image-url: /images/a.jpg\n",
    )
    .unwrap();

    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.asset_root, Some(PathBuf::from("/srv/site")));
}

#[test]
fn slideshow_options_carry_timing() {
    let yaml = r#"
autoplay: false
resize-debounce-ms: 250
frame-interval-ms: 33
overlay:
  show-controls: false
slides:
  - image-url: a.jpg
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let options = cfg.validated().unwrap().slideshow_options();
    assert!(!options.autoplay);
    assert!(!options.show_controls);
    assert_eq!(options.resize_debounce, Duration::from_millis(250));
    assert_eq!(options.frame_interval, Duration::from_millis(33));
}
