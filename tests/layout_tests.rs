use hero_slider::config::FitMode;
use hero_slider::layout::{Hit, OverlayLayout, compute_uv_scale};
use hero_slider::render::SurfaceSize;

fn close(a: [f32; 2], b: [f32; 2]) {
    assert!((a[0] - b[0]).abs() < 1e-4, "{a:?} vs {b:?}");
    assert!((a[1] - b[1]).abs() < 1e-4, "{a:?} vs {b:?}");
}

#[test]
fn stretch_samples_whole_texture() {
    let scale = compute_uv_scale(FitMode::Stretch, SurfaceSize::new(1920, 1080), 1000, 1000);
    close(scale, [1.0, 1.0]);
}

#[test]
fn cover_crops_the_overflowing_axis() {
    // square image on 16:9: crop top and bottom
    let scale = compute_uv_scale(FitMode::Cover, SurfaceSize::new(1920, 1080), 1000, 1000);
    close(scale, [1.0, 1.0 / (1920.0 / 1080.0)]);

    // 2:1 image on 16:9: crop left and right
    let scale = compute_uv_scale(FitMode::Cover, SurfaceSize::new(1920, 1080), 4000, 2000);
    close(scale, [(1920.0 / 1080.0) / 2.0, 1.0]);
}

#[test]
fn cover_with_empty_surface_falls_back_to_identity() {
    let scale = compute_uv_scale(FitMode::Cover, SurfaceSize::new(0, 1080), 4000, 2000);
    close(scale, [1.0, 1.0]);
}

#[test]
fn controls_sit_on_opposite_edges() {
    let layout = OverlayLayout::compute(SurfaceSize::new(1280, 720));
    assert!(layout.prev.x < 1280.0 / 2.0);
    assert!(layout.next.x > 1280.0 / 2.0);
    assert!((layout.prev.y - layout.next.y).abs() < f32::EPSILON);
    assert!(layout.text.x > layout.prev.x + layout.prev.width);
    assert!(layout.call_to_action.y > layout.description_top);
}

#[test]
fn hit_test_finds_each_control() {
    let layout = OverlayLayout::compute(SurfaceSize::new(1280, 720));
    let (px, py) = layout.prev.center();
    let (nx, ny) = layout.next.center();
    let (cx, cy) = layout.call_to_action.center();

    assert_eq!(layout.hit_test(px, py, true, true), Some(Hit::Prev));
    assert_eq!(layout.hit_test(nx, ny, true, true), Some(Hit::Next));
    assert_eq!(layout.hit_test(cx, cy, true, true), Some(Hit::CallToAction));
    assert_eq!(layout.hit_test(cx, cy, true, false), None);
    assert_eq!(layout.hit_test(640.0, 10.0, true, true), None);
}

#[test]
fn hidden_controls_are_not_clickable() {
    let layout = OverlayLayout::compute(SurfaceSize::new(1280, 720));
    let (px, py) = layout.prev.center();
    let (nx, ny) = layout.next.center();
    let (cx, cy) = layout.call_to_action.center();

    assert_eq!(layout.hit_test(px, py, false, true), None);
    assert_eq!(layout.hit_test(nx, ny, false, true), None);
    assert_eq!(layout.hit_test(cx, cy, false, true), Some(Hit::CallToAction));
}

#[test]
fn hit_test_ignores_corners_of_round_buttons() {
    let layout = OverlayLayout::compute(SurfaceSize::new(1280, 720));
    let corner_x = layout.prev.x + 1.0;
    let corner_y = layout.prev.y + 1.0;
    assert_eq!(layout.hit_test(corner_x, corner_y, true, true), None);
}
