//! Unit tests for frame scheduling math and the transform uniform
//!
//! GPU-free: the slot ring arithmetic and the matrix construction are pure.

use glam::{Vec3, Vec4Swizzles};

use crate::vulkan_frame::{compute_uniform, next_slot, MAX_FRAMES_IN_FLIGHT};

// ============================================================================
// SLOT RING
// ============================================================================

#[test]
fn test_slot_ring_advances_modulo_slot_count() {
    assert_eq!(MAX_FRAMES_IN_FLIGHT, 2);
    assert_eq!(next_slot(0), 1);
    assert_eq!(next_slot(1), 0);
}

#[test]
fn test_slot_ring_cycles() {
    let mut slot = 0;
    let mut visited = Vec::new();
    for _ in 0..2 * MAX_FRAMES_IN_FLIGHT {
        visited.push(slot);
        slot = next_slot(slot);
    }
    assert_eq!(visited, vec![0, 1, 0, 1]);
}

// ============================================================================
// TRANSFORM UNIFORM
// ============================================================================

#[test]
fn test_rotation_angle_tracks_elapsed_time() {
    // A quarter turn per second: after 1s the X axis lands on Y.
    let uniform = compute_uniform(1.0, 1.0);
    let rotated = uniform.model.transform_vector3(Vec3::X);
    assert!(rotated.abs_diff_eq(Vec3::Y, 1e-5), "got {:?}", rotated);

    // After 2s, a half turn.
    let uniform = compute_uniform(2.0, 1.0);
    let rotated = uniform.model.transform_vector3(Vec3::X);
    assert!(rotated.abs_diff_eq(Vec3::NEG_X, 1e-5), "got {:?}", rotated);
}

#[test]
fn test_rotation_preserves_z_axis() {
    // The spin is about Z, so Z maps to itself at any time.
    for t in [0.0, 0.37, 1.5, 12.25] {
        let uniform = compute_uniform(t, 1.0);
        let rotated = uniform.model.transform_vector3(Vec3::Z);
        assert!(rotated.abs_diff_eq(Vec3::Z, 1e-5));
    }
}

#[test]
fn test_zero_elapsed_is_identity_model() {
    let uniform = compute_uniform(0.0, 16.0 / 9.0);
    assert!(uniform.model.abs_diff_eq(glam::Mat4::IDENTITY, 1e-6));
}

#[test]
fn test_projection_reflects_aspect_ratio() {
    let narrow = compute_uniform(0.0, 1.0);
    let wide = compute_uniform(0.0, 16.0 / 9.0);
    // Wider aspect compresses X in clip space.
    assert!(wide.proj.x_axis.x < narrow.proj.x_axis.x);
    // x scale = y scale / aspect.
    let aspect = 16.0 / 9.0;
    assert!((wide.proj.x_axis.x * aspect - narrow.proj.x_axis.x).abs() < 1e-5);
}

#[test]
fn test_projection_flips_y_for_vulkan_clip_space() {
    let uniform = compute_uniform(0.0, 1.0);
    assert!(uniform.proj.y_axis.y < 0.0);
}

#[test]
fn test_view_looks_at_origin() {
    let uniform = compute_uniform(0.0, 1.0);
    // The eye position maps to the view-space origin.
    let eye = uniform.view * Vec3::new(2.0, 2.0, 2.0).extend(1.0);
    assert!(eye.xyz().abs_diff_eq(Vec3::ZERO, 1e-5));
    // The scene origin sits straight ahead on the view -Z axis.
    let origin = uniform.view * Vec3::ZERO.extend(1.0);
    assert!(origin.x.abs() < 1e-5);
    assert!(origin.y.abs() < 1e-5);
    assert!(origin.z < 0.0);
}

#[test]
fn test_uniform_is_pod_sized_for_three_matrices() {
    assert_eq!(
        std::mem::size_of::<crate::vulkan_frame::TransformUniform>(),
        3 * 64
    );
}
