//! Unit tests for vulkan_renderer.rs
//!
//! The per-image resources must follow the swapchain image count across
//! recreation; a recreated swapchain may report a different count.

use crate::vulkan_renderer::per_image_resources_stale;

#[test]
fn test_matching_counts_keep_per_image_resources() {
    assert!(!per_image_resources_stale(3, 3));
    assert!(!per_image_resources_stale(2, 2));
}

#[test]
fn test_grown_image_count_forces_rebuild() {
    // Acquire may then legally return an index past the old arrays.
    assert!(per_image_resources_stale(4, 3));
}

#[test]
fn test_shrunk_image_count_forces_rebuild() {
    assert!(per_image_resources_stale(2, 3));
}
