//! Unit tests for the swapchain selection functions
//!
//! Tests pure selection logic without requiring a GPU: surface format,
//! present mode, extent clamping and image count.

use ash::vk;

use crate::vulkan_swapchain::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format,
};

fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space,
    }
}

// ============================================================================
// SURFACE FORMAT SELECTION
// ============================================================================

#[test]
fn test_preferred_surface_format_selected_when_available() {
    let formats = [
        format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    let chosen = choose_surface_format(&formats);
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
}

#[test]
fn test_preferred_format_requires_matching_color_space() {
    let formats = [
        format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    // B8G8R8A8_UNORM is listed but not with the sRGB nonlinear color space,
    // so the first entry wins as fallback.
    let chosen = choose_surface_format(&formats);
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(chosen.color_space, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT);
}

#[test]
fn test_first_format_is_fallback() {
    let formats = [
        format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    assert_eq!(choose_surface_format(&formats).format, vk::Format::R8G8B8A8_SRGB);
}

// ============================================================================
// PRESENT MODE SELECTION
// ============================================================================

#[test]
fn test_mailbox_preferred_over_everything() {
    let modes = [
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::IMMEDIATE,
        vk::PresentModeKHR::MAILBOX,
    ];
    assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
}

#[test]
fn test_immediate_preferred_over_fifo() {
    let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
    assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::IMMEDIATE);
}

#[test]
fn test_fifo_is_the_fallback() {
    assert_eq!(
        choose_present_mode(&[vk::PresentModeKHR::FIFO]),
        vk::PresentModeKHR::FIFO
    );
    // Even with an empty list the guaranteed mode is returned.
    assert_eq!(choose_present_mode(&[]), vk::PresentModeKHR::FIFO);
}

// ============================================================================
// EXTENT SELECTION
// ============================================================================

fn capabilities(
    current: vk::Extent2D,
    min: vk::Extent2D,
    max: vk::Extent2D,
) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        current_extent: current,
        min_image_extent: min,
        max_image_extent: max,
        ..Default::default()
    }
}

#[test]
fn test_current_extent_used_when_defined() {
    let caps = capabilities(
        vk::Extent2D { width: 800, height: 600 },
        vk::Extent2D { width: 1, height: 1 },
        vk::Extent2D { width: 4096, height: 4096 },
    );
    let extent = choose_extent(&caps, 1920, 1080);
    assert_eq!(extent, vk::Extent2D { width: 800, height: 600 });
}

#[test]
fn test_framebuffer_size_clamped_when_extent_undefined() {
    let caps = capabilities(
        vk::Extent2D { width: u32::MAX, height: u32::MAX },
        vk::Extent2D { width: 200, height: 200 },
        vk::Extent2D { width: 1000, height: 1000 },
    );

    // Inside the range: passed through.
    assert_eq!(
        choose_extent(&caps, 640, 480),
        vk::Extent2D { width: 640, height: 480 }
    );
    // Below the minimum: clamped up.
    assert_eq!(
        choose_extent(&caps, 10, 10),
        vk::Extent2D { width: 200, height: 200 }
    );
    // Above the maximum: clamped down.
    assert_eq!(
        choose_extent(&caps, 5000, 3000),
        vk::Extent2D { width: 1000, height: 1000 }
    );
}

#[test]
fn test_clamped_extent_stays_in_range_for_arbitrary_sizes() {
    let caps = capabilities(
        vk::Extent2D { width: u32::MAX, height: u32::MAX },
        vk::Extent2D { width: 16, height: 16 },
        vk::Extent2D { width: 8192, height: 8192 },
    );
    for (w, h) in [(1, 1), (16, 8192), (1234, 567), (100_000, 3)] {
        let extent = choose_extent(&caps, w, h);
        assert!(extent.width >= 16 && extent.width <= 8192);
        assert!(extent.height >= 16 && extent.height <= 8192);
    }
}

// ============================================================================
// IMAGE COUNT SELECTION
// ============================================================================

#[test]
fn test_image_count_is_min_plus_one() {
    let caps = vk::SurfaceCapabilitiesKHR {
        min_image_count: 2,
        max_image_count: 8,
        ..Default::default()
    };
    assert_eq!(choose_image_count(&caps), 3);
}

#[test]
fn test_image_count_capped_by_maximum() {
    let caps = vk::SurfaceCapabilitiesKHR {
        min_image_count: 3,
        max_image_count: 3,
        ..Default::default()
    };
    assert_eq!(choose_image_count(&caps), 3);
}

#[test]
fn test_image_count_unbounded_when_max_is_zero() {
    // max_image_count == 0 means the surface imposes no upper bound.
    let caps = vk::SurfaceCapabilitiesKHR {
        min_image_count: 4,
        max_image_count: 0,
        ..Default::default()
    };
    assert_eq!(choose_image_count(&caps), 5);
}
