//! Unit tests for the layout transition mapping
//!
//! The transfer engine supports a closed set of three transitions; these
//! tests pin down the exact masks and stages for each, and that anything
//! else is rejected.

use ash::vk;

use crate::vulkan_transfer::transition_masks;
use nebula_3d_renderer::nebula3d::Error;

#[test]
fn test_undefined_to_transfer_dst() {
    let masks = transition_masks(
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    )
    .unwrap();
    assert_eq!(masks.src_access, vk::AccessFlags::empty());
    assert_eq!(masks.dst_access, vk::AccessFlags::TRANSFER_WRITE);
    assert_eq!(masks.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
    assert_eq!(masks.dst_stage, vk::PipelineStageFlags::TRANSFER);
}

#[test]
fn test_transfer_dst_to_shader_read() {
    let masks = transition_masks(
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    )
    .unwrap();
    assert_eq!(masks.src_access, vk::AccessFlags::TRANSFER_WRITE);
    assert_eq!(masks.dst_access, vk::AccessFlags::SHADER_READ);
    assert_eq!(masks.src_stage, vk::PipelineStageFlags::TRANSFER);
    assert_eq!(masks.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
}

#[test]
fn test_undefined_to_depth_attachment() {
    let masks = transition_masks(
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    )
    .unwrap();
    assert_eq!(masks.src_access, vk::AccessFlags::empty());
    assert_eq!(
        masks.dst_access,
        vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
    );
    assert_eq!(masks.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
    assert_eq!(masks.dst_stage, vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS);
}

#[test]
fn test_unsupported_transitions_are_rejected() {
    let unsupported = [
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        (vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::PRESENT_SRC_KHR),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::UNDEFINED),
        (vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR),
    ];
    for (old, new) in unsupported {
        let err = transition_masks(old, new).unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedLayoutTransition(_)),
            "{:?} -> {:?} should be unsupported",
            old,
            new
        );
    }
}

#[test]
fn test_unsupported_transition_error_names_the_pair() {
    let err = transition_masks(
        vk::ImageLayout::GENERAL,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    )
    .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("GENERAL"));
    assert!(message.contains("COLOR_ATTACHMENT_OPTIMAL"));
}

#[test]
fn test_errors_are_fatal() {
    // Upload failures are never the recoverable swapchain path.
    let err = transition_masks(vk::ImageLayout::GENERAL, vk::ImageLayout::UNDEFINED).unwrap_err();
    assert!(!err.is_recoverable());
}
