//! Error types for the Nebula3D renderer
//!
//! This module defines the error types used throughout the renderer,
//! including initialization, resource upload, and per-frame errors.
//! The fatal/recoverable split lives in the type: `SwapchainOutOfDate`
//! is the only variant a caller is expected to recover from (by
//! recreating the swapchain); everything else is fatal at the boundary.

use std::fmt;

/// Result type for Nebula3D renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nebula3D renderer errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (unexpected Vulkan result code)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain, pipeline)
    InitializationFailed(String),

    /// Asset decoding failed (mesh or image file)
    AssetLoadFailed(String),

    /// Image layout transition pair outside the supported set
    UnsupportedLayoutTransition(String),

    /// The swapchain no longer matches the surface; recreate and retry.
    /// This is the expected, recoverable signal from acquire/present.
    SwapchainOutOfDate,
}

impl Error {
    /// Whether the caller can recover by recreating the swapchain.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::SwapchainOutOfDate)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AssetLoadFailed(msg) => write!(f, "Asset load failed: {}", msg),
            Error::UnsupportedLayoutTransition(msg) => {
                write!(f, "Unsupported image layout transition: {}", msg)
            }
            Error::SwapchainOutOfDate => write!(f, "Swapchain out of date"),
        }
    }
}

impl std::error::Error for Error {}
