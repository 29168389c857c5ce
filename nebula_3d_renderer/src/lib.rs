/*!
# Nebula 3D Renderer

Core types for the Nebula 3D real-time renderer.

This crate provides everything that is independent of the graphics backend:
error types, the logging system, renderer configuration, and the asset
bridge (decoded vertex/index/pixel data). The Vulkan implementation lives in
the `nebula_3d_renderer_vulkan` crate and consumes these types.

## Architecture

- **Error / Result**: one error type shared by core and backend, encoding
  the fatal vs. recoverable split (swapchain invalidation is the only
  recoverable case)
- **Logging**: `Logger` trait with a colored console default, driven by the
  `nebula_*!` macros
- **Config**: plain renderer configuration with sensible defaults
- **Asset bridge**: `Vertex`, `ImageData`, `Mesh`, `Model` — decoded,
  backend-agnostic CPU-side data ready for GPU upload
*/

// Internal modules
mod error;
mod config;
pub mod log;
pub mod asset;

#[cfg(test)]
mod log_tests;

// Main nebula3d namespace module
pub mod nebula3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Renderer configuration
    pub use crate::config::Config;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
        // Note: nebula_* macros are NOT re-exported here - they are exported at crate root
    }

    // Asset sub-module
    pub mod asset {
        pub use crate::asset::*;
    }
}

// Re-export math library at crate root
pub use glam;
