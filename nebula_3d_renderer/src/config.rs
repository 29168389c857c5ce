//! Renderer configuration

/// Renderer configuration
///
/// Plain data consumed by the backend at construction time. Defaults match
/// a 1920x1080 window with validation layers enabled in debug builds only.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name reported to the graphics driver
    pub app_name: String,

    /// Initial window width in pixels
    pub window_width: u32,

    /// Initial window height in pixels
    pub window_height: u32,

    /// Enable the Khronos validation layer and debug messenger.
    /// Only effective when the backend is compiled with validation support.
    pub enable_validation: bool,

    /// Clear color for the color attachment (RGBA)
    pub clear_color: [f32; 4],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Nebula3D Application".to_string(),
            window_width: 1920,
            window_height: 1080,
            enable_validation: cfg!(debug_assertions),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}
