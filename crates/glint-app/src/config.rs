//! Application configuration.

use std::path::PathBuf;

/// Window and renderer configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Override for the compiled vertex shader; the build-time
    /// embedded shader is used when unset.
    pub vertex_shader: Option<PathBuf>,
    /// Override for the compiled fragment shader; the build-time
    /// embedded shader is used when unset.
    pub fragment_shader: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Glint".to_string(),
            width: 800,
            height: 600,
            validation: cfg!(debug_assertions),
            vertex_shader: None,
            fragment_shader: None,
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Override the embedded shaders with compiled SPIR-V files.
    pub fn with_shaders(
        mut self,
        vertex: impl Into<PathBuf>,
        fragment: impl Into<PathBuf>,
    ) -> Self {
        self.vertex_shader = Some(vertex.into());
        self.fragment_shader = Some(fragment.into());
        self
    }
}
