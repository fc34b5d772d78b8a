// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_PATH: &str = "vkboot.toml";

/// Everything the initialization chain needs to know up front.
#[derive(Debug, Clone, Deserialize)]
pub struct InitConfig {
    #[serde(default = "default_validation")]
    pub enable_validation: bool,
    #[serde(default = "default_layers")]
    pub validation_layers: Vec<String>,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub present_mode: PresentModePolicy,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub shaders: ShaderPaths,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PresentModePolicy {
    /// Always FIFO (vsync).
    Fifo,
    /// Mailbox, then immediate, then FIFO.
    #[default]
    LowLatency,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub resizable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShaderPaths {
    #[serde(default = "default_vertex_shader")]
    pub vertex: PathBuf,
    #[serde(default = "default_fragment_shader")]
    pub fragment: PathBuf,
}

impl Default for InitConfig {
    fn default() -> Self {
        InitConfig {
            enable_validation: default_validation(),
            validation_layers: default_layers(),
            app_name: default_app_name(),
            present_mode: PresentModePolicy::default(),
            window: WindowConfig::default(),
            shaders: ShaderPaths::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: false,
        }
    }
}

impl Default for ShaderPaths {
    fn default() -> Self {
        ShaderPaths {
            vertex: default_vertex_shader(),
            fragment: default_fragment_shader(),
        }
    }
}

fn default_validation() -> bool {
    cfg!(debug_assertions)
}
fn default_layers() -> Vec<String> {
    vec!["VK_LAYER_KHRONOS_validation".to_owned()]
}
fn default_app_name() -> String {
    "Hello Triangle".to_owned()
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_title() -> String {
    "Vulkan".to_owned()
}
fn default_vertex_shader() -> PathBuf {
    PathBuf::from("shaders/vert.spv")
}
fn default_fragment_shader() -> PathBuf {
    PathBuf::from("shaders/frag.spv")
}

impl InitConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Missing file → defaults. Malformed file → defaults plus a warning.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s).unwrap_or_else(|e| {
                warn!("ignoring malformed {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => {
                debug!("no config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }
}
