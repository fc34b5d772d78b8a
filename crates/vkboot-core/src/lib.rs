// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
pub mod config;
pub mod fs;

pub use config::{InitConfig, PresentModePolicy, ShaderPaths, WindowConfig, DEFAULT_CONFIG_PATH};
pub use fs::{read_bytes, FileError};

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
