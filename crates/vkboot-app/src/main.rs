// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use vkboot_core::{init_tracing, FileError, InitConfig, DEFAULT_CONFIG_PATH};
use vkboot_render::{RenderSize, SurfaceTarget};
use vkboot_render_vk::{AshDriver, InitError, VkContext};

use vkboot_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file; defaults apply when it is missing
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force validation layers on
    #[arg(long, conflicts_with = "no_validation")]
    validation: bool,

    /// Force validation layers off
    #[arg(long)]
    no_validation: bool,
}

impl Args {
    fn apply(&self, cfg: &mut InitConfig) {
        if self.validation {
            cfg.enable_validation = true;
        } else if self.no_validation {
            cfg.enable_validation = false;
        }
    }
}

struct App {
    cfg: InitConfig,
    // Field order matters: the context must go before the window it presents to.
    gpu: Option<VkContext<AshDriver>>,
    window: Option<Window>,
    init_error: Option<anyhow::Error>,
}

impl App {
    fn bring_up(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = event_loop
            .create_window(vkboot_platform::window_attributes(&self.cfg.window))
            .context("failed to create window")?;

        let size = window.inner_size();
        let render_size = RenderSize {
            width: size.width.max(1),
            height: size.height.max(1),
        };
        let target = SurfaceTarget::from_window(&window).context("window has no raw handles")?;
        // Keep the window alive before anything can bind a surface to it.
        self.window = Some(window);

        let driver = AshDriver::load()?;
        let gpu = VkContext::new(driver, &self.cfg, &target, render_size).inspect_err(|e| {
            if let InitError::ShaderFile(FileError::NotFound { .. }) = e {
                warn!("compiled shaders are missing; run `cargo xtask shaders` first");
            }
        })?;
        self.gpu = Some(gpu);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() && self.init_error.is_none() {
            if let Err(e) = self.bring_up(event_loop) {
                error!("vulkan init failed: {e:#}");
                self.gpu = None;
                self.window = None;
                self.init_error = Some(e);
                event_loop.exit();
                return;
            }
            info!("window open; waiting for close");
        }
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        if let WindowEvent::CloseRequested = event {
            info!("CloseRequested");
            self.gpu = None;
            self.window = None;
            event_loop.exit();
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut cfg = InitConfig::load(&args.config);
    args.apply(&mut cfg);
    info!(
        "config: validation={}, present_mode={:?}, window={}x{}",
        cfg.enable_validation, cfg.present_mode, cfg.window.width, cfg.window.height
    );

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App {
        cfg,
        gpu: None,
        window: None,
        init_error: None,
    };
    event_loop.run_app(&mut app)?;

    // Explicit so teardown happens before the event loop goes away.
    drop(app.gpu.take());
    drop(app.window.take());

    match app.init_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["vkboot"]).unwrap();
        assert_eq!(args.config, PathBuf::from("vkboot.toml"));
        assert!(!args.validation && !args.no_validation);

        let mut cfg = InitConfig {
            enable_validation: true,
            ..InitConfig::default()
        };
        args.apply(&mut cfg);
        assert!(cfg.enable_validation);
    }

    #[test]
    fn test_validation_flags_override_config() {
        let mut cfg = InitConfig::default();
        Args::try_parse_from(["vkboot", "--no-validation"])
            .unwrap()
            .apply(&mut cfg);
        assert!(!cfg.enable_validation);

        Args::try_parse_from(["vkboot", "--validation", "--config", "x.toml"])
            .unwrap()
            .apply(&mut cfg);
        assert!(cfg.enable_validation);
    }

    #[test]
    fn test_validation_flags_conflict() {
        assert!(Args::try_parse_from(["vkboot", "--validation", "--no-validation"]).is_err());
    }
}
