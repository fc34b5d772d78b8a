// SPDX-License-Identifier: CEPL-1.0
//! Developer tasks. Run through the cargo alias: `cargo xtask shaders`.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use vkboot_core::init_tracing;

#[derive(Parser, Debug)]
#[command(about = "vkboot developer tasks")]
struct Args {
    #[command(subcommand)]
    task: Task,
}

#[derive(Subcommand, Debug)]
enum Task {
    /// Compile shaders/*.vert and shaders/*.frag into vert.spv / frag.spv
    Shaders {
        /// Recompile even when the output is newer than the source
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    match Args::parse().task {
        Task::Shaders { force } => compile_shaders(&workspace_root(), force),
    }
}

fn workspace_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.parent().unwrap_or(manifest).to_path_buf()
}

/// One blob per stage, named after the stage, where the default config looks.
fn spv_name(src: &Path) -> Option<&'static str> {
    match src.extension().and_then(OsStr::to_str)? {
        "vert" => Some("vert.spv"),
        "frag" => Some("frag.spv"),
        _ => None,
    }
}

fn is_up_to_date(src: &Path, dst: &Path) -> bool {
    let modified = |p: &Path| p.metadata().and_then(|m| m.modified()).ok();
    match (modified(src), modified(dst)) {
        (Some(s), Some(d)) => s <= d,
        _ => false,
    }
}

fn compile_shaders(root: &Path, force: bool) -> Result<()> {
    let dir = root.join("shaders");
    let glslc = env::var_os("GLSLC").unwrap_or_else(|| "glslc".into());

    let mut compiled = 0u32;
    let mut skipped = 0u32;
    for entry in fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
        let src = entry?.path();
        let Some(name) = spv_name(&src) else {
            continue;
        };
        let dst = dir.join(name);
        if !force && is_up_to_date(&src, &dst) {
            skipped += 1;
            continue;
        }

        info!("compiling {} -> {}", src.display(), dst.display());
        let status = Command::new(&glslc)
            .arg(&src)
            .arg("-o")
            .arg(&dst)
            .status()
            .with_context(|| {
                format!("failed to run {glslc:?}; install the Vulkan SDK or set GLSLC")
            })?;
        if !status.success() {
            bail!("{glslc:?} failed on {} ({status})", src.display());
        }
        compiled += 1;
    }

    info!("shaders: {compiled} compiled, {skipped} up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spv_name_by_stage() {
        assert_eq!(spv_name(Path::new("shaders/shader.vert")), Some("vert.spv"));
        assert_eq!(spv_name(Path::new("shader.frag")), Some("frag.spv"));
        assert_eq!(spv_name(Path::new("shaders/vert.spv")), None);
        assert_eq!(spv_name(Path::new("shaders/README")), None);
    }

    #[test]
    fn test_missing_output_is_stale() {
        let dir = env::temp_dir().join(format!("vkboot-xtask-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let src = dir.join("shader.vert");
        fs::write(&src, "#version 450\nvoid main() {}\n").unwrap();

        assert!(!is_up_to_date(&src, &dir.join("vert.spv")));

        let dst = dir.join("vert.spv");
        fs::write(&dst, [0u8; 4]).unwrap();
        let src_time = src.metadata().unwrap().modified().unwrap();
        let dst_time = dst.metadata().unwrap().modified().unwrap();
        assert_eq!(is_up_to_date(&src, &dst), src_time <= dst_time);
    }

    #[test]
    fn test_workspace_root_holds_shaders() {
        assert!(workspace_root().join("shaders").join("shader.vert").is_file());
    }

    #[test]
    fn test_shaders_task_parses() {
        let args = Args::try_parse_from(["xtask", "shaders", "--force"]).unwrap();
        assert!(matches!(args.task, Task::Shaders { force: true }));
    }
}
