use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use meshview_core::ViewerConfig;
use meshview_core::dialog::LogBuffer;

mod abs;
mod logging;
mod other;
mod render;
mod ui;
mod viewer;

/// Interactive OpenGL viewer for OBJ meshes.
#[derive(Parser, Debug)]
#[command(name = "meshview", version, about)]
struct Args {
    /// Mesh to open at startup.
    mesh: Option<PathBuf>,

    /// Configuration file. Defaults to the per-user config, if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of the configuration.
    #[arg(short, long)]
    verbose: bool,

    /// Block on input between frames instead of redrawing continuously.
    #[arg(long)]
    wait: bool,
}

fn load_config(args: &Args) -> anyhow::Result<ViewerConfig> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::load_default()?,
    };
    if args.wait {
        config.wait_events = true;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args).context("cannot load configuration")?;

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        config.level_filter()
    };
    let log = LogBuffer::default();
    logging::setup(level, log.clone()).context("cannot install logger")?;

    let mut viewer = viewer::Viewer::new(config, log).context("cannot start the viewer")?;
    if let Some(mesh) = &args.mesh {
        viewer.open(mesh);
    }
    viewer.run()
}
