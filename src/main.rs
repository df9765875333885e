use anyhow::Context;
use physbox::config::{load_settings, SandboxSettings};
use physbox::level::BspLevel;
use physbox::rendering::{HeadlessRenderer, Viewport};
use physbox::sandbox::Sandbox;
use physbox::utils::logging::{init_logging, log_system_info};
use std::path::PathBuf;
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;
    log_system_info();

    // An explicit settings file wins over the per-user one
    let settings = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => SandboxSettings::load_from(&path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => load_settings().unwrap_or_default(),
    };
    info!("Level: {}", settings.level.path.display());

    let level = BspLevel::new(&settings.level.path, settings.level.bsp_scaling);
    let renderer = HeadlessRenderer::new(Viewport::default(), settings.camera.field_of_view);
    let sandbox = Sandbox::new(settings, Box::new(level)).context("failed to build the scene")?;

    physbox::app::run(sandbox, renderer)
}
