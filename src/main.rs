//! Stagehand - loads a scene document, builds its graph and drives frames
//! through the renderer boundary, either headless or from a window.

use std::process::ExitCode;
use std::time::{Duration, Instant};

use stagehand::app::{self, AppError, SceneApp};
use stagehand::config::{AppConfig, ConfigError, USAGE};
use stagehand::render::NullRenderer;

fn run(config: AppConfig) -> Result<(), AppError> {
    let loaded = app::load_scene_file(&config.scene_path, config.root.as_deref())?;

    let built = &loaded.built;
    if config.list {
        for name in built.names() {
            println!("{name}");
        }
    }
    for diagnostic in &built.report.diagnostics {
        println!("warning [{}]: {}", diagnostic.node, diagnostic.kind);
    }
    println!("fingerprint {}", built.fingerprint());

    let mut app = SceneApp::new(loaded, config.window_size);
    let mut renderer = NullRenderer::default();
    if config.windowed {
        // NullRenderer only counts draws; the window stays blank.
        log::info!("Window mode drives the event loop without drawing");
        return app::run_windowed(app, renderer, config.window_size);
    }

    let step = Duration::from_secs_f32(1.0 / config.fps);
    let mut now = Instant::now();
    for _ in 0..config.frames {
        app.frame(now, &mut renderer)?;
        now += step;
    }
    log::info!(
        "Drove {} frames ({} meshes, {} lights in the last one)",
        renderer.frames,
        renderer.last_draw_count,
        renderer.last_light_count
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = match AppConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(ConfigError::HelpRequested) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("error: {err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    log::info!("🎬 Stagehand - {}", config.scene_path.display());
    match run(config) {
        Ok(()) => {
            log::info!("👋 Goodbye!");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
