mod config;
mod constants;
mod geo;
mod notify;
mod paths;
mod picker;
mod provider;
mod stops;
pub mod theme;
mod ui;

use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use constants::{DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};

/// Log to stdout and `logs/pindrop.log` in debug builds.
///
/// The returned guard flushes the file writer on drop and must live until
/// the app exits. Levels come from `RUST_LOG`, defaulting to info with
/// debug for this crate.
#[cfg(debug_assertions)]
fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use std::io::Write;
    use tracing_subscriber::prelude::*;

    let logs_dir = paths::logs_dir();
    if std::fs::create_dir_all(&logs_dir).is_err() {
        eprintln!("Failed to create logs directory");
        return None;
    }

    // A visible marker between runs, since the log file only ever grows
    if let Ok(mut file) = std::fs::OpenOptions::new()
        .append(true)
        .open(logs_dir.join("pindrop.log"))
    {
        let _ = writeln!(
            file,
            "\n----- pindrop started {} -----",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&logs_dir, "pindrop.log"));

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,pindrop=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    Some(guard)
}

#[cfg(not(debug_assertions))]
fn setup_logging() -> Option<()> {
    None
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn main() {
    // Keep the guard alive for the duration of the program
    let _log_guard = setup_logging();
    if let Err(e) = paths::ensure_directories() {
        eprintln!("Failed to create application directories: {}", e);
    }
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Pindrop".into(),
                resolution: (DEFAULT_WINDOW_WIDTH as u32, DEFAULT_WINDOW_HEIGHT as u32).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin::default())
        .add_plugins(config::ConfigPlugin)
        .add_plugins(stops::StopBoardPlugin)
        .add_plugins(picker::LocationPickerPlugin)
        .add_plugins(notify::NotifyPlugin)
        .add_plugins(ui::UiPlugin)
        .add_systems(Startup, spawn_camera)
        .run();
}
