// src/main.rs
use anyhow::{Context, Result};
use tracing::{info, warn};

use magic_mirror::config::AppConfig;
use magic_mirror::data::OverlayRecorder;
use magic_mirror::scene::{BackgroundImage, OverlayScene, Transform};
use magic_mirror::simulation::SimulatedKinect;
use magic_mirror::PoseOverlay;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => AppConfig::default(),
    };

    info!(
        frames = config.frames,
        people = config.simulation.person_count,
        player = config.overlay.player_index,
        "Starting magic mirror session"
    );

    let sensor = SimulatedKinect::new(config.simulation.clone())
        .context("Failed to initialize simulated sensor")?;
    let dt = 1.0 / f64::from(config.simulation.frame_rate.max(1.0));

    let mut overlay = PoseOverlay::new(config.overlay.clone(), Some(sensor));
    let mut scene = OverlayScene::new()
        .with_camera(config.camera)
        .with_background(BackgroundImage::new())
        .with_overlay(Transform::default())
        .with_lower_arm(Transform::default())
        .with_upper_arm(Transform::default());

    overlay.start(&scene);

    let mut recorder = OverlayRecorder::new(&config.output_directory, None);
    let mut timestamp = 0.0;

    for frame in 0..config.frames {
        if let Some(sensor) = overlay.tracking_mut() {
            sensor.advance(dt);
        }
        let report = overlay.update(&mut scene);
        recorder.add_frame(frame, timestamp, report, &scene);
        timestamp += dt;
    }

    let stats = recorder.stats();
    info!(
        frames = stats.frames,
        ready = stats.ready_frames,
        tracked = stats.person_frames,
        overlay_moves = stats.overlay_moves,
        arm_updates = stats.arm_updates,
        "Session finished"
    );

    let background_bound = scene
        .background
        .as_deref()
        .map_or(false, |background| background.texture().is_some());
    if !background_bound {
        warn!("Color feed never became available; background left unbound");
    }

    if config.export {
        let csv_path = recorder.export_csv().context("Failed to export overlay data")?;
        let report_path = recorder.generate_report().context("Failed to write session report")?;
        info!("Overlay data written to {}", csv_path.display());
        info!("Session report written to {}", report_path.display());
    }

    Ok(())
}
