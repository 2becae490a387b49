//! `info` command implementation.

use anyhow::Result;
use contracts::{RecordingFormat, SessionConfig};
use lockstep::LOCKSTEP_DELTA_SECONDS;
use tracing::info;

use super::load_config;
use crate::cli::{InfoArgs, InfoFormat};

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    match &args.config {
        Some(path) => info!(config = %path.display(), "Loading configuration info"),
        None => info!("Showing built-in default configuration"),
    }

    let config = load_config(args.config.as_deref())?;

    match args.format {
        InfoFormat::Tree => print_config_info(&config),
        InfoFormat::Toml => println!("{}", config_loader::ConfigLoader::to_toml(&config)?),
        InfoFormat::Json => println!("{}", config_loader::ConfigLoader::to_json(&config)?),
    }

    Ok(())
}

fn print_config_info(config: &SessionConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Lane Session Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 World");
    println!("   ├─ Town: {}", config.town);
    println!(
        "   ├─ CARLA: {}:{} (timeout {}s)",
        config.carla.host, config.carla.port, config.carla.timeout_sec
    );
    println!("   └─ Lock-step: {} Hz", 1.0 / LOCKSTEP_DELTA_SECONDS);

    let vehicle = &config.vehicle;
    println!("\n🚗 Vehicle");
    println!("   ├─ Blueprint: {}", vehicle.blueprint);
    match (vehicle.spawn_point_index, vehicle.spawn_seed) {
        (Some(index), _) => println!("   ├─ Spawn point: #{}", index),
        (None, Some(seed)) => println!("   ├─ Spawn point: random (seed {})", seed),
        (None, None) => println!("   ├─ Spawn point: random"),
    }
    println!("   └─ Autopilot on start: {}", vehicle.autopilot_on_start);

    let camera = &config.camera;
    let location = camera.transform.location;
    let rotation = camera.transform.rotation;
    println!("\n📷 Camera");
    println!("   ├─ Blueprint: {}", camera.blueprint);
    println!(
        "   ├─ Resolution: {}x{}, fov {}",
        camera.width, camera.height, camera.fov
    );
    println!(
        "   └─ Mount: x={} y={} z={} pitch={} yaw={} roll={}",
        location.x, location.y, location.z, rotation.pitch, rotation.yaw, rotation.roll
    );

    println!("\n🔍 Validation");
    println!("   ├─ Enabled: {}", config.validation_mode);
    println!("   ├─ Starts after: {}s simulated", config.validation.start_after_sec);
    match &config.validation.log_path {
        Some(path) => println!("   └─ Log file: {}", path.display()),
        None => println!("   └─ Log file: (none)"),
    }

    let recording = &config.recording;
    println!("\n🎬 Recording");
    println!("   ├─ Enabled: {}", config.enable_recording);
    println!(
        "   ├─ Format: {}",
        match recording.format {
            RecordingFormat::RawBgr => "raw BGR24 + JSON sidecar",
            RecordingFormat::PngSequence => "PNG sequence",
        }
    );
    println!("   ├─ Output: {}", recording.output_dir.display());
    println!("   └─ FPS: {}", recording.fps);

    println!("\n⏱️  Loop pacing");
    if config.pacing.target_fps == 0 {
        println!("   └─ Target: unthrottled");
    } else {
        println!("   └─ Target: {} it/s", config.pacing.target_fps);
    }
    println!();
}
