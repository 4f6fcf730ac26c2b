//! Example: Audio Mixer Flow
//!
//! Drives the served export through the audio mixer: adjusts each bus,
//! exercises the master-mute lock, then resets to defaults.
//!
//! Serve the export on localhost:8080 first, then run with:
//! `cargo run --example audio_mixer_flow --features browser`

use ensayo::flows;
use ensayo::prelude::*;

#[tokio::main]
async fn main() -> EnsayoResult<()> {
    tracing_subscriber::fmt().with_env_filter("ensayo=debug").init();

    let config = HarnessConfig::default().with_artifact_dir("target/ensayo-artifacts");
    let mut harness = Harness::new(config);
    harness.launch().await?;
    harness.navigate_and_wait_ready().await?;

    let result = scenario(&harness).await;
    harness.conclude("audio_mixer_flow", result).await
}

async fn scenario(harness: &Harness) -> EnsayoResult<()> {
    flows::verify_game_title(harness).await?;
    flows::open_options_menu(harness).await?;
    flows::set_log_level(harness, GameLogLevel::Debug).await?;
    flows::open_audio_menu(harness).await?;

    println!("adjusting each bus...");
    for (bus, value) in [
        (AudioBus::Master, 0.8),
        (AudioBus::Music, 0.3),
        (AudioBus::Sfx, 0.6),
        (AudioBus::Weapon, 0.9),
        (AudioBus::Rotors, 0.4),
    ] {
        flows::set_volume(harness, bus, value).await?;
        println!("  {} -> {value}", bus.label());
    }

    println!("master mute locks sub-volumes...");
    flows::set_mute(harness, AudioBus::Master, true).await?;
    flows::expect_volume_locked(harness, AudioBus::Music, 0.5, &master_locked_warning()).await?;
    flows::set_mute(harness, AudioBus::Master, false).await?;

    println!("reset restores defaults...");
    flows::reset_audio(harness).await?;
    flows::reset_audio(harness).await?; // idempotent

    println!("audio mixer flow passed");
    Ok(())
}
