//! Example: Difficulty Flow
//!
//! Sets the difficulty multiplier, starts a run, and confirms the fire
//! cooldown scales while fuel depletes. Also records JS coverage for
//! the session.
//!
//! Serve the export on localhost:8080 first, then run with:
//! `cargo run --example difficulty_flow --features browser`

use ensayo::flows;
use ensayo::prelude::*;
use std::path::Path;

#[tokio::main]
async fn main() -> EnsayoResult<()> {
    tracing_subscriber::fmt().with_env_filter("ensayo=debug").init();

    let config = HarnessConfig::default().with_artifact_dir("target/ensayo-artifacts");
    let mut harness = Harness::new(config);
    harness.launch().await?;
    harness.page()?.start_coverage(&CoverageConfig::new()).await?;
    harness.navigate_and_wait_ready().await?;

    let result = scenario(&harness).await;

    if result.is_ok() {
        let report = harness.page()?.take_coverage().await?;
        let game = report.filter_by_url("localhost:8080");
        print!("{}", game.summary());
        game.save_json(Path::new("target/ensayo-coverage.json"))?;
    }

    harness.conclude("difficulty_flow", result).await
}

async fn scenario(harness: &Harness) -> EnsayoResult<()> {
    flows::verify_game_title(harness).await?;
    flows::open_options_menu(harness).await?;
    flows::set_log_level(harness, GameLogLevel::Debug).await?;

    // 0.15 base cooldown x 2.0 difficulty = 0.3
    flows::set_difficulty(harness, 2.0).await?;
    flows::start_game(harness).await?;
    let fuel_cp = harness.checkpoint()?;
    flows::fire_and_expect_cooldown(harness, 2.0).await?;

    println!("watching fuel...");
    let wait = WaitOptions::new().with_timeout(15_000);
    let (first, last) = flows::watch_fuel_depletion(harness, fuel_cp, 3, wait).await?;
    println!("fuel dropped {first} -> {last}");

    println!("idling until fuel runs low...");
    let wait = WaitOptions::new().with_timeout(60_000);
    let (_, last) = flows::watch_fuel_until_below(harness, fuel_cp, 50.0, wait).await?;
    println!("fuel down to {last}");

    println!("difficulty flow passed");
    Ok(())
}
