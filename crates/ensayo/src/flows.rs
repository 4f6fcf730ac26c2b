//! Reusable scenario flows over a ready harness.
//!
//! Every flow follows the same shape: checkpoint the log buffer, drive
//! one action, give the game a beat to react, then assert only against
//! entries produced after the checkpoint. Scenario tests compose these
//! instead of re-driving raw actions.

use crate::action::Action;
use crate::assertion::{assert_approx_eq, LogPredicate};
use crate::console::{ConsoleEntry, LogCheckpoint};
use crate::controls::{
    self, bus_muted, difficulty_changed, log_level_changed, reset_applied, reset_pressed,
    scaled_cooldown, volume_changed, AudioBus, GameHook, GameLogLevel, DEFAULT_VOLUME,
};
use crate::harness::Harness;
use crate::result::{EnsayoError, EnsayoResult};
use crate::wait::{settle, WaitOptions};
use serde_json::json;
use std::time::{Duration, Instant};

/// Beat between driving an action and asserting on its logs.
const SETTLE: Duration = Duration::from_millis(300);

/// Key that fires the weapon in-game.
pub const FIRE_KEY: &str = " ";

/// Open the options menu through the DOM overlay button.
///
/// # Errors
///
/// Returns [`EnsayoError::SelectorTimeout`] if the overlay never shows.
pub async fn open_options_menu(harness: &Harness) -> EnsayoResult<()> {
    let wait = harness.config().wait;
    harness
        .page()?
        .wait_for_visible(controls::OPTIONS_BUTTON_ID, wait)
        .await?;
    harness
        .drive(&Action::ClickId {
            id: controls::OPTIONS_BUTTON_ID.to_string(),
        })
        .await?;
    settle(SETTLE).await;
    Ok(())
}

/// Confirm the page title names the game, catching a wrong deployment
/// before any flow runs against it.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] on an unexpected title.
pub async fn verify_game_title(harness: &Harness) -> EnsayoResult<()> {
    let title = harness.page()?.title().await?;
    if title.contains(controls::GAME_TITLE) {
        Ok(())
    } else {
        Err(EnsayoError::AssertionMismatch {
            message: format!(
                "page title '{title}' does not name {}",
                controls::GAME_TITLE
            ),
            scoped_logs: Vec::new(),
        })
    }
}

/// Switch the game's log level and confirm the echo.
///
/// Scenarios run at DEBUG so every observable message is emitted.
///
/// # Errors
///
/// Returns [`EnsayoError::SelectorTimeout`] if the dropdown never shows,
/// or [`EnsayoError::AssertionMismatch`] if the echo never arrives.
pub async fn set_log_level(harness: &Harness, level: GameLogLevel) -> EnsayoResult<()> {
    let wait = harness.config().wait;
    harness
        .page()?
        .wait_for_visible(controls::LOG_LEVEL_SELECT_ID, wait)
        .await?;
    let cp = harness.checkpoint()?;
    harness
        .drive(&Action::call_hook(
            GameHook::ChangeLogLevel.name(),
            vec![json!(level.index())],
        ))
        .await?;
    settle(SETTLE).await;
    harness.assert_log(&log_level_changed(level), cp)?;
    Ok(())
}

/// Open the audio sub-menu and wait for the mixer to show.
///
/// # Errors
///
/// Returns [`EnsayoError::SelectorTimeout`] if the audio button never
/// shows or the mixer never opens.
pub async fn open_audio_menu(harness: &Harness) -> EnsayoResult<()> {
    let wait = harness.config().wait;
    harness
        .page()?
        .wait_for_visible(controls::AUDIO_BUTTON_ID, wait)
        .await?;
    harness
        .drive(&Action::call_hook(GameHook::AudioPressed.name(), vec![json!(0)]))
        .await?;
    settle(SETTLE).await;
    harness
        .page()?
        .wait_for_visible(AudioBus::Master.slider_id(), wait)
        .await
}

/// Leave the audio sub-menu.
///
/// # Errors
///
/// Propagates the drive error.
pub async fn close_audio_menu(harness: &Harness) -> EnsayoResult<()> {
    harness
        .drive(&Action::call_hook(
            GameHook::AudioBackPressed.name(),
            Vec::new(),
        ))
        .await?;
    settle(SETTLE).await;
    Ok(())
}

/// Set a bus volume and confirm the change was applied.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] if no confirmation log
/// arrives, e.g. because the bus is locked by a mute.
pub async fn set_volume(harness: &Harness, bus: AudioBus, value: f64) -> EnsayoResult<()> {
    let cp = harness.checkpoint()?;
    harness
        .drive(&Action::call_hook(bus.volume_hook().name(), vec![json!(value)]))
        .await?;
    settle(SETTLE).await;
    harness.assert_log(&volume_changed(bus, value), cp)?;
    Ok(())
}

/// Attempt a volume change that should be rejected, confirming the
/// expected warning, the absence of a change confirmation, and that the
/// bus slider kept its pre-action value.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] if the warning is missing,
/// the change was confirmed anyway, or the slider moved.
pub async fn expect_volume_locked(
    harness: &Harness,
    bus: AudioBus,
    value: f64,
    warning: &LogPredicate,
) -> EnsayoResult<()> {
    let before = slider_value(harness, bus.slider_id()).await?;
    let cp = harness.checkpoint()?;
    harness
        .drive(&Action::call_hook(bus.volume_hook().name(), vec![json!(value)]))
        .await?;
    settle(SETTLE).await;
    harness.assert_log(warning, cp)?;
    harness.assert_no_log(&volume_changed(bus, value), cp)?;
    verify_slider_value(harness, bus.slider_id(), before).await
}

/// Mute or unmute a bus. Muting confirms the "<bus> is muted" log.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] on a missing confirmation.
pub async fn set_mute(harness: &Harness, bus: AudioBus, muted: bool) -> EnsayoResult<()> {
    let cp = harness.checkpoint()?;
    // The hook takes the checkbox's new state: 0 mutes, 1 unmutes.
    let arg = i32::from(!muted);
    harness
        .drive(&Action::call_hook(bus.mute_hook().name(), vec![json!(arg)]))
        .await?;
    settle(SETTLE).await;
    if muted {
        harness.assert_log(&bus_muted(bus), cp)?;
    }
    Ok(())
}

/// Press the audio reset, confirm both echoes (press and applied), then
/// verify every slider and mute checkbox is back at its default.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] on any residual state.
pub async fn reset_audio(harness: &Harness) -> EnsayoResult<()> {
    let cp = harness.checkpoint()?;
    harness
        .drive(&Action::call_hook(
            GameHook::AudioResetPressed.name(),
            Vec::new(),
        ))
        .await?;
    settle(SETTLE).await;
    harness.assert_log(&reset_pressed(), cp)?;
    harness.assert_log(&reset_applied(), cp)?;
    verify_audio_defaults(harness).await
}

/// Check all five buses sit at the default volume, unmuted.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] naming the stray control.
pub async fn verify_audio_defaults(harness: &Harness) -> EnsayoResult<()> {
    let page = harness.page()?;
    for bus in AudioBus::ALL {
        verify_slider_value(harness, bus.slider_id(), DEFAULT_VOLUME).await?;

        // Checked means unmuted.
        if !page.element_checked(bus.mute_id()).await? {
            return Err(EnsayoError::AssertionMismatch {
                message: format!("#{} should be checked after reset", bus.mute_id()),
                scoped_logs: Vec::new(),
            });
        }
    }
    Ok(())
}

/// Check a slider sits at the expected value, within float tolerance.
///
/// Used for round-trips: set a volume, leave and re-enter the menu,
/// then confirm the value survived.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] on a differing value.
pub async fn verify_slider_value(harness: &Harness, id: &str, expected: f64) -> EnsayoResult<()> {
    let value = slider_value(harness, id).await?;
    assert_approx_eq(id, expected, value, 1e-6)
}

/// Read a slider's current value as a number.
async fn slider_value(harness: &Harness, id: &str) -> EnsayoResult<f64> {
    let raw = harness.page()?.element_value(id).await?;
    raw.parse().map_err(|_| EnsayoError::AssertionMismatch {
        message: format!("#{id} value '{raw}' is not a number"),
        scoped_logs: Vec::new(),
    })
}

/// Set the difficulty multiplier and confirm the echo.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] if the echo never arrives.
pub async fn set_difficulty(harness: &Harness, multiplier: f64) -> EnsayoResult<()> {
    let cp = harness.checkpoint()?;
    harness
        .drive(&Action::call_hook(
            GameHook::ChangeDifficulty.name(),
            vec![json!(multiplier)],
        ))
        .await?;
    settle(SETTLE).await;
    harness.assert_log(&difficulty_changed(multiplier), cp)?;
    Ok(())
}

/// Fire once and confirm the cooldown was scaled by the multiplier.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] if the cooldown log is
/// missing or carries the wrong value.
pub async fn fire_and_expect_cooldown(harness: &Harness, multiplier: f64) -> EnsayoResult<()> {
    let cp = harness.checkpoint()?;
    harness
        .drive(&Action::PressKey {
            key: FIRE_KEY.to_string(),
        })
        .await?;
    settle(SETTLE).await;
    harness.assert_log(&scaled_cooldown(multiplier), cp)?;
    Ok(())
}

/// Enter the game from the main menu through the coordinate table.
///
/// # Errors
///
/// Returns [`EnsayoError::ElementNotFound`] if the table or canvas is
/// missing the entry.
pub async fn start_game(harness: &Harness) -> EnsayoResult<()> {
    harness
        .drive(&Action::ClickElement {
            name: "start_game_button".to_string(),
        })
        .await?;
    settle(SETTLE).await;
    Ok(())
}

/// Fuel readings extracted from a scoped log slice, in arrival order.
#[must_use]
pub fn fuel_readings(entries: &[ConsoleEntry]) -> Vec<f64> {
    entries
        .iter()
        .filter_map(|entry| controls::parse_fuel(&entry.text))
        .collect()
}

/// Assert a slice of fuel readings is strictly decreasing.
///
/// Returns the first and last readings on success.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] on too few readings or a
/// non-decreasing step.
pub fn assert_fuel_decreasing(readings: &[f64]) -> EnsayoResult<(f64, f64)> {
    let (&first, &last) = match (readings.first(), readings.last()) {
        (Some(first), Some(last)) if readings.len() >= 2 => (first, last),
        _ => {
            return Err(EnsayoError::AssertionMismatch {
                message: format!("need at least 2 fuel readings, got {}", readings.len()),
                scoped_logs: Vec::new(),
            })
        }
    };
    for pair in readings.windows(2) {
        if pair[1] >= pair[0] {
            return Err(EnsayoError::AssertionMismatch {
                message: format!("fuel did not decrease: {} -> {}", pair[0], pair[1]),
                scoped_logs: Vec::new(),
            });
        }
    }
    Ok((first, last))
}

/// Watch the log buffer until at least `min_ticks` fuel readings have
/// arrived after `cp`, then assert they are strictly decreasing.
///
/// The checkpoint is caller-supplied so ticks that landed between
/// starting the run and entering the watch still count.
///
/// # Errors
///
/// Returns [`EnsayoError::PollTimeout`] if the ticks never arrive, or
/// [`EnsayoError::AssertionMismatch`] if fuel failed to drop.
pub async fn watch_fuel_depletion(
    harness: &Harness,
    cp: LogCheckpoint,
    min_ticks: usize,
    options: WaitOptions,
) -> EnsayoResult<(f64, f64)> {
    let logs = harness.logs()?;
    let start = Instant::now();
    loop {
        let readings = fuel_readings(&logs.since(cp));
        if readings.len() >= min_ticks {
            return assert_fuel_decreasing(&readings);
        }
        if start.elapsed() >= options.timeout() {
            return Err(EnsayoError::PollTimeout {
                ms: options.timeout_ms,
                waited_for: format!("{min_ticks} fuel ticks"),
            });
        }
        settle(options.poll_interval()).await;
    }
}

/// Idle until the fuel gauge drops below `threshold`, asserting the
/// readings after `cp` ticked strictly downward on the way.
///
/// # Errors
///
/// Returns [`EnsayoError::PollTimeout`] if fuel never gets that low, or
/// [`EnsayoError::AssertionMismatch`] on a non-decreasing tick.
pub async fn watch_fuel_until_below(
    harness: &Harness,
    cp: LogCheckpoint,
    threshold: f64,
    options: WaitOptions,
) -> EnsayoResult<(f64, f64)> {
    let logs = harness.logs()?;
    let start = Instant::now();
    loop {
        let scoped = logs.since(cp);
        if controls::last_fuel_reading(&scoped).is_some_and(|last| last < threshold) {
            return assert_fuel_decreasing(&fuel_readings(&scoped));
        }
        if start.elapsed() >= options.timeout() {
            return Err(EnsayoError::PollTimeout {
                ms: options.timeout_ms,
                waited_for: format!("fuel below {threshold}"),
            });
        }
        settle(options.poll_interval()).await;
    }
}
