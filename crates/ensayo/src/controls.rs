//! Typed bindings for the game's control surface.
//!
//! The HTML5 export ships a DOM overlay (sliders, mute checkboxes,
//! buttons) plus page-global hooks that bypass simulated input for
//! determinism. Console message text is the contract for observing the
//! effects; the builders here produce the matching predicates so the
//! expected strings live in one place instead of being copy-pasted
//! across tests.

use crate::assertion::LogPredicate;
use crate::console::ConsoleEntry;

/// Readiness flag the game sets once startup completes.
pub const READINESS_SIGNAL: &str = "window.godotInitialized";

/// Substring expected in the page title once the game has loaded.
pub const GAME_TITLE: &str = "SkyLockAssault";

/// Overlay button opening the options menu.
pub const OPTIONS_BUTTON_ID: &str = "options-button";

/// Overlay button opening the audio sub-menu.
pub const AUDIO_BUTTON_ID: &str = "audio-button";

/// Log level dropdown in the options menu overlay.
pub const LOG_LEVEL_SELECT_ID: &str = "log-level-select";

/// Difficulty slider in the options menu overlay.
pub const DIFFICULTY_SLIDER_ID: &str = "difficulty-slider";

/// Default volume every bus returns to on reset.
pub const DEFAULT_VOLUME: f64 = 1.0;

/// Base weapon cooldown in seconds; scaled by the difficulty multiplier.
pub const BASE_FIRE_COOLDOWN: f64 = 0.15;

/// Page-global hooks exposed by the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameHook {
    /// `window.changeLogLevel([index])`
    ChangeLogLevel,
    /// `window.audioPressed([0])` — opens the audio sub-menu
    AudioPressed,
    /// `window.changeMasterVolume([value])`
    ChangeMasterVolume,
    /// `window.changeMusicVolume([value])`
    ChangeMusicVolume,
    /// `window.changeSfxVolume([value])`
    ChangeSfxVolume,
    /// `window.changeWeaponVolume([value])`
    ChangeWeaponVolume,
    /// `window.changeRotorsVolume([value])`
    ChangeRotorsVolume,
    /// `window.toggleMuteMaster([0|1])` — 0 mutes, 1 unmutes
    ToggleMuteMaster,
    /// `window.toggleMuteMusic([0|1])`
    ToggleMuteMusic,
    /// `window.toggleMuteSfx([0|1])`
    ToggleMuteSfx,
    /// `window.toggleMuteWeapon([0|1])`
    ToggleMuteWeapon,
    /// `window.toggleMuteRotors([0|1])`
    ToggleMuteRotors,
    /// `window.audioResetPressed([])` — restore audio defaults
    AudioResetPressed,
    /// `window.audioBackPressed([])` — back to the options menu
    AudioBackPressed,
    /// `window.changeDifficulty([multiplier])`
    ChangeDifficulty,
}

impl GameHook {
    /// The global function name on `window`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ChangeLogLevel => "changeLogLevel",
            Self::AudioPressed => "audioPressed",
            Self::ChangeMasterVolume => "changeMasterVolume",
            Self::ChangeMusicVolume => "changeMusicVolume",
            Self::ChangeSfxVolume => "changeSfxVolume",
            Self::ChangeWeaponVolume => "changeWeaponVolume",
            Self::ChangeRotorsVolume => "changeRotorsVolume",
            Self::ToggleMuteMaster => "toggleMuteMaster",
            Self::ToggleMuteMusic => "toggleMuteMusic",
            Self::ToggleMuteSfx => "toggleMuteSfx",
            Self::ToggleMuteWeapon => "toggleMuteWeapon",
            Self::ToggleMuteRotors => "toggleMuteRotors",
            Self::AudioResetPressed => "audioResetPressed",
            Self::AudioBackPressed => "audioBackPressed",
            Self::ChangeDifficulty => "changeDifficulty",
        }
    }
}

/// Audio buses exposed in the mixer menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioBus {
    /// Master bus; muting it locks every sub-volume
    Master,
    /// Music bus
    Music,
    /// SFX bus; muting it locks weapon and rotors
    Sfx,
    /// Weapon bus (under SFX)
    Weapon,
    /// Rotors bus (under SFX)
    Rotors,
}

impl AudioBus {
    /// All buses in menu order.
    pub const ALL: [Self; 5] = [Self::Master, Self::Music, Self::Sfx, Self::Weapon, Self::Rotors];

    /// Lowercase bus name as it appears in log messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Music => "music",
            Self::Sfx => "sfx",
            Self::Weapon => "weapon",
            Self::Rotors => "rotors",
        }
    }

    /// Overlay slider element id.
    #[must_use]
    pub const fn slider_id(&self) -> &'static str {
        match self {
            Self::Master => "master-slider",
            Self::Music => "music-slider",
            Self::Sfx => "sfx-slider",
            Self::Weapon => "weapon-slider",
            Self::Rotors => "rotors-slider",
        }
    }

    /// Overlay mute checkbox element id. Checked means unmuted; the
    /// default state is checked.
    #[must_use]
    pub const fn mute_id(&self) -> &'static str {
        match self {
            Self::Master => "mute-master",
            Self::Music => "mute-music",
            Self::Sfx => "mute-sfx",
            Self::Weapon => "mute-weapon",
            Self::Rotors => "mute-rotors",
        }
    }

    /// Hook adjusting this bus's volume.
    #[must_use]
    pub const fn volume_hook(&self) -> GameHook {
        match self {
            Self::Master => GameHook::ChangeMasterVolume,
            Self::Music => GameHook::ChangeMusicVolume,
            Self::Sfx => GameHook::ChangeSfxVolume,
            Self::Weapon => GameHook::ChangeWeaponVolume,
            Self::Rotors => GameHook::ChangeRotorsVolume,
        }
    }

    /// Hook toggling this bus's mute state.
    #[must_use]
    pub const fn mute_hook(&self) -> GameHook {
        match self {
            Self::Master => GameHook::ToggleMuteMaster,
            Self::Music => GameHook::ToggleMuteMusic,
            Self::Sfx => GameHook::ToggleMuteSfx,
            Self::Weapon => GameHook::ToggleMuteWeapon,
            Self::Rotors => GameHook::ToggleMuteRotors,
        }
    }
}

/// Log levels in the options dropdown, by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameLogLevel {
    /// Index 0
    Debug,
    /// Index 1
    Info,
    /// Index 2
    Warn,
    /// Index 3
    Error,
}

impl GameLogLevel {
    /// Dropdown index passed to the hook.
    #[must_use]
    pub const fn index(&self) -> u32 {
        match self {
            Self::Debug => 0,
            Self::Info => 1,
            Self::Warn => 2,
            Self::Error => 3,
        }
    }

    /// Lowercase name as echoed in the confirmation log.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Format a number the way the game logs it: whole values keep one
/// decimal ("2.0"), fractional values print their shortest form ("0.3").
#[must_use]
pub fn game_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// "log level changed to: debug"
#[must_use]
pub fn log_level_changed(level: GameLogLevel) -> LogPredicate {
    LogPredicate::substring(format!("log level changed to: {}", level.label()))
}

/// "difficulty changed to: 2.0"
#[must_use]
pub fn difficulty_changed(multiplier: f64) -> LogPredicate {
    LogPredicate::substring(format!("difficulty changed to: {}", game_number(multiplier)))
}

/// "firing with scaled cooldown: 0.3" (base cooldown x multiplier)
#[must_use]
pub fn scaled_cooldown(multiplier: f64) -> LogPredicate {
    let cooldown = BASE_FIRE_COOLDOWN * multiplier;
    LogPredicate::substring(format!("firing with scaled cooldown: {}", game_number(cooldown)))
}

/// "master volume changed to: 0.5"
#[must_use]
pub fn volume_changed(bus: AudioBus, value: f64) -> LogPredicate {
    LogPredicate::substring(format!(
        "{} volume changed to: {}",
        bus.label(),
        game_number(value)
    ))
}

/// "master is muted"
#[must_use]
pub fn bus_muted(bus: AudioBus) -> LogPredicate {
    LogPredicate::substring(format!("{} is muted", bus.label()))
}

/// Warning emitted when a sub-volume is adjusted under a master mute:
/// either the direct message or the dialog notice.
#[must_use]
pub fn master_locked_warning() -> LogPredicate {
    LogPredicate::any_of(vec![
        LogPredicate::substring("master muted, cannot adjust sub-volume"),
        LogPredicate::substring("warning dialog"),
    ])
}

/// Warning emitted when weapon/rotors are adjusted under an SFX mute.
#[must_use]
pub fn sfx_locked_warning() -> LogPredicate {
    LogPredicate::any_of(vec![
        LogPredicate::substring("sfx muted, cannot adjust"),
        LogPredicate::substring("warning dialog"),
    ])
}

/// "audio reset pressed"
#[must_use]
pub fn reset_pressed() -> LogPredicate {
    LogPredicate::substring("audio reset pressed")
}

/// "audio volumes reset to defaults"
#[must_use]
pub fn reset_applied() -> LogPredicate {
    LogPredicate::substring("audio volumes reset to defaults")
}

/// Parse the value out of a "Fuel left: X" message.
#[must_use]
pub fn parse_fuel(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    let rest = lower.split("fuel left:").nth(1)?;
    rest.trim().parse().ok()
}

/// The most recent fuel reading in a log slice, if any tick was seen.
#[must_use]
pub fn last_fuel_reading(entries: &[ConsoleEntry]) -> Option<f64> {
    entries.iter().rev().find_map(|entry| parse_fuel(&entry.text))
}
