//! Tunable timing and audio parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_CUE_ASSET;

/// Reasons a configuration may be rejected.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The primary reveal must render at least one frame per word.
    #[error("reveal frames_per_word must be at least 1")]
    ZeroRevealFrames,
    /// Hover bursts must render at least one frame.
    #[error("hover frames must be at least 1")]
    ZeroHoverFrames,
    /// Frame intervals of zero would fire every frame at the same instant.
    #[error("{scope} frame interval must be greater than zero")]
    ZeroFrameInterval {
        /// Which animation carried the invalid interval.
        scope: &'static str,
    },
    /// An audio-enabled engine needs at least one voice.
    #[error("audio pool_size must be at least 1 when audio is enabled")]
    EmptyPool,
    /// Volume is outside the `0.0..=1.0` range.
    #[error("audio volume {0} is outside 0.0..=1.0")]
    VolumeOutOfRange(f32),
    /// Glyph sources must contain at least one glyph.
    #[error("alphabet must contain at least one glyph")]
    EmptyAlphabet,
}

/// Timing of the primary word-by-word reveal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealTiming {
    /// Frames rendered per word; the last one settles the word.
    pub frames_per_word: u32,
    /// Milliseconds between consecutive frames.
    pub frame_interval_ms: u64,
    /// Milliseconds waited after a word settles before the next word begins.
    pub inter_word_delay_ms: u64,
    /// Milliseconds waited before the first word begins.
    pub start_delay_ms: u64,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            frames_per_word: 15,
            frame_interval_ms: 30,
            inter_word_delay_ms: 50,
            start_delay_ms: 0,
        }
    }
}

impl RevealTiming {
    /// Interval between consecutive frames.
    #[must_use]
    pub const fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Delay between a word settling and the next word starting.
    #[must_use]
    pub const fn inter_word_delay(&self) -> Duration {
        Duration::from_millis(self.inter_word_delay_ms)
    }

    /// Delay before the first word starts.
    #[must_use]
    pub const fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Time a single word occupies including the trailing inter-word delay.
    #[must_use]
    pub fn word_duration(&self) -> Duration {
        self.frame_interval() * self.frames_per_word + self.inter_word_delay()
    }

    /// Time after which a reveal of `words` words is guaranteed to have settled.
    #[must_use]
    pub fn total_duration(&self, words: usize) -> Duration {
        let words = u32::try_from(words).unwrap_or(u32::MAX);
        self.start_delay() + self.word_duration() * words
    }
}

/// Timing of hover-triggered bursts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverTiming {
    /// Frames rendered per burst; the last one restores the target.
    pub frames: u32,
    /// Milliseconds between consecutive burst frames.
    pub frame_interval_ms: u64,
    /// Minimum milliseconds between two bursts on the same cell.
    pub cooldown_ms: u64,
}

impl Default for HoverTiming {
    fn default() -> Self {
        Self {
            frames: 6,
            frame_interval_ms: 25,
            cooldown_ms: 5_000,
        }
    }
}

impl HoverTiming {
    /// Interval between consecutive burst frames.
    #[must_use]
    pub const fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Minimum time between two bursts on the same cell.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Time a burst needs to restore its cell.
    #[must_use]
    pub fn burst_duration(&self) -> Duration {
        self.frame_interval() * self.frames
    }
}

/// Audio cue configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Whether cues are requested at all.
    pub enabled: bool,
    /// Number of reusable voices in the pool.
    pub pool_size: usize,
    /// Logical identifier of the cue asset.
    pub asset: String,
    /// Playback volume in `0.0..=1.0`.
    pub volume: f32,
    /// Milliseconds a voice stays busy after it starts playing.
    pub cue_length_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            pool_size: 10,
            asset: DEFAULT_CUE_ASSET.to_owned(),
            volume: 0.3,
            cue_length_ms: 120,
        }
    }
}

impl AudioSettings {
    /// Time a voice stays busy after it starts playing.
    #[must_use]
    pub const fn cue_length(&self) -> Duration {
        Duration::from_millis(self.cue_length_ms)
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Primary reveal timing.
    pub reveal: RevealTiming,
    /// Hover burst timing.
    pub hover: HoverTiming,
    /// Audio cue settings.
    pub audio: AudioSettings,
}

impl EngineConfig {
    /// Checks that every parameter lies within its supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reveal.frames_per_word == 0 {
            return Err(ConfigError::ZeroRevealFrames);
        }
        if self.reveal.frame_interval_ms == 0 {
            return Err(ConfigError::ZeroFrameInterval { scope: "reveal" });
        }
        if self.hover.frames == 0 {
            return Err(ConfigError::ZeroHoverFrames);
        }
        if self.hover.frame_interval_ms == 0 {
            return Err(ConfigError::ZeroFrameInterval { scope: "hover" });
        }
        if self.audio.enabled && self.audio.pool_size == 0 {
            return Err(ConfigError::EmptyPool);
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(ConfigError::VolumeOutOfRange(self.audio.volume));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn total_duration_sums_word_phases() {
        let timing = RevealTiming::default();
        assert_eq!(timing.word_duration(), Duration::from_millis(500));
        assert_eq!(timing.total_duration(2), Duration::from_millis(1_000));
        assert_eq!(timing.total_duration(0), Duration::ZERO);
    }

    #[test]
    fn start_delay_extends_total_duration() {
        let timing = RevealTiming {
            start_delay_ms: 100,
            ..RevealTiming::default()
        };
        assert_eq!(timing.total_duration(1), Duration::from_millis(600));
    }

    #[test]
    fn zero_frames_are_rejected() {
        let mut config = EngineConfig::default();
        config.reveal.frames_per_word = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroRevealFrames));

        let mut config = EngineConfig::default();
        config.hover.frames = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroHoverFrames));
    }

    #[test]
    fn empty_pool_only_matters_with_audio() {
        let mut config = EngineConfig::default();
        config.audio.pool_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyPool));

        config.audio.enabled = false;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn volume_must_be_normalised() {
        let mut config = EngineConfig::default();
        config.audio.volume = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::VolumeOutOfRange(1.5)));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [reveal]
            frames_per_word = 10

            [audio]
            enabled = false
            "#,
        )
        .expect("parse config");

        assert_eq!(config.reveal.frames_per_word, 10);
        assert_eq!(config.reveal.frame_interval_ms, 30);
        assert_eq!(config.hover, HoverTiming::default());
        assert!(!config.audio.enabled);
        assert_eq!(config.audio.pool_size, 10);
    }
}
