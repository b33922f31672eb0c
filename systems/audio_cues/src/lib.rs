#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded pool of reusable audio cue voices.
//!
//! The pool never grows: every request scans the fixed voice list for one
//! that is ready and idle, and drops the cue when none is found. Playback is
//! delegated to a [`CueBackend`], which lets the engine run with virtual
//! voices in tests and with a terminal bell in the CLI.

use std::time::Duration;

use flipboard_core::{Absorbed, AudioSettings, Event};
use tracing::{debug, trace, warn};

/// Failure reported by a voice when the host refuses playback.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// The host denied playback, for example because of an output policy.
    #[error("playback rejected: {0}")]
    Rejected(String),
}

/// Single playable instance of the cue asset.
pub trait CueVoice {
    /// Whether the asset finished loading.
    fn is_ready(&self) -> bool;

    /// Whether the voice is audible at `now`.
    fn is_playing(&self, now: Duration) -> bool;

    /// Seeks back to the start of the asset.
    fn rewind(&mut self);

    /// Starts playback at `now`.
    fn play(&mut self, now: Duration) -> Result<(), PlaybackError>;

    /// Silences the voice immediately.
    fn stop(&mut self);
}

/// Factory that opens voices for the cue asset.
pub trait CueBackend {
    /// Voice type produced by the backend.
    type Voice: CueVoice;

    /// Opens one voice for `asset` at the given volume.
    fn open(&mut self, asset: &str, volume: f32) -> Self::Voice;
}

/// Counters describing how cue requests were resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CueStats {
    /// Requests that started a voice.
    pub played: u64,
    /// Requests dropped because every voice was busy.
    pub denied: u64,
    /// Requests the host refused to play.
    pub rejected: u64,
}

impl CueStats {
    /// Total number of requests observed.
    #[must_use]
    pub const fn requested(&self) -> u64 {
        self.played + self.denied + self.rejected
    }

    fn absorb(&mut self, other: Self) {
        self.played += other.played;
        self.denied += other.denied;
        self.rejected += other.rejected;
    }
}

/// Fixed-size collection of recycled voices.
#[derive(Debug)]
pub struct CuePool<V> {
    voices: Vec<V>,
    stats: CueStats,
}

impl<V: CueVoice> CuePool<V> {
    /// Opens `size` voices for `asset` through the backend.
    pub fn initialize<B>(backend: &mut B, size: usize, asset: &str, volume: f32) -> Self
    where
        B: CueBackend<Voice = V>,
    {
        let voices = (0..size).map(|_| backend.open(asset, volume)).collect();
        debug!(size, asset, "audio cue pool initialized");
        Self {
            voices,
            stats: CueStats::default(),
        }
    }

    /// Plays the cue on the first idle voice. Returns `false` when the cue was dropped.
    pub fn request_cue(&mut self, now: Duration) -> bool {
        self.play_idle(now).is_ok()
    }

    fn play_idle(&mut self, now: Duration) -> Result<(), Absorbed> {
        let Some(voice) = self
            .voices
            .iter_mut()
            .find(|voice| voice.is_ready() && !voice.is_playing(now))
        else {
            trace!(?now, "no idle voice; cue dropped");
            self.stats.denied += 1;
            return Err(Absorbed::PlaybackDenied);
        };

        voice.rewind();
        match voice.play(now) {
            Ok(()) => {
                self.stats.played += 1;
                Ok(())
            }
            Err(error) => {
                warn!(%error, "cue playback rejected");
                self.stats.rejected += 1;
                Err(Absorbed::PlaybackRejected)
            }
        }
    }

    /// Number of voices audible at `now`.
    #[must_use]
    pub fn playing(&self, now: Duration) -> usize {
        self.voices
            .iter()
            .filter(|voice| voice.is_playing(now))
            .count()
    }

    /// Silences every voice.
    pub fn stop_all(&mut self) {
        self.voices.iter_mut().for_each(CueVoice::stop);
    }

    /// Number of voices in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Whether the pool holds no voices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Outcomes of the requests served by this pool.
    #[must_use]
    pub const fn stats(&self) -> CueStats {
        self.stats
    }
}

/// Virtual voice that stays busy for a fixed cue length.
#[derive(Clone, Debug)]
pub struct ClockedVoice {
    cue_length: Duration,
    busy_until: Option<Duration>,
}

impl ClockedVoice {
    /// Creates an idle voice whose cue lasts `cue_length`.
    #[must_use]
    pub const fn new(cue_length: Duration) -> Self {
        Self {
            cue_length,
            busy_until: None,
        }
    }
}

impl CueVoice for ClockedVoice {
    fn is_ready(&self) -> bool {
        true
    }

    fn is_playing(&self, now: Duration) -> bool {
        self.busy_until.is_some_and(|until| now < until)
    }

    fn rewind(&mut self) {
        self.busy_until = None;
    }

    fn play(&mut self, now: Duration) -> Result<(), PlaybackError> {
        self.busy_until = Some(now.saturating_add(self.cue_length));
        Ok(())
    }

    fn stop(&mut self) {
        self.busy_until = None;
    }
}

/// Backend producing [`ClockedVoice`] instances.
#[derive(Clone, Copy, Debug)]
pub struct ClockedBackend {
    cue_length: Duration,
}

impl ClockedBackend {
    /// Creates a backend whose voices stay busy for `cue_length`.
    #[must_use]
    pub const fn new(cue_length: Duration) -> Self {
        Self { cue_length }
    }

    /// Creates a backend using the configured cue length.
    #[must_use]
    pub const fn from_settings(settings: &AudioSettings) -> Self {
        Self::new(settings.cue_length())
    }
}

impl CueBackend for ClockedBackend {
    type Voice = ClockedVoice;

    fn open(&mut self, _asset: &str, _volume: f32) -> Self::Voice {
        ClockedVoice::new(self.cue_length)
    }
}

/// System that turns cue requests into voice playback.
///
/// The pool exists only while audio is enabled; disabling audio stops and
/// drops it, and enabling audio again opens a fresh one.
pub struct AudioCues<B: CueBackend> {
    backend: B,
    settings: AudioSettings,
    pool: Option<CuePool<B::Voice>>,
    retired: CueStats,
}

impl<B: CueBackend> AudioCues<B> {
    /// Creates the system, opening the pool when audio is enabled.
    pub fn new(backend: B, settings: AudioSettings) -> Self {
        let mut cues = Self {
            backend,
            settings,
            pool: None,
            retired: CueStats::default(),
        };
        if cues.settings.enabled {
            cues.open_pool();
        }
        cues
    }

    /// Consumes world events and plays cues, reporting every dropped cue in `out`.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Absorbed>) {
        for event in events {
            match event {
                Event::CueRequested { at, .. } => {
                    if let Some(pool) = self.pool.as_mut() {
                        if let Err(kind) = pool.play_idle(*at) {
                            out.push(kind);
                        }
                    }
                }
                Event::AudioToggled { enabled: true } => {
                    if self.pool.is_none() {
                        self.open_pool();
                    }
                }
                Event::AudioToggled { enabled: false } | Event::Disposed => self.close_pool(),
                _ => {}
            }
        }
    }

    /// Pool currently serving cues, if audio is enabled.
    #[must_use]
    pub fn pool(&self) -> Option<&CuePool<B::Voice>> {
        self.pool.as_ref()
    }

    /// Outcomes of every request served since construction.
    #[must_use]
    pub fn stats(&self) -> CueStats {
        let mut stats = self.retired;
        if let Some(pool) = self.pool.as_ref() {
            stats.absorb(pool.stats());
        }
        stats
    }

    fn open_pool(&mut self) {
        self.pool = Some(CuePool::initialize(
            &mut self.backend,
            self.settings.pool_size,
            &self.settings.asset,
            self.settings.volume,
        ));
    }

    fn close_pool(&mut self) {
        if let Some(mut pool) = self.pool.take() {
            pool.stop_all();
            self.retired.absorb(pool.stats());
            debug!(voices = pool.len(), "audio cue pool stopped");
        }
    }
}
