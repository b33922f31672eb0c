#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Host-facing Flipboard engine.
//!
//! [`Engine`] owns the world and every system, routes commands through
//! `flipboard_world::apply` and feeds the resulting events back to the
//! systems until the cascade quiesces. Hosts only see the public operations
//! (`start`, `cancel`, `hover`, `advance`, `dispose`), the [`GridView`]
//! snapshot and the observer notifications.

use std::{collections::VecDeque, fmt, time::Duration};

use flipboard_core::{
    Absorbed, CellAddress, Command, ConfigError, EngineConfig, Event, GridView, SessionPhase,
    SessionToken,
};
use flipboard_system_audio_cues::{AudioCues, ClockedBackend, CueBackend, CueStats};
use flipboard_system_hover::{self as hover, Hover};
use flipboard_system_reveal::{self as reveal, Reveal};
use flipboard_world::{self as world, query, World};
use tracing::{debug, trace};

/// Offset mixed into the seed so hover bursts draw from an independent stream.
const HOVER_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Change reported to subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    /// At least one cell changed its display.
    Mutated {
        /// Revision counter after the change.
        revision: u64,
    },
    /// Every word of the session reached its target.
    Settled {
        /// Token of the settled session.
        session: SessionToken,
    },
}

/// Counters of conditions the engine absorbed instead of surfacing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Cue requests issued by the world.
    pub cues_requested: u64,
    /// Callbacks or writes that targeted a cancelled session or burst.
    pub stale_callbacks: u64,
    /// Hovers that targeted a cell outside the rendered grid.
    pub missing_render_targets: u64,
    /// Outcomes of cue playback.
    pub cues: CueStats,
}

impl Diagnostics {
    fn record(&mut self, kind: Absorbed) {
        match kind {
            Absorbed::StaleCallback => self.stale_callbacks += 1,
            Absorbed::MissingRenderTarget => self.missing_render_targets += 1,
            // Counted by the cue pool.
            Absorbed::PlaybackDenied | Absorbed::PlaybackRejected => {}
        }
    }
}

type Observer = Box<dyn FnMut(&Notification)>;

/// Scramble reveal engine driven by a virtual clock.
pub struct Engine<B: CueBackend = ClockedBackend> {
    config: EngineConfig,
    world: World,
    reveal: Reveal,
    hover: Hover,
    audio: AudioCues<B>,
    observers: Vec<Observer>,
    diagnostics: Diagnostics,
}

impl Engine<ClockedBackend> {
    /// Creates an engine whose cues play on virtual voices.
    pub fn with_clocked_audio(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        let backend = ClockedBackend::from_settings(&config.audio);
        Self::new(config, backend, seed)
    }
}

impl<B: CueBackend> Engine<B> {
    /// Validates the configuration and mounts a new engine.
    pub fn new(config: EngineConfig, backend: B, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut engine = Self {
            world: World::new(),
            reveal: Reveal::new(reveal::Config::new(config.reveal.clone(), seed)),
            hover: Hover::new(hover::Config::new(
                config.hover.clone(),
                seed ^ HOVER_SEED_SALT,
            )),
            audio: AudioCues::new(backend, config.audio.clone()),
            observers: Vec::new(),
            diagnostics: Diagnostics::default(),
            config,
        };
        if !engine.config.audio.enabled {
            let _ = engine.dispatch(Command::SetAudioEnabled { enabled: false });
        }
        debug!(seed, "engine mounted");
        Ok(engine)
    }

    /// Starts revealing `text`, cancelling any session in progress.
    pub fn start(&mut self, text: &str) {
        let _ = self.dispatch(Command::Replace {
            text: text.to_owned(),
        });
        self.flush();
    }

    /// Alias of [`Engine::start`] matching the host's "replace the prompt" wording.
    pub fn replace(&mut self, text: &str) {
        self.start(text);
    }

    /// Halts the current session. Cells keep whatever they display.
    pub fn cancel(&mut self) {
        let _ = self.dispatch(Command::CancelSession);
    }

    /// Reports that the pointer entered the cell at `address`.
    pub fn hover(&mut self, address: CellAddress) {
        let _ = self.dispatch(Command::PointerEntered { address });
        self.flush();
    }

    /// Enables or disables audio cues.
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        let _ = self.dispatch(Command::SetAudioEnabled { enabled });
    }

    /// Advances the virtual clock by `dt`, firing every timer that falls due.
    pub fn advance(&mut self, dt: Duration) {
        let until = self.now().saturating_add(dt);
        self.advance_to(until);
    }

    /// Advances the virtual clock to the absolute instant `until`.
    pub fn advance_to(&mut self, until: Duration) {
        loop {
            let events = self.dispatch(Command::Advance { until });
            if events
                .iter()
                .any(|event| matches!(event, Event::TimeAdvanced { .. }))
            {
                break;
            }
        }
    }

    /// Tears the engine down: cancels every timer, stops audio and forgets cooldowns.
    ///
    /// Calling it more than once has no further effect.
    pub fn dispose(&mut self) {
        if !query::is_disposed(&self.world) {
            let _ = self.dispatch(Command::Dispose);
        }
    }

    /// Registers an observer notified after every display change or settlement.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&Notification) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Renderable snapshot of every cell.
    #[must_use]
    pub fn grid(&self) -> GridView {
        query::grid_view(&self.world)
    }

    /// Revision counter incremented on every display change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        query::revision(&self.world)
    }

    /// Current virtual instant.
    #[must_use]
    pub fn now(&self) -> Duration {
        query::now(&self.world)
    }

    /// Lifecycle state of the most recent session.
    #[must_use]
    pub fn session_phase(&self) -> SessionPhase {
        query::session_phase(&self.world)
    }

    /// Whether the display equals the target of every word.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.session_phase() == SessionPhase::Settled
    }

    /// Number of timers waiting to fire.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        query::pending_timers(&self.world)
    }

    /// Number of hover bursts currently running.
    #[must_use]
    pub fn live_bursts(&self) -> usize {
        query::live_bursts(&self.world)
    }

    /// Whether audio cues may be requested.
    #[must_use]
    pub fn audio_enabled(&self) -> bool {
        query::audio_enabled(&self.world)
    }

    /// Whether [`Engine::dispose`] ran.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        query::is_disposed(&self.world)
    }

    /// Time after which the current session is guaranteed to have settled.
    #[must_use]
    pub fn reveal_duration(&self) -> Duration {
        self.config.reveal.total_duration(self.grid().words.len())
    }

    /// Configuration the engine was mounted with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Counters of absorbed conditions and cue outcomes.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = self.diagnostics;
        diagnostics.cues = self.audio.stats();
        diagnostics
    }

    /// Fires zero-delay timers scheduled by the last command.
    fn flush(&mut self) {
        let now = self.now();
        self.advance_to(now);
    }

    fn dispatch(&mut self, command: Command) -> Vec<Event> {
        let mut queue = VecDeque::from([command]);
        let mut emitted = Vec::new();

        while let Some(command) = queue.pop_front() {
            let mut events = Vec::new();
            world::apply(&mut self.world, command, &mut events);
            if events.is_empty() {
                continue;
            }
            self.observe(&events);

            let mut commands = Vec::new();
            self.reveal.handle(
                &events,
                query::current_session(&self.world),
                &mut commands,
            );
            self.hover.handle(&events, &mut commands);
            let mut dropped = Vec::new();
            self.audio.handle(&events, &mut dropped);
            let dropped: Vec<Event> = dropped
                .into_iter()
                .map(|kind| Event::Absorbed { kind })
                .collect();
            self.observe(&dropped);

            queue.extend(commands);
            emitted.extend(events);
            emitted.extend(dropped);
        }

        emitted
    }

    fn observe(&mut self, events: &[Event]) {
        for event in events {
            let notification = match event {
                Event::GridMutated { revision } => Notification::Mutated {
                    revision: *revision,
                },
                Event::SessionSettled { session } => Notification::Settled { session: *session },
                Event::CueRequested { .. } => {
                    self.diagnostics.cues_requested += 1;
                    continue;
                }
                Event::Absorbed { kind } => {
                    trace!(%kind, "absorbed");
                    self.diagnostics.record(*kind);
                    continue;
                }
                _ => continue,
            };
            for observer in &mut self.observers {
                observer(&notification);
            }
        }
    }
}

impl<B: CueBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<B: CueBackend> fmt::Debug for Engine<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("now", &self.now())
            .field("phase", &self.session_phase())
            .field("revision", &self.revision())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
