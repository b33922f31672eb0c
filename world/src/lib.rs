#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative display state and session lifecycle for Flipboard.
//!
//! The world owns every character cell, the single current session, the
//! pending timer set and the virtual clock. Systems never mutate cells
//! directly; they submit commands that the world validates against the live
//! session and burst tokens before applying them.

mod lifecycle;

use std::time::Duration;

use flipboard_core::{
    split_words, Absorbed, BurstToken, CellAddress, Command, Event, Glyph, SessionPhase,
    SessionToken, WordPhase,
};
use tracing::{debug, info, trace, warn};

use self::lifecycle::Lifecycle;

#[derive(Clone, Copy, Debug)]
struct Cell {
    target: Glyph,
    display: Option<Glyph>,
    settled: bool,
}

impl Cell {
    const fn unset(target: Glyph) -> Self {
        Self {
            target,
            display: None,
            settled: false,
        }
    }
}

#[derive(Clone, Debug)]
struct Word {
    cells: Vec<Cell>,
    phase: WordPhase,
}

#[derive(Clone, Debug)]
struct Session {
    token: SessionToken,
    words: Vec<Word>,
    phase: SessionPhase,
}

impl Session {
    fn from_text(token: SessionToken, text: &str) -> Self {
        let words = split_words(text)
            .into_iter()
            .map(|glyphs| Word {
                cells: glyphs.into_iter().map(Cell::unset).collect(),
                phase: WordPhase::Pending,
            })
            .collect();
        Self {
            token,
            words,
            phase: SessionPhase::Idle,
        }
    }

    fn cell_mut(&mut self, address: CellAddress) -> Option<&mut Cell> {
        self.words
            .get_mut(address.word())
            .and_then(|word| word.cells.get_mut(address.cell()))
    }

    fn word_phase(&self, word: usize) -> Option<WordPhase> {
        self.words.get(word).map(|word| word.phase)
    }
}

/// Represents the authoritative Flipboard display state.
#[derive(Debug)]
pub struct World {
    clock: Duration,
    lifecycle: Lifecycle,
    session: Option<Session>,
    revision: u64,
    audio_enabled: bool,
    disposed: bool,
}

impl World {
    /// Creates an empty world with audio cues enabled and the clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Duration::ZERO,
            lifecycle: Lifecycle::default(),
            session: None,
            revision: 0,
            audio_enabled: true,
            disposed: false,
        }
    }

    fn bump_revision(&mut self, out_events: &mut Vec<Event>) {
        self.revision = self.revision.saturating_add(1);
        out_events.push(Event::GridMutated {
            revision: self.revision,
        });
    }

    fn cancel_current(&mut self, out_events: &mut Vec<Event>) {
        self.retire_bursts(out_events);
        if let Some(token) = self.lifecycle.cancel_session() {
            if let Some(session) = self.session.as_mut() {
                session.phase = SessionPhase::Cancelled;
            }
            debug!(session = token.get(), "session cancelled");
            out_events.push(Event::SessionCancelled { session: token });
        }
    }

    /// Cancels every live burst and restores the cells they left perturbed.
    fn retire_bursts(&mut self, out_events: &mut Vec<Event>) {
        let addresses = self.lifecycle.cancel_bursts();
        if addresses.is_empty() {
            return;
        }
        debug!(bursts = addresses.len(), "cancelled pending hover bursts");
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut restored = false;
        for address in addresses {
            if session.word_phase(address.word()) != Some(WordPhase::Settled) {
                continue;
            }
            if let Some(cell) = session.cell_mut(address) {
                if cell.display != Some(cell.target) {
                    cell.display = Some(cell.target);
                    restored = true;
                }
            }
        }
        if restored {
            self.bump_revision(out_events);
        }
    }

    /// Returns the live session when `token` is current, recording a stale callback otherwise.
    fn live_session(
        &mut self,
        token: SessionToken,
        out_events: &mut Vec<Event>,
    ) -> Option<&mut Session> {
        if self.lifecycle.current_session() != Some(token) {
            trace!(session = token.get(), "discarding write for stale session");
            out_events.push(Event::Absorbed {
                kind: Absorbed::StaleCallback,
            });
            return None;
        }
        self.session.as_mut().filter(|session| session.token == token)
    }

    fn cell_exists(&self, address: CellAddress) -> bool {
        self.session
            .as_ref()
            .and_then(|session| session.words.get(address.word()))
            .is_some_and(|word| address.cell() < word.cells.len())
    }

    fn write_burst_cell(
        &mut self,
        burst: BurstToken,
        address: CellAddress,
        glyph: Option<Glyph>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.word_phase(address.word()) != Some(WordPhase::Settled) {
            trace!(
                burst = burst.get(),
                word = address.word(),
                "reveal still owns word; burst write dropped"
            );
            return;
        }
        let Some(cell) = session.cell_mut(address) else {
            return;
        };
        cell.display = Some(glyph.unwrap_or(cell.target));
        self.bump_revision(out_events);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.disposed && !matches!(command, Command::Advance { .. }) {
        warn!(?command, "ignoring command for disposed engine");
        return;
    }

    match command {
        Command::Replace { text } => {
            world.cancel_current(out_events);
            let token = world.lifecycle.issue_session();
            let mut session = Session::from_text(token, &text);
            let word_lengths: Vec<usize> =
                session.words.iter().map(|word| word.cells.len()).collect();
            info!(session = token.get(), words = word_lengths.len(), "session started");
            let settled_immediately = session.words.is_empty();
            if settled_immediately {
                session.phase = SessionPhase::Settled;
            }
            world.session = Some(session);
            out_events.push(Event::SessionStarted {
                session: token,
                word_lengths,
            });
            world.bump_revision(out_events);
            if settled_immediately {
                out_events.push(Event::SessionSettled { session: token });
            }
        }
        Command::CancelSession => world.cancel_current(out_events),
        Command::Advance { until } => match world.lifecycle.pop_due(until) {
            Some(timer) => {
                world.clock = world.clock.max(timer.due);
                if world.lifecycle.is_live(timer.owner) {
                    trace!(timer = timer.id.get(), wake = ?timer.wake, "timer elapsed");
                    out_events.push(Event::TimerElapsed {
                        owner: timer.owner,
                        wake: timer.wake,
                    });
                } else {
                    trace!(timer = timer.id.get(), "stale timer discarded");
                    out_events.push(Event::Absorbed {
                        kind: Absorbed::StaleCallback,
                    });
                }
            }
            None => {
                world.clock = world.clock.max(until);
                out_events.push(Event::TimeAdvanced { now: world.clock });
            }
        },
        Command::Schedule { owner, after, wake } => {
            if world.lifecycle.is_live(owner) {
                let due = world.clock.saturating_add(after);
                let _ = world.lifecycle.schedule(due, owner, wake);
            } else {
                trace!(?owner, "refusing to schedule for cancelled owner");
                out_events.push(Event::Absorbed {
                    kind: Absorbed::StaleCallback,
                });
            }
        }
        Command::EnterWord { session, word } => {
            let Some(live) = world.live_session(session, out_events) else {
                return;
            };
            let Some(entry) = live.words.get_mut(word) else {
                return;
            };
            if entry.phase != WordPhase::Pending {
                return;
            }
            entry.phase = WordPhase::Revealing;
            live.phase = SessionPhase::Revealing { word };
            debug!(session = session.get(), word, "word entered");
            out_events.push(Event::WordEntered { session, word });
        }
        Command::ScrambleWord {
            session,
            word,
            glyphs,
        } => {
            let Some(live) = world.live_session(session, out_events) else {
                return;
            };
            let Some(entry) = live.words.get_mut(word) else {
                return;
            };
            if entry.phase != WordPhase::Revealing {
                return;
            }
            let mut changed = false;
            for (index, glyph) in glyphs {
                if let Some(cell) = entry.cells.get_mut(index) {
                    cell.display = Some(glyph);
                    changed = true;
                }
            }
            if changed {
                world.bump_revision(out_events);
            }
        }
        Command::SettleWord { session, word } => {
            let Some(live) = world.live_session(session, out_events) else {
                return;
            };
            let word_count = live.words.len();
            let Some(entry) = live.words.get_mut(word) else {
                return;
            };
            if entry.phase != WordPhase::Revealing {
                return;
            }
            for cell in &mut entry.cells {
                cell.display = Some(cell.target);
                cell.settled = true;
            }
            entry.phase = WordPhase::Settled;
            let finished = live
                .words
                .iter()
                .all(|word| word.phase == WordPhase::Settled);
            if finished {
                live.phase = SessionPhase::Settled;
            }
            world.bump_revision(out_events);
            out_events.push(Event::WordSettled { session, word });
            if finished {
                info!(session = session.get(), words = word_count, "session settled");
                out_events.push(Event::SessionSettled { session });
            }
        }
        Command::RequestCue { owner } => {
            if !world.lifecycle.is_live(owner) {
                out_events.push(Event::Absorbed {
                    kind: Absorbed::StaleCallback,
                });
                return;
            }
            if world.audio_enabled {
                out_events.push(Event::CueRequested {
                    owner,
                    at: world.clock,
                });
            }
        }
        Command::PointerEntered { address } => {
            if world.cell_exists(address) {
                out_events.push(Event::CellHovered {
                    address,
                    at: world.clock,
                });
            } else {
                trace!(?address, "hover outside rendered grid");
                out_events.push(Event::Absorbed {
                    kind: Absorbed::MissingRenderTarget,
                });
            }
        }
        Command::BeginBurst { address } => {
            if !world.cell_exists(address) {
                out_events.push(Event::Absorbed {
                    kind: Absorbed::MissingRenderTarget,
                });
                return;
            }
            let burst = world.lifecycle.begin_burst(address);
            debug!(burst = burst.get(), ?address, "hover burst started");
            out_events.push(Event::BurstStarted { burst, address });
        }
        Command::PerturbCell { burst, glyph } => {
            let Some(address) = world.lifecycle.burst_address(burst) else {
                out_events.push(Event::Absorbed {
                    kind: Absorbed::StaleCallback,
                });
                return;
            };
            world.write_burst_cell(burst, address, Some(glyph), out_events);
        }
        Command::FinishBurst { burst } => {
            let Some(address) = world.lifecycle.finish_burst(burst) else {
                out_events.push(Event::Absorbed {
                    kind: Absorbed::StaleCallback,
                });
                return;
            };
            world.write_burst_cell(burst, address, None, out_events);
            out_events.push(Event::BurstFinished { burst, address });
        }
        Command::SetAudioEnabled { enabled } => {
            if world.audio_enabled != enabled {
                world.audio_enabled = enabled;
                out_events.push(Event::AudioToggled { enabled });
            }
        }
        Command::Dispose => {
            world.retire_bursts(out_events);
            if let Some(token) = world.lifecycle.clear() {
                if let Some(session) = world.session.as_mut() {
                    session.phase = SessionPhase::Cancelled;
                }
                out_events.push(Event::SessionCancelled { session: token });
            }
            world.disposed = true;
            info!("engine disposed");
            out_events.push(Event::Disposed);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use flipboard_core::{
        CellAddress, CellView, GridView, SessionPhase, SessionToken, WordPhase, WordView,
    };

    use super::World;

    /// Current virtual instant.
    #[must_use]
    pub fn now(world: &World) -> Duration {
        world.clock
    }

    /// Token of the live session, if any.
    #[must_use]
    pub fn current_session(world: &World) -> Option<SessionToken> {
        world.lifecycle.current_session()
    }

    /// Lifecycle state of the most recent session.
    #[must_use]
    pub fn session_phase(world: &World) -> SessionPhase {
        world
            .session
            .as_ref()
            .map_or(SessionPhase::Idle, |session| session.phase)
    }

    /// Reveal progress of the word at `index`.
    #[must_use]
    pub fn word_phase(world: &World, index: usize) -> Option<WordPhase> {
        world
            .session
            .as_ref()
            .and_then(|session| session.word_phase(index))
    }

    /// Reports whether the cell exists in the rendered grid.
    #[must_use]
    pub fn cell_exists(world: &World, address: CellAddress) -> bool {
        world.cell_exists(address)
    }

    /// Revision counter incremented on every display change.
    #[must_use]
    pub fn revision(world: &World) -> u64 {
        world.revision
    }

    /// Number of timers waiting to fire.
    #[must_use]
    pub fn pending_timers(world: &World) -> usize {
        world.lifecycle.pending()
    }

    /// Number of hover bursts currently running.
    #[must_use]
    pub fn live_bursts(world: &World) -> usize {
        world.lifecycle.live_bursts()
    }

    /// Whether audio cues may be requested.
    #[must_use]
    pub fn audio_enabled(world: &World) -> bool {
        world.audio_enabled
    }

    /// Whether the engine was torn down.
    #[must_use]
    pub fn is_disposed(world: &World) -> bool {
        world.disposed
    }

    /// Captures a renderable snapshot of every cell.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView {
        let Some(session) = world.session.as_ref() else {
            return GridView {
                revision: world.revision,
                ..GridView::empty()
            };
        };
        let words = session
            .words
            .iter()
            .map(|word| WordView {
                cells: word
                    .cells
                    .iter()
                    .map(|cell| CellView {
                        target: cell.target,
                        display: cell.display,
                        settled: cell.settled,
                    })
                    .collect(),
                phase: word.phase,
            })
            .collect();
        GridView {
            session: Some(session.token),
            phase: session.phase,
            words,
            revision: world.revision,
        }
    }
}
