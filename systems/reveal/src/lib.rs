#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Word-by-word scramble reveal system.
//!
//! The system sequences one session at a time: it enters each word, emits a
//! fixed number of scramble frames on a timer, settles the word on its final
//! frame, waits the inter-word delay and moves on. Every step is driven by a
//! timer the world fires back as [`Event::TimerElapsed`], so cancelling the
//! session in the world halts the sequence without any cooperation from here.

use flipboard_core::{
    Alphabet, Command, Event, Glyph, GlyphSource, RevealTiming, SessionToken, TimerOwner, Wake,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// Probability that a cell changes glyph on a non-final frame.
const SCRAMBLE_PROBABILITY: f64 = 0.5;
/// A cue plays on even frames when a uniform draw exceeds this threshold.
const FRAME_CUE_THRESHOLD: f64 = 0.1;

/// Configuration parameters required to construct the reveal system.
#[derive(Clone, Debug)]
pub struct Config {
    timing: RevealTiming,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided timing and seed.
    #[must_use]
    pub const fn new(timing: RevealTiming, rng_seed: u64) -> Self {
        Self { timing, rng_seed }
    }
}

#[derive(Clone, Debug)]
struct ActiveSession {
    token: SessionToken,
    word_lengths: Vec<usize>,
}

/// Pure system that drives the primary reveal of the current session.
#[derive(Debug)]
pub struct Reveal<G = Alphabet> {
    timing: RevealTiming,
    glyphs: G,
    rng: ChaCha8Rng,
    active: Option<ActiveSession>,
}

impl Reveal<Alphabet> {
    /// Creates a reveal system scrambling with the standard alphabet.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_glyphs(config, Alphabet::standard())
    }
}

impl<G: GlyphSource> Reveal<G> {
    /// Creates a reveal system scrambling with the provided glyph source.
    #[must_use]
    pub fn with_glyphs(config: Config, glyphs: G) -> Self {
        Self {
            timing: config.timing,
            glyphs,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            active: None,
        }
    }

    /// Token of the session this system is sequencing, if any.
    #[must_use]
    pub fn active_session(&self) -> Option<SessionToken> {
        self.active.as_ref().map(|active| active.token)
    }

    /// Consumes world events and emits the commands that advance the reveal.
    ///
    /// `current` must mirror the world's `query::current_session`; timers that
    /// do not belong to it are discarded before any command is produced.
    pub fn handle(
        &mut self,
        events: &[Event],
        current: Option<SessionToken>,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::SessionStarted {
                    session,
                    word_lengths,
                } => self.begin(*session, word_lengths.clone(), out),
                Event::SessionCancelled { session } => {
                    if self.active_session() == Some(*session) {
                        self.active = None;
                    }
                }
                Event::Disposed => self.active = None,
                Event::TimerElapsed {
                    owner: TimerOwner::Session(session),
                    wake,
                } => {
                    if current != Some(*session) || self.active_session() != Some(*session) {
                        trace!(session = session.get(), "stale reveal timer ignored");
                        continue;
                    }
                    match *wake {
                        Wake::EnterWord { word } => self.enter_word(*session, word, out),
                        Wake::RevealFrame { word, frame } => {
                            self.render_frame(*session, word, frame, out);
                        }
                        Wake::BurstFrame { .. } => {}
                    }
                }
                _ => {}
            }
        }
    }

    fn begin(&mut self, token: SessionToken, word_lengths: Vec<usize>, out: &mut Vec<Command>) {
        let has_words = !word_lengths.is_empty();
        self.active = Some(ActiveSession {
            token,
            word_lengths,
        });
        if has_words {
            out.push(Command::Schedule {
                owner: TimerOwner::Session(token),
                after: self.timing.start_delay(),
                wake: Wake::EnterWord { word: 0 },
            });
        }
    }

    fn enter_word(&mut self, session: SessionToken, word: usize, out: &mut Vec<Command>) {
        let owner = TimerOwner::Session(session);
        out.push(Command::EnterWord { session, word });
        out.push(Command::RequestCue { owner });
        out.push(Command::Schedule {
            owner,
            after: self.timing.frame_interval(),
            wake: Wake::RevealFrame { word, frame: 0 },
        });
    }

    fn render_frame(
        &mut self,
        session: SessionToken,
        word: usize,
        frame: u32,
        out: &mut Vec<Command>,
    ) {
        let Some(length) = self.word_length(word) else {
            return;
        };
        let owner = TimerOwner::Session(session);
        let last_frame = frame.saturating_add(1) >= self.timing.frames_per_word;

        if last_frame {
            out.push(Command::SettleWord { session, word });
        } else {
            let glyphs = self.scramble(length);
            if !glyphs.is_empty() {
                out.push(Command::ScrambleWord {
                    session,
                    word,
                    glyphs,
                });
            }
        }

        if frame % 2 == 0 && self.rng.gen::<f64>() > FRAME_CUE_THRESHOLD {
            out.push(Command::RequestCue { owner });
        }

        if !last_frame {
            out.push(Command::Schedule {
                owner,
                after: self.timing.frame_interval(),
                wake: Wake::RevealFrame {
                    word,
                    frame: frame + 1,
                },
            });
        } else if word + 1 < self.word_count() {
            out.push(Command::Schedule {
                owner,
                after: self.timing.inter_word_delay(),
                wake: Wake::EnterWord { word: word + 1 },
            });
        }
    }

    fn scramble(&mut self, length: usize) -> Vec<(usize, Glyph)> {
        let mut glyphs = Vec::new();
        for index in 0..length {
            if self.rng.gen_bool(SCRAMBLE_PROBABILITY) {
                let choice = self.rng.gen_range(0..self.glyphs.glyphs().len());
                glyphs.push((index, self.glyphs.glyph_at(choice)));
            }
        }
        glyphs
    }

    fn word_length(&self, word: usize) -> Option<usize> {
        self.active
            .as_ref()
            .and_then(|active| active.word_lengths.get(word).copied())
    }

    fn word_count(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |active| active.word_lengths.len())
    }
}
