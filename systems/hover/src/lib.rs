#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Hover-triggered scramble bursts gated by a per-cell cooldown.

use std::{collections::HashMap, time::Duration};

use flipboard_core::{
    Alphabet, BurstToken, CellAddress, Command, Event, GlyphSource, HoverTiming, TimerOwner, Wake,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

/// Configuration parameters required to construct the hover system.
#[derive(Clone, Debug)]
pub struct Config {
    timing: HoverTiming,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided timing and seed.
    #[must_use]
    pub const fn new(timing: HoverTiming, rng_seed: u64) -> Self {
        Self { timing, rng_seed }
    }
}

/// Pure system that admits hover bursts and animates them frame by frame.
///
/// The cooldown map outlives individual sessions and is only cleared when
/// the engine is disposed.
#[derive(Debug)]
pub struct Hover<G = Alphabet> {
    timing: HoverTiming,
    glyphs: G,
    rng: ChaCha8Rng,
    last_triggered: HashMap<CellAddress, Duration>,
}

impl Hover<Alphabet> {
    /// Creates a hover system perturbing cells with the standard alphabet.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_glyphs(config, Alphabet::standard())
    }
}

impl<G: GlyphSource> Hover<G> {
    /// Creates a hover system perturbing cells with the provided glyph source.
    #[must_use]
    pub fn with_glyphs(config: Config, glyphs: G) -> Self {
        Self {
            timing: config.timing,
            glyphs,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            last_triggered: HashMap::new(),
        }
    }

    /// Instant of the most recent admitted burst on `address`.
    #[must_use]
    pub fn last_triggered(&self, address: CellAddress) -> Option<Duration> {
        self.last_triggered.get(&address).copied()
    }

    /// Consumes world events and emits burst commands.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::CellHovered { address, at } => self.trigger(*address, *at, out),
                Event::BurstStarted { burst, address } => {
                    self.schedule_frame(*burst, *address, 0, out);
                }
                Event::TimerElapsed {
                    owner: TimerOwner::Burst(burst),
                    wake: Wake::BurstFrame { address, frame },
                } => self.render_frame(*burst, *address, *frame, out),
                Event::Disposed => self.last_triggered.clear(),
                _ => {}
            }
        }
    }

    fn trigger(&mut self, address: CellAddress, at: Duration, out: &mut Vec<Command>) {
        if let Some(last) = self.last_triggered(address) {
            if at.saturating_sub(last) < self.timing.cooldown() {
                trace!(?address, "hover ignored during cooldown");
                return;
            }
        }
        let _ = self.last_triggered.insert(address, at);
        debug!(?address, "hover burst admitted");
        out.push(Command::BeginBurst { address });
    }

    fn schedule_frame(
        &self,
        burst: BurstToken,
        address: CellAddress,
        frame: u32,
        out: &mut Vec<Command>,
    ) {
        out.push(Command::Schedule {
            owner: TimerOwner::Burst(burst),
            after: self.timing.frame_interval(),
            wake: Wake::BurstFrame { address, frame },
        });
    }

    fn render_frame(
        &mut self,
        burst: BurstToken,
        address: CellAddress,
        frame: u32,
        out: &mut Vec<Command>,
    ) {
        if frame.saturating_add(1) >= self.timing.frames {
            out.push(Command::FinishBurst { burst });
            return;
        }
        let choice = self.rng.gen_range(0..self.glyphs.glyphs().len());
        out.push(Command::PerturbCell {
            burst,
            glyph: self.glyphs.glyph_at(choice),
        });
        self.schedule_frame(burst, address, frame + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hovered(address: CellAddress, at_ms: u64) -> Event {
        Event::CellHovered {
            address,
            at: Duration::from_millis(at_ms),
        }
    }

    #[test]
    fn second_hover_within_cooldown_is_ignored() {
        let mut hover = Hover::new(Config::new(HoverTiming::default(), 1));
        let address = CellAddress::new(0, 1);
        let mut out = Vec::new();

        hover.handle(&[hovered(address, 0), hovered(address, 100)], &mut out);
        assert_eq!(out, vec![Command::BeginBurst { address }]);

        out.clear();
        hover.handle(&[hovered(address, 5_000)], &mut out);
        assert_eq!(out, vec![Command::BeginBurst { address }]);
    }

    #[test]
    fn distinct_cells_have_independent_cooldowns() {
        let mut hover = Hover::new(Config::new(HoverTiming::default(), 1));
        let mut out = Vec::new();
        hover.handle(
            &[
                hovered(CellAddress::new(0, 0), 0),
                hovered(CellAddress::new(0, 1), 0),
            ],
            &mut out,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn last_frame_finishes_burst() {
        let timing = HoverTiming::default();
        let last = timing.frames - 1;
        let mut hover = Hover::new(Config::new(timing, 1));
        let burst = BurstToken::new(4);
        let address = CellAddress::new(1, 0);
        let mut out = Vec::new();

        hover.handle(
            &[Event::TimerElapsed {
                owner: TimerOwner::Burst(burst),
                wake: Wake::BurstFrame {
                    address,
                    frame: last,
                },
            }],
            &mut out,
        );
        assert_eq!(out, vec![Command::FinishBurst { burst }]);
    }

    #[test]
    fn disposal_forgets_cooldowns() {
        let mut hover = Hover::new(Config::new(HoverTiming::default(), 1));
        let address = CellAddress::new(0, 0);
        let mut out = Vec::new();
        hover.handle(&[hovered(address, 0), Event::Disposed], &mut out);
        assert_eq!(hover.last_triggered(address), None);
    }
}
