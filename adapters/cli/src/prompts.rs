//! Prompt rotation gated by a cooldown.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::PromptSettings;

/// Prompts used when neither the command line nor the config supplies any.
const BUILTIN_PROMPTS: &[&str] = &[
    "What are you pretending not to know",
    "Which habit would you keep forever",
    "What would you build with one free year",
    "Who taught you the most without trying",
    "What do you wish people asked you more",
    "Where do you feel most like yourself",
];

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum PromptError {
    #[error("no prompts available")]
    Empty,
    #[error("unknown prompt category `{0}`")]
    UnknownCategory(String),
}

/// Random prompt source that refuses to rotate during its cooldown.
#[derive(Debug)]
pub(crate) struct PromptDeck {
    prompts: Vec<String>,
    cooldown: Duration,
    rng: ChaCha8Rng,
    last_drawn: Option<Duration>,
}

impl PromptDeck {
    pub(crate) fn new(
        prompts: Vec<String>,
        cooldown: Duration,
        seed: u64,
    ) -> Result<Self, PromptError> {
        if prompts.is_empty() {
            return Err(PromptError::Empty);
        }
        Ok(Self {
            prompts,
            cooldown,
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_drawn: None,
        })
    }

    /// Builds the deck from explicit prompts, the configured categories, or the built-in list.
    pub(crate) fn from_settings(
        settings: &PromptSettings,
        explicit: Vec<String>,
        seed: u64,
    ) -> Result<Self, PromptError> {
        let prompts = if !explicit.is_empty() {
            explicit
        } else if let Some(category) = settings.category.as_deref() {
            settings
                .categories
                .get(category)
                .cloned()
                .ok_or_else(|| PromptError::UnknownCategory(category.to_owned()))?
        } else if !settings.categories.is_empty() {
            settings.categories.values().flatten().cloned().collect()
        } else {
            BUILTIN_PROMPTS.iter().map(|prompt| (*prompt).to_owned()).collect()
        };
        Self::new(prompts, settings.rotation_cooldown(), seed)
    }

    /// Draws a random prompt unless the previous draw is still cooling down.
    pub(crate) fn draw(&mut self, now: Duration) -> Option<String> {
        if self.remaining(now) > Duration::ZERO {
            return None;
        }
        self.last_drawn = Some(now);
        let index = self.rng.gen_range(0..self.prompts.len());
        self.prompts.get(index).cloned()
    }

    /// Time left until the next draw is allowed.
    pub(crate) fn remaining(&self, now: Duration) -> Duration {
        self.last_drawn.map_or(Duration::ZERO, |last| {
            (last + self.cooldown).saturating_sub(now)
        })
    }
}
