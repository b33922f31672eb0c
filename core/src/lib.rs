#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Flipboard engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! Time never comes from the wall clock inside the engine. The host advances a
//! virtual clock and the world fires due timers one at a time, which keeps the
//! scramble animation reproducible for a given random seed.

mod config;

use std::time::Duration;

pub use config::{AudioSettings, ConfigError, EngineConfig, HoverTiming, RevealTiming};

/// Glyphs cycled through while a cell is scrambling.
pub const DEFAULT_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789?!. ";

/// Logical identifier of the cue played alongside scramble frames.
pub const DEFAULT_CUE_ASSET: &str = "/audio/flap.wav";

/// Single displayable character rendered inside a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Glyph(char);

impl Glyph {
    /// Wraps the provided character.
    #[must_use]
    pub const fn new(value: char) -> Self {
        Self(value)
    }

    /// Retrieves the wrapped character.
    #[must_use]
    pub const fn get(&self) -> char {
        self.0
    }
}

/// Supplies the candidate glyphs used for scramble frames.
///
/// Implementations must never return an empty slice.
pub trait GlyphSource {
    /// Ordered candidate glyphs.
    fn glyphs(&self) -> &[Glyph];

    /// Returns the glyph at `index`, wrapping around the alphabet length.
    fn glyph_at(&self, index: usize) -> Glyph {
        let glyphs = self.glyphs();
        glyphs[index % glyphs.len()]
    }
}

/// Immutable ordered alphabet of scramble glyphs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
    glyphs: Vec<Glyph>,
}

impl Alphabet {
    /// Alphabet containing [`DEFAULT_ALPHABET`].
    #[must_use]
    pub fn standard() -> Self {
        Self {
            glyphs: DEFAULT_ALPHABET.chars().map(Glyph::new).collect(),
        }
    }

    /// Builds an alphabet from the characters of `value`.
    pub fn from_chars(value: &str) -> Result<Self, ConfigError> {
        let glyphs: Vec<Glyph> = value.chars().map(Glyph::new).collect();
        if glyphs.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        Ok(Self { glyphs })
    }

    /// Number of glyphs contained in the alphabet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Reports whether the alphabet holds no glyphs. Always false for valid alphabets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Reports whether the glyph belongs to the alphabet.
    #[must_use]
    pub fn contains(&self, glyph: Glyph) -> bool {
        self.glyphs.contains(&glyph)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::standard()
    }
}

impl GlyphSource for Alphabet {
    fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }
}

/// Location of a single cell expressed as word and cell indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    word: usize,
    cell: usize,
}

impl CellAddress {
    /// Creates a new cell address.
    #[must_use]
    pub const fn new(word: usize, cell: usize) -> Self {
        Self { word, cell }
    }

    /// Zero-based index of the word that owns the cell.
    #[must_use]
    pub const fn word(&self) -> usize {
        self.word
    }

    /// Zero-based index of the cell inside its word.
    #[must_use]
    pub const fn cell(&self) -> usize {
        self.cell
    }
}

/// Identity of one primary reveal. Issued in increasing order per engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Creates a session token with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the token.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identity of one hover burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BurstToken(u64);

impl BurstToken {
    /// Creates a burst token with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the token.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identity of a pending timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Creates a timer identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Logical actor that owns a timer or a cue request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerOwner {
    /// The primary reveal identified by the token.
    Session(SessionToken),
    /// The hover burst identified by the token.
    Burst(BurstToken),
}

/// Work performed when a timer fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Wake {
    /// Begin the phase of the given word.
    EnterWord {
        /// Index of the word whose phase begins.
        word: usize,
    },
    /// Render one primary reveal frame for the active word.
    RevealFrame {
        /// Index of the word being revealed.
        word: usize,
        /// Zero-based frame counter within the word's phase.
        frame: u32,
    },
    /// Render one hover burst frame for a single cell.
    BurstFrame {
        /// Cell perturbed by the burst.
        address: CellAddress,
        /// Zero-based frame counter within the burst.
        frame: u32,
    },
}

/// Reveal progress of a single word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WordPhase {
    /// The word's phase has not begun; every cell is unset.
    Pending,
    /// The word is being scrambled by the primary reveal.
    Revealing,
    /// Every cell reached its target.
    Settled,
}

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Created but no word has been entered yet.
    Idle,
    /// Revealing the word with the given index.
    Revealing {
        /// Index of the most recently entered word.
        word: usize,
    },
    /// Every word settled.
    Settled,
    /// Terminal state reached through cancellation or replacement.
    Cancelled,
}

/// Conditions the engine absorbs locally instead of surfacing to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Absorbed {
    /// No idle audio voice was available for a cue.
    #[error("no idle audio voice available")]
    PlaybackDenied,
    /// The host refused to play a cue.
    #[error("host rejected cue playback")]
    PlaybackRejected,
    /// A timer or command arrived for a cancelled session or burst.
    #[error("callback arrived for a cancelled owner")]
    StaleCallback,
    /// A hover or write targeted a cell that does not exist.
    #[error("target cell is not rendered")]
    MissingRenderTarget,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Cancels any current session and pending bursts, then starts revealing `text`.
    Replace {
        /// Prompt to reveal; uppercased and split on whitespace by the world.
        text: String,
    },
    /// Cancels the current session without starting another one.
    CancelSession,
    /// Fires the earliest timer due at or before `until`, or moves the clock to `until`.
    Advance {
        /// Absolute virtual instant the host wants to reach.
        until: Duration,
    },
    /// Schedules a timer relative to the current virtual instant.
    Schedule {
        /// Actor whose liveness gates the timer.
        owner: TimerOwner,
        /// Delay after the current instant.
        after: Duration,
        /// Work to perform once the timer fires.
        wake: Wake,
    },
    /// Marks the word as actively revealing.
    EnterWord {
        /// Session that owns the word.
        session: SessionToken,
        /// Index of the word.
        word: usize,
    },
    /// Replaces the display of selected cells within the active word.
    ScrambleWord {
        /// Session that owns the word.
        session: SessionToken,
        /// Index of the word.
        word: usize,
        /// Cell indices paired with the glyph each should now display.
        glyphs: Vec<(usize, Glyph)>,
    },
    /// Forces every cell of the word to its target and settles it.
    SettleWord {
        /// Session that owns the word.
        session: SessionToken,
        /// Index of the word.
        word: usize,
    },
    /// Requests one audio cue on behalf of the owner.
    RequestCue {
        /// Actor requesting the cue.
        owner: TimerOwner,
    },
    /// Reports that the pointer entered the rendered cell.
    PointerEntered {
        /// Cell under the pointer.
        address: CellAddress,
    },
    /// Starts a hover burst on the cell.
    BeginBurst {
        /// Cell perturbed by the burst.
        address: CellAddress,
    },
    /// Shows a transient glyph on the burst's cell.
    PerturbCell {
        /// Burst performing the write.
        burst: BurstToken,
        /// Glyph to display.
        glyph: Glyph,
    },
    /// Restores the burst's cell to its target and retires the burst.
    FinishBurst {
        /// Burst to retire.
        burst: BurstToken,
    },
    /// Enables or disables audio cues.
    SetAudioEnabled {
        /// Whether cues may be requested.
        enabled: bool,
    },
    /// Permanently tears the engine down.
    Dispose,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A new session became current.
    SessionStarted {
        /// Token of the new session.
        session: SessionToken,
        /// Number of cells in each word, in input order.
        word_lengths: Vec<usize>,
    },
    /// The session was cancelled and will never mutate again.
    SessionCancelled {
        /// Token of the cancelled session.
        session: SessionToken,
    },
    /// A word's phase began.
    WordEntered {
        /// Session that owns the word.
        session: SessionToken,
        /// Index of the word.
        word: usize,
    },
    /// A word reached its target.
    WordSettled {
        /// Session that owns the word.
        session: SessionToken,
        /// Index of the word.
        word: usize,
    },
    /// Every word of the session settled.
    SessionSettled {
        /// Token of the settled session.
        session: SessionToken,
    },
    /// A live timer fired at the current instant.
    TimerElapsed {
        /// Actor that scheduled the timer.
        owner: TimerOwner,
        /// Work associated with the timer.
        wake: Wake,
    },
    /// No further timers are due before the requested instant; the clock reached it.
    TimeAdvanced {
        /// Current virtual instant.
        now: Duration,
    },
    /// At least one cell changed its display.
    GridMutated {
        /// Revision counter after the change.
        revision: u64,
    },
    /// An audio cue should be played.
    CueRequested {
        /// Actor requesting the cue.
        owner: TimerOwner,
        /// Virtual instant of the request.
        at: Duration,
    },
    /// The pointer hovered an existing cell.
    CellHovered {
        /// Hovered cell.
        address: CellAddress,
        /// Virtual instant of the hover.
        at: Duration,
    },
    /// A hover burst was admitted.
    BurstStarted {
        /// Token of the burst.
        burst: BurstToken,
        /// Cell perturbed by the burst.
        address: CellAddress,
    },
    /// A hover burst restored its cell and retired.
    BurstFinished {
        /// Token of the burst.
        burst: BurstToken,
        /// Cell that was perturbed.
        address: CellAddress,
    },
    /// Audio cues were enabled or disabled.
    AudioToggled {
        /// Whether cues may be requested.
        enabled: bool,
    },
    /// A degraded condition was absorbed.
    Absorbed {
        /// Kind of degradation.
        kind: Absorbed,
    },
    /// The engine was torn down.
    Disposed,
}

/// Read-only snapshot of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellView {
    /// Glyph the cell settles on.
    pub target: Glyph,
    /// Glyph currently displayed, `None` while unset.
    pub display: Option<Glyph>,
    /// Whether the cell's word completed its phase.
    pub settled: bool,
}

/// Read-only snapshot of a single word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordView {
    /// Cells in reading order.
    pub cells: Vec<CellView>,
    /// Reveal progress of the word.
    pub phase: WordPhase,
}

impl WordView {
    /// Current display of the word, rendering unset cells as spaces.
    #[must_use]
    pub fn display_text(&self) -> String {
        self.cells
            .iter()
            .map(|cell| cell.display.map_or(' ', |glyph| glyph.get()))
            .collect()
    }

    /// Target text of the word.
    #[must_use]
    pub fn target_text(&self) -> String {
        self.cells.iter().map(|cell| cell.target.get()).collect()
    }
}

/// Read-only snapshot of the renderable grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridView {
    /// Token of the current session, if any.
    pub session: Option<SessionToken>,
    /// Lifecycle state of the current session.
    pub phase: SessionPhase,
    /// Words in input order.
    pub words: Vec<WordView>,
    /// Revision counter incremented on every display change.
    pub revision: u64,
}

impl GridView {
    /// Snapshot describing an engine without a session.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            session: None,
            phase: SessionPhase::Idle,
            words: Vec::new(),
            revision: 0,
        }
    }

    /// Words joined by single spaces as currently displayed.
    #[must_use]
    pub fn display_text(&self) -> String {
        self.words
            .iter()
            .map(WordView::display_text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns the cell at `address`, if present.
    #[must_use]
    pub fn cell(&self, address: CellAddress) -> Option<&CellView> {
        self.words
            .get(address.word())
            .and_then(|word| word.cells.get(address.cell()))
    }
}

/// Uppercases `text` and splits it into words of glyphs on whitespace boundaries.
#[must_use]
pub fn split_words(text: &str) -> Vec<Vec<Glyph>> {
    text.to_uppercase()
        .split_whitespace()
        .map(|word| word.chars().map(Glyph::new).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{split_words, Alphabet, ConfigError, Glyph, GlyphSource, DEFAULT_ALPHABET};

    #[test]
    fn standard_alphabet_matches_constant() {
        let alphabet = Alphabet::standard();
        assert_eq!(alphabet.len(), DEFAULT_ALPHABET.chars().count());
        assert!(alphabet.contains(Glyph::new(' ')));
        assert!(alphabet.contains(Glyph::new('?')));
        assert_eq!(alphabet.glyph_at(0), Glyph::new('A'));
    }

    #[test]
    fn empty_alphabet_is_rejected() {
        assert_eq!(Alphabet::from_chars(""), Err(ConfigError::EmptyAlphabet));
    }

    #[test]
    fn glyph_at_wraps_around() {
        let alphabet = Alphabet::from_chars("XY").expect("alphabet");
        assert_eq!(alphabet.glyph_at(3), Glyph::new('Y'));
    }

    #[test]
    fn split_words_uppercases_and_collapses_whitespace() {
        let words = split_words("  hello \t world\n");
        let rendered: Vec<String> = words
            .iter()
            .map(|word| word.iter().map(Glyph::get).collect())
            .collect();
        assert_eq!(rendered, vec!["HELLO".to_owned(), "WORLD".to_owned()]);
    }

    #[test]
    fn split_words_of_blank_text_is_empty() {
        assert!(split_words(" \n\t").is_empty());
    }
}
