//! Audio cues rendered as the terminal bell.

use std::{
    io::{self, Write},
    time::Duration,
};

use flipboard_system_audio_cues::{ClockedVoice, CueBackend, CueVoice, PlaybackError};
use tracing::trace;

/// Voice that rings the bell and then stays busy for the cue length.
pub(crate) struct BellVoice<W> {
    inner: ClockedVoice,
    out: W,
}

impl<W: Write> CueVoice for BellVoice<W> {
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn is_playing(&self, now: Duration) -> bool {
        self.inner.is_playing(now)
    }

    fn rewind(&mut self) {
        self.inner.rewind();
    }

    fn play(&mut self, now: Duration) -> Result<(), PlaybackError> {
        self.out
            .write_all(b"\x07")
            .and_then(|()| self.out.flush())
            .map_err(|error| PlaybackError::Rejected(error.to_string()))?;
        self.inner.play(now)
    }

    fn stop(&mut self) {
        self.inner.stop();
    }
}

/// Backend whose voices ring the terminal bell.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BellBackend {
    cue_length: Duration,
}

impl BellBackend {
    pub(crate) const fn new(cue_length: Duration) -> Self {
        Self { cue_length }
    }
}

impl CueBackend for BellBackend {
    type Voice = BellVoice<io::Stdout>;

    fn open(&mut self, asset: &str, volume: f32) -> Self::Voice {
        trace!(asset, volume, "bell voice opened");
        BellVoice {
            inner: ClockedVoice::new(self.cue_length),
            out: io::stdout(),
        }
    }
}
