//! Local audio feedback.

use std::io::Write;

use tracing::trace;

/// Plays a short cue. Fire-and-forget; may be called from any thread.
pub trait FeedbackCue: Send + Sync {
    fn play(&self);
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl FeedbackCue for TerminalBell {
    fn play(&self) {
        let mut stderr = std::io::stderr().lock();
        if stderr.write_all(b"\x07").and_then(|()| stderr.flush()).is_err() {
            trace!("terminal bell unavailable");
        }
    }
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl FeedbackCue for Silent {
    fn play(&self) {}
}
