//! # Scan Confirmation Cue
//!
//! A short audible confirmation when a scan lands in the cart. Playback is
//! best effort: a failure is logged and never reaches the cashier.

use std::io::Write;

use thiserror::Error;

/// Why a cue could not be played.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    #[error("Audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Plays the "item added" confirmation.
pub trait AudioCue: Send + Sync {
    fn play_confirmation(&self) -> Result<(), AudioError>;
}

/// Plays nothing. Default for headless runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentCue;

impl AudioCue for SilentCue {
    fn play_confirmation(&self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl AudioCue for TerminalBell {
    fn play_confirmation(&self) -> Result<(), AudioError> {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_cue_never_fails() {
        assert!(SilentCue.play_confirmation().is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = AudioError::Unavailable("no device".into());
        assert_eq!(err.to_string(), "Audio output unavailable: no device");
    }
}
