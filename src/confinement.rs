//! Confinement query.
//!
//! Read-side grammar: `<profile-name> (<mode>)`, or the literal
//! `unconfined`. The split happens on the last parenthesis group only,
//! since profile names may carry parentheses-adjacent characters but the
//! mode suffix is always the trailing `(enforce)` / `(complain)` token.

use crate::{AttrChannel, BrimError, ConfinementState, Mode};

/// Sentinel the kernel emits for a task with no profile attached.
pub const UNCONFINED: &str = "unconfined";

/// Queries the kernel for the calling task's current confinement.
pub fn current<C: AttrChannel>(chan: &mut C) -> Result<ConfinementState, BrimError> {
    let raw = chan.recv_current()?;
    parse_state(&raw)
}

/// Parses one read-side message into structured state.
///
/// Unrecognized trailing mode text is a protocol error, never guessed at:
/// a mode this layer has no name for means the kernel contract moved.
pub fn parse_state(raw: &[u8]) -> Result<ConfinementState, BrimError> {
    let text = core::str::from_utf8(raw)
        .map_err(|_| BrimError::protocol("attr response is not UTF-8"))?;

    // Kernel output is NUL/newline terminated depending on interface age.
    let text = text.trim_end_matches(['\0', '\n']);

    if text.is_empty() {
        return Err(BrimError::protocol("empty attr response"));
    }
    if text == UNCONFINED {
        return Ok(ConfinementState::unconfined());
    }

    let (profile, mode) = match text.rfind(" (") {
        Some(at) if text.ends_with(')') => {
            let profile = &text[..at];
            let mode = &text[at + 2..text.len() - 1];
            (profile, mode)
        }
        _ => {
            return Err(BrimError::protocol(format_args!(
                "missing mode suffix in attr response: {text:?}"
            )));
        }
    };

    let mode = match mode {
        "enforce" => Mode::Enforce,
        "complain" => Mode::Complain,
        other => {
            return Err(BrimError::protocol(format_args!(
                "unrecognized confinement mode: {other:?}"
            )));
        }
    };

    Ok(ConfinementState {
        profile: Some(profile.to_string()),
        mode: Some(mode),
    })
}
