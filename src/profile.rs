//! Change-profile, change-onexec, and profile stacking.
//!
//! All four operations are one-shot and monotonic: once applied there is
//! no call to revert, and reversion (where policy allows it at all) is
//! itself another change to the original profile name.

use crate::{AttrChannel, BrimCode, BrimError};

/// When a requested profile change takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apply {
    /// Immediately, for the current task.
    Immediate,
    /// At the task's next exec; cleared automatically if the task exits
    /// or execs into something the request no longer applies to.
    OnNextExec,
}

/// One framed profile-change message.
#[derive(Debug)]
pub struct ProfileChangeRequest<'a> {
    pub target: &'a str,
    pub apply: Apply,
    /// Stack the target onto the current confinement instead of replacing
    /// it. The result is the intersection of the stacked profiles and can
    /// never be more permissive than what the task already had.
    pub stack: bool,
}

impl ProfileChangeRequest<'_> {
    pub fn encode(&self) -> Vec<u8> {
        let verb = match (self.stack, self.apply) {
            (false, Apply::Immediate) => "changeprofile",
            (false, Apply::OnNextExec) => "changeonexec",
            (true, Apply::Immediate) => "stackprofile",
            (true, Apply::OnNextExec) => "stackonexec",
        };
        format!("{verb} {}", self.target).into_bytes()
    }
}

/// Requests an immediate, irrevocable switch to `target`.
pub fn change_profile<C: AttrChannel>(chan: &mut C, target: &str) -> Result<(), BrimError> {
    submit(chan, ProfileChangeRequest { target, apply: Apply::Immediate, stack: false })
}

/// Records that the next exec should apply `target`; current confinement
/// is untouched.
pub fn change_onexec<C: AttrChannel>(chan: &mut C, target: &str) -> Result<(), BrimError> {
    submit(chan, ProfileChangeRequest { target, apply: Apply::OnNextExec, stack: false })
}

/// Stacks `target` onto the current confinement immediately.
pub fn stack_profile<C: AttrChannel>(chan: &mut C, target: &str) -> Result<(), BrimError> {
    submit(chan, ProfileChangeRequest { target, apply: Apply::Immediate, stack: true })
}

/// Stacks `target` at the next exec.
pub fn stack_onexec<C: AttrChannel>(chan: &mut C, target: &str) -> Result<(), BrimError> {
    submit(chan, ProfileChangeRequest { target, apply: Apply::OnNextExec, stack: true })
}

fn submit<C: AttrChannel>(chan: &mut C, req: ProfileChangeRequest<'_>) -> Result<(), BrimError> {
    if req.target.is_empty() {
        return Err(BrimError::protocol("empty target profile name"));
    }
    log::debug!("profile change {:?} -> {:?}", req.apply, req.target);
    chan.send_request(&req.encode()).map_err(classify)
}

fn classify(e: BrimError) -> BrimError {
    if e.code != BrimCode::Io {
        return e;
    }
    match e.errno() {
        Some(libc::ENOENT) => BrimError { code: BrimCode::UnknownProfile, ..e },
        Some(libc::EACCES) | Some(libc::EPERM) => BrimError { code: BrimCode::Permission, ..e },
        _ => e,
    }
}
