//! Hat transition engine.
//!
//! The real hat stack lives in the kernel and cannot be read back; this
//! module keeps only the minimal local ledger (one token per pushed level)
//! needed to drive correct pop ordering and to classify kernel-reported
//! failures. Pushes nest; pops must be LIFO, enforced by the kernel and
//! observed here as a write failure.

use crate::{AttrChannel, BrimCode, BrimError, HatToken};

/// One framed change-hat message. Constructed per call, written, discarded.
///
/// An empty `hat_name` encodes a pop: the request carries only the token,
/// which the kernel verifies against the one supplied at push time.
#[derive(Debug)]
pub struct HatRequest<'a> {
    pub token: HatToken,
    pub hat_name: &'a str,
    /// Hash of the hat name, for policies defining hats by hash rather
    /// than literal name. Caller-supplied; appended as lowercase hex.
    pub hat_name_hash: Option<&'a [u8]>,
}

impl HatRequest<'_> {
    pub fn encode(&self) -> Vec<u8> {
        let mut msg = format!("changehat {:016x} {}", self.token.raw(), self.hat_name);
        if let Some(hash) = self.hat_name_hash {
            if !self.hat_name.is_empty() {
                msg.push(' ');
                msg.push_str(&hex::encode(hash));
            }
        }
        msg.into_bytes()
    }
}

/// Local ledger of pushed hat levels, oldest first.
#[derive(Debug, Default)]
pub struct HatStack {
    levels: Vec<HatToken>,
}

impl HatStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    fn top(&self) -> Option<HatToken> {
        self.levels.last().copied()
    }

    /// Whether `token` authenticates a level below the top, i.e. a pop
    /// carrying it would violate LIFO order rather than fail outright.
    fn held_below_top(&self, token: HatToken) -> bool {
        match self.levels.split_last() {
            Some((_, below)) => below.contains(&token),
            None => false,
        }
    }
}

/// Pushes `hat_name`, confining the task to that sub-profile.
///
/// The write either fully applies or fully fails; the ledger records the
/// level only after the kernel accepted it.
pub fn change_hat<C: AttrChannel>(
    chan: &mut C,
    ledger: &mut HatStack,
    hat_name: &str,
    token: HatToken,
    hat_name_hash: Option<&[u8]>,
) -> Result<(), BrimError> {
    if hat_name.is_empty() {
        return Err(BrimError::protocol("empty hat name encodes a pop; use exit_hat"));
    }

    let req = HatRequest { token, hat_name, hat_name_hash };
    log::debug!("pushing hat {hat_name:?} (depth {})", ledger.depth());

    chan.send_request(&req.encode()).map_err(classify_push)?;
    ledger.levels.push(token);
    Ok(())
}

/// Pops one hat level, returning the task to the state before the
/// corresponding push. The kernel verifies the token; a failed pop leaves
/// both kernel and ledger state untouched.
pub fn exit_hat<C: AttrChannel>(
    chan: &mut C,
    ledger: &mut HatStack,
    token: HatToken,
) -> Result<(), BrimError> {
    let req = HatRequest { token, hat_name: "", hat_name_hash: None };
    log::debug!("popping hat (depth {})", ledger.depth());

    if let Err(e) = chan.send_request(&req.encode()) {
        return Err(classify_pop(e, ledger, token));
    }

    // Kernel is authoritative: it accepted the pop, drop our top record
    // even if the token came from a cooperating component we never pushed.
    if ledger.top().is_some() {
        ledger.levels.pop();
    }
    Ok(())
}

/// Maps a kernel-reported push failure onto the error taxonomy. Errors the
/// channel already classified (or that carry no errno) pass through as-is.
fn classify_push(e: BrimError) -> BrimError {
    if e.code != BrimCode::Io {
        return e;
    }
    match e.errno() {
        Some(libc::ENOENT) => recode(e, BrimCode::UnknownHat),
        Some(libc::EACCES) | Some(libc::EPERM) => recode(e, BrimCode::Permission),
        _ => e,
    }
}

/// A rejected pop is an access failure at the syscall level; the ledger
/// tells the two caller mistakes apart. A token held for an outer level
/// while inner levels are live is a LIFO violation; a token this context
/// never issued is a forged or stale credential.
fn classify_pop(e: BrimError, ledger: &HatStack, token: HatToken) -> BrimError {
    if e.code != BrimCode::Io {
        return e;
    }
    match e.errno() {
        Some(libc::EACCES) | Some(libc::EPERM) => {
            if ledger.held_below_top(token) {
                recode(e, BrimCode::StackOrder)
            } else {
                recode(e, BrimCode::Authentication)
            }
        }
        Some(libc::ENOENT) => recode(e, BrimCode::UnknownHat),
        _ => e,
    }
}

fn recode(e: BrimError, code: BrimCode) -> BrimError {
    BrimError { code, ctx: e.ctx, source: e.source }
}
