use core::fmt;

use rand::RngCore;
use rand::rngs::OsRng;

/// Enforcement mode reported by the kernel for a confined task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Denials are blocked.
    Enforce,
    /// Denials are logged only.
    Complain,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enforce => "enforce",
            Self::Complain => "complain",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a task's confinement.
///
/// Produced fresh on every query and never cached; the kernel is the sole
/// source of truth and the state can change between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfinementState {
    /// Active profile name; `None` when the task is unconfined.
    pub profile: Option<String>,
    /// Enforcement mode; `None` when unconfined.
    pub mode: Option<Mode>,
}

impl ConfinementState {
    pub fn unconfined() -> Self {
        Self { profile: None, mode: None }
    }

    pub fn is_confined(&self) -> bool {
        self.profile.is_some()
    }
}

impl fmt::Display for ConfinementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.profile, self.mode) {
            (Some(p), Some(m)) => write!(f, "{p} ({m})"),
            (Some(p), None) => f.write_str(p),
            _ => f.write_str("unconfined"),
        }
    }
}

/// Magic value authenticating the transition back out of a hat.
///
/// Generated once per hat-stack context and reused for every hat pushed
/// within it; the kernel refuses a pop carrying anything else. Must come
/// from a cryptographically unpredictable source: a guessable token lets
/// an attacker forge the pop and escape the hat.
///
/// Held by the calling task only. Never persisted, and the `Debug` impl
/// redacts the value so it cannot leak through logs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HatToken(u64);

impl HatToken {
    /// Draws a fresh nonzero token from the operating system CSPRNG.
    pub fn fresh() -> Self {
        let mut raw = OsRng.next_u64();
        while raw == 0 {
            raw = OsRng.next_u64();
        }
        Self(raw)
    }

    /// Rebuilds a token from its raw value, e.g. one handed over by a
    /// cooperating component that performed the push. Zero is reserved.
    pub fn from_raw(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub(crate) fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HatToken(<redacted>)")
    }
}
