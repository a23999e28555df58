use std::{fmt, io};


use liaise::{Liaise, RegisterErrors};

#[derive(RegisterErrors, Debug, Copy, Clone, PartialEq, Eq)]
#[error_prefix = "AA"] // Sets the reporting prefix
pub enum BrimCode {
    Io = 1,
    Unavailable = 2,
    Permission = 3,
    Protocol = 4,
    Authentication = 10,
    StackOrder = 11,
    UnknownHat = 12,
    UnknownProfile = 13,
    NotConfined = 14,
}

impl Liaise for BrimCode {
    fn code_id(self) -> u16 { self as u16 }

    fn message(self) -> &'static str {
        match self {
            Self::Io => "I/O error on attr interface",
            Self::Unavailable => "AppArmor unavailable",
            Self::Permission => "Permission denied",
            Self::Protocol => "Malformed kernel response",
            Self::Authentication => "Hat token mismatch",
            Self::StackOrder => "Hat pop out of order",
            Self::UnknownHat => "Hat not defined by active profile",
            Self::UnknownProfile => "Profile not defined by loaded policy",
            Self::NotConfined => "Task is not confined",
        }
    }
}

/// Concrete runtime error type for the crate.
/// Uses `liaise` for stable IDs + formatting; no `thiserror`.
///
/// Kernel error text rides along verbatim in `ctx`/`source`; nothing is
/// retried or coerced on the way up.
#[derive(Debug)]
pub struct BrimError {
    pub code: BrimCode,
    pub ctx: Option<String>,

    // Originating syscall error, when one exists.
    pub source: Option<io::Error>,
}

impl BrimError {
    #[inline]
    pub fn new(code: BrimCode) -> Self {
        Self { code, ctx: None, source: None }
    }

    #[inline]
    pub fn ctx(mut self, ctx: impl fmt::Display) -> Self {
        self.ctx = Some(ctx.to_string());
        self
    }

    #[inline]
    pub fn io(err: io::Error) -> Self {
        Self {
            code: BrimCode::Io,
            ctx: Some(err.to_string()),
            source: Some(err),
        }
    }

    /// Reclassifies a kernel-reported syscall failure under a specific code,
    /// keeping the original error text and errno reachable.
    #[inline]
    pub fn kernel(code: BrimCode, err: io::Error) -> Self {
        Self {
            code,
            ctx: Some(err.to_string()),
            source: Some(err),
        }
    }

    #[inline]
    pub fn unavailable(ctx: impl fmt::Display) -> Self {
        Self::new(BrimCode::Unavailable).ctx(ctx)
    }

    #[inline]
    pub fn protocol(ctx: impl fmt::Display) -> Self {
        Self::new(BrimCode::Protocol).ctx(ctx)
    }

    /// Raw OS errno of the originating syscall failure, if any.
    #[inline]
    pub fn errno(&self) -> Option<i32> {
        self.source.as_ref().and_then(io::Error::raw_os_error)
    }
}

impl fmt::Display for BrimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical format: "[AA0001] msg: ctx"
        let base = self.code.render();
        match &self.ctx {
            Some(ctx) => write!(f, "{base}: {ctx}"),
            None => write!(f, "{base}"),
        }
    }
}

impl std::error::Error for BrimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(e) => Some(e),
            None => None,
        }
    }
}

impl From<std::io::Error> for BrimError {
    #[inline]
    fn from(e: std::io::Error) -> Self {
        BrimError::io(e)
    }
}
