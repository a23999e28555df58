//! Interface discovery.
//!
//! The confinement-control file lives under a procfs attr namespace whose
//! exact shape depends on the running kernel, so the path is probed at open
//! time, never hard-coded. `/proc/thread-self` (task-scoped, kernel >= 4.12)
//! is preferred over `/proc/self`: confinement is treated as per-thread by
//! default, and each calling thread is expected to open its own channel.

use std::fs;
use std::path::PathBuf;

use crate::{BrimCode, BrimError};

/// Module parameter exposed by an AppArmor-enabled kernel.
const ENABLED_PARAM: &str = "/sys/module/apparmor/parameters/enabled";

/// Candidate control files, most specific first. The `attr/apparmor/`
/// subdirectory is the LSM-scoped interface newer kernels expose alongside
/// the legacy shared `attr/current`.
const CANDIDATES: [&str; 4] = [
    "/proc/thread-self/attr/apparmor/current",
    "/proc/thread-self/attr/current",
    "/proc/self/attr/apparmor/current",
    "/proc/self/attr/current",
];

/// Whether AppArmor is enabled in the running kernel.
///
/// Mirrors the conventional userspace check: the module parameter reads
/// `Y` when the LSM is compiled in and enabled on the kernel command line.
pub fn is_enabled() -> bool {
    match fs::read(ENABLED_PARAM) {
        Ok(raw) => raw.first() == Some(&b'Y'),
        Err(_) => false,
    }
}

/// Resolves the control file for the calling thread.
pub(crate) fn interface_path() -> Result<PathBuf, BrimError> {
    if !is_enabled() {
        return Err(BrimError::unavailable(
            "AppArmor is not enabled in the running kernel",
        ));
    }

    for candidate in CANDIDATES {
        let path = PathBuf::from(candidate);
        if path.exists() {
            log::debug!("apparmor attr interface at {candidate}");
            return Ok(path);
        }
    }

    Err(BrimError::new(BrimCode::Unavailable)
        .ctx("no attr interface found under /proc"))
}
