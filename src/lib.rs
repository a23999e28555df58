//! # BRIM
//! Runtime AppArmor confinement control over the kernel attr interface.
//!
//! A "brim" is the hard edge of a hat. This crate provides the primitives
//! for a confined task to inspect its mandatory-access-control state and
//! to cross its own boundaries on purpose — entering hats, leaving them
//! with the right token, or changing profile outright — without ever
//! weakening the boundary by accident.
//!
//! ## Core Security Principles
//! * **One-way transitions:** Every write to the kernel is irreversible
//!   except through the protocol's own matching pop; there is no undo.
//! * **Token discipline:** Hat exits are authenticated by a per-context
//!   magic token from the OS CSPRNG. Tokens are never persisted and never
//!   logged.
//! * **Kernel as truth:** Confinement state is read fresh on every query;
//!   the local ledger exists only to drive correct pop ordering.
//!

pub mod channel;
pub mod confinement;
pub mod error;
pub mod hat;
pub mod profile;
pub mod task;
pub mod traits;
pub mod types;

pub use channel::{KernelChannel, is_enabled};
pub use error::*;
pub use task::Task;
pub use traits::*;
pub use types::*;
