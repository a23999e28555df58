//! Per-task confinement context.
//!
//! A `Task` bundles the channel handle, the hat-level ledger, and the
//! context token into one owned value threaded explicitly through calls —
//! there is no hidden global state, and a fake channel slots in for tests.
//! One `Task` per calling thread; all methods take `&mut self`, and a
//! handle shared across threads must be serialized by the caller.

use crate::channel::KernelChannel;
use crate::{
    AttrChannel, BrimCode, BrimError, ConfinementState, HatToken, confinement, hat, profile,
};

pub struct Task<C> {
    chan: C,
    ledger: hat::HatStack,
    /// Token for the current hat-stack context. Minted on the first push,
    /// reused for every nested push, discarded at full unwind.
    context: Option<HatToken>,
}

impl Task<KernelChannel> {
    /// Opens the calling thread's confinement-control channel.
    pub fn current() -> Result<Self, BrimError> {
        Ok(Self::with_channel(KernelChannel::open()?))
    }
}

impl<C: AttrChannel> Task<C> {
    /// Builds a context over an arbitrary channel, typically a fake.
    pub fn with_channel(chan: C) -> Self {
        Self { chan, ledger: hat::HatStack::new(), context: None }
    }

    /// Fresh snapshot of current confinement, straight from the kernel.
    pub fn confinement(&mut self) -> Result<ConfinementState, BrimError> {
        confinement::current(&mut self.chan)
    }

    /// Enters the named hat, minting the context token on first use.
    pub fn change_hat(&mut self, hat_name: &str) -> Result<(), BrimError> {
        self.change_hat_hashed(hat_name, None)
    }

    /// Enters a hat that policy defines by hash; `hash` is caller-supplied.
    pub fn change_hat_hashed(
        &mut self,
        hat_name: &str,
        hash: Option<&[u8]>,
    ) -> Result<(), BrimError> {
        let token = match self.context {
            Some(t) => t,
            None => *self.context.insert(HatToken::fresh()),
        };
        self.push(hat_name, token, hash)
    }

    /// Enters a hat under an explicit token, e.g. one shared with a
    /// cooperating component that will perform the pop.
    pub fn push_hat_with(
        &mut self,
        hat_name: &str,
        token: HatToken,
        hash: Option<&[u8]>,
    ) -> Result<(), BrimError> {
        self.push(hat_name, token, hash)
    }

    fn push(
        &mut self,
        hat_name: &str,
        token: HatToken,
        hash: Option<&[u8]>,
    ) -> Result<(), BrimError> {
        // Hats require an active profile; asking the kernel first keeps
        // the unconfined case a distinct, non-ambiguous failure.
        let state = confinement::current(&mut self.chan)?;
        if !state.is_confined() {
            return Err(BrimError::new(BrimCode::NotConfined)
                .ctx("change_hat requires an active profile"));
        }
        hat::change_hat(&mut self.chan, &mut self.ledger, hat_name, token, hash)
    }

    /// Pops the top hat with the context token.
    pub fn exit_hat(&mut self) -> Result<(), BrimError> {
        let token = self.context.ok_or_else(|| {
            BrimError::new(BrimCode::Authentication).ctx("no hat context token held")
        })?;
        self.pop_hat_with(token)
    }

    /// Pops the top hat under an explicit token.
    pub fn pop_hat_with(&mut self, token: HatToken) -> Result<(), BrimError> {
        hat::exit_hat(&mut self.chan, &mut self.ledger, token)?;
        if self.ledger.depth() == 0 {
            // Context over; the next push starts a new one with a new token.
            self.context = None;
        }
        Ok(())
    }

    /// Locally known hat nesting depth. The kernel holds the real stack
    /// and cannot be read back; this counts successful pushes minus pops
    /// made through this context.
    pub fn hat_depth(&self) -> usize {
        self.ledger.depth()
    }

    /// Immediate, irrevocable switch of the whole confinement profile.
    pub fn change_profile(&mut self, target: &str) -> Result<(), BrimError> {
        profile::change_profile(&mut self.chan, target)
    }

    /// Applies `target` at the next exec; current confinement unchanged.
    pub fn change_onexec(&mut self, target: &str) -> Result<(), BrimError> {
        profile::change_onexec(&mut self.chan, target)
    }

    /// Stacks `target` onto the current confinement immediately.
    pub fn stack_profile(&mut self, target: &str) -> Result<(), BrimError> {
        profile::stack_profile(&mut self.chan, target)
    }

    /// Stacks `target` at the next exec.
    pub fn stack_onexec(&mut self, target: &str) -> Result<(), BrimError> {
        profile::stack_onexec(&mut self.chan, target)
    }
}
