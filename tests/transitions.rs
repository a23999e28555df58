//! Transition-protocol tests against an in-memory fake kernel.
//!
//! The fake speaks the attr wire grammar and fails with the same errnos the
//! real LSM reports, so these tests exercise the engine's framing, token
//! discipline, and error classification end to end.

use std::collections::HashMap;
use std::io;

use brim::{AttrSink, AttrSource, BrimCode, BrimError, HatToken, Mode, Task};

struct FakeProfile {
    mode: &'static str,
    hats: Vec<&'static str>,
}

/// Kernel-side view of one task's confinement, plus loaded policy.
struct FakeKernel {
    profiles: HashMap<&'static str, FakeProfile>,
    /// Profiles the active policy forbids transitioning to.
    denied: Vec<&'static str>,
    /// Active profile name; `None` = unconfined. Hat lookups resolve
    /// against this even when stacking extends the label.
    active: Option<&'static str>,
    /// Display label, which stacking extends with `//&target`.
    label: String,
    /// (hat name, token) pairs, innermost last.
    hat_stack: Vec<(String, u64)>,
    onexec: Option<&'static str>,
}

impl FakeKernel {
    fn new() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert("app", FakeProfile { mode: "enforce", hats: vec!["worker", "cgi"] });
        profiles.insert("sandbox", FakeProfile { mode: "enforce", hats: vec![] });
        profiles.insert("lenient", FakeProfile { mode: "complain", hats: vec![] });
        profiles.insert("vault", FakeProfile { mode: "enforce", hats: vec![] });
        Self {
            profiles,
            denied: vec!["vault"],
            active: None,
            label: String::new(),
            hat_stack: Vec::new(),
            onexec: None,
        }
    }

    fn confined(profile: &'static str) -> Self {
        let mut k = Self::new();
        k.active = Some(profile);
        k.label = profile.to_string();
        k
    }

    /// Crosses a simulated exec boundary, applying any pending onexec.
    fn exec(&mut self) {
        if let Some(target) = self.onexec.take() {
            self.active = Some(target);
            self.label = target.to_string();
            self.hat_stack.clear();
        }
    }

    fn handle(&mut self, msg: &str) -> Result<(), i32> {
        if let Some(rest) = msg.strip_prefix("changehat ") {
            let Some((tok_hex, name_part)) = rest.split_once(' ') else {
                return Err(libc::EINVAL);
            };
            let Ok(token) = u64::from_str_radix(tok_hex, 16) else {
                return Err(libc::EINVAL);
            };
            if name_part.is_empty() {
                return self.pop_hat(token);
            }
            let hat = name_part.split(' ').next().unwrap_or(name_part);
            return self.push_hat(hat, token);
        }
        if let Some(target) = msg.strip_prefix("changeprofile ") {
            let target = self.lookup(target)?;
            if self.denied.contains(&target) {
                return Err(libc::EACCES);
            }
            self.active = Some(target);
            self.label = target.to_string();
            self.hat_stack.clear();
            return Ok(());
        }
        if let Some(target) = msg.strip_prefix("changeonexec ") {
            self.onexec = Some(self.lookup(target)?);
            return Ok(());
        }
        if let Some(target) = msg.strip_prefix("stackprofile ") {
            let target = self.lookup(target)?;
            self.label = format!("{}//&{target}", self.label);
            return Ok(());
        }
        if let Some(target) = msg.strip_prefix("stackonexec ") {
            self.onexec = Some(self.lookup(target)?);
            return Ok(());
        }
        Err(libc::EINVAL)
    }

    fn lookup(&self, name: &str) -> Result<&'static str, i32> {
        self.profiles.keys().find(|k| **k == name).copied().ok_or(libc::ENOENT)
    }

    fn push_hat(&mut self, hat: &str, token: u64) -> Result<(), i32> {
        let Some(active) = self.active else {
            return Err(libc::EPERM);
        };
        if !self.profiles[active].hats.contains(&hat) {
            return Err(libc::ENOENT);
        }
        self.hat_stack.push((hat.to_string(), token));
        Ok(())
    }

    fn pop_hat(&mut self, token: u64) -> Result<(), i32> {
        match self.hat_stack.last() {
            Some((_, held)) if *held == token => {
                self.hat_stack.pop();
                Ok(())
            }
            // Wrong or absent token: the kernel refuses, state untouched.
            _ => Err(libc::EACCES),
        }
    }
}

impl AttrSink for FakeKernel {
    type Error = BrimError;
    fn send_request(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let msg = std::str::from_utf8(bytes).expect("requests are ASCII");
        self.handle(msg)
            .map_err(|errno| BrimError::io(io::Error::from_raw_os_error(errno)))
    }
}

impl AttrSource for FakeKernel {
    type Error = BrimError;
    fn recv_current(&mut self) -> Result<Vec<u8>, Self::Error> {
        let Some(active) = self.active else {
            return Ok(b"unconfined\n".to_vec());
        };
        let mode = self.profiles[active].mode;
        let label = match self.hat_stack.last() {
            Some((hat, _)) => format!("{}//{hat}", self.label),
            None => self.label.clone(),
        };
        Ok(format!("{label} ({mode})\n").into_bytes())
    }
}

// Forwarding impls so a test can keep the fake and hand the task a borrow.
impl AttrSink for &mut FakeKernel {
    type Error = BrimError;
    fn send_request(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).send_request(bytes)
    }
}

impl AttrSource for &mut FakeKernel {
    type Error = BrimError;
    fn recv_current(&mut self) -> Result<Vec<u8>, Self::Error> {
        (**self).recv_current()
    }
}

fn token(raw: u64) -> HatToken {
    HatToken::from_raw(raw).unwrap()
}

#[test]
fn query_while_unconfined_is_state_not_error() {
    let mut task = Task::with_channel(FakeKernel::new());
    let state = task.confinement().unwrap();
    assert_eq!(state.profile, None);
    assert_eq!(state.mode, None);
    assert!(!state.is_confined());
}

#[test]
fn change_profile_then_query_reports_target() {
    let mut task = Task::with_channel(FakeKernel::new());
    task.change_profile("sandbox").unwrap();
    let state = task.confinement().unwrap();
    assert_eq!(state.profile.as_deref(), Some("sandbox"));
    assert_eq!(state.mode, Some(Mode::Enforce));
}

#[test]
fn complain_mode_round_trips() {
    let mut task = Task::with_channel(FakeKernel::confined("lenient"));
    assert_eq!(task.confinement().unwrap().mode, Some(Mode::Complain));
}

#[test]
fn push_then_pop_restores_prior_state() {
    let mut task = Task::with_channel(FakeKernel::confined("app"));
    let before = task.confinement().unwrap();

    task.change_hat("worker").unwrap();
    assert_eq!(task.hat_depth(), 1);
    let inside = task.confinement().unwrap();
    assert_eq!(inside.profile.as_deref(), Some("app//worker"));

    task.exit_hat().unwrap();
    assert_eq!(task.hat_depth(), 0);
    assert_eq!(task.confinement().unwrap(), before);
}

#[test]
fn context_token_is_reused_across_nested_pushes() {
    let mut fake = FakeKernel::confined("app");
    let mut task = Task::with_channel(&mut fake);
    task.change_hat("worker").unwrap();
    task.change_hat("cgi").unwrap();
    drop(task);
    assert_eq!(fake.hat_stack[0].1, fake.hat_stack[1].1);
}

#[test]
fn pop_with_foreign_token_fails_authentication_and_leaves_state() {
    let mut task = Task::with_channel(FakeKernel::confined("app"));
    task.push_hat_with("worker", token(0x1111), None).unwrap();

    let e = task.pop_hat_with(token(0x2222)).unwrap_err();
    assert_eq!(e.code, BrimCode::Authentication);

    // still in the hat, locally and kernel-side
    assert_eq!(task.hat_depth(), 1);
    let state = task.confinement().unwrap();
    assert_eq!(state.profile.as_deref(), Some("app//worker"));
}

#[test]
fn outer_token_pop_is_a_stack_order_violation() {
    let mut task = Task::with_channel(FakeKernel::confined("app"));
    let outer = token(0xaaaa);
    let inner = token(0xbbbb);
    task.push_hat_with("worker", outer, None).unwrap();
    task.push_hat_with("cgi", inner, None).unwrap();

    let e = task.pop_hat_with(outer).unwrap_err();
    assert_eq!(e.code, BrimCode::StackOrder);
    assert_eq!(task.hat_depth(), 2);

    // correct inner pop then restores the intermediate state
    task.pop_hat_with(inner).unwrap();
    let state = task.confinement().unwrap();
    assert_eq!(state.profile.as_deref(), Some("app//worker"));
    assert_eq!(task.hat_depth(), 1);
}

#[test]
fn exit_hat_without_a_context_is_authentication_failure() {
    let mut task = Task::with_channel(FakeKernel::confined("app"));
    let e = task.exit_hat().unwrap_err();
    assert_eq!(e.code, BrimCode::Authentication);
}

#[test]
fn change_hat_while_unconfined_is_rejected_before_the_wire() {
    let mut fake = FakeKernel::new();
    let mut task = Task::with_channel(&mut fake);
    let e = task.change_hat("worker").unwrap_err();
    assert_eq!(e.code, BrimCode::NotConfined);
    drop(task);
    assert!(fake.hat_stack.is_empty());
}

#[test]
fn unknown_hat_is_reported_verbatim() {
    let mut task = Task::with_channel(FakeKernel::confined("app"));
    let e = task.change_hat("no-such-hat").unwrap_err();
    assert_eq!(e.code, BrimCode::UnknownHat);
    assert_eq!(task.hat_depth(), 0);
}

#[test]
fn unknown_profile_is_reported_verbatim() {
    let mut task = Task::with_channel(FakeKernel::confined("app"));
    let e = task.change_profile("no-such-profile").unwrap_err();
    assert_eq!(e.code, BrimCode::UnknownProfile);
    // confinement untouched
    assert_eq!(task.confinement().unwrap().profile.as_deref(), Some("app"));
}

#[test]
fn denied_profile_change_is_permission_failure() {
    let mut task = Task::with_channel(FakeKernel::confined("app"));
    let e = task.change_profile("vault").unwrap_err();
    assert_eq!(e.code, BrimCode::Permission);
    assert_eq!(task.confinement().unwrap().profile.as_deref(), Some("app"));
}

#[test]
fn onexec_takes_effect_only_at_the_exec_boundary() {
    let mut fake = FakeKernel::confined("app");
    {
        let mut task = Task::with_channel(&mut fake);
        task.change_onexec("sandbox").unwrap();
        // no exec yet: current confinement unchanged
        assert_eq!(task.confinement().unwrap().profile.as_deref(), Some("app"));
    }

    fake.exec();

    let mut task = Task::with_channel(&mut fake);
    assert_eq!(task.confinement().unwrap().profile.as_deref(), Some("sandbox"));
}

#[test]
fn stack_profile_narrows_the_label() {
    let mut task = Task::with_channel(FakeKernel::confined("app"));
    task.stack_profile("sandbox").unwrap();
    let state = task.confinement().unwrap();
    assert_eq!(state.profile.as_deref(), Some("app//&sandbox"));
}

#[test]
fn stack_onexec_is_deferred_like_change_onexec() {
    let mut fake = FakeKernel::confined("app");
    {
        let mut task = Task::with_channel(&mut fake);
        task.stack_onexec("sandbox").unwrap();
        assert_eq!(task.confinement().unwrap().profile.as_deref(), Some("app"));
    }
    fake.exec();
    assert!(fake.label.contains("sandbox"));
}

#[test]
fn hashed_hat_request_reaches_the_kernel_intact() {
    let mut task = Task::with_channel(FakeKernel::confined("app"));
    task.change_hat_hashed("worker", Some(&[0xab, 0xcd])).unwrap();
    assert_eq!(task.hat_depth(), 1);
}
