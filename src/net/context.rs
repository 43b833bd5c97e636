//! Process-wide network subsystem setup
//!
//! [`NetworkContext`] is a reference-counted guard around the one-time
//! setup the socket layer wants before it is used. On unix that means
//! ignoring `SIGPIPE`, so a send to a peer that has gone away fails with
//! `EPIPE` instead of terminating the process. The first guard installs the
//! disposition, the last one dropped restores whatever was there before.
//!
//! [`init`] and [`shutdown`] are the same pair without the guard.

use std::sync::Mutex;

use super::{Error, Result};

struct ContextState {
    refs: usize,
    previous_sigpipe: Option<libc::sighandler_t>,
}

static STATE: Mutex<ContextState> = Mutex::new(ContextState {
    refs: 0,
    previous_sigpipe: None,
});

fn lock_state() -> std::sync::MutexGuard<'static, ContextState> {
    STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Take one reference on the network subsystem, setting it up if needed
pub fn init() -> Result<()> {
    let mut state = lock_state();

    if state.refs == 0 {
        // SAFETY: SIG_IGN is a valid disposition for SIGPIPE.
        let previous = unsafe { libc::signal(libc::SIGPIPE, libc::SIG_IGN) };
        if previous == libc::SIG_ERR {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        state.previous_sigpipe = Some(previous);
        tracing::debug!("network context initialized");
    }

    state.refs += 1;
    Ok(())
}

/// Release one reference; the last release restores the previous setup
///
/// Returns `false` if there was nothing to release.
pub fn shutdown() -> Result<bool> {
    let mut state = lock_state();

    if state.refs == 0 {
        return Ok(false);
    }

    state.refs -= 1;
    if state.refs == 0 {
        if let Some(previous) = state.previous_sigpipe.take() {
            // SAFETY: previous was returned by signal() for SIGPIPE.
            let ret = unsafe { libc::signal(libc::SIGPIPE, previous) };
            if ret == libc::SIG_ERR {
                return Err(Error::Io(std::io::Error::last_os_error()));
            }
        }
        tracing::debug!("network context torn down");
    }

    Ok(true)
}

/// Check whether at least one reference is held
pub fn is_initialized() -> bool {
    lock_state().refs > 0
}

/// Guard holding one reference on the network subsystem.
///
/// ```
/// use inet_socket::NetworkContext;
///
/// let ctx = NetworkContext::acquire().unwrap();
/// assert!(NetworkContext::is_active());
/// drop(ctx);
/// ```
#[derive(Debug)]
pub struct NetworkContext {
    _private: (),
}

impl NetworkContext {
    pub fn acquire() -> Result<Self> {
        init()?;
        Ok(NetworkContext { _private: () })
    }

    /// Check whether any context is currently held in this process
    pub fn is_active() -> bool {
        is_initialized()
    }
}

impl Drop for NetworkContext {
    fn drop(&mut self) {
        if let Err(err) = shutdown() {
            tracing::warn!(error = %err, "network context teardown failed");
        }
    }
}
