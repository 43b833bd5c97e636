//! Typed socket option values
//!
//! `getsockopt`/`setsockopt` move an untyped buffer. [`SockOptValue`] pins
//! down, per Rust type, which C type that buffer holds, so the generic option
//! accessors on [`Socket`](super::Socket) never reinterpret arbitrary memory.

use std::mem;
use std::os::fd::RawFd;
use std::time::Duration;

use super::{Error, Result};

/// A Rust value with a fixed C representation for socket options.
///
/// # Safety
///
/// `Raw` must be plain old data: every bit pattern the kernel may write into
/// it is a valid value, and it contains no pointers.
pub unsafe trait SockOptValue: Sized {
    /// The C type the option buffer holds
    type Raw: Copy;

    /// A zeroed raw value to receive into
    fn empty() -> Self::Raw;

    fn to_raw(&self) -> Self::Raw;

    fn from_raw(raw: Self::Raw) -> Self;
}

unsafe impl SockOptValue for libc::c_int {
    type Raw = libc::c_int;

    fn empty() -> Self::Raw {
        0
    }

    fn to_raw(&self) -> Self::Raw {
        *self
    }

    fn from_raw(raw: Self::Raw) -> Self {
        raw
    }
}

unsafe impl SockOptValue for bool {
    type Raw = libc::c_int;

    fn empty() -> Self::Raw {
        0
    }

    fn to_raw(&self) -> Self::Raw {
        libc::c_int::from(*self)
    }

    fn from_raw(raw: Self::Raw) -> Self {
        raw != 0
    }
}

/// Timeouts (`SO_RCVTIMEO`, `SO_SNDTIMEO`); a zero duration means "none".
unsafe impl SockOptValue for Duration {
    type Raw = libc::timeval;

    fn empty() -> Self::Raw {
        libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        }
    }

    fn to_raw(&self) -> Self::Raw {
        libc::timeval {
            tv_sec: self.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_usec: self.subsec_micros() as libc::suseconds_t,
        }
    }

    fn from_raw(raw: Self::Raw) -> Self {
        Duration::new(raw.tv_sec.max(0) as u64, (raw.tv_usec.max(0) as u32) * 1000)
    }
}

/// `SO_LINGER` value: `None` disables lingering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linger(pub Option<Duration>);

unsafe impl SockOptValue for Linger {
    type Raw = libc::linger;

    fn empty() -> Self::Raw {
        libc::linger {
            l_onoff: 0,
            l_linger: 0,
        }
    }

    fn to_raw(&self) -> Self::Raw {
        match self.0 {
            Some(duration) => libc::linger {
                l_onoff: 1,
                l_linger: duration.as_secs().min(libc::c_int::MAX as u64) as libc::c_int,
            },
            None => Self::empty(),
        }
    }

    fn from_raw(raw: Self::Raw) -> Self {
        if raw.l_onoff == 0 {
            Linger(None)
        } else {
            Linger(Some(Duration::from_secs(raw.l_linger.max(0) as u64)))
        }
    }
}

pub(crate) fn get_opt<T: SockOptValue>(fd: RawFd, level: i32, name: i32) -> Result<T> {
    let mut raw = T::empty();
    let expected = mem::size_of::<T::Raw>();
    let mut len = expected as libc::socklen_t;

    // SAFETY: raw is a valid, writable T::Raw of `len` bytes, and the trait
    // contract makes any bytes the kernel writes a valid T::Raw.
    let ret = unsafe {
        libc::getsockopt(
            fd,
            level,
            name,
            &mut raw as *mut T::Raw as *mut libc::c_void,
            &mut len,
        )
    };

    if ret < 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }

    if len as usize != expected {
        return Err(Error::ShortTransfer {
            expected,
            actual: len as usize,
        });
    }

    Ok(T::from_raw(raw))
}

pub(crate) fn set_opt<T: SockOptValue>(fd: RawFd, level: i32, name: i32, value: &T) -> Result<()> {
    let raw = value.to_raw();

    // SAFETY: raw lives for the call and is exactly size_of::<T::Raw>() bytes.
    let ret = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            &raw as *const T::Raw as *const libc::c_void,
            mem::size_of::<T::Raw>() as libc::socklen_t,
        )
    };

    if ret < 0 {
        Err(Error::Io(std::io::Error::last_os_error()))
    } else {
        Ok(())
    }
}
