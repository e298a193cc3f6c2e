// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Unix Platform Implementation
//!
//! POSIX daemonization for Linux and macOS.
//!
//! ## Platform APIs Used
//!
//! - **Detaching**: `libc::fork`, `libc::setsid`, `libc::umask`
//! - **Instance lock**: `libc::flock` with `LOCK_EX | LOCK_NB`
//! - **Privilege drop**: `libc::getpwnam`, `libc::setgid`, `libc::setuid`
//!
//! The sequence is the classic double fork: the first child leads a new
//! session, the second can no longer reacquire a controlling terminal.
//! The lock file descriptor is intentionally leaked so the kernel holds the
//! lock for the daemon's lifetime.

use std::ffi::CString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::fd::{AsRawFd, IntoRawFd};

use super::{DaemonContext, PlatformError};

fn errno_string() -> String {
    std::io::Error::last_os_error().to_string()
}

/// Fork once, exiting the parent.
fn fork_and_detach() -> Result<(), PlatformError> {
    // Safety: fork has no preconditions; the single-threaded bootstrap
    // phase runs before any runtime threads are spawned
    match unsafe { libc::fork() } {
        -1 => Err(PlatformError::ForkFailed(errno_string())),
        0 => Ok(()),
        _ => std::process::exit(0),
    }
}

fn redirect_stdio() -> Result<(), PlatformError> {
    let devnull = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|e| PlatformError::FileCreation(format!("/dev/null: {}", e)))?;
    let fd = devnull.as_raw_fd();
    // Safety: dup2 onto the standard descriptors of this process
    unsafe {
        libc::dup2(fd, libc::STDIN_FILENO);
        libc::dup2(fd, libc::STDOUT_FILENO);
        libc::dup2(fd, libc::STDERR_FILENO);
    }
    Ok(())
}

fn acquire_lock(context: &DaemonContext) -> Result<(), PlatformError> {
    let lockfile = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&context.lockfile)
        .map_err(|e| {
            PlatformError::FileCreation(format!("{}: {}", context.lockfile.display(), e))
        })?;

    // Safety: flock on a descriptor we own
    let rc = unsafe { libc::flock(lockfile.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc != 0 {
        return Err(PlatformError::LockBusy(format!(
            "{} is held by another instance",
            context.lockfile.display()
        )));
    }

    // Keep the descriptor (and therefore the lock) for the daemon lifetime
    let _ = lockfile.into_raw_fd();
    Ok(())
}

fn write_pidfile(context: &DaemonContext) -> Result<(), PlatformError> {
    let mut pidfile = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&context.pidfile)
        .map_err(|e| {
            PlatformError::FileCreation(format!("{}: {}", context.pidfile.display(), e))
        })?;
    // Safety: getpid cannot fail
    let pid = unsafe { libc::getpid() };
    writeln!(pidfile, "{}", pid)
        .map_err(|e| PlatformError::FileCreation(format!("{}: {}", context.pidfile.display(), e)))
}

fn drop_privileges(user: &str) -> Result<(), PlatformError> {
    let name = CString::new(user)
        .map_err(|_| PlatformError::UnknownUser(user.to_string()))?;
    // Safety: getpwnam with a valid C string; the result is only read
    // before any other passwd call
    let passwd = unsafe { libc::getpwnam(name.as_ptr()) };
    if passwd.is_null() {
        return Err(PlatformError::UnknownUser(user.to_string()));
    }
    let (uid, gid) = unsafe { ((*passwd).pw_uid, (*passwd).pw_gid) };

    // Group first: after setuid the process may no longer have the right
    // Safety: plain syscalls
    if unsafe { libc::setgid(gid) } != 0 {
        return Err(PlatformError::PrivilegeDrop(format!(
            "setgid({}): {}",
            gid,
            errno_string()
        )));
    }
    if unsafe { libc::setuid(uid) } != 0 {
        return Err(PlatformError::PrivilegeDrop(format!(
            "setuid({}): {}",
            uid,
            errno_string()
        )));
    }
    Ok(())
}

/// Daemonize the current process per `context`.
pub fn daemonize(context: &DaemonContext) -> Result<(), PlatformError> {
    fork_and_detach()?;

    // Safety: we are the only thread; session leadership detaches us from
    // the controlling terminal
    if unsafe { libc::setsid() } == -1 {
        return Err(PlatformError::SessionFailed(errno_string()));
    }

    // The second fork guarantees we can never reacquire a terminal
    fork_and_detach()?;

    // Safety: umask always succeeds
    unsafe { libc::umask(0o027) };

    fs::create_dir_all(&context.rundir).map_err(|e| {
        PlatformError::FileCreation(format!("{}: {}", context.rundir.display(), e))
    })?;
    std::env::set_current_dir(&context.rundir).map_err(|e| {
        PlatformError::FileCreation(format!("{}: {}", context.rundir.display(), e))
    })?;

    acquire_lock(context)?;
    write_pidfile(context)?;
    redirect_stdio()?;

    if let Some(user) = &context.user {
        drop_privileges(user)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn context(dir: &std::path::Path) -> DaemonContext {
        DaemonContext {
            name: "test".to_string(),
            user: None,
            lockfile: dir.join("test.lock"),
            pidfile: dir.join("test.pid"),
            rundir: PathBuf::from(dir),
        }
    }

    #[test]
    fn test_lock_and_pidfile_in_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        acquire_lock(&ctx).unwrap();
        write_pidfile(&ctx).unwrap();

        let pid_text = std::fs::read_to_string(&ctx.pidfile).unwrap();
        let pid: i32 = pid_text.trim().parse().unwrap();
        assert_eq!(pid, std::process::id() as i32);
    }

    #[test]
    fn test_unknown_user_is_reported() {
        let err = drop_privileges("no-such-user-exists-here").unwrap_err();
        assert!(matches!(err, PlatformError::UnknownUser(_)));
    }
}
