//! External reference-binary runner (C9).
//!
//! Spawns the configured binary against an input file, fully drains its
//! stdout/stderr before waiting (avoiding pipe deadlock on a chatty child),
//! and enforces an optional timeout: SIGTERM first, then SIGKILL after a
//! 5-second grace period if the process has not exited.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{CircuitError, Result};

const GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
}

/// Run `binary` against `input_file`, waiting up to `timeout` (if given).
pub fn run(binary: &Path, input_file: &Path, timeout: Option<Duration>) -> Result<RunOutput> {
    let mut child = Command::new(binary)
        .arg(input_file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr was piped");

    // Drain both streams on dedicated threads so a full pipe buffer on one
    // stream can never block the child from writing the other while we
    // wait for it to exit.
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stdout_pipe.read_to_string(&mut buf);
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr_pipe.read_to_string(&mut buf);
        buf
    });

    let status = wait_with_timeout(&mut child, timeout)?;

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    let status_code = status.and_then(|s| s.code());

    if status.map(|s| !s.success()).unwrap_or(true) {
        return Err(CircuitError::Runner {
            status: status_code,
            stderr,
        });
    }

    Ok(RunOutput {
        stdout,
        stderr,
        status: status_code,
    })
}

#[cfg(unix)]
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> Result<Option<std::process::ExitStatus>> {
    let Some(timeout) = timeout else {
        return Ok(Some(child.wait()?));
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            terminate_then_kill(child)?;
            return Ok(child.try_wait()?);
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

#[cfg(unix)]
fn terminate_then_kill(child: &mut Child) -> Result<()> {
    // std::process has no portable SIGTERM; raise it directly via the
    // process group's kill(2) entry point that libc already links on unix.
    unsafe {
        sigterm(child.id() as i32);
    }

    let deadline = Instant::now() + GRACE_PERIOD;
    while Instant::now() < deadline {
        if let Some(_status) = child.try_wait()? {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let _ = child.kill();
    let _ = child.wait();
    Ok(())
}

#[cfg(unix)]
unsafe fn sigterm(pid: i32) {
    extern "C" {
        fn kill(pid: i32, sig: i32) -> i32;
    }
    kill(pid, 15);
}

#[cfg(not(unix))]
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> Result<Option<std::process::ExitStatus>> {
    let Some(timeout) = timeout else {
        return Ok(Some(child.wait()?));
    };
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(child.try_wait()?);
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn runs_a_trivial_command_and_captures_stdout() {
        let dir = std::env::temp_dir();
        let input = dir.join("accirc_runner_test_input.txt");
        std::fs::File::create(&input).unwrap().write_all(b"hi").unwrap();

        let output = run(Path::new("/bin/echo"), &input, None).unwrap();
        assert!(output.status == Some(0));
    }
}
