//! Subprocess execution with a hard deadline. Hooks run in interactive
//! sessions, so a hung child must never hang the session with it.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Outcome of a bounded subprocess run. `status` is None when the child was
/// killed at the deadline or its exit code was unavailable.
#[derive(Debug)]
pub struct CmdOutput {
    pub status: Option<i32>,
    pub stdout: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Run `program` with `args` in `cwd`, capturing stdout, killing the child if
/// it outlives `timeout`. Returns None if the process could not be spawned.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Option<CmdOutput> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    // Drain stdout on a separate thread so the child can't block on a full
    // pipe while we poll for exit.
    let stdout = child.stdout.take()?;
    let reader = std::thread::spawn(move || {
        let mut buf = String::new();
        let mut stdout = stdout;
        let _ = stdout.read_to_string(&mut buf);
        buf
    });

    let status = wait_with_deadline(&mut child, timeout);
    let stdout = reader.join().unwrap_or_default();
    Some(CmdOutput { status, stdout })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Option<i32> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.code(),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!("subprocess timed out after {timeout:?}, killed");
                    return None;
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(err) => {
                tracing::warn!("subprocess wait failed: {err}");
                let _ = child.kill();
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cwd() -> PathBuf {
        std::env::temp_dir()
    }

    #[test]
    fn captures_stdout_and_status() {
        let out = run_with_timeout("sh", &["-c", "echo hello"], &cwd(), Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.status, Some(0));
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.success());
    }

    #[test]
    fn reports_nonzero_exit() {
        let out = run_with_timeout("sh", &["-c", "exit 3"], &cwd(), Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.status, Some(3));
        assert!(!out.success());
    }

    #[test]
    fn kills_at_deadline() {
        let start = Instant::now();
        let out = run_with_timeout("sh", &["-c", "sleep 30"], &cwd(), Duration::from_millis(200))
            .unwrap();
        assert_eq!(out.status, None);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn missing_program_is_none() {
        assert!(run_with_timeout(
            "definitely-not-a-real-binary-xyz",
            &[],
            &cwd(),
            Duration::from_secs(1)
        )
        .is_none());
    }
}
