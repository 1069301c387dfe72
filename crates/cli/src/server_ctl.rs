use anyhow::{bail, Context, Result};
use ezviewer_core::paths;
use std::time::Duration;

use crate::ListenArgs;

/// How long `start` watches the child for an early exit (e.g. port in use).
const STARTUP_GRACE: Duration = Duration::from_millis(500);

/// Start the server as a detached background process
pub fn server_start(listen: &ListenArgs) -> Result<()> {
    // Check if already running
    if let Some(pid) = read_pid()? {
        if is_process_running(pid) {
            println!("ezviewer is already running (PID {})", pid);
            return Ok(());
        }
        // Stale PID file, clean up
        let _ = std::fs::remove_file(paths::pid_file_path()?);
    }

    let exe = std::env::current_exe().context("Cannot locate the ezviewer executable")?;
    let mut cmd = std::process::Command::new(&exe);
    cmd.arg("run");
    if let Some(port) = listen.port {
        cmd.arg("--port").arg(port.to_string());
    }
    if let Some(host) = &listen.host {
        cmd.arg("--host").arg(host);
    }

    println!("Starting ezviewer in the background...");
    let mut child = cmd
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .stdin(std::process::Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to start server at {}", exe.display()))?;

    let pid = child.id();
    paths::ensure_app_dir()?;
    std::fs::write(paths::pid_file_path()?, pid.to_string()).context("Failed to write PID file")?;

    std::thread::sleep(STARTUP_GRACE);
    if let Some(status) = child.try_wait().context("Failed to check server process")? {
        let _ = std::fs::remove_file(paths::pid_file_path()?);
        bail!(
            "Server exited right away ({}). Run `ezviewer run` to see why.",
            status
        );
    }

    println!("ezviewer started (PID {})", pid);
    Ok(())
}

/// Stop the background server
pub fn server_stop() -> Result<()> {
    let pid = match read_pid()? {
        Some(pid) => pid,
        None => {
            println!("ezviewer is not running (no PID file)");
            return Ok(());
        }
    };

    if !is_process_running(pid) {
        println!("ezviewer is not running (stale PID {})", pid);
        let _ = std::fs::remove_file(paths::pid_file_path()?);
        return Ok(());
    }

    println!("Stopping ezviewer (PID {})...", pid);
    terminate(pid);

    // Wait briefly and verify
    for _ in 0..20 {
        if !is_process_running(pid) {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    if is_process_running(pid) {
        bail!("ezviewer did not stop (PID {}). Try killing it manually.", pid);
    }

    let _ = std::fs::remove_file(paths::pid_file_path()?);
    println!("ezviewer stopped.");
    Ok(())
}

/// Show server status
pub fn server_status() -> Result<()> {
    match read_pid()? {
        Some(pid) => {
            if is_process_running(pid) {
                println!("ezviewer is running (PID {})", pid);
            } else {
                println!("ezviewer is not running (stale PID file, PID {})", pid);
                let _ = std::fs::remove_file(paths::pid_file_path()?);
            }
        }
        None => {
            println!("ezviewer is not running");
        }
    }
    Ok(())
}

/// Read PID from pid file
pub fn read_pid() -> Result<Option<u32>> {
    let path = paths::pid_file_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).context("Failed to read PID file")?;
    let pid: u32 = content.trim().parse().context("Invalid PID in pid file")?;
    Ok(Some(pid))
}

#[cfg(unix)]
fn terminate(pid: u32) {
    // SAFETY: kill(2) has no memory-safety preconditions; a bad pid yields ESRCH.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn terminate(pid: u32) {
    let _ = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .output();
}

/// Check if a process with the given PID is running
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // kill with signal 0 checks process existence without sending a signal
        // SAFETY: signal 0 performs only the existence/permission check.
        unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        std::process::Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH"])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }
}
