//! Opening finished artifacts with the host's default application.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, warn};

/// Hands a finished artifact to something that can show it.
///
/// Fire-and-forget: implementations log failures instead of returning them.
pub trait ArtifactLauncher: Send + Sync {
    fn open(&self, path: &Path);
}

/// Uses `open` on macOS, `start` on Windows and `xdg-open` elsewhere
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    fn command(path: &Path) -> Command {
        if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.arg(path);
            command
        } else if cfg!(windows) {
            let mut command = Command::new("cmd");
            // The empty argument is the window title `start` expects first
            command.args(["/C", "start", ""]).arg(path);
            command
        } else {
            let mut command = Command::new("xdg-open");
            command.arg(path);
            command
        }
    }
}

impl ArtifactLauncher for SystemLauncher {
    fn open(&self, path: &Path) {
        let spawned = Self::command(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                debug!(path = %path.display(), pid = child.id(), "Opened artifact");
                reap(child);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to open artifact"),
        }
    }
}

/// Wait for the opener on a detached thread so it does not linger as a zombie
fn reap(mut child: Child) -> JoinHandle<()> {
    std::thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => {
            warn!(pid = child.id(), status = %status, "Artifact opener exited with an error")
        }
        Ok(_) => {}
        Err(e) => warn!(pid = child.id(), error = %e, "Failed to wait for artifact opener"),
    })
}

/// Never opens anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLauncher;

impl ArtifactLauncher for NoopLauncher {
    fn open(&self, path: &Path) {
        debug!(path = %path.display(), "Not opening artifact");
    }
}
