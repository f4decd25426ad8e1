//! OS-backed clipboard and external viewer.

use std::{path::Path, time::Duration};

use arboard::Clipboard;
use client_core::{ActionError, ClipboardWriter, ExternalOpener};

/// Upper bound on how long the process keeps serving a copy on Linux.
pub const CLIPBOARD_HOLD: Duration = Duration::from_secs(30);

pub struct SystemClipboard {
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    hold: Duration,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self {
            hold: CLIPBOARD_HOLD,
        }
    }
}

impl ClipboardWriter for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ActionError> {
        let mut clipboard =
            Clipboard::new().map_err(|err| ActionError::Clipboard(err.to_string()))?;

        // X11 selections die with their owner, so stay alive until another
        // client takes the contents or the hold runs out.
        #[cfg(target_os = "linux")]
        let result = {
            use arboard::SetExtLinux;
            tracing::info!(hold_secs = self.hold.as_secs(), "clipboard: serving copied text");
            clipboard
                .set()
                .wait_until(std::time::Instant::now() + self.hold)
                .text(text.to_string())
        };

        #[cfg(not(target_os = "linux"))]
        let result = clipboard.set_text(text.to_string());

        result.map_err(|err| ActionError::Clipboard(err.to_string()))
    }
}

pub struct SystemOpener;

impl ExternalOpener for SystemOpener {
    fn open(&self, target: &str) -> Result<(), ActionError> {
        spawn_viewer(target).map_err(|err| ActionError::Open {
            target: target.to_string(),
            reason: err.to_string(),
        })
    }
}

fn spawn_viewer(target: &str) -> std::io::Result<()> {
    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("cmd")
        .args(["/C", "start", "", target])
        .spawn();

    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(target).spawn();

    #[cfg(all(unix, not(target_os = "macos")))]
    let result = std::process::Command::new("xdg-open").arg(target).spawn();

    result.map(|_| ())
}

/// MIME type declared for a file picked from disk, as a browser would report it.
pub fn declared_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}
