//! Clipboard integration utilities.
//!
//! A [`Clipboard`] wraps at most one [`ClipboardBackend`], chosen once by [`Clipboard::detect`].
//! On Linux the `xclip`/`xsel` tools are tried before the in-process clipboard.
//! Copy failures degrade to a warning and a `false` return instead of an error.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};

/// Capability to place text on the system clipboard.
pub trait ClipboardBackend {
    /// Short label used in log messages.
    fn name(&self) -> &str;

    fn copy(&mut self, text: &str) -> Result<()>;
}

/// Direct OS clipboard access through `arboard`.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().context("system clipboard unavailable")?;
        Ok(Self { inner })
    }
}

impl ClipboardBackend for SystemClipboard {
    fn name(&self) -> &str {
        "system"
    }

    fn copy(&mut self, text: &str) -> Result<()> {
        set_text(&mut self.inner, text).context("failed to set system clipboard text")
    }
}

// X11 and Wayland selections vanish with their owner, so hold them until another client
// takes over.
#[cfg(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
))]
fn set_text(clipboard: &mut arboard::Clipboard, text: &str) -> Result<(), arboard::Error> {
    use arboard::SetExtLinux;

    tracing::info!("holding the clipboard until another application takes it over");
    clipboard.set().wait().text(text.to_owned())
}

#[cfg(not(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
)))]
fn set_text(clipboard: &mut arboard::Clipboard, text: &str) -> Result<(), arboard::Error> {
    clipboard.set_text(text.to_owned())
}

/// Pipes text into an external clipboard utility such as `xclip`.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: PathBuf,
    args: Vec<String>,
    label: String,
}

impl CommandClipboard {
    pub fn new(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        let program = program.into();
        let label = program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self {
            program,
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            label,
        }
    }

    /// Resolve `program` on PATH, returning `None` when it is not installed.
    pub fn locate(program: &str, args: &[&str]) -> Option<Self> {
        which::which(program)
            .ok()
            .map(|resolved| Self::new(resolved, args))
    }
}

impl ClipboardBackend for CommandClipboard {
    fn name(&self) -> &str {
        &self.label
    }

    fn copy(&mut self, text: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn clipboard command: {}", self.label))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .context("failed to write clipboard contents")?;
        }

        let status = child
            .wait()
            .with_context(|| format!("clipboard command did not exit cleanly: {}", self.label))?;
        if status.success() {
            Ok(())
        } else {
            Err(anyhow!("clipboard command exited with status {status}"))
        }
    }
}

/// Clipboard handle with its platform strategy fixed at construction.
#[derive(Default)]
pub struct Clipboard {
    backend: Option<Box<dyn ClipboardBackend>>,
}

impl Clipboard {
    /// Select the best available backend for this platform.
    pub fn detect() -> Self {
        let backend = detect_backend();
        match &backend {
            Some(backend) => {
                tracing::debug!(backend = backend.name(), "clipboard backend selected")
            }
            None => tracing::debug!("no clipboard backend available"),
        }
        Self { backend }
    }

    pub fn with_backend(backend: Box<dyn ClipboardBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A clipboard that never succeeds.
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_ref().map(|backend| backend.name())
    }

    /// Copy `text`, returning whether it reached the clipboard.
    pub fn copy(&mut self, text: &str) -> bool {
        let Some(backend) = self.backend.as_mut() else {
            tracing::warn!("no clipboard available; {}", missing_backend_hint());
            return false;
        };

        match backend.copy(text) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    backend = backend.name(),
                    error = %format!("{err:#}"),
                    "clipboard copy failed"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for Clipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clipboard")
            .field("backend", &self.backend_name())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    System,
    Command,
}

fn detect_backend() -> Option<Box<dyn ClipboardBackend>> {
    strategy_order().iter().find_map(|strategy| match strategy {
        Strategy::System => SystemClipboard::new()
            .ok()
            .map(|system| Box::new(system) as Box<dyn ClipboardBackend>),
        Strategy::Command => fallback_commands()
            .iter()
            .find_map(|(program, args)| CommandClipboard::locate(program, args))
            .map(|command| Box::new(command) as Box<dyn ClipboardBackend>),
    })
}

// xclip and xsel fork a process that keeps serving the selection after we exit.
#[cfg(all(unix, not(target_os = "macos")))]
fn strategy_order() -> [Strategy; 2] {
    [Strategy::Command, Strategy::System]
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn strategy_order() -> [Strategy; 2] {
    [Strategy::System, Strategy::Command]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn missing_backend_hint() -> &'static str {
    "install xclip or xsel to enable clipboard output"
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn missing_backend_hint() -> &'static str {
    "use --console or --output instead"
}

#[cfg(target_os = "macos")]
fn fallback_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[("pbcopy", &[])]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn fallback_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
    ]
}

#[cfg(not(unix))]
fn fallback_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[]
}
