// Command execution: background runs with capture, visible terminal windows,
// and an in-memory execution history.

use std::process::Output;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use crate::models::{ExecMethod, ExecutionRecord};

/// Substring blocklist carried over from the original backend. Trivially
/// bypassable by construction; it only guards against accidents, not intent.
const DANGEROUS_COMMANDS: &[&str] = &[
    "rm -rf /", "del /f /q", "format", "mkfs", "dd if=", "shred", "rmdir /s", "deltree", "fdisk",
    "parted", "wipefs",
];

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Command timed out after {0} seconds")]
    Timeout(u64),
    #[error("Dangerous command blocked for security")]
    Blocked,
    #[error("Command failed: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ExecError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecError::Timeout(_) => "timeout",
            ExecError::Blocked => "security_block",
            ExecError::Spawn(_) => "execution_error",
        }
    }
}

/// Host platform, detected once at startup; picks the shell and the
/// terminal-window strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Name on the wire, matching Python's platform.system().lower().
    pub fn name(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "darwin",
            Platform::Linux => "linux",
        }
    }

    pub fn shell(self) -> &'static str {
        match self {
            Platform::Windows => "cmd",
            Platform::MacOs | Platform::Linux => "bash",
        }
    }

    /// Argv running `command` inside the platform shell with output captured.
    fn shell_invocation(self, command: &str) -> Vec<String> {
        match self {
            Platform::Windows => vec!["cmd".into(), "/c".into(), command.into()],
            Platform::MacOs | Platform::Linux => {
                vec!["bash".into(), "-c".into(), command.into()]
            }
        }
    }

    /// Argv opening a visible terminal window that runs `command` and waits
    /// for a keypress before closing. cmd has no single-quote syntax, so the
    /// Windows echo lines stay unquoted.
    pub fn terminal_invocation(self, command: &str) -> Vec<String> {
        match self {
            Platform::Windows => vec![
                "cmd".into(),
                "/c".into(),
                "start".into(),
                "cmd".into(),
                "/k".into(),
                format!(
                    "echo Executing: {command} && {command} && echo. && echo Command completed! && pause"
                ),
            ],
            Platform::MacOs => {
                let osa = format!(
                    "tell application \"Terminal\"\n  activate\n  do script \"echo 'Executing: {command}' && {command} && echo && echo 'Command completed! Press any key to close...' && read -n 1\"\nend tell"
                );
                vec!["osascript".into(), "-e".into(), osa]
            }
            Platform::Linux => vec![
                "gnome-terminal".into(),
                "--".into(),
                "bash".into(),
                "-c".into(),
                format!(
                    "echo 'Executing: {command}' && {command} && echo && echo 'Command completed! Press Enter to close...' && read"
                ),
            ],
        }
    }
}

pub struct CommandExecutor {
    platform: Platform,
    terminal_open_timeout: Duration,
    terminal_program: Option<String>,
    history: Mutex<Vec<ExecutionRecord>>,
}

impl CommandExecutor {
    pub fn new(platform: Platform, terminal_open_timeout: Duration) -> Self {
        Self {
            platform,
            terminal_open_timeout,
            terminal_program: None,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the platform-default terminal emulator binary (deployments
    /// without gnome-terminal point this at their emulator of choice).
    pub fn with_terminal_program(mut self, program: impl Into<String>) -> Self {
        self.terminal_program = Some(program.into());
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Rejects commands matching the blocklist.
    pub fn check_blocked(&self, command: &str) -> Result<(), ExecError> {
        let lowered = command.to_lowercase();
        if DANGEROUS_COMMANDS.iter().any(|d| lowered.contains(d)) {
            return Err(ExecError::Blocked);
        }
        Ok(())
    }

    /// Runs `command` in the platform shell with output captured, bounded by
    /// `timeout`. Failures are folded into the record, never propagated.
    pub async fn run_background(&self, command: &str, timeout: Duration) -> ExecutionRecord {
        tracing::info!(command, "Executing command in background");
        let record = match self
            .run_captured(self.platform.shell_invocation(command), timeout)
            .await
        {
            Ok(output) => {
                let returncode = output.status.code().unwrap_or(-1);
                if returncode == 0 {
                    tracing::info!(command, "Command executed successfully");
                } else {
                    tracing::warn!(command, returncode, "Command failed");
                }
                ExecutionRecord {
                    success: true,
                    command: command.into(),
                    method: Some(ExecMethod::Background),
                    returncode: Some(returncode),
                    stdout: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                    stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
                    error: None,
                    error_type: None,
                    platform: self.platform.name().into(),
                    shell: Some(self.platform.shell().into()),
                    execution_time: Some(unix_time_secs()),
                }
            }
            Err(e) => {
                tracing::error!(command, error = %e, "Command execution error");
                self.error_record(command, &e)
            }
        };
        self.push_history(record.clone());
        record
    }

    /// Opens a visible terminal window for `command`; falls back to background
    /// execution when the terminal cannot be opened.
    pub async fn run_in_terminal(&self, command: &str, timeout: Duration) -> ExecutionRecord {
        tracing::info!(command, "Opening terminal for command");
        let argv = self.terminal_argv(command);
        match self.run_captured(argv, self.terminal_open_timeout).await {
            Ok(output) => {
                tracing::info!(command, "Terminal opened successfully");
                let record = ExecutionRecord {
                    success: true,
                    command: command.into(),
                    method: Some(ExecMethod::VisibleTerminal),
                    returncode: output.status.code(),
                    stdout: Some("Terminal opened successfully".into()),
                    stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
                    error: None,
                    error_type: None,
                    platform: self.platform.name().into(),
                    shell: None,
                    execution_time: Some(unix_time_secs()),
                };
                self.push_history(record.clone());
                record
            }
            Err(e) => {
                tracing::warn!(command, error = %e, "Failed to open terminal, falling back to background execution");
                self.run_background(command, timeout).await
            }
        }
    }

    /// Opens one terminal window running all commands in sequence. On Windows
    /// the sequence goes through a temporary batch script.
    pub async fn run_terminal_batch(&self, commands: &[String]) -> Result<(), ExecError> {
        tracing::info!(count = commands.len(), "Opening terminal for command batch");
        let mut argv = match self.platform {
            Platform::Windows => {
                let mut script = String::from("@echo off\r\n");
                for cmd in commands {
                    script.push_str(&format!("echo Executing: {cmd}\r\n{cmd}\r\necho.\r\n"));
                }
                script.push_str("echo All commands completed!\r\npause\r\n");
                let mut file = tempfile::Builder::new()
                    .suffix(".bat")
                    .tempfile()
                    .map_err(ExecError::Spawn)?;
                std::io::Write::write_all(&mut file, script.as_bytes())
                    .map_err(ExecError::Spawn)?;
                let (_, path) = file.keep().map_err(|e| ExecError::Spawn(e.error))?;
                vec![
                    "cmd".into(),
                    "/c".into(),
                    "start".into(),
                    "cmd".into(),
                    "/c".into(),
                    path.to_string_lossy().into_owned(),
                ]
            }
            Platform::MacOs | Platform::Linux => {
                let mut lines: Vec<String> = Vec::new();
                for cmd in commands {
                    lines.push(format!("echo 'Executing: {cmd}'"));
                    lines.push(cmd.clone());
                    lines.push("echo".into());
                }
                lines.push("echo 'All commands completed! Press Enter to close...'".into());
                lines.push("read".into());
                let script = lines.join("; ");
                if self.platform == Platform::MacOs {
                    let osa = format!(
                        "tell application \"Terminal\"\n  activate\n  do script \"{script}\"\nend tell"
                    );
                    vec!["osascript".into(), "-e".into(), osa]
                } else {
                    vec!["gnome-terminal".into(), "--".into(), "bash".into(), "-c".into(), script]
                }
            }
        };
        if let Some(program) = &self.terminal_program {
            argv[0] = program.clone();
        }
        self.run_captured(argv, self.terminal_open_timeout).await?;
        Ok(())
    }

    fn terminal_argv(&self, command: &str) -> Vec<String> {
        let mut argv = self.platform.terminal_invocation(command);
        if let Some(program) = &self.terminal_program {
            argv[0] = program.clone();
        }
        argv
    }

    /// Last `limit` records plus the all-time total. A limit of 0 returns
    /// everything, like the original's `history[-limit:]` slice.
    pub fn history(&self, limit: usize) -> (Vec<ExecutionRecord>, usize) {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let total = history.len();
        let start = if limit == 0 {
            0
        } else {
            total.saturating_sub(limit)
        };
        let tail = history[start..].to_vec();
        (tail, total)
    }

    async fn run_captured(&self, argv: Vec<String>, timeout: Duration) -> Result<Output, ExecError> {
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).kill_on_drop(true);
        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ExecError::Timeout(timeout.as_secs())),
        }
    }

    fn error_record(&self, command: &str, e: &ExecError) -> ExecutionRecord {
        ExecutionRecord {
            success: false,
            command: command.into(),
            method: None,
            returncode: None,
            stdout: None,
            stderr: None,
            error: Some(e.to_string()),
            error_type: Some(e.kind().into()),
            platform: self.platform.name().into(),
            shell: None,
            execution_time: None,
        }
    }

    fn push_history(&self, record: ExecutionRecord) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}

pub fn unix_time_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
