//! OS process creation for resolved commands.
//!
//! [`Launcher`] is the seam between the dispatcher and the platform. The
//! system implementation spawns real processes and reaps them on a monitor
//! thread that publishes exit information; tests substitute a recorder.

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};

use crate::config::Config;
use crate::error::RunnerError;
use crate::events::{EventBus, RunnerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Start the program itself, no shell in between.
    Detached,
    /// Open a terminal window that runs the command and waits for a key.
    Terminal,
    /// Run the command with elevated privileges.
    Elevated,
    /// Hand the whole line to the platform shell, no window.
    Shell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub mode: LaunchMode,
    pub command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Launched {
    pub pid: Option<u32>,
}

pub trait Launcher: Send + Sync {
    /// Creates the process. Returns once it exists; never waits for it to exit.
    fn launch(&self, request: &LaunchRequest) -> Result<Launched, RunnerError>;
}

/// Launches through the host operating system.
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    terminal: String,
    elevation: String,
    events: Arc<EventBus>,
}

impl SystemLauncher {
    pub fn new(config: &Config, events: Arc<EventBus>) -> Self {
        Self {
            terminal: config.terminal.clone(),
            elevation: config.elevation.clone(),
            events,
        }
    }

    fn build(&self, request: &LaunchRequest) -> Result<Command, RunnerError> {
        match request.mode {
            LaunchMode::Detached => {
                let mut parts = split_command(&request.command)
                    .ok_or_else(|| {
                        RunnerError::launch_failure(&request.command, "unbalanced quotes")
                    })?
                    .into_iter();
                let program = parts.next().ok_or_else(|| {
                    RunnerError::launch_failure(&request.command, "no program to run")
                })?;
                let mut cmd = Command::new(program);
                cmd.args(parts);
                Ok(cmd)
            }
            LaunchMode::Terminal => Ok(platform::terminal_command(
                &self.terminal,
                &request.command,
            )),
            LaunchMode::Elevated => Ok(platform::elevated_command(
                &self.elevation,
                &request.command,
            )),
            LaunchMode::Shell => Ok(platform::shell_command(&request.command)),
        }
    }

    fn monitor(&self, command: String, mut child: Child) {
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("srunner-monitor".to_string())
            .spawn(move || match child.wait() {
                Ok(status) => {
                    debug!("'{}' exited with {}", command, status);
                    events.publish(RunnerEvent::ExecutionFinished {
                        command,
                        exit_code: status.code(),
                    });
                }
                Err(e) => {
                    warn!("Lost track of '{}': {}", command, e);
                    events.publish(RunnerEvent::ExecutionError {
                        command,
                        message: e.to_string(),
                    });
                }
            });

        if let Err(e) = spawned {
            warn!("Could not start process monitor: {}", e);
        }
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<Launched, RunnerError> {
        let mut cmd = self.build(request)?;
        cmd.stdin(Stdio::null());
        platform::detach(&mut cmd, request.mode);

        self.events.publish(RunnerEvent::ExecutionStarted {
            command: request.command.clone(),
        });

        match cmd.spawn() {
            Ok(child) => {
                let pid = child.id();
                info!("Started '{}' ({:?}) with pid {}", request.command, request.mode, pid);
                self.monitor(request.command.clone(), child);
                Ok(Launched { pid: Some(pid) })
            }
            Err(e) => {
                self.events.publish(RunnerEvent::ExecutionError {
                    command: request.command.clone(),
                    message: e.to_string(),
                });
                Err(RunnerError::launch_failure(&request.command, e))
            }
        }
    }
}

/// Splits a command line into program and arguments.
#[cfg(not(windows))]
pub fn split_command(command: &str) -> Option<Vec<String>> {
    shlex::split(command)
}

/// Splits a command line into program and arguments. Double quotes group
/// words; backslashes are literal so Windows paths survive.
#[cfg(windows)]
pub fn split_command(command: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in command.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            ' ' | '\t' if !in_quotes => {
                if has_token {
                    parts.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            _ => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return None;
    }
    if has_token {
        parts.push(current);
    }
    Some(parts)
}

#[cfg(windows)]
mod platform {
    use super::LaunchMode;
    use std::os::windows::process::CommandExt;
    use std::process::Command;

    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    pub fn terminal_command(_terminal: &str, command: &str) -> Command {
        let mut cmd = Command::new("cmd.exe");
        cmd.raw_arg(format!("/K {} & pause & exit", command));
        cmd
    }

    pub fn elevated_command(_elevation: &str, command: &str) -> Command {
        let escaped = command.replace('\'', "''");
        let mut cmd = Command::new("powershell.exe");
        cmd.args([
            "-NoProfile",
            "-Command",
            &format!(
                "Start-Process -Verb RunAs -FilePath cmd.exe -ArgumentList '/c {}'",
                escaped
            ),
        ]);
        cmd
    }

    pub fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("cmd.exe");
        cmd.raw_arg(format!("/c {}", command));
        cmd
    }

    /// The terminal gets its own console so it outlives the caller's.
    pub fn detach(cmd: &mut Command, mode: LaunchMode) {
        match mode {
            LaunchMode::Terminal => {
                cmd.creation_flags(CREATE_NEW_CONSOLE);
            }
            LaunchMode::Elevated | LaunchMode::Shell => {
                cmd.creation_flags(CREATE_NO_WINDOW);
            }
            LaunchMode::Detached => {}
        }
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::LaunchMode;
    use std::process::Command;

    fn applescript_string(text: &str) -> String {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    }

    pub fn terminal_command(_terminal: &str, command: &str) -> Command {
        let script = format!(
            "{}; read -n 1 -s -r -p 'Press any key to close'; exit",
            command
        );
        let mut cmd = Command::new("osascript");
        cmd.args([
            "-e",
            &format!(
                "tell application \"Terminal\" to do script {}",
                applescript_string(&script)
            ),
            "-e",
            "tell application \"Terminal\" to activate",
        ]);
        cmd
    }

    pub fn elevated_command(_elevation: &str, command: &str) -> Command {
        let mut cmd = Command::new("osascript");
        cmd.args([
            "-e",
            &format!(
                "do shell script {} with administrator privileges",
                applescript_string(command)
            ),
        ]);
        cmd
    }

    pub fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }

    pub fn detach(_cmd: &mut Command, _mode: LaunchMode) {}
}

#[cfg(all(unix, not(target_os = "macos")))]
mod platform {
    use super::LaunchMode;
    use std::process::Command;

    pub fn terminal_command(terminal: &str, command: &str) -> Command {
        let script = format!(
            "{}; printf '\\nPress Enter to close...'; read -r _",
            command
        );
        let mut cmd = Command::new(terminal);
        cmd.args(["-e", "sh", "-c", &script]);
        cmd
    }

    pub fn elevated_command(elevation: &str, command: &str) -> Command {
        let mut cmd = Command::new(elevation);
        cmd.args(["sh", "-c", command]);
        cmd
    }

    pub fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }

    pub fn detach(_cmd: &mut Command, _mode: LaunchMode) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn test_split_command_honours_quotes() {
        assert_eq!(
            split_command("grep foo \"a b.txt\"").unwrap(),
            vec!["grep", "foo", "a b.txt"]
        );
        assert_eq!(split_command("echo \"\"").unwrap(), vec!["echo", ""]);
        assert!(split_command("echo \"open").is_none());
    }

    #[cfg(windows)]
    #[test]
    fn test_split_command_keeps_backslashes() {
        assert_eq!(
            split_command(r#""C:\Program Files\app.exe" C:\a.txt"#).unwrap(),
            vec![r"C:\Program Files\app.exe", r"C:\a.txt"]
        );
        assert_eq!(split_command("echo \"\"").unwrap(), vec!["echo", ""]);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_launcher_reports_exit() {
        use crate::events::Topic;
        use std::sync::mpsc;
        use std::time::Duration;

        let events = Arc::new(EventBus::new());
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        events.subscribe(Topic::Process, move |event| {
            if let RunnerEvent::ExecutionFinished { exit_code, .. } = event {
                let _ = tx.lock().unwrap().send(*exit_code);
            }
        });

        let launcher = SystemLauncher::new(&Config::default(), events);
        let launched = launcher
            .launch(&LaunchRequest {
                mode: LaunchMode::Detached,
                command: "true".to_string(),
            })
            .unwrap();

        assert!(launched.pid.is_some());
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), Some(0));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn program_and_args(cmd: &Command) -> (String, Vec<String>) {
        (
            cmd.get_program().to_string_lossy().into_owned(),
            cmd.get_args()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
        )
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn test_terminal_command_waits_for_enter() {
        let (program, args) = program_and_args(&platform::terminal_command("xterm", "htop"));
        assert_eq!(program, "xterm");
        assert_eq!(
            args,
            vec![
                "-e",
                "sh",
                "-c",
                "htop; printf '\\nPress Enter to close...'; read -r _",
            ]
        );
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn test_elevated_command_goes_through_elevation_tool() {
        let (program, args) =
            program_and_args(&platform::elevated_command("pkexec", "gedit /etc/hosts"));
        assert_eq!(program, "pkexec");
        assert_eq!(args, vec!["sh", "-c", "gedit /etc/hosts"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_command_uses_sh() {
        let cmd = platform::shell_command("echo hi | wc -c");
        assert_eq!(cmd.get_program(), "sh");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["-c", "echo hi | wc -c"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_mode_runs_pipelines() {
        use crate::events::Topic;
        use std::sync::mpsc;
        use std::time::Duration;

        let events = Arc::new(EventBus::new());
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        events.subscribe(Topic::Process, move |event| {
            if let RunnerEvent::ExecutionFinished { exit_code, .. } = event {
                let _ = tx.lock().unwrap().send(*exit_code);
            }
        });

        let launcher = SystemLauncher::new(&Config::default(), events);
        launcher
            .launch(&LaunchRequest {
                mode: LaunchMode::Shell,
                command: "true | exit 3".to_string(),
            })
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_program_is_launch_failure() {
        let launcher = SystemLauncher::new(&Config::default(), Arc::new(EventBus::new()));
        let err = launcher
            .launch(&LaunchRequest {
                mode: LaunchMode::Detached,
                command: "/nonexistent/srunner-test-binary".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, RunnerError::LaunchFailure { .. }));
    }
}
