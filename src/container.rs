//! The container handle the rest of the engine operates on.

use std::collections::HashMap;

/// Label key used to override the signal `stop` sends before falling back
/// to `SIGTERM`.
pub const STOP_SIGNAL_LABEL: &str = "stop-signal";

/// A running container as observed on the runtime at the moment of a
/// dispatcher tick.
///
/// Built once per tick from runtime inspection; discarded once the tick's
/// executors have returned. The `id` remains meaningful to the runtime
/// client for the lifetime of the actual container, independent of this
/// handle's lifetime in memory.
#[derive(Debug, Clone)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub labels: HashMap<String, String>,
    pub running: bool,
}

impl Container {
    /// Display name with any leading `/` stripped, matching how the
    /// runtime reports container names.
    pub fn display_name(&self) -> &str {
        self.name.trim_start_matches('/')
    }

    /// The signal `stop` should send first: the `stop-signal` label if
    /// present, else `SIGTERM`.
    pub fn stop_signal(&self) -> &str {
        self.labels
            .get(STOP_SIGNAL_LABEL)
            .map(String::as_str)
            .unwrap_or("SIGTERM")
    }
}

/// The POSIX signal names the engine accepts for `kill`/`stop`/`terminate`.
pub const POSIX_SIGNALS: &[&str] = &[
    "SIGHUP", "SIGINT", "SIGQUIT", "SIGILL", "SIGTRAP", "SIGIOT", "SIGBUS", "SIGFPE", "SIGKILL",
    "SIGUSR1", "SIGSEGV", "SIGUSR2", "SIGPIPE", "SIGALRM", "SIGTERM", "SIGSTKFLT", "SIGCHLD",
    "SIGCONT", "SIGSTOP", "SIGTSTP", "SIGTTIN", "SIGTTOU", "SIGURG", "SIGXCPU", "SIGXFSZ",
    "SIGVTALRM", "SIGPROF", "SIGWINCH", "SIGIO", "SIGPWR",
];

pub fn is_recognized_signal(name: &str) -> bool {
    POSIX_SIGNALS.contains(&name)
}
