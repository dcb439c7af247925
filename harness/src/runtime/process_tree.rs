//! Process tree inspection and signalling
//!
//! Services run in their own process group, so `killpg` reaches every
//! process they leave behind, even after the root shell is gone. Descendants
//! that moved to another group are discovered through `sysinfo`. Full
//! process-table scans run on the blocking pool. An already-gone process or
//! group (ESRCH) is never an error. Anything else, such as EPERM, is reported
//! as `StopError::ProcessGone`.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::{self, Pid as NixPid};
use sysinfo::{Pid, ProcessStatus, System};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::error::StopError;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshot-based view of the host's process table
pub struct ProcessTree {
    system: System,
}

impl ProcessTree {
    pub fn new() -> Self {
        Self { system: System::new() }
    }

    /// Rescan the whole process table off the async runtime
    async fn refresh(&mut self) {
        let mut system = std::mem::replace(&mut self.system, System::new());
        self.system = match tokio::task::spawn_blocking(move || {
            system.refresh_processes();
            system
        })
        .await
        {
            Ok(system) => system,
            Err(e) => {
                warn!("⚠️ Process table scan failed: {}", e);
                System::new()
            }
        };
    }

    /// All processes spawned by `root`, directly or transitively, deepest first.
    /// `root` itself is not included.
    pub async fn descendants(&mut self, root: u32) -> Vec<u32> {
        self.refresh().await;
        collect_descendants(&self.system, root)
    }

    /// Live (non-zombie) members of process group `pgid`
    pub async fn group_members(&mut self, pgid: u32) -> Vec<u32> {
        self.refresh().await;
        self.system
            .processes()
            .iter()
            .filter(|(_, process)| process.status() != ProcessStatus::Zombie)
            .map(|(pid, _)| pid.as_u32())
            .filter(|&pid| group_of(pid) == Some(pgid))
            .collect()
    }

    /// Whether `pid` is alive. Zombies awaiting reaping count as exited.
    pub fn is_alive(&mut self, pid: u32) -> Result<bool, StopError> {
        if !process_exists(pid)? {
            return Ok(false);
        }

        let sys_pid = Pid::from_u32(pid);
        if !self.system.refresh_process(sys_pid) {
            return Ok(false);
        }

        Ok(self
            .system
            .process(sys_pid)
            .map(|process| process.status() != ProcessStatus::Zombie)
            .unwrap_or(false))
    }

    /// Poll until every pid has exited or `grace` elapses; returns the survivors
    pub async fn wait_for_exit(&mut self, pids: &[u32], grace: Duration) -> Result<Vec<u32>, StopError> {
        let deadline = Instant::now() + grace;

        loop {
            let mut alive = Vec::new();
            for &pid in pids {
                if self.is_alive(pid)? {
                    alive.push(pid);
                }
            }

            if alive.is_empty() || Instant::now() >= deadline {
                return Ok(alive);
            }

            sleep(EXIT_POLL_INTERVAL).await;
        }
    }
}

impl Default for ProcessTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Descendants of `root` in a blocking scan, for callers that cannot await
pub fn descendants_blocking(root: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes();
    collect_descendants(&system, root)
}

fn collect_descendants(system: &System, root: u32) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent.as_u32()).or_default().push(pid.as_u32());
        }
    }

    let mut ordered = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(pid) = queue.pop_front() {
        if let Some(kids) = children.get(&pid) {
            for &kid in kids {
                if kid != root && !ordered.contains(&kid) {
                    ordered.push(kid);
                    queue.push_back(kid);
                }
            }
        }
    }

    ordered.reverse();
    ordered
}

fn group_of(pid: u32) -> Option<u32> {
    let raw = i32::try_from(pid).ok()?;
    unistd::getpgid(Some(NixPid::from_raw(raw)))
        .ok()
        .and_then(|pgid| u32::try_from(pgid.as_raw()).ok())
}

fn raw_pid(pid: u32) -> Result<NixPid, StopError> {
    i32::try_from(pid)
        .map(NixPid::from_raw)
        .map_err(|_| StopError::ProcessGone {
            pid,
            reason: "pid out of range".to_string(),
        })
}

/// Send `signal` to `pid`. `Ok(false)` means the process was already gone.
pub fn send_signal(pid: u32, signal: Signal) -> Result<bool, StopError> {
    match signal::kill(raw_pid(pid)?, signal) {
        Ok(()) => {
            debug!("📤 Sent {:?} to process {}", signal, pid);
            Ok(true)
        }
        Err(Errno::ESRCH) => {
            debug!("✅ Process {} already gone", pid);
            Ok(false)
        }
        Err(e) => Err(StopError::ProcessGone {
            pid,
            reason: format!("failed to send {signal:?}: {e}"),
        }),
    }
}

/// Send `signal` to every process in group `pgid`. `Ok(false)` means the group is empty.
pub fn signal_group(pgid: u32, signal: Signal) -> Result<bool, StopError> {
    match signal::killpg(raw_pid(pgid)?, signal) {
        Ok(()) => {
            debug!("📤 Sent {:?} to process group {}", signal, pgid);
            Ok(true)
        }
        Err(Errno::ESRCH) => {
            debug!("✅ Process group {} already empty", pgid);
            Ok(false)
        }
        Err(e) => Err(StopError::ProcessGone {
            pid: pgid,
            reason: format!("failed to send {signal:?} to group: {e}"),
        }),
    }
}

/// Check if a process exists (zombies included)
pub fn process_exists(pid: u32) -> Result<bool, StopError> {
    match signal::kill(raw_pid(pid)?, None) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => Err(StopError::ProcessGone {
            pid,
            reason: format!("error checking if process exists: {e}"),
        }),
    }
}
