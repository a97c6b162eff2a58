// src/exec/tree.rs

//! OS process-table helpers: descendant discovery, best-effort tree kill,
//! and resource sampling for a single PID.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// Resident memory and accumulated CPU time of one process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceSample {
    pub memory_bytes: u64,
    pub cpu_time: Duration,
}

/// Kill `root` and every descendant, children before parents.
///
/// Failures are ignored; returns how many processes accepted the signal.
pub fn kill_tree(root: u32) -> usize {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let order = descendants_depth_first(&system, Pid::from_u32(root));
    let mut killed = 0;
    for pid in order.iter().rev() {
        if let Some(process) = system.process(*pid) {
            if process.kill() {
                killed += 1;
            }
        }
    }

    debug!(root, found = order.len(), killed, "process tree kill issued");
    killed
}

/// Environment variable carrying a run's tag into every process it spawns.
pub const RUN_TAG_VAR: &str = "MAPLE2_LAUNCHER_RUN";

/// Kill every process whose environment carries `RUN_TAG_VAR=tag`.
///
/// Catches descendants that were re-parented after their parent exited,
/// which `kill_tree` can no longer reach.
pub fn kill_tagged(tag: &str) -> usize {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_environ(UpdateKind::Always),
    );

    let needle = format!("{RUN_TAG_VAR}={tag}");
    let mut killed = 0;
    for process in system.processes().values() {
        let tagged = process
            .environ()
            .iter()
            .any(|entry| entry.to_str() == Some(needle.as_str()));
        if tagged && process.kill() {
            killed += 1;
        }
    }

    debug!(tag, killed, "tagged process kill issued");
    killed
}

/// Sample memory and CPU time for `pid`; `None` if it no longer exists.
pub fn sample(pid: u32) -> Option<ResourceSample> {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    system.process(pid).map(|process| ResourceSample {
        memory_bytes: process.memory(),
        cpu_time: Duration::from_millis(process.accumulated_cpu_time()),
    })
}

/// `root` followed by its descendants in discovery order.
fn descendants_depth_first(system: &System, root: Pid) -> Vec<Pid> {
    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent).or_default().push(*pid);
        }
    }

    let mut order = Vec::new();
    let mut seen: HashSet<Pid> = HashSet::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        order.push(current);
        if let Some(kids) = children.get(&current) {
            stack.extend(kids.iter().filter(|kid| !seen.contains(*kid)));
        }
    }
    order
}
