//! Logical process and thread identity resolution.
//!
//! OS pids and tids are reused over a system's lifetime, so raw numeric ids
//! cannot key trace rows directly. This tracker hands out stable logical
//! identities ([`UniquePid`]/[`UniqueTid`]) keyed by observed process
//! lifetime: once a process is superseded or a thread ends, a later reuse of
//! the same numeric id resolves to a fresh identity.

use std::collections::HashMap;

use crate::interner::StringId;
use crate::trace::{ProcessRecord, ThreadRecord};

/// Stable logical thread identity. Value 0 is the reserved null identity,
/// used when an event carries no thread context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UniqueTid(u32);

impl UniqueTid {
    pub const NULL: UniqueTid = UniqueTid(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Stable logical process identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UniquePid(u32);

impl UniquePid {
    pub const NULL: UniquePid = UniquePid(0);

    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
struct Thread {
    tid: i32,
    upid: Option<UniquePid>,
    name: Option<StringId>,
    alive: bool,
}

#[derive(Debug)]
struct Process {
    pid: i32,
    name: Option<StringId>,
    alive: bool,
}

#[derive(Debug)]
pub struct ProcessTracker {
    threads: Vec<Thread>,
    processes: Vec<Process>,
    // Most recent identity last.
    tids: HashMap<i32, Vec<UniqueTid>>,
    pids: HashMap<i32, Vec<UniquePid>>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        // Index 0 in both tables is the reserved null identity.
        ProcessTracker {
            threads: vec![Thread {
                tid: 0,
                upid: None,
                name: None,
                alive: false,
            }],
            processes: vec![Process {
                pid: 0,
                name: None,
                alive: false,
            }],
            tids: HashMap::new(),
            pids: HashMap::new(),
        }
    }

    /// Resolve `(tid, pid)` to a logical thread, creating one if no live
    /// compatible thread exists. `tid == 0` means "no thread context" and
    /// returns the null identity.
    pub fn update_thread(&mut self, tid: i32, pid: i32) -> UniqueTid {
        if tid == 0 {
            return UniqueTid::NULL;
        }
        if let Some(utid) = self.find_live_thread(tid, pid) {
            // Late pid association for threads first seen without one.
            if self.threads[utid.0 as usize].upid.is_none() {
                let upid = self.get_or_create_process(pid);
                self.threads[utid.0 as usize].upid = Some(upid);
            }
            return utid;
        }
        let upid = self.get_or_create_process(pid);
        self.start_new_thread(tid, Some(upid))
    }

    /// Most recent live process for `pid`, creating one if none exists.
    pub fn get_or_create_process(&mut self, pid: i32) -> UniquePid {
        if let Some(upids) = self.pids.get(&pid) {
            for &upid in upids.iter().rev() {
                if self.processes[upid.0 as usize].alive {
                    return upid;
                }
            }
        }
        self.push_process(pid)
    }

    /// Force a new logical process for `pid`, superseding any live one.
    ///
    /// Threads attached to the superseded process are ended so a reused tid
    /// resolves to a fresh identity afterwards.
    pub fn start_new_process(&mut self, pid: i32) -> UniquePid {
        let stale: Vec<UniquePid> = self
            .pids
            .get(&pid)
            .map(|upids| {
                upids
                    .iter()
                    .copied()
                    .filter(|&u| self.processes[u.0 as usize].alive)
                    .collect()
            })
            .unwrap_or_default();
        for upid in stale {
            self.processes[upid.0 as usize].alive = false;
            for thread in &mut self.threads {
                if thread.upid == Some(upid) {
                    thread.alive = false;
                }
            }
        }
        self.push_process(pid)
    }

    /// Mark the most recent live thread for `tid` as ended.
    pub fn end_thread(&mut self, tid: i32) {
        if let Some(utids) = self.tids.get(&tid) {
            for &utid in utids.iter().rev() {
                if self.threads[utid.0 as usize].alive {
                    self.threads[utid.0 as usize].alive = false;
                    return;
                }
            }
        }
    }

    pub fn set_thread_name(&mut self, utid: UniqueTid, name: StringId) {
        if !utid.is_null() {
            self.threads[utid.0 as usize].name = Some(name);
        }
    }

    pub fn set_process_name(&mut self, upid: UniquePid, name: StringId) {
        if upid != UniquePid::NULL {
            self.processes[upid.0 as usize].name = Some(name);
        }
    }

    /// Export identity rows for storage at session end.
    pub fn into_tables(self) -> (Vec<ProcessRecord>, Vec<ThreadRecord>) {
        let processes = self
            .processes
            .iter()
            .enumerate()
            .map(|(i, p)| ProcessRecord {
                upid: UniquePid(i as u32),
                pid: p.pid,
                name: p.name,
            })
            .collect();
        let threads = self
            .threads
            .iter()
            .enumerate()
            .map(|(i, t)| ThreadRecord {
                utid: UniqueTid(i as u32),
                tid: t.tid,
                upid: t.upid,
                name: t.name,
            })
            .collect();
        (processes, threads)
    }

    fn push_process(&mut self, pid: i32) -> UniquePid {
        let upid = UniquePid(self.processes.len() as u32);
        self.processes.push(Process {
            pid,
            name: None,
            alive: true,
        });
        self.pids.entry(pid).or_default().push(upid);
        upid
    }

    fn find_live_thread(&self, tid: i32, pid: i32) -> Option<UniqueTid> {
        let utids = self.tids.get(&tid)?;
        for &utid in utids.iter().rev() {
            let thread = &self.threads[utid.0 as usize];
            if !thread.alive {
                continue;
            }
            match thread.upid {
                None => return Some(utid),
                Some(upid) => {
                    let process = &self.processes[upid.0 as usize];
                    if process.alive && process.pid == pid {
                        return Some(utid);
                    }
                }
            }
        }
        None
    }

    fn start_new_thread(&mut self, tid: i32, upid: Option<UniquePid>) -> UniqueTid {
        let utid = UniqueTid(self.threads.len() as u32);
        self.threads.push(Thread {
            tid,
            upid,
            name: None,
            alive: true,
        });
        self.tids.entry(tid).or_default().push(utid);
        utid
    }
}

impl Default for ProcessTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tid_zero_is_null_identity() {
        let mut tracker = ProcessTracker::new();
        assert_eq!(tracker.update_thread(0, 1234), UniqueTid::NULL);
    }

    #[test]
    fn test_same_thread_resolves_to_same_utid() {
        let mut tracker = ProcessTracker::new();
        let a = tracker.update_thread(42, 10);
        let b = tracker.update_thread(42, 10);
        assert_eq!(a, b);
        assert!(!a.is_null());
    }

    #[test]
    fn test_same_tid_different_pid_is_new_identity() {
        let mut tracker = ProcessTracker::new();
        let a = tracker.update_thread(42, 10);
        let b = tracker.update_thread(42, 11);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tid_reuse_after_end_is_new_identity() {
        let mut tracker = ProcessTracker::new();
        let a = tracker.update_thread(42, 10);
        tracker.end_thread(42);
        let b = tracker.update_thread(42, 10);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tid_reuse_after_process_restart_is_new_identity() {
        let mut tracker = ProcessTracker::new();
        let a = tracker.update_thread(42, 10);
        // Pid 10 exits and is respawned.
        tracker.start_new_process(10);
        let b = tracker.update_thread(42, 10);
        assert_ne!(a, b);
    }

    #[test]
    fn test_pid_reuse_creates_new_process() {
        let mut tracker = ProcessTracker::new();
        let p1 = tracker.get_or_create_process(10);
        let p2 = tracker.start_new_process(10);
        assert_ne!(p1, p2);
        assert_eq!(tracker.get_or_create_process(10), p2);
    }

    #[test]
    fn test_exported_tables_reserve_null_row() {
        let mut tracker = ProcessTracker::new();
        let utid = tracker.update_thread(42, 10);
        let (processes, threads) = tracker.into_tables();
        assert_eq!(processes[0].upid, UniquePid::NULL);
        assert_eq!(threads[0].utid, UniqueTid::NULL);
        assert_eq!(threads[utid.raw() as usize].tid, 42);
    }
}
