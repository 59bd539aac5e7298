use nix::unistd::Pid;

/// Background processes the shell believes are still running, kept in
/// launch order.
///
/// A pid enters on a successful background launch and leaves exactly once:
/// when its exit is observed, or when `quit` terminates it.
#[derive(Debug, Default)]
pub struct JobTable {
    pids: Vec<Pid>,
}

impl JobTable {
    /// Creates a new, empty job table.
    pub fn new() -> Self {
        JobTable { pids: Vec::new() }
    }

    /// Adds a job. Returns false for invalid or already tracked pids.
    pub fn insert(&mut self, pid: Pid) -> bool {
        if pid.as_raw() < 1 || self.contains(pid) {
            return false;
        }
        self.pids.push(pid);
        true
    }

    /// Removes the job with the given pid. Returns false if it was not tracked.
    pub fn remove(&mut self, pid: Pid) -> bool {
        match self.pids.iter().position(|&p| p == pid) {
            Some(index) => {
                self.pids.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Empties the table, returning every tracked pid in launch order.
    pub fn drain(&mut self) -> Vec<Pid> {
        std::mem::take(&mut self.pids)
    }
}
