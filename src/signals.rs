use std::collections::HashMap;
use std::fmt;
use std::io;
use std::process::Command;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use once_cell::sync::OnceCell;
use signal_hook::consts::signal::SIGCHLD;
use signal_hook::iterator::Signals;

use crate::console::Notifier;
use crate::error::ShellError;
use crate::jobs::JobTable;

static REAPER: OnceCell<Reaper> = OnceCell::new();

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    Signaled(i32),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exited(code) => write!(f, "terminated with exit status {}", code),
            Termination::Signaled(signo) => write!(f, "terminated due to signal {}", signo),
        }
    }
}

/// A reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub pid: Pid,
    pub termination: Termination,
}

impl ChildExit {
    fn from_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(pid, code) => Some(ChildExit {
                pid,
                termination: Termination::Exited(code),
            }),
            WaitStatus::Signaled(pid, signal, _) => Some(ChildExit {
                pid,
                termination: Termination::Signaled(signal as i32),
            }),
            _ => None,
        }
    }
}

/// Who gets told about each child's exit.
#[derive(Default)]
struct Routes {
    waiting: HashMap<Pid, Sender<ChildExit>>,
    unclaimed: HashMap<Pid, ChildExit>,
}

impl Routes {
    fn dispatch(&mut self, exit: ChildExit) {
        match self.waiting.remove(&exit.pid) {
            Some(route) => {
                log::debug!("reaped {} ({:?}), routing", exit.pid, exit.termination);
                if route.send(exit).is_err() {
                    log::debug!("nobody listening for {}", exit.pid);
                }
            }
            None => {
                log::debug!("reaped untracked child {}", exit.pid);
                self.unclaimed.insert(exit.pid, exit);
            }
        }
    }

    fn claim(&mut self, pid: Pid, route: Sender<ChildExit>) {
        match self.unclaimed.remove(&pid) {
            Some(exit) => {
                let _ = route.send(exit);
            }
            None => {
                self.waiting.insert(pid, route);
            }
        }
    }
}

/// Collects the exit status of every child of this process.
///
/// A single thread waits for SIGCHLD and, on every delivery, drains all
/// terminated children without blocking. Each exit is forwarded to the
/// channel that was registered for its pid when the child was spawned, so
/// no other code in the process ever calls `waitpid`.
pub struct Reaper {
    routes: Arc<Mutex<Routes>>,
}

impl Reaper {
    /// Installs the SIGCHLD watcher on first call and returns the shared
    /// instance afterwards.
    pub fn install() -> Result<&'static Reaper, ShellError> {
        REAPER.get_or_try_init(|| {
            let mut signals = Signals::new([SIGCHLD]).map_err(ShellError::SignalSetup)?;
            let routes = Arc::new(Mutex::new(Routes::default()));
            let watched = Arc::clone(&routes);
            thread::Builder::new()
                .name("reaper".into())
                .spawn(move || {
                    for _ in signals.forever() {
                        drain(&watched);
                    }
                })
                .map_err(ShellError::SignalSetup)?;
            Ok(Reaper { routes })
        })
    }

    /// Spawns `command` and routes its exit to `route`.
    ///
    /// The route table stays locked until the pid is registered, so an exit
    /// reaped in between is parked and handed over here.
    pub fn spawn(&self, command: &mut Command, route: Sender<ChildExit>) -> io::Result<Pid> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let child = command.spawn()?;
        let pid = Pid::from_raw(child.id() as i32);
        log::debug!("spawned {:?} as {}", command.get_program(), pid);
        routes.claim(pid, route);
        Ok(pid)
    }
}

fn drain(routes: &Mutex<Routes>) {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if let Some(exit) = ChildExit::from_status(status) {
                    routes
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .dispatch(exit);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(err) => {
                log::warn!("waitpid: {}", err);
                break;
            }
        }
    }
}

/// Starts the thread that retires background jobs.
///
/// Every exit arriving on `events` is removed from `jobs` and reported
/// through `notifier`. The thread ends once every sender is gone.
pub fn spawn_job_monitor(
    jobs: Arc<Mutex<JobTable>>,
    events: Receiver<ChildExit>,
    mut notifier: Box<dyn Notifier>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("job-monitor".into())
        .spawn(move || {
            for exit in events {
                let tracked = jobs
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(exit.pid);
                if !tracked {
                    log::debug!("background exit for {} was not in the job table", exit.pid);
                }
                notifier.notify(&format!(
                    "Background process {} {}",
                    exit.pid, exit.termination
                ));
            }
        })
}
