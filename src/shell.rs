use std::io::{self, Write};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use nix::unistd::Pid;

use crate::builtins::lookup;
use crate::config::Config;
use crate::console::{Line, LineSource, Notifier};
use crate::error::ShellError;
use crate::jobs::JobTable;
use crate::parser::parse_line;
use crate::signals::{spawn_job_monitor, ChildExit, Reaper};
use crate::utils;

/// What the read loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The read-parse-dispatch loop and the state the builtins act on.
pub struct Shell {
    pub(crate) config: Config,
    pub(crate) prompt: String,
    pub(crate) input: Box<dyn LineSource>,
    pub(crate) out: Box<dyn Write>,
    pub(crate) err: Box<dyn Write>,
    /// Shared with the job monitor thread.
    pub(crate) jobs: Arc<Mutex<JobTable>>,
    pub(crate) reaper: &'static Reaper,
    /// Route for background exits, drained by the job monitor.
    pub(crate) background: Sender<ChildExit>,
}

impl Shell {
    /// Creates a shell and starts its job monitor, which reports through
    /// `notifier`.
    pub fn new(
        config: Config,
        prompt: String,
        reaper: &'static Reaper,
        input: Box<dyn LineSource>,
        notifier: Box<dyn Notifier>,
        out: Box<dyn Write>,
        err: Box<dyn Write>,
    ) -> Result<Self, ShellError> {
        let jobs = Arc::new(Mutex::new(JobTable::new()));
        let (background, events) = mpsc::channel();
        spawn_job_monitor(Arc::clone(&jobs), events, notifier)?;
        Ok(Shell {
            config,
            prompt,
            input,
            out,
            err,
            jobs,
            reaper,
            background,
        })
    }

    /// Pids of the background jobs still believed to be running.
    pub fn running_jobs(&self) -> Vec<Pid> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pids()
            .to_vec()
    }

    /// Runs until end of input or a confirmed `quit`.
    pub fn run(&mut self) -> Result<(), ShellError> {
        loop {
            let prompt = if self.config.emit_prompt {
                self.prompt.clone()
            } else {
                String::new()
            };
            let flow = match self.input.read_line(&prompt)? {
                Line::Eof => {
                    writeln!(self.out)?;
                    break;
                }
                Line::TooLong => Err(ShellError::InputTooLong),
                Line::Text(line) => self.eval(&line),
            };
            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => self.report(&err)?,
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Parses one line, validates it against the builtin table and runs it.
    pub fn eval(&mut self, line: &str) -> Result<Flow, ShellError> {
        let Some(invocation) = parse_line(line)? else {
            return Ok(Flow::Continue);
        };
        log::debug!("parsed {:?}", invocation);
        let builtin = lookup(&invocation.name)
            .ok_or_else(|| ShellError::UnknownCommand(invocation.name.clone()))?;
        builtin.validate(&invocation)?;
        (builtin.handler)(self, &invocation)
    }

    fn report(&mut self, err: &ShellError) -> io::Result<()> {
        let line = utils::paint_error(&format!("imcsh: {}", err), self.config.color);
        writeln!(self.err, "{}", line)?;
        self.err.flush()
    }
}
