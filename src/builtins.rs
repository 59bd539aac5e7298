use std::io::Write;
use std::path::Path;
use std::sync::PoisonError;

use nix::sys::signal::{kill, Signal};

use crate::console::Line;
use crate::error::ShellError;
use crate::exec::{execute_program, open_output};
use crate::parser::Invocation;
use crate::shell::{Flow, Shell};
use crate::utils::VERSION_LINE;

pub type Handler = fn(&mut Shell, &Invocation) -> Result<Flow, ShellError>;

/// A command implemented by the shell, with what it allows.
pub struct Builtin {
    pub name: &'static str,
    pub summary: &'static str,
    pub handler: Handler,
    pub expects_args: bool,
    pub supports_background: bool,
    pub supports_output: bool,
}

/// Every command the shell understands, in lookup order.
pub static BUILTINS: &[Builtin] = &[
    Builtin {
        name: "globalusage",
        summary: "Display basic information about the shell",
        handler: globalusage,
        expects_args: false,
        supports_background: false,
        supports_output: true,
    },
    Builtin {
        name: "help",
        summary: "Show this help message",
        handler: help,
        expects_args: false,
        supports_background: false,
        supports_output: true,
    },
    Builtin {
        name: "echo",
        summary: "Echos the user's input",
        handler: echo,
        expects_args: true,
        supports_background: false,
        supports_output: true,
    },
    Builtin {
        name: "quit",
        summary: "Quit the shell",
        handler: quit,
        expects_args: false,
        supports_background: false,
        supports_output: false,
    },
    Builtin {
        name: "exec",
        summary: "Execute a program like a regular shell would do",
        handler: execute_program,
        expects_args: true,
        supports_background: true,
        supports_output: true,
    },
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

impl Builtin {
    /// Checks an invocation against this command's capabilities. The first
    /// violation wins, in the order: arguments, background, redirection.
    pub fn validate(&self, invocation: &Invocation) -> Result<(), ShellError> {
        let has_args = invocation.args().is_some();
        if self.expects_args && !has_args {
            return Err(ShellError::MissingArguments(self.name));
        }
        if !self.expects_args && has_args {
            return Err(ShellError::UnexpectedArguments(self.name));
        }
        if invocation.background && !self.supports_background {
            return Err(ShellError::BackgroundUnsupported(self.name));
        }
        if invocation.output.is_some() && !self.supports_output {
            return Err(ShellError::RedirectUnsupported(self.name));
        }
        Ok(())
    }
}

/// Sends builtin output to the redirection target, appending, or to the
/// terminal.
fn emit(shell: &mut Shell, output: Option<&Path>, text: &str) -> Result<Flow, ShellError> {
    match output {
        Some(path) => {
            let mut file = open_output(path)?;
            file.write_all(text.as_bytes())
                .map_err(|source| ShellError::OpenOutput {
                    path: path.to_path_buf(),
                    source,
                })?;
            writeln!(shell.out, "Output redirected to -> {}", path.display())?;
        }
        None => shell.out.write_all(text.as_bytes())?,
    }
    Ok(Flow::Continue)
}

fn help(shell: &mut Shell, invocation: &Invocation) -> Result<Flow, ShellError> {
    let mut text = String::from("Available commands:\n");
    for builtin in BUILTINS {
        text.push_str(&format!("  {:<11} - {}\n", builtin.name, builtin.summary));
    }
    emit(shell, invocation.output.as_deref(), &text)
}

fn globalusage(shell: &mut Shell, invocation: &Invocation) -> Result<Flow, ShellError> {
    emit(shell, invocation.output.as_deref(), &format!("{}\n", VERSION_LINE))
}

fn echo(shell: &mut Shell, invocation: &Invocation) -> Result<Flow, ShellError> {
    let text = format!("{}\n", invocation.args().unwrap_or_default());
    emit(shell, invocation.output.as_deref(), &text)
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Asks for confirmation, then kills every remaining background job and
/// ends the read loop. Declining leaves everything running.
fn quit(shell: &mut Shell, _invocation: &Invocation) -> Result<Flow, ShellError> {
    let running = shell.running_jobs();
    if !running.is_empty() {
        writeln!(shell.out, "The following processes are running:")?;
        for pid in &running {
            writeln!(shell.out, "    -> pid: {}", pid)?;
        }
    }
    shell.out.flush()?;

    loop {
        match shell.input.read_line("Are you sure you want to quit? [Y/n]: ")? {
            Line::Text(answer) => match parse_answer(&answer) {
                Some(true) => break,
                Some(false) => return Ok(Flow::Continue),
                None => {}
            },
            Line::TooLong => {}
            // Nothing left to ask.
            Line::Eof => break,
        }
        writeln!(shell.out, "Invalid input. Please enter 'Y' or 'n'.\n")?;
        shell.out.flush()?;
    }

    let doomed = shell
        .jobs
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .drain();
    for pid in doomed {
        writeln!(shell.out, "Killing process with pid: {}...", pid)?;
        if let Err(err) = kill(pid, Signal::SIGKILL) {
            log::warn!("kill {}: {}", pid, err);
        }
    }
    writeln!(shell.out, "Quitting shell...")?;
    Ok(Flow::Exit)
}
