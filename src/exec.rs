use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{mpsc, PoisonError};

use crate::error::ShellError;
use crate::parser::{tokenize, Invocation};
use crate::shell::{Flow, Shell};

/// Opens a redirection target for appending, creating it with mode 0644.
pub fn open_output(path: &Path) -> Result<File, ShellError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o644)
        .open(path)
        .map_err(|source| ShellError::OpenOutput {
            path: path.to_path_buf(),
            source,
        })
}

/// Resolves a program name the way `execvp` does: names containing a slash
/// are used as given, anything else is looked up in `$PATH`.
pub fn resolve_program(name: &str) -> io::Result<PathBuf> {
    which::which(name).map_err(|err| {
        log::debug!("cannot resolve {}: {}", name, err);
        if name.contains('/') && Path::new(name).exists() {
            io::Error::from(io::ErrorKind::PermissionDenied)
        } else {
            io::Error::from(io::ErrorKind::NotFound)
        }
    })
}

/// Builds the child process for an argument vector, with stdout sent to
/// `output` when given. The file handle moves into the child's stdout and
/// is close-on-exec everywhere else.
fn build_command(argv: &[String], output: Option<&Path>) -> Result<Command, ShellError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ShellError::MissingArguments("exec"));
    };
    let resolved = resolve_program(program).map_err(|source| ShellError::Launch {
        program: program.clone(),
        source,
    })?;

    let mut command = Command::new(resolved);
    command.arg0(program).args(args);
    if let Some(path) = output {
        command.stdout(Stdio::from(open_output(path)?));
    }
    Ok(command)
}

/// The `exec` builtin.
///
/// In the foreground the shell blocks until this very child has been
/// reaped. In the background the pid goes into the job table before the
/// job table lock is released, so the job monitor cannot see the exit
/// first.
pub fn execute_program(shell: &mut Shell, invocation: &Invocation) -> Result<Flow, ShellError> {
    let argv = tokenize(invocation.args().unwrap_or_default());
    let mut command = build_command(&argv, invocation.output.as_deref())?;
    let launch_error = |source: io::Error| ShellError::Launch {
        program: argv[0].clone(),
        source,
    };

    if invocation.background {
        let pid = {
            let mut jobs = shell.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            let pid = shell
                .reaper
                .spawn(&mut command, shell.background.clone())
                .map_err(launch_error)?;
            jobs.insert(pid);
            pid
        };
        writeln!(shell.out, "Started process with PID {}", pid)?;
        return Ok(Flow::Continue);
    }

    // Anything still buffered would land after the child's output.
    shell.out.flush()?;
    let (route, exited) = mpsc::channel();
    let pid = shell
        .reaper
        .spawn(&mut command, route)
        .map_err(launch_error)?;
    let exit = exited
        .recv()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "reaper stopped"))?;
    writeln!(shell.out, "Process {} {}", pid, exit.termination)?;
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_resolve_from_path() {
        let path = resolve_program("sh").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("sh"));
    }

    #[test]
    fn test_resolve_explicit_path() {
        let path = resolve_program("/bin/sh").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("sh"));
    }

    #[test]
    fn test_resolve_missing() {
        let err = resolve_program("imcsh-no-such-program").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let err = resolve_program("./imcsh-no-such-program").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_resolve_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, "plain").unwrap();
        let err = resolve_program(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_open_output_appends_with_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        open_output(&path).unwrap().write_all(b"one\n").unwrap();
        open_output(&path).unwrap().write_all(b"two\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !0o644, 0);
    }

    #[test]
    fn test_open_output_failure() {
        let err = open_output(Path::new("/nonexistent-dir/out.txt")).unwrap_err();
        assert!(matches!(err, ShellError::OpenOutput { .. }));
    }

    #[test]
    fn test_build_command_requires_program() {
        assert!(matches!(
            build_command(&[], None),
            Err(ShellError::MissingArguments("exec"))
        ));
    }
}
