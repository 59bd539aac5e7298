use std::io;
use std::path::PathBuf;

use rustyline::error::ReadlineError;
use thiserror::Error;

/// Everything the shell can report. The `Display` text is what the user
/// sees after the `imcsh: ` prefix.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("input too long")]
    InputTooLong,

    #[error("No output file specified after '>'")]
    MissingOutputFile,

    #[error("invalid function '{0}'")]
    UnknownCommand(String),

    #[error("'{0}' requires arguments to run")]
    MissingArguments(&'static str),

    #[error("'{0}' does not accept any arguments")]
    UnexpectedArguments(&'static str),

    #[error("'{0}' does not support background execution")]
    BackgroundUnsupported(&'static str),

    #[error("'{0}' does not support output redirection")]
    RedirectUnsupported(&'static str),

    #[error("Failed to open file '{}' for writing", path.display())]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("sigaction: {0}")]
    SignalSetup(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Readline(#[from] ReadlineError),
}

impl ShellError {
    /// Fatal errors end the shell; everything else is reported and the
    /// read loop carries on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::SignalSetup(_) | ShellError::Io(_) | ShellError::Readline(_)
        )
    }
}
