use std::env;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use nix::unistd::isatty;

use crate::utils;

/// Size of the input buffer in bytes, counting the newline and a terminator.
pub const INPUT_BUFFER_SIZE: usize = 1024;

const HISTORY_FILE: &str = ".imcsh_history";

/// Runtime settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Print the prompt and the startup banner.
    pub emit_prompt: bool,
    /// Log at debug level.
    pub verbose: bool,
    /// Colour the prompt and error lines.
    pub color: bool,
    /// Read through the line editor instead of plain stdin.
    pub interactive: bool,
    /// History file for the line editor.
    pub history: Option<PathBuf>,
    pub input_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            emit_prompt: true,
            verbose: false,
            color: false,
            interactive: false,
            history: None,
            input_buffer: INPUT_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Builds the configuration from command-line flags (without the program
    /// name) and the environment.
    ///
    /// - `-h`: print usage and exit
    /// - `-v`: verbose logging
    /// - `-p`: no prompt, no banner
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config {
            color: isatty(io::stdout().as_raw_fd()).unwrap_or(false) && env::var_os("NO_COLOR").is_none(),
            interactive: isatty(io::stdin().as_raw_fd()).unwrap_or(false),
            history: history_path(),
            ..Config::default()
        };
        for arg in args {
            match arg.as_str() {
                "-h" => utils::print_usage(),
                "-v" => config.verbose = true,
                "-p" => config.emit_prompt = false,
                _ => {}
            }
        }
        config
    }

    /// Filter for env_logger when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

fn history_path() -> Option<PathBuf> {
    match env::var_os("IMCSH_HISTORY") {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs_next::home_dir().map(|home| home.join(HISTORY_FILE)),
    }
}
