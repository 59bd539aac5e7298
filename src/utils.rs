use std::process;

use nix::unistd::{gethostname, getuid, User};

pub const VERSION_LINE: &str = "IMCSH Version 1.1 created by David Fodor";

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

const TITLE: &str = r"  _____ __  __  _____  _____ _    _
 |_   _|  \/  |/ ____|/ ____| |  | |
   | | | \  / | |    | (___ | |__| |
   | | | |\/| | |     \___ \|  __  |
  _| |_| |  | | |____ ____) | |  | |
 |_____|_|  |_|\_____|_____/|_|  |_|";

pub fn print_usage() {
    println!("Usage: imcsh [-hvp]");
    println!("   -h   Print this help message");
    println!("   -v   Enable verbose mode");
    println!("   -p   Do not print a command prompt");
    process::exit(1);
}

/// The ASCII art title shown at startup.
pub fn banner() -> String {
    format!("{}\n {}\n", TITLE, VERSION_LINE)
}

/// Returns `(user, host)` for the prompt, with `?` for anything that
/// cannot be looked up.
pub fn identity() -> (String, String) {
    let user = match User::from_uid(getuid()) {
        Ok(Some(user)) => user.name,
        Ok(None) => "?".to_string(),
        Err(err) => {
            log::warn!("getpwuid failed: {}", err);
            "?".to_string()
        }
    };
    let host = match gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(err) => {
            log::warn!("gethostname failed: {}", err);
            "?".to_string()
        }
    };
    (user, host)
}

pub fn prompt(user: &str, host: &str, color: bool) -> String {
    if color {
        format!("{}{}@{}> {}", GREEN, user, host, RESET)
    } else {
        format!("{}@{}> ", user, host)
    }
}

/// Wraps an error line in red when colour is on.
pub fn paint_error(message: &str, color: bool) -> String {
    if color {
        format!("{}{}{}", RED, message, RESET)
    } else {
        message.to_string()
    }
}
