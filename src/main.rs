mod builtins;
mod config;
mod console;
mod error;
mod exec;
mod jobs;
mod parser;
mod shell;
mod signals;
#[cfg(test)]
mod testutil;
mod utils;

use std::env;
use std::io;
use std::process;

use config::Config;
use error::ShellError;
use shell::Shell;
use signals::Reaper;

fn main() {
    // Parse command-line arguments.
    let config = Config::from_args(env::args().skip(1));

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter()),
    )
    .init();

    if let Err(err) = run(config) {
        eprintln!("imcsh: {}", err);
        process::exit(1);
    }
}

fn run(config: Config) -> Result<(), ShellError> {
    // The reaper must be watching before the first child exists.
    let reaper = Reaper::install()?;

    let (user, host) = utils::identity();
    let prompt = utils::prompt(&user, &host, config.color);
    if config.emit_prompt {
        println!("{}", utils::banner());
    }

    let (input, notifier) = console::terminal(&config, &prompt)?;
    let mut shell = Shell::new(
        config,
        prompt,
        reaper,
        input,
        notifier,
        Box::new(io::stdout()),
        Box::new(io::stderr()),
    )?;
    shell.run()
}
