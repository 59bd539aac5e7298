use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, ExternalPrinter};

use crate::config::Config;
use crate::error::ShellError;

/// One read attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    /// A complete line with the terminator removed.
    Text(String),
    /// The line did not fit into the input buffer and was thrown away.
    TooLong,
    Eof,
}

/// Where the shell gets its input lines from.
pub trait LineSource {
    /// Shows `prompt` (if non-empty) and reads one line.
    fn read_line(&mut self, prompt: &str) -> Result<Line, ShellError>;
}

/// Receives reports that arrive while the main loop may be blocked on input.
pub trait Notifier: Send {
    fn notify(&mut self, message: &str);
}

/// Line reader over any buffered input, used when stdin is not a terminal.
///
/// `buffer_size` counts the newline, matching a fixed `fgets`-style buffer
/// with room for the terminating NUL: a line of up to `buffer_size - 2`
/// bytes of text fits.
pub struct PlainReader<R> {
    reader: R,
    buffer_size: usize,
    prompt_out: Box<dyn Write>,
}

impl<R: BufRead> PlainReader<R> {
    pub fn new(reader: R, buffer_size: usize) -> Self {
        PlainReader {
            reader,
            buffer_size,
            prompt_out: Box::new(io::stdout()),
        }
    }

    /// Sends prompts somewhere other than stdout.
    pub fn with_prompt_output(mut self, out: Box<dyn Write>) -> Self {
        self.prompt_out = out;
        self
    }

    fn discard_rest_of_line(&mut self) -> io::Result<()> {
        let mut sink = Vec::new();
        loop {
            sink.clear();
            let n = self
                .reader
                .by_ref()
                .take(self.buffer_size as u64)
                .read_until(b'\n', &mut sink)?;
            if n == 0 || sink.last() == Some(&b'\n') {
                return Ok(());
            }
        }
    }
}

impl<R: BufRead> LineSource for PlainReader<R> {
    fn read_line(&mut self, prompt: &str) -> Result<Line, ShellError> {
        if !prompt.is_empty() {
            write!(self.prompt_out, "{}", prompt)?;
            self.prompt_out.flush()?;
        }

        let limit = self.buffer_size.saturating_sub(1) as u64;
        let mut buf = Vec::new();
        let n = self.reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(Line::Eof);
        }
        match buf.last() {
            Some(b'\n') => {
                buf.pop();
            }
            _ if n as u64 == limit => {
                self.discard_rest_of_line()?;
                return Ok(Line::TooLong);
            }
            // Last line of the input without a terminator.
            _ => {}
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(Line::Text(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Interactive reader backed by rustyline, with persistent history.
pub struct EditorReader {
    editor: DefaultEditor,
    history: Option<PathBuf>,
    buffer_size: usize,
}

impl EditorReader {
    pub fn new(history: Option<PathBuf>, buffer_size: usize) -> Result<Self, ShellError> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &history {
            if let Err(err) = editor.load_history(path) {
                log::debug!("no history loaded from {}: {}", path.display(), err);
            }
        }
        Ok(EditorReader {
            editor,
            history,
            buffer_size,
        })
    }

    /// Creates a notifier that prints above the line being edited.
    pub fn notifier(&mut self) -> Result<Box<dyn Notifier>, ShellError> {
        let printer = self.editor.create_external_printer()?;
        Ok(Box::new(EditorNotifier { printer }))
    }
}

impl LineSource for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<Line, ShellError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if line.len() + 2 > self.buffer_size {
                    return Ok(Line::TooLong);
                }
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Line::Text(line))
            }
            // Ctrl-C abandons the current line.
            Err(ReadlineError::Interrupted) => Ok(Line::Text(String::new())),
            Err(ReadlineError::Eof) => Ok(Line::Eof),
            Err(err) => Err(err.into()),
        }
    }
}

impl Drop for EditorReader {
    fn drop(&mut self) {
        if let Some(path) = &self.history {
            if let Err(err) = self.editor.save_history(path) {
                log::warn!("could not save history to {}: {}", path.display(), err);
            }
        }
    }
}

struct EditorNotifier<P> {
    printer: P,
}

impl<P: ExternalPrinter + Send> Notifier for EditorNotifier<P> {
    fn notify(&mut self, message: &str) {
        if let Err(err) = self.printer.print(format!("{}\n", message)) {
            log::warn!("could not print notification: {}", err);
        }
    }
}

/// Prints straight to stdout, then puts the prompt back since the user may
/// be halfway through typing the next line.
pub struct PlainNotifier {
    prompt: String,
    out: Box<dyn Write + Send>,
}

impl PlainNotifier {
    pub fn new(prompt: impl Into<String>) -> Self {
        PlainNotifier {
            prompt: prompt.into(),
            out: Box::new(io::stdout()),
        }
    }

    pub fn with_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = out;
        self
    }
}

impl Notifier for PlainNotifier {
    fn notify(&mut self, message: &str) {
        let written = write!(self.out, "\n{}\n{}", message, self.prompt)
            .and_then(|_| self.out.flush());
        if let Err(err) = written {
            log::warn!("could not print notification: {}", err);
        }
    }
}

/// Picks the reader and notifier for the current terminal.
pub fn terminal(
    config: &Config,
    prompt: &str,
) -> Result<(Box<dyn LineSource>, Box<dyn Notifier>), ShellError> {
    if config.interactive {
        let mut reader = EditorReader::new(config.history.clone(), config.input_buffer)?;
        let notifier = reader.notifier()?;
        Ok((Box::new(reader), notifier))
    } else {
        let reader = PlainReader::new(io::stdin().lock(), config.input_buffer);
        let prompt = if config.emit_prompt { prompt } else { "" };
        Ok((Box::new(reader), Box::new(PlainNotifier::new(prompt))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::SharedBuf;
    use std::io::Cursor;

    fn reader(input: &str, size: usize) -> PlainReader<Cursor<Vec<u8>>> {
        PlainReader::new(Cursor::new(input.as_bytes().to_vec()), size)
    }

    #[test]
    fn test_reads_lines_then_eof() {
        let mut r = reader("help\necho hi\n", 1024);
        assert_eq!(r.read_line("").unwrap(), Line::Text("help".into()));
        assert_eq!(r.read_line("").unwrap(), Line::Text("echo hi".into()));
        assert_eq!(r.read_line("").unwrap(), Line::Eof);
    }

    #[test]
    fn test_unterminated_last_line() {
        let mut r = reader("quit", 1024);
        assert_eq!(r.read_line("").unwrap(), Line::Text("quit".into()));
        assert_eq!(r.read_line("").unwrap(), Line::Eof);
    }

    #[test]
    fn test_blank_line() {
        let mut r = reader("\n", 1024);
        assert_eq!(r.read_line("").unwrap(), Line::Text(String::new()));
    }

    #[test]
    fn test_line_that_just_fits() {
        // 8 bytes of buffer: 6 bytes of text, newline, NUL.
        let mut r = reader("abcdef\n", 8);
        assert_eq!(r.read_line("").unwrap(), Line::Text("abcdef".into()));
    }

    #[test]
    fn test_too_long_is_discarded_whole() {
        let mut r = reader("abcdefg\nhelp\n", 8);
        assert_eq!(r.read_line("").unwrap(), Line::TooLong);
        assert_eq!(r.read_line("").unwrap(), Line::Text("help".into()));
    }

    #[test]
    fn test_very_long_line_is_discarded_whole() {
        let long = "x".repeat(5000);
        let mut r = reader(&format!("echo {}\nhelp\n", long), 1024);
        assert_eq!(r.read_line("").unwrap(), Line::TooLong);
        assert_eq!(r.read_line("").unwrap(), Line::Text("help".into()));
        assert_eq!(r.read_line("").unwrap(), Line::Eof);
    }

    #[test]
    fn test_prompt_goes_to_prompt_output() {
        let prompts = SharedBuf::default();
        let mut r = reader("help\n", 1024).with_prompt_output(Box::new(prompts.clone()));
        assert_eq!(r.read_line("sh> ").unwrap(), Line::Text("help".into()));
        assert_eq!(r.read_line("").unwrap(), Line::Eof);
        assert_eq!(prompts.contents(), "sh> ");
    }

    #[test]
    fn test_plain_notifier_reprints_prompt() {
        let out = SharedBuf::default();
        let mut notifier = PlainNotifier::new("sh> ").with_output(Box::new(out.clone()));
        notifier.notify("Background process 7 terminated with exit status 0");
        assert_eq!(
            out.contents(),
            "\nBackground process 7 terminated with exit status 0\nsh> "
        );
    }

    #[test]
    fn test_plain_notifier_survives_write_failure() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> io::Result<()> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
        }
        let mut notifier = PlainNotifier::new("sh> ").with_output(Box::new(Broken));
        notifier.notify("lost");
        notifier.notify("lost again");
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut r = reader("help\r\n", 1024);
        assert_eq!(r.read_line("").unwrap(), Line::Text("help".into()));
    }
}
