use std::path::PathBuf;

use crate::error::ShellError;

/// Represents one parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Name of the builtin to run.
    pub name: String,
    /// Everything after the name with the modifiers stripped. `None` when
    /// the line held no whitespace after the name at all.
    pub args: Option<String>,
    /// Trailing `&` was present.
    pub background: bool,
    /// Target of `> file`, if any.
    pub output: Option<PathBuf>,
}

impl Invocation {
    /// Returns the argument text if there is any non-blank text.
    pub fn args(&self) -> Option<&str> {
        self.args.as_deref().filter(|a| !a.trim().is_empty())
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Parses a raw input line.
///
/// The name is split off at the first run of blanks. Modifiers are then
/// pulled out of the remainder in a fixed order:
///
/// - a trailing `&` sets the background flag and is stripped together with
///   the blanks before it,
/// - the first `>` in what is left splits the remainder from the output file.
///
/// Returns `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<Invocation>, ShellError> {
    let line = line.trim_start_matches(is_blank);
    let (name, rest) = match line.find(is_blank) {
        Some(at) => (&line[..at], Some(line[at..].trim_start_matches(is_blank))),
        None => (line, None),
    };
    let name = name.trim_end_matches(['\r', '\n']);
    if name.is_empty() {
        return Ok(None);
    }

    let mut invocation = Invocation {
        name: name.to_string(),
        args: None,
        background: false,
        output: None,
    };

    let Some(mut rest) = rest else {
        return Ok(Some(invocation));
    };

    if let Some(stripped) = rest.trim_end().strip_suffix('&') {
        invocation.background = true;
        rest = stripped.trim_end_matches(is_blank);
    }

    if let Some(at) = rest.find('>') {
        let file = rest[at + 1..].trim_matches(is_blank);
        if file.is_empty() {
            return Err(ShellError::MissingOutputFile);
        }
        invocation.output = Some(PathBuf::from(file));
        rest = rest[..at].trim_matches(is_blank);
    }

    invocation.args = Some(rest.to_string());
    Ok(Some(invocation))
}

/// Splits `exec` arguments into an argument vector.
pub fn tokenize(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Invocation {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \t ").unwrap(), None);
    }

    #[test]
    fn test_name_only() {
        let inv = parse("help");
        assert_eq!(inv.name, "help");
        assert_eq!(inv.args, None);
        assert!(!inv.background);
        assert_eq!(inv.output, None);
    }

    #[test]
    fn test_name_with_trailing_blank_has_empty_remainder() {
        let inv = parse("echo ");
        assert_eq!(inv.args, Some(String::new()));
        assert_eq!(inv.args(), None);
    }

    #[test]
    fn test_split_on_first_run() {
        let inv = parse("  echo \t hello   world");
        assert_eq!(inv.name, "echo");
        assert_eq!(inv.args(), Some("hello   world"));
    }

    #[test]
    fn test_background() {
        let inv = parse("exec sleep 5 &");
        assert!(inv.background);
        assert_eq!(inv.args(), Some("sleep 5"));

        let inv = parse("exec sleep 5&");
        assert!(inv.background);
        assert_eq!(inv.args(), Some("sleep 5"));

        let inv = parse("exec sleep 5 &  ");
        assert!(inv.background);
        assert_eq!(inv.args(), Some("sleep 5"));
    }

    #[test]
    fn test_trailing_blanks_kept_without_modifiers() {
        let inv = parse("echo hi   ");
        assert!(!inv.background);
        assert_eq!(inv.args(), Some("hi   "));
    }

    #[test]
    fn test_redirection() {
        let inv = parse("echo hello > out.txt");
        assert_eq!(inv.args(), Some("hello"));
        assert_eq!(inv.output, Some(PathBuf::from("out.txt")));

        let inv = parse("echo hello>out.txt");
        assert_eq!(inv.args(), Some("hello"));
        assert_eq!(inv.output, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn test_redirection_then_background() {
        let inv = parse("exec ls -l > out.txt &");
        assert!(inv.background);
        assert_eq!(inv.args(), Some("ls -l"));
        assert_eq!(inv.output, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn test_ampersand_before_redirection_stays_in_args() {
        let inv = parse("echo hi &> out.txt");
        assert!(!inv.background);
        assert_eq!(inv.args(), Some("hi &"));
        assert_eq!(inv.output, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn test_missing_output_file() {
        assert!(matches!(
            parse_line("echo hi >"),
            Err(ShellError::MissingOutputFile)
        ));
        assert!(matches!(
            parse_line("echo hi >   &"),
            Err(ShellError::MissingOutputFile)
        ));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("ls  -l\t/tmp"), vec!["ls", "-l", "/tmp"]);
        assert!(tokenize("   ").is_empty());
    }
}
