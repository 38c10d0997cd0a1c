/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    argument: String,
}

impl Command {
    /// Splits a line at its first whitespace run. The argument is the
    /// trimmed remainder and may be empty. Returns `None` for blank lines.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (name, argument) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        Some(Self {
            name: name.to_owned(),
            argument: argument.trim().to_owned(),
        })
    }

    /// Command token.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument text, empty when none was given.
    #[must_use]
    pub fn argument(&self) -> &str {
        &self.argument
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pwd", "pwd", "")]
    #[case("cd docs", "cd", "docs")]
    #[case("get   my file.txt  \r", "get", "my file.txt")]
    #[case("  ls", "ls", "")]
    #[case("put\tdata.bin", "put", "data.bin")]
    fn splits_name_and_argument(#[case] line: &str, #[case] name: &str, #[case] argument: &str) {
        let command = Command::parse(line).expect("non-blank line");
        assert_eq!(command.name(), name);
        assert_eq!(command.argument(), argument);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\r")]
    fn blank_lines_carry_no_command(#[case] line: &str) {
        assert_eq!(Command::parse(line), None);
    }
}
