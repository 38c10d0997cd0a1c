use std::collections::HashMap;

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

/// Commands understood by the session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum CommandKind {
    /// Print the session's working directory.
    Pwd,
    /// List the working directory.
    Ls,
    /// Change the working directory.
    Cd,
    /// Create a directory.
    Mkdir,
    /// Delete a file.
    Delete,
    /// Download a file.
    Get,
    /// Upload a file.
    Put,
    /// End the session.
    Quit,
}

impl CommandKind {
    /// Wire name of the command.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Immutable name to command table shared by every session.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandKind>,
}

impl CommandRegistry {
    /// Builds the table of every [`CommandKind`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: CommandKind::iter().map(|kind| (kind.name(), kind)).collect(),
        }
    }

    /// Case-sensitive exact lookup of a command token.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<CommandKind> {
        self.commands.get(name).copied()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` when no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pwd", CommandKind::Pwd)]
    #[case("ls", CommandKind::Ls)]
    #[case("cd", CommandKind::Cd)]
    #[case("mkdir", CommandKind::Mkdir)]
    #[case("delete", CommandKind::Delete)]
    #[case("get", CommandKind::Get)]
    #[case("put", CommandKind::Put)]
    #[case("quit", CommandKind::Quit)]
    fn resolves_every_command(#[case] name: &str, #[case] expected: CommandKind) {
        assert_eq!(CommandRegistry::new().lookup(name), Some(expected));
    }

    #[rstest]
    #[case("PWD")]
    #[case("Get")]
    #[case("mk")]
    #[case("dir")]
    #[case("terminate")]
    fn rejects_case_variants_and_prefixes(#[case] name: &str) {
        assert_eq!(CommandRegistry::new().lookup(name), None);
    }

    #[test]
    fn registers_eight_commands() {
        assert_eq!(CommandRegistry::new().len(), 8);
    }
}
