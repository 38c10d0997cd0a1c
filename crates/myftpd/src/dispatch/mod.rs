//! Command parsing, lookup, and the error taxonomy reported to clients.
//!
//! A received line is split into a [`Command`], the name is resolved through
//! the shared [`CommandRegistry`] into a [`CommandKind`], and the session
//! runs the matching handler. Handler failures are [`CommandError`]s whose
//! display text becomes the message of an `ERROR:` line.

mod command;
mod errors;
mod registry;

pub use self::command::Command;
pub use self::errors::{CommandError, Target};
pub use self::registry::{CommandKind, CommandRegistry};
