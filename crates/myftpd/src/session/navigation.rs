//! Handlers that only touch the filesystem gateway.

use std::io::{self, Read, Write};

use myftp_protocol::Response;

use super::{HandlerResult, Reply, Session, require_name};
use crate::dispatch::{CommandError, Target};
use crate::gateway::DirEntry;

impl<R: Read, W: Write> Session<R, W> {
    pub(super) fn print_directory(&self) -> Reply {
        Reply::Line(Response::bare(self.cwd.display().to_string()))
    }

    pub(super) fn list_directory(&self) -> HandlerResult {
        let entries = self
            .context
            .gateway
            .list_entries(&self.cwd)
            .map_err(|error| {
                CommandError::from_io(error, Target::Directory, "Failed to list directory")
            })?;
        Ok(Reply::Line(Response::bare(format_listing(&entries))))
    }

    pub(super) fn change_directory(&mut self, argument: &str) -> HandlerResult {
        let name = require_name(argument, Target::Directory)?;
        let target = self.resolve(name);
        let resolved = self.context.gateway.chdir(&target).map_err(|error| {
            CommandError::from_io(error, Target::Directory, "Failed to change directory")
        })?;
        self.cwd = resolved;
        Ok(Reply::Line(Response::success(format!(
            "Changed directory to {}.",
            self.cwd.display()
        ))))
    }

    pub(super) fn make_directory(&self, argument: &str) -> HandlerResult {
        let name = require_name(argument, Target::Directory)?;
        let path = self.resolve(name);
        if self.context.gateway.exists(&path) {
            return Err(CommandError::AlreadyExists {
                target: Target::Directory,
            });
        }
        self.context.gateway.mkdir(&path).map_err(|error| {
            CommandError::from_io(error, Target::Directory, "Failed to create directory")
        })?;
        Ok(Reply::Line(Response::success(
            "Directory created successfully.",
        )))
    }

    pub(super) fn delete_file(&self, argument: &str) -> HandlerResult {
        let name = require_name(argument, Target::File)?;
        let path = self.resolve(name);
        if !self.context.gateway.exists(&path) {
            return Err(CommandError::NotFound {
                target: Target::File,
            });
        }
        self.context
            .gateway
            .remove(&path)
            .map_err(|error| match error.kind() {
                io::ErrorKind::IsADirectory => CommandError::WrongType {
                    message: "Cannot delete a directory.",
                },
                _ => CommandError::from_io(error, Target::File, "Failed to delete file"),
            })?;
        Ok(Reply::Line(Response::success("File deleted successfully.")))
    }
}

/// Entries separated by two spaces; directories carry a trailing `/`.
fn format_listing(entries: &[DirEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            if entry.is_dir {
                format!("{}/", entry.name)
            } else {
                entry.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_marks_directories() {
        let entries = [DirEntry::new("docs", true), DirEntry::new("a.txt", false)];
        assert_eq!(format_listing(&entries), "docs/  a.txt");
    }

    #[test]
    fn empty_listing_is_blank() {
        assert_eq!(format_listing(&[]), "");
    }
}
