//! Incremental search for the transfer end marker.
//!
//! Payload bytes arrive in arbitrary chunks, so the marker may straddle a
//! chunk boundary. The scanner keeps the trailing `END_MARKER.len() - 1`
//! bytes of everything it has seen and only releases bytes that can no
//! longer be the start of a marker. This is equivalent to searching an
//! append-only buffer of the whole payload without holding the whole payload
//! in memory.

use crate::END_MARKER;

/// Result of feeding one chunk into a [`MarkerScanner`].
#[derive(Debug, PartialEq, Eq)]
pub enum Scan {
    /// No marker yet; `payload` is confirmed file content.
    Pending {
        /// Bytes that precede any possible marker.
        payload: Vec<u8>,
    },
    /// The marker was found.
    Complete {
        /// Final file content preceding the marker.
        payload: Vec<u8>,
        /// Bytes received after the marker, belonging to the next command.
        trailing: Vec<u8>,
    },
}

/// Streaming matcher for [`END_MARKER`].
#[derive(Debug, Default)]
pub struct MarkerScanner {
    window: Vec<u8>,
}

impl MarkerScanner {
    /// Creates a scanner with an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` to the window and reports what can be released.
    pub fn feed(&mut self, chunk: &[u8]) -> Scan {
        self.window.extend_from_slice(chunk);

        if let Some(position) = find_marker(&self.window) {
            let trailing = self.window.split_off(position + END_MARKER.len());
            self.window.truncate(position);
            return Scan::Complete {
                payload: std::mem::take(&mut self.window),
                trailing,
            };
        }

        let held_back = (END_MARKER.len() - 1).min(self.window.len());
        let tail = self.window.split_off(self.window.len() - held_back);
        Scan::Pending {
            payload: std::mem::replace(&mut self.window, tail),
        }
    }

    /// Bytes currently held back because they could begin a marker.
    #[must_use]
    pub fn held_back(&self) -> &[u8] {
        &self.window
    }
}

fn find_marker(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(END_MARKER.len())
        .position(|candidate| candidate == END_MARKER)
}
