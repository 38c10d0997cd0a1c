use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use myftp_protocol::CommandId;

type Entries = HashMap<CommandId, Arc<AtomicBool>>;

/// Service-scoped table of cancellable commands.
///
/// An identifier present in the table denotes a command that is still
/// running and eligible for cancellation.
#[derive(Debug)]
pub struct CancellationRegistry {
    next_id: AtomicU64,
    entries: Mutex<Entries>,
}

impl CancellationRegistry {
    /// Creates an empty registry. Identifiers start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a new command and returns the guard that owns its entry.
    #[must_use]
    pub fn begin(self: &Arc<Self>) -> CommandGuard {
        let id = CommandId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let running = Arc::new(AtomicBool::new(true));
        self.lock().insert(id, Arc::clone(&running));
        CommandGuard {
            registry: Arc::clone(self),
            id,
            running,
        }
    }

    /// Marks `id` as no longer running and removes it. Returns `false` when
    /// the identifier is unknown or already finished.
    pub fn cancel(&self, id: CommandId) -> bool {
        match self.lock().remove(&id) {
            Some(running) => {
                running.store(false, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Returns `true` while `id` is registered.
    #[must_use]
    pub fn contains(&self, id: CommandId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration of one running command; dropping it removes the entry.
#[derive(Debug)]
pub struct CommandGuard {
    registry: Arc<CancellationRegistry>,
    id: CommandId,
    running: Arc<AtomicBool>,
}

impl CommandGuard {
    /// Identifier a canceller uses to name this command.
    #[must_use]
    pub const fn id(&self) -> CommandId {
        self.id
    }

    /// `false` once a cancellation request named this command.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for CommandGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
