//! # Signal Bus
//!
//! Post-save notification for users.
//!
//! Handlers are registered explicitly with [`SignalBus::connect`]. When the
//! store saves a user it calls [`SignalBus::send`] from inside the saving
//! transaction, so:
//!
//! - handlers run synchronously, on the thread that saved the user, in
//!   registration order;
//! - handlers write through the same [`Transaction`] and roll back with it;
//! - the first handler error stops dispatch and fails the transaction.
//!
//! A handler must not call [`Database::atomic`](crate::store::Database::atomic)
//! itself; the enclosing transaction already holds the store.

use crate::context::ExecutionContext;
use crate::error::StoreError;
use crate::store::Transaction;
use crate::user::User;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Handle returned by [`SignalBus::connect`], used to disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

/// Event delivered to post-save handlers.
#[derive(Debug, Clone, Copy)]
pub struct PostSave<'a> {
    /// The saved user.
    pub user: &'a User,
    /// Whether the save created the user.
    pub created: bool,
    /// Context the save (and this dispatch) runs on.
    pub context: &'a ExecutionContext,
}

type Handler =
    Arc<dyn Fn(&PostSave<'_>, &mut Transaction<'_>) -> Result<(), StoreError> + Send + Sync>;

/// Registry of post-save handlers.
#[derive(Default)]
pub struct SignalBus {
    handlers: RwLock<Vec<(HandlerId, Handler)>>,
    next_id: AtomicU64,
}

impl SignalBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It stays registered until disconnected.
    pub fn connect<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&PostSave<'_>, &mut Transaction<'_>) -> Result<(), StoreError>
            + Send
            + Sync
            + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, Arc::new(handler)));
        debug!(handler = id.0, "post_save handler connected");
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn disconnect(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Deliver an event to every handler. Returns how many ran.
    pub fn send(&self, event: &PostSave<'_>, tx: &mut Transaction<'_>) -> Result<usize, StoreError> {
        // Snapshot so handlers may connect or disconnect while running.
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        debug!(
            user = %event.user.username,
            created = event.created,
            context = event.context.name(),
            receivers = handlers.len(),
            "dispatching post_save"
        );

        for handler in &handlers {
            handler(event, &mut *tx)?;
        }
        Ok(handlers.len())
    }
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("receivers", &self.receiver_count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::store::Database;
    use parking_lot::Mutex;

    type Seen = Arc<Mutex<Vec<(String, String, bool)>>>;

    fn recording_handler(
        seen: Seen,
    ) -> impl Fn(&PostSave<'_>, &mut Transaction<'_>) -> Result<(), StoreError> + Send + Sync + 'static
    {
        move |event, _tx| {
            seen.lock().push((
                event.user.username.clone(),
                event.context.name().to_string(),
                event.created,
            ));
            Ok(())
        }
    }

    #[test]
    fn handler_runs_once_per_creation() {
        let db = Database::in_memory();
        let seen: Seen = Arc::default();
        db.signals().connect(recording_handler(Arc::clone(&seen)));

        let ctx = ExecutionContext::new("ctx-a", true);
        db.atomic(&ctx, |tx| tx.get_or_create_user("alice")).unwrap();
        db.atomic(&ctx, |tx| tx.get_or_create_user("alice")).unwrap();
        db.atomic(&ctx, |tx| tx.get_or_create_user("bob")).unwrap();

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![
                ("alice".to_string(), "ctx-a".to_string(), true),
                ("bob".to_string(), "ctx-a".to_string(), true),
            ]
        );
    }

    #[test]
    fn handler_sees_creating_thread() {
        let db = Arc::new(Database::in_memory());
        let seen: Seen = Arc::default();
        db.signals().connect(recording_handler(Arc::clone(&seen)));

        let worker_db = Arc::clone(&db);
        std::thread::Builder::new()
            .name("creator".to_string())
            .spawn(move || {
                worker_db
                    .atomic(&ExecutionContext::spawned(), |tx| tx.get_or_create_user("carol"))
                    .unwrap();
            })
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(seen.lock()[0].1, "creator");
    }

    #[test]
    fn disconnected_handler_is_not_called() {
        let db = Database::in_memory();
        let seen: Seen = Arc::default();
        let id = db.signals().connect(recording_handler(Arc::clone(&seen)));

        assert_eq!(db.signals().receiver_count(), 1);
        assert!(db.signals().disconnect(id));
        assert!(!db.signals().disconnect(id));
        assert_eq!(db.signals().receiver_count(), 0);

        db.atomic(&ExecutionContext::current(), |tx| tx.get_or_create_user("dave"))
            .unwrap();
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let db = Database::in_memory();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            db.signals().connect(move |_, _| {
                order.lock().push(tag);
                Ok(())
            });
        }

        db.atomic(&ExecutionContext::current(), |tx| tx.get_or_create_user("erin"))
            .unwrap();
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_handler_rolls_back_creation() {
        let db = Database::in_memory();
        db.signals()
            .connect(|_, _| Err(StoreError::rollback("handler refused")));

        let result = db.atomic(&ExecutionContext::current(), |tx| tx.get_or_create_user("frank"));

        assert!(result.is_err());
        assert!(db.user_by_name("frank").is_none());
    }
}
