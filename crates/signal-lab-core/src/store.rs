//! # Store
//!
//! Users and signal logs, with atomic transactions.
//!
//! Committed state always lives in memory. A store opened with
//! [`Database::open`] additionally persists every committed write to a redb
//! file and reloads it on the next open.
//!
//! ## Transactions
//!
//! [`Database::atomic`] stages a copy of the committed state and hands the
//! body a [`Transaction`]. If the body returns `Ok`, the staged writes are
//! persisted and then published; if it returns `Err`, nothing it did (nor
//! anything a signal handler did on its behalf) is kept. Transactions run one
//! at a time.

use crate::context::ExecutionContext;
use crate::error::StoreError;
use crate::signal::{PostSave, SignalBus};
use crate::signal_log::SignalLog;
use crate::user::{User, UserId};
use parking_lot::Mutex;
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// users: username -> postcard(User)
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// signal_logs: user id -> postcard(SignalLog)
const SIGNAL_LOGS: TableDefinition<u64, &[u8]> = TableDefinition::new("signal_logs");

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Default)]
struct State {
    users: BTreeMap<String, User>,
    logs: BTreeMap<UserId, SignalLog>,
    /// Highest id handed out so far.
    last_user_id: u64,
}

impl State {
    fn contains_user(&self, id: UserId) -> bool {
        self.users.values().any(|user| user.id == id)
    }
}

/// A write staged by a transaction, replayed into the backend on commit.
#[derive(Debug, Clone)]
enum Write {
    User(User),
    SignalLog(SignalLog),
}

// =============================================================================
// BACKEND
// =============================================================================

enum Backend {
    Memory,
    Redb(redb::Database),
}

impl Backend {
    fn persist(&self, writes: &[Write]) -> Result<(), StoreError> {
        let Self::Redb(db) = self else {
            return Ok(());
        };
        if writes.is_empty() {
            return Ok(());
        }

        let txn = db.begin_write()?;
        {
            let mut users = txn.open_table(USERS)?;
            let mut logs = txn.open_table(SIGNAL_LOGS)?;
            for write in writes {
                match write {
                    Write::User(user) => {
                        let bytes = postcard::to_allocvec(user)?;
                        users.insert(user.username.as_str(), bytes.as_slice())?;
                    }
                    Write::SignalLog(log) => {
                        let bytes = postcard::to_allocvec(log)?;
                        logs.insert(log.user.0, bytes.as_slice())?;
                    }
                }
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn load(db: &redb::Database) -> Result<State, StoreError> {
        // Create both tables up front so read transactions can open them.
        let txn = db.begin_write()?;
        {
            let _users = txn.open_table(USERS)?;
            let _logs = txn.open_table(SIGNAL_LOGS)?;
        }
        txn.commit()?;

        let mut state = State::default();
        let read = db.begin_read()?;

        let users = read.open_table(USERS)?;
        for entry in users.iter()? {
            let (_, value) = entry?;
            let user: User = postcard::from_bytes(value.value())?;
            state.last_user_id = state.last_user_id.max(user.id.0);
            state.users.insert(user.username.clone(), user);
        }

        let logs = read.open_table(SIGNAL_LOGS)?;
        for entry in logs.iter()? {
            let (_, value) = entry?;
            let log: SignalLog = postcard::from_bytes(value.value())?;
            state.logs.insert(log.user, log);
        }

        Ok(state)
    }
}

// =============================================================================
// DATABASE
// =============================================================================

/// The user/log store. Share it between threads with `Arc`.
pub struct Database {
    committed: Mutex<State>,
    backend: Backend,
    signals: SignalBus,
}

impl Database {
    /// A store that forgets everything when dropped.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            committed: Mutex::new(State::default()),
            backend: Backend::Memory,
            signals: SignalBus::new(),
        }
    }

    /// Open (or create) a redb-backed store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = redb::Database::create(path)?;
        let state = Backend::load(&db)?;
        info!(
            path = %path.display(),
            users = state.users.len(),
            signal_logs = state.logs.len(),
            "opened signal store"
        );
        Ok(Self {
            committed: Mutex::new(state),
            backend: Backend::Redb(db),
            signals: SignalBus::new(),
        })
    }

    /// The post-save bus. Handlers connected here fire for every
    /// transaction on this store.
    #[must_use]
    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, Backend::Redb(_))
    }

    /// Run `body` atomically on behalf of `context`.
    ///
    /// Must not be called from inside another transaction body or a signal
    /// handler on the same store.
    pub fn atomic<T>(
        &self,
        context: &ExecutionContext,
        body: impl FnOnce(&mut Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut committed = self.committed.lock();
        let mut tx = Transaction {
            state: committed.clone(),
            writes: Vec::new(),
            signals: &self.signals,
            context,
        };

        match body(&mut tx) {
            Ok(value) => {
                let Transaction { state, writes, .. } = tx;
                self.backend.persist(&writes)?;
                debug!(writes = writes.len(), context = context.name(), "transaction committed");
                *committed = state;
                Ok(value)
            }
            Err(err) => {
                debug!(
                    discarded = tx.writes.len(),
                    context = context.name(),
                    error = %err,
                    "transaction rolled back"
                );
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn user_by_name(&self, username: &str) -> Option<User> {
        self.committed.lock().users.get(username).cloned()
    }

    /// All users, ordered by id.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.committed.lock().users.values().cloned().collect();
        users.sort_by_key(|user| user.id);
        users
    }

    #[must_use]
    pub fn signal_log(&self, user: UserId) -> Option<SignalLog> {
        self.committed.lock().logs.get(&user).cloned()
    }

    #[must_use]
    pub fn signal_log_for_username(&self, username: &str) -> Option<SignalLog> {
        let state = self.committed.lock();
        let user = state.users.get(username)?;
        state.logs.get(&user.id).cloned()
    }

    /// All signal logs, ordered by user id.
    #[must_use]
    pub fn signal_logs(&self) -> Vec<SignalLog> {
        self.committed.lock().logs.values().cloned().collect()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("persistent", &self.is_persistent())
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// Staged view of the store inside [`Database::atomic`].
pub struct Transaction<'a> {
    state: State,
    writes: Vec<Write>,
    signals: &'a SignalBus,
    context: &'a ExecutionContext,
}

impl Transaction<'_> {
    /// The context this transaction runs on behalf of.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        self.context
    }

    #[must_use]
    pub fn user_by_name(&self, username: &str) -> Option<&User> {
        self.state.users.get(username)
    }

    /// Fetch a user by name, creating it if absent.
    ///
    /// Creation emits `post_save` to every connected handler before
    /// returning. Returns the user and whether it was created.
    pub fn get_or_create_user(&mut self, username: &str) -> Result<(User, bool), StoreError> {
        if let Some(user) = self.state.users.get(username) {
            return Ok((user.clone(), false));
        }

        self.state.last_user_id = self.state.last_user_id.saturating_add(1);
        let user = User::new(UserId(self.state.last_user_id), username);
        self.state.users.insert(user.username.clone(), user.clone());
        self.writes.push(Write::User(user.clone()));
        debug!(user = %user.username, id = %user.id, "user created");

        let signals = self.signals;
        let context = self.context;
        let event = PostSave {
            user: &user,
            created: true,
            context,
        };
        signals.send(&event, self)?;

        Ok((user, true))
    }

    #[must_use]
    pub fn signal_log(&self, user: UserId) -> Option<&SignalLog> {
        self.state.logs.get(&user)
    }

    /// Fetch a user's log, creating one with default fields if absent.
    pub fn get_or_create_signal_log(
        &mut self,
        user: UserId,
    ) -> Result<(SignalLog, bool), StoreError> {
        if let Some(log) = self.state.logs.get(&user) {
            return Ok((log.clone(), false));
        }
        let log = SignalLog::new(user);
        self.upsert_signal_log(log.clone())?;
        Ok((log, true))
    }

    /// Insert the log, or replace the existing log for the same user.
    /// Returns `true` if it was inserted.
    pub fn upsert_signal_log(&mut self, log: SignalLog) -> Result<bool, StoreError> {
        if !self.state.contains_user(log.user) {
            return Err(StoreError::UnknownUser(log.user));
        }
        self.writes.push(Write::SignalLog(log.clone()));
        Ok(self.state.logs.insert(log.user, log).is_none())
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("context", self.context)
            .field("staged_writes", &self.writes.len())
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
    use crate::signal_log;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("test", true)
    }

    #[test]
    fn get_or_create_assigns_sequential_ids() {
        let db = Database::in_memory();
        let (a, created_a) = db.atomic(&ctx(), |tx| tx.get_or_create_user("a")).unwrap();
        let (b, created_b) = db.atomic(&ctx(), |tx| tx.get_or_create_user("b")).unwrap();
        let (again, created_again) = db.atomic(&ctx(), |tx| tx.get_or_create_user("a")).unwrap();

        assert_eq!((a.id, b.id), (UserId(1), UserId(2)));
        assert!(created_a && created_b);
        assert!(!created_again);
        assert_eq!(again, a);
    }

    #[test]
    fn rollback_discards_user_and_handler_writes() {
        let db = Database::in_memory();
        signal_log::install(db.signals());

        let result: Result<(), _> = db.atomic(&ctx(), |tx| {
            tx.get_or_create_user("ghost")?;
            assert!(tx.user_by_name("ghost").is_some());
            Err(StoreError::rollback("Forcing rollback"))
        });

        assert!(result.unwrap_err().is_rollback());
        assert!(db.user_by_name("ghost").is_none());
        assert!(db.signal_log_for_username("ghost").is_none());
        assert!(db.signal_logs().is_empty());
    }

    #[test]
    fn rolled_back_ids_are_reused() {
        let db = Database::in_memory();
        let _ = db.atomic(&ctx(), |tx| -> Result<(), StoreError> {
            tx.get_or_create_user("temp")?;
            Err(StoreError::rollback("no"))
        });
        let (user, _) = db.atomic(&ctx(), |tx| tx.get_or_create_user("kept")).unwrap();
        assert_eq!(user.id, UserId(1));
    }

    #[test]
    fn upsert_creates_then_updates() {
        let db = Database::in_memory();
        let (user, _) = db.atomic(&ctx(), |tx| tx.get_or_create_user("u")).unwrap();

        let mut log = SignalLog::new(user.id);
        let created = db
            .atomic(&ctx(), |tx| tx.upsert_signal_log(log.clone()))
            .unwrap();
        assert!(created);

        log.set_thread_name("other");
        let created = db
            .atomic(&ctx(), |tx| tx.upsert_signal_log(log.clone()))
            .unwrap();
        assert!(!created);

        assert_eq!(db.signal_logs().len(), 1);
        assert_eq!(db.signal_log(user.id).unwrap().thread_name, "other");
    }

    #[test]
    fn upsert_for_unknown_user_fails() {
        let db = Database::in_memory();
        let err = db
            .atomic(&ctx(), |tx| tx.upsert_signal_log(SignalLog::new(UserId(42))))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser(UserId(42))));
    }

    #[test]
    fn get_or_create_log_defaults() {
        let db = Database::in_memory();
        let (log, created) = db
            .atomic(&ctx(), |tx| {
                let (user, _) = tx.get_or_create_user("plain")?;
                tx.get_or_create_signal_log(user.id)
            })
            .unwrap();

        assert!(created);
        assert!(log.is_sync);
        assert_eq!(log.thread_name, signal_log::UNKNOWN_THREAD);
    }

    #[test]
    fn listings_are_ordered_by_id() {
        let db = Database::in_memory();
        for name in ["zed", "amy", "mo"] {
            db.atomic(&ctx(), |tx| tx.get_or_create_user(name)).unwrap();
        }
        let names: Vec<_> = db.users().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["zed", "amy", "mo"]);
    }

    #[test]
    fn redb_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.redb");

        {
            let db = Database::open(&path).unwrap();
            assert!(db.is_persistent());
            signal_log::install(db.signals());
            db.atomic(&ctx(), |tx| tx.get_or_create_user("persisted")).unwrap();
            let _ = db.atomic(&ctx(), |tx| -> Result<(), StoreError> {
                tx.get_or_create_user("discarded")?;
                Err(StoreError::rollback("no"))
            });
        }

        let db = Database::open(&path).unwrap();
        let user = db.user_by_name("persisted").unwrap();
        assert_eq!(user.id, UserId(1));
        assert!(db.user_by_name("discarded").is_none());

        let log = db.signal_log(user.id).unwrap();
        assert_eq!(log.thread_name, "test");
        assert!(log.is_sync);

        // Ids continue after the highest persisted one.
        let (next, _) = db.atomic(&ctx(), |tx| tx.get_or_create_user("next")).unwrap();
        assert_eq!(next.id, UserId(2));
    }
}
