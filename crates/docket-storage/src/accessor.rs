//! Lock levels and transactions for one connection to a [`CodeDb`].

use docket_core::{DocketError, IdAllocators, LockLevel};
use parking_lot::{RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use rusqlite::Connection;

use crate::{unexpected, CodeDb};

/// The guard held on the database's shared ID state.
enum Lock<'db> {
    Unlocked,
    ReadOnly(RwLockReadGuard<'db, IdAllocators>),
    ReadPossibleWrite(RwLockUpgradableReadGuard<'db, IdAllocators>),
    ReadWrite(RwLockWriteGuard<'db, IdAllocators>),
}

impl Lock<'_> {
    fn level(&self) -> LockLevel {
        match self {
            Self::Unlocked => LockLevel::Unlocked,
            Self::ReadOnly(_) => LockLevel::ReadOnly,
            Self::ReadPossibleWrite(_) => LockLevel::ReadPossibleWrite,
            Self::ReadWrite(_) => LockLevel::ReadWrite,
        }
    }
}

/// One connection to a [`CodeDb`] plus the lock level it holds.
///
/// Readers take [`get_read_only_lock`](Self::get_read_only_lock). Code that
/// usually only reads but may need to change something takes
/// [`get_read_possible_write_lock`](Self::get_read_possible_write_lock);
/// operations that write upgrade it to read/write the first time a change
/// is actually needed. Locks are held until released or the accessor is
/// dropped.
///
/// Dropping an accessor inside a transaction rolls the transaction back.
pub struct Accessor<'db> {
    pub(crate) db: &'db CodeDb,
    pub(crate) conn: Connection,
    lock: Lock<'db>,
    in_transaction: bool,
}

impl<'db> Accessor<'db> {
    pub(crate) fn new(db: &'db CodeDb, conn: Connection) -> Self {
        Self {
            db,
            conn,
            lock: Lock::Unlocked,
            in_transaction: false,
        }
    }

    // ── Locks ───────────────────────────────────────────────────────────

    pub fn lock_level(&self) -> LockLevel {
        self.lock.level()
    }

    /// Take a shared lock. Blocks while a writer holds the database.
    pub fn get_read_only_lock(&mut self) -> Result<(), DocketError> {
        self.require_unlocked("GetReadOnlyLock")?;
        self.lock = Lock::ReadOnly(self.db.state().read());
        Ok(())
    }

    /// Take a read lock that can later be upgraded. Only one accessor may
    /// hold this level at a time, though it coexists with read-only locks.
    pub fn get_read_possible_write_lock(&mut self) -> Result<(), DocketError> {
        self.require_unlocked("GetReadPossibleWriteLock")?;
        self.lock = Lock::ReadPossibleWrite(self.db.state().upgradable_read());
        Ok(())
    }

    /// Take an exclusive lock.
    pub fn get_read_write_lock(&mut self) -> Result<(), DocketError> {
        self.require_unlocked("GetReadWriteLock")?;
        self.lock = Lock::ReadWrite(self.db.state().write());
        Ok(())
    }

    /// Upgrade a read/possible write lock to read/write. Blocks until every
    /// read-only lock is released.
    pub fn upgrade_to_read_write(&mut self) -> Result<(), DocketError> {
        let held = self.lock.level();
        if held != LockLevel::ReadPossibleWrite {
            return Err(DocketError::LockViolation {
                operation: "UpgradeToReadWriteLock",
                required: LockLevel::ReadPossibleWrite,
                held,
            });
        }

        self.lock = match std::mem::replace(&mut self.lock, Lock::Unlocked) {
            Lock::ReadPossibleWrite(guard) => {
                Lock::ReadWrite(RwLockUpgradableReadGuard::upgrade(guard))
            }
            other => other,
        };
        tracing::debug!("Upgraded code database lock to read/write");
        Ok(())
    }

    /// Return a read/write lock to read/possible write, letting readers back
    /// in.
    pub(crate) fn downgrade_to_read_possible_write(&mut self) {
        self.lock = match std::mem::replace(&mut self.lock, Lock::Unlocked) {
            Lock::ReadWrite(guard) => {
                Lock::ReadPossibleWrite(RwLockWriteGuard::downgrade_to_upgradable(guard))
            }
            other => other,
        };
    }

    /// Release whatever lock is held. Fails inside a transaction.
    pub fn release_lock(&mut self) -> Result<(), DocketError> {
        if self.in_transaction {
            return Err(DocketError::Transaction(
                "Can't release the lock while a transaction is open",
            ));
        }
        let held = self.lock.level();
        if held == LockLevel::Unlocked {
            return Err(DocketError::LockViolation {
                operation: "ReleaseLock",
                required: LockLevel::ReadOnly,
                held,
            });
        }
        self.lock = Lock::Unlocked;
        Ok(())
    }

    fn require_unlocked(&self, operation: &'static str) -> Result<(), DocketError> {
        match self.lock.level() {
            LockLevel::Unlocked => Ok(()),
            held => Err(DocketError::LockViolation {
                operation,
                required: LockLevel::Unlocked,
                held,
            }),
        }
    }

    /// Fail unless the held lock satisfies `required`, without upgrading.
    pub(crate) fn check_at_least(
        &self,
        operation: &'static str,
        required: LockLevel,
    ) -> Result<(), DocketError> {
        let held = self.lock.level();
        if held >= required {
            Ok(())
        } else {
            Err(DocketError::LockViolation {
                operation,
                required,
                held,
            })
        }
    }

    /// Like [`check_at_least`](Self::check_at_least), but a read/possible
    /// write lock is upgraded when read/write is required.
    pub(crate) fn require_at_least(
        &mut self,
        operation: &'static str,
        required: LockLevel,
    ) -> Result<(), DocketError> {
        if required == LockLevel::ReadWrite && self.lock.level() == LockLevel::ReadPossibleWrite {
            return self.upgrade_to_read_write();
        }
        self.check_at_least(operation, required)
    }

    /// The shared ID state, readable under any lock.
    pub(crate) fn ids(&self, operation: &'static str) -> Result<&IdAllocators, DocketError> {
        match &self.lock {
            Lock::ReadOnly(guard) => Ok(&**guard),
            Lock::ReadPossibleWrite(guard) => Ok(&**guard),
            Lock::ReadWrite(guard) => Ok(&**guard),
            Lock::Unlocked => Err(DocketError::LockViolation {
                operation,
                required: LockLevel::ReadOnly,
                held: LockLevel::Unlocked,
            }),
        }
    }

    /// The shared ID state for mutation. Only available under the write lock.
    pub(crate) fn ids_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut IdAllocators, DocketError> {
        match &mut self.lock {
            Lock::ReadWrite(guard) => Ok(&mut **guard),
            other => Err(DocketError::LockViolation {
                operation,
                required: LockLevel::ReadWrite,
                held: other.level(),
            }),
        }
    }

    // ── Transactions ────────────────────────────────────────────────────

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Start a transaction. Requires read/write, upgrading a read/possible
    /// write lock. Transactions don't nest.
    pub fn begin_transaction(&mut self) -> Result<(), DocketError> {
        self.require_at_least("BeginTransaction", LockLevel::ReadWrite)?;
        if self.in_transaction {
            return Err(DocketError::Transaction(
                "BeginTransaction called while already in a transaction",
            ));
        }
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(unexpected("BeginTransaction"))?;
        self.in_transaction = true;
        Ok(())
    }

    pub fn commit_transaction(&mut self) -> Result<(), DocketError> {
        self.check_at_least("CommitTransaction", LockLevel::ReadWrite)?;
        if !self.in_transaction {
            return Err(DocketError::Transaction(
                "CommitTransaction called without a transaction",
            ));
        }
        self.conn
            .execute_batch("COMMIT")
            .map_err(unexpected("CommitTransaction"))?;
        self.in_transaction = false;
        Ok(())
    }

    /// Roll back the open transaction, if any, while unwinding from another
    /// error. Never fails; a failed rollback is logged.
    ///
    /// This is the only way to roll back. ID allocations made during a
    /// transaction begun with [`begin_transaction`](Self::begin_transaction)
    /// are not undone, so a rolled back operation must not be retried as-is.
    pub fn rollback_transaction_for_exception(&mut self) {
        if !self.in_transaction {
            return;
        }
        self.in_transaction = false;
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::warn!("Rolling back code database transaction failed: {e}");
        }
    }

    /// Begin a transaction unless one is already open.
    pub(crate) fn begin_if_needed(&mut self) -> Result<(), DocketError> {
        if self.in_transaction {
            Ok(())
        } else {
            self.begin_transaction()
        }
    }

    /// Run `body`, which opens a transaction only once it has something to
    /// write. If `body` started one it is committed on success and rolled
    /// back on failure, along with any ID allocations made in it. A
    /// transaction the caller already had open is left alone. A read/possible
    /// write lock upgraded along the way is downgraded again afterwards.
    ///
    /// Returns `body`'s value and whether a transaction was committed.
    pub(crate) fn lazy_transaction<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, DocketError>,
    ) -> Result<(T, bool), DocketError> {
        let downgrade = self.lock.level() == LockLevel::ReadPossibleWrite;
        let outer = self.in_transaction;
        let snapshot = self.ids("LazyTransaction")?.clone();

        let mut result = body(self);
        let started = !outer && self.in_transaction;
        if started {
            result = result.and_then(|value| self.commit_transaction().map(|()| value));
            if result.is_err() {
                self.rollback_transaction_for_exception();
                if let Ok(ids) = self.ids_mut("LazyTransaction") {
                    *ids = snapshot;
                }
            }
        }

        if downgrade {
            self.downgrade_to_read_possible_write();
        }
        result.map(|value| (value, started))
    }
}

impl Drop for Accessor<'_> {
    fn drop(&mut self) {
        if self.in_transaction {
            tracing::warn!("Code database accessor dropped inside a transaction; rolling back");
            self.rollback_transaction_for_exception();
        }
    }
}
