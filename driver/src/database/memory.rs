use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::prelude::entity::{
    AvailableQuantity, BookId, BookInventory, Loan, LoanId, LoanStatus, ReturnedAt,
};
use kernel::KernelError;

use crate::config::LendingConfig;

pub use self::{inventory::*, loan::*};

mod inventory;
mod loan;

/// Process-local store with the same isolation guarantees as the PostgreSQL
/// adapter: per-book exclusive row locks held until commit or roll back, and
/// writes that become visible all at once on commit.
#[derive(Clone)]
pub struct InMemoryDatabase(Arc<Shared>);

struct Shared {
    committed: RwLock<Committed>,
    row_locks: Mutex<HashMap<BookId, Arc<Mutex<()>>>>,
    lock_timeout: Duration,
}

#[derive(Default)]
struct Committed {
    books: HashMap<BookId, BookInventory>,
    loans: Vec<Loan>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::with_lock_timeout(LendingConfig::default().lock_timeout())
    }

    pub fn from_config(config: &LendingConfig) -> Self {
        Self::with_lock_timeout(config.lock_timeout())
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self(Arc::new(Shared {
            committed: RwLock::new(Committed::default()),
            row_locks: Mutex::new(HashMap::new()),
            lock_timeout,
        }))
    }
}

#[cfg(test)]
impl InMemoryDatabase {
    pub(in crate::database) async fn tracked_rows(&self) -> usize {
        self.0.row_locks.lock().await.len()
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DatabaseConnection for InMemoryDatabase {
    type Transaction = InMemoryTransaction;
    async fn transact(&self) -> error_stack::Result<Self::Transaction, KernelError> {
        Ok(InMemoryTransaction {
            shared: Arc::clone(&self.0),
            locks: HashMap::new(),
            staged: Staged::default(),
        })
    }
}

pub struct InMemoryTransaction {
    shared: Arc<Shared>,
    locks: HashMap<BookId, OwnedMutexGuard<()>>,
    staged: Staged,
}

#[derive(Default)]
struct Staged {
    books: Vec<BookInventory>,
    deltas: HashMap<BookId, i32>,
    loans: Vec<Loan>,
    returns: HashMap<LoanId, (LoanStatus, ReturnedAt)>,
}

impl InMemoryTransaction {
    pub(in crate::database) async fn lock_row(
        &mut self,
        id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        if self.locks.contains_key(id) {
            return Ok(());
        }
        let row = {
            let mut row_locks = self.shared.row_locks.lock().await;
            Arc::clone(row_locks.entry(id.clone()).or_default())
        };
        let guard = tokio::time::timeout(self.shared.lock_timeout, row.lock_owned())
            .await
            .change_context_lazy(|| KernelError::Timeout)
            .attach_printable_lazy(|| format!("Lock wait on book {:?} timed out", id))?;
        self.locks.insert(id.clone(), guard);
        Ok(())
    }

    /// Releases a lock taken on a row that turned out not to exist and forgets
    /// the row's mutex once nobody else holds or awaits it.
    pub(in crate::database) async fn unlock_row(&mut self, id: &BookId) {
        if self.staged.deltas.contains_key(id) {
            return;
        }
        self.locks.remove(id);
        let mut row_locks = self.shared.row_locks.lock().await;
        if row_locks
            .get(id)
            .is_some_and(|row| Arc::strong_count(row) == 1)
        {
            row_locks.remove(id);
        }
    }

    pub(in crate::database) fn holds_lock(&self, id: &BookId) -> bool {
        self.locks.contains_key(id)
    }

    /// Committed row with this transaction's own changes applied.
    pub(in crate::database) async fn inventory(&self, id: &BookId) -> Option<BookInventory> {
        let committed = self.shared.committed.read().await;
        let base = committed
            .books
            .get(id)
            .or_else(|| self.staged.books.iter().find(|book| book.id() == id))?;
        let delta = self.staged.deltas.get(id).copied().unwrap_or(0);
        Some(BookInventory::new(
            base.id().clone(),
            AvailableQuantity::new(*base.available().as_ref() + delta),
        ))
    }

    pub(in crate::database) async fn loans(&self) -> Vec<Loan> {
        let committed = self.shared.committed.read().await;
        committed
            .loans
            .iter()
            .chain(self.staged.loans.iter())
            .map(|loan| self.staged.overlay(loan))
            .collect()
    }

    pub(in crate::database) fn stage_book(&mut self, inventory: BookInventory) {
        self.staged.books.push(inventory);
    }

    pub(in crate::database) fn stage_delta(&mut self, id: &BookId, delta: i32) {
        *self.staged.deltas.entry(id.clone()).or_insert(0) += delta;
    }

    pub(in crate::database) fn stage_loan(&mut self, loan: Loan) {
        self.staged.loans.push(loan);
    }

    pub(in crate::database) fn stage_return(
        &mut self,
        id: &LoanId,
        status: LoanStatus,
        returned_at: ReturnedAt,
    ) {
        self.staged.returns.insert(id.clone(), (status, returned_at));
    }
}

impl Staged {
    fn overlay(&self, loan: &Loan) -> Loan {
        match self.returns.get(loan.id()) {
            Some((status, returned_at)) => loan.clone().reconstruct(|loan| {
                loan.status = *status;
                loan.returned_at = Some(returned_at.clone());
            }),
            None => loan.clone(),
        }
    }

    fn validate(&self, committed: &Committed) -> error_stack::Result<(), KernelError> {
        for book in &self.books {
            if committed.books.contains_key(book.id()) {
                return Err(Report::new(KernelError::Concurrency)
                    .attach_printable(format!("Book {:?} already exists", book.id())));
            }
        }
        for (id, delta) in &self.deltas {
            let available = committed
                .books
                .get(id)
                .or_else(|| self.books.iter().find(|book| book.id() == id))
                .map(|book| *book.available().as_ref())
                .ok_or_else(|| {
                    Report::new(KernelError::Internal)
                        .attach_printable(format!("Book {:?} vanished before commit", id))
                })?;
            if available + delta < 0 {
                return Err(Report::new(KernelError::Internal)
                    .attach_printable(format!("Book {:?} would drop below zero", id)));
            }
        }
        for id in self.returns.keys() {
            let open = committed
                .loans
                .iter()
                .chain(self.loans.iter())
                .any(|loan| loan.id() == id && loan.is_borrowed());
            if !open {
                return Err(Report::new(KernelError::Concurrency)
                    .attach_printable(format!("Loan {:?} is no longer borrowed", id)));
            }
        }
        Ok(())
    }

    fn apply(self, committed: &mut Committed) {
        for book in self.books {
            committed.books.insert(book.id().clone(), book);
        }
        for (id, delta) in self.deltas {
            if let Some(book) = committed.books.get_mut(&id) {
                let next = *book.available().as_ref() + delta;
                *book = BookInventory::new(id, AvailableQuantity::new(next));
            }
        }
        committed.loans.extend(self.loans);
        for loan in committed.loans.iter_mut() {
            if let Some((status, returned_at)) = self.returns.get(loan.id()) {
                *loan = loan.clone().reconstruct(|loan| {
                    loan.status = *status;
                    loan.returned_at = Some(returned_at.clone());
                });
            }
        }
    }
}

#[async_trait::async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        let InMemoryTransaction {
            shared,
            locks,
            staged,
        } = self;
        {
            let mut committed = shared.committed.write().await;
            staged.validate(&committed)?;
            staged.apply(&mut committed);
        }
        // Row locks are released only after the new state is visible.
        drop(locks);
        Ok(())
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        Ok(())
    }
}
