//! Lazily produced transaction groups.

use forge_keys::KeyDatabase;
use forge_types::Transaction;

use crate::TxgenError;

/// A finite, single-pass group of transactions built on demand.
///
/// `len` is the number of transactions still to come and is known up front,
/// so the scheduler can lay out blocks before any key is derived.
pub trait TransactionSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_transaction(
        &mut self,
        keydb: &mut KeyDatabase,
    ) -> Option<Result<Transaction, TxgenError>>;

    /// Drain the remaining transactions, stopping at the first error.
    fn collect_transactions(
        &mut self,
        keydb: &mut KeyDatabase,
    ) -> Result<Vec<Transaction>, TxgenError> {
        let mut out = Vec::with_capacity(self.len());
        while let Some(tx) = self.next_transaction(keydb) {
            out.push(tx?);
        }
        Ok(out)
    }
}

/// Source over a queue of plans, each turned into a transaction by `build`.
pub(crate) struct PlannedSource<P, F> {
    plans: std::collections::VecDeque<P>,
    build: F,
}

impl<P, F> PlannedSource<P, F>
where
    F: FnMut(P, &mut KeyDatabase) -> Result<Transaction, TxgenError>,
{
    pub(crate) fn new(plans: impl IntoIterator<Item = P>, build: F) -> Self {
        Self {
            plans: plans.into_iter().collect(),
            build,
        }
    }
}

impl<P, F> TransactionSource for PlannedSource<P, F>
where
    F: FnMut(P, &mut KeyDatabase) -> Result<Transaction, TxgenError>,
{
    fn len(&self) -> usize {
        self.plans.len()
    }

    fn next_transaction(
        &mut self,
        keydb: &mut KeyDatabase,
    ) -> Option<Result<Transaction, TxgenError>> {
        let plan = self.plans.pop_front()?;
        Some((self.build)(plan, keydb))
    }
}
