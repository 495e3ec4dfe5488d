//! Per-session transaction state driving master stickiness
//!
//! ```text
//! NoTransaction ──begin──▶ InTransactionClean ──write / force──▶ InTransactionDirty
//!       ▲                          │                                   │
//!       └──────────commit / rollback┴───────────────────────────────────┘
//! ```
//!
//! A session is owned by one connection and sees its statements one at a
//! time, so it is `&mut` only and never shared.

use crate::error::{ReplicaError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    #[default]
    NoTransaction,
    InTransactionClean,
    InTransactionDirty,
}

/// Where a statement must go before a concrete replica is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteIntent {
    Master,
    LoadBalance,
}

#[derive(Debug, Default)]
pub struct Session {
    state: TransactionState,
    force_master: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn in_transaction(&self) -> bool {
        self.state != TransactionState::NoTransaction
    }

    /// Open a transaction; nesting is rejected
    pub fn begin(&mut self) -> Result<()> {
        if self.in_transaction() {
            return Err(ReplicaError::transaction(
                "begin",
                "a transaction is already in progress",
            ));
        }
        self.state = TransactionState::InTransactionClean;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.finish("commit")
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.finish("rollback")
    }

    fn finish(&mut self, operation: &'static str) -> Result<()> {
        if !self.in_transaction() {
            return Err(ReplicaError::transaction(operation, "no transaction in progress"));
        }
        debug!(operation, state = ?self.state, "Transaction finished");
        self.state = TransactionState::NoTransaction;
        self.force_master = false;
        Ok(())
    }

    /// Inside a transaction, pin the rest of it to master. Outside one,
    /// send only the next statement to master.
    pub fn force_master(&mut self) {
        self.force_master = true;
    }

    pub fn is_force_master(&self) -> bool {
        self.force_master
    }

    /// Record one statement and decide where it goes.
    ///
    /// `force_master` applies to this statement only, on top of the
    /// session-wide flag.
    pub fn on_statement(&mut self, kind: StatementKind, force_master: bool) -> RouteIntent {
        let forced = force_master || self.force_master;
        match self.state {
            TransactionState::NoTransaction => {
                self.force_master = false;
                if kind == StatementKind::Write || forced {
                    RouteIntent::Master
                } else {
                    RouteIntent::LoadBalance
                }
            }
            TransactionState::InTransactionClean => {
                if kind == StatementKind::Write || forced {
                    debug!(?kind, forced, "Transaction touched master");
                    self.state = TransactionState::InTransactionDirty;
                    RouteIntent::Master
                } else {
                    RouteIntent::LoadBalance
                }
            }
            TransactionState::InTransactionDirty => RouteIntent::Master,
        }
    }
}
