//! Transactional statement execution.
//!
//! All statements of one issuance run inside a single transaction on the
//! backing store. The transaction is committed only when every statement
//! succeeded; on any other path it is rolled back before the error is
//! returned.

use std::sync::Arc;

use credmint_store::{Backend, Transaction, TxState};

use crate::error::ExecError;

/// Runs a list of statements atomically against a [`Backend`].
#[derive(Debug)]
pub struct TransactionalExecutor<B: Backend> {
    backend: Arc<B>,
}

impl<B: Backend> Clone for TransactionalExecutor<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend> TransactionalExecutor<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Execute `statements` in order, all or nothing.
    ///
    /// The work runs on its own task, so dropping the returned future does
    /// not abandon an open transaction: it is still committed or rolled
    /// back. Returns the total number of affected rows.
    pub async fn execute(&self, statements: Vec<String>) -> Result<u64, ExecError> {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move { run_transaction(backend.as_ref(), &statements).await })
            .await
            .map_err(|e| ExecError::Aborted(e.to_string()))?
    }
}

async fn run_transaction<B: Backend>(
    backend: &B,
    statements: &[String],
) -> Result<u64, ExecError> {
    let mut tx = backend.begin().await.map_err(ExecError::Begin)?;
    tracing::debug!(statements = statements.len(), "transaction opened");

    let result = run_statements(tx.as_mut(), statements).await;

    if tx.state() != TxState::Committed {
        if let Err(e) = tx.rollback().await {
            tracing::warn!(error = %e, "rollback failed");
        } else {
            tracing::debug!("transaction rolled back");
        }
    }

    result
}

async fn run_statements(
    tx: &mut dyn Transaction,
    statements: &[String],
) -> Result<u64, ExecError> {
    let mut affected = 0;

    for (index, sql) in statements.iter().enumerate() {
        let prepared = tx
            .prepare(sql)
            .await
            .map_err(|source| ExecError::Prepare { index, source })?;
        affected += tx
            .exec(&prepared)
            .await
            .map_err(|source| ExecError::Execute { index, source })?;
    }

    tx.commit().await.map_err(ExecError::Commit)?;
    tracing::debug!(affected, "transaction committed");
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use credmint_store::{MemoryBackend, StoreError};

    fn stmts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn executor() -> (TransactionalExecutor<MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new();
        (TransactionalExecutor::new(Arc::new(backend.clone())), backend)
    }

    #[tokio::test]
    async fn test_all_statements_commit() {
        let (exec, backend) = executor();
        exec.execute(stmts(&[
            "CREATE USER \"u1\" WITH PASSWORD 'p'",
            "GRANT SELECT ON accounts TO \"u1\"",
        ]))
        .await
        .unwrap();

        assert!(backend.has_principal("u1"));
        let stats = backend.stats();
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.rolled_back, 0);
    }

    #[tokio::test]
    async fn test_failing_statement_rolls_back() {
        let (exec, backend) = executor();
        let err = exec
            .execute(stmts(&[
                "CREATE USER \"u1\" WITH PASSWORD 'p'",
                "GRANT BAD_PERMISSION TO \"u1\"",
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Prepare { index: 1, .. }));
        assert!(!backend.has_principal("u1"));
        let stats = backend.stats();
        assert_eq!(stats.committed, 0);
        assert_eq!(stats.rolled_back, 1);
    }

    #[tokio::test]
    async fn test_execute_failure_rolls_back() {
        let (exec, backend) = executor();
        backend.set_fail_statement(Some("GRANT"));
        let err = exec
            .execute(stmts(&[
                "CREATE USER \"u1\" WITH PASSWORD 'p'",
                "GRANT SELECT ON accounts TO \"u1\"",
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Execute { index: 1, .. }));
        assert_eq!(backend.principal_count(), 0);
        assert_eq!(backend.stats().rolled_back, 1);
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back() {
        let (exec, backend) = executor();
        backend.set_fail_commit(true);
        let err = exec
            .execute(stmts(&["CREATE USER \"u1\" WITH PASSWORD 'p'"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Commit(_)));
        assert_eq!(backend.principal_count(), 0);
        assert_eq!(backend.stats().rolled_back, 1);
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_statement_error() {
        let (exec, backend) = executor();
        backend.set_fail_statement(Some("GRANT"));
        backend.set_fail_rollback(true);
        let err = exec
            .execute(stmts(&[
                "CREATE USER \"u1\" WITH PASSWORD 'p'",
                "GRANT SELECT ON accounts TO \"u1\"",
            ]))
            .await
            .unwrap_err();

        match err {
            ExecError::Execute { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(source, StoreError::Rejected(_)));
            }
            other => panic!("expected execute error, got {:?}", other),
        }
        assert_eq!(backend.principal_count(), 0);
        assert_eq!(backend.stats().rolled_back, 0);
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_commit_error() {
        let (exec, backend) = executor();
        backend.set_fail_commit(true);
        backend.set_fail_rollback(true);
        let err = exec
            .execute(stmts(&["CREATE USER \"u1\" WITH PASSWORD 'p'"]))
            .await
            .unwrap_err();

        match err {
            ExecError::Commit(StoreError::Unavailable(msg)) => assert_eq!(msg, "commit failed"),
            other => panic!("expected commit error, got {:?}", other),
        }
        assert_eq!(backend.principal_count(), 0);
    }

    #[tokio::test]
    async fn test_begin_failure_runs_nothing() {
        let (exec, backend) = executor();
        backend.set_fail_begin(true);
        let err = exec
            .execute(stmts(&["CREATE USER \"u1\" WITH PASSWORD 'p'"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Begin(_)));
        let stats = backend.stats();
        assert_eq!(stats.executed, 0);
        assert_eq!(stats.rolled_back, 0);
    }
}
