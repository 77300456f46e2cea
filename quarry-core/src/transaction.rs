use crate::{
    Connection, Crud, Database, Result, Session, Transaction, TransactionError,
    TransactionOptions, TransactionStep, future::BoxFuture,
};

/// Transaction of a [`Database`], it accepts the same record operations.
pub struct Tx<'c, C: Connection + 'c> {
    crud: &'c Crud,
    transaction: C::Transaction<'c>,
}

impl<'c, C: Connection + 'c> Tx<'c, C> {
    pub fn transaction(&mut self) -> &mut C::Transaction<'c> {
        &mut self.transaction
    }

    pub async fn commit(self) -> Result<()> {
        self.transaction.commit().await
    }

    pub async fn rollback(self) -> Result<()> {
        self.transaction.rollback().await
    }
}

impl<'c, C: Connection + 'c> Session for Tx<'c, C> {
    type Executor = C::Transaction<'c>;

    fn parts(&mut self) -> (&Crud, &mut Self::Executor) {
        (self.crud, &mut self.transaction)
    }
}

impl<C: Connection> Database<C> {
    /// Starts a transaction, it is rolled back when dropped without a commit.
    pub async fn begin(&mut self, options: TransactionOptions) -> Result<Tx<'_, C>> {
        let transaction = self.connection.begin(options).await?;
        Ok(Tx {
            crud: &self.crud,
            transaction,
        })
    }

    /// [`Database::run_transaction_with`] using the default options.
    pub async fn run_transaction<F>(&mut self, work: F) -> std::result::Result<TransactionStep, TransactionError>
    where
        C: 'static,
        F: for<'t> FnOnce(&'t mut Tx<'_, C>) -> BoxFuture<'t, Result<bool>>,
    {
        self.run_transaction_with(TransactionOptions::default(), work)
            .await
    }

    /// Runs `work` inside a transaction.
    ///
    /// `work` returns whether to commit: `Ok(true)` commits, `Ok(false)` rolls back on
    /// purpose and still succeeds with [`TransactionStep::End`], an error rolls back and
    /// fails with [`TransactionStep::Run`].
    pub async fn run_transaction_with<F>(
        &mut self,
        options: TransactionOptions,
        work: F,
    ) -> std::result::Result<TransactionStep, TransactionError>
    where
        C: 'static,
        F: for<'t> FnOnce(&'t mut Tx<'_, C>) -> BoxFuture<'t, Result<bool>>,
    {
        let mut tx = match self.begin(options).await {
            Ok(tx) => tx,
            Err(error) => {
                log::error!("Could not begin the transaction: {:#}", error);
                return Err(TransactionError::new(TransactionStep::Begin, error));
            }
        };
        match work(&mut tx).await {
            Ok(true) => match tx.commit().await {
                Ok(()) => Ok(TransactionStep::End),
                Err(error) => {
                    log::error!("Could not commit the transaction: {:#}", error);
                    Err(TransactionError::new(TransactionStep::Commit, error))
                }
            },
            Ok(false) => {
                log::debug!("Transaction rolled back on request");
                if let Err(error) = tx.rollback().await {
                    log::error!("Could not roll back the transaction: {:#}", error);
                }
                Ok(TransactionStep::End)
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback().await {
                    log::error!("Could not roll back the transaction: {:#}", rollback);
                }
                Err(TransactionError::new(TransactionStep::Run, error))
            }
        }
    }
}
