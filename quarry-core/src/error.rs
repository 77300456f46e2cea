use std::fmt::{self, Display};
use thiserror::Error;

/// Failures raised by the mapping layer itself.
///
/// They travel inside [`crate::Error`] (an `anyhow::Error`) and can be recovered with
/// `error.downcast_ref::<OrmError>()`. Errors coming from the executor are never
/// wrapped into this type, they are propagated unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrmError {
    #[error(
        "invalid primary key type `{0}` (should be one of the signed or unsigned integers or a string)"
    )]
    InvalidPrimaryKeyType(&'static str),
    #[error("not enough arguments for the `?` markers in `{0}`")]
    NotEnoughArguments(String),
    #[error("too many arguments for the `?` markers in `{0}`")]
    TooManyArguments(String),
    #[error("cannot find any fields related to column `{0}`")]
    UnknownColumn(String),
    #[error("invalid join condition type `{0}` (should be either \"on\" or \"using\")")]
    InvalidJoinConditionType(String),
    #[error("a dialect has already been registered for driver `{0}`")]
    AlreadyRegistered(String),
    #[error("unsupported conversion from {from} into {to}")]
    UnsupportedConversion { from: &'static str, to: &'static str },
    #[error("converting value {value} of type {from} into {to}: {reason}")]
    Conversion {
        value: String,
        from: &'static str,
        to: &'static str,
        reason: String,
    },
    #[error("primary key field `{0}` should not be empty or zero value")]
    EmptyPrimaryKey(String),
    #[error("record `{table}` has no field mapped to the primary key column `{column}`")]
    MissingPrimaryKey { table: String, column: String },
}

impl OrmError {
    pub fn conversion(
        value: impl Display,
        from: &'static str,
        to: &'static str,
        reason: impl Display,
    ) -> Self {
        Self::Conversion {
            value: value.to_string(),
            from,
            to,
            reason: reason.to_string(),
        }
    }
}

/// The phase a transaction reached when [`crate::Database::run_transaction`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStep {
    /// The transaction could not be started.
    Begin,
    /// The unit of work failed, the transaction was rolled back.
    Run,
    /// The commit failed, the transaction was rolled back.
    Commit,
    /// The unit of work completed, committed or deliberately rolled back.
    End,
}

impl Display for TransactionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionStep::Begin => "begin",
            TransactionStep::Run => "run",
            TransactionStep::Commit => "commit",
            TransactionStep::End => "end",
        })
    }
}

#[derive(Debug, Error)]
#[error("transaction failed at the {step} step: {error:#}")]
pub struct TransactionError {
    pub step: TransactionStep,
    pub error: anyhow::Error,
}

impl TransactionError {
    pub fn new(step: TransactionStep, error: anyhow::Error) -> Self {
        Self { step, error }
    }
}
