use cesk_common::{Address, EnvError, StoreError};
use thiserror::Error;

pub type MachineResult<T> = Result<T, MachineError>;

/// Shape violations rejected when an [`Expr`](crate::expr::Expr) is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedExpression {
    #[error("`{form}` has {names} names but {inits} initializers")]
    BindingCountMismatch {
        form: &'static str,
        names: usize,
        inits: usize,
    },
    #[error("`begin` requires at least one expression")]
    EmptyBegin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("Unbound identifier `{name}`")]
    UnboundIdentifier { name: String },
    #[error("Address {address} is not allocated in the current store")]
    UnboundAddress { address: Address },
    #[error("`{callee}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        callee: String,
        expected: usize,
        received: usize,
    },
    #[error("Cannot apply non-procedure `{operator}`")]
    NotApplicable { operator: String },
    #[error("Malformed expression: {0}")]
    Malformed(#[from] MalformedExpression),
    #[error("Primitive `{name}` failed: {message}")]
    PrimitiveFailed { name: String, message: String },
    #[error("Evaluation exceeded the step limit of {limit}")]
    StepLimitExceeded { limit: u64 },
}

impl From<EnvError> for MachineError {
    fn from(err: EnvError) -> Self {
        match err {
            EnvError::UnboundIdentifier { name } => MachineError::UnboundIdentifier { name },
        }
    }
}

impl From<StoreError> for MachineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnboundAddress { address } => MachineError::UnboundAddress { address },
        }
    }
}
