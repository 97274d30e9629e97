use thiserror::Error;

use crate::store::Address;

/// Failures of [`Store`](crate::store::Store) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("address {address} is not allocated")]
    UnboundAddress { address: Address },
}

/// Failures of [`Environment`](crate::environment::Environment) lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("identifier `{name}` is not bound")]
    UnboundIdentifier { name: String },
}
