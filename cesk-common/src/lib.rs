//! # CESK Common
//!
//! Persistent building blocks shared by the CESK machine. Nothing here is ever
//! mutated after it is handed out: every "update" returns a new value that shares
//! structure with the old one.
//!
//! ## Modules
//!
//! - [`list`]: Immutable singly linked lists with structural sharing
//! - [`equal`]: Structural equality (NaN equals NaN, sequences element-wise)
//! - [`store`]: Addresses and the persistent address-to-value store
//! - [`environment`]: Persistent identifier-to-address environments, plus `bind`
//! - [`error`]: Store and environment failures
//!
//! ## Design Principles
//!
//! 1. **Pure Functional**: Operations return new values instead of mutating
//! 2. **Structural Sharing**: Extending a list, environment or store is cheap
//! 3. **Explicit Failure**: Lookups of unbound names or addresses return `Err`
//! 4. **No `Rc<RefCell<T>>`**: Mutation is modelled by threading new stores

pub mod environment;
pub mod equal;
pub mod error;
pub mod list;
pub mod store;

// Re-export main types for convenience
pub use environment::{bind, bind_lots, bind_lots_hidden, Environment};
pub use equal::{equal, Equal};
pub use error::{EnvError, StoreError};
pub use list::{cons, pair, List, Pair};
pub use store::{Address, Store};
