//! A CESK machine for a small Scheme core with `set!`, `letrec` and `let/cc`.
//!
//! The evaluator is an explicit state machine over (Control, Environment, Store,
//! Kontinuation) configurations:
//! - [`expr`]: The expression forms, validated at construction
//! - [`value`]: Runtime values and their printed representation
//! - [`continuation`]: Suspended computations as a persistent frame stack
//! - [`machine`]: The stepper and the `run` driver loop
//! - [`primitives`]: Host procedures and the base environment
//! - [`config`]: Step limits and tracing switches
//! - [`error`]: Construction and runtime failures
//!
//! ```
//! use cesk_machine::{base_environment, run, Expr, Primitive, Value};
//!
//! let add = Primitive::fixed("+", 2, |args| match (&args[0], &args[1]) {
//!     (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
//!     _ => Err("+ expects numbers".to_string()),
//! });
//! let (env, store) = base_environment([add]);
//!
//! // (+ 1 (let/cc k (+ 10 (k 41))))
//! let expr = Expr::apply(
//!     Expr::id("+"),
//!     [
//!         Expr::number(1.0),
//!         Expr::let_cc(
//!             "k",
//!             Expr::apply(
//!                 Expr::id("+"),
//!                 [Expr::number(10.0), Expr::apply(Expr::id("k"), [Expr::number(41.0)])],
//!             ),
//!         ),
//!     ],
//! );
//! let outcome = run(&expr, &env, &store).unwrap();
//! assert_eq!(outcome.value, Value::Number(42.0));
//! ```

pub mod config;
pub mod continuation;
pub mod error;
pub mod expr;
pub mod machine;
pub mod primitives;
pub mod value;

pub use cesk_common::{equal, Address, Environment, Equal, Store};
pub use config::MachineConfig;
pub use continuation::{Continuation, Frame};
pub use error::{MachineError, MachineResult, MalformedExpression};
pub use expr::{Binding, Expr, Identifier};
pub use machine::{run, Configuration, Control, Machine, Outcome, Transition};
pub use primitives::{base_bindings, base_environment, Primitive, PrimitiveFn};
pub use value::{Closure, Cons, Value};
