//! Host-supplied primitive procedures.
//!
//! The machine has no built-in arithmetic or list operations. A host wraps its own
//! functions as [`Primitive`]s and seeds them into the initial environment with
//! [`base_environment`]; the cells are hidden so they stay out of store printouts.

use std::fmt;
use std::rc::Rc;

use cesk_common::{bind_lots_hidden, pair, Environment, Pair, Store};
use tracing::trace;

use crate::error::{MachineError, MachineResult};
use crate::expr::Identifier;
use crate::value::Value;

/// Signature of a host function. A returned `Err` becomes
/// [`MachineError::PrimitiveFailed`].
pub type PrimitiveFn = dyn Fn(&[Value]) -> Result<Value, String>;

#[derive(Clone)]
pub struct Primitive {
    name: Rc<str>,
    arity: Option<usize>,
    func: Rc<PrimitiveFn>,
}

impl Primitive {
    /// A primitive taking exactly `arity` arguments.
    pub fn fixed(
        name: &str,
        arity: usize,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Primitive {
            name: Rc::from(name),
            arity: Some(arity),
            func: Rc::new(func),
        }
    }

    /// A primitive accepting any number of arguments.
    pub fn variadic(
        name: &str,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Primitive {
            name: Rc::from(name),
            arity: None,
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Checks the argument count, then runs the host function.
    pub fn call(&self, args: &[Value]) -> MachineResult<Value> {
        if let Some(expected) = self.arity {
            if expected != args.len() {
                return Err(MachineError::ArityMismatch {
                    callee: self.to_string(),
                    expected,
                    received: args.len(),
                });
            }
        }
        trace!(primitive = %self.name, argc = args.len(), "calling primitive");
        (self.func)(args).map_err(|message| MachineError::PrimitiveFailed {
            name: self.name.to_string(),
            message,
        })
    }

    /// Two primitives are the same only if they share one host function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#<primitive:{}>", self.name)
    }
}

/// Builds the initial environment and store for a table of primitives.
///
/// Each primitive is bound under its own name in a hidden cell, in table order,
/// starting from the first address.
pub fn base_environment(
    primitives: impl IntoIterator<Item = Primitive>,
) -> Pair<Environment<Identifier>, Store<Value>> {
    base_bindings(
        primitives
            .into_iter()
            .map(|prim| pair(Identifier::new(prim.name()), Value::Primitive(prim))),
    )
}

/// Like [`base_environment`], but with explicit names and arbitrary values.
pub fn base_bindings(
    bindings: impl IntoIterator<Item = Pair<Identifier, Value>>,
) -> Pair<Environment<Identifier>, Store<Value>> {
    bind_lots_hidden(&Environment::empty(), &Store::new(), bindings)
}
