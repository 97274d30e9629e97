//! Runtime values.
//!
//! Values are immutable and compared with the structural [`Equal`] relation.
//! `Void` is the result of effect-only forms like `set!`, while `Undefined` marks a
//! `letrec` cell whose initializer has not finished yet. Both differ from `Null`, the
//! empty list.
//!
//! A pair's `cdr` spine is dropped and compared in a loop, so lists of any length
//! the machine builds can be released and compared without deep host recursion.
//! Nesting through `car` still recurses.

use std::fmt;
use std::mem;
use std::rc::Rc;

use cesk_common::{equal, Environment, Equal};

use crate::continuation::Continuation;
use crate::expr::{Expr, Identifier};
use crate::primitives::Primitive;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(Rc<str>),
    Symbol(Identifier),
    Boolean(bool),
    Null,
    Void,
    Undefined,
    Pair(Rc<Cons>),
    Closure(Closure),
    Continuation(Continuation),
    Primitive(Primitive),
}

/// The cell behind [`Value::Pair`].
pub struct Cons {
    pub car: Value,
    pub cdr: Value,
}

impl Drop for Cons {
    fn drop(&mut self) {
        // Unlink uniquely owned cells one at a time; a shared tail stays alive.
        let mut tail = mem::replace(&mut self.cdr, Value::Null);
        loop {
            match tail {
                Value::Pair(cell) => match Rc::try_unwrap(cell) {
                    Ok(mut cell) => tail = mem::replace(&mut cell.cdr, Value::Null),
                    Err(_) => break,
                },
                _ => break,
            }
        }
    }
}

impl fmt::Debug for Cons {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut list = f.debug_list();
        let mut current = self;
        loop {
            list.entry(&current.car);
            match &current.cdr {
                Value::Pair(next) => current = &**next,
                Value::Null => break,
                other => {
                    list.entry(&format_args!(". {:?}", other));
                    break;
                }
            }
        }
        list.finish()
    }
}

/// A lambda paired with the environment it was evaluated in.
#[derive(Debug, Clone)]
pub struct Closure {
    pub env: Environment<Identifier>,
    pub formals: Rc<[Identifier]>,
    pub body: Rc<Expr>,
}

impl Equal for Closure {
    fn equal(&self, other: &Self) -> bool {
        equal(&self.formals, &other.formals)
            && equal(&self.body, &other.body)
            && equal(&self.env, &other.env)
    }
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    pub fn symbol(name: &str) -> Self {
        Value::Symbol(Identifier::new(name))
    }

    pub fn cons(car: Value, cdr: Value) -> Self {
        Value::Pair(Rc::new(Cons { car, cdr }))
    }

    /// Builds a proper list ending in `Null`.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        let items: Vec<Value> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Value::Null, |tail, item| Value::cons(item, tail))
    }

    /// Every value except `#f` counts as true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false))
    }

    /// Closures, continuations and primitives can appear in operator position.
    pub fn is_procedure(&self) -> bool {
        matches!(
            self,
            Value::Closure(_) | Value::Continuation(_) | Value::Primitive(_)
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Void => "void",
            Value::Undefined => "undefined",
            Value::Pair(_) => "pair",
            Value::Closure(_) => "closure",
            Value::Continuation(_) => "continuation",
            Value::Primitive(_) => "primitive",
        }
    }

    fn write_list(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Walk the spine iteratively so long lists print without recursion.
        let mut current = self;
        let mut first = true;
        loop {
            match current {
                Value::Pair(cell) => {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", cell.car)?;
                    first = false;
                    current = &cell.cdr;
                }
                Value::Null => return Ok(()),
                other => return write!(f, " . {}", other),
            }
        }
    }
}

impl Equal for Value {
    fn equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => equal(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => equal(a, b),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null)
            | (Value::Void, Value::Void)
            | (Value::Undefined, Value::Undefined) => true,
            (Value::Pair(a), Value::Pair(b)) => pairs_equal(a, b),
            (Value::Closure(a), Value::Closure(b)) => equal(a, b),
            (Value::Continuation(a), Value::Continuation(b)) => equal(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Walks both `cdr` spines together, recursing only into the cars.
fn pairs_equal(mut a: &Rc<Cons>, mut b: &Rc<Cons>) -> bool {
    loop {
        if Rc::ptr_eq(a, b) {
            return true;
        }
        if !equal(&a.car, &b.car) {
            return false;
        }
        match (&a.cdr, &b.cdr) {
            (Value::Pair(x), Value::Pair(y)) => {
                a = x;
                b = y;
            }
            (x, y) => return equal(x, y),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Null => write!(f, "()"),
            Value::Void => write!(f, "#<void>"),
            Value::Undefined => write!(f, "#<undefined>"),
            Value::Pair(_) => {
                write!(f, "(")?;
                self.write_list(f)?;
                write!(f, ")")
            }
            Value::Closure(_) => write!(f, "#<procedure>"),
            Value::Continuation(_) => write!(f, "#<continuation>"),
            Value::Primitive(prim) => write!(f, "{}", prim),
        }
    }
}
