//! Continuations: the reified rest of the computation.
//!
//! A [`Continuation`] is a stack of [`Frame`]s kept in a persistent list, so
//! capturing one with `let/cc` is a pointer copy, and pushing a frame shares the
//! whole chain underneath it. The empty stack is the `halt` continuation.
//!
//! Each frame records one suspension point of the machine, i.e. what to do with
//! the value of the sub-expression currently being evaluated.

use std::fmt;
use std::rc::Rc;

use cesk_common::{equal, Address, Environment, Equal, List, Pair};

use crate::expr::{Binding, Expr, Identifier};
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum Frame {
    /// Waiting for the test of an `if`
    If {
        env: Environment<Identifier>,
        consequent: Rc<Expr>,
        alternative: Rc<Expr>,
    },

    /// Waiting for an `and` operand; `remaining` is never empty
    And {
        env: Environment<Identifier>,
        remaining: List<Expr>,
    },

    /// Waiting for an `or` operand; `remaining` is never empty
    Or {
        env: Environment<Identifier>,
        remaining: List<Expr>,
    },

    /// Waiting for a `begin` expression whose value is discarded
    Begin {
        env: Environment<Identifier>,
        remaining: List<Expr>,
    },

    /// Waiting for the initializer of `name`.
    ///
    /// `evaluated` holds the finished bindings, most recent first.
    Let {
        env: Environment<Identifier>,
        name: Identifier,
        evaluated: List<Pair<Identifier, Value>>,
        pending: List<Binding>,
        body: Rc<Expr>,
    },

    /// Waiting for the initializer whose cell is `address`.
    ///
    /// `env` already binds every name of the `letrec`.
    Letrec {
        env: Environment<Identifier>,
        address: Address,
        pending: List<Pair<Address, Expr>>,
        body: Rc<Expr>,
    },

    /// Waiting for the right-hand side of a `set!`
    Set { address: Address },

    /// Waiting for the operator of an application
    Rator {
        env: Environment<Identifier>,
        operands: List<Expr>,
    },

    /// Waiting for an operand.
    ///
    /// `arguments` holds the operand values seen so far, most recent first.
    Rand {
        env: Environment<Identifier>,
        operator: Value,
        arguments: List<Value>,
        pending: List<Expr>,
    },
}

impl Frame {
    pub fn tag(&self) -> &'static str {
        match self {
            Frame::If { .. } => "if",
            Frame::And { .. } => "and",
            Frame::Or { .. } => "or",
            Frame::Begin { .. } => "begin",
            Frame::Let { .. } => "let",
            Frame::Letrec { .. } => "letrec",
            Frame::Set { .. } => "set!",
            Frame::Rator { .. } => "rator",
            Frame::Rand { .. } => "rand",
        }
    }
}

impl Equal for Frame {
    fn equal(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Frame::If {
                    env: e1,
                    consequent: c1,
                    alternative: a1,
                },
                Frame::If {
                    env: e2,
                    consequent: c2,
                    alternative: a2,
                },
            ) => equal(c1, c2) && equal(a1, a2) && equal(e1, e2),
            (
                Frame::And {
                    env: e1,
                    remaining: r1,
                },
                Frame::And {
                    env: e2,
                    remaining: r2,
                },
            )
            | (
                Frame::Or {
                    env: e1,
                    remaining: r1,
                },
                Frame::Or {
                    env: e2,
                    remaining: r2,
                },
            )
            | (
                Frame::Begin {
                    env: e1,
                    remaining: r1,
                },
                Frame::Begin {
                    env: e2,
                    remaining: r2,
                },
            ) => equal(r1, r2) && equal(e1, e2),
            (
                Frame::Let {
                    env: e1,
                    name: n1,
                    evaluated: v1,
                    pending: p1,
                    body: b1,
                },
                Frame::Let {
                    env: e2,
                    name: n2,
                    evaluated: v2,
                    pending: p2,
                    body: b2,
                },
            ) => {
                equal(n1, n2)
                    && equal(v1, v2)
                    && equal(p1, p2)
                    && equal(b1, b2)
                    && equal(e1, e2)
            }
            (
                Frame::Letrec {
                    env: e1,
                    address: a1,
                    pending: p1,
                    body: b1,
                },
                Frame::Letrec {
                    env: e2,
                    address: a2,
                    pending: p2,
                    body: b2,
                },
            ) => a1 == a2 && equal(p1, p2) && equal(b1, b2) && equal(e1, e2),
            (Frame::Set { address: a1 }, Frame::Set { address: a2 }) => a1 == a2,
            (
                Frame::Rator {
                    env: e1,
                    operands: o1,
                },
                Frame::Rator {
                    env: e2,
                    operands: o2,
                },
            ) => equal(o1, o2) && equal(e1, e2),
            (
                Frame::Rand {
                    env: e1,
                    operator: f1,
                    arguments: a1,
                    pending: p1,
                },
                Frame::Rand {
                    env: e2,
                    operator: f2,
                    arguments: a2,
                    pending: p2,
                },
            ) => equal(f1, f2) && equal(a1, a2) && equal(p1, p2) && equal(e1, e2),
            _ => false,
        }
    }
}

/// A chain of frames ending in `halt`.
#[derive(Clone, Default)]
pub struct Continuation {
    frames: List<Frame>,
}

impl Continuation {
    /// The terminal continuation: delivering a value to it ends the run.
    pub fn halt() -> Self {
        Continuation {
            frames: List::empty(),
        }
    }

    pub fn is_halt(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns a continuation that runs `frame` first, then `self`.
    pub fn push(&self, frame: Frame) -> Self {
        Continuation {
            frames: self.frames.cons(frame),
        }
    }

    /// Splits off the innermost frame. `None` means `halt`.
    pub fn pop(&self) -> Option<(&Frame, Continuation)> {
        self.frames
            .split_first()
            .map(|(frame, rest)| (frame, Continuation { frames: rest }))
    }

    /// Number of frames above `halt`.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Tag of the innermost frame, or `"halt"`.
    pub fn tag(&self) -> &'static str {
        self.frames.head().map_or("halt", Frame::tag)
    }

    /// Frames from innermost to outermost.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.frames.ptr_eq(&other.frames)
    }
}

impl Equal for Continuation {
    fn equal(&self, other: &Self) -> bool {
        self.ptr_eq(other) || equal(&self.frames, &other.frames)
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Continuation")?;
        f.debug_list()
            .entries(self.frames.iter().map(Frame::tag))
            .entry(&"halt")
            .finish()
    }
}
