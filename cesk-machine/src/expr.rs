//! Expressions of the core language.
//!
//! An [`Expr`] is built once by a reader or by hand and never mutated by the machine.
//! Children are reference counted, so cloning a sub-expression into a continuation
//! frame is cheap.
//!
//! Shape rules are enforced by the types where possible: formals are always
//! identifiers, `let`/`letrec` keep names and initializers zipped together, and a
//! `begin` always has a first expression. The fallible constructors
//! ([`Expr::let_`], [`Expr::letrec`], [`Expr::begin`]) report the remaining
//! violations as [`MalformedExpression`].
//!
//! Dropping and comparing an expression walk the tree with an explicit worklist,
//! so nesting depth is limited by memory. `Display` and `Debug` recurse and need
//! host stack in proportion to the nesting depth.

use std::fmt;
use std::mem;
use std::rc::Rc;

use cesk_common::{equal, pair, Equal, List, Pair};

use crate::error::MalformedExpression;

/// A variable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Rc<str>);

impl Identifier {
    pub fn new(name: &str) -> Self {
        Identifier(Rc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::new(name)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier(Rc::from(name))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Equal for Identifier {
    fn equal(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

/// A name together with the expression that initializes it.
pub type Binding = Pair<Identifier, Expr>;

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64),
    String(Rc<str>),
    /// Quoted symbol literal
    Symbol(Identifier),
    Boolean(bool),

    /// Variable reference
    Id(Identifier),

    Lambda {
        formals: Rc<[Identifier]>,
        body: Rc<Expr>,
    },

    /// Initializers are evaluated in the outer environment
    Let {
        bindings: List<Binding>,
        body: Rc<Expr>,
    },

    /// Every initializer sees every name
    Letrec {
        bindings: List<Binding>,
        body: Rc<Expr>,
    },

    LetCc {
        name: Identifier,
        body: Rc<Expr>,
    },

    Set {
        name: Identifier,
        rhs: Rc<Expr>,
    },

    If {
        test: Rc<Expr>,
        consequent: Rc<Expr>,
        alternative: Rc<Expr>,
    },

    And(List<Expr>),
    Or(List<Expr>),

    Begin {
        first: Rc<Expr>,
        rest: List<Expr>,
    },

    Application {
        operator: Rc<Expr>,
        operands: List<Expr>,
    },
}

impl Expr {
    pub fn number(n: f64) -> Self {
        Expr::Number(n)
    }

    pub fn string(s: &str) -> Self {
        Expr::String(Rc::from(s))
    }

    pub fn symbol(name: &str) -> Self {
        Expr::Symbol(Identifier::new(name))
    }

    pub fn boolean(b: bool) -> Self {
        Expr::Boolean(b)
    }

    pub fn id(name: &str) -> Self {
        Expr::Id(Identifier::new(name))
    }

    pub fn lambda<I>(formals: I, body: Expr) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Identifier>,
    {
        Expr::Lambda {
            formals: formals.into_iter().map(Into::into).collect(),
            body: Rc::new(body),
        }
    }

    /// `(let ((name init) ...) body)`
    ///
    /// # Errors
    ///
    /// [`MalformedExpression::BindingCountMismatch`] if `names` and `inits` differ in length.
    pub fn let_<I>(
        names: I,
        inits: impl IntoIterator<Item = Expr>,
        body: Expr,
    ) -> Result<Self, MalformedExpression>
    where
        I: IntoIterator,
        I::Item: Into<Identifier>,
    {
        Ok(Expr::Let {
            bindings: zip_bindings("let", names, inits)?,
            body: Rc::new(body),
        })
    }

    /// `(letrec ((name init) ...) body)`
    ///
    /// # Errors
    ///
    /// [`MalformedExpression::BindingCountMismatch`] if `names` and `inits` differ in length.
    pub fn letrec<I>(
        names: I,
        inits: impl IntoIterator<Item = Expr>,
        body: Expr,
    ) -> Result<Self, MalformedExpression>
    where
        I: IntoIterator,
        I::Item: Into<Identifier>,
    {
        Ok(Expr::Letrec {
            bindings: zip_bindings("letrec", names, inits)?,
            body: Rc::new(body),
        })
    }

    pub fn let_cc(name: &str, body: Expr) -> Self {
        Expr::LetCc {
            name: Identifier::new(name),
            body: Rc::new(body),
        }
    }

    pub fn set(name: &str, rhs: Expr) -> Self {
        Expr::Set {
            name: Identifier::new(name),
            rhs: Rc::new(rhs),
        }
    }

    pub fn if_(test: Expr, consequent: Expr, alternative: Expr) -> Self {
        Expr::If {
            test: Rc::new(test),
            consequent: Rc::new(consequent),
            alternative: Rc::new(alternative),
        }
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Self {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Or(exprs.into_iter().collect())
    }

    /// `(begin e1 e2 ...)`
    ///
    /// # Errors
    ///
    /// [`MalformedExpression::EmptyBegin`] if `exprs` is empty.
    pub fn begin(exprs: impl IntoIterator<Item = Expr>) -> Result<Self, MalformedExpression> {
        let mut exprs = exprs.into_iter();
        let first = exprs.next().ok_or(MalformedExpression::EmptyBegin)?;
        Ok(Expr::Begin {
            first: Rc::new(first),
            rest: exprs.collect(),
        })
    }

    pub fn apply(operator: Expr, operands: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Application {
            operator: Rc::new(operator),
            operands: operands.into_iter().collect(),
        }
    }

    /// Numbers, strings, quoted symbols and booleans.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Number(_) | Expr::String(_) | Expr::Symbol(_) | Expr::Boolean(_)
        )
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, Expr::Id(_))
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self, Expr::Lambda { .. })
    }

    pub fn is_application(&self) -> bool {
        matches!(self, Expr::Application { .. })
    }

    /// Short name of the expression form, used in trace output.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Number(_) => "number",
            Expr::String(_) => "string",
            Expr::Symbol(_) => "symbol",
            Expr::Boolean(_) => "boolean",
            Expr::Id(_) => "identifier",
            Expr::Lambda { .. } => "lambda",
            Expr::Let { .. } => "let",
            Expr::Letrec { .. } => "letrec",
            Expr::LetCc { .. } => "let/cc",
            Expr::Set { .. } => "set!",
            Expr::If { .. } => "if",
            Expr::And(_) => "and",
            Expr::Or(_) => "or",
            Expr::Begin { .. } => "begin",
            Expr::Application { .. } => "application",
        }
    }
}

fn zip_bindings<I>(
    form: &'static str,
    names: I,
    inits: impl IntoIterator<Item = Expr>,
) -> Result<List<Binding>, MalformedExpression>
where
    I: IntoIterator,
    I::Item: Into<Identifier>,
{
    let names: Vec<Identifier> = names.into_iter().map(Into::into).collect();
    let inits: Vec<Expr> = inits.into_iter().collect();
    if names.len() != inits.len() {
        return Err(MalformedExpression::BindingCountMismatch {
            form,
            names: names.len(),
            inits: inits.len(),
        });
    }
    Ok(names
        .into_iter()
        .zip(inits)
        .map(|(name, init)| pair(name, init))
        .collect())
}

impl Expr {
    /// Moves every uniquely owned compound child into `out`, leaving leaves behind.
    fn detach_children(&mut self, out: &mut Vec<Expr>) {
        fn take(child: &mut Rc<Expr>, out: &mut Vec<Expr>) {
            if let Some(expr) = Rc::get_mut(child) {
                if !expr.is_literal() && !expr.is_identifier() {
                    out.push(mem::replace(expr, Expr::Boolean(false)));
                }
            }
        }

        match self {
            Expr::Number(_)
            | Expr::String(_)
            | Expr::Symbol(_)
            | Expr::Boolean(_)
            | Expr::Id(_) => {}
            Expr::Lambda { body, .. } | Expr::LetCc { body, .. } => take(body, out),
            Expr::Set { rhs, .. } => take(rhs, out),
            Expr::Let { bindings, body } | Expr::Letrec { bindings, body } => {
                take(body, out);
                out.extend(bindings.take_unique().into_iter().map(|(_, init)| init));
            }
            Expr::If {
                test,
                consequent,
                alternative,
            } => {
                take(test, out);
                take(consequent, out);
                take(alternative, out);
            }
            Expr::And(exprs) | Expr::Or(exprs) => out.extend(exprs.take_unique()),
            Expr::Begin { first, rest } => {
                take(first, out);
                out.extend(rest.take_unique());
            }
            Expr::Application { operator, operands } => {
                take(operator, out);
                out.extend(operands.take_unique());
            }
        }
    }

    /// Compares the node itself and queues its children for comparison.
    fn shallow_equal<'a>(
        &'a self,
        other: &'a Self,
        pending: &mut Vec<(&'a Expr, &'a Expr)>,
    ) -> bool {
        match (self, other) {
            (Expr::Number(a), Expr::Number(b)) => equal(a, b),
            (Expr::String(a), Expr::String(b)) => a == b,
            (Expr::Symbol(a), Expr::Symbol(b)) | (Expr::Id(a), Expr::Id(b)) => equal(a, b),
            (Expr::Boolean(a), Expr::Boolean(b)) => a == b,
            (
                Expr::Lambda { formals: f1, body: b1 },
                Expr::Lambda { formals: f2, body: b2 },
            ) => {
                pending.push((&**b1, &**b2));
                equal(f1, f2)
            }
            (
                Expr::Let { bindings: x1, body: b1 },
                Expr::Let { bindings: x2, body: b2 },
            )
            | (
                Expr::Letrec { bindings: x1, body: b1 },
                Expr::Letrec { bindings: x2, body: b2 },
            ) => {
                pending.push((&**b1, &**b2));
                if x1.ptr_eq(x2) {
                    return true;
                }
                if x1.len() != x2.len() {
                    return false;
                }
                for ((n1, i1), (n2, i2)) in x1.iter().zip(x2) {
                    if !equal(n1, n2) {
                        return false;
                    }
                    pending.push((i1, i2));
                }
                true
            }
            (Expr::LetCc { name: n1, body: b1 }, Expr::LetCc { name: n2, body: b2 }) => {
                pending.push((&**b1, &**b2));
                equal(n1, n2)
            }
            (Expr::Set { name: n1, rhs: r1 }, Expr::Set { name: n2, rhs: r2 }) => {
                pending.push((&**r1, &**r2));
                equal(n1, n2)
            }
            (
                Expr::If { test: t1, consequent: c1, alternative: a1 },
                Expr::If { test: t2, consequent: c2, alternative: a2 },
            ) => {
                pending.extend([(&**t1, &**t2), (&**c1, &**c2), (&**a1, &**a2)]);
                true
            }
            (Expr::And(a), Expr::And(b)) | (Expr::Or(a), Expr::Or(b)) => {
                queue_all(a, b, pending)
            }
            (
                Expr::Begin { first: f1, rest: r1 },
                Expr::Begin { first: f2, rest: r2 },
            ) => {
                pending.push((&**f1, &**f2));
                queue_all(r1, r2, pending)
            }
            (
                Expr::Application { operator: o1, operands: a1 },
                Expr::Application { operator: o2, operands: a2 },
            ) => {
                pending.push((&**o1, &**o2));
                queue_all(a1, a2, pending)
            }
            _ => false,
        }
    }
}

fn queue_all<'a>(
    xs: &'a List<Expr>,
    ys: &'a List<Expr>,
    pending: &mut Vec<(&'a Expr, &'a Expr)>,
) -> bool {
    if xs.ptr_eq(ys) {
        return true;
    }
    if xs.len() != ys.len() {
        return false;
    }
    pending.extend(xs.iter().zip(ys));
    true
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.detach_children(&mut pending);
        }
    }
}

impl Equal for Expr {
    fn equal(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((lhs, rhs)) = pending.pop() {
            if !std::ptr::eq(lhs, rhs) && !lhs.shallow_equal(rhs, &mut pending) {
                return false;
            }
        }
        true
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other)
    }
}

fn write_spaced<T: fmt::Display>(
    f: &mut fmt::Formatter,
    items: impl IntoIterator<Item = T>,
) -> fmt::Result {
    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_bindings(f: &mut fmt::Formatter, bindings: &List<Binding>) -> fmt::Result {
    write!(f, "(")?;
    for (idx, (name, init)) in bindings.iter().enumerate() {
        if idx > 0 {
            write!(f, " ")?;
        }
        write!(f, "({} {})", name, init)?;
    }
    write!(f, ")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::String(s) => write!(f, "\"{}\"", s),
            Expr::Symbol(s) => write!(f, "'{}", s),
            Expr::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Expr::Id(name) => write!(f, "{}", name),
            Expr::Lambda { formals, body } => {
                write!(f, "(lambda (")?;
                write_spaced(f, formals.iter())?;
                write!(f, ") {})", body)
            }
            Expr::Let { bindings, body } => {
                write!(f, "(let ")?;
                write_bindings(f, bindings)?;
                write!(f, " {})", body)
            }
            Expr::Letrec { bindings, body } => {
                write!(f, "(letrec ")?;
                write_bindings(f, bindings)?;
                write!(f, " {})", body)
            }
            Expr::LetCc { name, body } => write!(f, "(let/cc {} {})", name, body),
            Expr::Set { name, rhs } => write!(f, "(set! {} {})", name, rhs),
            Expr::If {
                test,
                consequent,
                alternative,
            } => write!(f, "(if {} {} {})", test, consequent, alternative),
            Expr::And(exprs) => {
                write!(f, "(and")?;
                for expr in exprs {
                    write!(f, " {}", expr)?;
                }
                write!(f, ")")
            }
            Expr::Or(exprs) => {
                write!(f, "(or")?;
                for expr in exprs {
                    write!(f, " {}", expr)?;
                }
                write!(f, ")")
            }
            Expr::Begin { first, rest } => {
                write!(f, "(begin {}", first)?;
                for expr in rest {
                    write!(f, " {}", expr)?;
                }
                write!(f, ")")
            }
            Expr::Application { operator, operands } => {
                write!(f, "({}", operator)?;
                for operand in operands {
                    write!(f, " {}", operand)?;
                }
                write!(f, ")")
            }
        }
    }
}
