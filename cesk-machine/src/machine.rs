//! The CESK stepper.
//!
//! A [`Configuration`] holds the control (an expression to evaluate or a value to
//! deliver), the environment, the store and the continuation. [`Machine::step`]
//! performs one transition and returns the next configuration instead of calling
//! itself, and [`Machine::run`] iterates it in a plain loop. Language-level
//! recursion therefore grows the continuation, never the host stack.
//!
//! Key concepts:
//! - `eval_dispatch` handles the "evaluate" half-step, one arm per expression form
//! - `continue_dispatch` resumes the innermost suspended [`Frame`]
//! - `apply_dispatch` applies closures, continuations and primitives
//! - `let/cc` captures the continuation as a value, and invoking that value throws
//!   away the continuation of the call site

use std::rc::Rc;

use cesk_common::{bind, bind_lots, pair, Address, Environment, List, Pair, Store};
use tracing::{debug, trace, warn};

use crate::config::MachineConfig;
use crate::continuation::{Continuation, Frame};
use crate::error::{MachineError, MachineResult};
use crate::expr::{Binding, Expr, Identifier};
use crate::value::{Closure, Value};

/// What the machine is doing in the current configuration.
#[derive(Debug, Clone)]
pub enum Control {
    /// Evaluate an expression in the configuration's environment
    Eval(Expr),
    /// Hand a finished value to the continuation
    Deliver(Value),
}

/// A complete, inspectable machine state.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub control: Control,
    pub env: Environment<Identifier>,
    pub store: Store<Value>,
    pub kont: Continuation,
}

/// The result of a finished run: the delivered value and the final store.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub value: Value,
    pub store: Store<Value>,
}

#[derive(Debug, Clone)]
pub enum Transition {
    Next(Configuration),
    Halt(Outcome),
}

fn eval(
    expr: Expr,
    env: Environment<Identifier>,
    store: Store<Value>,
    kont: Continuation,
) -> MachineResult<Transition> {
    Ok(Transition::Next(Configuration {
        control: Control::Eval(expr),
        env,
        store,
        kont,
    }))
}

fn deliver(
    value: Value,
    env: Environment<Identifier>,
    store: Store<Value>,
    kont: Continuation,
) -> MachineResult<Transition> {
    Ok(Transition::Next(Configuration {
        control: Control::Deliver(value),
        env,
        store,
        kont,
    }))
}

#[derive(Debug, Clone, Default)]
pub struct Machine {
    config: MachineConfig,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        Machine { config }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Builds the initial configuration for `expr` under the `halt` continuation.
    pub fn inject(
        expr: Expr,
        env: &Environment<Identifier>,
        store: &Store<Value>,
    ) -> Configuration {
        Configuration {
            control: Control::Eval(expr),
            env: env.clone(),
            store: store.clone(),
            kont: Continuation::halt(),
        }
    }

    /// Evaluates `expr` to completion.
    ///
    /// # Errors
    ///
    /// Any [`MachineError`] raised by a transition ends the run. With a configured
    /// `max_steps`, running longer fails with [`MachineError::StepLimitExceeded`].
    pub fn run(
        &self,
        expr: &Expr,
        env: &Environment<Identifier>,
        store: &Store<Value>,
    ) -> MachineResult<Outcome> {
        debug!(form = expr.kind(), "starting run");
        let mut configuration = Self::inject(expr.clone(), env, store);
        let mut steps: u64 = 0;

        loop {
            if let Some(limit) = self.config.max_steps {
                if steps >= limit {
                    warn!(limit, "step limit exceeded, abandoning run");
                    return Err(MachineError::StepLimitExceeded { limit });
                }
            }
            if self.config.trace_steps {
                match &configuration.control {
                    Control::Eval(expr) => trace!(
                        step = steps,
                        form = expr.kind(),
                        frame = configuration.kont.tag(),
                        "eval"
                    ),
                    Control::Deliver(value) => trace!(
                        step = steps,
                        value = %value,
                        frame = configuration.kont.tag(),
                        "continue"
                    ),
                }
            }
            steps += 1;

            match self.step(configuration)? {
                Transition::Next(next) => configuration = next,
                Transition::Halt(outcome) => {
                    debug!(steps, value = %outcome.value, "run finished");
                    return Ok(outcome);
                }
            }
        }
    }

    /// Performs a single transition.
    pub fn step(&self, configuration: Configuration) -> MachineResult<Transition> {
        let Configuration {
            control,
            env,
            store,
            kont,
        } = configuration;

        match control {
            Control::Eval(expr) => self.eval_dispatch(&expr, env, store, kont),
            Control::Deliver(value) => self.continue_dispatch(value, env, store, kont),
        }
    }

    /// Dispatch on the expression form.
    fn eval_dispatch(
        &self,
        expr: &Expr,
        env: Environment<Identifier>,
        store: Store<Value>,
        kont: Continuation,
    ) -> MachineResult<Transition> {
        match expr {
            Expr::Number(n) => deliver(Value::Number(*n), env, store, kont),
            Expr::String(s) => deliver(Value::String(s.clone()), env, store, kont),
            Expr::Symbol(name) => deliver(Value::Symbol(name.clone()), env, store, kont),
            Expr::Boolean(b) => deliver(Value::Boolean(*b), env, store, kont),

            Expr::Id(name) => {
                let value = store.deref(env.lookup(name)?)?.clone();
                deliver(value, env, store, kont)
            }

            Expr::Lambda { formals, body } => {
                let closure = Value::Closure(Closure {
                    env: env.clone(),
                    formals: formals.clone(),
                    body: body.clone(),
                });
                deliver(closure, env, store, kont)
            }

            Expr::If {
                test,
                consequent,
                alternative,
            } => {
                let kont = kont.push(Frame::If {
                    env: env.clone(),
                    consequent: consequent.clone(),
                    alternative: alternative.clone(),
                });
                eval(test.as_ref().clone(), env, store, kont)
            }

            Expr::And(exprs) => self.ev_and(exprs, env, store, kont),
            Expr::Or(exprs) => self.ev_or(exprs, env, store, kont),
            Expr::Begin { first, rest } => self.ev_sequence(first, rest.clone(), env, store, kont),

            Expr::Let { bindings, body } => {
                self.ev_let(env, List::empty(), bindings.clone(), body.clone(), store, kont)
            }

            Expr::Letrec { bindings, body } => {
                // Every name gets its cell before any initializer runs.
                let (store, addresses) =
                    store.alloc_lots(bindings.iter().map(|_| Value::Undefined));
                let env = env.extend_lots(
                    bindings
                        .iter()
                        .map(|(name, _)| name.clone())
                        .zip(addresses.iter().copied()),
                );
                let pending: List<Pair<Address, Expr>> = addresses
                    .into_iter()
                    .zip(bindings.iter().map(|(_, init)| init.clone()))
                    .collect();
                self.ev_letrec(env, pending, body.clone(), store, kont)
            }

            Expr::LetCc { name, body } => {
                debug!(name = %name, frame = kont.tag(), "capturing continuation");
                let captured = Value::Continuation(kont.clone());
                let (env, store) = bind(&env, &store, name.clone(), captured);
                eval(body.as_ref().clone(), env, store, kont)
            }

            Expr::Set { name, rhs } => {
                let address = env.lookup(name)?;
                let kont = kont.push(Frame::Set { address });
                eval(rhs.as_ref().clone(), env, store, kont)
            }

            Expr::Application { operator, operands } => {
                let kont = kont.push(Frame::Rator {
                    env: env.clone(),
                    operands: operands.clone(),
                });
                eval(operator.as_ref().clone(), env, store, kont)
            }
        }
    }

    /// Resume the innermost frame with `value`.
    fn continue_dispatch(
        &self,
        value: Value,
        env: Environment<Identifier>,
        store: Store<Value>,
        kont: Continuation,
    ) -> MachineResult<Transition> {
        let (frame, next) = match kont.pop() {
            Some((frame, next)) => (frame.clone(), next),
            None => return Ok(Transition::Halt(Outcome { value, store })),
        };

        match frame {
            Frame::If {
                env,
                consequent,
                alternative,
            } => {
                let branch = if value.is_truthy() {
                    consequent
                } else {
                    alternative
                };
                eval(branch.as_ref().clone(), env, store, next)
            }

            Frame::And { env, remaining } => {
                if value.is_truthy() {
                    self.ev_and(&remaining, env, store, next)
                } else {
                    deliver(value, env, store, next)
                }
            }

            Frame::Or { env, remaining } => {
                if value.is_truthy() {
                    deliver(value, env, store, next)
                } else {
                    self.ev_or(&remaining, env, store, next)
                }
            }

            Frame::Begin { env, remaining } => match remaining.split_first() {
                Some((first, rest)) => self.ev_sequence(first, rest, env, store, next),
                None => deliver(value, env, store, next),
            },

            Frame::Let {
                env,
                name,
                evaluated,
                pending,
                body,
            } => {
                let evaluated = evaluated.cons(pair(name, value));
                self.ev_let(env, evaluated, pending, body, store, next)
            }

            Frame::Letrec {
                env,
                address,
                pending,
                body,
            } => {
                let store = store.update(address, value)?;
                self.ev_letrec(env, pending, body, store, next)
            }

            Frame::Set { address } => {
                let store = store.update(address, value)?;
                deliver(Value::Void, env, store, next)
            }

            Frame::Rator { env, operands } => {
                self.ev_operands(env, value, List::empty(), operands, store, next)
            }

            Frame::Rand {
                env,
                operator,
                arguments,
                pending,
            } => self.ev_operands(env, operator, arguments.cons(value), pending, store, next),
        }
    }

    fn ev_and(
        &self,
        exprs: &List<Expr>,
        env: Environment<Identifier>,
        store: Store<Value>,
        kont: Continuation,
    ) -> MachineResult<Transition> {
        match exprs.split_first() {
            None => deliver(Value::Boolean(true), env, store, kont),
            Some((first, rest)) => {
                // The last operand is in tail position.
                let kont = if rest.is_empty() {
                    kont
                } else {
                    kont.push(Frame::And {
                        env: env.clone(),
                        remaining: rest,
                    })
                };
                eval(first.clone(), env, store, kont)
            }
        }
    }

    fn ev_or(
        &self,
        exprs: &List<Expr>,
        env: Environment<Identifier>,
        store: Store<Value>,
        kont: Continuation,
    ) -> MachineResult<Transition> {
        match exprs.split_first() {
            None => deliver(Value::Boolean(false), env, store, kont),
            Some((first, rest)) => {
                let kont = if rest.is_empty() {
                    kont
                } else {
                    kont.push(Frame::Or {
                        env: env.clone(),
                        remaining: rest,
                    })
                };
                eval(first.clone(), env, store, kont)
            }
        }
    }

    fn ev_sequence(
        &self,
        first: &Expr,
        rest: List<Expr>,
        env: Environment<Identifier>,
        store: Store<Value>,
        kont: Continuation,
    ) -> MachineResult<Transition> {
        let kont = if rest.is_empty() {
            kont
        } else {
            kont.push(Frame::Begin {
                env: env.clone(),
                remaining: rest,
            })
        };
        eval(first.clone(), env, store, kont)
    }

    /// Evaluates the next pending `let` initializer in the outer environment, or
    /// binds everything and enters the body once none are left.
    fn ev_let(
        &self,
        env: Environment<Identifier>,
        evaluated: List<Pair<Identifier, Value>>,
        pending: List<Binding>,
        body: Rc<Expr>,
        store: Store<Value>,
        kont: Continuation,
    ) -> MachineResult<Transition> {
        match pending.split_first() {
            Some(((name, init), rest)) => {
                let kont = kont.push(Frame::Let {
                    env: env.clone(),
                    name: name.clone(),
                    evaluated,
                    pending: rest,
                    body,
                });
                eval(init.clone(), env, store, kont)
            }
            None => {
                let mut bindings: Vec<Pair<Identifier, Value>> =
                    evaluated.iter().cloned().collect();
                bindings.reverse();
                let (env, store) = bind_lots(&env, &store, bindings);
                eval(body.as_ref().clone(), env, store, kont)
            }
        }
    }

    fn ev_letrec(
        &self,
        env: Environment<Identifier>,
        pending: List<Pair<Address, Expr>>,
        body: Rc<Expr>,
        store: Store<Value>,
        kont: Continuation,
    ) -> MachineResult<Transition> {
        match pending.split_first() {
            Some(((address, init), rest)) => {
                let kont = kont.push(Frame::Letrec {
                    env: env.clone(),
                    address: *address,
                    pending: rest,
                    body,
                });
                eval(init.clone(), env, store, kont)
            }
            None => eval(body.as_ref().clone(), env, store, kont),
        }
    }

    /// Evaluates operands left to right, then applies the operator.
    fn ev_operands(
        &self,
        env: Environment<Identifier>,
        operator: Value,
        arguments: List<Value>,
        pending: List<Expr>,
        store: Store<Value>,
        kont: Continuation,
    ) -> MachineResult<Transition> {
        match pending.split_first() {
            Some((operand, rest)) => {
                let kont = kont.push(Frame::Rand {
                    env: env.clone(),
                    operator,
                    arguments,
                    pending: rest,
                });
                eval(operand.clone(), env, store, kont)
            }
            None => {
                let mut args: Vec<Value> = arguments.iter().cloned().collect();
                args.reverse();
                self.apply_dispatch(operator, args, env, store, kont)
            }
        }
    }

    fn apply_dispatch(
        &self,
        operator: Value,
        args: Vec<Value>,
        env: Environment<Identifier>,
        store: Store<Value>,
        kont: Continuation,
    ) -> MachineResult<Transition> {
        match operator {
            Value::Closure(closure) => {
                if closure.formals.len() != args.len() {
                    let lambda = Expr::Lambda {
                        formals: closure.formals.clone(),
                        body: closure.body.clone(),
                    };
                    return Err(MachineError::ArityMismatch {
                        callee: lambda.to_string(),
                        expected: closure.formals.len(),
                        received: args.len(),
                    });
                }
                // Extend the captured environment, not the caller's.
                let (env, store) = bind_lots(
                    &closure.env,
                    &store,
                    closure.formals.iter().cloned().zip(args),
                );
                eval(closure.body.as_ref().clone(), env, store, kont)
            }

            Value::Continuation(captured) => {
                let received = args.len();
                let value = match <[Value; 1]>::try_from(args) {
                    Ok([value]) => value,
                    Err(_) => {
                        return Err(MachineError::ArityMismatch {
                            callee: Value::Continuation(captured).to_string(),
                            expected: 1,
                            received,
                        })
                    }
                };
                debug!(
                    frame = captured.tag(),
                    abandoned = kont.tag(),
                    "invoking continuation"
                );
                deliver(value, env, store, captured)
            }

            Value::Primitive(primitive) => {
                let value = primitive.call(&args)?;
                deliver(value, env, store, kont)
            }

            other => Err(MachineError::NotApplicable {
                operator: other.to_string(),
            }),
        }
    }
}

/// Runs `expr` with the default [`MachineConfig`].
///
/// # Errors
///
/// See [`Machine::run`].
pub fn run(
    expr: &Expr,
    env: &Environment<Identifier>,
    store: &Store<Value>,
) -> MachineResult<Outcome> {
    Machine::default().run(expr, env, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{base_environment, Primitive};

    fn arith(name: &str, op: fn(f64, f64) -> f64) -> Primitive {
        let label = name.to_string();
        Primitive::fixed(name, 2, move |args| match (&args[0], &args[1]) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op(*a, *b))),
            _ => Err(format!("{} expects numbers", label)),
        })
    }

    fn num_eq() -> Primitive {
        Primitive::fixed("=", 2, |args| match (&args[0], &args[1]) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(a == b)),
            _ => Err("= expects numbers".to_string()),
        })
    }

    fn prelude() -> (Environment<Identifier>, Store<Value>) {
        base_environment([
            arith("+", |a, b| a + b),
            arith("-", |a, b| a - b),
            arith("*", |a, b| a * b),
            num_eq(),
        ])
    }

    fn eval_prelude(expr: &Expr) -> MachineResult<Value> {
        let (env, store) = prelude();
        run(expr, &env, &store).map(|outcome| outcome.value)
    }

    fn num(n: f64) -> Expr {
        Expr::number(n)
    }

    fn call(name: &str, operands: Vec<Expr>) -> Expr {
        Expr::apply(Expr::id(name), operands)
    }

    #[test]
    fn test_self_evaluating() {
        let (env, store) = prelude();
        let outcome = run(&num(42.0), &env, &store).unwrap();
        assert_eq!(outcome.value, Value::Number(42.0));
        assert_eq!(eval_prelude(&Expr::boolean(true)), Ok(Value::Boolean(true)));
        assert_eq!(eval_prelude(&Expr::string("hi")), Ok(Value::string("hi")));
        assert_eq!(eval_prelude(&Expr::symbol("done")), Ok(Value::symbol("done")));
    }

    #[test]
    fn test_variable_lookup() {
        let (env, store) = bind(
            &Environment::empty(),
            &Store::new(),
            Identifier::new("x"),
            Value::Number(10.0),
        );
        let outcome = run(&Expr::id("x"), &env, &store).unwrap();
        assert_eq!(outcome.value, Value::Number(10.0));
    }

    #[test]
    fn test_unbound_identifier() {
        assert_eq!(
            eval_prelude(&Expr::id("nope")),
            Err(MachineError::UnboundIdentifier {
                name: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_lambda_creation() {
        let result = eval_prelude(&Expr::lambda(["x"], Expr::id("x"))).unwrap();
        assert!(matches!(result, Value::Closure(_)));
    }

    #[test]
    fn test_if_expression() {
        let expr = Expr::if_(Expr::boolean(false), num(1.0), num(2.0));
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(2.0)));

        // Only #f is false.
        let expr = Expr::if_(num(0.0), num(1.0), num(2.0));
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_compound_procedure_application() {
        // ((lambda (x y) (+ x y)) 3 4)
        let expr = Expr::apply(
            Expr::lambda(["x", "y"], call("+", vec![Expr::id("x"), Expr::id("y")])),
            [num(3.0), num(4.0)],
        );
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(7.0)));
    }

    #[test]
    fn test_lexical_scope() {
        // (let ((x 1)) (let ((f (lambda (y) x))) (let ((x 2)) (f 0))))
        let expr = Expr::let_(
            ["x"],
            [num(1.0)],
            Expr::let_(
                ["f"],
                [Expr::lambda(["y"], Expr::id("x"))],
                Expr::let_(["x"], [num(2.0)], call("f", vec![num(0.0)])).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_let_inits_see_outer_scope() {
        // (let ((x 1)) (let ((x 2) (y x)) y))
        let expr = Expr::let_(
            ["x"],
            [num(1.0)],
            Expr::let_(["x", "y"], [num(2.0), Expr::id("x")], Expr::id("y")).unwrap(),
        )
        .unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_letrec_mutual_reference() {
        let even = Expr::lambda(
            ["n"],
            Expr::if_(
                call("=", vec![Expr::id("n"), num(0.0)]),
                Expr::boolean(true),
                call("odd?", vec![call("-", vec![Expr::id("n"), num(1.0)])]),
            ),
        );
        let odd = Expr::lambda(
            ["n"],
            Expr::if_(
                call("=", vec![Expr::id("n"), num(0.0)]),
                Expr::boolean(false),
                call("even?", vec![call("-", vec![Expr::id("n"), num(1.0)])]),
            ),
        );
        let expr = Expr::letrec(["even?", "odd?"], [even, odd], call("even?", vec![num(11.0)]))
            .unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::Boolean(false)));
    }

    #[test]
    fn test_letrec_placeholder_is_undefined() {
        // (letrec ((a b) (b 1)) a)
        let expr = Expr::letrec(["a", "b"], [Expr::id("b"), num(1.0)], Expr::id("a")).unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::Undefined));
    }

    #[test]
    fn test_set_updates_store() {
        let x = Identifier::new("x");
        let (env, store) = bind(
            &Environment::empty(),
            &Store::new(),
            x.clone(),
            Value::Number(10.0),
        );
        let address = env.lookup(&x).unwrap();

        let expr = Expr::begin([Expr::set("x", num(20.0)), Expr::id("x")]).unwrap();
        let outcome = run(&expr, &env, &store).unwrap();

        assert_eq!(outcome.value, Value::Number(20.0));
        assert_eq!(outcome.store.deref(address), Ok(&Value::Number(20.0)));
        assert_eq!(store.deref(address), Ok(&Value::Number(10.0)));
    }

    #[test]
    fn test_set_delivers_void() {
        let expr = Expr::let_(["x"], [num(1.0)], Expr::set("x", num(2.0))).unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::Void));
    }

    #[test]
    fn test_begin_sequence() {
        let expr = Expr::begin([num(1.0), num(2.0), num(3.0)]).unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(3.0)));
    }

    #[test]
    fn test_short_circuit() {
        // The second operand would fail with an unbound identifier.
        let expr = Expr::and([Expr::boolean(false), call("boom", vec![])]);
        assert_eq!(eval_prelude(&expr), Ok(Value::Boolean(false)));

        let expr = Expr::or([Expr::boolean(true), call("boom", vec![])]);
        assert_eq!(eval_prelude(&expr), Ok(Value::Boolean(true)));

        let expr = Expr::and([num(1.0), num(2.0), num(3.0)]);
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(3.0)));

        let expr = Expr::or([Expr::boolean(false), num(7.0), call("boom", vec![])]);
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(7.0)));

        let expr = Expr::or([Expr::boolean(false), Expr::boolean(false)]);
        assert_eq!(eval_prelude(&expr), Ok(Value::Boolean(false)));
    }

    #[test]
    fn test_empty_and_or() {
        assert_eq!(eval_prelude(&Expr::and(Vec::<Expr>::new())), Ok(Value::Boolean(true)));
        assert_eq!(eval_prelude(&Expr::or(Vec::<Expr>::new())), Ok(Value::Boolean(false)));
    }

    #[test]
    fn test_operands_evaluated_left_to_right() {
        // (let ((x 0)) (- (begin (set! x 1) x) (begin (set! x 10) x)))
        let expr = Expr::let_(
            ["x"],
            [num(0.0)],
            call(
                "-",
                vec![
                    Expr::begin([Expr::set("x", num(1.0)), Expr::id("x")]).unwrap(),
                    Expr::begin([Expr::set("x", num(10.0)), Expr::id("x")]).unwrap(),
                ],
            ),
        )
        .unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(-9.0)));
    }

    #[test]
    fn test_tail_recursion_countdown() {
        // (letrec ((countdown (lambda (n) (if (= n 0) 'done (countdown (- n 1))))))
        //   (countdown 100000))
        let countdown = Expr::lambda(
            ["n"],
            Expr::if_(
                call("=", vec![Expr::id("n"), num(0.0)]),
                Expr::symbol("done"),
                call("countdown", vec![call("-", vec![Expr::id("n"), num(1.0)])]),
            ),
        );
        let expr = Expr::letrec(
            ["countdown"],
            [countdown],
            call("countdown", vec![num(100_000.0)]),
        )
        .unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::symbol("done")));
    }

    #[test]
    fn test_deep_non_tail_recursion() {
        // (letrec ((sum (lambda (n) (if (= n 0) 0 (+ n (sum (- n 1))))))) (sum 50000))
        let sum = Expr::lambda(
            ["n"],
            Expr::if_(
                call("=", vec![Expr::id("n"), num(0.0)]),
                num(0.0),
                call(
                    "+",
                    vec![
                        Expr::id("n"),
                        call("sum", vec![call("-", vec![Expr::id("n"), num(1.0)])]),
                    ],
                ),
            ),
        );
        let expr = Expr::letrec(["sum"], [sum], call("sum", vec![num(50_000.0)])).unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(1_250_025_000.0)));
    }

    #[test]
    fn test_let_cc_escape() {
        // (+ 1 (let/cc k (+ 10 (* 2 (k 42)))))
        let expr = call(
            "+",
            vec![
                num(1.0),
                Expr::let_cc(
                    "k",
                    call(
                        "+",
                        vec![num(10.0), call("*", vec![num(2.0), call("k", vec![num(42.0)])])],
                    ),
                ),
            ],
        );
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(43.0)));
    }

    #[test]
    fn test_let_cc_without_escape() {
        let expr = Expr::let_cc("k", num(5.0));
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(5.0)));
    }

    #[test]
    fn test_reentering_continuation_keeps_store() {
        // (let ((count 0) (saved #f))
        //   (begin
        //     (+ 100 (let/cc k (begin (set! saved k) 0)))
        //     (set! count (+ count 1))
        //     (if (= count 3) count (saved 0))))
        let expr = Expr::let_(
            ["count", "saved"],
            [num(0.0), Expr::boolean(false)],
            Expr::begin([
                call(
                    "+",
                    vec![
                        num(100.0),
                        Expr::let_cc(
                            "k",
                            Expr::begin([Expr::set("saved", Expr::id("k")), num(0.0)]).unwrap(),
                        ),
                    ],
                ),
                Expr::set("count", call("+", vec![Expr::id("count"), num(1.0)])),
                Expr::if_(
                    call("=", vec![Expr::id("count"), num(3.0)]),
                    Expr::id("count"),
                    call("saved", vec![num(0.0)]),
                ),
            ])
            .unwrap(),
        )
        .unwrap();
        assert_eq!(eval_prelude(&expr), Ok(Value::Number(3.0)));
    }

    #[test]
    fn test_continuation_arity() {
        let expr = Expr::let_cc("k", call("k", vec![num(1.0), num(2.0)]));
        assert_eq!(
            eval_prelude(&expr),
            Err(MachineError::ArityMismatch {
                callee: "#<continuation>".to_string(),
                expected: 1,
                received: 2,
            })
        );
    }

    #[test]
    fn test_closure_arity_mismatch() {
        let expr = Expr::apply(Expr::lambda(["x"], Expr::id("x")), Vec::<Expr>::new());
        assert_eq!(
            eval_prelude(&expr),
            Err(MachineError::ArityMismatch {
                callee: "(lambda (x) x)".to_string(),
                expected: 1,
                received: 0,
            })
        );
    }

    #[test]
    fn test_not_applicable() {
        let expr = Expr::apply(num(1.0), [num(2.0)]);
        assert_eq!(
            eval_prelude(&expr),
            Err(MachineError::NotApplicable {
                operator: "1".to_string()
            })
        );
    }

    #[test]
    fn test_primitive_failure() {
        let expr = call("+", vec![num(1.0), Expr::boolean(true)]);
        assert_eq!(
            eval_prelude(&expr),
            Err(MachineError::PrimitiveFailed {
                name: "+".to_string(),
                message: "+ expects numbers".to_string(),
            })
        );
    }

    #[test]
    fn test_step_limit() {
        let (env, store) = prelude();
        let machine = Machine::new(MachineConfig::default().with_max_steps(10));
        let expr = call("+", vec![num(1.0), call("+", vec![num(2.0), num(3.0)])]);
        assert_eq!(
            machine.run(&expr, &env, &store).unwrap_err(),
            MachineError::StepLimitExceeded { limit: 10 }
        );

        let roomy = Machine::new(MachineConfig::default().with_max_steps(1_000));
        assert_eq!(
            roomy.run(&expr, &env, &store).unwrap().value,
            Value::Number(6.0)
        );
    }

    #[test]
    fn test_single_stepping() {
        let machine = Machine::default();
        let expr = Expr::if_(Expr::boolean(true), num(1.0), num(2.0));
        let mut configuration = Machine::inject(expr, &Environment::empty(), &Store::new());

        // eval if, deliver #t, eval 1, deliver 1, halt
        let mut transitions = 0;
        let outcome = loop {
            transitions += 1;
            match machine.step(configuration.clone()).unwrap() {
                Transition::Next(next) => configuration = next,
                Transition::Halt(outcome) => break outcome,
            }
        };
        assert_eq!(transitions, 5);
        assert_eq!(outcome.value, Value::Number(1.0));
        assert!(matches!(configuration.control, Control::Deliver(Value::Number(n)) if n == 1.0));
        assert!(configuration.kont.is_halt());
    }
}
