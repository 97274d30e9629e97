use cesk_machine::{
    base_bindings, base_environment, equal, run, Configuration, Environment, Expr, Identifier,
    Machine, MachineConfig, MachineError, Primitive, Store, Transition, Value,
};

fn arith(name: &str, op: fn(f64, f64) -> f64) -> Primitive {
    Primitive::fixed(name, 2, move |args| match (&args[0], &args[1]) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op(*a, *b))),
        _ => Err("expected numbers".to_string()),
    })
}

fn prelude() -> (Environment<Identifier>, Store<Value>) {
    let num_eq = Primitive::fixed("=", 2, |args| match (&args[0], &args[1]) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(a == b)),
        _ => Err("expected numbers".to_string()),
    });
    base_environment([
        arith("+", |a, b| a + b),
        arith("-", |a, b| a - b),
        arith("*", |a, b| a * b),
        num_eq,
    ])
}

fn call(name: &str, operands: Vec<Expr>) -> Expr {
    Expr::apply(Expr::id(name), operands)
}

fn num(n: f64) -> Expr {
    Expr::number(n)
}

fn evaluate(expr: &Expr) -> Result<Value, MachineError> {
    let (env, store) = prelude();
    run(expr, &env, &store).map(|outcome| outcome.value)
}

#[test]
fn test_store_determinism_and_isolation() {
    let (store, a) = Store::new().alloc(Value::Number(1.0));
    let (store, b) = store.alloc(Value::symbol("b"));
    assert_eq!(store.deref(a), Ok(&Value::Number(1.0)));

    let updated = store.update(a, Value::Number(2.0)).unwrap();
    assert_eq!(store.deref(a), Ok(&Value::Number(1.0)));
    assert_eq!(updated.deref(a), Ok(&Value::Number(2.0)));
    assert_eq!(store.deref(b), updated.deref(b));
}

#[test]
fn test_environment_shadowing() {
    let x = Identifier::new("x");
    let (_, addrs) = Store::<Value>::new().alloc_lots([Value::Null, Value::Null, Value::Null]);

    let env = Environment::empty()
        .extend(x.clone(), addrs[0])
        .extend(x.clone(), addrs[1]);
    assert_eq!(env.lookup(&x), Ok(addrs[1]));

    let lots = Environment::empty().extend_lots([
        (x.clone(), addrs[0]),
        (Identifier::new("y"), addrs[1]),
        (x.clone(), addrs[2]),
    ]);
    assert_eq!(lots.lookup(&x), Ok(addrs[0]));
}

#[test]
fn test_letrec_mutual_reference() {
    // (letrec ((f (lambda () (g))) (g (lambda () 7))) (f))
    let expr = Expr::letrec(
        ["f", "g"],
        [
            Expr::lambda(Vec::<&str>::new(), call("g", vec![])),
            Expr::lambda(Vec::<&str>::new(), num(7.0)),
        ],
        call("f", vec![]),
    )
    .unwrap();
    assert_eq!(evaluate(&expr), Ok(Value::Number(7.0)));
}

#[test]
fn test_short_circuit_laws() {
    let boom = call("undefined-procedure", vec![]);
    assert!(matches!(
        evaluate(&boom),
        Err(MachineError::UnboundIdentifier { .. })
    ));

    let and = Expr::and([Expr::boolean(false), boom.clone()]);
    assert_eq!(evaluate(&and), Ok(Value::Boolean(false)));

    let or = Expr::or([Expr::boolean(true), boom]);
    assert_eq!(evaluate(&or), Ok(Value::Boolean(true)));
}

#[test]
fn test_tail_depth_independence() {
    let countdown = Expr::lambda(
        ["n"],
        Expr::if_(
            call("=", vec![Expr::id("n"), num(0.0)]),
            num(0.0),
            call("countdown", vec![call("-", vec![Expr::id("n"), num(1.0)])]),
        ),
    );
    let expr = Expr::letrec(
        ["countdown"],
        [countdown],
        call("countdown", vec![num(100_000.0)]),
    )
    .unwrap();
    assert_eq!(evaluate(&expr), Ok(Value::Number(0.0)));
}

#[test]
fn test_long_list_values_compare_print_and_drop() {
    // (letrec ((build (lambda (n acc)
    //                   (if (= n 0) acc (build (- n 1) (cons n acc))))))
    //   (build 200000 nil))
    let cons = Primitive::fixed("cons", 2, |args| {
        Ok(Value::cons(args[0].clone(), args[1].clone()))
    });
    let num_eq = Primitive::fixed("=", 2, |args| match (&args[0], &args[1]) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(a == b)),
        _ => Err("expected numbers".to_string()),
    });
    let (env, store) = base_bindings(
        [cons, num_eq, arith("-", |a, b| a - b)]
            .into_iter()
            .map(|prim| (Identifier::new(prim.name()), Value::Primitive(prim)))
            .chain([(Identifier::new("nil"), Value::Null)]),
    );

    let build = Expr::lambda(
        ["n", "acc"],
        Expr::if_(
            call("=", vec![Expr::id("n"), num(0.0)]),
            Expr::id("acc"),
            call(
                "build",
                vec![
                    call("-", vec![Expr::id("n"), num(1.0)]),
                    call("cons", vec![Expr::id("n"), Expr::id("acc")]),
                ],
            ),
        ),
    );
    let expr = Expr::letrec(
        ["build"],
        [build],
        call("build", vec![num(200_000.0), Expr::id("nil")]),
    )
    .unwrap();

    let first = run(&expr, &env, &store).unwrap();
    let second = run(&expr, &env, &store).unwrap();
    assert_eq!(first.value.type_name(), "pair");
    assert!(equal(&first.value, &second.value));

    let printed = first.value.to_string();
    assert!(printed.starts_with("(1 2 3 "));
    assert!(printed.ends_with(" 199999 200000)"));

    drop(first);
    drop(second);
}

#[test]
fn test_continuation_escape_from_depth() {
    // (let/cc k (+ 1 (+ 1 ... (+ 1 (k 42)) ...)))  nested 100,000 deep
    let mut inner = call("k", vec![num(42.0)]);
    for _ in 0..100_000 {
        inner = call("+", vec![num(1.0), inner]);
    }
    let expr = Expr::let_cc("k", inner);
    assert_eq!(evaluate(&expr), Ok(Value::Number(42.0)));
}

#[test]
fn test_structural_equality() {
    let build = || {
        Value::list([
            Value::Number(1.0),
            Value::list([Value::Number(2.0), Value::Number(3.0)]),
            Value::Number(4.0),
        ])
    };
    assert!(equal(&build(), &build()));
    assert!(equal(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));

    // Closures built from the same lambda in the same environment are equal.
    let lambda = Expr::lambda(["x"], Expr::id("x"));
    let pair_of = Expr::let_(["a", "b"], [lambda.clone(), lambda.clone()], Expr::id("a")).unwrap();
    let (env, store) = prelude();
    let first = run(&pair_of, &env, &store).unwrap().value;
    let second = run(&lambda, &env, &store).unwrap().value;
    assert!(equal(&first, &second));

    let other = run(&Expr::lambda(["y"], Expr::id("y")), &env, &store)
        .unwrap()
        .value;
    assert!(!equal(&first, &other));
}

#[test]
fn test_end_to_end_assignment() {
    // (let ((x 10)) (begin (set! x 20) x))
    let expr = Expr::let_(
        ["x"],
        [num(10.0)],
        Expr::begin([Expr::set("x", num(20.0)), Expr::id("x")]).unwrap(),
    )
    .unwrap();

    let outcome = run(&expr, &Environment::empty(), &Store::new()).unwrap();
    assert_eq!(outcome.value, Value::Number(20.0));

    let cells: Vec<(usize, Value, bool)> = outcome
        .store
        .iter()
        .map(|(address, value, hidden)| (address.index(), value.clone(), hidden))
        .collect();
    assert_eq!(cells, vec![(0, Value::Number(20.0), false)]);
    assert!(outcome.store.to_string().contains("Addr(0): 20"));
}

#[test]
fn test_configurations_replay_deterministically() {
    let machine = Machine::default();
    let (env, store) = prelude();
    let expr = call("*", vec![num(6.0), call("+", vec![num(3.0), num(4.0)])]);

    let mut configuration = Machine::inject(expr, &env, &store);
    for _ in 0..4 {
        configuration = match machine.step(configuration).unwrap() {
            Transition::Next(next) => next,
            Transition::Halt(_) => panic!("halted too early"),
        };
    }

    // A retained snapshot can be resumed any number of times.
    let finish = |mut configuration: Configuration| loop {
        match machine.step(configuration).unwrap() {
            Transition::Next(next) => configuration = next,
            Transition::Halt(outcome) => break outcome.value,
        }
    };
    assert_eq!(finish(configuration.clone()), Value::Number(42.0));
    assert_eq!(finish(configuration), Value::Number(42.0));
}

#[test]
fn test_step_limit_reports_error() {
    let (env, store) = prelude();
    let spin = Expr::letrec(
        ["spin"],
        [Expr::lambda(Vec::<&str>::new(), call("spin", vec![]))],
        call("spin", vec![]),
    )
    .unwrap();
    let machine = Machine::new(MachineConfig::default().with_max_steps(5_000));
    assert_eq!(
        machine.run(&spin, &env, &store).unwrap_err(),
        MachineError::StepLimitExceeded { limit: 5_000 }
    );
}

#[test]
fn test_malformed_expression_lifts_into_machine_error() {
    let err: MachineError = Expr::let_(["x"], Vec::<Expr>::new(), num(1.0))
        .unwrap_err()
        .into();
    assert!(matches!(err, MachineError::Malformed(_)));
    assert_eq!(
        err.to_string(),
        "Malformed expression: `let` has 1 names but 0 initializers"
    );
}
