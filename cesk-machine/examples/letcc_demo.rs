//! Walks a few programs through the CESK machine and prints the results.
//!
//! Run with: cargo run --example letcc_demo

use cesk_machine::{
    base_environment, Environment, Expr, Identifier, Machine, MachineConfig, MachineResult,
    Primitive, Store, Value,
};

fn arith(name: &str, op: fn(f64, f64) -> f64) -> Primitive {
    let label = name.to_string();
    Primitive::fixed(name, 2, move |args| match (&args[0], &args[1]) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op(*a, *b))),
        _ => Err(format!("{} expects two numbers", label)),
    })
}

fn prelude() -> (Environment<Identifier>, Store<Value>) {
    let num_eq = Primitive::fixed("=", 2, |args| match (&args[0], &args[1]) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(a == b)),
        _ => Err("= expects two numbers".to_string()),
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

fn show(machine: &Machine, title: &str, expr: &Expr) {
    let (env, store) = prelude();
    println!("{}", title);
    println!("   {}", expr);
    match machine.run(expr, &env, &store) {
        Ok(outcome) => {
            println!("   => {}", outcome.value);
            print!("{}", outcome.store);
        }
        Err(e) => println!("   error: {}", e),
    }
    println!();
}

fn main() -> MachineResult<()> {
    tracing_subscriber::fmt::init();

    let machine = Machine::default();

    // 1. set! is visible through the store
    let program = Expr::let_(
        ["x"],
        [Expr::number(10.0)],
        Expr::begin([Expr::set("x", Expr::number(20.0)), Expr::id("x")])?,
    )?;
    show(&machine, "1. Assignment", &program);

    // 2. Escaping from a nested computation
    let program = call(
        "+",
        vec![
            Expr::number(1.0),
            Expr::let_cc(
                "k",
                call(
                    "*",
                    vec![Expr::number(100.0), call("k", vec![Expr::number(41.0)])],
                ),
            ),
        ],
    );
    show(&machine, "2. let/cc escape", &program);

    // 3. Mutual recursion through letrec
    let is_even = Expr::lambda(
        ["n"],
        Expr::if_(
            call("=", vec![Expr::id("n"), Expr::number(0.0)]),
            Expr::boolean(true),
            call("odd?", vec![call("-", vec![Expr::id("n"), Expr::number(1.0)])]),
        ),
    );
    let is_odd = Expr::lambda(
        ["n"],
        Expr::if_(
            call("=", vec![Expr::id("n"), Expr::number(0.0)]),
            Expr::boolean(false),
            call("even?", vec![call("-", vec![Expr::id("n"), Expr::number(1.0)])]),
        ),
    );
    let program = Expr::letrec(
        ["even?", "odd?"],
        [is_even, is_odd],
        call("even?", vec![Expr::number(10_001.0)]),
    )?;
    show(&machine, "3. letrec mutual recursion", &program);

    // 4. Errors are reported, not recovered
    show(
        &machine,
        "4. Applying a number",
        &call("+", vec![Expr::number(1.0), Expr::apply(Expr::number(2.0), Vec::<Expr>::new())]),
    );

    // 5. A bounded, traced run
    let traced = Machine::new(
        MachineConfig::default()
            .with_max_steps(12)
            .with_trace_steps(true),
    );
    let program = call(
        "+",
        vec![
            Expr::number(1.0),
            call("+", vec![Expr::number(2.0), Expr::number(3.0)]),
        ],
    );
    show(&traced, "5. Step-limited run", &program);

    Ok(())
}
