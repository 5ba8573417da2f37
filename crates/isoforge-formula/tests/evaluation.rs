//! End-to-end tests: formula text through parse, translate and evaluate

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use isoforge_formula::prelude::*;
use isoforge_formula::{CompileError, Error, parse};

fn compile(formula: &mut Formula) -> Program {
    formula
        .compile(&FunctionRegistry::builtin())
        .expect("formula should compile")
        .program
}

fn eval(text: &str) -> Vec3 {
    compile(&mut Formula::new(text)).eval(&[])
}

fn eval_with(text: &str, names: &[&str], values: &[Vec3]) -> Vec3 {
    compile(&mut Formula::new(text).with_parameters(names)).eval(values)
}

#[test]
fn arithmetic() {
    assert_eq!(eval("3+4"), Vec3::splat(7.0));
    assert_eq!(eval("12*34+45"), Vec3::splat(453.0));
    assert_eq!(eval("1-2-3"), Vec3::splat(-4.0));
    assert_eq!(eval("-(3+4)"), Vec3::splat(-7.0));
    assert_eq!(eval("--1"), Vec3::ONE);
    assert_eq!(eval("7 % 4"), Vec3::splat(3.0));
}

#[test]
fn functions() {
    assert_eq!(eval("sqrt(64)"), Vec3::splat(8.0));
    assert_eq!(eval("min(42, 43)"), Vec3::splat(42.0));
    assert_eq!(eval("max(-1, abs(-4))"), Vec3::splat(4.0));
    assert_eq!(eval("abs(abs(1+1/2))"), Vec3::splat(1.5));
    assert_eq!(eval("pow(2, 10)"), Vec3::splat(1024.0));
    assert_eq!(eval("saturate(3)"), Vec3::ONE);
    assert_eq!(eval("v3(1, 2, 3)"), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(eval("y(v3(1, 2, 3))"), Vec3::splat(2.0));
    assert_eq!(eval("dist(v3(0, 3, 0), v3(4, 0, 0))"), Vec3::splat(5.0));
    assert_eq!(eval("sqdist(v3(0, 3, 0), v3(4, 0, 0))"), Vec3::splat(25.0));
    assert_eq!(eval("box(v3(3, 0, 0), 1)"), Vec3::splat(2.0));
}

#[test]
fn trigonometry() {
    assert_relative_eq!(eval("tan(1)").x, 1.557_407_7, max_relative = 1e-5);
    assert_relative_eq!(eval("tan(tan(1))").x, 74.686, max_relative = 1e-3);
    assert_relative_eq!(eval("tan(tan(11%10))").x, 74.686, max_relative = 1e-3);
}

#[test]
fn noise_functions_broadcast_a_scalar() {
    for text in ["vnoise(v3(0.3, 1.7, 2.1))", "cnoise(v3(0.3, 1.7, 2.1))", "snoise(v3(0.3, 1.7, 2.1))", "fbm(v3(0.3, 1.7, 2.1))", "fbm(v3(0.3, 1.7, 2.1), 1, 5, 2)"] {
        let v = eval(text);
        assert_eq!(v.x, v.y, "{}", text);
        assert_eq!(v.y, v.z, "{}", text);
    }
    assert_eq!(eval("fbm(v3(0.3, 1.7, 2.1))"), eval("fbm(v3(0.3, 1.7, 2.1), 1, 5, 0.4)"));
}

#[test]
fn rotating_noise_returns_value_and_derivatives() {
    let expected = isoforge_formula::noise::rotating_simplex_noise(glam::Vec2::new(0.3, 1.7), 2.1);
    assert_eq!(eval("srdnoise(v3(0.3, 1.7, 2.1))"), expected);
    assert_ne!(expected.x, expected.y);
}

#[test]
fn subtraction_is_not_commuted() {
    assert_eq!(eval_with("x - 2", &["x"], &[Vec3::ONE]), Vec3::splat(-1.0));
    assert_eq!(eval_with("1+x", &["x"], &[Vec3::splat(2.0)]), Vec3::splat(3.0));
    assert_eq!(eval("10 / 4"), Vec3::splat(2.5));
}

#[test]
fn component_functions_on_parameters() {
    let a = [Vec3::new(1.0, 2.0, 3.0)];
    assert_eq!(eval_with("x(a) - 2", &["a"], &a), Vec3::splat(-1.0));
    assert_eq!(eval_with("z(a) - 2", &["a"], &a), Vec3::splat(1.0));
}

#[test]
fn parameter_binding_by_position() {
    let result = eval_with(
        "x+x",
        &["x", "y"],
        &[Vec3::new(5.0, 0.0, 0.0), Vec3::new(99.0, 99.0, 99.0)],
    );
    assert_eq!(result, Vec3::new(10.0, 0.0, 0.0));
}

#[test]
fn sub_formulas() {
    let cases: [(&str, &[(&str, &str)], f32); 5] = [
        ("x+x", &[("x", "5")], 10.0),
        ("x+x", &[("x", "2+3")], 10.0),
        ("x", &[("x", "y"), ("y", "5")], 5.0),
        ("x+y", &[("x", "5"), ("y", "3")], 8.0),
        ("a*b", &[("a", "b+1"), ("b", "2")], 6.0),
    ];

    for (text, definitions, expected) in cases {
        let mut formula = Formula::new(text);
        for (name, source) in definitions {
            formula = formula.with_variable(FormulaVariable::sub_formula(name, *source));
        }
        assert_eq!(compile(&mut formula).eval(&[]).x, expected, "{}", text);
    }
}

#[test]
fn sub_formula_program_size_does_not_scale_with_references() {
    let mut once = Formula::new("s").with_variable(FormulaVariable::sub_formula("s", "1+2*3"));
    let mut many = Formula::new("s+s+s").with_variable(FormulaVariable::sub_formula("s", "1+2*3"));

    let once = compile(&mut once);
    let many = compile(&mut many);

    // Two extra loads and two adds, no second copy of the block
    assert_eq!(many.len(), once.len() + 4);
    assert_eq!(many.eval(&[]), Vec3::splat(21.0));
}

#[test]
fn named_constants() {
    let mut formula = Formula::new("fscale * offset")
        .with_variable(FormulaVariable::float("fscale", 2.0))
        .with_variable(FormulaVariable::vector("offset", Vec3::new(1.0, 2.0, 3.0)));
    assert_eq!(compile(&mut formula).eval(&[]), Vec3::new(2.0, 4.0, 6.0));
}

#[test]
fn cyclic_sub_formulas_fail() {
    let mut formula = Formula::new("x")
        .with_variable(FormulaVariable::sub_formula("y", "x"))
        .with_variable(FormulaVariable::sub_formula("x", "y"));
    let err = formula.compile(&FunctionRegistry::builtin()).unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(CompileError::RecursiveDefinition(_))
    ));
}

#[test]
fn format_round_trips() {
    let cases = [
        ("12*34+45", "((12 * 34) + 45)"),
        ("-(3+4)", "-(3 + 4)"),
        ("--1", "--1"),
        ("1 * a+3", "((1 * $a) + 3)"),
        ("abs(abs(1+1/2))", "abs(abs((1 + (1 / 2))))"),
    ];
    for (text, expected) in cases {
        assert_eq!(parse(text).unwrap().unwrap().to_string(), expected);
    }
}

#[test]
fn compiled_program_survives_json() {
    let mut formula = Formula::new("s * 2 - coords")
        .with_parameters(["coords"])
        .with_variable(FormulaVariable::sub_formula("s", "sin(coords)"));
    let program = compile(&mut formula);

    let restored = Program::from_json(&program.to_json().unwrap()).unwrap();
    let p = [Vec3::new(0.5, 1.0, 1.5)];
    assert_eq!(restored.eval(&p), program.eval(&p));
}

#[test]
fn concurrent_evaluation_of_one_program() {
    let mut formula = Formula::new("coords * coords").with_parameters(["coords"]);
    let program = std::sync::Arc::new(compile(&mut formula));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let program = std::sync::Arc::clone(&program);
            std::thread::spawn(move || {
                let mut state = EvalState::new();
                (0..100)
                    .map(|j| state.run(&program, &[Vec3::splat((i * 100 + j) as f32)]).x)
                    .sum::<f32>()
            })
        })
        .collect();

    let total: f32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let expected: f32 = (0..400).map(|k| (k * k) as f32).sum();
    assert_relative_eq!(total, expected, max_relative = 1e-5);
}
