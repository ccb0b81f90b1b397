//! Compilación de programas completos hasta ensamblador.
//!
//! Los listados del dialecto `Syscall` son ejecutados por una máquina
//! de pila mínima que solo comprende las instrucciones que emite el
//! generador, de modo que estas pruebas no dependen de `gcc`.

use proptest::prelude::*;
use yzc::{compile, target::Dialect, Options};

/// Intérprete de los listados emitidos para `_start`.
#[derive(Default)]
struct Machine {
    rax: u64,
    rcx: u64,
    rdx: u64,
    rdi: u64,
    stack: Vec<u64>,
    deepest: usize,
}

impl Machine {
    fn reg(&mut self, name: &str) -> &mut u64 {
        match name {
            "%rax" => &mut self.rax,
            "%rcx" => &mut self.rcx,
            "%rdx" => &mut self.rdx,
            "%rdi" => &mut self.rdi,
            _ => panic!("unknown register {}", name),
        }
    }

    /// Interpreta constantes como lo hace GNU as: `0x` hexadecimal,
    /// `0` inicial octal y decimal en otro caso.
    fn immediate(operand: &str) -> u64 {
        let operand = operand.trim_start_matches('$');
        if let Some(hex) = operand.strip_prefix("0x") {
            u64::from_str_radix(hex, 16).unwrap()
        } else if operand.len() > 1 && operand.starts_with('0') {
            u64::from_str_radix(&operand[1..], 8).expect("not an octal constant")
        } else {
            operand.parse().unwrap()
        }
    }

    /// Ejecuta hasta `syscall` y retorna el código de salida.
    fn run(listing: &str) -> (u64, Machine) {
        let mut machine = Machine::default();

        for line in listing.lines() {
            let line = line.trim();
            if line.starts_with('.') || line.ends_with(':') {
                continue;
            }

            let (opcode, operands) = match line.split_once(char::is_whitespace) {
                Some((opcode, operands)) => (opcode, operands.trim()),
                None => (line, ""),
            };

            let operands: Vec<&str> = operands.split(", ").collect();
            match (opcode, operands.as_slice()) {
                ("movq", [source, target]) => {
                    let value = Machine::immediate(source);
                    *machine.reg(target) = value;
                }

                ("pushq", [source]) if source.ends_with("(%rsp)") => {
                    let offset = Machine::immediate(source.trim_end_matches("(%rsp)")) as usize;
                    let value = machine.stack[machine.stack.len() - 1 - offset / 8];
                    machine.stack.push(value);
                }

                ("pushq", [source]) => {
                    let value = *machine.reg(source);
                    machine.stack.push(value);
                }

                ("popq", [target]) => {
                    let value = machine.stack.pop().expect("stack underflow");
                    *machine.reg(target) = value;
                }

                ("addq", [amount, "%rsp"]) => {
                    let values = Machine::immediate(amount) as usize / 8;
                    assert!(values <= machine.stack.len(), "stack underflow");
                    machine.stack.truncate(machine.stack.len() - values);
                }

                ("addq", ["%rcx", "%rax"]) => machine.rax = machine.rax.wrapping_add(machine.rcx),
                ("subq", ["%rcx", "%rax"]) => machine.rax = machine.rax.wrapping_sub(machine.rcx),
                ("imulq", ["%rcx", "%rax"]) => machine.rax = machine.rax.wrapping_mul(machine.rcx),
                ("xorq", ["%rdx", "%rdx"]) => machine.rdx = 0,

                ("divq", ["%rcx"]) => {
                    assert_eq!(machine.rdx, 0);
                    let (quotient, remainder) = (machine.rax / machine.rcx, machine.rax % machine.rcx);
                    machine.rax = quotient;
                    machine.rdx = remainder;
                }

                ("syscall", _) => {
                    assert_eq!(machine.rax, 60);
                    return (machine.rdi, machine);
                }

                _ => panic!("unexpected instruction: {}", line),
            }

            machine.deepest = machine.deepest.max(machine.stack.len());
        }

        panic!("program did not terminate");
    }
}

fn assemble(text: &str) -> String {
    compile(text, "<test>", Options::default()).unwrap()
}

fn exit_code(text: &str) -> u64 {
    Machine::run(&assemble(text)).0
}

/// Repite los movimientos de pila de todo el listado, alcanzables o no.
fn final_depth(listing: &str) -> usize {
    let mut depth = 0usize;

    for line in listing.lines() {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["pushq", _] => depth += 1,
            ["popq", _] => depth = depth.checked_sub(1).expect("stack underflow"),
            ["addq", amount, "%rsp"] => {
                let amount = Machine::immediate(amount.trim_end_matches(','));
                depth = depth
                    .checked_sub(amount as usize / 8)
                    .expect("stack underflow");
            }

            _ => (),
        }
    }

    depth
}

#[test]
fn test_exit_codes() {
    assert_eq!(exit_code("exit(1+2*3);"), 7);
    assert_eq!(exit_code("val a = 5; val b = a + 1; exit(b);"), 6);
    assert_eq!(exit_code("exit((1 + 2) * 3);"), 9);
    assert_eq!(exit_code("exit(10 - 4 - 3);"), 3);
    assert_eq!(exit_code("exit(100 / 10 / 5);"), 2);
    assert_eq!(exit_code("exit(7 - 10 / 2 * 1);"), 2);
}

#[test]
fn test_leading_zeros() {
    assert_eq!(exit_code("exit(010);"), 10);
    assert_eq!(exit_code("exit(09);"), 9);
    assert_eq!(exit_code("val a = 007; exit(a * 00);"), 0);
}

#[test]
fn test_scopes() {
    let text = "val x = 1; { val x = 2; val y = x * 10; exit(y + x); }";
    assert_eq!(exit_code(text), 22);

    let text = "val x = 3; { val y = 4; } { val y = x + 1; exit(y); }";
    assert_eq!(exit_code(text), 4);

    let text = "val x = 3; { val x = x * 2; { val x = x * 2; } exit(x); }";
    assert_eq!(exit_code(text), 6);
}

#[test]
fn test_implicit_exit() {
    let (code, machine) = Machine::run(&assemble("val a = 1; { val b = a; }"));
    assert_eq!(code, 0);
    assert!(machine.stack.is_empty());
    assert_eq!(machine.deepest, 2);

    assert_eq!(exit_code(""), 0);
}

#[test]
fn test_stack_is_reconciled() {
    let programs = [
        "exit(1+2*3);",
        "val a = 5; val b = a + 1; exit(b);",
        "val a = 1; { val b = 2; { val c = a + b; } val d = 4; } val e = a;",
        "{ } { { val a = 1; } } val b = 2;",
    ];

    for text in programs.iter() {
        assert_eq!(final_depth(&assemble(text)), 0, "{}", text);
    }
}

#[test]
fn test_division_by_zero_compiles() {
    let listing = assemble("exit(10/0);");
    assert!(listing.contains("divq"));
}

#[test]
fn test_semantic_errors_fail_compilation() {
    let report = compile("val x = 1; val x = 2;", "<test>", Options::default()).unwrap_err();
    assert_eq!(report.len(), 1);
    assert!(report.to_string().contains("already declared"));

    let report = compile("{ val x = 1; } exit(x);", "<test>", Options::default()).unwrap_err();
    assert!(report.to_string().contains("undeclared"));
}

#[test]
fn test_hosted_dialect_returns_from_main() {
    let options = Options {
        dialect: Dialect::Libc,
        ..Default::default()
    };

    let listing = compile("val a = 2; exit(a);", "<test>", options).unwrap();
    let lines: Vec<&str> = listing.lines().map(str::trim).collect();

    assert_eq!(lines[1], ".global main");
    assert!(lines.contains(&"ret"));
    assert!(!listing.contains("syscall"));
}

#[derive(Clone, Debug)]
enum Expr {
    Literal(u64),
    Read(&'static str),
    Binary(Box<Expr>, char, Box<Expr>),
}

impl Expr {
    fn eval(&self, env: &[(&str, u64)]) -> u64 {
        match self {
            Expr::Literal(value) => *value,
            Expr::Read(name) => env
                .iter()
                .rev()
                .find(|(var, _)| var == name)
                .map(|&(_, value)| value)
                .unwrap(),

            Expr::Binary(lhs, op, rhs) => {
                let (lhs, rhs) = (lhs.eval(env), rhs.eval(env));
                match op {
                    '+' => lhs.wrapping_add(rhs),
                    '-' => lhs.wrapping_sub(rhs),
                    _ => lhs.wrapping_mul(rhs),
                }
            }
        }
    }

    fn render(&self) -> String {
        match self {
            Expr::Literal(value) => value.to_string(),
            Expr::Read(name) => name.to_string(),
            Expr::Binary(lhs, op, rhs) => format!("({} {} {})", lhs.render(), op, rhs.render()),
        }
    }
}

fn expr(vars: Vec<&'static str>) -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (0u64..1000).prop_map(Expr::Literal),
        prop::sample::select(vars).prop_map(Expr::Read),
    ];

    leaf.prop_recursive(4, 24, 2, |inner| {
        (inner.clone(), prop::sample::select(vec!['+', '-', '*']), inner)
            .prop_map(|(lhs, op, rhs)| Expr::Binary(Box::new(lhs), op, Box::new(rhs)))
    })
}

proptest! {
    #[test]
    fn test_generated_programs_evaluate(
        first in 0u64..1000,
        outer in expr(vec!["a"]),
        inner in expr(vec!["a", "b"]),
        result in expr(vec!["a", "b"]),
    ) {
        let text = format!(
            "val a = {}; val b = {}; {{ val a = {}; exit({}); }}",
            first,
            outer.render(),
            inner.render(),
            result.render(),
        );

        let mut env = vec![("a", first)];
        env.push(("b", outer.eval(&env)));
        env.push(("a", inner.eval(&env)));
        let expected = result.eval(&env);

        let listing = assemble(&text);
        let (code, machine) = Machine::run(&listing);

        prop_assert_eq!(code, expected);
        prop_assert_eq!(machine.stack.len(), 3);
        prop_assert_eq!(final_depth(&listing), 0);
    }
}
