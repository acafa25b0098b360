//! Demo: Show inferred types on the typed tree

use tern_core::ast::build::*;
use tern_core::ast::{BinOp, Module, Program};
use tern_core::tir::TypedStmtKind;

fn main() -> anyhow::Result<()> {
    let program = Program::new(vec![
        Module::new(
            "geometry",
            vec![
                structure("Point", vec![("x", num(0.0)), ("y", num(0.0))]),
                function(
                    "norm1",
                    &["p"],
                    vec![ret(Some(binary(BinOp::Sub, field(var("p"), "x"), field(var("p"), "y"))))],
                ),
                let_("origin", record(vec![("x", num(0.0)), ("y", num(0.0))])),
                expr_stmt(call("print", vec![call("norm1", vec![var("origin")])])),
            ],
        ),
        Module::new(
            "poly",
            vec![
                function("id", &["v"], vec![ret(Some(var("v")))]),
                let_("a", call("id", vec![num(1.0)])),
                let_("b", call("id", vec![string("two")])),
                let_("xs", array(vec![var("a"), num(3.0)])),
                expr_stmt(call("push", vec![var("xs"), call("len", vec![var("xs")])])),
            ],
        ),
    ]);

    let (typed, errors) = tern_core::lower_program(&program);

    println!("=== Inferred Types ===\n");

    for module in &typed.modules {
        println!("Module: {}", module.name);
        println!("{}", "-".repeat(40));
        for stmt in &module.body {
            match &stmt.kind {
                TypedStmtKind::Function(func) => println!("  fun {} : {}", func.name, func.ty),
                TypedStmtKind::Struct(decl) => println!("  struct {} : {}", decl.name, decl.ty),
                TypedStmtKind::Let { name, value, .. } => println!("  let {} : {}", name, value.ty),
                _ => {}
            }
        }
        println!();
    }

    println!("=== Typed Tree ===\n");
    print!("{typed}");

    if !errors.is_empty() {
        println!("\n=== Errors ===\n");
        for error in &errors {
            println!("  {error}");
        }
    }

    Ok(())
}
