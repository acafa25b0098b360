//! Demo: analyse a program and print the typed tree, graphs and facts
//!
//! Usage: `show_analysis [program.json] [--config sema.json] [--json]`
//!
//! Without a program file a built-in sample is analysed. Set `RUST_LOG=debug`
//! to see the solver's progress.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tern_analysis::Analyzer;
use tern_core::ast::build::*;
use tern_core::ast::{BinOp, Program};
use tracing_subscriber::EnvFilter;

fn sample() -> Program {
    Program::single(vec![
        function(
            "sum_to",
            &["n"],
            vec![
                let_("total", num(0.0)),
                let_("i", num(0.0)),
                while_(
                    binary(BinOp::LtEq, var("i"), var("n")),
                    vec![
                        assign("total", binary(BinOp::Add, var("total"), var("i"))),
                        assign("i", binary(BinOp::Add, var("i"), num(1.0))),
                    ],
                ),
                ret(Some(var("total"))),
            ],
        ),
        let_("id", lambda(&["v"], vec![expr_stmt(var("v"))])),
        let_("limit", num(10.0)),
        let_("verbose", boolean(false)),
        if_(
            var("verbose"),
            vec![expr_stmt(call("print", vec![call("id", vec![string("summing")])]))],
            None,
        ),
        expr_stmt(call("print", vec![call("sum_to", vec![call("id", vec![var("limit")])])])),
    ])
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut program_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut json = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                config_path = Some(path.into());
            }
            flag if flag.starts_with("--") => bail!("unknown flag: {flag}"),
            path => program_path = Some(path.into()),
        }
    }

    let analyzer = match &config_path {
        Some(path) => Analyzer::from_config_file(path)?,
        None => Analyzer::new(),
    };

    let program = match &program_path {
        Some(path) => {
            let content =
                std::fs::read_to_string(path).with_context(|| format!("reading program {}", path.display()))?;
            serde_json::from_str(&content).with_context(|| format!("parsing program {}", path.display()))?
        }
        None => sample(),
    };

    let report = analyzer.analyze(&program);
    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }
    Ok(())
}
