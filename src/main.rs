use std::process::ExitCode;
use std::time::Instant;

use clap::Parser as _;
use console::style;
use tracing_subscriber::EnvFilter;

use sympath::ast;
use sympath::cli::Cli;
use sympath::config::Config;
use sympath::errors::EngineError;
use sympath::orchestrator::{self, AnalysisOptions};
use sympath::parser;
use sympath::report;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sympath=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sympath=info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let start = Instant::now();

    match run(&cli) {
        Ok(()) => {
            tracing::info!("{}", style(format!("Finished in {:.2?}", start.elapsed())).green());
            ExitCode::from(0)
        }
        Err(err) => {
            eprintln!("{}", style(format!("error: {err}")).red());
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &EngineError) -> u8 {
    match err {
        EngineError::Parse { .. } => 3,
        EngineError::Invariant(_) => 4,
        _ => 1,
    }
}

fn run(cli: &Cli) -> Result<(), EngineError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(depth) = cli.depth {
        config.max_depth = depth;
    }
    if let Some(tries) = cli.tries {
        config.max_tries = tries;
    }
    if let Some(iter) = cli.iter {
        config.max_iter = iter;
    }
    config.constant_recheck = cli.constant != 0;

    let source_text = std::fs::read_to_string(&cli.input)?;
    let source = parser::parse(&source_text)?;

    let targets: Vec<&ast::FunctionDef> = match &cli.func {
        Some(name) => vec![source.find(name).ok_or_else(|| EngineError::Invariant(format!("no function named `{name}`")))?],
        None => source.functions.iter().collect(),
    };

    let options = AnalysisOptions {
        max_depth: config.max_depth,
        max_tries: config.max_tries,
        max_iter: config.max_iter,
        constant_recheck: config.constant_recheck,
    };

    let mut z3_config = z3::Config::new();
    if let Some(timeout_ms) = config.solver_timeout_ms {
        z3_config.set_timeout_msec(timeout_ms as u64);
    }
    let ctx = z3::Context::new(&z3_config);

    for func in targets {
        let report = orchestrator::analyze_function(&source, func, &options, &ctx)?;
        println!("{}", report::render_function_report(&report));
    }

    Ok(())
}
