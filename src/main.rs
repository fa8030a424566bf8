use clap::Parser;
use estreval::{Error, EvalOptions, Interpreter, JsObject, JsValue, Node, ParseOptions, Source};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "estreval", version, about = "Sandboxed evaluator for ESTree programs")]
struct Cli {
    /// Script to evaluate
    file: Option<PathBuf>,

    /// Evaluate inline source
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Wall-clock limit per evaluation in milliseconds (0 disables it)
    #[arg(long, default_value_t = 100)]
    timeout: u64,

    /// Maximum number of evaluation steps
    #[arg(long = "max-steps", default_value_t = 1024)]
    max_steps: u64,

    /// Treat the input as ESTree JSON instead of source text
    #[arg(long)]
    ast: bool,

    /// Parse the input and print its AST as JSON without running it
    #[arg(long = "print-ast")]
    print_ast: bool,
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn report(err: &Error) {
    match err {
        Error::Uncaught { message, .. } => eprintln!("Uncaught {message}"),
        other => eprintln!("{other}"),
    }
}

fn print_ast(input: &str) -> ExitCode {
    let json = estreval::parse(input, &ParseOptions::default())
        .map_err(Error::from)
        .and_then(|node| Ok(node.to_json()?));
    match json {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            ExitCode::from(1)
        }
    }
}

fn run_input(input: String, as_ast: bool, options: EvalOptions) -> ExitCode {
    let source = if as_ast {
        match Node::from_json(&input) {
            Ok(node) => Source::Ast(node),
            Err(e) => {
                eprintln!("Invalid AST: {e}");
                return ExitCode::from(1);
            }
        }
    } else {
        Source::Text(input)
    };
    match estreval::evaluate(source, &JsObject::new(), options) {
        Ok(JsValue::Undefined) => ExitCode::SUCCESS,
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            ExitCode::from(1)
        }
    }
}

/// Every line runs against the same bindings, so declarations carry over.
fn run_repl(options: EvalOptions) -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let bindings = JsObject::new();
    let mut interp = Interpreter::with_options(&bindings, options);

    println!("estreval v{}", env!("CARGO_PKG_VERSION"));
    println!("Type expressions or statements. Press Ctrl-D to exit.");

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match interp.evaluate(trimmed) {
                    Ok(value) => println!("{value:?}"),
                    Err(e) => report(&e),
                }
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
    }

    println!();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let options = EvalOptions::default()
        .with_timeout(cli.timeout)
        .with_max_steps(cli.max_steps)
        .with_default_parser();

    let input = if let Some(code) = cli.eval {
        code
    } else if let Some(path) = &cli.file {
        match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                return ExitCode::from(1);
            }
        }
    } else {
        return run_repl(options);
    };

    if cli.print_ast {
        return print_ast(&input);
    }
    run_input(input, cli.ast, options)
}
