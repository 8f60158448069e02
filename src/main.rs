use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::{ErrorReporter, StrictReporter};
use rox::parser::Parser;
use rox::scanner::{scan, Scanner};
use rox::Lox;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    /// Omit to start the interactive prompt
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt
    Repl,
}

/// Whole source file as text.
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let source = fs::read_to_string(&filename)
        .with_context(|| format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", source.len(), filename);
    Ok(source)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Exit status for a finished batch run: 65 for static errors, 70 for
/// runtime errors.
fn exit_on_error(reporter: &StrictReporter) {
    if reporter.had_error() {
        debug!("Static error reported, exiting with code 65");
        std::process::exit(65);
    }

    if reporter.had_runtime_error() {
        debug!("Runtime error reported, exiting with code 70");
        std::process::exit(70);
    }
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                if json {
                    println!("{}", serde_json::to_string(&token)?);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(65);
    }

    Ok(())
}

fn parse(source: &str) {
    let (tokens, lex_errors) = scan(source);
    for e in &lex_errors {
        eprintln!("{}", e);
    }

    let (expr, errors) = Parser::new(&tokens).parse_expression();
    for e in &errors {
        eprintln!("{}", e);
    }

    match expr {
        Some(expr) if lex_errors.is_empty() && errors.is_empty() => {
            let ast_str = AstPrinter::print(&expr);
            debug!("AST: {}", ast_str);
            println!("{}", ast_str);
        }
        _ => std::process::exit(65),
    }
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut lox = Lox::new();
    let mut reporter = StrictReporter::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            println!();
            break;
        }

        lox.run_line(&line, &mut reporter);

        // A bad line never ends the session.
        reporter.reset();
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Some(Commands::Tokenize { filename, json }) => {
            info!("Running Tokenize subcommand");
            let source = read_file(filename)?;
            tokenize(&source, json)?;
        }

        Some(Commands::Parse { filename }) => {
            info!("Running Parse subcommand");
            let source = read_file(filename)?;
            parse(&source);
        }

        Some(Commands::Evaluate { filename }) => {
            info!("Running Evaluate subcommand");
            let source = read_file(filename)?;

            let mut reporter = StrictReporter::new();
            Lox::new().evaluate(&source, &mut reporter);
            exit_on_error(&reporter);
        }

        Some(Commands::Run { filename }) => {
            info!("Running Run subcommand");
            let source = read_file(filename)?;
            info!("Provided input:\n {}", source);

            let mut reporter = StrictReporter::new();
            Lox::new().run(&source, &mut reporter);
            exit_on_error(&reporter);
        }

        Some(Commands::Repl) | None => repl()?,
    }

    Ok(())
}
