use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::lox::Lox;
use rox::repl::Repl;
use rox::scanner::Scanner;
use rox::token::Token;

/// Exit code after lexical, syntax or resolution errors.
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit code after a runtime error.
const EXIT_RUNTIME_ERROR: i32 = 70;

/// Exit code when the input file cannot be read.
const EXIT_IO_ERROR: i32 = 74;

#[derive(ClapParser, Debug)]
#[command(name = "rox", version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the tokens as a JSON array instead of one per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program, or starts a prompt without one
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

/// Reads the source file, exiting with `EXIT_IO_ERROR` if it cannot.
fn read_source(filename: PathBuf) -> String {
    match read_file(filename) {
        Ok(source) => source,
        Err(e) => {
            debug!("Reading input failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_IO_ERROR);
        }
    }
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Write to file with module and source line; RUST_LOG overrides the level
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
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn no_input() -> ! {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let (tokens, errors) = Scanner::new(source).scan_tokens();

    for e in &errors {
        debug!("Tokenization debug: {}", e);
        eprintln!("{}", e);
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?
        );
    } else {
        tokens.iter().for_each(|token: &Token| println!("{}", token));
    }

    if !errors.is_empty() {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        std::process::exit(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn exit_on_errors(lox: &Lox) {
    if lox.had_error() {
        std::process::exit(EXIT_STATIC_ERROR);
    }

    if lox.had_runtime_error() {
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
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
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Tokenize subcommand");

            tokenize(&read_source(filename), json)?;
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Parse subcommand");

            let source = read_source(filename);
            let mut lox = Lox::new();

            if let Some(expr) = lox.parse_expression(&source) {
                let ast_str = AstPrinter::print(&expr);
                debug!("AST: {}", ast_str);
                println!("{}", ast_str);
            }

            exit_on_errors(&lox);
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Evaluate subcommand");

            let source = read_source(filename);
            let mut lox = Lox::new();

            if let Some(value) = lox.evaluate(&source) {
                debug!("Evaluated to: {}", value);
                println!("{}", value);
            }

            exit_on_errors(&lox);
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");

                let source = read_source(filename);
                info!("Provided input:\n {}", source);

                let mut lox = Lox::new();
                lox.run(&source);

                exit_on_errors(&lox);
                info!("Program executed successfully");
            }

            None => {
                info!("No filepath provided for Run; starting prompt");

                Repl::new()
                    .context("Failed to start line editor")?
                    .run()
                    .context("Prompt failed")?;
            }
        },
    }

    Ok(())
}
