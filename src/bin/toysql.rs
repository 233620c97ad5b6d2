//! toysql CLI - tokenize, parse and validate SQL statements
//!
//! Usage: toysql [OPTIONS] [SCRIPT]
//!
//! Reads statements from SCRIPT, or from stdin when it is omitted, and
//! prints the tokens, syntax tree and validation result of each one.

use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};

use toysql::shell::{Shell, StatementBuffer};
use toysql::{Config, Session};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    println!("Usage: toysql [OPTIONS] [SCRIPT]");
    println!();
    println!("Options:");
    println!("  --help             Show this help");
    println!("  --version          Show version");
    println!("  --no-tokens        Do not print the token table");
    println!("  --no-ast           Do not print the syntax tree");
    println!("  --echo             Echo each statement before processing it");
    println!("  --max-depth N      Limit nesting of conditions and subqueries");
    println!();
    println!("If SCRIPT is omitted, statements are read from stdin.");
    println!("Set RUST_LOG (e.g. RUST_LOG=toysql=debug) for diagnostics on stderr.");
}

/// Run the prompt loop on a terminal
fn run_interactive<W: Write>(shell: &mut Shell<W>) -> toysql::Result<()> {
    let stdin = io::stdin();
    let mut buffer = StatementBuffer::new();
    let mut line = String::new();

    loop {
        let prompt = if buffer.is_empty() { "toysql> " } else { "   ...> " };
        print!("{}", prompt);
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        if let Some(input) = buffer.push_line(&line) {
            if !shell.handle(input)? {
                return Ok(());
            }
        }
    }

    if let Some(input) = buffer.finish() {
        shell.handle(input)?;
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = Config::default();
    let mut script: Option<String> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-help" | "--help" | "-?" => {
                print_usage();
                return;
            }
            "-version" | "--version" => {
                println!("toysql {}", VERSION);
                return;
            }
            "--no-tokens" => config.show_tokens = false,
            "--no-ast" => config.show_ast = false,
            "--echo" => config.echo = true,
            "--max-depth" => {
                i += 1;
                let value = args.get(i).map(String::as_str).unwrap_or("");
                if let Err(e) = config.set("max_depth", value) {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
            arg if !arg.starts_with('-') => {
                script = Some(arg.to_string());
            }
            arg => {
                eprintln!("Error: unknown option: {}", arg);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut shell = Shell::new(Session::new(config), io::stdout());

    let result = match script {
        Some(path) => match File::open(&path) {
            Ok(file) => shell.run(BufReader::new(file)).map(|_| ()),
            Err(e) => {
                eprintln!("Error: cannot open {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None if io::stdin().is_terminal() => {
            println!("toysql {} - enter SQL statements terminated by ';'", VERSION);
            println!("Enter \".help\" for usage hints, \"exit\" to quit.");
            run_interactive(&mut shell)
        }
        None => shell.run(io::stdin().lock()).map(|_| ()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
