use quill::{Environment, Evaluator, Object, Parser};

use clap::Parser as ArgParser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::{fs, process};

#[derive(ArgParser)]
#[clap(about = "Runs a .qu script, or starts a prompt when no script is given.")]
struct Args {
    script: Option<PathBuf>,

    /// Directory that relative import paths resolve against. Defaults to
    /// the script's own directory.
    #[clap(long)]
    source_root: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    match args.script {
        Some(script) => run_file(&script, args.source_root),
        None => run_prompt(),
    }
}

fn run_file(script: &PathBuf, source_root: Option<PathBuf>) {
    let source = match fs::read_to_string(script) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Cannot read {}: {}", script.display(), e);
            process::exit(66);
        }
    };
    let source_root = source_root
        .or_else(|| script.parent().map(PathBuf::from))
        .unwrap_or_default();

    let mut parser = Parser::new(&source, &script.display().to_string());
    parser = parser.with_source_root(source_root);
    let program = match parser.parse() {
        Ok(program) => program,
        Err(errors) => {
            for error in errors {
                eprintln!("{}", error);
            }
            process::exit(65);
        }
    };

    let evaluator = Evaluator::new();
    let env = Environment::new();
    if let Object::Error(message) = evaluator.eval_program(&program, &env) {
        eprintln!("ERROR: {}", message);
        process::exit(70);
    }
}

fn run_prompt() {
    let evaluator = Evaluator::new();
    let env = Environment::new();

    loop {
        print!(">> ");
        if io::stdout().flush().is_err() {
            return;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let program = match Parser::new(&input, "repl").parse() {
            Ok(program) => program,
            Err(errors) => {
                for error in errors {
                    eprintln!("{}", error);
                }
                continue;
            }
        };

        match evaluator.eval_program(&program, &env) {
            Object::Null => {}
            Object::Error(message) => eprintln!("ERROR: {}", message),
            value => println!("{}", value.inspect()),
        }
    }
}
