// ABOUTME: Thin CLI/REPL boundary over the embeddable host API

use std::fs;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use emberscript::config::{VERSION, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use emberscript::{EmberError, Env};

#[derive(ClapParser, Debug)]
#[command(name = "ember", version = VERSION, about = "An embeddable scripting language")]
struct CliArgs {
    /// Script file to run. With no script, starts an interactive REPL.
    script: Option<String>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match args.script {
        Some(path) => run_script(&path),
        None => {
            run_repl();
            ExitCode::SUCCESS
        }
    }
}

fn run_script(path: &str) -> ExitCode {
    let src = match fs::read_to_string(path) {
        Ok(src) => src,
        Err(err) => {
            eprintln!("ember: could not read '{}': {}", path, err);
            return ExitCode::FAILURE;
        }
    };

    let env = Env::new();
    match env.execute(&src) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ember: {}", EmberError::from(err));
            ExitCode::FAILURE
        }
    }
}

fn run_repl() {
    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);

    let env = Env::new();
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("ember: could not start line editor: {}", err);
            return;
        }
    };
    let history_path = ".ember_history";
    let _ = editor.load_history(history_path);

    loop {
        match editor.readline("ember> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == ".exit" {
                    break;
                }
                let _ = editor.add_history_entry(line);
                match env.execute(line) {
                    Ok(value) => println!("{}", value),
                    Err(err) => eprintln!("ember: {}", EmberError::from(err)),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("ember: readline error: {}", err);
                break;
            }
        }
    }

    let _ = editor.save_history(history_path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_parse_script_path() {
        let args = CliArgs::parse_from(["ember", "script.ember"]);
        assert_eq!(args.script.as_deref(), Some("script.ember"));
    }

    #[test]
    fn test_cli_args_parse_no_script() {
        let args = CliArgs::parse_from(["ember"]);
        assert_eq!(args.script, None);
    }
}
