use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use calc_lang::lex::tokenize;
use calc_lang::{Grammar, Lexer, ReportStyle, Session};
use clap::Parser;
use clap::Subcommand;
use miette::{IntoDiagnostic, Report, WrapErr};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

#[derive(Parser, Debug)]
#[command(version, about = "A line-oriented calculator")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Prompt shown before each interactive line
    #[arg(long, default_value = "calc > ", global = true)]
    prompt: String,

    /// Render diagnostics as full reports with source snippets
    #[arg(long, global = true)]
    fancy: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the tokens of a file
    Tokenize { filename: PathBuf },
    /// Print the parse tree of every line of a file
    Parse { filename: PathBuf },
    /// Evaluate a file line by line
    Run { filename: PathBuf },
}

fn read(filename: &Path) -> miette::Result<String> {
    fs::read_to_string(filename)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading `{}` failed", filename.display()))
}

fn emit(style: ReportStyle, report: Report) {
    match style {
        ReportStyle::Plain => eprintln!("{report}"),
        ReportStyle::Fancy => eprintln!("{report:?}"),
    }
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    let style = if args.fancy {
        ReportStyle::Fancy
    } else {
        ReportStyle::Plain
    };

    match args.command {
        None => {
            if io::stdin().is_terminal() {
                repl(&args.prompt, style)?;
            } else {
                Session::new(style).run(
                    io::stdin().lock(),
                    io::stdout().lock(),
                    io::stderr(),
                )?;
            }
        }
        Some(Commands::Run { filename }) => {
            let file_contents = read(&filename)?;
            Session::new(style)
                .with_filename(filename.display().to_string())
                .run(file_contents.as_bytes(), io::stdout().lock(), io::stderr())?;
        }
        Some(Commands::Tokenize { filename }) => {
            let file_contents = read(&filename)?;
            let mut had_error = false;

            for token in Lexer::new(filename.to_str(), &file_contents) {
                match token {
                    Ok(token) => println!("{token}"),
                    Err(e) => {
                        had_error = true;
                        eprintln!("[line {}] Error: {e}", e.line());
                        if style == ReportStyle::Fancy {
                            eprintln!("{:?}", Report::new(e));
                        }
                    }
                }
            }
            println!("EOF  null");

            if had_error {
                std::process::exit(65);
            }
        }
        Some(Commands::Parse { filename }) => {
            let file_contents = read(&filename)?;
            let grammar = Grammar::new();
            let mut had_error = false;

            for (index, line) in file_contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let name = format!("{}:{}", filename.display(), index + 1);
                let (tokens, lex_errors) = tokenize(Some(name.as_str()), line);
                if !lex_errors.is_empty() {
                    had_error = true;
                    lex_errors
                        .into_iter()
                        .for_each(|e| emit(style, Report::new(e)));
                    continue;
                }

                let parsed = calc_lang::Parser::new(Some(name.as_str()), line, tokens)
                    .parse_statement(&grammar);
                match parsed {
                    Ok(statement) => println!("{statement}"),
                    Err(e) => {
                        had_error = true;
                        emit(style, Report::new(e));
                    }
                }
            }

            if had_error {
                std::process::exit(65);
            }
        }
    }
    Ok(())
}

fn repl(prompt: &str, style: ReportStyle) -> miette::Result<()> {
    let mut editor = DefaultEditor::new()
        .into_diagnostic()
        .wrap_err("starting the line editor failed")?;
    let mut session = Session::new(style);

    loop {
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).into_diagnostic().wrap_err("reading input failed"),
        };
        if line.trim().is_empty() {
            continue;
        }
        editor.add_history_entry(line.as_str()).into_diagnostic()?;

        let outcome = session.eval_line(&line);
        session.write_outcome(&outcome, &mut io::stdout(), &mut io::stderr())?;
    }
    Ok(())
}
