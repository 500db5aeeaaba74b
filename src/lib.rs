use miette::NamedSource;

pub mod eval;
pub mod lex;
pub mod parse;
pub mod session;

pub use eval::{Environment, Evaluator, Value};
pub use lex::Lexer;
pub use parse::{Grammar, Node, Parser};
pub use session::{LineOutcome, ReportStyle, Session};

/// Source attached to every diagnostic; unnamed input shows up as `<input>`.
pub fn named_source(filename: Option<&str>, whole: &str) -> NamedSource<String> {
    NamedSource::new(filename.unwrap_or("<input>"), whole.to_string())
}
