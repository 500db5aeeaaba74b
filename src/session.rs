use std::io::{BufRead, Write};

use miette::{IntoDiagnostic, Report, WrapErr};

use crate::{
    eval::{Environment, Evaluator, Value},
    lex::tokenize,
    parse::{Grammar, Parser},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportStyle {
    /// The one-line message of each diagnostic.
    #[default]
    Plain,
    /// Full miette reports with labeled source snippets.
    Fancy,
}

/// Everything one input line produced.
#[derive(Debug)]
pub struct LineOutcome {
    pub diagnostics: Vec<Report>,
    pub value: Option<Value>,
}

impl LineOutcome {
    /// The text shown for this line, if any.
    pub fn printed(&self) -> Option<String> {
        self.value
            .as_ref()
            .filter(|value| value.is_printable())
            .map(Value::to_string)
    }

    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(Report::to_string).collect()
    }
}

/// An interactive session: one environment and one grammar shared by every
/// line read.
pub struct Session {
    environment: Environment,
    grammar: Grammar,
    style: ReportStyle,
    filename: Option<String>,
}

impl Session {
    pub fn new(style: ReportStyle) -> Self {
        Session {
            environment: Environment::new(),
            grammar: Grammar::new(),
            style,
            filename: None,
        }
    }

    /// Names the source in diagnostics. `run` appends the line number.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn eval_line(&mut self, line: &str) -> LineOutcome {
        let filename = self.filename.clone();
        self.eval_named(filename.as_deref(), line)
    }

    fn eval_named(&mut self, filename: Option<&str>, line: &str) -> LineOutcome {
        let (tokens, lex_errors) = tokenize(filename, line);
        let mut diagnostics: Vec<Report> = lex_errors.into_iter().map(Report::new).collect();

        let node = match Parser::new(filename, line, tokens).parse_statement(&self.grammar) {
            Ok(node) => node,
            Err(e) => {
                // a line that already failed to lex is not reported twice
                if diagnostics.is_empty() {
                    diagnostics.push(Report::new(e));
                }
                return LineOutcome {
                    diagnostics,
                    value: None,
                };
            }
        };

        let mut evaluator = Evaluator::new(&mut self.environment, filename, line);
        let result = evaluator.eval(node);
        diagnostics.extend(evaluator.into_warnings().into_iter().map(Report::new));

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                diagnostics.push(Report::new(e));
                None
            }
        };

        LineOutcome { diagnostics, value }
    }

    pub fn render(&self, report: &Report) -> String {
        match self.style {
            ReportStyle::Plain => report.to_string(),
            ReportStyle::Fancy => format!("{report:?}"),
        }
    }

    /// Diagnostics go to `err`, a printable value to `out`.
    pub fn write_outcome(
        &self,
        outcome: &LineOutcome,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> miette::Result<()> {
        for report in &outcome.diagnostics {
            writeln!(err, "{}", self.render(report))
                .into_diagnostic()
                .wrap_err("writing diagnostic failed")?;
        }
        if let Some(text) = outcome.printed() {
            writeln!(out, "{text}")
                .into_diagnostic()
                .wrap_err("writing result failed")?;
        }
        Ok(())
    }

    /// Evaluates every non-blank line of `input` until it is exhausted.
    /// Bytes that are not UTF-8 are replaced and then rejected by the lexer.
    pub fn run(
        &mut self,
        mut input: impl BufRead,
        mut out: impl Write,
        mut err: impl Write,
    ) -> miette::Result<()> {
        let mut buf = Vec::new();
        for index in 0.. {
            buf.clear();
            let read = input
                .read_until(b'\n', &mut buf)
                .into_diagnostic()
                .wrap_err("reading input failed")?;
            if read == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }

            let filename = self
                .filename
                .as_ref()
                .map(|filename| format!("{filename}:{}", index + 1));
            let outcome = self.eval_named(filename.as_deref(), line);
            self.write_outcome(&outcome, &mut out, &mut err)?;
        }
        out.flush().into_diagnostic()?;
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ReportStyle::default())
    }
}
