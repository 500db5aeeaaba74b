use std::fmt::Display;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::named_source;

#[derive(Error, Debug, Diagnostic)]
pub enum LexError {
    #[error("Illegal character '{token}'")]
    #[diagnostic(
        code(calc::lex::illegal_character),
        help("remove or correct the character: `{token}`")
    )]
    IllegalCharacter {
        #[source_code]
        src: NamedSource<String>,

        #[label("this character")]
        bad_bit: SourceSpan,

        token: char,
    },

    #[error("Unterminated string literal")]
    #[diagnostic(
        code(calc::lex::unterminated_string),
        help("strings end with a `\"` on the same line")
    )]
    UnterminatedString {
        #[source_code]
        src: NamedSource<String>,

        #[label("this quote is never closed")]
        bad_bit: SourceSpan,
    },

    #[error("Number literal '{literal}' does not fit in a 64-bit integer")]
    #[diagnostic(code(calc::lex::number_overflow))]
    NumberOverflow {
        #[source_code]
        src: NamedSource<String>,

        #[label("this numeric literal")]
        bad_bit: SourceSpan,

        literal: String,
    },
}

impl LexError {
    fn parts(&self) -> (&NamedSource<String>, SourceSpan) {
        match self {
            LexError::IllegalCharacter { src, bad_bit, .. }
            | LexError::UnterminatedString { src, bad_bit }
            | LexError::NumberOverflow { src, bad_bit, .. } => (src, *bad_bit),
        }
    }

    pub fn line(&self) -> usize {
        let (src, span) = self.parts();
        src.inner()[..span.offset()].matches('\n').count() + 1
    }

    pub fn span(&self) -> SourceSpan {
        self.parts().1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    /// Byte offset of the first character of `literal` in the whole input.
    pub offset: usize,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Minus,
    Plus,
    Semicolon,
    Star,
    Slash,
    Equal,
    String,
    Ident,
    Number(i64),
}

impl Token<'_> {
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from(self.offset..self.offset + self.literal.len())
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit} null"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit} null"),
            TokenKind::LeftBrace => write!(f, "LEFT_BRACE {lit} null"),
            TokenKind::RightBrace => write!(f, "RIGHT_BRACE {lit} null"),
            TokenKind::Comma => write!(f, "COMMA {lit} null"),
            TokenKind::Minus => write!(f, "MINUS {lit} null"),
            TokenKind::Plus => write!(f, "PLUS {lit} null"),
            TokenKind::Semicolon => write!(f, "SEMICOLON {lit} null"),
            TokenKind::Star => write!(f, "STAR {lit} null"),
            TokenKind::Slash => write!(f, "SLASH {lit} null"),
            TokenKind::Equal => write!(f, "EQUAL {lit} null"),
            TokenKind::String => write!(f, "STRING {lit} {lit}"),
            TokenKind::Ident => write!(f, "IDENTIFIER {lit} null"),
            TokenKind::Number(n) => write!(f, "NUMBER {lit} {n}"),
        }
    }
}

pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    pub byte: usize,
    line: usize,
    nesting_level: usize,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            line: 1,
            nesting_level: 0,
        }
    }

    /// Current `{`/`}` depth. Not used by the grammar.
    pub fn nesting_level(&self) -> usize {
        self.nesting_level
    }

    pub fn line(&self) -> usize {
        self.line
    }

    fn src(&self) -> NamedSource<String> {
        named_source(self.filename, self.whole)
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let literal = &self.rest[..c.len_utf8()];
            let cur = self.rest;
            let offset = self.byte;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Start {
                String,
                Slash,
                Ident,
                Number,
            }

            let line = self.line;
            let process = |kind: TokenKind| {
                Some(Ok(Token {
                    kind,
                    literal,
                    offset,
                    line,
                }))
            };

            let started = match c {
                '(' => return process(TokenKind::LeftParen),
                ')' => return process(TokenKind::RightParen),
                '{' => {
                    self.nesting_level += 1;
                    return process(TokenKind::LeftBrace);
                }
                '}' => {
                    self.nesting_level = self.nesting_level.saturating_sub(1);
                    return process(TokenKind::RightBrace);
                }
                ',' => return process(TokenKind::Comma),
                '-' => return process(TokenKind::Minus),
                '+' => return process(TokenKind::Plus),
                ';' => return process(TokenKind::Semicolon),
                '*' => return process(TokenKind::Star),
                '=' => return process(TokenKind::Equal),
                '/' => Start::Slash,
                'a'..='z' | 'A'..='Z' | '_' => Start::Ident,
                '0'..='9' => Start::Number,
                '"' => Start::String,
                ' ' | '\r' | '\t' => continue,
                '\n' => {
                    self.line += 1;
                    continue;
                }
                c => {
                    return Some(Err(LexError::IllegalCharacter {
                        src: self.src(),
                        bad_bit: SourceSpan::from(offset..self.byte),
                        token: c,
                    }));
                }
            };

            match started {
                Start::String => {
                    // strings never span lines
                    let line_end = self.rest.find('\n').unwrap_or(self.rest.len());
                    if let Some(end) = self.rest[..line_end].find('"') {
                        let literal = &cur[..end + 2];
                        self.byte += end + 1;
                        self.rest = &self.rest[end + 1..];
                        return Some(Ok(Token {
                            kind: TokenKind::String,
                            literal,
                            offset,
                            line,
                        }));
                    } else {
                        // only the opening quote is dropped, scanning resumes right after it
                        return Some(Err(LexError::UnterminatedString {
                            src: self.src(),
                            bad_bit: SourceSpan::from(offset..offset + line_end + 1),
                        }));
                    }
                }
                Start::Slash => {
                    if self.rest.starts_with('/') {
                        let new_line = self.rest.find('\n').unwrap_or(self.rest.len());
                        self.byte += new_line;
                        self.rest = &self.rest[new_line..];
                        continue;
                    } else {
                        return process(TokenKind::Slash);
                    }
                }
                Start::Ident => {
                    let first_non_ident = cur
                        .find(|c| !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_'))
                        .unwrap_or(cur.len());

                    let literal = &cur[..first_non_ident];

                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    return Some(Ok(Token {
                        kind: TokenKind::Ident,
                        literal,
                        offset,
                        line,
                    }));
                }
                Start::Number => {
                    let first_non_digit = cur
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(cur.len());

                    let literal = &cur[..first_non_digit];

                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    let Ok(n) = literal.parse::<i64>() else {
                        return Some(Err(LexError::NumberOverflow {
                            src: self.src(),
                            bad_bit: SourceSpan::from(offset..self.byte),
                            literal: literal.to_string(),
                        }));
                    };

                    return Some(Ok(Token {
                        kind: TokenKind::Number(n),
                        literal,
                        offset,
                        line,
                    }));
                }
            }
        }
    }
}

/// Drains a fresh lexer over `input`, keeping tokens and lexical errors apart.
pub fn tokenize<'de>(
    filename: Option<&'de str>,
    input: &'de str,
) -> (Vec<Token<'de>>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for item in Lexer::new(filename, input) {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }
    (tokens, errors)
}
