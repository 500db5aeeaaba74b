use std::fmt::Display;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{
    lex::{Token, TokenKind},
    named_source,
};

#[derive(Error, Debug, Diagnostic)]
pub enum SyntaxError {
    #[error("Syntax error at token '{literal}'")]
    #[diagnostic(code(calc::parse::unexpected_token))]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,

        #[label("not expected here")]
        bad_bit: SourceSpan,

        literal: String,
    },

    #[error("Syntax error at end of input")]
    #[diagnostic(
        code(calc::parse::unexpected_eof),
        help("the line ended before the expression was complete")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,

        #[label("input ends here")]
        bad_bit: SourceSpan,
    },

    #[error("Unclosed '('")]
    #[diagnostic(code(calc::parse::unclosed_paren), help("add a matching `)`"))]
    UnclosedParen {
        #[source_code]
        src: NamedSource<String>,

        #[label("this parenthesis is never closed")]
        bad_bit: SourceSpan,
    },
}

/// One parsed statement. Offsets are byte offsets into the parsed line and
/// only feed diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<'de> {
    Number(i64),
    /// String literal, quotes included.
    Str(&'de str),
    Var {
        name: &'de str,
        offset: usize,
    },
    Binary {
        op: BinOp,
        lhs: Box<Node<'de>>,
        rhs: Box<Node<'de>>,
        offset: usize,
    },
    Negate {
        operand: Box<Node<'de>>,
        offset: usize,
    },
    Assign {
        name: &'de str,
        value: Box<Node<'de>>,
    },
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
        }
    }
}

impl Display for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Number(n) => write!(f, "{n}"),
            Node::Str(s) => write!(f, "{s}"),
            Node::Var { name, .. } => write!(f, "{name}"),
            Node::Binary { op, lhs, rhs, .. } => write!(f, "({op} {lhs} {rhs})"),
            Node::Negate { operand, .. } => write!(f, "(- {operand})"),
            Node::Assign { name, value } => write!(f, "(= {name} {value})"),
            Node::Empty => write!(f, "()"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precedence {
    /// Higher binds tighter. Levels start at 1.
    pub level: u8,
    pub assoc: Assoc,
}

impl Precedence {
    pub fn left(level: u8) -> Self {
        Precedence {
            level,
            assoc: Assoc::Left,
        }
    }

    pub fn right(level: u8) -> Self {
        Precedence {
            level,
            assoc: Assoc::Right,
        }
    }

    fn binding_power(self) -> (u8, u8) {
        let base = self.level * 2;
        match self.assoc {
            Assoc::Left => (base, base + 1),
            Assoc::Right => (base + 1, base),
        }
    }
}

/// Operator table driving the parser. Built once per session and lent to
/// every `Parser::parse_statement` call.
#[derive(Debug, Clone)]
pub struct Grammar {
    infix: Vec<(TokenKind, BinOp, Precedence)>,
    negate: Precedence,
}

impl Grammar {
    pub fn new() -> Self {
        Grammar {
            infix: vec![
                (TokenKind::Plus, BinOp::Add, Precedence::left(1)),
                (TokenKind::Minus, BinOp::Sub, Precedence::left(1)),
                (TokenKind::Star, BinOp::Mul, Precedence::left(2)),
                (TokenKind::Slash, BinOp::Div, Precedence::left(2)),
            ],
            negate: Precedence::right(3),
        }
    }

    pub fn infix_binding_power(&self, kind: TokenKind) -> Option<(BinOp, u8, u8)> {
        self.infix
            .iter()
            .find(|(k, _, _)| *k == kind)
            .map(|&(_, op, prec)| {
                let (l_bp, r_bp) = prec.binding_power();
                (op, l_bp, r_bp)
            })
    }

    pub fn prefix_binding_power(&self) -> ((), u8) {
        ((), self.negate.binding_power().1)
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Parser<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    tokens: std::vec::IntoIter<Token<'de>>,
}

impl<'de> Parser<'de> {
    pub fn new(filename: Option<&'de str>, whole: &'de str, tokens: Vec<Token<'de>>) -> Self {
        Parser {
            filename,
            whole,
            tokens: tokens.into_iter(),
        }
    }

    /// Parses the whole token sequence as exactly one statement.
    pub fn parse_statement(mut self, grammar: &Grammar) -> Result<Node<'de>, SyntaxError> {
        if self.tokens.as_slice().is_empty() {
            return Ok(Node::Empty);
        }

        let is_assignment = matches!(
            self.tokens.as_slice(),
            [
                Token {
                    kind: TokenKind::Ident,
                    ..
                },
                Token {
                    kind: TokenKind::Equal,
                    ..
                },
                ..
            ]
        );

        let statement = if is_assignment {
            self.parse_assignment(grammar)?
        } else {
            self.parse_expression_within(grammar, 0)?
        };

        match self.tokens.next() {
            Some(token) => Err(self.unexpected(token)),
            None => Ok(statement),
        }
    }

    fn parse_assignment(&mut self, grammar: &Grammar) -> Result<Node<'de>, SyntaxError> {
        let name = self.next_or_eof()?;
        self.next_or_eof()?; // '='

        let value = match self.peek() {
            Some(Token {
                kind: TokenKind::String,
                literal,
                ..
            }) => {
                self.tokens.next();
                Node::Str(literal)
            }
            _ => self.parse_expression_within(grammar, 0)?,
        };

        Ok(Node::Assign {
            name: name.literal,
            value: Box::new(value),
        })
    }

    pub fn parse_expression_within(
        &mut self,
        grammar: &Grammar,
        min_bp: u8,
    ) -> Result<Node<'de>, SyntaxError> {
        let lhs_token = self.next_or_eof()?;

        let mut lhs = match lhs_token.kind {
            TokenKind::Number(n) => Node::Number(n),
            TokenKind::Ident => Node::Var {
                name: lhs_token.literal,
                offset: lhs_token.offset,
            },
            TokenKind::LeftParen => {
                let inner = self.parse_expression_within(grammar, 0)?;
                match self.tokens.next() {
                    Some(Token {
                        kind: TokenKind::RightParen,
                        ..
                    }) => inner,
                    Some(token) => return Err(self.unexpected(token)),
                    None => {
                        return Err(SyntaxError::UnclosedParen {
                            src: self.src(),
                            bad_bit: lhs_token.span(),
                        });
                    }
                }
            }
            TokenKind::Minus => {
                let ((), r_bp) = grammar.prefix_binding_power();
                let operand = self.parse_expression_within(grammar, r_bp)?;
                Node::Negate {
                    operand: Box::new(operand),
                    offset: lhs_token.offset,
                }
            }
            _ => return Err(self.unexpected(lhs_token)),
        };

        loop {
            let Some(op_token) = self.peek() else {
                break;
            };
            let Some((op, l_bp, r_bp)) = grammar.infix_binding_power(op_token.kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.tokens.next();

            let rhs = self.parse_expression_within(grammar, r_bp)?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                offset: op_token.offset,
            };
        }

        Ok(lhs)
    }

    fn peek(&self) -> Option<Token<'de>> {
        self.tokens.as_slice().first().copied()
    }

    fn next_or_eof(&mut self) -> Result<Token<'de>, SyntaxError> {
        self.tokens.next().ok_or_else(|| SyntaxError::UnexpectedEof {
            src: self.src(),
            bad_bit: SourceSpan::from(self.whole.len().saturating_sub(1)..self.whole.len()),
        })
    }

    fn unexpected(&self, token: Token<'de>) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            src: self.src(),
            bad_bit: token.span(),
            literal: token.literal.to_string(),
        }
    }

    fn src(&self) -> NamedSource<String> {
        named_source(self.filename, self.whole)
    }
}
