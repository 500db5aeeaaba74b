use std::{collections::HashMap, fmt::Display};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{
    named_source,
    parse::{BinOp, Node},
};

#[derive(Error, Debug, Diagnostic)]
#[error("Undefined variable '{name}' found!")]
#[diagnostic(
    code(calc::eval::undefined_variable),
    severity(Warning),
    help("`{name}` has not been assigned yet, 0 was used instead")
)]
pub struct UndefinedVariable {
    #[source_code]
    src: NamedSource<String>,

    #[label("never assigned")]
    bad_bit: SourceSpan,

    pub name: String,
}

#[derive(Error, Debug, Diagnostic)]
pub enum RuntimeError {
    #[error("Cannot apply '{op}' to {lhs} and {rhs}")]
    #[diagnostic(
        code(calc::eval::type_mismatch),
        help("arithmetic is only defined on numbers")
    )]
    TypeMismatch {
        #[source_code]
        src: NamedSource<String>,

        #[label("this operator")]
        bad_bit: SourceSpan,

        op: BinOp,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("Division by zero")]
    #[diagnostic(code(calc::eval::division_by_zero))]
    DivisionByZero {
        #[source_code]
        src: NamedSource<String>,

        #[label("the right-hand side is zero")]
        bad_bit: SourceSpan,
    },

    #[error("Integer overflow in '{op}'")]
    #[diagnostic(
        code(calc::eval::overflow),
        help("integers are 64-bit and signed")
    )]
    Overflow {
        #[source_code]
        src: NamedSource<String>,

        #[label("this operation overflows")]
        bad_bit: SourceSpan,

        op: BinOp,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    /// Only produced by a division that does not come out even.
    Real(f64),
    /// Either a string literal (quotes included) or the name an assignment
    /// returns.
    Text(String),
}

impl Value {
    /// Numbers are always shown, text only when it is a quoted string.
    pub fn is_printable(&self) -> bool {
        match self {
            Value::Integer(_) | Value::Real(_) => true,
            Value::Text(text) => text.starts_with('"'),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
        }
    }

    fn as_real(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Real(n) => Some(*n),
            Value::Text(_) => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Real(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Variables of one session. Names are created on first assignment and
/// never removed.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the value previously bound to `name`, if any.
    pub fn assign(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bindings ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        let mut bindings: Vec<_> = self
            .values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(b.0));
        bindings.into_iter()
    }
}

pub struct Evaluator<'a> {
    environment: &'a mut Environment,
    filename: Option<&'a str>,
    whole: &'a str,
    warnings: Vec<UndefinedVariable>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        environment: &'a mut Environment,
        filename: Option<&'a str>,
        whole: &'a str,
    ) -> Self {
        Self {
            environment,
            filename,
            whole,
            warnings: Vec::new(),
        }
    }

    /// Undefined variables met so far. Each was replaced by 0.
    pub fn into_warnings(self) -> Vec<UndefinedVariable> {
        self.warnings
    }

    pub fn eval(&mut self, node: Node<'_>) -> Result<Option<Value>, RuntimeError> {
        Ok(match node {
            Node::Number(n) => Some(Value::Integer(n)),
            Node::Str(s) => Some(Value::Text(s.to_string())),
            Node::Var { name, offset } => Some(match self.environment.get(name) {
                Some(value) => value.clone(),
                None => {
                    let warning = UndefinedVariable {
                        src: self.src(),
                        bad_bit: SourceSpan::from(offset..offset + name.len()),
                        name: name.to_string(),
                    };
                    self.warnings.push(warning);
                    Value::Integer(0)
                }
            }),
            Node::Binary {
                op,
                lhs,
                rhs,
                offset,
            } => {
                let lhs = self.operand(*lhs)?;
                let rhs = self.operand(*rhs)?;
                Some(self.apply(op, lhs, rhs, offset)?)
            }
            // the operand comes back with its sign untouched
            Node::Negate { operand, .. } => self.eval(*operand)?,
            Node::Assign { name, value } => {
                let value = self.operand(*value)?;
                self.environment.assign(name, value);
                Some(Value::Text(name.to_string()))
            }
            Node::Empty => None,
        })
    }

    fn operand(&mut self, node: Node<'_>) -> Result<Value, RuntimeError> {
        Ok(self.eval(node)?.unwrap_or(Value::Integer(0)))
    }

    fn apply(
        &self,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        offset: usize,
    ) -> Result<Value, RuntimeError> {
        let bad_bit = SourceSpan::from(offset..offset + 1);
        if let (Value::Integer(l), Value::Integer(r)) = (&lhs, &rhs) {
            return self.apply_integer(op, *l, *r, bad_bit);
        }
        match (lhs.as_real(), rhs.as_real()) {
            (Some(l), Some(r)) => self.apply_real(op, l, r, bad_bit),
            _ => Err(RuntimeError::TypeMismatch {
                src: self.src(),
                bad_bit,
                op,
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            }),
        }
    }

    fn apply_integer(
        &self,
        op: BinOp,
        l: i64,
        r: i64,
        bad_bit: SourceSpan,
    ) -> Result<Value, RuntimeError> {
        let result = match op {
            BinOp::Add => l.checked_add(r),
            BinOp::Sub => l.checked_sub(r),
            BinOp::Mul => l.checked_mul(r),
            BinOp::Div => {
                if r == 0 {
                    return Err(self.division_by_zero(bad_bit));
                }
                match l.checked_rem(r) {
                    Some(0) => l.checked_div(r),
                    Some(_) => return Ok(Value::Real(l as f64 / r as f64)),
                    None => None,
                }
            }
        };
        result.map(Value::Integer).ok_or_else(|| RuntimeError::Overflow {
            src: self.src(),
            bad_bit,
            op,
        })
    }

    fn apply_real(
        &self,
        op: BinOp,
        l: f64,
        r: f64,
        bad_bit: SourceSpan,
    ) -> Result<Value, RuntimeError> {
        Ok(Value::Real(match op {
            BinOp::Add => l + r,
            BinOp::Sub => l - r,
            BinOp::Mul => l * r,
            BinOp::Div => {
                if r == 0.0 {
                    return Err(self.division_by_zero(bad_bit));
                }
                l / r
            }
        }))
    }

    fn division_by_zero(&self, bad_bit: SourceSpan) -> RuntimeError {
        RuntimeError::DivisionByZero {
            src: self.src(),
            bad_bit,
        }
    }

    fn src(&self) -> NamedSource<String> {
        named_source(self.filename, self.whole)
    }
}
