use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compiled filter tree. The node set is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Name(String),
    Tuple(Vec<Literal>),
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    BoolOp(BoolOp),
    Call(Call),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Int(n) => Value::Int(*n),
            Literal::Float(x) => Value::Float(*x),
            Literal::Bool(b) => Value::Bool(*b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    In,
    NotIn,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmpOp::Eq => write!(f, "=="),
            CmpOp::NotEq => write!(f, "!="),
            CmpOp::In => write!(f, "in"),
            CmpOp::NotIn => write!(f, "not in"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoolOp {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    IsClass(String),
    IsKindOf(String),
}

impl Expr {
    /// Every variable name referenced anywhere in the tree
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Name(name) => names.push(name.as_str()),
                Expr::Compare { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
                Expr::BoolOp(BoolOp::And(items)) | Expr::BoolOp(BoolOp::Or(items)) => {
                    stack.extend(items.iter().rev());
                }
                Expr::BoolOp(BoolOp::Not(inner)) => stack.push(inner),
                Expr::Literal(_) | Expr::Tuple(_) | Expr::Call(_) => {}
            }
        }
        names
    }
}
