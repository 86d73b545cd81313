use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Number(pub f64);

impl Number {
    pub fn new(value: f64) -> Self {
        Self(value)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.to_bits());
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Token {
    Ident(String),
    Int(i64),
    Float(Number),
    Str(String),
    KwAnd,
    KwOr,
    KwNot,
    KwIn,
    True,
    False,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    CmpEq,
    CmpNeq,
    CmpGt,
    CmpGte,
    CmpLt,
    CmpLte,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier `{}`", s),
            Token::Int(n) => write!(f, "number `{}`", n),
            Token::Float(n) => write!(f, "number `{}`", n),
            Token::Str(s) => write!(f, "string '{}'", s),
            Token::KwAnd => write!(f, "'and'"),
            Token::KwOr => write!(f, "'or'"),
            Token::KwNot => write!(f, "'not'"),
            Token::KwIn => write!(f, "'in'"),
            Token::True => write!(f, "'True'"),
            Token::False => write!(f, "'False'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Comma => write!(f, "','"),
            Token::Dot => write!(f, "'.'"),
            Token::CmpEq => write!(f, "'=='"),
            Token::CmpNeq => write!(f, "'!='"),
            Token::CmpGt => write!(f, "'>'"),
            Token::CmpGte => write!(f, "'>='"),
            Token::CmpLt => write!(f, "'<'"),
            Token::CmpLte => write!(f, "'<='"),
        }
    }
}
