use chumsky::error::Simple;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Range;
use thiserror::Error;

/// A disallowed or malformed form inside a filter expression
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message} (at {}..{})", .span.start, .span.end)]
pub struct CompileError {
    pub message: String,
    /// Byte range into the expression text
    pub span: Range<usize>,
}

/// Every compile error found in one expression
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid filter expression `{expression}`: {}", summarize(.errors))]
pub struct FilterError {
    pub expression: String,
    pub errors: Vec<CompileError>,
}

fn summarize(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Chumsky reports character offsets; convert them to byte offsets.
fn byte_offset(source: &str, char_offset: usize) -> usize {
    source
        .char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(source.len())
}

pub(crate) fn to_compile_error<T: Display + std::hash::Hash + std::cmp::Eq>(
    err: Simple<T>,
    source: &str,
) -> CompileError {
    let span = err.span();
    CompileError {
        message: err.to_string(),
        span: byte_offset(source, span.start)..byte_offset(source, span.end),
    }
}
