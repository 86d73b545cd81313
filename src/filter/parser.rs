use chumsky::prelude::*;
use chumsky::Stream;
use std::ops::Range;

use crate::filter::ast::{BoolOp, Call, CmpOp, Expr, Literal};
use crate::filter::errors::{to_compile_error, CompileError};
use crate::filter::lexer::lexer;
use crate::filter::tokens::{Number, Token};

type Emit<'a> = &'a mut dyn FnMut(Simple<Token>);

/// Tokenize and parse a filter expression into its tree
pub(crate) fn parse_expression(source: &str) -> Result<Expr, Vec<CompileError>> {
    let (tokens, lex_errs) = lexer().parse_recovery(source);
    if !lex_errs.is_empty() {
        return Err(lex_errs
            .into_iter()
            .map(|e| to_compile_error(e, source))
            .collect());
    }

    let tokens = tokens.unwrap_or_default();
    let eoi = source.chars().count();
    let stream = Stream::from_iter(eoi..eoi + 1, tokens.into_iter());

    let (parsed, parse_errs) = expression().parse_recovery(stream);
    if !parse_errs.is_empty() {
        return Err(parse_errs
            .into_iter()
            .map(|e| to_compile_error(e, source))
            .collect());
    }

    parsed.ok_or_else(|| {
        vec![CompileError {
            message: "empty filter expression".to_string(),
            span: 0..source.len(),
        }]
    })
}

fn expression() -> impl Parser<Token, Expr, Error = Simple<Token>> {
    let literal = select! {
        Token::Str(s) => Literal::Str(s),
        Token::Int(n) => Literal::Int(n),
        Token::Float(Number(x)) => Literal::Float(x),
        Token::True => Literal::Bool(true),
        Token::False => Literal::Bool(false),
    };
    let ident = select! { Token::Ident(name) => name };

    recursive(|expr| {
        let call = ident
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .allow_trailing()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .validate(|(name, args), span, emit| build_call(name, args, span, emit));

        let empty_tuple = just(Token::LParen)
            .then(just(Token::RParen))
            .to(Expr::Tuple(Vec::new()));

        // `(a)` groups; `(a,)` and `(a, b)` are tuples
        let group_or_tuple = expr
            .clone()
            .then(
                just(Token::Comma)
                    .ignore_then(expr.clone().separated_by(just(Token::Comma)).allow_trailing())
                    .or_not(),
            )
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .validate(|(first, rest), span, emit| match rest {
                None => first,
                Some(rest) => build_tuple(std::iter::once(first).chain(rest).collect(), span, emit),
            });

        let set = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .validate(build_tuple);

        let operand = choice::<_, Simple<Token>>((
            literal.map(Expr::Literal),
            call,
            ident.map(Expr::Name),
            empty_tuple,
            group_or_tuple,
            set,
        ));

        let cmp_op = choice::<_, Simple<Token>>((
            just(Token::CmpEq).to(CmpOp::Eq),
            just(Token::CmpNeq).to(CmpOp::NotEq),
            just(Token::KwIn).to(CmpOp::In),
            just(Token::KwNot).then(just(Token::KwIn)).to(CmpOp::NotIn),
        ));

        let comparison = operand
            .clone()
            .then(cmp_op.then(operand).or_not())
            .validate(|(left, rhs), span, emit| match rhs {
                None => left,
                Some((op, right)) => {
                    if matches!(op, CmpOp::In | CmpOp::NotIn) && !matches!(right, Expr::Tuple(_)) {
                        emit(Simple::custom(
                            span,
                            format!("right side of '{}' must be a tuple or set literal", op),
                        ));
                    }
                    Expr::Compare {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
            });

        let not = just(Token::KwNot)
            .repeated()
            .then(comparison)
            .foldr(|_, inner| Expr::BoolOp(BoolOp::Not(Box::new(inner))));

        let and = not
            .separated_by(just(Token::KwAnd))
            .at_least(1)
            .map(|mut items| {
                if items.len() == 1 {
                    items.remove(0)
                } else {
                    Expr::BoolOp(BoolOp::And(items))
                }
            });

        and.separated_by(just(Token::KwOr))
            .at_least(1)
            .map(|mut items| {
                if items.len() == 1 {
                    items.remove(0)
                } else {
                    Expr::BoolOp(BoolOp::Or(items))
                }
            })
    })
    .then_ignore(end())
}

fn build_call(name: String, args: Vec<Expr>, span: Range<usize>, emit: Emit<'_>) -> Expr {
    let make: fn(String) -> Call = match name.as_str() {
        "is_class" => Call::IsClass,
        "is_kind_of" => Call::IsKindOf,
        _ => {
            emit(Simple::custom(span, format!("unknown function '{}'", name)));
            return Expr::Literal(Literal::Bool(false));
        }
    };

    match args.as_slice() {
        [Expr::Literal(Literal::Str(class))] => Expr::Call(make(class.clone())),
        [_] => {
            emit(Simple::custom(
                span,
                format!("argument of '{}' must be a string literal", name),
            ));
            Expr::Literal(Literal::Bool(false))
        }
        _ => {
            emit(Simple::custom(
                span,
                format!("'{}' takes exactly one argument, got {}", name, args.len()),
            ));
            Expr::Literal(Literal::Bool(false))
        }
    }
}

fn build_tuple(items: Vec<Expr>, span: Range<usize>, emit: Emit<'_>) -> Expr {
    let mut literals = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Expr::Literal(literal) => literals.push(literal),
            other => emit(Simple::custom(
                span.clone(),
                format!("tuple elements must be literals, found {}", describe(&other)),
            )),
        }
    }
    Expr::Tuple(literals)
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Literal(_) => "a literal".to_string(),
        Expr::Name(name) => format!("name '{}'", name),
        Expr::Tuple(_) => "a nested tuple".to_string(),
        Expr::Compare { op, .. } => format!("a '{}' comparison", op),
        Expr::BoolOp(_) => "a boolean expression".to_string(),
        Expr::Call(_) => "a call".to_string(),
    }
}
