use chumsky::prelude::*;

use crate::filter::tokens::{Number, Token};

pub(crate) fn lexer(
) -> impl Parser<char, Vec<(Token, std::ops::Range<usize>)>, Error = Simple<char>> {
    let number = just('-')
        .or_not()
        .then(text::int(10))
        .then(just('.').ignore_then(text::digits(10)).or_not())
        .try_map(|((sign, int_part), frac), span| {
            let mut raw = String::new();
            if sign.is_some() {
                raw.push('-');
            }
            raw.push_str(&int_part);
            match frac {
                Some(frac) => {
                    raw.push('.');
                    raw.push_str(&frac);
                    raw.parse::<f64>()
                        .map(|value| Token::Float(Number::new(value)))
                        .map_err(|_| Simple::custom(span, "invalid number literal"))
                }
                None => raw
                    .parse::<i64>()
                    .map(Token::Int)
                    .map_err(|_| Simple::custom(span, "integer literal out of range")),
            }
        });

    let escape = just('\\').ignore_then(choice::<_, Simple<char>>((
        just('\\'),
        just('\''),
        just('n').to('\n'),
        just('t').to('\t'),
    )));

    let string = just('\'')
        .ignore_then(
            filter(|c: &char| *c != '\\' && *c != '\'')
                .or(escape)
                .repeated()
                .collect::<String>(),
        )
        .then_ignore(just('\''))
        .map(Token::Str);

    let word = text::ident().map(|word: String| match word.as_str() {
        "and" => Token::KwAnd,
        "or" => Token::KwOr,
        "not" => Token::KwNot,
        "in" => Token::KwIn,
        "True" | "true" => Token::True,
        "False" | "false" => Token::False,
        _ => Token::Ident(word),
    });

    // Ordering, subscript and attribute tokens are lexed so the parser can
    // reject them with a precise span.
    let op = choice::<_, Simple<char>>(vec![
        just("==").to(Token::CmpEq).boxed(),
        just("!=").to(Token::CmpNeq).boxed(),
        just(">=").to(Token::CmpGte).boxed(),
        just("<=").to(Token::CmpLte).boxed(),
        just(">").to(Token::CmpGt).boxed(),
        just("<").to(Token::CmpLt).boxed(),
        just("(").to(Token::LParen).boxed(),
        just(")").to(Token::RParen).boxed(),
        just("{").to(Token::LBrace).boxed(),
        just("}").to(Token::RBrace).boxed(),
        just("[").to(Token::LBracket).boxed(),
        just("]").to(Token::RBracket).boxed(),
        just(",").to(Token::Comma).boxed(),
        just(".").to(Token::Dot).boxed(),
    ]);

    choice::<_, Simple<char>>((number, string, word, op))
        .map_with_span(|tok, span| (tok, span))
        .padded()
        .repeated()
        .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        lexer()
            .parse(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_lex_comparison_and_keywords() {
        assert_eq!(
            tokens("eclass == 'A' and not x in (1, -2.5)"),
            vec![
                Token::Ident("eclass".to_string()),
                Token::CmpEq,
                Token::Str("A".to_string()),
                Token::KwAnd,
                Token::KwNot,
                Token::Ident("x".to_string()),
                Token::KwIn,
                Token::LParen,
                Token::Int(1),
                Token::Comma,
                Token::Float(Number::new(-2.5)),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_lex_string_escapes() {
        assert_eq!(
            tokens(r"'it\'s\\\n\t'"),
            vec![Token::Str("it's\\\n\t".to_string())]
        );
    }

    #[test]
    fn test_lex_boolean_spellings() {
        assert_eq!(
            tokens("True true False false"),
            vec![Token::True, Token::True, Token::False, Token::False]
        );
    }

    #[test]
    fn test_lex_rejects_unknown_characters() {
        assert!(lexer().parse("a + b").is_err());
        assert!(lexer().parse("'unterminated").is_err());
    }
}
