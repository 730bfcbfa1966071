//! Filter lexer (C1, §4.1).
//!
//! Tokenizes a SCIM filter string into a flat, owned token stream. The lexer
//! is greedy and deterministic: it never looks at bracket/paren nesting or
//! logical structure, and it never builds a tree — that is the parser's job
//! (C2). Each token carries the byte offset it started at, so parse errors
//! can report a position.

use crate::error::{AppError, AppResult};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// An attribute path, e.g. `userName` or `name.givenName`. Dots are part
    /// of the identifier at the lexer level (§4.1); the parser and evaluator
    /// split on them when resolving a path.
    Ident(String),
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    And,
    Or,
    Not,
    Op(crate::filter::ast::CompareOp),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
    pub token: Token,
    pub pos: usize,
}

pub fn lex(input: &str) -> AppResult<Vec<PositionedToken>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(PositionedToken {
                    token: Token::LParen,
                    pos: i,
                });
                i += 1;
            }
            ')' => {
                tokens.push(PositionedToken {
                    token: Token::RParen,
                    pos: i,
                });
                i += 1;
            }
            '[' => {
                tokens.push(PositionedToken {
                    token: Token::LBracket,
                    pos: i,
                });
                i += 1;
            }
            ']' => {
                tokens.push(PositionedToken {
                    token: Token::RBracket,
                    pos: i,
                });
                i += 1;
            }
            '"' => {
                let start = i;
                i += 1;
                let mut s = String::new();
                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' if i + 1 < chars.len() => {
                            s.push(chars[i + 1]);
                            i += 2;
                        }
                        '"' => {
                            closed = true;
                            i += 1;
                            break;
                        }
                        other => {
                            s.push(other);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err(AppError::FilterParse(format!(
                        "unterminated string literal at position {}",
                        start
                    )));
                }
                tokens.push(PositionedToken {
                    token: Token::Str(s),
                    pos: start,
                });
            }
            c if c.is_ascii_digit() || (c == '-' && peek_digit(&chars, i + 1)) => {
                let start = i;
                let mut end = i + 1;
                while end < chars.len()
                    && (chars[end].is_ascii_digit() || chars[end] == '.' || chars[end] == '-')
                {
                    end += 1;
                }
                let text: String = chars[start..end].iter().collect();
                let number = text.parse::<f64>().map_err(|_| {
                    AppError::FilterParse(format!("invalid number '{}' at position {}", text, start))
                })?;
                tokens.push(PositionedToken {
                    token: Token::Number(number),
                    pos: start,
                });
                i = end;
            }
            c if is_ident_start(c) => {
                let start = i;
                let mut end = i + 1;
                while end < chars.len() && is_ident_continue(chars[end]) {
                    end += 1;
                }
                let word: String = chars[start..end].iter().collect();
                let token = classify_word(&word);
                tokens.push(PositionedToken { token, pos: start });
                i = end;
            }
            other => {
                return Err(AppError::FilterParse(format!(
                    "unexpected character '{}' at position {}",
                    other, i
                )));
            }
        }
    }

    Ok(tokens)
}

fn peek_digit(chars: &[char], i: usize) -> bool {
    chars.get(i).is_some_and(|c| c.is_ascii_digit())
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '-' || c == ':' || c == '$'
}

fn classify_word(word: &str) -> Token {
    let lower = word.to_ascii_lowercase();
    match lower.as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        "null" => Token::Null,
        _ => {
            if let Some(op) = crate::filter::ast::CompareOp::from_str(word) {
                Token::Op(op)
            } else {
                Token::Ident(word.to_string())
            }
        }
    }
}

/// Convert a lexed literal token into a JSON value for use in `Compare`.
pub fn token_to_value(token: &Token) -> Option<Value> {
    match token {
        Token::Str(s) => Some(Value::String(s.clone())),
        Token::Bool(b) => Some(Value::Bool(*b)),
        Token::Null => Some(Value::Null),
        Token::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ast::CompareOp;

    fn toks(input: &str) -> Vec<Token> {
        lex(input).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn lexes_simple_comparison() {
        assert_eq!(
            toks(r#"userName eq "jdoe""#),
            vec![
                Token::Ident("userName".into()),
                Token::Op(CompareOp::Eq),
                Token::Str("jdoe".into()),
            ]
        );
    }

    #[test]
    fn lexes_dotted_path_as_one_ident() {
        assert_eq!(
            toks(r#"name.givenName eq "J""#)[0],
            Token::Ident("name.givenName".into())
        );
    }

    #[test]
    fn lexes_operators_case_insensitively() {
        assert_eq!(toks("active EQ true")[1], Token::Op(CompareOp::Eq));
        assert_eq!(toks("NOT active pr")[0], Token::Not);
    }

    #[test]
    fn lexes_brackets_for_value_subfilter() {
        assert_eq!(
            toks(r#"members[value eq "x"]"#),
            vec![
                Token::Ident("members".into()),
                Token::LBracket,
                Token::Ident("value".into()),
                Token::Op(CompareOp::Eq),
                Token::Str("x".into()),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(lex(r#"userName eq "jdoe"#).is_err());
    }

    #[test]
    fn pr_has_no_trailing_value_token() {
        assert_eq!(
            toks("emails pr"),
            vec![Token::Ident("emails".into()), Token::Op(CompareOp::Pr)]
        );
    }
}
