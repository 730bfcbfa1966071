//! Filter parser (C2, §4.2).
//!
//! Recursive-descent parser over the C1 token stream implementing:
//!
//! ```text
//! filter   := orExpr
//! orExpr   := andExpr ("or" andExpr)*
//! andExpr  := unary ("and" unary)*
//! unary    := "not" unary | atom
//! atom     := "(" filter ")" | valPath | attrExpr
//! valPath  := AttrPath "[" filter "]"
//! attrExpr := AttrPath op [value]
//! AttrPath := Ident ("." Ident)?
//! ```

use crate::error::{AppError, AppResult};
use crate::filter::ast::{CompareOp, FilterNode, LogicalOp};
use crate::filter::lexer::{lex, token_to_value, PositionedToken, Token};

pub fn parse_filter(input: &str) -> AppResult<FilterNode> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.parse_or()?;
    if let Some(tok) = parser.peek() {
        return Err(AppError::FilterParse(format!(
            "trailing input at position {}",
            tok.pos
        )));
    }
    Ok(node)
}

struct Parser {
    tokens: Vec<PositionedToken>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&PositionedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<PositionedToken> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> AppResult<()> {
        match self.advance() {
            Some(PositionedToken { token, .. }) if &token == expected => Ok(()),
            Some(PositionedToken { pos, .. }) => Err(AppError::FilterParse(format!(
                "expected {:?} at position {}",
                expected, pos
            ))),
            None => Err(AppError::FilterParse(format!(
                "unexpected end of filter, expected {:?}",
                expected
            ))),
        }
    }

    fn parse_or(&mut self) -> AppResult<FilterNode> {
        let mut left = self.parse_and()?;
        while matches!(self.peek_token(), Some(Token::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = FilterNode::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> AppResult<FilterNode> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek_token(), Some(Token::And)) {
            self.advance();
            let right = self.parse_unary()?;
            left = FilterNode::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> AppResult<FilterNode> {
        if matches!(self.peek_token(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(FilterNode::Negate(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> AppResult<FilterNode> {
        match self.peek_token() {
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(_)) => self.parse_attr_expr_or_val_path(),
            Some(_) | None => {
                let pos = self.peek().map(|t| t.pos).unwrap_or(usize::MAX);
                Err(AppError::FilterParse(format!(
                    "expected attribute path or '(' at position {}",
                    pos
                )))
            }
        }
    }

    fn parse_attr_expr_or_val_path(&mut self) -> AppResult<FilterNode> {
        let attr = match self.advance() {
            Some(PositionedToken {
                token: Token::Ident(name),
                ..
            }) => name,
            _ => unreachable!("caller already peeked an Ident"),
        };

        if matches!(self.peek_token(), Some(Token::LBracket)) {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(&Token::RBracket)?;
            return Ok(attach_namespace(inner, attr));
        }

        self.parse_compare(attr)
    }

    fn parse_compare(&mut self, attr: String) -> AppResult<FilterNode> {
        let op_tok = self.advance().ok_or_else(|| {
            AppError::FilterParse(format!("expected operator after attribute '{}'", attr))
        })?;
        let op = match op_tok.token {
            Token::Op(op) => op,
            _ => {
                return Err(AppError::FilterParse(format!(
                    "expected comparison operator at position {}",
                    op_tok.pos
                )))
            }
        };

        if op == CompareOp::Pr {
            return Ok(FilterNode::compare(attr, op, None));
        }

        let value_tok = self.advance().ok_or_else(|| {
            AppError::FilterParse(format!("missing value for operator at position {}", op_tok.pos))
        })?;
        let value = token_to_value(&value_tok.token).ok_or_else(|| {
            AppError::FilterParse(format!(
                "expected a value at position {}",
                value_tok.pos
            ))
        })?;

        Ok(FilterNode::compare(attr, op, Some(value)))
    }
}

/// Tag every `Compare` leaf of a value sub-filter with the outer attribute
/// path it is scoped to (§4.2: "namespace is the outer AttrPath of a
/// valPath"). Logical/Negate nodes are walked through unchanged so
/// `members[value eq "a" or value eq "b"]` scopes both comparisons.
fn attach_namespace(node: FilterNode, namespace: String) -> FilterNode {
    match node {
        FilterNode::Compare {
            attr,
            op,
            value,
            namespace: existing,
        } => FilterNode::Compare {
            attr,
            op,
            value,
            namespace: existing.or(Some(namespace)),
        },
        FilterNode::Logical { op, left, right } => FilterNode::Logical {
            op,
            left: Box::new(attach_namespace(*left, namespace.clone())),
            right: Box::new(attach_namespace(*right, namespace)),
        },
        FilterNode::Negate(inner) => FilterNode::Negate(Box::new(attach_namespace(*inner, namespace))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_simple_equal() {
        let node = parse_filter(r#"userName eq "jdoe""#).unwrap();
        assert_eq!(
            node,
            FilterNode::compare("userName", CompareOp::Eq, Some(json!("jdoe")))
        );
    }

    #[test]
    fn parses_present() {
        let node = parse_filter("emails pr").unwrap();
        assert_eq!(node, FilterNode::compare("emails", CompareOp::Pr, None));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let node = parse_filter(r#"a eq "1" or b eq "2" and c eq "3""#).unwrap();
        match node {
            FilterNode::Logical {
                op: LogicalOp::Or,
                left,
                right,
            } => {
                assert_eq!(*left, FilterNode::compare("a", CompareOp::Eq, Some(json!("1"))));
                assert!(matches!(
                    *right,
                    FilterNode::Logical {
                        op: LogicalOp::And,
                        ..
                    }
                ));
            }
            other => panic!("expected top-level Or, got {:?}", other),
        }
    }

    #[test]
    fn parses_value_sub_filter_with_namespace() {
        let node = parse_filter(r#"members[value eq "u1"]"#).unwrap();
        match node {
            FilterNode::Compare { attr, namespace, .. } => {
                assert_eq!(attr, "value");
                assert_eq!(namespace.as_deref(), Some("members"));
            }
            other => panic!("expected Compare, got {:?}", other),
        }
    }

    #[test]
    fn parses_negation_and_grouping() {
        let node = parse_filter(r#"not (userName eq "john" and active eq true)"#).unwrap();
        match node {
            FilterNode::Negate(inner) => {
                assert!(matches!(*inner, FilterNode::Logical { op: LogicalOp::And, .. }));
            }
            other => panic!("expected Negate, got {:?}", other),
        }
    }

    #[test]
    fn unknown_operator_is_filter_parse_error() {
        let err = parse_filter(r#"userName equals "x""#).unwrap_err();
        assert!(matches!(err, AppError::FilterParse(_)));
    }

    #[test]
    fn missing_operand_is_an_error() {
        assert!(parse_filter("userName eq").is_err());
    }

    #[test]
    fn trailing_junk_is_an_error() {
        assert!(parse_filter(r#"userName eq "jdoe" extra"#).is_err());
    }

    #[test]
    fn dotted_attribute_path_parses_as_single_attr() {
        let node = parse_filter(r#"name.givenName eq "J""#).unwrap();
        assert_eq!(
            node,
            FilterNode::compare("name.givenName", CompareOp::Eq, Some(json!("J")))
        );
    }
}
