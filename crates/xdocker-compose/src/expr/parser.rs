//! Recursive-descent parser turning a token stream into an [`Expr`].
//!
//! Precedence, lowest first: `or`, `and`, comparisons, `..` (right
//! associative), `+ -`, `* / %`, unary `not -`.

use super::ExprError;
use super::Value;
use super::ast::{BinaryOp, Expr, UnaryOp};
use super::lexer::{self, Token};

/// Cursor into a token stream for recursive-descent parsing.
struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Consumes the next token if it equals `expected`.
    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<(), ExprError> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            other => Err(parse_err(format!("expected {expected:?}, got {other:?}"))),
        }
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

const fn parse_err(message: String) -> ExprError {
    ExprError::Parse(message)
}

/// Parses expression source into an AST.
///
/// A leading `return` keyword is accepted and ignored.
///
/// # Errors
///
/// Returns an error if the source fails to tokenize, is empty, or contains
/// a syntax error or trailing tokens.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = lexer::tokenize(source)?;
    let mut cursor = TokenCursor::new(&tokens);
    let _ = cursor.eat(&Token::Return);
    if cursor.at_end() {
        return Err(parse_err("empty expression".into()));
    }
    let expr = parse_or(&mut cursor)?;
    if let Some(tok) = cursor.peek() {
        return Err(parse_err(format!("unexpected trailing token {tok:?}")));
    }
    Ok(expr)
}

fn parse_or(cursor: &mut TokenCursor<'_>) -> Result<Expr, ExprError> {
    let mut lhs = parse_and(cursor)?;
    while cursor.eat(&Token::Or) {
        let rhs = parse_and(cursor)?;
        lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(cursor: &mut TokenCursor<'_>) -> Result<Expr, ExprError> {
    let mut lhs = parse_comparison(cursor)?;
    while cursor.eat(&Token::And) {
        let rhs = parse_comparison(cursor)?;
        lhs = Expr::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_comparison(cursor: &mut TokenCursor<'_>) -> Result<Expr, ExprError> {
    let lhs = parse_concat(cursor)?;
    let op = match cursor.peek() {
        Some(Token::Eq) => BinaryOp::Eq,
        Some(Token::NotEq) => BinaryOp::NotEq,
        Some(Token::Lt) => BinaryOp::Lt,
        Some(Token::Le) => BinaryOp::Le,
        Some(Token::Gt) => BinaryOp::Gt,
        Some(Token::Ge) => BinaryOp::Ge,
        _ => return Ok(lhs),
    };
    let _ = cursor.advance();
    let rhs = parse_concat(cursor)?;
    Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
}

fn parse_concat(cursor: &mut TokenCursor<'_>) -> Result<Expr, ExprError> {
    let lhs = parse_additive(cursor)?;
    if cursor.eat(&Token::Concat) {
        let rhs = parse_concat(cursor)?;
        return Ok(Expr::Binary(BinaryOp::Concat, Box::new(lhs), Box::new(rhs)));
    }
    Ok(lhs)
}

fn parse_additive(cursor: &mut TokenCursor<'_>) -> Result<Expr, ExprError> {
    let mut lhs = parse_multiplicative(cursor)?;
    loop {
        let op = match cursor.peek() {
            Some(Token::Plus) => BinaryOp::Add,
            Some(Token::Minus) => BinaryOp::Sub,
            _ => return Ok(lhs),
        };
        let _ = cursor.advance();
        let rhs = parse_multiplicative(cursor)?;
        lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
    }
}

fn parse_multiplicative(cursor: &mut TokenCursor<'_>) -> Result<Expr, ExprError> {
    let mut lhs = parse_unary(cursor)?;
    loop {
        let op = match cursor.peek() {
            Some(Token::Star) => BinaryOp::Mul,
            Some(Token::Slash) => BinaryOp::Div,
            Some(Token::Percent) => BinaryOp::Mod,
            _ => return Ok(lhs),
        };
        let _ = cursor.advance();
        let rhs = parse_unary(cursor)?;
        lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
    }
}

fn parse_unary(cursor: &mut TokenCursor<'_>) -> Result<Expr, ExprError> {
    if cursor.eat(&Token::Not) {
        return Ok(Expr::Unary(UnaryOp::Not, Box::new(parse_unary(cursor)?)));
    }
    if cursor.eat(&Token::Minus) {
        return Ok(Expr::Unary(UnaryOp::Neg, Box::new(parse_unary(cursor)?)));
    }
    parse_primary(cursor)
}

fn parse_primary(cursor: &mut TokenCursor<'_>) -> Result<Expr, ExprError> {
    let Some(tok) = cursor.advance().cloned() else {
        return Err(parse_err("unexpected end of expression".into()));
    };

    match tok {
        Token::Integer(n) => Ok(Expr::Literal(Value::Int(n))),
        Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
        Token::StringLiteral(s) => Ok(Expr::Literal(Value::Str(s))),
        Token::True => Ok(Expr::Literal(Value::Bool(true))),
        Token::False => Ok(Expr::Literal(Value::Bool(false))),
        Token::Nil => Ok(Expr::Literal(Value::Nil)),
        Token::Identifier(name) => {
            if cursor.eat(&Token::ParenOpen) {
                let args = parse_list_items(cursor, &Token::ParenClose)?;
                Ok(Expr::Call(name, args))
            } else {
                Ok(Expr::Variable(name))
            }
        }
        Token::ParenOpen => {
            let inner = parse_or(cursor)?;
            cursor.expect_token(&Token::ParenClose)?;
            Ok(inner)
        }
        Token::BracketOpen => Ok(Expr::List(parse_list_items(
            cursor,
            &Token::BracketClose,
        )?)),
        Token::If => parse_if(cursor),
        other => Err(parse_err(format!("unexpected token {other:?}"))),
    }
}

/// Parses comma-separated expressions up to and including `close`.
fn parse_list_items(cursor: &mut TokenCursor<'_>, close: &Token) -> Result<Vec<Expr>, ExprError> {
    let mut items = Vec::new();
    if cursor.eat(close) {
        return Ok(items);
    }
    loop {
        if cursor.at_end() {
            return Err(parse_err("unexpected end of expression inside list".into()));
        }
        items.push(parse_or(cursor)?);
        if cursor.eat(close) {
            return Ok(items);
        }
        cursor.expect_token(&Token::Comma)?;
    }
}

fn parse_if(cursor: &mut TokenCursor<'_>) -> Result<Expr, ExprError> {
    let cond = parse_or(cursor)?;
    cursor.expect_token(&Token::Then)?;
    let then = parse_or(cursor)?;
    cursor.expect_token(&Token::Else)?;
    let otherwise = parse_or(cursor)?;
    cursor.expect_token(&Token::End)?;
    Ok(Expr::If {
        cond: Box::new(cond),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Variable(name.into()))
    }

    fn lit(v: Value) -> Box<Expr> {
        Box::new(Expr::Literal(v))
    }

    #[test]
    fn parse_return_prefix_is_optional() {
        assert_eq!(parse("return size").expect("parse"), *var("size"));
        assert_eq!(parse("size").expect("parse"), *var("size"));
    }

    #[test]
    fn parse_concat_is_right_associative() {
        let expr = parse(r#""a" .. b .. "c""#).expect("parse");
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Concat,
                lit(Value::Str("a".into())),
                Box::new(Expr::Binary(
                    BinaryOp::Concat,
                    var("b"),
                    lit(Value::Str("c".into())),
                )),
            )
        );
    }

    #[test]
    fn parse_multiplication_binds_tighter_than_addition() {
        let expr = parse("1 + 2 * 3").expect("parse");
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                lit(Value::Int(1)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    lit(Value::Int(2)),
                    lit(Value::Int(3)),
                )),
            )
        );
    }

    #[test]
    fn parse_and_binds_tighter_than_or() {
        let expr = parse("a or b and c").expect("parse");
        assert_eq!(
            expr,
            Expr::Or(var("a"), Box::new(Expr::And(var("b"), var("c"))))
        );
    }

    #[test]
    fn parse_function_call_with_arguments() {
        let expr = parse(r#"env("HOME", "/root")"#).expect("parse");
        assert_eq!(
            expr,
            Expr::Call(
                "env".into(),
                vec![
                    Expr::Literal(Value::Str("HOME".into())),
                    Expr::Literal(Value::Str("/root".into())),
                ]
            )
        );
    }

    #[test]
    fn parse_empty_call_and_list() {
        assert_eq!(parse("f()").expect("parse"), Expr::Call("f".into(), vec![]));
        assert_eq!(parse("[]").expect("parse"), Expr::List(vec![]));
    }

    #[test]
    fn parse_if_expression() {
        let expr = parse("if debug then 1 else 2 end").expect("parse");
        assert_eq!(
            expr,
            Expr::If {
                cond: var("debug"),
                then: lit(Value::Int(1)),
                otherwise: lit(Value::Int(2)),
            }
        );
    }

    #[test]
    fn parse_unary_minus_and_not() {
        assert_eq!(
            parse("-x").expect("parse"),
            Expr::Unary(UnaryOp::Neg, var("x"))
        );
        assert_eq!(
            parse("not not x").expect("parse"),
            Expr::Unary(UnaryOp::Not, Box::new(Expr::Unary(UnaryOp::Not, var("x"))))
        );
    }

    #[test]
    fn parse_error_on_empty_source() {
        assert!(parse("").is_err());
        assert!(parse("return").is_err());
    }

    #[test]
    fn parse_error_on_trailing_tokens() {
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn parse_error_on_unclosed_paren() {
        assert!(parse("(1 + 2").is_err());
    }

    #[test]
    fn parse_error_on_missing_end() {
        assert!(parse("if a then b else c").is_err());
    }
}
