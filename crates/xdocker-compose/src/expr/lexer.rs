//! Tokenization of expression source text using `nom`.
//!
//! Produces a stream of [`Token`]s from raw input for the parser to consume.
//! Whitespace and `--` line comments are discarded between tokens.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace1, not_line_ending},
    combinator::{opt, recognize, value},
    multi::many0,
    sequence::{pair, preceded},
};

use super::ExprError;

/// A token of the expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `return` keyword (optional program prefix).
    Return,
    /// Boolean literal `true`.
    True,
    /// Boolean literal `false`.
    False,
    /// `nil` literal.
    Nil,
    /// `and` operator.
    And,
    /// `or` operator.
    Or,
    /// `not` operator.
    Not,
    /// `if` keyword.
    If,
    /// `then` keyword.
    Then,
    /// `else` keyword.
    Else,
    /// `end` keyword.
    End,
    /// A variable or function name.
    Identifier(String),
    /// A single- or double-quoted string literal.
    StringLiteral(String),
    /// An integer literal.
    Integer(i64),
    /// A decimal literal.
    Float(f64),
    /// `(` opening parenthesis.
    ParenOpen,
    /// `)` closing parenthesis.
    ParenClose,
    /// `[` opening bracket.
    BracketOpen,
    /// `]` closing bracket.
    BracketClose,
    /// `,` argument separator.
    Comma,
    /// `..` string concatenation.
    Concat,
    /// `+`.
    Plus,
    /// `-`.
    Minus,
    /// `*`.
    Star,
    /// `/`.
    Slash,
    /// `%`.
    Percent,
    /// `==`.
    Eq,
    /// `~=` or `!=`.
    NotEq,
    /// `<`.
    Lt,
    /// `<=`.
    Le,
    /// `>`.
    Gt,
    /// `>=`.
    Ge,
}

/// Skippable items: whitespace or line comments.
fn skip_trivia(input: &str) -> IResult<&str, ()> {
    let comment = value((), preceded(tag("--"), not_line_ending));
    let ws = value((), multispace1);
    let (input, _) = many0(alt((ws, comment))).parse(input)?;
    Ok((input, ()))
}

/// Parses a quoted string literal; `"` and `'` are both accepted.
fn string_literal(input: &str) -> IResult<&str, Token> {
    let (input, quote) = alt((char('"'), char('\''))).parse(input)?;
    let mut result = String::new();
    let mut chars = input.char_indices();
    loop {
        match chars.next() {
            Some((idx, c)) if c == quote => {
                let remaining = &input[idx + c.len_utf8()..];
                return Ok((remaining, Token::StringLiteral(result)));
            }
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, 'r')) => result.push('\r'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, '"')) => result.push('"'),
                Some((_, '\'')) => result.push('\''),
                Some((_, c)) => {
                    result.push('\\');
                    result.push(c);
                }
                None => {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        input,
                        nom::error::ErrorKind::Char,
                    )));
                }
            },
            Some((_, c)) => result.push(c),
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Char,
                )));
            }
        }
    }
}

/// Parses an integer or decimal literal. `1..2` lexes as `1`, `..`, `2`.
fn number_literal(input: &str) -> IResult<&str, Token> {
    let (rest, text) = recognize(pair(digit1, opt(pair(char('.'), digit1)))).parse(input)?;
    let token = if text.contains('.') {
        text.parse::<f64>().map(Token::Float).ok()
    } else {
        text.parse::<i64>().map(Token::Integer).ok()
    };
    token.map_or_else(
        || {
            Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Digit,
            )))
        },
        |tok| Ok((rest, tok)),
    )
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parses an identifier or keyword.
fn identifier_or_keyword(input: &str) -> IResult<&str, Token> {
    let (input, word) = recognize(pair(
        take_while1(is_ident_start),
        take_while(is_ident_continue),
    ))
    .parse(input)?;
    let token = match word {
        "return" => Token::Return,
        "true" => Token::True,
        "false" => Token::False,
        "nil" => Token::Nil,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "if" => Token::If,
        "then" => Token::Then,
        "else" => Token::Else,
        "end" => Token::End,
        _ => Token::Identifier(word.to_string()),
    };
    Ok((input, token))
}

/// Parses an operator or punctuation token. Two-character operators are
/// tried before their one-character prefixes.
fn symbol(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::Concat, tag("..")),
        value(Token::Eq, tag("==")),
        value(Token::NotEq, tag("~=")),
        value(Token::NotEq, tag("!=")),
        value(Token::Le, tag("<=")),
        value(Token::Ge, tag(">=")),
        value(Token::Lt, char('<')),
        value(Token::Gt, char('>')),
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Star, char('*')),
        value(Token::Slash, char('/')),
        value(Token::Percent, char('%')),
        value(Token::ParenOpen, char('(')),
        value(Token::ParenClose, char(')')),
        value(Token::BracketOpen, char('[')),
        value(Token::BracketClose, char(']')),
        value(Token::Comma, char(',')),
    ))
    .parse(input)
}

/// Parses a single token (after trivia has been skipped).
fn single_token(input: &str) -> IResult<&str, Token> {
    alt((string_literal, number_literal, symbol, identifier_or_keyword)).parse(input)
}

/// Tokenizes expression source into a vector of tokens.
///
/// # Errors
///
/// Returns [`ExprError::Lex`] if the input contains characters that cannot
/// be tokenized or an unterminated string literal.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, ()) = skip_trivia(remaining)
            .map_err(|e| ExprError::Lex(format!("error skipping whitespace: {e}")))?;
        remaining = rest;

        if remaining.is_empty() {
            break;
        }

        let (rest, token) = single_token(remaining).map_err(|e| {
            ExprError::Lex(format!(
                "unexpected input at: \"{}\" ({e})",
                remaining.chars().take(20).collect::<String>()
            ))
        })?;
        tokens.push(token);
        remaining = rest;
    }

    Ok(tokens)
}
