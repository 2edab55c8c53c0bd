//! Query text parser
//!
//! Queries are written in a relaxed JSON dialect (the JSON5 subset used by
//! the sample queries): `//` and `/* */` comments, unquoted identifier keys,
//! single- or double-quoted strings, and trailing commas. Parsing happens in
//! two steps: text to [`serde_json::Value`], then value to [`QueryTree`].

use holoquery_core::limits::{validate_query_depth, MAX_NESTING_DEPTH};
use holoquery_core::{ArgFilter, Error, FieldPath, QueryNode, QueryTree, Result};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while, take_while1};
use nom::character::complete::{char as pchar, multispace1, satisfy};
use nom::combinator::{all_consuming, cut, map, not, opt, recognize, value};
use nom::error::{context, ContextError, ErrorKind, ParseError};
use nom::multi::{many0, separated_list0};
use nom::number::complete::recognize_float;
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;
use serde_json::{Map, Value};

/// Syntax error pointing at the remaining input
#[derive(Debug)]
struct SyntaxError<'a> {
    input: &'a str,
    message: String,
    /// Set once a context or a dedicated check has named the problem
    specific: bool,
}

impl<'a> SyntaxError<'a> {
    fn new(input: &'a str, message: impl Into<String>) -> Self {
        Self {
            input,
            message: message.into(),
            specific: true,
        }
    }
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        let message = match kind {
            ErrorKind::Eof => "unexpected trailing input",
            _ if input.is_empty() => "unexpected end of input",
            _ => "unexpected input",
        };
        Self {
            input,
            message: message.to_string(),
            specific: false,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn from_char(input: &'a str, c: char) -> Self {
        Self {
            input,
            message: format!("expected '{}'", c),
            specific: false,
        }
    }
}

impl<'a> ContextError<&'a str> for SyntaxError<'a> {
    fn add_context(_input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        if !other.specific {
            other.message = format!("expected {}", ctx);
            other.specific = true;
        }
        other
    }
}

type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

// ─────────────────────────────────────────────────────────────────────────────
// Lexical helpers
// ─────────────────────────────────────────────────────────────────────────────

fn line_comment(input: &str) -> PResult<'_, &str> {
    recognize(pair(tag("//"), take_while(|c| c != '\n' && c != '\r')))(input)
}

fn block_comment(input: &str) -> PResult<'_, &str> {
    recognize(preceded(
        tag("/*"),
        cut(context("'*/' closing the comment", pair(take_until("*/"), tag("*/")))),
    ))(input)
}

/// Whitespace and comments
fn sp(input: &str) -> PResult<'_, ()> {
    value((), many0(alt((multispace1, line_comment, block_comment))))(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(take_while1(is_ident_start), take_while(is_ident_continue)))(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_continue)))
}

/// Decode the hex digits after `\u`, joining a following low surrogate
///
/// Returns the character and the number of bytes consumed.
fn unicode_escape(text: &str) -> Option<(char, usize)> {
    fn hex4(text: &str) -> Option<u32> {
        let digits = text.get(..4)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok()
    }

    let high = hex4(text)?;
    if (0xD800..0xDC00).contains(&high) {
        let low = hex4(text.get(4..)?.strip_prefix("\\u")?)?;
        if !(0xDC00..0xE000).contains(&low) {
            return None;
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        return char::from_u32(code).map(|c| (c, 10));
    }
    char::from_u32(high).map(|c| (c, 4))
}

fn string_lit(input: &str) -> PResult<'_, String> {
    let quote = match input.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => {
            return Err(nom::Err::Error(SyntaxError::from_error_kind(
                input,
                ErrorKind::Char,
            )))
        }
    };

    let body = &input[1..];
    let mut out = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((&body[i + 1..], out)),
            '\\' => {
                let Some((j, escaped)) = chars.next() else {
                    break;
                };
                match escaped {
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    '0' => out.push('\0'),
                    '"' | '\'' | '\\' | '/' => out.push(escaped),
                    // Line continuation
                    '\n' => {}
                    'u' => {
                        let (decoded, used) = unicode_escape(&body[j + 1..]).ok_or_else(|| {
                            nom::Err::Failure(SyntaxError::new(&body[i..], "invalid unicode escape"))
                        })?;
                        out.push(decoded);
                        for _ in 0..used {
                            chars.next();
                        }
                    }
                    other => {
                        return Err(nom::Err::Failure(SyntaxError::new(
                            &body[i..],
                            format!("invalid escape '\\{}'", other),
                        )))
                    }
                }
            }
            '\n' | '\r' => {
                return Err(nom::Err::Failure(SyntaxError::new(
                    &body[i..],
                    "unterminated string",
                )))
            }
            c => out.push(c),
        }
    }

    Err(nom::Err::Failure(SyntaxError::new(input, "unterminated string")))
}

fn parse_number(text: &str) -> Option<serde_json::Number> {
    let text = text.strip_prefix('+').unwrap_or(text);
    if !text.contains(|c| matches!(c, '.' | 'e' | 'E')) {
        if let Ok(i) = text.parse::<i64>() {
            return Some(i.into());
        }
        if let Ok(u) = text.parse::<u64>() {
            return Some(u.into());
        }
    }
    text.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
}

fn number(input: &str) -> PResult<'_, Value> {
    let (rest, text) = recognize_float(input)?;
    let n = parse_number(text).ok_or_else(|| {
        nom::Err::Failure(SyntaxError::new(input, format!("invalid number '{}'", text)))
    })?;
    Ok((rest, Value::Number(n)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Values
// ─────────────────────────────────────────────────────────────────────────────

fn object_key(input: &str) -> PResult<'_, String> {
    context(
        "an object key",
        alt((string_lit, map(identifier, str::to_string))),
    )(input)
}

/// `key: value`, keeping the key position for duplicate reporting
fn member(input: &str, depth: usize) -> PResult<'_, (&str, String, Value)> {
    let (rest, key) = object_key(input)?;
    let (rest, _) = tuple((sp, cut(context("':' after object key", pchar(':'))), sp))(rest)?;
    let (rest, val) = cut(|i| json_value(i, depth))(rest)?;
    Ok((rest, (input, key, val)))
}

fn separator(input: &str) -> PResult<'_, ()> {
    value((), tuple((sp, pchar(','), sp)))(input)
}

/// Refuse to open another object or array past the nesting limit
fn check_nesting(input: &str, depth: usize) -> std::result::Result<(), nom::Err<SyntaxError<'_>>> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(nom::Err::Failure(SyntaxError::new(
            input,
            format!("nesting deeper than {} levels", MAX_NESTING_DEPTH),
        )));
    }
    Ok(())
}

fn object(input: &str, depth: usize) -> PResult<'_, Value> {
    let (rest, _) = pchar('{')(input)?;
    check_nesting(input, depth)?;
    let (rest, members) = cut(delimited(
        sp,
        terminated(
            separated_list0(separator, |i| member(i, depth + 1)),
            opt(pair(sp, pchar(','))),
        ),
        pair(sp, context("',' or '}'", pchar('}'))),
    ))(rest)?;

    let mut map = Map::new();
    for (at, key, val) in members {
        if map.contains_key(&key) {
            return Err(nom::Err::Failure(SyntaxError::new(
                at,
                format!("duplicate key '{}'", key),
            )));
        }
        map.insert(key, val);
    }
    Ok((rest, Value::Object(map)))
}

fn array(input: &str, depth: usize) -> PResult<'_, Value> {
    let (rest, _) = pchar('[')(input)?;
    check_nesting(input, depth)?;
    let (rest, items) = cut(delimited(
        sp,
        terminated(
            separated_list0(separator, |i| json_value(i, depth + 1)),
            opt(pair(sp, pchar(','))),
        ),
        pair(sp, context("',' or ']'", pchar(']'))),
    ))(rest)?;
    Ok((rest, Value::Array(items)))
}

/// A value whose containers, if any, open at `depth`
fn json_value(input: &str, depth: usize) -> PResult<'_, Value> {
    context(
        "a value",
        alt((
            |i| object(i, depth),
            |i| array(i, depth),
            map(string_lit, Value::String),
            number,
            value(Value::Bool(true), keyword("true")),
            value(Value::Bool(false), keyword("false")),
            value(Value::Null, keyword("null")),
        )),
    )(input)
}

/// 1-based line and column of `rest` within `text`
fn locate(text: &str, rest: &str) -> (usize, usize) {
    let offset = text.len().saturating_sub(rest.len());
    let consumed = &text[..offset];
    let line = consumed.matches('\n').count() + 1;
    let column = consumed
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0)
        + 1;
    (line, column)
}

/// Parse relaxed JSON text into a value
pub fn parse_value(text: &str) -> Result<Value> {
    match all_consuming(delimited(sp, |i| json_value(i, 0), sp))(text) {
        Ok((_, val)) => Ok(val),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let (line, column) = locate(text, e.input);
            Err(Error::parse_at(e.message, line, column))
        }
        Err(nom::Err::Incomplete(_)) => {
            let (line, column) = locate(text, "");
            Err(Error::parse_at("unexpected end of input", line, column))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query structure
// ─────────────────────────────────────────────────────────────────────────────

fn expect_object<'v>(val: &'v Value, path: &FieldPath, what: &str) -> Result<&'v Map<String, Value>> {
    val.as_object()
        .ok_or_else(|| Error::parse_in(format!("{} must be an object", what), path))
}

fn build_node(field: &str, val: &Value, path: &FieldPath, depth: usize) -> Result<QueryNode> {
    validate_query_depth(depth)?;
    let entries = expect_object(val, path, "query entity")?;
    let mut node = QueryNode::new(field);

    for (key, val) in entries {
        match key.as_str() {
            "args" => {
                let args_path = path.child("args");
                for (arg, arg_value) in expect_object(val, &args_path, "args")? {
                    node.args.push(ArgFilter {
                        field: arg.clone(),
                        value: arg_value.clone(),
                    });
                }
            }
            "resolve" => {
                let resolve_path = path.child("resolve");
                for (child, child_value) in expect_object(val, &resolve_path, "resolve")? {
                    let child_path = resolve_path.child(child);
                    node.resolve
                        .push(build_node(child, child_value, &child_path, depth + 1)?);
                }
            }
            other => {
                return Err(Error::parse_in(
                    format!("unrecognized key '{}' (expected args or resolve)", other),
                    &path.child(other),
                ))
            }
        }
    }

    Ok(node)
}

/// Turn a parsed value into a query tree, checking only its shape
pub fn build_tree(val: &Value) -> Result<QueryTree> {
    let root = expect_object(val, &FieldPath::default(), "query")?;

    for key in root.keys() {
        if key != "get" {
            return Err(Error::parse_in(
                format!("unrecognized key '{}' (expected get)", key),
                &FieldPath::root(key.as_str()),
            ));
        }
    }

    let get_path = FieldPath::root("get");
    let get = root
        .get("get")
        .ok_or_else(|| Error::parse_in("query has no 'get' key", &FieldPath::default()))?;
    let entities = expect_object(get, &get_path, "get")?;
    if entities.is_empty() {
        return Err(Error::parse_in("get names no entity", &get_path));
    }

    let mut tree = QueryTree::new();
    for (field, val) in entities {
        tree.roots.push(build_node(field, val, &get_path.child(field), 1)?);
    }
    Ok(tree)
}

/// Parse query text into an unvalidated query tree
pub fn parse_query(text: &str) -> Result<QueryTree> {
    let val = parse_value(text)?;
    let tree = build_tree(&val)?;
    tracing::trace!("Parsed query with {} roots, depth {}", tree.roots.len(), tree.depth());
    Ok(tree)
}
