//! Response and expression parsers using nom.
//!
//! The server answers with one entry per line:
//!
//! ```text
//! EWREST_status='Open';
//! EWREST_description='printer on fire
//! second line';
//! ```
//!
//! A value may span lines; the entry ends at the last `';` of its line.
//! Select responses use `EWREST_id_<label> = '<count>';` for the first entry
//! and `EWREST_id_<label>='<id>';` for each matching ticket.

use nom::{
    bytes::complete::{tag, take_till1, take_until},
    character::complete::{char, space0},
    combinator::{opt, rest},
    error::{Error, ErrorKind},
    sequence::separated_pair,
    IResult,
};

use crate::ast::{SelectResponse, Ticket};
use crate::error::{EwizError, EwizResult};

/// Split a body into entries, joining lines until one ends with `';`.
pub fn entries(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        if start.is_none() {
            if line.trim().is_empty() {
                continue;
            }
            start = Some(line_start);
        }

        if line.trim_end().ends_with("';") {
            if let Some(s) = start.take() {
                out.push(body[s..offset].trim_end_matches(['\r', '\n']));
            }
        }
    }

    if let Some(s) = start {
        out.push(body[s..].trim_end_matches(['\r', '\n']));
    }
    out
}

/// Everything up to the final `';` of the input.
fn terminated_value(input: &str) -> IResult<&str, &str> {
    match input.trim_end().strip_suffix("';") {
        Some(value) => Ok(("", value)),
        None => Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil))),
    }
}

/// `EWREST_<key>='<value>';`
fn field_entry(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = tag("EWREST_")(input)?;
    let (input, key) = take_until("='")(input)?;
    let (input, _) = tag("='")(input)?;
    let (input, value) = terminated_value(input)?;
    Ok((input, (key, value)))
}

/// `EWREST_id<label> = '<value>';`, spaces around `=` optional.
fn id_entry(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = tag("EWREST_id")(input)?;
    let (input, label) = take_until("=")(input)?;
    let (input, _) = char('=')(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char('\'')(input)?;
    let (input, value) = terminated_value(input)?;
    Ok((input, (label.trim().trim_start_matches('_'), value)))
}

fn malformed(entry: &str) -> EwizError {
    EwizError::protocol(format!("malformed response line: {:?}", entry))
}

/// Parse one Read response into a ticket.
pub fn parse_record(body: &str) -> EwizResult<Ticket> {
    let mut ticket = Ticket::new();
    for entry in entries(body) {
        let (_, (key, value)) = field_entry(entry).map_err(|_| malformed(entry))?;
        ticket.insert(key.to_string(), value.to_string());
    }
    Ok(ticket)
}

fn parse_count_entry(entry: &str) -> EwizResult<u64> {
    let (_, (_, value)) = id_entry(entry).map_err(|_| malformed(entry))?;
    value
        .trim()
        .parse()
        .map_err(|_| EwizError::protocol(format!("count is not a number: {:?}", value)))
}

/// Parse only the total count of a Select response.
pub fn parse_count(body: &str) -> EwizResult<u64> {
    let first = entries(body)
        .into_iter()
        .next()
        .ok_or_else(|| EwizError::protocol("select response has no count line"))?;
    parse_count_entry(first)
}

/// Parse a Select response into its count and ticket identifiers.
pub fn parse_select(body: &str) -> EwizResult<SelectResponse> {
    let mut iter = entries(body).into_iter();
    let first = iter
        .next()
        .ok_or_else(|| EwizError::protocol("select response has no count line"))?;
    let count = parse_count_entry(first)?;

    let ids = iter
        .map(|entry| {
            id_entry(entry)
                .map(|(_, (_, id))| id.to_string())
                .map_err(|_| malformed(entry))
        })
        .collect::<EwizResult<Vec<_>>>()?;

    Ok(SelectResponse { count, ids })
}

/// Identifier from the first `EWREST_id='<id>';` entry of a Create response.
pub fn parse_created_id(body: &str) -> Option<String> {
    entries(body).into_iter().find_map(|entry| match field_entry(entry) {
        Ok((_, ("id", value))) => Some(value.to_string()),
        _ => None,
    })
}

/// A command-line filter: `[!]field[__lookup]=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    pub field: String,
    pub lookup: String,
    pub negated: bool,
    pub value: String,
}

fn filter_expr(input: &str) -> IResult<&str, FilterExpr> {
    let (input, bang) = opt(char('!'))(input)?;
    let (input, (lhs, value)) = separated_pair(take_till1(|c: char| c == '='), char('='), rest)(input)?;
    let (field, lookup) = match lhs.rfind("__") {
        Some(i) if i > 0 => (&lhs[..i], &lhs[i + 2..]),
        _ => (lhs, "exact"),
    };
    Ok((
        input,
        FilterExpr {
            field: field.trim().to_string(),
            lookup: lookup.trim().to_string(),
            negated: bang.is_some(),
            value: value.to_string(),
        },
    ))
}

/// Parse a filter expression such as `!status__in=Open,Closed`.
pub fn parse_filter(input: &str) -> EwizResult<FilterExpr> {
    match filter_expr(input.trim()) {
        Ok(("", expr)) if !expr.field.is_empty() => Ok(expr),
        _ => Err(EwizError::InvalidValue(format!(
            "filter must look like [!]field[__lookup]=value, got {:?}",
            input
        ))),
    }
}

/// Parse a `field=value` assignment. An empty value is `None`.
pub fn parse_assignment(input: &str) -> EwizResult<(String, Option<String>)> {
    let parsed: IResult<&str, (&str, &str)> =
        separated_pair(take_till1(|c: char| c == '='), char('='), rest)(input);
    match parsed {
        Ok(("", (field, value))) => {
            let value = (!value.is_empty()).then(|| value.to_string());
            Ok((field.trim().to_string(), value))
        }
        _ => Err(EwizError::InvalidValue(format!(
            "assignment must look like field=value, got {:?}",
            input
        ))),
    }
}
