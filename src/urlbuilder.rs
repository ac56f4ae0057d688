//! URL builders for the five REST endpoints.
//!
//! Every URL is `protocol + host + endpoint + ?$KB=..&$table=..&$login=..&$password=..&$lang=..`
//! followed by endpoint parameters, then percent-escaped as a whole. The
//! characters `: / ? $ & = '` stay literal since the server splits on them.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::ast::QuerySpec;
use crate::error::EwizResult;
use crate::schema::Field;
use crate::settings::Settings;
use crate::transpiler::ToWhere;

/// Everything except unreserved characters and the protocol separators.
const ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'$')
    .remove(b'&')
    .remove(b'=')
    .remove(b'\'');

/// Marker appended to every create and update.
pub const TIME_SPENT: &str = "&time_spent=0:0:1:0";

/// REST endpoints of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Read,
    Select,
    Create,
    Update,
    Attach,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Read => "EWRead",
            Endpoint::Select => "EWSelect",
            Endpoint::Create => "EWCreate",
            Endpoint::Update => "EWUpdate",
            Endpoint::Attach => "EWAttach",
        }
    }
}

/// Escape a raw URL, leaving protocol separators intact.
pub fn escape(raw: &str) -> String {
    utf8_percent_encode(raw, ESCAPE).to_string()
}

/// Undo [`escape`].
pub fn unescape(url: &str) -> String {
    percent_decode_str(url).decode_utf8_lossy().into_owned()
}

/// Replace the password parameter so the URL can be logged.
pub fn redact(url: &str) -> String {
    const KEY: &str = "$password=";
    match url.find(KEY) {
        Some(start) => {
            let value_start = start + KEY.len();
            let value_end = url[value_start..]
                .find('&')
                .map(|i| value_start + i)
                .unwrap_or(url.len());
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}

/// Decoded request parameters after `$lang`, the part a caller wrote.
pub fn query_fragment(url: &str) -> String {
    const KEY: &str = "&$lang=";
    let Some(start) = url.find(KEY) else {
        return unescape(url);
    };
    let rest = &url[start + KEY.len()..];
    let params = rest.find('&').map(|i| &rest[i..]).unwrap_or("");
    unescape(params)
}

/// Renders requests for one set of connection settings.
#[derive(Debug, Clone, Copy)]
pub struct UrlBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> UrlBuilder<'a> {
    /// Fails with a configuration error if a required setting is missing.
    pub fn new(settings: &'a Settings) -> EwizResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    fn base(&self, endpoint: Endpoint, table: &str) -> String {
        let s = self.settings;
        format!(
            "{}{}{}?$KB={}&$table={}&$login={}&$password={}&$lang={}",
            s.protocol(),
            s.host,
            endpoint.path(),
            s.knowledge_base,
            table,
            s.login,
            s.password,
            s.language
        )
    }

    fn finish(&self, endpoint: Endpoint, raw: String) -> String {
        let url = escape(&raw);
        tracing::debug!(endpoint = endpoint.path(), url = %redact(&url), "built request url");
        url
    }

    /// `EWRead`: all fields of one ticket.
    pub fn read(&self, table: &str, id: &str) -> String {
        let raw = format!("{}&id={}", self.base(Endpoint::Read, table), id);
        self.finish(Endpoint::Read, raw)
    }

    /// `EWSelect`: count and identifiers of matching tickets.
    pub fn select(&self, spec: &QuerySpec) -> String {
        let raw = format!(
            "{}&where={}",
            self.base(Endpoint::Select, &spec.table),
            spec.to_where()
        );
        self.finish(Endpoint::Select, raw)
    }

    /// `EWCreate`: fields with a value, or nullable ones, in input order.
    pub fn insert(&self, table: &str, values: &[(Field, Option<String>)]) -> String {
        let mut raw = self.base(Endpoint::Create, table);
        push_assignments(&mut raw, values, |_| true);
        raw.push_str(TIME_SPENT);
        self.finish(Endpoint::Create, raw)
    }

    /// `EWUpdate`: like insert, restricted to editable fields.
    pub fn update(&self, table: &str, id: &str, values: &[(Field, Option<String>)]) -> String {
        let mut raw = format!("{}&id={}", self.base(Endpoint::Update, table), id);
        push_assignments(&mut raw, values, |field| field.editable);
        raw.push_str(TIME_SPENT);
        self.finish(Endpoint::Update, raw)
    }

    /// `EWAttach`: target of a raw PUT upload.
    pub fn attach(&self, table: &str, id: &str, field: &str, file_name: &str) -> String {
        let raw = format!(
            "{}&id={}&field={}&fileName={}",
            self.base(Endpoint::Attach, table),
            id,
            field,
            file_name
        );
        self.finish(Endpoint::Attach, raw)
    }
}

/// Append `&column=prefixvalue` for every field that passes `gate` and has a
/// value or is nullable.
fn push_assignments(
    raw: &mut String,
    values: &[(Field, Option<String>)],
    gate: impl Fn(&Field) -> bool,
) {
    for (field, value) in values {
        let value = value.as_deref().unwrap_or("");
        if gate(field) && (!value.is_empty() || field.nullable) {
            raw.push('&');
            raw.push_str(&field.column);
            raw.push('=');
            raw.push_str(&field.prefix);
            raw.push_str(value);
        }
    }
}
