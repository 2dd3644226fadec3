//! Query string parameters with deferred validation.
//!
//! Handlers read every parameter they need first and check for invalid ones
//! once at the end, so a client sending several bad values is told about all
//! of them in a single `400 Bad Request`.
//!
//! ```rust,ignore
//! async fn list(head: RequestHead, mut query: Query) -> Response {
//!     let input = ListInput {
//!         search: query.get_string("q"),
//!         since: query.lookup_time("since"),
//!         limit: query.get_int("limit"),
//!         offset: query.get_int("offset"),
//!     };
//!     if let Err(err) = query.err() {
//!         return write_error(&head, err);
//!     }
//!     write_result(&head, things::list(input).await)
//! }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::Uri;
use axum::http::request::Parts;
use chrono::{DateTime, NaiveDate, Utc};
use httpapi_axum_core::ApiError;

/// Values of a request's query string.
///
/// Accessors only ever look at the first value of a repeated name. A value
/// that does not parse is treated as absent and its name is recorded; the
/// recorded names are reported by [`err`](Query::err).
#[derive(Debug, Default)]
pub struct Query {
    values: HashMap<String, Vec<String>>,
    invalid: BTreeSet<String>,
}

impl Query {
    /// Parse a raw query string, without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            values
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        Self {
            values,
            invalid: BTreeSet::new(),
        }
    }

    /// Parse the query string of a URI.
    pub fn from_uri(uri: &Uri) -> Self {
        Self::parse(uri.query().unwrap_or_default())
    }

    /// Returns true if `name` appears in the query string, even without a value.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// All values given for `name`, in order.
    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First value for `name`, trimmed, treating blank, `undefined` and
    /// `null` as absent.
    fn first_present(&self, name: &str) -> Option<&str> {
        self.first(name)
            .map(str::trim)
            .filter(|s| !matches!(*s, "" | "undefined" | "null"))
    }

    /// Parse the first value of `name`, recording the name if it does not parse.
    fn parse_first<T>(
        &mut self,
        name: &str,
        blank_is_absent: bool,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Option<T> {
        let value = if blank_is_absent {
            self.first_present(name)?
        } else {
            self.first(name)?
        };
        let parsed = parse(value);
        if parsed.is_none() {
            self.invalid.insert(name.to_string());
        }
        parsed
    }

    /// Integer value of `name`.
    pub fn lookup_int(&mut self, name: &str) -> Option<i64> {
        self.parse_first(name, false, |s| s.parse().ok())
    }

    /// Integer value of `name`, or 0.
    pub fn get_int(&mut self, name: &str) -> i64 {
        self.lookup_int(name).unwrap_or_default()
    }

    /// Boolean value of `name`.
    ///
    /// Accepts `1`, `true`, `yes`, `t` and `0`, `false`, `no`, `f` in any case.
    pub fn lookup_bool(&mut self, name: &str) -> Option<bool> {
        self.parse_first(name, false, parse_bool)
    }

    /// Boolean value of `name`, or false.
    pub fn get_bool(&mut self, name: &str) -> bool {
        self.lookup_bool(name).unwrap_or_default()
    }

    /// RFC 3339 timestamp value of `name`, converted to UTC.
    ///
    /// The date and time must be separated by an uppercase `T` and a UTC
    /// offset written as `Z` must be uppercase.
    pub fn lookup_time(&mut self, name: &str) -> Option<DateTime<Utc>> {
        self.parse_first(name, true, parse_time)
    }

    /// RFC 3339 timestamp value of `name`, or the Unix epoch.
    pub fn get_time(&mut self, name: &str) -> DateTime<Utc> {
        self.lookup_time(name).unwrap_or_default()
    }

    /// ISO 8601 (`YYYY-MM-DD`) date value of `name`.
    pub fn lookup_date(&mut self, name: &str) -> Option<NaiveDate> {
        self.parse_first(name, true, |s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
        })
    }

    /// ISO 8601 date value of `name`, or 1970-01-01.
    pub fn get_date(&mut self, name: &str) -> NaiveDate {
        self.lookup_date(name).unwrap_or_default()
    }

    /// String value of `name`. Never invalid.
    pub fn lookup_string(&self, name: &str) -> Option<String> {
        self.first(name).map(str::to_string)
    }

    /// String value of `name`, or the empty string.
    pub fn get_string(&self, name: &str) -> String {
        self.lookup_string(name).unwrap_or_default()
    }

    /// Names of the parameters found invalid so far, sorted.
    pub fn invalid_names(&self) -> Vec<String> {
        self.invalid.iter().cloned().collect()
    }

    /// Report every parameter found invalid so far.
    ///
    /// Returns a `400 Bad Request` listing the names, or `Ok` if all values
    /// read so far were valid.
    pub fn err(&self) -> Result<(), ApiError> {
        if self.invalid.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = self.invalid.iter().map(String::as_str).collect();
        Err(ApiError::bad_request(format!(
            "invalid value(s) in query string: {}",
            names.join(",")
        )))
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    // chrono also takes a space or lowercase `t`/`z`
    if s.as_bytes().get(10) != Some(&b'T') || s.ends_with('z') {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "t" => Some(true),
        "0" | "false" | "no" | "f" => Some(false),
        _ => None,
    }
}

impl<S> FromRequestParts<S> for Query
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_uri(&parts.uri))
    }
}
