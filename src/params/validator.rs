//! Type validation of decoded parameters.
//!
//! # Responsibilities
//! - Define the [`TypeValidator`] capability the parameter pipeline consumes
//! - Provide [`XapiTypeValidator`], covering the xAPI parameter type tags
//!
//! # Design Decisions
//! - A report lists every problem found, not just the first
//! - Unknown type tags fail instead of passing silently

use chrono::DateTime;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

/// Section label passed for request parameters.
pub const PARAMS_SECTION: &str = "params";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Passed,
    Failed,
}

/// Outcome of one type check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReport {
    pub status: CheckStatus,
    pub errors: Vec<String>,
}

impl TypeReport {
    pub fn passed() -> Self {
        Self {
            status: CheckStatus::Passed,
            errors: Vec::new(),
        }
    }

    /// Passed when `errors` is empty, failed otherwise.
    pub fn from_errors(errors: Vec<String>) -> Self {
        let status = if errors.is_empty() {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed
        };
        Self { status, errors }
    }

    pub fn is_passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }
}

/// Checks a decoded value against a declared type tag.
pub trait TypeValidator: Send + Sync {
    fn check_types(&self, name: &str, value: &Value, declared: &str, section: &str) -> TypeReport;
}

impl<F> TypeValidator for F
where
    F: Fn(&str, &Value, &str, &str) -> TypeReport + Send + Sync,
{
    fn check_types(&self, name: &str, value: &Value, declared: &str, section: &str) -> TypeReport {
        self(name, value, declared, section)
    }
}

/// Validator for the type tags used by xAPI request parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct XapiTypeValidator;

impl TypeValidator for XapiTypeValidator {
    fn check_types(&self, name: &str, value: &Value, declared: &str, section: &str) -> TypeReport {
        let mut errors = Vec::new();
        check(name, value, declared, section, &mut errors);
        TypeReport::from_errors(errors)
    }
}

const AGENT_IDENTIFIERS: [(&str, &str); 4] = [
    ("mbox", "mbox"),
    ("mbox_sha1sum", "sha1"),
    ("openid", "iri"),
    ("account", "Account"),
];

fn check(path: &str, value: &Value, declared: &str, section: &str, errors: &mut Vec<String>) {
    let text = value.as_str();
    let valid = match declared {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "number" => value.is_number(),
        "int" | "integer" => value.is_i64() || value.is_u64(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "uuid" | "statementId" => text.is_some_and(|s| Uuid::parse_str(s).is_ok()),
        "iri" => text.is_some_and(|s| Url::parse(s).is_ok()),
        "irl" => text.is_some_and(is_irl),
        "language" => text.is_some_and(is_language_tag),
        "mbox" => text.is_some_and(|s| s.strip_prefix("mailto:").is_some_and(is_email_address)),
        "emailAddress" => text.is_some_and(is_email_address),
        "sha1" => text.is_some_and(|s| is_hex(s, &[40])),
        "sha2" => text.is_some_and(|s| is_hex(s, &[56, 64, 96, 128])),
        "timestamp" => text.is_some_and(is_timestamp),
        "Agent" => return check_agent(path, value, section, errors),
        "Account" => return check_account(path, value, section, errors),
        unknown => {
            errors.push(format!(
                "`{}` has an unknown type `{}` in {}",
                path, unknown, section
            ));
            return;
        }
    };

    if !valid {
        errors.push(invalid(path, declared, section));
    }
}

fn invalid(path: &str, declared: &str, section: &str) -> String {
    format!("`{}` is not a valid {} in {}", path, declared, section)
}

fn check_agent(path: &str, value: &Value, section: &str, errors: &mut Vec<String>) {
    let Some(agent) = value.as_object() else {
        errors.push(invalid(path, "Agent", section));
        return;
    };

    if let Some(object_type) = agent.get("objectType") {
        if object_type != "Agent" {
            errors.push(format!("`{}.objectType` must be `Agent` in {}", path, section));
        }
    }
    if let Some(name) = agent.get("name") {
        check(&format!("{}.name", path), name, "string", section, errors);
    }

    let present = AGENT_IDENTIFIERS
        .iter()
        .filter(|(field, _)| agent.contains_key(*field))
        .count();
    if present != 1 {
        errors.push(format!(
            "`{}` must have exactly one of mbox, mbox_sha1sum, openid, account in {}",
            path, section
        ));
    }

    for (field, declared) in AGENT_IDENTIFIERS {
        if let Some(identifier) = agent.get(field) {
            check(&format!("{}.{}", path, field), identifier, declared, section, errors);
        }
    }
}

fn check_account(path: &str, value: &Value, section: &str, errors: &mut Vec<String>) {
    let Some(account) = value.as_object() else {
        errors.push(invalid(path, "Account", section));
        return;
    };

    for (field, declared) in [("homePage", "irl"), ("name", "string")] {
        match account.get(field) {
            Some(v) => check(&format!("{}.{}", path, field), v, declared, section, errors),
            None => errors.push(format!("`{}.{}` is missing in {}", path, field, section)),
        }
    }
}

fn is_irl(s: &str) -> bool {
    Url::parse(s)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn is_email_address(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !s.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn is_language_tag(s: &str) -> bool {
    let mut subtags = s.split('-');
    let primary = subtags.next().unwrap_or_default();
    let primary_ok = (1..=8).contains(&primary.len()) && primary.bytes().all(|b| b.is_ascii_alphabetic());

    primary_ok
        && subtags.all(|t| (1..=8).contains(&t.len()) && t.bytes().all(|b| b.is_ascii_alphanumeric()))
}

fn is_hex(s: &str, lengths: &[usize]) -> bool {
    lengths.contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// RFC 3339 date-time with a calendar-valid date and an explicit offset.
fn is_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
}
