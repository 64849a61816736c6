//! Masking of sensitive substrings in free text and of values stored under
//! sensitive field names.

use parking_lot::RwLock;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::OnceLock;

const MASK: &str = "***";
const MASKED_VALUE: &str = "******";

const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    // authentication
    "password",
    "senha",
    "pwd",
    "pass",
    "secret",
    "token",
    "accesstoken",
    "refreshtoken",
    "apikey",
    "authorization",
    "auth",
    "bearer",
    "credential",
    "credentials",
    // personal documents
    "cpf",
    "cnpj",
    "ssn",
    "rg",
    // financial
    "cardnumber",
    "creditcard",
    "cvv",
    "cvc",
    "pin",
    "accountnumber",
    // keys and certificates
    "privatekey",
    "publickey",
    "certificate",
    "cert",
];

/// A text pattern and the function producing its replacement.
struct MaskPattern {
    regex: Regex,
    replace: fn(&Captures<'_>) -> String,
}

// Applied in this order; an earlier pattern's replacement is what later
// patterns see.
const PATTERN_SOURCES: &[(&str, &str, fn(&Captures<'_>) -> String)] = &[
    ("card", r"\b\d{4}(?:[- ]?\d){9,15}\b", mask_card),
    (
        "email",
        r"([a-zA-Z0-9._%+-]+)@([a-zA-Z0-9.-]+)\.([a-zA-Z]{2,})",
        mask_email,
    ),
    ("cpf", r"\b\d{3}\.?\d{3}\.?\d{3}-?\d{2}\b", mask_cpf),
    ("cnpj", r"\b\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}\b", mask_cnpj),
    (
        "phone",
        r"\b(?:\+?\d{1,3}[- ]?)?\(?\d{2,3}\)?[- ]?\d{4,5}[- ]?\d{4}\b",
        mask_phone,
    ),
];

static PATTERNS: OnceLock<Vec<MaskPattern>> = OnceLock::new();

fn patterns() -> &'static [MaskPattern] {
    PATTERNS.get_or_init(|| {
        PATTERN_SOURCES
            .iter()
            .filter_map(|&(name, source, replace)| match Regex::new(source) {
                Ok(regex) => Some(MaskPattern { regex, replace }),
                Err(e) => {
                    tracing::error!(pattern = name, error = %e, "redaction pattern failed to compile");
                    None
                }
            })
            .collect()
    })
}

fn digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

fn last_chars(text: &str, n: usize) -> &str {
    let start = text.len().saturating_sub(n);
    // digit strings are ASCII, so byte slicing is safe here
    &text[start..]
}

fn mask_card(caps: &Captures<'_>) -> String {
    let card = digits(&caps[0]);
    format!("{MASK}{MASK}{MASK}{}", last_chars(&card, 4))
}

fn mask_email(caps: &Captures<'_>) -> String {
    let first = caps[1].chars().next().unwrap_or('*');
    format!("{first}{MASK}@{MASK}.{}", &caps[3])
}

fn mask_cpf(caps: &Captures<'_>) -> String {
    let cpf = digits(&caps[0]);
    format!("{MASK}.{MASK}.{MASK}-{}", last_chars(&cpf, 2))
}

fn mask_cnpj(caps: &Captures<'_>) -> String {
    let cnpj = digits(&caps[0]);
    format!("{MASK}.{MASK}.{MASK}/{MASK}-{}", last_chars(&cnpj, 2))
}

fn mask_phone(caps: &Captures<'_>) -> String {
    let phone = digits(&caps[0]);
    if phone.len() >= 4 {
        format!("({MASK}) {MASK}-{}", last_chars(&phone, 4))
    } else {
        MASKED_VALUE.to_string()
    }
}

/// Replace card numbers, emails, national IDs and phone numbers in `text`
/// with format-preserving masks. Text without matches is returned as is.
pub fn mask(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut result = text.to_string();
    for pattern in patterns() {
        let replaced = match pattern.regex.replace_all(&result, pattern.replace) {
            Cow::Borrowed(_) => None,
            Cow::Owned(replaced) => Some(replaced),
        };
        if let Some(replaced) = replaced {
            result = replaced;
        }
    }
    result
}

/// Mask a whole value, keeping at most two leading and two trailing
/// characters depending on its length:
///
/// - up to 4 characters: `******`
/// - 5 to 8 characters: first 2 + `******`
/// - longer: first 2 + `******` + last 2
pub fn mask_value(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    let head: String = chars[..2.min(len)].iter().collect();

    if len <= 4 {
        MASKED_VALUE.to_string()
    } else if len <= 8 {
        format!("{head}{MASKED_VALUE}")
    } else {
        let tail: String = chars[len - 2..].iter().collect();
        format!("{head}{MASKED_VALUE}{tail}")
    }
}

/// Lowercase and strip `_` / `-`, the canonical form used by the registry.
pub fn normalize_field_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Set of normalized field-name tokens considered sensitive.
///
/// Shared by every enrichment; reads and writes go through a `RwLock`.
pub struct SensitiveFieldRegistry {
    fields: RwLock<HashSet<String>>,
}

impl SensitiveFieldRegistry {
    pub fn new() -> Self {
        Self {
            fields: RwLock::new(Self::defaults()),
        }
    }

    fn defaults() -> HashSet<String> {
        DEFAULT_SENSITIVE_FIELDS.iter().map(|f| f.to_string()).collect()
    }

    /// Exact match, or the normalized name contains any registered token.
    pub fn matches(&self, field_name: &str) -> bool {
        let normalized = normalize_field_name(field_name);
        if normalized.is_empty() {
            return false;
        }

        let fields = self.fields.read();
        fields.contains(&normalized) || fields.iter().any(|token| normalized.contains(token.as_str()))
    }

    pub fn add(&self, field_name: &str) {
        let normalized = normalize_field_name(field_name);
        if !normalized.is_empty() {
            self.fields.write().insert(normalized);
        }
    }

    pub fn remove(&self, field_name: &str) {
        self.fields.write().remove(&normalize_field_name(field_name));
    }

    pub fn reset_to_defaults(&self) {
        *self.fields.write() = Self::defaults();
    }

    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }
}

impl Default for SensitiveFieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Text and field redaction backed by a mutable [`SensitiveFieldRegistry`].
#[derive(Default)]
pub struct Redactor {
    registry: SensitiveFieldRegistry,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &SensitiveFieldRegistry {
        &self.registry
    }

    pub fn mask(&self, text: &str) -> String {
        mask(text)
    }

    pub fn is_sensitive_field(&self, field_name: &str) -> bool {
        self.registry.matches(field_name)
    }

    /// Returns `value` untouched unless `field_name` is sensitive.
    pub fn mask_if_sensitive(&self, field_name: &str, value: &str) -> String {
        if self.is_sensitive_field(field_name) {
            mask_value(value)
        } else {
            value.to_string()
        }
    }

    pub fn add_sensitive_field(&self, field_name: &str) {
        self.registry.add(field_name);
    }

    pub fn remove_sensitive_field(&self, field_name: &str) {
        self.registry.remove(field_name);
    }

    pub fn reset_to_defaults(&self) {
        self.registry.reset_to_defaults();
    }
}
