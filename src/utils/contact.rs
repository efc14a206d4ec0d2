//! Canonical forms of the contact fields used as lookup and matching keys.
//!
//! Everything here is pure and total: malformed input is normalized as far
//! as possible and left for the `is_valid_*` predicates to reject.

use std::sync::LazyLock;

use regex::Regex;

pub const MIN_PHONE_DIGITS: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Canonical city name followed by the spellings that fold onto it.
const CITY_ALIASES: &[(&str, &[&str])] = &[
    ("مكة المكرمة", &["مكة", "مكه", "مكه المكرمه", "مكة المكرمة", "makkah", "mecca"]),
    ("المدينة المنورة", &["المدينة", "المدينه", "المدينة المنورة", "المدينه المنوره", "madinah", "medina"]),
    ("الرياض", &["الرياض", "رياض", "riyadh"]),
    ("جدة", &["جدة", "جده", "jeddah", "jiddah"]),
    ("الدمام", &["الدمام", "دمام", "dammam"]),
    ("الخبر", &["الخبر", "خبر", "khobar", "al khobar"]),
    ("الطائف", &["الطائف", "الطايف", "طائف", "taif"]),
    ("أبها", &["أبها", "ابها", "abha"]),
    ("تبوك", &["تبوك", "tabuk"]),
    ("حائل", &["حائل", "حايل", "hail"]),
    ("العلا", &["العلا", "العلى", "alula", "al ula"]),
    ("القصيم", &["القصيم", "بريدة", "بريده", "qassim", "buraydah"]),
];

/// Maps Arabic-Indic and Extended Arabic-Indic digits to ASCII.
pub fn ascii_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        '\u{0660}'..='\u{0669}' => char::from_digit(c as u32 - 0x0660, 10),
        '\u{06F0}'..='\u{06F9}' => char::from_digit(c as u32 - 0x06F0, 10),
        _ => None,
    }
}

/// ASCII digits only, keeping a single leading `+` when the input had one.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());

    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter_map(ascii_digit));
    out
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Resolves a city against the alias table; unknown cities pass through
/// with only whitespace collapsed.
pub fn normalize_city(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    let key = fold_arabic(&collapsed);

    CITY_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|alias| fold_arabic(alias) == key))
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or(collapsed)
}

/// Every stored spelling that should match `city` during dispatch.
pub fn city_variants(city: &str) -> Vec<String> {
    let canonical = normalize_city(city);

    let mut variants = vec![canonical.clone()];
    if let Some((_, aliases)) = CITY_ALIASES.iter().find(|(c, _)| *c == canonical) {
        for alias in aliases.iter() {
            if !variants.iter().any(|v| v == alias) {
                variants.push(alias.to_string());
            }
        }
    }
    variants
}

pub fn same_city(a: &str, b: &str) -> bool {
    fold_arabic(&normalize_city(a)) == fold_arabic(&normalize_city(b))
}

pub fn phone_digit_count(phone: &str) -> usize {
    phone.chars().filter(|c| c.is_ascii_digit()).count()
}

pub fn is_valid_phone(normalized: &str) -> bool {
    phone_digit_count(normalized) >= MIN_PHONE_DIGITS
}

pub fn is_valid_email(normalized: &str) -> bool {
    EMAIL_RE.is_match(normalized)
}

/// A customer identifies themselves by either stored phone or stored email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactKey {
    Phone(String),
    Email(String),
}

impl ContactKey {
    /// `None` when the input is neither a plausible email nor phone.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.contains('@') {
            let email = normalize_email(raw);
            is_valid_email(&email).then_some(ContactKey::Email(email))
        } else {
            let phone = normalize_phone(raw);
            is_valid_phone(&phone).then_some(ContactKey::Phone(phone))
        }
    }

    pub fn matches(&self, phone: &str, email: &str) -> bool {
        match self {
            ContactKey::Phone(p) => p == phone,
            ContactKey::Email(e) => e == email,
        }
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key: lower-case, no tashkeel or tatweel, one alef, ة→ه, ى→ي.
fn fold_arabic(s: &str) -> String {
    collapse_whitespace(s)
        .chars()
        .filter(|c| !matches!(c, '\u{064B}'..='\u{0652}' | '\u{0640}'))
        .map(|c| match c {
            'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
            'ة' => 'ه',
            'ى' => 'ي',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}
