// Chat content scrubbing: contact details never reach storage.
use std::sync::LazyLock;

use regex::Regex;

pub const MASK_TOKEN: &str = "***";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

// 05XXXXXXXX, 5XXXXXXXX, +9665XXXXXXXX and 009665XXXXXXXX, with optional
// space or dash separators, in ASCII or Arabic-Indic digits.
static SAUDI_MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(?:\+|00|٠٠|۰۰)(?:966|٩٦٦|۹۶۶)[\s-]?|[0٠۰])?[5٥۵](?:[\s-]?[0-9٠-٩۰-۹]){8}",
    )
    .expect("valid mobile regex")
});

static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z0-9_.]{2,}").expect("valid handle regex"));

/// Masks emails, Saudi mobile numbers and `@handle` mentions.
///
/// Emails are masked before handles so an address is replaced whole rather
/// than leaving its local part behind.
pub fn sanitize_message(content: &str) -> String {
    let masked = EMAIL_RE.replace_all(content, MASK_TOKEN);
    let masked = SAUDI_MOBILE_RE.replace_all(&masked, MASK_TOKEN);
    let masked = HANDLE_RE.replace_all(&masked, MASK_TOKEN);
    masked.into_owned()
}

pub fn contains_contact_info(content: &str) -> bool {
    EMAIL_RE.is_match(content) || SAUDI_MOBILE_RE.is_match(content) || HANDLE_RE.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_email() {
        let out = sanitize_message("راسلني على test@example.com لو سمحت");
        assert!(!out.contains("test@example.com"));
        assert!(out.contains(MASK_TOKEN));
        assert_eq!(out, "راسلني على *** لو سمحت");
    }

    #[test]
    fn test_masks_local_mobile() {
        let out = sanitize_message("رقمي 0501234567");
        assert!(!out.contains("0501234567"));
        assert_eq!(out, "رقمي ***");
    }

    #[test]
    fn test_masks_mobile_formats() {
        for input in [
            "+966501234567",
            "00966501234567",
            "+966 50 123 4567",
            "050-123-4567",
            "501234567",
            "٠٥٠١٢٣٤٥٦٧",
        ] {
            let out = sanitize_message(&format!("call {}", input));
            assert_eq!(out, "call ***", "input {}", input);
        }
    }

    #[test]
    fn test_masks_handles() {
        assert_eq!(sanitize_message("follow @camp_master"), "follow ***");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let text = "نلتقي عند البوابة الساعة 5 مساء، العدد 12 شخص";
        assert_eq!(sanitize_message(text), text);
        assert!(!contains_contact_info(text));
    }

    #[test]
    fn test_sanitized_output_is_clean() {
        let out = sanitize_message("a@b.co 0551234567 @handle");
        assert!(!contains_contact_info(&out));
    }
}
