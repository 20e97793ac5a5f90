/// Country code assumed for numbers dialed in national format (leading `0`).
pub const DEFAULT_COUNTRY_CODE: &str = "49";

/// Normalize a raw caller ID to `+` followed by digits.
///
/// Returns an empty string when nothing usable is left after cleanup.
pub fn normalize_to_e164(raw: &str) -> String {
    normalize_with_country_code(raw, DEFAULT_COUNTRY_CODE)
}

/// Same as [`normalize_to_e164`] with an explicit country code for
/// national-format input.
///
/// Rules, first match wins:
/// - `+...`  -> unchanged
/// - `00...` -> `+...`
/// - `0...`  -> `+<cc>...`
/// - anything else gets a leading `+`
pub fn normalize_with_country_code(raw: &str, country_code: &str) -> String {
    // Only a leading '+' survives, separators and stray '+' are dropped
    let has_plus = raw.chars().find(|c| c.is_ascii_digit() || *c == '+') == Some('+');
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return String::new();
    }

    if has_plus {
        format!("+{digits}")
    } else if let Some(rest) = digits.strip_prefix("00") {
        if rest.is_empty() {
            String::new()
        } else {
            format!("+{rest}")
        }
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("+{country_code}{rest}")
    } else {
        format!("+{digits}")
    }
}

/// Number formats submitted to the reputation service, in priority order.
///
/// Yields the number without `+`, then the national form (`0...`) when the
/// number carries the configured country code. Never more than two entries.
#[derive(Debug, Clone)]
pub struct LookupCandidates {
    plain: Option<String>,
    national: Option<String>,
}

impl LookupCandidates {
    pub fn new(normalized: &str) -> Self {
        Self::with_country_code(normalized, DEFAULT_COUNTRY_CODE)
    }

    pub fn with_country_code(normalized: &str, country_code: &str) -> Self {
        if normalized.trim().is_empty() {
            return Self {
                plain: None,
                national: None,
            };
        }

        let plain = normalized.strip_prefix('+').unwrap_or(normalized);
        let national = if !country_code.is_empty()
            && plain.starts_with(country_code)
            && plain.len() > country_code.len()
        {
            Some(format!("0{}", &plain[country_code.len()..]))
        } else {
            None
        };

        Self {
            plain: Some(plain.to_string()),
            national,
        }
    }
}

impl Iterator for LookupCandidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.plain.take().or_else(|| self.national.take())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.plain.is_some() as usize + self.national.is_some() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for LookupCandidates {}
