use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{de, Deserialize, Deserializer};

/// Characters left unescaped when the verified email is appended to the
/// post-verification redirect. Matches the usual path-safe quoting: only
/// unreserved characters and `/` pass through.
const REDIRECT_EMAIL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Characters left as-is when the whole redirect target is quoted for the
/// `Location` header: URL delimiters, sub-delims and existing `%` escapes.
const REDIRECT_TARGET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b':')
    .remove(b'/')
    .remove(b'%')
    .remove(b'#')
    .remove(b'?')
    .remove(b'=')
    .remove(b'@')
    .remove(b'[')
    .remove(b']')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';');

/// Append `email=<email>&verified=true` to the destination, joining with `&`
/// when it already carries a query string and `?` otherwise. Spaces, control
/// and non-ASCII characters in the destination are percent-encoded.
pub fn verified_redirect_target(destination: &str, email: &str) -> String {
    let separator = if destination.contains('?') { '&' } else { '?' };
    format!(
        "{}{}email={}&verified=true",
        utf8_percent_encode(destination, REDIRECT_TARGET),
        separator,
        utf8_percent_encode(email, REDIRECT_EMAIL)
    )
}

/// Pick the first non-blank value, trimmed.
pub fn first_present(candidates: &[Option<&String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Pick the first non-empty value exactly as given.
pub fn first_given(candidates: &[Option<&String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Lenient boolean for query flags: accepts true/false, 1/0, yes/no, on/off.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(de::Error::custom(format!("invalid boolean flag: {}", other))),
    }
}
