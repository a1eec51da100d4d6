//! Display masking for secret values

/// Mask a secret for display.
///
/// Values longer than four characters keep their first two and last four
/// characters around a fixed `****`. Shorter values are fully starred.
/// Works on characters, so multi-byte input is never split.
#[must_use]
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}
