//! File name sanitization.

/// Characters that are rejected by at least one common filesystem, plus the
/// comma (it breaks naive CSV consumers of the output table).
const FORBIDDEN: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', ',', '\r', '\n'];

/// Device names Windows refuses as file names regardless of extension.
const RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Default replacement for forbidden characters.
pub const DEFAULT_REPLACEMENT: &str = "_";

/// Make a free-form label safe to use as a file name.
///
/// Every forbidden character is replaced by `replacement`, trailing spaces and
/// dots are trimmed, and reserved device names get `replacement` appended.
///
/// ```
/// use narrator::sanitize::sanitize_with;
///
/// assert_eq!(sanitize_with("a/b:c", "_"), "a_b_c");
/// assert_eq!(sanitize_with("con", "_"), "con_");
/// ```
pub fn sanitize_with(raw: &str, replacement: &str) -> String {
    let mut sanitized = String::with_capacity(raw.len());
    for c in raw.chars() {
        if FORBIDDEN.contains(&c) {
            sanitized.push_str(replacement);
        } else {
            sanitized.push(c);
        }
    }

    let trimmed_len = sanitized.trim_end_matches([' ', '.']).len();
    sanitized.truncate(trimmed_len);

    if RESERVED
        .iter()
        .any(|name| name.eq_ignore_ascii_case(&sanitized))
    {
        sanitized.push_str(replacement);
    }

    sanitized
}

/// [`sanitize_with`] using [`DEFAULT_REPLACEMENT`].
pub fn sanitize(raw: &str) -> String {
    sanitize_with(raw, DEFAULT_REPLACEMENT)
}
