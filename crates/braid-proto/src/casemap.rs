//! RFC 1459 case mapping.
//!
//! Besides ASCII letters, `[]\~` fold to `{}|^`, so `Nick[1]` and
//! `nick{1}` name the same user.

/// Fold a single character.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        'A'..='Z' => (c as u8 + 32) as char,
        _ => c,
    }
}

/// Fold a string; used as the key for nick and channel lookups.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Case-insensitive comparison under RFC 1459 folding.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .chars()
            .zip(b.chars())
            .all(|(ca, cb)| irc_lower_char(ca) == irc_lower_char(cb))
}
