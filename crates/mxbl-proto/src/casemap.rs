//! RFC 1459 case-mapping.
//!
//! Nicknames on IRC compare case-insensitively, with `[]\~` folding to
//! `{}|^`. Every nickname comparison in mxbld goes through here.

/// Fold one character using RFC 1459 rules.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        'A'..='Z' => (c as u8 + 32) as char,
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c,
    }
}

/// Fold a whole string using RFC 1459 rules.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Case-insensitive nickname equality.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.chars()
            .zip(b.chars())
            .all(|(x, y)| irc_lower_char(x) == irc_lower_char(y))
}
