//! Nickname validation (RFC 2812 section 2.3.1).

/// Default maximum nickname length.
pub const DEFAULT_NICK_MAX_LEN: usize = 30;

/// Extension trait for checking if a string is a valid IRC nickname.
pub trait NickExt {
    /// Check against [`DEFAULT_NICK_MAX_LEN`].
    fn is_valid_nick(&self) -> bool;

    /// Check with a server-specific maximum length.
    ///
    /// First character: letter or one of ``[]\`^_{|}``; the rest may also
    /// contain digits and `-`.
    fn is_valid_nick_len(&self, max_len: usize) -> bool;
}

#[inline]
fn is_special(c: char) -> bool {
    matches!(c, '[' | ']' | '\\' | '`' | '_' | '^' | '{' | '|' | '}')
}

impl NickExt for str {
    fn is_valid_nick(&self) -> bool {
        self.is_valid_nick_len(DEFAULT_NICK_MAX_LEN)
    }

    fn is_valid_nick_len(&self, max_len: usize) -> bool {
        if self.is_empty() || self.len() > max_len {
            return false;
        }

        let mut chars = self.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || is_special(c) => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || is_special(c) || c == '-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_rfc_nicks() {
        assert!("nick".is_valid_nick());
        assert!("[cool]".is_valid_nick());
        assert!("a-b_c".is_valid_nick());
    }

    #[test]
    fn rejects_bad_nicks() {
        assert!(!"".is_valid_nick());
        assert!(!"1abc".is_valid_nick());
        assert!(!"has space".is_valid_nick());
        assert!(!"#chan".is_valid_nick());
        assert!(!"abcdef".is_valid_nick_len(5));
    }
}
