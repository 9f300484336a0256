//! Channel name validation (RFC 2812 section 1.3).

/// Maximum channel name length, prefix included.
pub const CHANNEL_MAX_LEN: usize = 50;

/// Extension trait for checking if a string is a valid IRC channel name.
pub trait ChannelExt {
    /// Starts with `#` or `&`, at most 50 characters, no space, comma,
    /// BEL or other control characters.
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name(&self) -> bool {
        let mut chars = self.chars();
        if !matches!(chars.next(), Some('#' | '&')) {
            return false;
        }
        if self.chars().count() > CHANNEL_MAX_LEN || self.len() < 2 {
            return false;
        }
        chars.all(|c| c != ' ' && c != ',' && !c.is_control())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_channels() {
        assert!("#channel".is_channel_name());
        assert!("&local".is_channel_name());
    }

    #[test]
    fn invalid_channels() {
        assert!(!"channel".is_channel_name());
        assert!(!"#".is_channel_name());
        assert!(!"#chan nel".is_channel_name());
        assert!(!"#chan,nel".is_channel_name());
        assert!(!"#bell\x07".is_channel_name());
        assert!(!"".is_channel_name());
    }
}
