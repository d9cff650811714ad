//! Validation utilities.

use crate::types::{ChatError, ChatResult};

const MAX_ROOM_NAME_LEN: usize = 255;
const FALLBACK_FILENAME: &str = "attachment";

/// Validation utilities
pub struct Validator;

impl Validator {
    /// Room names address broadcast groups and appear in URLs.
    pub fn room_name(name: &str) -> ChatResult<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ChatError::invalid_room_name("room name cannot be empty"));
        }
        if trimmed.len() > MAX_ROOM_NAME_LEN {
            return Err(ChatError::invalid_room_name(format!(
                "room name too long (max {MAX_ROOM_NAME_LEN} characters)"
            )));
        }
        if trimmed.chars().any(|c| c.is_control() || c == '/') {
            return Err(ChatError::invalid_room_name(
                "room name cannot contain '/' or control characters",
            ));
        }
        Ok(())
    }

    /// True when the message would carry nothing.
    pub fn is_blank(content: &str) -> bool {
        content.trim().is_empty()
    }

    /// Reduce a client filename to a bare file name safe to use as a storage key segment.
    pub fn filename(raw: &str) -> String {
        let base = raw
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_control())
            .collect::<String>();
        let base = base.trim().trim_start_matches('.');

        if base.is_empty() {
            FALLBACK_FILENAME.to_string()
        } else {
            base.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_name_rules() {
        assert!(Validator::room_name("chat_1_2").is_ok());
        assert!(Validator::room_name("   ").is_err());
        assert!(Validator::room_name("a/b").is_err());
        assert!(Validator::room_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn filename_strips_directories() {
        assert_eq!(Validator::filename("../../etc/passwd"), "passwd");
        assert_eq!(Validator::filename("C:\\music\\take 3.wav"), "take 3.wav");
        assert_eq!(Validator::filename(".."), "attachment");
        assert_eq!(Validator::filename(""), "attachment");
        assert_eq!(Validator::filename(".hidden.txt"), "hidden.txt");
    }
}
