use crate::constants::*;

pub fn validate_subject(subject: &str) -> Result<(), String> {
    let len = subject.trim().chars().count();
    if len < MIN_SUBJECT_LENGTH {
        return Err(format!(
            "Subject must be at least {} characters",
            MIN_SUBJECT_LENGTH
        ));
    }
    if len > MAX_SUBJECT_LENGTH {
        return Err(format!(
            "Subject must be at most {} characters",
            MAX_SUBJECT_LENGTH
        ));
    }
    Ok(())
}

/// A message is valid when it carries text, attachments, or both.
pub fn validate_message_content(content: &str, attachment_count: usize) -> Result<(), String> {
    if content.trim().is_empty() && attachment_count == 0 {
        return Err(EMPTY_MESSAGE_ERROR.into());
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_attachment_count(count: usize, max: usize) -> Result<(), String> {
    if count > max {
        return Err(format!(
            "At most {} files can be attached to one message",
            max
        ));
    }
    Ok(())
}

pub fn validate_emoji(emoji: &str) -> Result<(), String> {
    let trimmed = emoji.trim();
    if trimmed.is_empty() {
        return Err("Emoji is required".into());
    }
    if trimmed.chars().count() > MAX_EMOJI_LENGTH || trimmed.chars().any(char::is_whitespace) {
        return Err("Emoji must be a single short token".into());
    }
    Ok(())
}
