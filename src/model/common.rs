use uuid::Uuid;

pub type Id = String;

/// Upper bound on tweet length, counted in characters
pub const MAX_TWEET_CHARS: usize = 280;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Check that tweet text is between 1 and 280 characters.
///
/// Length is measured in Unicode scalar values, not bytes.
pub fn validate_tweet_content(content: &str) -> Result<(), String> {
    let chars = content.chars().count();
    if chars == 0 {
        return Err("content must contain at least 1 character".to_string());
    }
    if chars > MAX_TWEET_CHARS {
        return Err(format!(
            "content must contain at most {} characters (got {})",
            MAX_TWEET_CHARS, chars
        ));
    }
    Ok(())
}
