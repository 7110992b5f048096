use anyhow::{bail, Result};

/// A writable tag UID is 4 bytes, entered as 8 hex characters.
pub const UID_HEX_LEN: usize = 8;

/// Longest text payload accepted on the NDEF write path.
pub const NDEF_TEXT_MAX_CHARS: usize = 255;

/// Validate a user-entered UID and normalize it to uppercase hex.
///
/// Runs before any subprocess is spawned; a bad UID never reaches the tools.
pub fn normalize_uid(input: &str) -> Result<String> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        bail!("UID cannot be empty");
    }
    if trimmed.len() != UID_HEX_LEN {
        bail!(
            "UID must be exactly {} hex characters, got {}: '{}'",
            UID_HEX_LEN,
            trimmed.len(),
            trimmed
        );
    }
    if hex::decode(trimmed).is_err() {
        bail!("UID must be hexadecimal: '{}'", trimmed);
    }

    Ok(trimmed.to_uppercase())
}

/// Validate an NDEF text payload: non-empty, at most 255 characters.
pub fn validate_ndef_text(input: &str) -> Result<()> {
    if input.trim().is_empty() {
        bail!("Text cannot be empty");
    }
    let chars = input.chars().count();
    if chars > NDEF_TEXT_MAX_CHARS {
        bail!(
            "Text is limited to {} characters, got {}",
            NDEF_TEXT_MAX_CHARS,
            chars
        );
    }
    Ok(())
}
