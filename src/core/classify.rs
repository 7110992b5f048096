//! Pure classification of captured tool output. No I/O happens here; every
//! function maps text (plus, for the dump check, an exit status) to a label
//! from a closed set.

/// Card type derived from poll/list output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    MifareClassic,
    MifareUltralight,
    Ntag,
    Iso14443a,
    /// Non-empty output that matched no known marker.
    Unknown,
    /// Empty output: nothing was detected at all.
    None,
}

impl CardType {
    pub fn label(&self) -> &'static str {
        match self {
            CardType::MifareClassic => "MIFARE Classic",
            CardType::MifareUltralight => "MIFARE Ultralight",
            CardType::Ntag => "NTAG",
            CardType::Iso14443a => "ISO/IEC 14443A (unspecified type)",
            CardType::Unknown => "unknown card type",
            CardType::None => "no card detected",
        }
    }
}

/// The bare modulation line; also the read operation's success criterion.
pub const ISO14443A_MARKER: &str = "ISO/IEC 14443A";

// Ordered: specific card types before the bare modulation marker, because
// real output carries both ("ISO/IEC 14443A ... MIFARE Classic 1K").
const CARD_MARKERS: &[(&str, CardType)] = &[
    ("MIFARE Classic", CardType::MifareClassic),
    ("Mifare Ultralight", CardType::MifareUltralight),
    ("NTAG", CardType::Ntag),
    (ISO14443A_MARKER, CardType::Iso14443a),
];

/// Classify poll/list output; first marker match wins.
pub fn classify_card(text: &str) -> CardType {
    if text.trim().is_empty() {
        return CardType::None;
    }
    for (marker, card) in CARD_MARKERS {
        if text.contains(marker) {
            return *card;
        }
    }
    CardType::Unknown
}

/// Why a UID write was refused, derived from nfc-mfsetuid output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    CardNotDetected,
    NotCloneCard,
    PermissionDenied,
    Unclassified,
}

impl WriteFailure {
    /// Guidance shown to the user for this failure class.
    pub fn guidance(&self) -> &'static str {
        match self {
            WriteFailure::CardNotDetected => {
                "No card detected. Place the tag flat on the reader and try again."
            }
            WriteFailure::NotCloneCard => {
                "The card rejected the unlock command. UID writes only work on \
                 clone ('magic') Mifare cards; genuine tags have a factory-fixed UID."
            }
            WriteFailure::PermissionDenied => {
                "Permission denied talking to the reader. Check the device \
                 permissions (udev rules) or run with elevated privileges."
            }
            WriteFailure::Unclassified => {
                "The write failed for an unrecognized reason; see the tool output above."
            }
        }
    }
}

const WRITE_FAILURE_MARKERS: &[(&str, WriteFailure)] = &[
    ("No suitable card found", WriteFailure::CardNotDetected),
    ("unlock", WriteFailure::NotCloneCard),
    ("Permission denied", WriteFailure::PermissionDenied),
];

pub fn classify_write_failure(text: &str) -> WriteFailure {
    for (marker, failure) in WRITE_FAILURE_MARKERS {
        if text.contains(marker) {
            return *failure;
        }
    }
    WriteFailure::Unclassified
}

/// Result of the default-key dump step of the diagnose operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpCheck {
    /// Dump succeeded: the tag is readable and may be writable.
    Readable,
    /// Definitive: default keys were refused, the tag is not writable.
    AuthenticationFailed,
    /// Anything else; the raw output is surfaced instead of a verdict.
    Indeterminate,
}

const AUTH_FAILURE_MARKERS: &[&str] = &[
    "Permission denied",
    "Access violation",
    "Authentication failed",
];

pub fn classify_dump(exit_ok: bool, text: &str) -> DumpCheck {
    if exit_ok {
        return DumpCheck::Readable;
    }
    if AUTH_FAILURE_MARKERS.iter().any(|m| text.contains(m)) {
        return DumpCheck::AuthenticationFailed;
    }
    DumpCheck::Indeterminate
}

/// Result of the sentinel UID-write probe step of the diagnose operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidProbe {
    /// The card accepted the write; its UID is now the sentinel value.
    Compatible,
    Incompatible,
    Indeterminate,
}

pub fn classify_uid_probe(text: &str) -> UidProbe {
    if text.contains("No suitable card found") {
        UidProbe::Incompatible
    } else if text.contains("Setting UID") || text.contains("Successfully") {
        UidProbe::Compatible
    } else {
        UidProbe::Indeterminate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_card_markers() {
        assert_eq!(classify_card("MIFARE Classic 1K"), CardType::MifareClassic);
        assert_eq!(
            classify_card("Mifare Ultralight detected"),
            CardType::MifareUltralight
        );
        assert_eq!(classify_card("NTAG215 tag"), CardType::Ntag);
        assert_eq!(
            classify_card("ISO/IEC 14443A (106 kbps) target:"),
            CardType::Iso14443a
        );
    }

    #[test]
    fn test_marker_precedence() {
        // The superset modulation marker never shadows the specific type.
        let text = "ISO/IEC 14443A (106 kbps) target:\n    MIFARE Classic 1K";
        assert_eq!(classify_card(text), CardType::MifareClassic);

        let ultralight = "ISO/IEC 14443A target: Mifare Ultralight";
        assert_eq!(classify_card(ultralight), CardType::MifareUltralight);
    }

    #[test]
    fn test_classify_card_empty_and_unknown() {
        assert_eq!(classify_card(""), CardType::None);
        assert_eq!(classify_card("   \n\t  "), CardType::None);
        assert_eq!(classify_card("FeliCa target found"), CardType::Unknown);
    }

    #[test]
    fn test_classify_card_is_deterministic() {
        let text = "ISO/IEC 14443A ... MIFARE Classic 1K";
        let first = classify_card(text);
        for _ in 0..10 {
            assert_eq!(classify_card(text), first);
        }
    }

    #[test]
    fn test_classify_write_failure() {
        assert_eq!(
            classify_write_failure("Error: No suitable card found!"),
            WriteFailure::CardNotDetected
        );
        assert_eq!(
            classify_write_failure("Failed to unlock card"),
            WriteFailure::NotCloneCard
        );
        assert_eq!(
            classify_write_failure("nfc-mfsetuid: Permission denied"),
            WriteFailure::PermissionDenied
        );
        assert_eq!(
            classify_write_failure("something exploded"),
            WriteFailure::Unclassified
        );
        assert_eq!(classify_write_failure(""), WriteFailure::Unclassified);
    }

    #[test]
    fn test_classify_dump() {
        assert_eq!(classify_dump(true, "whatever"), DumpCheck::Readable);
        assert_eq!(
            classify_dump(false, "Authentication failed for block 4"),
            DumpCheck::AuthenticationFailed
        );
        assert_eq!(
            classify_dump(false, "Access violation"),
            DumpCheck::AuthenticationFailed
        );
        assert_eq!(
            classify_dump(false, "Permission denied"),
            DumpCheck::AuthenticationFailed
        );
        assert_eq!(
            classify_dump(false, "some other error"),
            DumpCheck::Indeterminate
        );
    }

    #[test]
    fn test_classify_uid_probe() {
        assert_eq!(
            classify_uid_probe("No suitable card found"),
            UidProbe::Incompatible
        );
        assert_eq!(
            classify_uid_probe("Setting UID to 00000000"),
            UidProbe::Compatible
        );
        assert_eq!(
            classify_uid_probe("Successfully wrote card"),
            UidProbe::Compatible
        );
        assert_eq!(classify_uid_probe("garbage"), UidProbe::Indeterminate);
        // "No suitable card found" wins even if another marker also appears.
        assert_eq!(
            classify_uid_probe("No suitable card found while Setting UID"),
            UidProbe::Incompatible
        );
    }
}
