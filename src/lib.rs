//! nfc-multitool - console front-end for the libnfc command-line tools.
//!
//! A thin orchestration layer over `nfc-poll`, `nfc-list`, `nfc-mfclassic`,
//! `nfc-mfsetuid` and the nfcpy contactless frontend: subprocess invocation
//! with timeouts, ordered substring classification of the captured output,
//! input validation, and an interactive menu.
pub mod cli;
pub mod core;

// Re-export commonly used types
pub use crate::core::{
    classify::{classify_card, CardType, DumpCheck, UidProbe, WriteFailure},
    ndef::NdefWriteOutcome,
    ops::{DiagnosisReport, ReadOutcome, UidWriteOutcome},
    runner::{SystemRunner, ToolError, ToolOutput, ToolRunner, ToolSpec},
    utils::{normalize_uid, validate_ndef_text},
};

// Common error type
pub type Result<T> = anyhow::Result<T>;
