//! Tag operations: each composes one or two tool invocations with the output
//! classifier and returns a structured outcome. Nothing here prints; the CLI
//! layer renders outcomes. Tool faults (`ToolError`) travel on the `Err` arm
//! so they stay distinguishable from in-band results such as an unknown card
//! type.

use std::time::Duration;

use tempfile::NamedTempFile;

use crate::core::classify::{
    classify_card, classify_dump, classify_uid_probe, classify_write_failure, CardType, DumpCheck,
    UidProbe, WriteFailure, ISO14443A_MARKER,
};
use crate::core::runner::{ToolError, ToolRunner, ToolSpec};

pub const POLL_TOOL: &str = "nfc-poll";
pub const LIST_TOOL: &str = "nfc-list";
pub const DUMP_TOOL: &str = "nfc-mfclassic";
pub const SETUID_TOOL: &str = "nfc-mfsetuid";

pub const READ_TIMEOUT: Duration = Duration::from_secs(60);
pub const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);
pub const LIST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DUMP_TIMEOUT: Duration = Duration::from_secs(10);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const WRITE_UID_TIMEOUT: Duration = Duration::from_secs(30);

/// All-zero UID written by the destructive probe step of [`diagnose`].
pub const SENTINEL_UID: &str = "00000000";

/// List the NFC devices the reader stack can see. Returns the raw listing.
pub fn list_devices(runner: &dyn ToolRunner) -> Result<String, ToolError> {
    let out = runner.run(&ToolSpec::new(LIST_TOOL, &[], LIST_TIMEOUT))?;
    Ok(out.stdout)
}

/// Outcome of waiting for and reading a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    TagPresent { output: String },
    NoTagDetected { output: String },
}

/// Block on the polling tool until a tag appears or the 60s window closes.
pub fn read_tag(runner: &dyn ToolRunner) -> Result<ReadOutcome, ToolError> {
    let out = runner.run(&ToolSpec::new(POLL_TOOL, &[], READ_TIMEOUT))?;
    if !out.stdout.trim().is_empty() && out.stdout.contains(ISO14443A_MARKER) {
        Ok(ReadOutcome::TagPresent { output: out.stdout })
    } else {
        Ok(ReadOutcome::NoTagDetected {
            output: out.combined(),
        })
    }
}

/// Identify the type of the tag on the reader.
///
/// `NotFound`/`Timeout` stay on the `Err` arm: an absent result, never a
/// label, so callers cannot confuse them with [`CardType::Unknown`].
pub fn identify_card(runner: &dyn ToolRunner) -> Result<CardType, ToolError> {
    let out = runner.run(&ToolSpec::new(LIST_TOOL, &["-v"], IDENTIFY_TIMEOUT))?;
    let card = classify_card(&out.combined());
    log::info!("Identified card as {:?}", card);
    Ok(card)
}

/// What the diagnose operation established about the tag on the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisReport {
    pub dump: DumpCheck,
    pub dump_output: String,
    /// Present only when the destructive probe was requested and the dump
    /// step found the tag readable.
    pub probe: Option<UidProbe>,
    pub probe_output: Option<String>,
}

/// Heuristic UID-write capability check.
///
/// Step 1 dumps the tag with the default keys into a temp file. Step 2, run
/// only when `uid_probe` is set and step 1 found the tag readable, writes the
/// sentinel all-zero UID to probe tool/card compatibility. The probe is
/// destructive: a compatible card really ends up with UID [`SENTINEL_UID`].
pub fn diagnose(runner: &dyn ToolRunner, uid_probe: bool) -> Result<DiagnosisReport, ToolError> {
    // NamedTempFile deletes the dump on drop, which covers every exit path
    // out of this function, early `?` returns included.
    let dump_file = NamedTempFile::new().map_err(|e| ToolError::Execution {
        tool: DUMP_TOOL.to_string(),
        source: e,
    })?;
    let dump_path = dump_file.path().to_string_lossy().to_string();

    let out = runner.run(&ToolSpec::new(
        DUMP_TOOL,
        &["r", "a", "u", dump_path.as_str()],
        DUMP_TIMEOUT,
    ))?;
    let dump = classify_dump(out.success(), &out.combined());
    log::info!("Dump check: {:?}", dump);

    let mut report = DiagnosisReport {
        dump,
        dump_output: out.combined(),
        probe: None,
        probe_output: None,
    };

    if report.dump == DumpCheck::Readable && uid_probe {
        log::warn!("Running destructive UID probe with sentinel {SENTINEL_UID}");
        let probe_out = runner.run(&ToolSpec::new(SETUID_TOOL, &[SENTINEL_UID], PROBE_TIMEOUT))?;
        let combined = probe_out.combined();
        report.probe = Some(classify_uid_probe(&combined));
        report.probe_output = Some(combined);
    }

    Ok(report)
}

/// Outcome of a UID write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidWriteOutcome {
    Written { uid: String, output: String },
    Failed { reason: WriteFailure, output: String },
}

/// Write a 4-byte UID to a clone card.
///
/// `uid` must already have passed `normalize_uid`; this function never
/// retries on its own, since an ambiguous failure can leave the card
/// partially written.
pub fn write_uid(runner: &dyn ToolRunner, uid: &str) -> Result<UidWriteOutcome, ToolError> {
    log::info!("Writing UID {uid}");
    let out = runner.run(&ToolSpec::new(SETUID_TOOL, &[uid], WRITE_UID_TIMEOUT))?;
    if out.success() || out.stdout.contains("Setting UID") {
        Ok(UidWriteOutcome::Written {
            uid: uid.to_string(),
            output: out.stdout,
        })
    } else {
        let combined = out.combined();
        Ok(UidWriteOutcome::Failed {
            reason: classify_write_failure(&combined),
            output: combined,
        })
    }
}
