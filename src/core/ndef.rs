//! NDEF text writes, delegated to the nfcpy contactless frontend.
//!
//! nfcpy is Python-only, so this path crosses one process boundary: a fixed
//! helper script run by `python3 -c`. The payload travels via argv and is
//! never spliced into the script source.

use std::time::Duration;

use crate::core::runner::{ToolError, ToolRunner, ToolSpec};

pub const PYTHON_TOOL: &str = "python3";
pub const NDEF_TIMEOUT: Duration = Duration::from_secs(15);

// Senses a 106A target for up to 10 seconds, activates the tag, verifies
// NDEF support and writability, then writes one English-language text
// record. Every result is reported as a line starting with "ndef:".
const NDEF_HELPER: &str = r#"
import sys

sys.path.insert(0, '/usr/lib/python3/dist-packages')

import nfc
import nfc.tag
from nfc.clf import RemoteTarget
import ndef

text = sys.argv[1]
try:
    clf = nfc.ContactlessFrontend('usb')
except IOError:
    print('ndef: no reader')
    sys.exit(1)
with clf:
    target = clf.sense(RemoteTarget('106A'), iterations=20, interval=0.5)
    if target is None:
        print('ndef: no target')
        sys.exit(1)
    tag = nfc.tag.activate(clf, target)
    if tag is None:
        print('ndef: no target')
        sys.exit(1)
    if tag.ndef is None:
        print('ndef: no ndef')
        sys.exit(1)
    if not tag.ndef.is_writeable:
        print('ndef: read-only')
        sys.exit(1)
    tag.ndef.records = [ndef.TextRecord(text, language='en')]
    print('ndef: written')
    print('ndef: tag ' + tag.identifier.hex().upper())
    print('ndef: capacity {} used {}'.format(tag.ndef.capacity, tag.ndef.length))
"#;

/// Outcome of an NDEF text write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdefWriteOutcome {
    Written {
        tag_id: Option<String>,
        capacity: Option<u32>,
        used: Option<u32>,
    },
    NoTarget,
    NoNdefSupport,
    ReadOnly,
    /// Helper output matched no known status line; raw text surfaced.
    Failed { output: String },
}

/// Write `text` as an NDEF text record to the tag on the reader.
///
/// `text` must already have passed `validate_ndef_text`.
pub fn write_ndef_text(runner: &dyn ToolRunner, text: &str) -> Result<NdefWriteOutcome, ToolError> {
    log::info!("Writing NDEF text record ({} chars)", text.chars().count());
    let out = runner.run(&ToolSpec::new(
        PYTHON_TOOL,
        &["-c", NDEF_HELPER, text],
        NDEF_TIMEOUT,
    ))?;
    Ok(parse_helper_output(&out.combined()))
}

fn parse_helper_output(text: &str) -> NdefWriteOutcome {
    if text.contains("ndef: written") {
        return NdefWriteOutcome::Written {
            tag_id: token_after(text, "ndef: tag "),
            capacity: token_after(text, "ndef: capacity ").and_then(|t| t.parse().ok()),
            used: token_after(text, " used ").and_then(|t| t.parse().ok()),
        };
    }
    if text.contains("ndef: no target") {
        return NdefWriteOutcome::NoTarget;
    }
    if text.contains("ndef: no ndef") {
        return NdefWriteOutcome::NoNdefSupport;
    }
    if text.contains("ndef: read-only") {
        return NdefWriteOutcome::ReadOnly;
    }
    NdefWriteOutcome::Failed {
        output: text.to_string(),
    }
}

/// First whitespace-terminated token after `marker`, if any.
fn token_after(text: &str, marker: &str) -> Option<String> {
    let rest = &text[text.find(marker)? + marker.len()..];
    rest.split_whitespace().next().map(|t| t.to_string())
}
