use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};

use crate::core::{
    classify::{CardType, DumpCheck, UidProbe},
    ndef::{write_ndef_text, NdefWriteOutcome},
    ops::{
        diagnose, identify_card, list_devices, read_tag, write_uid, DiagnosisReport, ReadOutcome,
        UidWriteOutcome, READ_TIMEOUT, SENTINEL_UID,
    },
    runner::{SystemRunner, ToolError, ToolRunner},
    utils::{normalize_uid, validate_ndef_text},
};

#[derive(Parser)]
#[command(name = "nfc-multitool")]
#[command(about = "Console front-end for the libnfc tools: read, identify and write NFC tags")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available NFC devices
    Devices,

    /// Wait for a tag and read it (blocks up to 60 seconds)
    Read,

    /// Identify the type of the tag on the reader
    Identify,

    /// Check whether the tag is likely UID-writable
    Diagnose {
        /// Also probe with a sentinel UID write. DESTRUCTIVE: a compatible
        /// card ends up with UID 00000000.
        #[arg(long)]
        uid_probe: bool,

        /// Skip the confirmation prompt for the UID probe
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Write a 4-byte UID to a clone card
    WriteUid {
        /// UID as 8 hex characters, e.g. 1B2A0A31
        uid: String,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Write a text record to an NDEF tag
    WriteNdef {
        /// Text payload (up to 255 characters)
        text: String,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Interactive menu
    Menu,
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        log::LevelFilter::Debug
    } else if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let runner = SystemRunner;

    match cli.command {
        Commands::Devices => cmd_devices(&runner),
        Commands::Read => cmd_read(&runner),
        Commands::Identify => cmd_identify(&runner),
        Commands::Diagnose { uid_probe, yes } => cmd_diagnose(&runner, uid_probe, yes),
        Commands::WriteUid { uid, yes } => cmd_write_uid(&runner, &uid, yes),
        Commands::WriteNdef { text, yes } => cmd_write_ndef(&runner, &text, yes),
        Commands::Menu => cmd_menu(&runner),
    }
}

/// Entry point for running the binary with no arguments at all.
pub fn run_menu() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    cmd_menu(&SystemRunner)
}

fn cmd_devices(runner: &dyn ToolRunner) -> Result<()> {
    println!("Available NFC devices:");
    let listing = list_devices(runner).map_err(render_tool_error)?;
    if listing.trim().is_empty() {
        println!("No devices found");
    } else {
        println!("{}", listing.trim_end());
    }
    Ok(())
}

fn cmd_read(runner: &dyn ToolRunner) -> Result<()> {
    println!(
        "Waiting for NFC tag (up to {} seconds)...",
        READ_TIMEOUT.as_secs()
    );
    match read_tag(runner).map_err(render_tool_error)? {
        ReadOutcome::TagPresent { output } => {
            println!("{}", output.trim_end());
            println!("Tag read successfully");
            Ok(())
        }
        ReadOutcome::NoTagDetected { output } => {
            if !output.trim().is_empty() {
                println!("{}", output.trim_end());
            }
            bail!("No tag detected")
        }
    }
}

fn cmd_identify(runner: &dyn ToolRunner) -> Result<()> {
    println!("Identifying tag...");
    match identify_card(runner).map_err(render_tool_error)? {
        CardType::None => bail!("No tag detected"),
        CardType::Unknown => {
            println!("The tool output matched no known card type");
            Ok(())
        }
        card => {
            println!("Card type: {}", card.label());
            Ok(())
        }
    }
}

fn cmd_diagnose(runner: &dyn ToolRunner, uid_probe: bool, yes: bool) -> Result<()> {
    let run_probe = if uid_probe {
        println!(
            "The UID probe WRITES the sentinel UID {SENTINEL_UID} to the card \
             if it is compatible. This cannot be undone."
        );
        if yes || confirm("Run the destructive probe anyway? (y/n): ")? {
            true
        } else {
            println!("Probe skipped");
            false
        }
    } else {
        false
    };

    println!("Reading tag with default keys...");
    let report = diagnose(runner, run_probe).map_err(render_tool_error)?;
    print_diagnosis(&report);
    Ok(())
}

fn print_diagnosis(report: &DiagnosisReport) {
    match report.dump {
        DumpCheck::Readable => {
            println!("Tag is readable with the default keys; it may be writable.")
        }
        DumpCheck::AuthenticationFailed => {
            println!("Authentication failed: the tag is not writable with the default keys.")
        }
        DumpCheck::Indeterminate => {
            println!("Could not determine readability. Tool output:");
            println!("{}", report.dump_output.trim_end());
        }
    }

    match report.probe {
        Some(UidProbe::Compatible) => {
            println!("UID probe: the card accepted the sentinel write; it is UID-writable.");
            println!("WARNING: the card's UID is now {SENTINEL_UID}.");
        }
        Some(UidProbe::Incompatible) => {
            println!("UID probe: no suitable card found; the tag is not UID-writable.");
        }
        Some(UidProbe::Indeterminate) => {
            println!("UID probe result unclear. Tool output:");
            if let Some(out) = &report.probe_output {
                println!("{}", out.trim_end());
            }
        }
        None => {}
    }
}

fn cmd_write_uid(runner: &dyn ToolRunner, uid: &str, yes: bool) -> Result<()> {
    let uid = normalize_uid(uid)?;

    if !yes && !confirm(&format!("Write UID '{uid}' to the tag? (y/n): "))? {
        println!("Cancelled");
        return Ok(());
    }

    println!("Waiting for NFC tag to write to...");
    match write_uid(runner, &uid).map_err(render_tool_error)? {
        UidWriteOutcome::Written { uid, output } => {
            if !output.trim().is_empty() {
                println!("{}", output.trim_end());
            }
            println!("Successfully wrote UID '{uid}'");
            Ok(())
        }
        UidWriteOutcome::Failed { reason, output } => {
            if !output.trim().is_empty() {
                println!("{}", output.trim_end());
            }
            println!("{}", reason.guidance());
            bail!("Failed to write UID")
        }
    }
}

fn cmd_write_ndef(runner: &dyn ToolRunner, text: &str, yes: bool) -> Result<()> {
    validate_ndef_text(text)?;

    if !yes && !confirm(&format!("Write '{text}' to the tag as NDEF text? (y/n): "))? {
        println!("Cancelled");
        return Ok(());
    }

    println!("Waiting for NFC tag...");
    match write_ndef_text(runner, text).map_err(render_tool_error)? {
        NdefWriteOutcome::Written {
            tag_id,
            capacity,
            used,
        } => {
            println!("Successfully wrote NDEF text record");
            if let Some(id) = tag_id {
                println!("Tag: {id}");
            }
            if let (Some(capacity), Some(used)) = (capacity, used) {
                println!("Capacity: {capacity} bytes, used: {used} bytes");
            }
            Ok(())
        }
        NdefWriteOutcome::NoTarget => bail!("No tag detected"),
        NdefWriteOutcome::NoNdefSupport => bail!("The tag does not support NDEF"),
        NdefWriteOutcome::ReadOnly => bail!("The tag is read-only"),
        NdefWriteOutcome::Failed { output } => {
            if !output.trim().is_empty() {
                println!("{}", output.trim_end());
            }
            bail!("NDEF write failed")
        }
    }
}

fn cmd_menu(runner: &dyn ToolRunner) -> Result<()> {
    println!("==================================================");
    println!("NFC Tag Manager - ACR122U");
    println!("==================================================");
    println!();

    // The startup device listing is informational; its failure must not
    // keep the menu from coming up.
    report(cmd_devices(runner));

    let stdin = io::stdin();
    loop {
        println!();
        println!("Options:");
        println!("  1. List NFC devices");
        println!("  2. Read NFC tag");
        println!("  3. Identify card type");
        println!("  4. Diagnose UID-write capability");
        println!("  5. Write UID to tag");
        println!("  6. Write NDEF text");
        println!("  7. Exit");
        print!("\nSelect option (1-7): ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(choice) = read_trimmed_line(&stdin)? else {
            break; // EOF behaves like exit
        };

        match choice.as_str() {
            "1" => report(cmd_devices(runner)),
            "2" => {
                println!();
                report(cmd_read(runner));
            }
            "3" => {
                println!();
                report(cmd_identify(runner));
            }
            "4" => {
                let probe =
                    confirm("\nInclude the DESTRUCTIVE sentinel UID-write probe? (y/n): ")?;
                report(cmd_diagnose(runner, probe, true));
            }
            "5" => {
                print!("\nEnter UID (hex, e.g. 1B2A0A31): ");
                io::stdout().flush().context("Failed to flush stdout")?;
                let Some(uid) = read_trimmed_line(&stdin)? else {
                    break;
                };
                report(cmd_write_uid(runner, &uid, false));
            }
            "6" => {
                print!("\nEnter text to write as NDEF: ");
                io::stdout().flush().context("Failed to flush stdout")?;
                let Some(text) = read_trimmed_line(&stdin)? else {
                    break;
                };
                report(cmd_write_ndef(runner, &text, false));
            }
            "7" => {
                println!("Exiting...");
                break;
            }
            "" => continue,
            other => println!("Invalid option: {other}"),
        }
    }

    Ok(())
}

/// Render an operation failure and keep going; only exit leaves the menu.
fn report(result: Result<()>) {
    if let Err(e) = result {
        println!("Error: {e}");
    }
}

/// One trimmed line from stdin, or `None` on EOF.
fn read_trimmed_line(stdin: &io::Stdin) -> Result<Option<String>> {
    let mut input = String::new();
    let n = stdin
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush().context("Failed to flush stdout")?;
    Ok(read_trimmed_line(&io::stdin())?
        .map(|answer| answer.eq_ignore_ascii_case("y"))
        .unwrap_or(false))
}

fn render_tool_error(err: ToolError) -> anyhow::Error {
    if let ToolError::NotFound { tool } = &err {
        let hint = install_hint(tool);
        if !hint.is_empty() {
            println!("{hint}");
        }
    }
    anyhow::Error::new(err)
}

fn install_hint(tool: &str) -> &'static str {
    match tool {
        "nfc-poll" | "nfc-list" => "Install: sudo apt-get install libnfc-bin",
        "nfc-mfclassic" | "nfc-mfsetuid" => "Install: sudo apt-get install nfc-tools",
        "python3" => "Install: sudo apt-get install python3 python3-nfcpy",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_hints() {
        assert!(install_hint("nfc-poll").contains("libnfc-bin"));
        assert!(install_hint("nfc-list").contains("libnfc-bin"));
        assert!(install_hint("nfc-mfsetuid").contains("nfc-tools"));
        assert!(install_hint("python3").contains("nfcpy"));
        assert_eq!(install_hint("something-else"), "");
    }
}
