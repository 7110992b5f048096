use anyhow::Result;
use std::env;

use nfc_multitool::cli::commands::{run_cli, run_menu};

fn main() -> Result<()> {
    // No arguments: drop straight into the interactive menu. Anything else
    // goes through the clap CLI.
    if env::args().len() == 1 {
        run_menu()
    } else {
        run_cli()
    }
}
