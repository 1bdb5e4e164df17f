//! Main application entry point and CLI dispatch.
//!
//! Parses arguments and hands off to the appropriate action: the tracking
//! run (via the `Wakepoint` coordinator), the interactive destination
//! picker, the sound preview, or the preference setter. Errors arriving
//! here are terminal: they are logged with their chain and the process
//! exits non-zero.

use wakepoint::args::{CliAction, ParsedArgs, display_help, display_version};
use wakepoint::commands;
use wakepoint::{Wakepoint, log_end, log_error_exit};

fn main() {
    let parsed = ParsedArgs::parse(std::env::args());

    let result = match parsed.action {
        CliAction::Run {
            debug_enabled,
            destination,
            radius_m,
            replay,
        } => Wakepoint::new(debug_enabled)
            .with_destination(destination)
            .with_radius(radius_m)
            .with_replay(replay)
            .run(),
        CliAction::Search { debug_enabled } => commands::search::run(debug_enabled),
        CliAction::Preview { profile } => commands::preview::run(&profile),
        CliAction::Set { fields } => commands::set::run(&fields),
        CliAction::ShowHelp => {
            display_help();
            return;
        }
        CliAction::ShowVersion => {
            display_version();
            return;
        }
        CliAction::ShowHelpDueToError => {
            display_help();
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        log_error_exit!("{e}");
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        log_end!();
        std::process::exit(1);
    }
}
