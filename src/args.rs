//! Command-line argument parsing and processing.
//!
//! Hand-rolled parser producing a [`CliAction`] for main to dispatch. The
//! grammar is small: an optional subcommand (`search`, `preview`, `set`,
//! `simulate`), destination/radius flags for the default run, and the usual
//! help/version/debug flags.

use std::path::PathBuf;

/// How the user names the destination on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum DestinationArg {
    /// A literal `lat,lon` pair.
    Coordinate(crate::geo::Coordinate),
    /// Free text resolved through the geocoder.
    Query(String),
}

impl DestinationArg {
    fn parse(raw: &str) -> Self {
        match raw.parse() {
            Ok(coordinate) => DestinationArg::Coordinate(coordinate),
            Err(_) => DestinationArg::Query(raw.to_string()),
        }
    }
}

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Arm the alarm and run the tracking loop.
    Run {
        debug_enabled: bool,
        destination: Option<DestinationArg>,
        radius_m: Option<f64>,
        /// Replay script instead of live positions (simulate subcommand).
        replay: Option<PathBuf>,
    },
    /// Interactive destination picker.
    Search { debug_enabled: bool },
    /// Play one instance of a sound profile.
    Preview { profile: String },
    /// Update persisted preferences (field-value pairs).
    Set { fields: Vec<(String, String)> },
    /// Display help information and exit.
    ShowHelp,
    /// Display version information and exit.
    ShowVersion,
    /// Show help due to unknown arguments and exit.
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut debug_enabled = false;
        let mut destination: Option<DestinationArg> = None;
        let mut radius_m: Option<f64> = None;
        let mut replay: Option<PathBuf> = None;
        let mut subcommand: Option<String> = None;
        let mut positional: Vec<String> = Vec::new();

        let mut idx = 0;
        while idx < args_vec.len() {
            let arg = args_vec[idx].as_str();
            match arg {
                "--help" | "-h" => return ParsedArgs { action: CliAction::ShowHelp },
                "--version" | "-V" => {
                    return ParsedArgs {
                        action: CliAction::ShowVersion,
                    };
                }
                "--debug" => debug_enabled = true,
                "--dest" | "-d" => {
                    idx += 1;
                    match args_vec.get(idx) {
                        Some(value) => destination = Some(DestinationArg::parse(value)),
                        None => {
                            return ParsedArgs {
                                action: CliAction::ShowHelpDueToError,
                            };
                        }
                    }
                }
                "--radius" | "-r" => {
                    idx += 1;
                    match args_vec.get(idx).and_then(|v| v.parse::<f64>().ok()) {
                        Some(value) => radius_m = Some(value),
                        None => {
                            return ParsedArgs {
                                action: CliAction::ShowHelpDueToError,
                            };
                        }
                    }
                }
                _ if arg.starts_with('-') => {
                    return ParsedArgs {
                        action: CliAction::ShowHelpDueToError,
                    };
                }
                _ if subcommand.is_none() => subcommand = Some(arg.to_string()),
                _ => positional.push(arg.to_string()),
            }
            idx += 1;
        }

        let action = match subcommand.as_deref() {
            None | Some("run") => CliAction::Run {
                debug_enabled,
                destination,
                radius_m,
                replay,
            },
            Some("search") => CliAction::Search { debug_enabled },
            Some("preview") => match positional.first() {
                Some(profile) => CliAction::Preview {
                    profile: profile.clone(),
                },
                None => CliAction::ShowHelpDueToError,
            },
            Some("set") => {
                // set expects field value [field value ...]
                if positional.is_empty() || positional.len() % 2 != 0 {
                    CliAction::ShowHelpDueToError
                } else {
                    let fields = positional
                        .chunks(2)
                        .map(|pair| (pair[0].clone(), pair[1].clone()))
                        .collect();
                    CliAction::Set { fields }
                }
            }
            Some("simulate") => match positional.first() {
                Some(script) => {
                    replay = Some(PathBuf::from(script));
                    CliAction::Run {
                        debug_enabled,
                        destination,
                        radius_m,
                        replay,
                    }
                }
                None => CliAction::ShowHelpDueToError,
            },
            Some(_) => CliAction::ShowHelpDueToError,
        };

        ParsedArgs { action }
    }
}

/// Display help information.
pub fn display_help() {
    println!("wakepoint v{}", env!("CARGO_PKG_VERSION"));
    println!("Location-based wake-up alarm for naps on the move");
    println!();
    println!("Usage: wakepoint [COMMAND] [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run                    Arm the alarm and track (default)");
    println!("  search                 Interactively pick a destination");
    println!("  preview <profile>      Play one alarm sound (classic|chime|urgent)");
    println!("  set <field> <value>    Update a preference (theme|sound)");
    println!("  simulate <script>      Run against a replay script instead of live fixes");
    println!();
    println!("Options:");
    println!("  -d, --dest <lat,lon | query>   Destination coordinate or search text");
    println!("  -r, --radius <meters>          Wake-up radius (100-2000, default 500)");
    println!("      --debug                    Verbose operational logging");
    println!("  -h, --help                     Print help");
    println!("  -V, --version                  Print version");
    println!();
    println!("Keys while tracking: [s]top  [r]estart  [d]ismiss alarm  [q]uit");
}

/// Display version information.
pub fn display_version() {
    println!("wakepoint v{}", env!("CARGO_PKG_VERSION"));
}
