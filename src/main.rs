//! Backup Restore Tool
//!
//! Replays a local backup archive (document store, blob storage, external database,
//! assets and config) onto a live environment.

// restoretool/src/main.rs
mod clients;
mod config;
mod errors;
mod list;
mod restore;
mod utils;

use config::RestoreSettings;
use restore::RestoreOutcome;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    Restore { archive: PathBuf, auto_confirm: bool },
    List,
    Help,
    Invalid(String),
}

fn parse_args(args: &[String]) -> CliCommand {
    let mut auto_confirm = false;
    let mut positional = Vec::new();
    let mut list = false;

    for arg in args {
        match arg.as_str() {
            "--list" | "-l" => list = true,
            "--yes" | "-y" => auto_confirm = true,
            "--help" | "-h" => return CliCommand::Help,
            other if other.starts_with('-') => {
                return CliCommand::Invalid(format!("Unknown option '{}'", other));
            }
            other => positional.push(other.to_string()),
        }
    }

    match (list, positional.as_slice(), auto_confirm) {
        (_, [], false) => CliCommand::List,
        (false, [archive], _) => CliCommand::Restore { archive: PathBuf::from(archive), auto_confirm },
        (true, [_, ..], _) => CliCommand::Invalid("--list does not take an archive path".to_string()),
        (_, [], true) => CliCommand::Invalid("--yes requires an archive path".to_string()),
        (false, _, _) => CliCommand::Invalid("Only one archive path may be given".to_string()),
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  restoretool <archive-path> [--yes]   Restore a backup archive (.tar.gz)");
    println!("  restoretool --list                   List archives in BACKUP_DIR (default ./backups)");
    println!();
    println!("Options:");
    println!("  -y, --yes    Skip the confirmation prompt");
    println!("  -l, --list   List available backups");
    println!("  -h, --help   Show this message");
}

/// Main entry point for the restore tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("restoretool=info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let settings = RestoreSettings::from_env();

    match parse_args(&args) {
        CliCommand::Help => {
            print_usage();
            ExitCode::SUCCESS
        }
        CliCommand::Invalid(reason) => {
            eprintln!("❌ {}", reason);
            print_usage();
            ExitCode::FAILURE
        }
        CliCommand::List => match list::run_list_flow(&settings.backup_dir) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Error: {:?}", e);
                ExitCode::FAILURE
            }
        },
        CliCommand::Restore { archive, auto_confirm } => {
            println!("🔄 Starting Restore Process...");
            println!("Archive: {}", archive.display());

            match restore::run_restore_flow(&settings, &archive, auto_confirm).await {
                Ok(outcome) => {
                    if let RestoreOutcome::Completed(reports) = &outcome {
                        println!("\n📊 Summary");
                        for report in reports {
                            println!("   {}", report.summary());
                        }
                        println!("✅ Restore completed successfully.");
                    }
                    ExitCode::from(outcome.exit_code())
                }
                Err(e) => {
                    eprintln!("❌ Restore failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliCommand {
        parse_args(&args.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_no_arguments_lists() {
        assert_eq!(parse(&[]), CliCommand::List);
        assert_eq!(parse(&["--list"]), CliCommand::List);
    }

    #[test]
    fn test_archive_path_restores() {
        assert_eq!(
            parse(&["backups/app.tar.gz"]),
            CliCommand::Restore { archive: PathBuf::from("backups/app.tar.gz"), auto_confirm: false }
        );
        assert_eq!(
            parse(&["--yes", "app.tar.gz"]),
            CliCommand::Restore { archive: PathBuf::from("app.tar.gz"), auto_confirm: true }
        );
    }

    #[test]
    fn test_other_forms_are_invalid() {
        assert!(matches!(parse(&["a.tar.gz", "b.tar.gz"]), CliCommand::Invalid(_)));
        assert!(matches!(parse(&["--list", "a.tar.gz"]), CliCommand::Invalid(_)));
        assert!(matches!(parse(&["--force"]), CliCommand::Invalid(_)));
        assert!(matches!(parse(&["-y"]), CliCommand::Invalid(_)));
        assert_eq!(parse(&["--help"]), CliCommand::Help);
    }
}
