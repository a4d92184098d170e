//! Config validation CLI tool
//!
//! Validates a tenured configuration file and reports any errors.

use std::path::PathBuf;
use std::process::ExitCode;
use tenure_util::{default_config_path, format_remaining};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a tenured configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match tenure_config::load_config(&config_path) {
        Ok(config) => {
            let secs = |d: std::time::Duration| Some(tenure_util::duration_secs(d));
            let renewal = &config.renewal;

            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", tenure_config::CURRENT_CONFIG_VERSION);
            println!("  Watched process: {}", config.app.process_name);
            println!(
                "  Toggle command: {} {}",
                config.toggle.command,
                config.toggle.args.join(" ")
            );
            println!();
            println!("Session:");
            println!("  Duration: {}", format_remaining(secs(renewal.session_duration)));
            println!(
                "  Renew before expiry: {}",
                format_remaining(secs(renewal.renew_before_expiry))
            );
            println!(
                "  Wake verification delay: {}",
                format_remaining(secs(renewal.wake_verification_delay))
            );
            println!("  Debounce: {}s", renewal.debounce_interval.as_secs());
            println!(
                "  Short sleep threshold: {}s",
                renewal.short_sleep_threshold.as_secs()
            );
            println!();
            println!("Data directory: {}", config.service.data_dir.display());

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                tenure_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                tenure_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                tenure_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                tenure_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        tenure_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
