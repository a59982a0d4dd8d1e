use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli::Args;

/// Create a styled progress bar
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    pb
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Validate command line arguments.
///
/// Only configuration-level problems are rejected here; bad or missing
/// input paths are discovery errors reported per path at run time.
pub fn validate_inputs(args: &Args) -> Result<()> {
    if !(0.0..=1.0).contains(&args.compression_quality) {
        return Err(anyhow::anyhow!(
            "Compression quality must be between 0.0 and 1.0, got: {}",
            args.compression_quality
        ));
    }

    for (label, extension) in [
        ("source", &args.source_extension),
        ("destination", &args.destination_extension),
    ] {
        if extension.is_empty() || extension.starts_with('.') {
            return Err(anyhow::anyhow!(
                "Invalid {} extension '{}': expected a bare extension like 'png'",
                label,
                extension
            ));
        }
    }

    if args.source_extension == args.destination_extension {
        return Err(anyhow::anyhow!(
            "Source and destination extensions are both '{}'; nothing to convert",
            args.source_extension
        ));
    }

    if args.jobs > 32 {
        return Err(anyhow::anyhow!(
            "Job count too high (max 32), got: {}",
            args.jobs
        ));
    }

    Ok(())
}

/// Print verbose information if verbose mode is enabled
pub fn verbose_println(verbose: bool, message: &str) {
    if verbose {
        println!("{} {}", style("[VERBOSE]").dim(), message);
    }
}

/// Print warning message
pub fn warn_println(message: &str) {
    println!("{} {}", style("[WARNING]").yellow().bold(), message);
}

/// Print error message
pub fn error_println(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1.000s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }

    #[test]
    fn test_validate_quality_bounds() {
        assert!(validate_inputs(&args(&["heicify", "a.xcassets"])).is_ok());
        assert!(validate_inputs(&args(&["heicify", "-c", "0.0", "a.xcassets"])).is_ok());
        assert!(validate_inputs(&args(&["heicify", "-c", "1.0", "a.xcassets"])).is_ok());
        assert!(validate_inputs(&args(&["heicify", "-c", "1.5", "a.xcassets"])).is_err());
        assert!(validate_inputs(&args(&["heicify", "-c", "-0.1", "a.xcassets"])).is_err());
    }

    #[test]
    fn test_validate_extensions() {
        assert!(validate_inputs(&args(&[
            "heicify",
            "--source-extension",
            ".png",
            "a.xcassets"
        ]))
        .is_err());
        assert!(validate_inputs(&args(&[
            "heicify",
            "--destination-extension",
            "",
            "a.xcassets"
        ]))
        .is_err());
        assert!(validate_inputs(&args(&[
            "heicify",
            "--source-extension",
            "heic",
            "a.xcassets"
        ]))
        .is_err());
    }

    #[test]
    fn test_validate_jobs_cap() {
        assert!(validate_inputs(&args(&["heicify", "-j", "32", "a.xcassets"])).is_ok());
        assert!(validate_inputs(&args(&["heicify", "-j", "33", "a.xcassets"])).is_err());
    }
}
