use anyhow::Result;
use clap::Parser;
use console::style;
use std::sync::Arc;
use std::time::Instant;

use heicify::catalog::codec::{is_heif_enc_available, HeifEncCodec};
use heicify::cli::Args;
use heicify::utils::{
    create_progress_bar, error_println, format_duration, validate_inputs, verbose_println,
    warn_println,
};
use heicify::{CatalogPath, ConversionConfig, ConversionEngine, PathKind, StdFileSystem};

fn main() -> Result<()> {
    let start_time = Instant::now();
    let args = Args::parse();

    // Print banner
    println!(
        "{}",
        style("heicify - asset catalog HEIC converter").bold().blue()
    );
    println!();

    validate_inputs(&args)?;

    // Configuration-level check: without the encoder nothing can convert,
    // so fail fast instead of reporting the same error once per asset.
    if !is_heif_enc_available() {
        error_println("heif-enc not found on PATH");
        return Err(anyhow::anyhow!(
            "heif-enc is required. Install libheif: brew install libheif (macOS) or apt-get install libheif-examples (Linux)"
        ));
    }

    let kind = PathKind::from(args.path_type.clone());
    let config = ConversionConfig {
        quality: args.compression_quality,
        delete_original: args.delete_original_image,
        source_extension: args.source_extension.clone(),
        destination_extension: args.destination_extension.clone(),
        parallel_jobs: args.jobs,
        verbose: args.verbose,
        ..Default::default()
    };

    if config.verbose {
        println!("{}", style("Configuration:").bold());
        println!("  Path type: {:?}", kind);
        println!("  Compression quality: {}", config.quality);
        println!(
            "  Conversion: .{} -> .{}",
            config.source_extension, config.destination_extension
        );
        println!("  Delete originals: {}", config.delete_original);
        println!("  Parallel jobs: {}", config.parallel_jobs);
        println!();
    }

    let catalog_paths: Vec<CatalogPath> = args
        .paths
        .iter()
        .map(|path| CatalogPath::new(path.clone(), kind))
        .collect();

    let engine = ConversionEngine::new(
        config.clone(),
        Arc::new(StdFileSystem),
        Arc::new(HeifEncCodec),
    );

    // Discovery completes fully before any conversion starts; the
    // discovered list both sizes the progress bar and feeds the batch, so
    // every directory is listed exactly once.
    let (images, discovery_errors) = engine.discover(&catalog_paths);
    println!(
        "{}",
        style(format!("Found {} convertible images", images.len())).dim()
    );

    let progress = create_progress_bar(images.len() as u64);
    progress.set_message("Converting images");

    let mut report = engine.process(&images, |image| {
        progress.inc(1);
        if let Some(filename) = image.file_name().and_then(|name| name.to_str()) {
            progress.set_message(filename.to_string());
        }
    })?;

    // Discovery failures surface in the same summary, ahead of the
    // conversion failures.
    let mut errors = discovery_errors;
    errors.append(&mut report.errors);
    report.errors = errors;

    progress.finish_with_message("done");
    println!();

    // Results summary
    let total_time = start_time.elapsed();
    println!("{}", style("Results Summary:").bold().green());
    println!(
        "  Converted: {}",
        style(report.converted.len()).bold().green()
    );
    if !report.errors.is_empty() {
        println!("  Failed: {}", style(report.errors.len()).bold().red());
    }
    if !report.warnings.is_empty() {
        println!(
            "  Warnings: {}",
            style(report.warnings.len()).bold().yellow()
        );
    }
    println!("  Total time: {}", style(format_duration(total_time)).bold());

    for converted in &report.converted {
        verbose_println(
            config.verbose,
            &format!(
                "{} -> {}",
                converted.original.display(),
                converted.destination.display()
            ),
        );
    }

    if !report.warnings.is_empty() {
        println!();
        for warning in &report.warnings {
            warn_println(&warning.to_string());
        }
    }

    // Per-asset failures are reported but never fail the process; only
    // configuration-level errors exit non-zero.
    if !report.errors.is_empty() {
        println!();
        println!("{}", style("Errors encountered:").bold().red());
        for (i, error) in report.errors.iter().enumerate() {
            println!(
                "  {}: {}",
                style(format!("#{}", i + 1)).dim(),
                style(error.to_string()).red()
            );
        }
        println!();
        warn_println(
            "Converted files and manifests may be out of sync for the paths above; inspect or re-run.",
        );
    }

    Ok(())
}
