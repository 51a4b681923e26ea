//! Deal Convert - Turn card detections into bridge deals
//!
//! Reads detector result files, assigns every card to a hand and prints the
//! deal in PBN notation, optionally with its double-dummy table. Also reports
//! detector output quality and evaluates it against ground truth.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deal_converter::converter::{ConverterConfig, DealAssignment, DealConverter};
use deal_converter::detection::{read_detections, report_missing_and_over_detected};
use deal_converter::evaluation::{
    classification_metrics, pair_by_overlap, DEFAULT_MIN_IOU, DEFAULT_THRESHOLD,
};
use deal_converter::output::write_assignment_csv;
use deal_converter::quadrant::DEFAULT_MARGIN_WIDTH;
use deal_converter::solver::{solve_deal, DdTable};
use deal_converter::strategy::{CoreFinderKind, LinkageKind};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Parser)]
#[command(name = "deal-convert")]
#[command(about = "Convert playing-card detections into bridge deals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign detected cards to hands and print each deal as PBN
    Assign {
        /// Detector result files (JSON)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for per-file assignment CSVs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Number of parallel threads (default: number of CPU cores)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Keep duplicate pairs spaced like the two symbols of one card
        #[arg(long)]
        smart_dedup: bool,

        /// Half-width of the ambiguous band around the image diagonals
        #[arg(long, default_value_t = DEFAULT_MARGIN_WIDTH)]
        margin: f64,

        /// How the trustworthy detections of each quadrant are found
        #[arg(long, value_enum, default_value_t = CoreFinderKind::Density)]
        core_finder: CoreFinderKind,

        /// Distance from a detection to the cards of a hand
        #[arg(long, value_enum, default_value_t = LinkageKind::Single)]
        linkage: LinkageKind,

        /// Solve complete deals double dummy
        #[arg(long)]
        solve: bool,
    },

    /// Report missing and over-detected cards in a detector result file
    Report {
        /// Detector result file (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Evaluate detections against hand-labelled ground truth
    Evaluate {
        /// Ground truth file (JSON list of objects)
        #[arg(long)]
        truth: PathBuf,

        /// Detector result file (JSON)
        #[arg(long)]
        predictions: PathBuf,

        /// Confidence needed for a positive prediction
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Overlap needed for a prediction to match its ground truth
        #[arg(long, default_value_t = DEFAULT_MIN_IOU)]
        min_iou: f64,

        /// Print metrics as JSON
        #[arg(long)]
        json: bool,
    },
}

struct AssignOptions {
    config: ConverterConfig,
    core_finder: CoreFinderKind,
    linkage: LinkageKind,
    solve: bool,
    output_dir: Option<PathBuf>,
}

/// What one input file produced
struct FileOutcome {
    assignment: DealAssignment,
    pbn: Option<String>,
    dd_table: Option<DdTable>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Assign {
            inputs,
            output_dir,
            threads,
            smart_dedup,
            margin,
            core_finder,
            linkage,
            solve,
        } => {
            let base = if smart_dedup {
                ConverterConfig::smart()
            } else {
                ConverterConfig::default()
            };
            let options = AssignOptions {
                config: base.with_margin_width(margin),
                core_finder,
                linkage,
                solve,
                output_dir,
            };
            assign_files(&inputs, threads, &options)?;
        }
        Commands::Report { input } => {
            report_file(&input)?;
        }
        Commands::Evaluate {
            truth,
            predictions,
            threshold,
            min_iou,
            json,
        } => {
            evaluate_files(&truth, &predictions, threshold, min_iou, json)?;
        }
    }

    Ok(())
}

fn process_file(path: &Path, options: &AssignOptions) -> Result<FileOutcome> {
    let mut converter = DealConverter::new(options.core_finder.build(), options.linkage.build())
        .with_config(options.config.clone());
    converter.read_json(path)?;
    converter.report_missing_and_fp()?;
    converter.dedup()?;
    let assignment = converter.assign()?.clone();

    if let Some(dir) = &options.output_dir {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "deal".to_string());
        let csv_path = dir.join(format!("{}.csv", stem));
        write_assignment_csv(&csv_path, &assignment.cards)?;
        log::info!("Wrote {}", csv_path.display());
    }

    let pbn = if assignment.is_complete() {
        Some(converter.format_pbn()?)
    } else {
        None
    };

    let dd_table = match (&pbn, options.solve) {
        (Some(pbn), true) => Some(solve_deal(pbn)?),
        _ => None,
    };

    Ok(FileOutcome {
        assignment,
        pbn,
        dd_table,
    })
}

fn assign_files(inputs: &[PathBuf], threads: Option<usize>, options: &AssignOptions) -> Result<()> {
    // Configure thread pool
    if let Some(n) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    if let Some(dir) = &options.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let error_count = AtomicUsize::new(0);
    let results: Mutex<HashMap<usize, Result<FileOutcome>>> = Mutex::new(HashMap::new());

    inputs.par_iter().enumerate().for_each(|(idx, path)| {
        let outcome = process_file(path, options);
        if let Err(e) = &outcome {
            error_count.fetch_add(1, Ordering::Relaxed);
            log::warn!("{}: {:#}", path.display(), e);
        }
        results.lock().unwrap().insert(idx, outcome);
    });

    let mut results = results.into_inner().unwrap();
    let mut complete = 0usize;
    for (idx, path) in inputs.iter().enumerate() {
        match results.remove(&idx) {
            Some(Ok(outcome)) => {
                if let Some(pbn) = &outcome.pbn {
                    complete += 1;
                    println!("{}: {}", path.display(), pbn);
                } else if let Some(deficiency) = &outcome.assignment.deficiency {
                    println!(
                        "{}: incomplete {:?}, missing {}",
                        path.display(),
                        outcome.assignment.hand_sizes(),
                        deficiency.missing.join(" ")
                    );
                }
                if let Some(table) = &outcome.dd_table {
                    println!("{}", table);
                }
            }
            Some(Err(e)) => println!("{}: ERROR: {:#}", path.display(), e),
            None => {}
        }
    }

    eprintln!(
        "\nDone! {} files, {} complete deals ({} errors)",
        inputs.len(),
        complete,
        error_count.load(Ordering::Relaxed)
    );
    Ok(())
}

fn report_file(input: &Path) -> Result<()> {
    let detections = read_detections(input)?;
    let report = report_missing_and_over_detected(&detections);

    println!("Detections: {}", detections.len());
    println!("Missing ({}): {}", report.missing.len(), report.missing.join(" "));
    println!(
        "Over-detected ({}): {}",
        report.over_detected.len(),
        report.over_detected.join(" ")
    );
    Ok(())
}

fn evaluate_files(truth: &Path, predictions: &Path, threshold: f64, min_iou: f64, json: bool) -> Result<()> {
    let truth = read_detections(truth)?;
    let predictions = read_detections(predictions)?;

    let pairs = pair_by_overlap(&truth, &predictions);
    let metrics = classification_metrics(&pairs, threshold, min_iou);

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!("Ground truth: {}, predictions: {}", truth.len(), predictions.len());
        println!(
            "TP {}  FP {}  FN {}",
            metrics.true_positives, metrics.false_positives, metrics.false_negatives
        );
        println!("Precision: {:.4}", metrics.precision);
        println!("Recall:    {:.4}", metrics.recall);
    }
    Ok(())
}
