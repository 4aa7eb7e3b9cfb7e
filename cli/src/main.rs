//! pdfsnap CLI - snapshot-based regression checks for PDF layouts

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfsnap::{
    snapshot, table, testing_file_paths, CompareOptions, Comparator, ExtractOptions,
    ExtractedDocument, HarnessPaths,
};

#[derive(Parser)]
#[command(name = "pdfsnap")]
#[command(version)]
#[command(about = "Snapshot-based visual regression checks for PDF layouts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a master snapshot from a reference PDF
    Snapshot {
        /// Reference PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Snapshot output path (defaults to <input>.json next to the PDF)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Check candidate PDFs against a master snapshot
    Check {
        /// Master snapshot JSON file
        #[arg(value_name = "MASTER")]
        master: PathBuf,

        /// Candidate PDF files or folders of candidates
        #[arg(value_name = "FILE", required = true)]
        candidates: Vec<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        compare: CompareArgs,
    },

    /// Run the full harness over a fixtures folder
    ///
    /// Expects <ROOT>/fixtures/master.pdf and <ROOT>/fixtures/for_testing/;
    /// the master snapshot is regenerated, then every candidate is checked.
    Run {
        /// Project root holding the fixtures folder
        #[arg(value_name = "ROOT", default_value = ".")]
        root: PathBuf,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        compare: CompareArgs,
    },

    /// Extract a PDF and print the snapshot JSON
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Convert a grid configuration into its list message
    Table {
        /// Grid rows JSON file (array of row objects)
        #[arg(value_name = "ROWS")]
        rows: PathBuf,

        /// Column bindings JSON file (view name to index/filter map)
        #[arg(value_name = "BINDINGS")]
        bindings: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Rasterization DPI for the barcode pass
    #[arg(long, default_value = "72")]
    dpi: u32,

    /// Column count used when extending value boxes
    #[arg(long, default_value = "1")]
    columns: u32,

    /// Skip the barcode pass
    #[arg(long)]
    no_barcodes: bool,
}

impl ExtractArgs {
    fn options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .with_dpi(self.dpi)
            .with_columns(self.columns)
    }
}

#[derive(clap::Args)]
struct CompareArgs {
    /// Maximum per-coordinate position drift, in pixels
    #[arg(long, default_value = "5")]
    tolerance: i64,

    /// Require bit-exact positions
    #[arg(long)]
    strict: bool,
}

impl CompareArgs {
    fn options(&self) -> CompareOptions {
        let options = CompareOptions::new().with_tolerance(self.tolerance);
        if self.strict {
            options.strict()
        } else {
            options
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Snapshot {
            input,
            output,
            extract,
        } => cmd_snapshot(&input, output.as_deref(), &extract),
        Commands::Check {
            master,
            candidates,
            extract,
            compare,
        } => cmd_check(&master, &candidates, &extract, &compare),
        Commands::Run {
            root,
            extract,
            compare,
        } => cmd_run(&root, &extract, &compare),
        Commands::Extract {
            input,
            output,
            compact,
            extract,
        } => cmd_extract(&input, output.as_deref(), compact, &extract),
        Commands::Table {
            rows,
            bindings,
            output,
        } => cmd_table(&rows, &bindings, output.as_deref()),
    };

    match result {
        Ok(failures) if failures > 0 => {
            eprintln!("{}: {} check(s) failed", "Error".red().bold(), failures);
            std::process::exit(1);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn extract_document(
    input: &Path,
    args: &ExtractArgs,
) -> Result<ExtractedDocument, pdfsnap::Error> {
    log::debug!("extracting {}", input.display());
    #[cfg(feature = "raster")]
    if !args.no_barcodes {
        return pdfsnap::extract_file_with_barcodes(input, args.options());
    }
    pdfsnap::extract_file_with_options(input, args.options())
}

/// Expand any folder arguments into their candidate files, sorted by name.
fn expand_candidates(paths: &[PathBuf]) -> Result<Vec<PathBuf>, pdfsnap::Error> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            out.extend(testing_file_paths(path)?);
        } else {
            out.push(path.clone());
        }
    }
    Ok(out)
}

fn cmd_snapshot(
    input: &Path,
    output: Option<&Path>,
    extract: &ExtractArgs,
) -> Result<usize, Box<dyn std::error::Error>> {
    let output = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| input.with_extension("json"));

    log::info!("extracting master snapshot from {}", input.display());
    let doc = extract_document(input, extract)?;
    snapshot::save(&output, &doc)?;

    println!(
        "{} {} ({} pages)",
        "Saved".green(),
        output.display(),
        doc.page_count()
    );
    Ok(0)
}

fn cmd_check(
    master_path: &Path,
    candidates: &[PathBuf],
    extract: &ExtractArgs,
    compare: &CompareArgs,
) -> Result<usize, Box<dyn std::error::Error>> {
    log::info!("loading master snapshot {}", master_path.display());
    let master = snapshot::load(master_path)?;
    let candidates = expand_candidates(candidates)?;
    check_candidates(&master, &candidates, extract, compare)
}

fn cmd_run(
    root: &Path,
    extract: &ExtractArgs,
    compare: &CompareArgs,
) -> Result<usize, Box<dyn std::error::Error>> {
    let paths = HarnessPaths::new(root);

    println!("{} {}", "Extracting master".cyan(), paths.master_pdf.display());
    let master = extract_document(&paths.master_pdf, extract)?;
    snapshot::save(&paths.master_json, &master)?;

    let candidates = testing_file_paths(&paths.for_testing)?;
    check_candidates(&master, &candidates, extract, compare)
}

fn check_candidates(
    master: &ExtractedDocument,
    candidates: &[PathBuf],
    extract: &ExtractArgs,
    compare: &CompareArgs,
) -> Result<usize, Box<dyn std::error::Error>> {
    let comparator = Comparator::new(compare.options());

    let pb = ProgressBar::new(candidates.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut failures = 0;
    for candidate in candidates {
        pb.set_message(candidate.display().to_string());
        let report = comparator.compare(master, &extract_document(candidate, extract)?);
        pb.inc(1);
        if report.is_match() {
            pb.println(format!("{} {}", "PASS".green().bold(), candidate.display()));
        } else {
            failures += 1;
            pb.println(format!("{} {}", "FAIL".red().bold(), candidate.display()));
            for line in report.to_string().lines() {
                pb.println(format!("  {}", line.dimmed()));
            }
        }
    }
    pb.finish_and_clear();
    log::info!(
        "checked {} candidate(s), {} failed",
        candidates.len(),
        failures
    );

    println!(
        "\n{} {} passed, {} failed",
        "Result:".bold(),
        candidates.len() - failures,
        failures
    );
    Ok(failures)
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    extract: &ExtractArgs,
) -> Result<usize, Box<dyn std::error::Error>> {
    let doc = extract_document(input, extract)?;

    let json = if compact {
        serde_json::to_string(&doc)?
    } else {
        serde_json::to_string_pretty(&doc)?
    };

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }
    Ok(0)
}

fn cmd_table(
    rows_path: &Path,
    bindings_path: &Path,
    output: Option<&Path>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let rows: Vec<table::GridRow> = serde_json::from_str(&fs::read_to_string(rows_path)?)?;
    let bindings = serde_json::from_str(&fs::read_to_string(bindings_path)?)?;

    let message = table::convert(&rows, &bindings);
    let json = serde_json::to_string_pretty(&message)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_expand_candidates_flattens_folders() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b.pdf")).unwrap();
        File::create(dir.path().join("a.pdf")).unwrap();
        let single = dir.path().join("a.pdf");

        let expanded = expand_candidates(&[dir.path().to_path_buf(), single.clone()]).unwrap();
        assert_eq!(expanded.len(), 3);
        // Folder contents come back sorted, explicit files keep their position
        assert!(expanded[0].ends_with("a.pdf"));
        assert!(expanded[1].ends_with("b.pdf"));
        assert_eq!(expanded[2], single);
    }

    #[test]
    fn test_expand_candidates_passes_plain_files_through() {
        let candidates = vec![PathBuf::from("one.pdf"), PathBuf::from("two.pdf")];
        assert_eq!(expand_candidates(&candidates).unwrap(), candidates);
    }
}
