//! `clipsheet build`, `extract` and `list`.

use std::path::{Path, PathBuf};

use clap::Args;
use clipsheet_config::ReportSettings;
use clipsheet_recon::{ExtractIssue, StyleWarnings};
use clipsheet_report::pipeline::{extract_sources, run_build, run_rebuild};
use clipsheet_report::{output_file_name, BuildOutcome, BuildRequest, RequestGate, SourcePaths, SummaryTarget};
use serde::Serialize;

use crate::CliError;

#[derive(Args)]
pub struct BuildArgs {
    /// Primary source: delimited text export (CSV, TSV, ...)
    pub primary: PathBuf,

    /// Secondary source: spreadsheet export
    #[arg(long, short = 's')]
    pub secondary: Option<PathBuf>,

    /// Existing workbook to add the new sheet to
    #[arg(long, short = 'b')]
    pub baseline: Option<PathBuf>,

    /// Sheet name (default: leading number of the primary file name)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Number shown before the headline in the title cell
    #[arg(long)]
    pub prefix: Option<String>,

    /// Headline (default: read from the secondary source)
    #[arg(long)]
    pub headline: Option<String>,

    /// Output file; `.xlsx` is appended when missing
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// External .xlsx template (overrides [layout].template_path)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Order rows newest first before writing
    #[arg(long)]
    pub sort: bool,

    /// Skip the totals row
    #[arg(long)]
    pub no_totals: bool,

    /// Keep template column widths
    #[arg(long)]
    pub no_autofit: bool,

    /// Print a JSON summary to stdout instead of the human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Primary source: delimited text export
    pub primary: PathBuf,

    /// Secondary source: spreadsheet export
    #[arg(long, short = 's')]
    pub secondary: Option<PathBuf>,

    /// Write JSON to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Workbook holding numbered report sheets
    pub workbook: PathBuf,

    /// Output file (default: rewrite the input workbook)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Aggregate sheet name (overrides [aggregate].sheet_name)
    #[arg(long)]
    pub sheet: Option<String>,

    /// External .xlsx template (overrides [layout].template_path)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Print a JSON summary to stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildSummary<'a> {
    output: String,
    sheet: &'a str,
    first_row: usize,
    last_row: usize,
    row_count: usize,
    totals_row: Option<usize>,
    total_readership: i64,
    total_ad_eq: i64,
    merged: usize,
    appended: usize,
    summary_row: Option<usize>,
    style_warnings: &'a StyleWarnings,
    issues: &'a [ExtractIssue],
}

impl<'a> BuildSummary<'a> {
    fn new(outcome: &'a BuildOutcome) -> Self {
        let sheet = &outcome.artifact.sheet;
        Self {
            output: outcome.output_path.display().to_string(),
            sheet: &sheet.name,
            first_row: sheet.first_row,
            last_row: sheet.last_row,
            row_count: sheet.row_count(),
            totals_row: sheet.totals_row,
            total_readership: sheet.total_readership,
            total_ad_eq: sheet.total_ad_eq,
            merged: outcome.reconciled.merged,
            appended: outcome.reconciled.appended,
            summary_row: outcome.summary_row,
            style_warnings: &outcome.reconciled.style_warnings,
            issues: &outcome.reconciled.issues,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListSummary<'a> {
    output: String,
    sheet: &'a str,
    row_count: usize,
    source_sheets: usize,
}

fn superseded() -> CliError {
    CliError::general("request was superseded before it finished")
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::general(format!("JSON encoding failed: {e}")))
}

fn print_issues(issues: &[ExtractIssue]) {
    for issue in issues {
        let field = issue.field.as_deref().map(|f| format!(" [{f}]")).unwrap_or_default();
        match &issue.raw_value {
            Some(raw) => eprintln!("  row {}{}: {} ({:?})", issue.row, field, issue.message, raw),
            None => eprintln!("  row {}{}: {}", issue.row, field, issue.message),
        }
    }
}

/// Split `--output` into the directory and file name the pipeline expects.
fn output_location(output: Option<&Path>, settings: &ReportSettings) -> (PathBuf, String) {
    match output {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| settings.output.file_name.clone());
            (dir, output_file_name(&name))
        }
        None => (PathBuf::from("."), output_file_name(&settings.output.file_name)),
    }
}

// ============================================================================
// build
// ============================================================================

pub fn cmd_build(args: BuildArgs, settings: &ReportSettings) -> Result<(), CliError> {
    if args.sheet.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(CliError::args("--sheet must not be empty"));
    }

    let (output_dir, file_name) = output_location(args.output.as_deref(), settings);
    let mut options = settings.build_options();
    options.file_name = file_name;
    options.number_prefix = args.prefix;
    options.headline = args.headline;
    options.sort_rows = args.sort;
    if args.no_totals {
        options.write_totals = false;
    }
    if args.no_autofit {
        options.autofit = None;
    }

    let request = BuildRequest {
        sources: SourcePaths { primary: args.primary, secondary: args.secondary },
        baseline: args.baseline,
        template: args.template.or_else(|| settings.layout.template_path.clone()),
        sheet_name: args.sheet,
        options,
        policy: settings.extract.clone(),
        summary: Some(SummaryTarget {
            sheet: settings.output.summary_sheet.clone(),
            link: settings.output.summary_link.clone(),
        }),
        output_dir,
    };

    let gate = RequestGate::new();
    let token = gate.begin();
    let outcome = smol::block_on(run_build(&gate, token, request))
        .map_err(CliError::report)?
        .ok_or_else(superseded)?;

    if args.json {
        println!("{}", to_json(&BuildSummary::new(&outcome))?);
        return Ok(());
    }

    let sheet = &outcome.artifact.sheet;
    eprintln!(
        "wrote {}: sheet '{}', rows {}-{} ({} rows, {} merged, {} added from secondary)",
        outcome.output_path.display(),
        sheet.name,
        sheet.first_row,
        sheet.last_row,
        sheet.row_count(),
        outcome.reconciled.merged,
        outcome.reconciled.appended,
    );
    if let Some(row) = outcome.summary_row {
        eprintln!("  summary row {} added to '{}'", row, settings.output.summary_sheet);
    }
    if !outcome.reconciled.issues.is_empty() {
        eprintln!("{} issue(s):", outcome.reconciled.issues.len());
        print_issues(&outcome.reconciled.issues);
    }
    Ok(())
}

// ============================================================================
// extract
// ============================================================================

pub fn cmd_extract(args: ExtractArgs, settings: &ReportSettings) -> Result<(), CliError> {
    settings.extract.validate().map_err(|e| CliError::report(e.into()))?;
    let paths = SourcePaths { primary: args.primary, secondary: args.secondary };

    let gate = RequestGate::new();
    let token = gate.begin();
    let reconciled = smol::block_on(extract_sources(
        &gate,
        token,
        &paths,
        &settings.extract,
        &settings.layout.sheet_name,
    ))
    .map_err(CliError::report)?
    .ok_or_else(superseded)?;

    let json = to_json(&reconciled)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, format!("{json}\n"))
                .map_err(|e| CliError::report(clipsheet_report::ReportError::Write {
                    stage: "extract",
                    path: path.clone(),
                    source: e,
                }))?;
            eprintln!(
                "wrote {}: {} rows, {} issue(s)",
                path.display(),
                reconciled.rows.len(),
                reconciled.issues.len()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

// ============================================================================
// list
// ============================================================================

pub fn cmd_list(args: ListArgs, settings: &ReportSettings) -> Result<(), CliError> {
    let mut options = settings.aggregate_options();
    if let Some(sheet) = args.sheet {
        if sheet.trim().is_empty() {
            return Err(CliError::args("--sheet must not be empty"));
        }
        options.sheet_name = sheet;
    }
    let output = args.output.unwrap_or_else(|| args.workbook.clone());
    options.file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| settings.output.file_name.clone());
    let template = args.template.or_else(|| settings.layout.template_path.clone());

    let outcome = smol::block_on(run_rebuild(&args.workbook, template.as_deref(), &options, &output))
        .map_err(CliError::report)?;

    if args.json {
        let summary = ListSummary {
            output: output.display().to_string(),
            sheet: &outcome.artifact.sheet.name,
            row_count: outcome.aggregated_row_count,
            source_sheets: outcome.source_sheet_count,
        };
        println!("{}", to_json(&summary)?);
    } else {
        eprintln!(
            "wrote {}: sheet '{}', {} rows from {} numbered sheet(s)",
            output.display(),
            outcome.artifact.sheet.name,
            outcome.aggregated_row_count,
            outcome.source_sheet_count,
        );
    }
    Ok(())
}
