//! Source files in, report document out.
//!
//! File reads and writes run on smol's blocking pool; parsing, merging and
//! assembly run synchronously between them. Every load carries a
//! [`RequestToken`] and is dropped at the next suspension point once a newer
//! request has begun, so a superseded selection never reaches the caller.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use clipsheet_engine::workbook::Workbook;
use clipsheet_recon::model::sort_issues;
use clipsheet_recon::{
    extract_primary, extract_secondary, merge, CanonicalRow, ExtractIssue, ExtractPolicy, StyleWarnings,
    SynonymTable,
};
use serde::Serialize;

use crate::aggregate::{rebuild, AggregateOutcome};
use crate::assemble::{assemble, serialize, AssembledSheet, BuildOptions, ReportArtifact};
use crate::error::ReportError;
use crate::naming::{output_file_name, suggested_sheet_name};
use crate::summary::append_summary_row;
use crate::template::Template;

// ---------------------------------------------------------------------------
// Request gate
// ---------------------------------------------------------------------------

/// Identifies one load. Only the most recently issued token is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// Monotonic generation counter shared by everyone who can start a load.
#[derive(Debug, Default)]
pub struct RequestGate {
    generation: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding all earlier ones.
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }

    /// Hand `value` through only if `token` is still current.
    pub fn commit<T>(&self, token: RequestToken, value: T) -> Option<T> {
        if self.is_current(token) {
            Some(value)
        } else {
            log::debug!("pipeline: dropping result of superseded request {}", token.0);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SourcePaths {
    /// Delimited text export
    pub primary: PathBuf,
    /// Optional spreadsheet export
    pub secondary: Option<PathBuf>,
}

/// Merged rows plus everything the caller shows alongside them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciled {
    pub rows: Vec<CanonicalRow>,
    pub style_warnings: StyleWarnings,
    /// Both sources' issues, ordered by source row
    pub issues: Vec<ExtractIssue>,
    /// Headline read from the secondary source
    pub headline: Option<String>,
    pub suggested_sheet_name: String,
    pub merged: usize,
    pub appended: usize,
}

async fn read_bytes(stage: &'static str, path: &Path) -> Result<Vec<u8>, ReportError> {
    let owned = path.to_path_buf();
    smol::unblock(move || std::fs::read(&owned))
        .await
        .map_err(|source| ReportError::Read { stage, path: path.to_path_buf(), source })
}

/// Read, extract and merge both sources. `Ok(None)` means the request was
/// superseded while a file was being read.
pub async fn extract_sources(
    gate: &RequestGate,
    token: RequestToken,
    paths: &SourcePaths,
    policy: &ExtractPolicy,
    default_sheet_name: &str,
) -> Result<Option<Reconciled>, ReportError> {
    let synonyms = SynonymTable::default();

    let primary_bytes = read_bytes("primary source", &paths.primary).await?;
    if !gate.is_current(token) {
        return Ok(None);
    }
    let primary = extract_primary(&clipsheet_io::decode_text(&primary_bytes), &synonyms)?;
    let mut issues = primary.issues;

    let mut headline = None;
    let mut invalid_date_urls = Default::default();
    let mut secondary_rows = Vec::new();
    if let Some(path) = &paths.secondary {
        // A broken secondary source never fails the build
        let loaded = read_bytes("secondary source", path).await;
        if !gate.is_current(token) {
            return Ok(None);
        }
        let extracted = loaded.and_then(|bytes| {
            let (workbook, _) = clipsheet_io::import_bytes(&bytes)
                .map_err(|source| ReportError::Import { stage: "secondary source", source })?;
            Ok(extract_secondary(&workbook, policy, &synonyms)?)
        });
        match extracted {
            Ok(secondary) => {
                issues.extend(secondary.issues);
                headline = secondary.headline;
                invalid_date_urls = secondary.invalid_date_urls;
                secondary_rows = secondary.rows;
            }
            Err(e) => {
                log::warn!("pipeline: secondary source skipped: {e}");
                issues.push(ExtractIssue::source(format!("Secondary source could not be read: {e}")));
            }
        }
    }

    let outcome = merge(primary.rows, secondary_rows, &invalid_date_urls);
    sort_issues(&mut issues);
    let file_name = paths.primary.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();

    Ok(gate.commit(
        token,
        Reconciled {
            rows: outcome.rows,
            style_warnings: outcome.style_warnings,
            issues,
            headline,
            suggested_sheet_name: suggested_sheet_name(&file_name, default_sheet_name),
            merged: outcome.merged,
            appended: outcome.appended,
        },
    ))
}

// ---------------------------------------------------------------------------
// Build stage
// ---------------------------------------------------------------------------

/// External template, or the bundled one.
pub async fn load_template(path: Option<&Path>) -> Result<Template, ReportError> {
    match path {
        None => Ok(Template::bundled()),
        Some(path) => {
            let bytes = read_bytes("template", path)
                .await
                .map_err(|e| ReportError::TemplateUnreadable(e.to_string()))?;
            Template::from_bytes(&bytes, &path.display().to_string())
        }
    }
}

pub async fn load_workbook(stage: &'static str, path: &Path) -> Result<Workbook, ReportError> {
    let bytes = read_bytes(stage, path).await?;
    let (workbook, result) =
        clipsheet_io::import_bytes(&bytes).map_err(|source| ReportError::Import { stage, source })?;
    log::debug!("{stage}: {}", result.summary());
    Ok(workbook)
}

pub async fn write_output(path: &Path, bytes: Vec<u8>) -> Result<(), ReportError> {
    let owned = path.to_path_buf();
    smol::unblock(move || std::fs::write(&owned, bytes))
        .await
        .map_err(|source| ReportError::Write { stage: "output", path: path.to_path_buf(), source })
}

/// Where to record the new sheet in a baseline's summary sheet.
#[derive(Debug, Clone)]
pub struct SummaryTarget {
    pub sheet: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub sources: SourcePaths,
    /// Existing workbook to append into
    pub baseline: Option<PathBuf>,
    /// External template; the bundled one otherwise
    pub template: Option<PathBuf>,
    /// Explicit sheet name; otherwise derived from the primary file name,
    /// falling back to `options.sheet_name`
    pub sheet_name: Option<String>,
    pub options: BuildOptions,
    pub policy: ExtractPolicy,
    pub summary: Option<SummaryTarget>,
    /// Directory the document is written to, named by `options.file_name`
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub artifact: ReportArtifact,
    pub reconciled: Reconciled,
    pub output_path: PathBuf,
    /// 1-based row appended to the summary sheet
    pub summary_row: Option<usize>,
}

/// Extract, merge, assemble and write. `Ok(None)` when superseded.
pub async fn run_build(
    gate: &RequestGate,
    token: RequestToken,
    request: BuildRequest,
) -> Result<Option<BuildOutcome>, ReportError> {
    request.policy.validate()?;
    let Some(reconciled) =
        extract_sources(gate, token, &request.sources, &request.policy, &request.options.sheet_name).await?
    else {
        return Ok(None);
    };
    if reconciled.rows.is_empty() {
        return Err(ReportError::NoRows);
    }

    let template = load_template(request.template.as_deref()).await?;
    let mut workbook = match &request.baseline {
        Some(path) => load_workbook("baseline", path).await?,
        None => Workbook::from_sheets(Vec::new()),
    };
    if !gate.is_current(token) {
        return Ok(None);
    }

    let options = BuildOptions {
        sheet_name: request
            .sheet_name
            .clone()
            .unwrap_or_else(|| reconciled.suggested_sheet_name.clone()),
        headline: request.options.headline.clone().or_else(|| reconciled.headline.clone()),
        style_warnings: reconciled.style_warnings.clone(),
        ..request.options.clone()
    };
    let sheet: AssembledSheet = assemble(&mut workbook, &template, &reconciled.rows, &options)?;

    let summary_row = match (&request.baseline, &request.summary) {
        (Some(_), Some(target)) => append_summary_row(&mut workbook, &target.sheet, &sheet, target.link.as_deref()),
        _ => None,
    };

    let bytes = serialize(&workbook)?;
    let file_name = output_file_name(&options.file_name);
    let output_path = request.output_dir.join(&file_name);
    if !gate.is_current(token) {
        return Ok(None);
    }
    write_output(&output_path, bytes.clone()).await?;
    log::info!("pipeline: wrote {}", output_path.display());

    Ok(gate.commit(
        token,
        BuildOutcome {
            artifact: ReportArtifact { file_name, bytes, sheet },
            reconciled,
            output_path,
            summary_row,
        },
    ))
}

/// Rebuild the aggregate sheet of an existing workbook and write it to
/// `output`.
pub async fn run_rebuild(
    input: &Path,
    template: Option<&Path>,
    options: &BuildOptions,
    output: &Path,
) -> Result<AggregateOutcome, ReportError> {
    let workbook = load_workbook("workbook", input).await?;
    let template = load_template(template).await?;
    let outcome = rebuild(workbook, &template, options)?;
    write_output(output, outcome.artifact.bytes.clone()).await?;
    log::info!("pipeline: wrote {}", output.display());
    Ok(outcome)
}
