//! Pipeline stages: fetch, parse plan, parse changes, merge.
//!
//! Each stage reads the previous stage's output from disk, so stages can be
//! run one at a time from the CLI or chained with [`run`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Timelike, Utc};
use tracing::info;

use crate::config::ConfigError;
use crate::domain::{ChangeRow, FEED_TZ, MergedRow, PlanRow, TimeError, to_yymmdd};
use crate::matcher::{MergeConfig, merge};
use crate::store::{RawKind, RawStore, StoreError, read_rows, write_rows};
use crate::timetables::{
    FetchError, ParseError, StationEntry, TimetablesClient, parse_changes, parse_plan,
};

const PLAN_FILE: &str = "plan_parsed.csv";
const CHANGES_FILE: &str = "changes_parsed.csv";
const MERGED_FILE: &str = "merged_with_delays.csv";

/// Errors from any pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Time(#[from] TimeError),
}

/// Directory layout of a pipeline run.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root of the raw snapshots
    pub raw_dir: PathBuf,
    /// Directory of the parsed and merged CSV tables
    pub processed_dir: PathBuf,
}

impl Paths {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    /// Both directories under one data root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("raw"), root.join("processed"))
    }

    pub fn raw_store(&self) -> RawStore {
        RawStore::new(&self.raw_dir)
    }

    pub fn plan_csv(&self) -> PathBuf {
        self.processed_dir.join(PLAN_FILE)
    }

    pub fn changes_csv(&self) -> PathBuf {
        self.processed_dir.join(CHANGES_FILE)
    }

    pub fn merged_csv(&self) -> PathBuf {
        self.processed_dir.join(MERGED_FILE)
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::under("data")
    }
}

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Station name or search pattern; the first hit is used.
    pub station: String,
    /// Plan date; today when absent.
    pub date: Option<String>,
    /// Plan hour, 0-23; the current hour when absent.
    pub hour: Option<u32>,
}

impl FetchRequest {
    pub fn new(station: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            date: None,
            hour: None,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_hour(mut self, hour: u32) -> Self {
        self.hour = Some(hour);
        self
    }
}

/// Files written by [`fetch_and_save_raw`].
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub station: StationEntry,
    pub eva: String,
    pub stations_path: PathBuf,
    pub plan_path: PathBuf,
    pub changes_path: PathBuf,
}

/// Look up the station, then download its plan for one hour and its
/// current changes into a new raw snapshot.
pub async fn fetch_and_save_raw(
    client: &TimetablesClient,
    store: &RawStore,
    request: &FetchRequest,
) -> Result<FetchOutcome, PipelineError> {
    let stations = client.find_station(&request.station, 1).await?;
    let station = stations
        .first()
        .cloned()
        .ok_or_else(|| FetchError::StationNotFound(request.station.clone()))?;
    let eva = station
        .eva
        .clone()
        .ok_or_else(|| FetchError::MissingEva(station.label().to_string()))?;

    let now = Utc::now().with_timezone(&FEED_TZ);
    let yymmdd = to_yymmdd(request.date.as_deref(), &now)?;
    let hour = request.hour.unwrap_or_else(|| now.hour());
    if hour > 23 {
        return Err(FetchError::InvalidRequest(format!("hour {hour} out of range 0-23")).into());
    }

    let snapshot = store.create_snapshot(&now)?;
    info!(
        station = station.label(),
        eva = %eva,
        date = %yymmdd,
        hour,
        dir = %snapshot.dir().display(),
        "fetching timetables"
    );

    let stations_path =
        snapshot.save_json(&format!("stations_{}.json", file_safe(&request.station)), &stations)?;

    let plan = client.get_plan(&eva, &yymmdd, hour).await?;
    let plan_path = snapshot.save_text(&RawKind::Plan.file_name(&eva, snapshot.stamp()), &plan)?;

    tokio::time::sleep(client.pause()).await;

    let changes = client.get_changes(&eva).await?;
    let changes_path =
        snapshot.save_text(&RawKind::Changes.file_name(&eva, snapshot.stamp()), &changes)?;

    Ok(FetchOutcome {
        station,
        eva,
        stations_path,
        plan_path,
        changes_path,
    })
}

/// Parse the newest raw plan into the plan table.
pub fn parse_plan_stage(paths: &Paths) -> Result<Vec<PlanRow>, PipelineError> {
    let (source, xml) = paths.raw_store().read_latest(RawKind::Plan)?;
    let rows = parse_plan(&xml).map_err(|e| parse_error(&source, e))?;

    let out = paths.plan_csv();
    write_rows(&out, &rows)?;

    let by_event = counts(
        rows.iter()
            .map(|r| r.event.map_or_else(|| "-".to_string(), |e| e.to_string())),
    );
    info!(
        source = %source.display(),
        out = %out.display(),
        rows = rows.len(),
        by_event = ?by_event,
        "parsed plan"
    );
    Ok(rows)
}

/// Parse the newest raw change document into the change table.
pub fn parse_changes_stage(paths: &Paths) -> Result<Vec<ChangeRow>, PipelineError> {
    let (source, xml) = paths.raw_store().read_latest(RawKind::Changes)?;
    let rows = parse_changes(&xml).map_err(|e| parse_error(&source, e))?;

    let out = paths.changes_csv();
    write_rows(&out, &rows)?;

    let by_type = counts(
        rows.iter()
            .map(|r| r.msg_type.clone().unwrap_or_else(|| "-".to_string())),
    );
    info!(
        source = %source.display(),
        out = %out.display(),
        rows = rows.len(),
        by_msg_type = ?by_type,
        "parsed changes"
    );
    Ok(rows)
}

/// Summary of a merge run.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    pub out: PathBuf,
    pub rows: usize,
    pub matched: usize,
    /// Share of rows with a delay above zero; 0 for an empty table.
    pub delayed_share: f64,
}

impl MergeSummary {
    fn of(out: PathBuf, rows: &[MergedRow]) -> Self {
        let matched = rows.iter().filter(|r| r.is_matched()).count();
        let delayed = rows.iter().filter(|r| r.delay_min.is_some_and(|d| d > 0)).count();
        let delayed_share = if rows.is_empty() {
            0.0
        } else {
            delayed as f64 / rows.len() as f64
        };
        Self {
            out,
            rows: rows.len(),
            matched,
            delayed_share,
        }
    }
}

/// Merge the plan and change tables, writing the result to `out` or the
/// default merged table.
pub fn merge_stage(
    paths: &Paths,
    config: &MergeConfig,
    out: Option<&Path>,
) -> Result<MergeSummary, PipelineError> {
    let plan: Vec<PlanRow> = read_rows(&paths.plan_csv(), "parse-plan")?;
    let changes: Vec<ChangeRow> = read_rows(&paths.changes_csv(), "parse-changes")?;
    let changes: Vec<ChangeRow> = changes
        .into_iter()
        .map(ChangeRow::with_derived_change_time)
        .collect();

    let merged = merge(&plan, &changes, config);

    let out = out.map_or_else(|| paths.merged_csv(), Path::to_path_buf);
    write_rows(&out, &merged)?;

    let summary = MergeSummary::of(out, &merged);
    info!(
        out = %summary.out.display(),
        tolerance_mins = config.tolerance_mins,
        grouping = %config.grouping,
        rows = summary.rows,
        matched = summary.matched,
        delayed_share = %format!("{:.3}", summary.delayed_share),
        "merged plan with changes"
    );
    Ok(summary)
}

/// Fetch, parse both documents and merge.
pub async fn run(
    client: &TimetablesClient,
    paths: &Paths,
    request: &FetchRequest,
    config: &MergeConfig,
    out: Option<&Path>,
) -> Result<MergeSummary, PipelineError> {
    fetch_and_save_raw(client, &paths.raw_store(), request).await?;
    parse_plan_stage(paths)?;
    parse_changes_stage(paths)?;
    merge_stage(paths, config, out)
}

fn parse_error(path: &Path, source: ParseError) -> PipelineError {
    PipelineError::Parse {
        path: path.to_path_buf(),
        source,
    }
}

fn counts(values: impl Iterator<Item = String>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Replace characters that are awkward in file names.
fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
