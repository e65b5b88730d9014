use crate::config::TraceDialect;
use crate::trace::TraceTable;
use csv::StringRecord;
use serde::Serialize;
use tracing::debug;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const CPU_PCT_CEILING: f64 = 1000.0;

/// One task row with its numeric columns coerced and converted. A field is
/// `None` only when the source column is absent from the file; a value that
/// fails coercion is zero, never a missing marker.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedRow {
    pub task_id: Option<String>,
    pub process: Option<String>,
    pub hostname: Option<String>,
    pub duration_min: Option<f64>,
    pub realtime_min: Option<f64>,
    pub cpus: Option<f64>,
    pub cpu_pct: Option<f64>,
    pub memory_gb: Option<f64>,
    pub read_gb: Option<f64>,
    pub write_gb: Option<f64>,
    pub total_io_gb: Option<f64>,
}

impl NormalizedRow {
    /// Wall time in hours, used by the energy model. Prefers realtime and
    /// falls back to duration.
    pub fn wall_time_hours(&self) -> Option<f64> {
        self.realtime_min
            .or(self.duration_min)
            .map(|minutes| minutes / 60.0)
    }
}

/// Which optional columns this dataset actually carries. Computed once after
/// schema resolution and consulted downstream to decide which derived fields
/// and aggregates exist at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub task_id: bool,
    pub process: bool,
    pub hostname: bool,
    pub duration: bool,
    pub realtime: bool,
    pub cpus: bool,
    pub cpu_pct: bool,
    pub memory: bool,
    pub read_bytes: bool,
    pub write_bytes: bool,
}

impl Capabilities {
    pub fn from_table(table: &TraceTable) -> Self {
        Capabilities {
            task_id: table.has_column("task_id"),
            process: table.has_column("process"),
            hostname: table.has_column("hostname"),
            duration: table.has_column("duration"),
            realtime: table.has_column("realtime"),
            cpus: table.has_column("cpus"),
            cpu_pct: cpu_pct_column(table).is_some(),
            memory: table.has_column("memory"),
            read_bytes: table.has_column("read_bytes"),
            write_bytes: table.has_column("write_bytes"),
        }
    }

    pub fn io(&self) -> bool {
        self.read_bytes && self.write_bytes
    }

    pub fn wall_time(&self) -> bool {
        self.realtime || self.duration
    }

    pub fn cpu_power(&self) -> bool {
        self.cpus && self.cpu_pct
    }

    /// Energy (and therefore emission) can only be derived with a wall time.
    pub fn energy(&self) -> bool {
        self.wall_time()
    }
}

/// The `%cpu` column, or its `cpu_usage` alias in older exports.
fn cpu_pct_column(table: &TraceTable) -> Option<&'static str> {
    ["%cpu", "cpu_usage"]
        .into_iter()
        .find(|name| table.has_column(name))
}

/// Pure per-row transform of the resolved table into typed, unit-converted
/// rows. Order-independent, no side effects.
pub fn normalize(table: &TraceTable, dialect: &TraceDialect) -> (Vec<NormalizedRow>, Capabilities) {
    let caps = Capabilities::from_table(table);
    debug!("dataset capabilities: {:?}", caps);

    let cpu_col = cpu_pct_column(table);
    let rows = table
        .rows()
        .iter()
        .map(|row| normalize_row(table, row, dialect, &caps, cpu_col))
        .collect();

    (rows, caps)
}

fn normalize_row(
    table: &TraceTable,
    row: &StringRecord,
    dialect: &TraceDialect,
    caps: &Capabilities,
    cpu_col: Option<&str>,
) -> NormalizedRow {
    let numeric = |column: &str| parse_numeric(table.value(row, column));

    let read_gb = caps
        .read_bytes
        .then(|| numeric("read_bytes") / BYTES_PER_GB);
    let write_gb = caps
        .write_bytes
        .then(|| numeric("write_bytes") / BYTES_PER_GB);
    let total_io_gb = match (read_gb, write_gb) {
        (Some(r), Some(w)) => Some(r + w),
        _ => None,
    };

    NormalizedRow {
        task_id: caps
            .task_id
            .then(|| table.value(row, "task_id").unwrap_or_default().to_string()),
        process: caps.process.then(|| {
            simplify_process_name(table.value(row, "process").unwrap_or_default())
        }),
        hostname: caps
            .hostname
            .then(|| table.value(row, "hostname").unwrap_or_default().to_string()),
        duration_min: caps
            .duration
            .then(|| numeric("duration") / dialect.time_unit.per_minute()),
        realtime_min: caps
            .realtime
            .then(|| numeric("realtime") / dialect.time_unit.per_minute()),
        cpus: caps.cpus.then(|| numeric("cpus")),
        cpu_pct: cpu_col.map(|col| numeric(col).min(CPU_PCT_CEILING)),
        memory_gb: caps
            .memory
            .then(|| numeric("memory") / dialect.memory_unit.per_gb()),
        read_gb,
        write_gb,
        total_io_gb,
    }
}

/// Coerce a raw cell to a number. Anything unparseable, negative or
/// non-finite contributes zero rather than poisoning downstream arithmetic.
fn parse_numeric(value: Option<&str>) -> f64 {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

/// Strip a `:`-joined pipeline namespace, keeping the final segment.
/// `NFCORE_CHIPSEQ:CHIPSEQ:ALIGN` becomes `ALIGN`.
fn simplify_process_name(raw: &str) -> String {
    raw.rsplit(':').next().unwrap_or(raw).to_string()
}
