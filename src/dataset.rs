use crate::models::DerivedRow;
use crate::normalize::Capabilities;
use itertools::Itertools;

/// All derived rows of a single trace, with the dataset-wide capability set
/// and the carbon intensity the run was priced at.
#[derive(Debug)]
pub struct TraceDataset {
    rows: Vec<DerivedRow>,
    caps: Capabilities,
    intensity: f64,
}

impl TraceDataset {
    pub fn new(rows: Vec<DerivedRow>, caps: Capabilities, intensity: f64) -> Self {
        Self {
            rows,
            caps,
            intensity,
        }
    }

    pub fn rows(&self) -> &[DerivedRow] {
        &self.rows
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    /// Totals across every row. Each total is the straight sum (or mean, for
    /// CPU utilization) of the per-row derived values, so the summary never
    /// disagrees with the row data it was computed from.
    pub fn summary(&self) -> RunSummary {
        let rows = self.rows.iter().collect::<Vec<_>>();

        RunSummary {
            total_tasks: rows.len(),
            total_runtime_min: self.caps.duration.then(|| sum(&rows, |r| r.row.duration_min)),
            total_memory_gb: self.caps.memory.then(|| sum(&rows, |r| r.row.memory_gb)),
            total_io_gb: self.caps.io().then(|| sum(&rows, |r| r.row.total_io_gb)),
            total_energy_kwh: self
                .caps
                .energy()
                .then(|| sum(&rows, |r| r.energy_wh) / 1000.0),
            total_carbon_g: self.caps.energy().then(|| sum(&rows, |r| r.emission_g)),
            avg_cpu_pct: self.caps.cpu_pct.then(|| mean(&rows, |r| r.row.cpu_pct)),
            intensity: self.intensity,
        }
    }

    /// Per-process aggregates in first-seen order. Empty when the trace has
    /// no process column.
    pub fn by_process(&self) -> Vec<ProcessDataset> {
        let names = self
            .rows
            .iter()
            .filter_map(|r| r.row.process.as_deref())
            .unique()
            .collect::<Vec<_>>();

        names
            .into_iter()
            .map(|name| {
                let group = self
                    .rows
                    .iter()
                    .filter(|r| r.row.process.as_deref() == Some(name))
                    .collect::<Vec<_>>();

                ProcessDataset {
                    process: name.to_string(),
                    task_count: group.len(),
                    runtime_min: self.caps.duration.then(|| sum(&group, |r| r.row.duration_min)),
                    avg_duration_min: self
                        .caps
                        .duration
                        .then(|| mean(&group, |r| r.row.duration_min)),
                    cpu_usage_pct: self.caps.cpu_pct.then(|| mean(&group, |r| r.row.cpu_pct)),
                    memory_gb: self.caps.memory.then(|| mean(&group, |r| r.row.memory_gb)),
                    io_gb: self.caps.io().then(|| sum(&group, |r| r.row.total_io_gb)),
                    read_gb: self.caps.read_bytes.then(|| sum(&group, |r| r.row.read_gb)),
                    write_gb: self
                        .caps
                        .write_bytes
                        .then(|| sum(&group, |r| r.row.write_gb)),
                    energy_wh: self.caps.energy().then(|| sum(&group, |r| r.energy_wh)),
                    emission_g: self.caps.energy().then(|| sum(&group, |r| r.emission_g)),
                }
            })
            .collect::<Vec<_>>()
    }

    /// Per-host aggregates in first-seen order, each with the distinct
    /// process names observed on that host. Empty when the trace has no
    /// hostname column.
    pub fn by_host(&self) -> Vec<HostDataset> {
        let hosts = self
            .rows
            .iter()
            .filter_map(|r| r.row.hostname.as_deref())
            .unique()
            .collect::<Vec<_>>();

        hosts
            .into_iter()
            .map(|host| {
                let group = self
                    .rows
                    .iter()
                    .filter(|r| r.row.hostname.as_deref() == Some(host))
                    .collect::<Vec<_>>();

                let processes = group
                    .iter()
                    .filter_map(|r| r.row.process.as_deref())
                    .unique()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>();

                HostDataset {
                    hostname: host.to_string(),
                    task_count: group.len(),
                    runtime_min: self.caps.duration.then(|| sum(&group, |r| r.row.duration_min)),
                    cpu_usage_pct: self.caps.cpu_pct.then(|| mean(&group, |r| r.row.cpu_pct)),
                    memory_gb: self.caps.memory.then(|| sum(&group, |r| r.row.memory_gb)),
                    io_gb: self.caps.io().then(|| sum(&group, |r| r.row.total_io_gb)),
                    energy_wh: self.caps.energy().then(|| sum(&group, |r| r.energy_wh)),
                    emission_g: self.caps.energy().then(|| sum(&group, |r| r.emission_g)),
                    processes,
                }
            })
            .collect::<Vec<_>>()
    }
}

/// Aggregates for one pipeline process (stage), across all its tasks.
#[derive(Debug)]
pub struct ProcessDataset {
    pub process: String,
    pub task_count: usize,
    pub runtime_min: Option<f64>,
    pub avg_duration_min: Option<f64>,
    pub cpu_usage_pct: Option<f64>,
    pub memory_gb: Option<f64>,
    pub io_gb: Option<f64>,
    pub read_gb: Option<f64>,
    pub write_gb: Option<f64>,
    pub energy_wh: Option<f64>,
    pub emission_g: Option<f64>,
}

/// Aggregates for one execution host.
#[derive(Debug)]
pub struct HostDataset {
    pub hostname: String,
    pub task_count: usize,
    pub runtime_min: Option<f64>,
    pub cpu_usage_pct: Option<f64>,
    pub memory_gb: Option<f64>,
    pub io_gb: Option<f64>,
    pub energy_wh: Option<f64>,
    pub emission_g: Option<f64>,
    pub processes: Vec<String>,
}

/// Overall run totals.
#[derive(Debug)]
pub struct RunSummary {
    pub total_tasks: usize,
    pub total_runtime_min: Option<f64>,
    pub total_memory_gb: Option<f64>,
    pub total_io_gb: Option<f64>,
    pub total_energy_kwh: Option<f64>,
    pub total_carbon_g: Option<f64>,
    pub avg_cpu_pct: Option<f64>,
    pub intensity: f64,
}

fn sum(rows: &[&DerivedRow], field: impl Fn(&DerivedRow) -> Option<f64>) -> f64 {
    rows.iter().filter_map(|r| field(r)).sum()
}

fn mean(rows: &[&DerivedRow], field: impl Fn(&DerivedRow) -> Option<f64>) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    sum(rows, field) / rows.len() as f64
}
