use crate::errors::AnalysisError;
use csv::StringRecord;
use phf::phf_set;
use std::{collections::HashMap, fs, path::Path};
use tracing::{debug, info};

/// Keywords that mark a first row as a Nextflow-compatible header.
static HEADER_KEYWORDS: phf::Set<&'static str> = phf_set! {
    "task_id",
    "process",
    "status",
    "exit",
    "duration",
    "realtime",
    "memory",
    "%cpu",
    "cpus",
    "hostname",
};

/// Column order of a standard Nextflow trace export. Headerless files narrower
/// than this list are assigned a prefix of it.
pub const NEXTFLOW_COLUMNS: [&str; 43] = [
    "task_id",
    "hostname",
    "hash",
    "native_id",
    "process",
    "tag",
    "name",
    "status",
    "exit",
    "module",
    "container",
    "cpus",
    "time",
    "disk",
    "memory",
    "attempt",
    "submit",
    "start",
    "complete",
    "duration",
    "realtime",
    "queue",
    "%cpu",
    "%mem",
    "rss",
    "vmem",
    "peak_rss",
    "peak_vmem",
    "rchar",
    "wchar",
    "syscr",
    "syscw",
    "read_bytes",
    "write_bytes",
    "vol_ctxt",
    "inv_ctxt",
    "workdir",
    "scratch",
    "error_action",
    "create_bash_wrapper_time",
    "create_request_time",
    "submit_to_scheduler_time",
    "submit_to_k8s_time",
];

/// A trace file with its column layout resolved: named columns plus the raw
/// string records, before any typing or unit work.
#[derive(Debug)]
pub struct TraceTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl TraceTable {
    pub fn from_path(path: &Path) -> Result<TraceTable, AnalysisError> {
        if !path.exists() {
            return Err(AnalysisError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AnalysisError::FileNotFound(path.display().to_string())
            }
            _ => AnalysisError::Parse(e.to_string()),
        })?;

        TraceTable::try_from_str(&content)
    }

    pub fn try_from_str(content: &str) -> Result<TraceTable, AnalysisError> {
        // sniff the delimiter and header from the first line carrying data
        let first_line = content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .ok_or_else(|| AnalysisError::Schema("the trace file is empty".to_string()))?;

        let delimiter = detect_delimiter(first_line);
        let has_header = looks_like_header(first_line);
        debug!(
            "detected delimiter {:?}, header present: {}",
            delimiter as char, has_header
        );

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(false)
            .comment(Some(b'#'))
            .from_reader(content.as_bytes());

        let mut records = vec![];
        for record in reader.records() {
            records.push(record?);
        }

        let (columns, rows) = if has_header {
            let header = records
                .first()
                .ok_or_else(|| AnalysisError::Schema("the trace file is empty".to_string()))?;
            let columns = header
                .iter()
                .map(|name| name.trim().to_string())
                .collect::<Vec<_>>();
            (columns, records[1..].to_vec())
        } else {
            let width = records
                .first()
                .map(StringRecord::len)
                .ok_or_else(|| AnalysisError::Schema("the trace file is empty".to_string()))?;

            let columns = if width <= NEXTFLOW_COLUMNS.len() {
                info!("no header found, assigning standard Nextflow column names");
                NEXTFLOW_COLUMNS[..width]
                    .iter()
                    .map(|name| name.to_string())
                    .collect::<Vec<_>>()
            } else {
                // wider than the known schema, keep the data under positional names
                info!("no header found, falling back to generic column names");
                (0..width).map(|i| format!("col_{}", i)).collect::<Vec<_>>()
            };
            (columns, records)
        };

        if rows.is_empty() {
            return Err(AnalysisError::Schema(
                "the trace file contains no task rows".to_string(),
            ));
        }

        let index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();

        info!(
            "resolved {} columns and {} task rows",
            columns.len(),
            rows.len()
        );

        Ok(TraceTable {
            columns,
            index,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// Value of the named column in the given row, if the column exists.
    pub fn value<'a>(&self, row: &'a StringRecord, column: &str) -> Option<&'a str> {
        self.index.get(column).and_then(|i| row.get(*i))
    }
}

fn detect_delimiter(first_line: &str) -> u8 {
    if first_line.contains(',') {
        b','
    } else {
        b'\t'
    }
}

fn looks_like_header(first_line: &str) -> bool {
    let lower = first_line.to_lowercase();
    HEADER_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_comma_separated_header() -> anyhow::Result<()> {
        let table = TraceTable::try_from_str(
            "task_id,process,hostname,%cpu\n1,ALIGN,node01,95.5\n2,SORT,node02,50.0\n",
        )?;

        assert_eq!(table.columns(), ["task_id", "process", "hostname", "%cpu"]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.value(&table.rows()[0], "process"), Some("ALIGN"));
        Ok(())
    }

    #[test]
    fn resolves_tab_separated_header() -> anyhow::Result<()> {
        let table = TraceTable::try_from_str("task_id\tprocess\n1\tALIGN\n")?;

        assert_eq!(table.columns(), ["task_id", "process"]);
        assert_eq!(table.rows().len(), 1);
        Ok(())
    }

    #[test]
    fn skips_comment_lines() -> anyhow::Result<()> {
        let table = TraceTable::try_from_str(
            "# produced by the scheduler\ntask_id,process\n# mid-file note\n1,ALIGN\n",
        )?;

        assert_eq!(table.rows().len(), 1);
        Ok(())
    }

    #[test]
    fn headerless_rows_get_nextflow_column_names() -> anyhow::Result<()> {
        // five columns, no recognizable keyword in the first row
        let table = TraceTable::try_from_str("1,node01,aa/bb,4321,NFCORE:ALIGN\n")?;

        assert_eq!(
            table.columns(),
            ["task_id", "hostname", "hash", "native_id", "process"]
        );
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.value(&table.rows()[0], "hostname"), Some("node01"));
        Ok(())
    }

    #[test]
    fn overly_wide_headerless_rows_fall_back_to_generic_names() -> anyhow::Result<()> {
        let row = (0..50).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
        let table = TraceTable::try_from_str(&row)?;

        assert_eq!(table.columns().len(), 50);
        assert_eq!(table.columns()[0], "col_0");
        assert_eq!(table.columns()[49], "col_49");
        Ok(())
    }

    #[test]
    fn ragged_rows_are_a_parse_error() {
        let result = TraceTable::try_from_str("task_id,process\n1,ALIGN\n2,SORT,extra\n");
        assert!(matches!(result, Err(AnalysisError::Parse(_))));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let result = TraceTable::from_path(Path::new("./fixtures/does_not_exist.csv"));
        match result {
            Err(AnalysisError::FileNotFound(path)) => {
                assert!(path.contains("does_not_exist.csv"))
            }
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn empty_content_is_a_schema_error() {
        let result = TraceTable::try_from_str("# only a comment\n\n");
        assert!(matches!(result, Err(AnalysisError::Schema(_))));
    }

    #[test]
    fn header_only_file_is_a_schema_error() {
        let result = TraceTable::try_from_str("task_id,process,hostname\n");
        assert!(matches!(result, Err(AnalysisError::Schema(_))));
    }
}
