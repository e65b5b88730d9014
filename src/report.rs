use crate::config::OutputDialect;
use crate::dataset::{HostDataset, ProcessDataset, TraceDataset};
use crate::errors::AnalysisError;
use serde_json::{json, Map, Value};

/// Shapes the aggregates into the final document. Metric fields backed by an
/// absent capability are left out entirely, distinguishing "unavailable"
/// from a measured zero.
pub fn assemble(dataset: &TraceDataset, hardware: &str, dialect: OutputDialect) -> Value {
    let mut doc = Map::new();
    doc.insert("status".to_string(), json!("success"));

    match dialect {
        OutputDialect::Standard => {
            doc.insert("summary".to_string(), standard_summary(dataset, hardware));
            doc.insert(
                "tasks".to_string(),
                Value::Array(
                    dataset
                        .by_process()
                        .iter()
                        .map(|p| standard_task(p, hardware))
                        .collect(),
                ),
            );
            doc.insert(
                "hostData".to_string(),
                host_block(&dataset.by_host(), dataset, false),
            );
            doc.insert("processData".to_string(), process_data(dataset));
        }
        OutputDialect::Legacy => {
            doc.insert("summary".to_string(), legacy_summary(dataset, hardware));
            doc.insert(
                "tasks".to_string(),
                Value::Array(
                    dataset
                        .by_process()
                        .iter()
                        .map(|p| legacy_task(p, hardware))
                        .collect(),
                ),
            );
            doc.insert(
                "powerData".to_string(),
                host_block(&dataset.by_host(), dataset, true),
            );
            doc.insert("processData".to_string(), process_data(dataset));
        }
    }

    Value::Object(doc)
}

/// The uniform failure document: status, message and nothing else.
pub fn failure(error: &AnalysisError) -> Value {
    json!({
        "status": "failed",
        "message": error.to_string(),
    })
}

fn standard_summary(dataset: &TraceDataset, hardware: &str) -> Value {
    let summary = dataset.summary();

    let mut map = Map::new();
    insert_opt(&mut map, "totalEnergy", summary.total_energy_kwh);
    insert_opt(
        &mut map,
        "totalCarbonFootprint",
        summary.total_carbon_g.map(|g| g / 1000.0),
    );
    insert_opt(&mut map, "totalRuntime", summary.total_runtime_min);
    insert_opt(&mut map, "totalMemory", summary.total_memory_gb);
    insert_opt(&mut map, "totalIo", summary.total_io_gb);
    map.insert("totalTasks".to_string(), json!(summary.total_tasks));
    map.insert("hardwareConfig".to_string(), json!(hardware));
    insert_opt(&mut map, "avgCpuUtilization", summary.avg_cpu_pct);
    map.insert("carbonIntensity".to_string(), json!(summary.intensity));
    Value::Object(map)
}

fn legacy_summary(dataset: &TraceDataset, hardware: &str) -> Value {
    let summary = dataset.summary();

    let mut map = Map::new();
    insert_opt(&mut map, "total_energy", summary.total_energy_kwh);
    insert_opt(&mut map, "total_carbon_footprint", summary.total_carbon_g);
    insert_opt(&mut map, "total_runtime", summary.total_runtime_min);
    map.insert("hardware_config".to_string(), json!(hardware));
    map.insert(
        "carbon_intensity_g_kwh".to_string(),
        json!(summary.intensity),
    );
    Value::Object(map)
}

fn standard_task(process: &ProcessDataset, hardware: &str) -> Value {
    let mut map = Map::new();
    map.insert("process".to_string(), json!(process.process));
    map.insert("tasks".to_string(), json!(process.task_count));
    insert_opt(&mut map, "runtime", process.runtime_min);
    insert_opt(&mut map, "cpu_usage", process.cpu_usage_pct);
    insert_opt(&mut map, "memory_allocated", process.memory_gb);
    insert_opt(&mut map, "io_volume", process.io_gb);
    insert_opt(&mut map, "energy_consumption", process.energy_wh);
    insert_opt(&mut map, "carbon_footprint", process.emission_g);
    insert_opt(&mut map, "read_gb", process.read_gb);
    insert_opt(&mut map, "write_gb", process.write_gb);
    map.insert("hardware".to_string(), json!(hardware));
    Value::Object(map)
}

fn legacy_task(process: &ProcessDataset, hardware: &str) -> Value {
    let mut map = Map::new();
    map.insert("task_name".to_string(), json!(process.process));
    insert_opt(&mut map, "energy", process.energy_wh);
    insert_opt(&mut map, "carbon_footprint", process.emission_g);
    insert_opt(&mut map, "runtime", process.runtime_min);
    insert_opt(&mut map, "cpu_usage", process.cpu_usage_pct);
    insert_opt(&mut map, "memory_usage", process.memory_gb);
    map.insert("hardware".to_string(), json!(hardware));
    Value::Object(map)
}

/// Host aggregates as parallel arrays keyed by metric, plus the distinct
/// process names per host. The legacy block only carries consumption.
fn host_block(hosts: &[HostDataset], dataset: &TraceDataset, legacy: bool) -> Value {
    if hosts.is_empty() {
        return json!({});
    }

    let caps = dataset.capabilities();
    let mut map = Map::new();
    map.insert(
        "hosts".to_string(),
        json!(hosts.iter().map(|h| &h.hostname).collect::<Vec<_>>()),
    );

    if legacy {
        if caps.energy() {
            map.insert(
                "consumption".to_string(),
                json!(hosts.iter().map(|h| h.energy_wh).collect::<Vec<_>>()),
            );
        }
    } else {
        map.insert(
            "task_counts".to_string(),
            json!(hosts.iter().map(|h| h.task_count).collect::<Vec<_>>()),
        );
        if caps.duration {
            map.insert(
                "runtimes".to_string(),
                json!(hosts.iter().map(|h| h.runtime_min).collect::<Vec<_>>()),
            );
        }
        if caps.cpu_pct {
            map.insert(
                "cpu_utilizations".to_string(),
                json!(hosts.iter().map(|h| h.cpu_usage_pct).collect::<Vec<_>>()),
            );
        }
        if caps.memory {
            map.insert(
                "memory_allocations".to_string(),
                json!(hosts.iter().map(|h| h.memory_gb).collect::<Vec<_>>()),
            );
        }
        if caps.io() {
            map.insert(
                "io_volumes".to_string(),
                json!(hosts.iter().map(|h| h.io_gb).collect::<Vec<_>>()),
            );
        }
        if caps.energy() {
            map.insert(
                "energy_consumptions".to_string(),
                json!(hosts.iter().map(|h| h.energy_wh).collect::<Vec<_>>()),
            );
            map.insert(
                "carbon_emissions".to_string(),
                json!(hosts.iter().map(|h| h.emission_g).collect::<Vec<_>>()),
            );
        }
    }

    let processes = hosts
        .iter()
        .map(|h| (h.hostname.clone(), json!(h.processes.join(", "))))
        .collect::<Map<_, _>>();
    map.insert("processes".to_string(), Value::Object(processes));

    Value::Object(map)
}

/// Lean per-process records shared by both dialects.
fn process_data(dataset: &TraceDataset) -> Value {
    Value::Array(
        dataset
            .by_process()
            .iter()
            .map(|p| {
                let mut map = Map::new();
                map.insert("process".to_string(), json!(p.process));
                map.insert("tasks".to_string(), json!(p.task_count));
                insert_opt(&mut map, "avgCpu", p.cpu_usage_pct);
                insert_opt(&mut map, "avgMem", p.memory_gb);
                insert_opt(&mut map, "avgDuration", p.avg_duration_min);
                insert_opt(&mut map, "totalIo", p.io_gb);
                insert_opt(&mut map, "readGb", p.read_gb);
                insert_opt(&mut map, "writeGb", p.write_gb);
                Value::Object(map)
            })
            .collect(),
    )
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<f64>) {
    if let Some(value) = value {
        map.insert(key.to_string(), json!(value));
    }
}
