use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, io::Read};

// ******** ******** ********
// **    CONFIGURATION     **
// ******** ******** ********
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub model: PowerModel,
    pub intensity: Intensity,
    pub trace: TraceDialect,
    pub output: Output,
}
impl Config {
    pub fn try_from_path(path: &std::path::Path) -> anyhow::Result<Config> {
        let mut config_str = String::new();
        fs::File::open(path)
            .context(format!("Unable to read config file {}", path.display()))?
            .read_to_string(&mut config_str)?;
        Config::try_from_str(&config_str)
    }

    pub fn try_from_str(conf_str: &str) -> anyhow::Result<Config> {
        toml::from_str::<Config>(conf_str).map_err(|e| anyhow::anyhow!("TOML parsing error: {}", e))
    }
}

/// Constants of the analytic power model: watts per fully-utilized CPU,
/// watts per GB of I/O moved and a base draw for everything else.
#[derive(Debug, Deserialize, PartialEq, Serialize, Clone)]
#[serde(default)]
pub struct PowerModel {
    pub cpu_watts_per_core: f64,
    pub io_watts_per_gb: f64,
    pub base_watts: f64,
}
impl Default for PowerModel {
    fn default() -> Self {
        PowerModel {
            cpu_watts_per_core: 200.0,
            io_watts_per_gb: 5.0,
            base_watts: 50.0,
        }
    }
}

/// Carbon intensity policy. Either a flat figure or a time-of-day bucketed
/// heuristic resolved once per invocation.
#[derive(Debug, Deserialize, PartialEq, Serialize, Clone)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum Intensity {
    Constant {
        #[serde(default = "default_constant_ci")]
        gco2_per_kwh: f64,
    },
    TimeOfDay {
        #[serde(default = "default_peak_ci")]
        peak: f64,
        #[serde(default = "default_day_ci")]
        day: f64,
        #[serde(default = "default_night_ci")]
        night: f64,
    },
}
impl Default for Intensity {
    fn default() -> Self {
        Intensity::Constant {
            gco2_per_kwh: default_constant_ci(),
        }
    }
}

// Average global carbon intensity of electricity, gCO2eq/kWh.
fn default_constant_ci() -> f64 {
    475.0
}
fn default_peak_ci() -> f64 {
    450.0
}
fn default_day_ci() -> f64 {
    350.0
}
fn default_night_ci() -> f64 {
    250.0
}

/// Source units of the trace file. Nextflow raw traces report times in
/// milliseconds and sizes in bytes; older exports use seconds and megabytes.
#[derive(Debug, Deserialize, PartialEq, Serialize, Clone)]
#[serde(default)]
pub struct TraceDialect {
    pub time_unit: TimeUnit,
    pub memory_unit: MemoryUnit,
}
impl Default for TraceDialect {
    fn default() -> Self {
        TraceDialect {
            time_unit: TimeUnit::Milliseconds,
            memory_unit: MemoryUnit::Bytes,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Serialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}
impl TimeUnit {
    pub fn per_minute(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 60.0,
            TimeUnit::Milliseconds => 60_000.0,
        }
    }

    pub fn per_hour(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 3_600.0,
            TimeUnit::Milliseconds => 3_600_000.0,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Serialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum MemoryUnit {
    Bytes,
    Megabytes,
}
impl MemoryUnit {
    pub fn per_gb(&self) -> f64 {
        match self {
            MemoryUnit::Bytes => 1024.0 * 1024.0 * 1024.0,
            MemoryUnit::Megabytes => 1024.0,
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq, Serialize, Clone)]
#[serde(default)]
pub struct Output {
    pub dialect: OutputDialect,
}

/// Field naming of the emitted report. `Standard` is the camelCase shape,
/// `Legacy` keeps the snake_case summary and `powerData` block of the older
/// exporter.
#[derive(Debug, Default, Deserialize, PartialEq, Serialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OutputDialect {
    #[default]
    Standard,
    Legacy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn empty_config_uses_defaults() -> anyhow::Result<()> {
        let cfg = Config::try_from_str("")?;
        assert_eq!(cfg.model.cpu_watts_per_core, 200.0);
        assert_eq!(cfg.model.io_watts_per_gb, 5.0);
        assert_eq!(cfg.model.base_watts, 50.0);
        assert_eq!(
            cfg.intensity,
            Intensity::Constant {
                gco2_per_kwh: 475.0
            }
        );
        assert_eq!(cfg.trace.time_unit, TimeUnit::Milliseconds);
        assert_eq!(cfg.trace.memory_unit, MemoryUnit::Bytes);
        assert_eq!(cfg.output.dialect, OutputDialect::Standard);
        Ok(())
    }

    #[test]
    fn can_load_config_file() -> anyhow::Result<()> {
        let cfg = Config::try_from_path(Path::new("./fixtures/carbontrace.success.toml"))?;
        assert_eq!(cfg.model.cpu_watts_per_core, 180.0);
        assert_eq!(
            cfg.intensity,
            Intensity::TimeOfDay {
                peak: 500.0,
                day: 360.0,
                night: 240.0,
            }
        );
        assert_eq!(cfg.trace.time_unit, TimeUnit::Seconds);
        assert_eq!(cfg.trace.memory_unit, MemoryUnit::Megabytes);
        assert_eq!(cfg.output.dialect, OutputDialect::Legacy);
        Ok(())
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() -> anyhow::Result<()> {
        let cfg = Config::try_from_str(
            r#"
            [intensity]
            policy = "timeofday"

            [trace]
            time_unit = "seconds"
            "#,
        )?;
        assert_eq!(
            cfg.intensity,
            Intensity::TimeOfDay {
                peak: 450.0,
                day: 350.0,
                night: 250.0,
            }
        );
        assert_eq!(cfg.trace.time_unit, TimeUnit::Seconds);
        assert_eq!(cfg.trace.memory_unit, MemoryUnit::Bytes);
        Ok(())
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let cfg = Config::try_from_str("[model\ncpu_watts_per_core = nope");
        assert!(cfg.is_err());
    }

    #[test]
    fn unit_factors() {
        assert_eq!(TimeUnit::Seconds.per_minute(), 60.0);
        assert_eq!(TimeUnit::Milliseconds.per_minute(), 60_000.0);
        assert_eq!(TimeUnit::Milliseconds.per_hour(), 3_600_000.0);
        assert_eq!(MemoryUnit::Megabytes.per_gb(), 1024.0);
    }
}
