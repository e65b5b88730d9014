use crate::config::Intensity;
use chrono::{DateTime, Local, Timelike};
use tracing::info;

/// Resolves the carbon intensity (gCO2eq/kWh) for this invocation. The
/// time-of-day policy buckets the local clock once and the figure is applied
/// run-wide, so a single report never mixes intensities.
pub fn resolve(policy: &Intensity, now: DateTime<Local>) -> f64 {
    let ci = resolve_at(policy, now.hour());
    info!("carbon intensity resolved to {} gCO2eq/kWh", ci);
    ci
}

fn resolve_at(policy: &Intensity, hour: u32) -> f64 {
    match policy {
        Intensity::Constant { gco2_per_kwh } => *gco2_per_kwh,
        Intensity::TimeOfDay { peak, day, night } => match hour {
            // morning and evening grid peaks
            7..=9 | 17..=19 => *peak,
            22..=23 | 0..=5 => *night,
            _ => *day,
        },
    }
}
