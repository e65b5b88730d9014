use crate::config::PowerModel;
use crate::normalize::{Capabilities, NormalizedRow};
use serde::Serialize;
use tracing::debug;

/// A normalized row plus its derived power, energy and emission figures.
/// Fields are `None` when the dataset lacks the inputs to derive them.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedRow {
    #[serde(flatten)]
    pub row: NormalizedRow,
    pub cpu_power_w: Option<f64>,
    pub io_power_w: Option<f64>,
    pub base_power_w: f64,
    pub total_power_w: f64,
    pub energy_wh: Option<f64>,
    pub emission_g: Option<f64>,
}

/// Applies the analytic power model to every row.
///
/// CPU power is `cpus × watts-per-core × (%cpu / 100)`, I/O power is
/// `total io GB × watts-per-gb`, and the base draw is unconditional. A term
/// whose inputs the dataset lacks is excluded from the total rather than
/// zero-filled. Energy needs a wall time; emission needs energy.
pub fn estimate(
    rows: Vec<NormalizedRow>,
    caps: &Capabilities,
    model: &PowerModel,
    intensity: f64,
) -> Vec<DerivedRow> {
    let derived = rows
        .into_iter()
        .map(|row| estimate_row(row, caps, model, intensity))
        .collect::<Vec<_>>();

    debug!("derived energy for {} rows", derived.len());
    derived
}

fn estimate_row(
    row: NormalizedRow,
    caps: &Capabilities,
    model: &PowerModel,
    intensity: f64,
) -> DerivedRow {
    let cpu_power_w = if caps.cpu_power() {
        let cpus = row.cpus.unwrap_or(0.0);
        let pct = row.cpu_pct.unwrap_or(0.0);
        Some(cpus * model.cpu_watts_per_core * (pct / 100.0))
    } else {
        None
    };

    let io_power_w = row.total_io_gb.map(|io| io * model.io_watts_per_gb);

    let total_power_w =
        model.base_watts + cpu_power_w.unwrap_or(0.0) + io_power_w.unwrap_or(0.0);

    let energy_wh = caps
        .energy()
        .then(|| total_power_w * row.wall_time_hours().unwrap_or(0.0));

    let emission_g = energy_wh.map(|wh| (wh / 1000.0) * intensity);

    DerivedRow {
        row,
        cpu_power_w,
        io_power_w,
        base_power_w: model.base_watts,
        total_power_w,
        energy_wh,
        emission_g,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceDialect;
    use crate::normalize::normalize;
    use crate::trace::TraceTable;

    fn derive(content: &str) -> anyhow::Result<(Vec<DerivedRow>, Capabilities)> {
        let table = TraceTable::try_from_str(content)?;
        let (rows, caps) = normalize(&table, &TraceDialect::default());
        let derived = estimate(rows, &caps, &PowerModel::default(), 475.0);
        Ok((derived, caps))
    }

    #[test]
    fn full_row_includes_every_power_term() -> anyhow::Result<()> {
        // 2 cpus at 50%, 1 GB of I/O, one hour of wall time
        let (rows, _) = derive(
            "task_id,cpus,%cpu,realtime,read_bytes,write_bytes\n\
             1,2,50,3600000,536870912,536870912\n",
        )?;

        let row = &rows[0];
        assert_eq!(row.cpu_power_w, Some(200.0));
        assert_eq!(row.io_power_w, Some(5.0));
        assert_eq!(row.base_power_w, 50.0);
        assert_eq!(row.total_power_w, 255.0);
        assert_eq!(row.energy_wh, Some(255.0));
        assert_eq!(row.emission_g, Some(0.255 * 475.0));
        Ok(())
    }

    #[test]
    fn missing_io_columns_drop_the_io_term() -> anyhow::Result<()> {
        let (rows, _) = derive("task_id,cpus,%cpu,realtime\n1,2,50,3600000\n")?;

        let row = &rows[0];
        assert_eq!(row.io_power_w, None);
        assert_eq!(row.total_power_w, 250.0);
        assert_eq!(row.energy_wh, Some(250.0));
        Ok(())
    }

    #[test]
    fn missing_cpu_columns_leave_base_power_only() -> anyhow::Result<()> {
        let (rows, _) = derive("task_id,realtime\n1,1800000\n")?;

        let row = &rows[0];
        assert_eq!(row.cpu_power_w, None);
        assert_eq!(row.io_power_w, None);
        assert_eq!(row.total_power_w, 50.0);
        assert_eq!(row.energy_wh, Some(25.0));
        Ok(())
    }

    #[test]
    fn no_wall_time_means_no_energy_or_emission() -> anyhow::Result<()> {
        let (rows, caps) = derive("task_id,cpus,%cpu\n1,2,50\n")?;

        assert!(!caps.energy());
        assert_eq!(rows[0].energy_wh, None);
        assert_eq!(rows[0].emission_g, None);
        Ok(())
    }

    #[test]
    fn duration_backs_up_a_missing_realtime() -> anyhow::Result<()> {
        let (rows, _) = derive("task_id,duration\n1,3600000\n")?;

        assert_eq!(rows[0].energy_wh, Some(50.0));
        Ok(())
    }

    #[test]
    fn derived_values_are_finite_and_non_negative() -> anyhow::Result<()> {
        let (rows, _) = derive(
            "task_id,cpus,%cpu,realtime,read_bytes,write_bytes\n\
             1,junk,-40,oops,1073741824,bad\n",
        )?;

        let row = &rows[0];
        assert!(row.total_power_w.is_finite() && row.total_power_w >= 0.0);
        let energy = row.energy_wh.unwrap();
        assert!(energy.is_finite() && energy >= 0.0);
        let emission = row.emission_g.unwrap();
        assert!(emission.is_finite() && emission >= 0.0);
        Ok(())
    }
}
