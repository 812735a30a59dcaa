//! PNG rendering of sweep steps: prey over time stacked above predator over time.

use crate::config::PlotSettings;
use crate::naming::{artifact_path, SaveTarget};
use lotka_core::error::SinkError;
use lotka_core::sweep::{PREDATOR_LABEL, PREY_LABEL, TIME_LABEL};
use lotka_core::{SweepOutput, TrajectorySink};
use plotters::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct PngRenderer {
    target: SaveTarget,
    alphas: Vec<f64>,
    settings: PlotSettings,
    written: Vec<PathBuf>,
}

impl PngRenderer {
    pub fn new(target: SaveTarget, alphas: Vec<f64>, settings: PlotSettings) -> Self {
        Self {
            target,
            alphas,
            settings,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl TrajectorySink for PngRenderer {
    fn accept(&mut self, output: SweepOutput) -> Result<(), SinkError> {
        let path = artifact_path(
            &self.settings.out_dir,
            &self.target,
            &self.alphas,
            output.index,
        );
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        draw_figure(&path, &output, &self.settings)
            .map_err(|err| SinkError::from(format!("failed to render {}: {err}", path.display())))?;
        info!(alpha = output.alpha, path = %path.display(), "figure saved");
        self.written.push(path);
        Ok(())
    }
}

fn draw_figure(path: &Path, output: &SweepOutput, settings: &PlotSettings) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&output.title(), ("sans-serif", 28.0).into_font())?;
    let panels = root.split_evenly((2, 1));

    let times = output.solution.grid.points();
    let trajectory = &output.solution.trajectory;
    for (panel, (index, label, color)) in panels
        .iter()
        .zip([(0, PREY_LABEL, BLUE), (1, PREDATOR_LABEL, RED)])
    {
        let series = trajectory.component(index);
        draw_panel(panel, times, &series, label, color)?;
    }

    root.present()?;
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    times: &[f64],
    values: &[f64],
    label: &str,
    color: RGBColor,
) -> Result<(), Box<dyn Error>>
where
    <DB as DrawingBackend>::ErrorType: 'static,
{
    let t_min = times.first().copied().unwrap_or(0.0);
    let t_max = times.last().copied().unwrap_or(1.0);
    let (y_min, y_max) = padded_range(values);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(t_min..t_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(TIME_LABEL)
        .y_desc(label)
        .draw()?;

    chart.draw_series(LineSeries::new(
        times.iter().zip(values).map(|(t, v)| (*t, *v)),
        color.stroke_width(2),
    ))?;
    Ok(())
}

/// Data range with 10% headroom; flat or non-finite series get a unit band.
fn padded_range(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span <= f64::EPSILON * hi.abs().max(1.0) {
        return (lo - 0.5, hi + 0.5);
    }
    (lo - 0.1 * span, hi + 0.1 * span)
}
