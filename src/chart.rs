use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use plotters::chart::SeriesLabelPosition::UpperLeft;
use plotters::prelude::*;
use tracing;

use crate::error::{Error, Result};
use crate::model::SeriesTable;

static TIME_FORMAT: &str = "%y-%m-%d %H:%M:%S";
static FONT: &str = "sans-serif";

const CAPTION_FONT_SIZE: i32 = 24;
const LABEL_FONT_SIZE: i32 = 14;
const LABEL_AREA_SIZE_LEFT: u32 = 70;
const LABEL_AREA_SIZE_BOTTOM: u32 = 60;

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub path: PathBuf,
    pub size: (u32, u32),
    pub caption: String,
    pub y_label: String,
    pub timezone: Tz,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("history.svg"),
            size: (1280, 720),
            caption: String::new(),
            y_label: "GPU Avg Utilization".into(),
            timezone: chrono_tz::Asia::Shanghai,
        }
    }
}

fn render_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Render {
        reason: e.to_string(),
    }
}

/// Y range covering every value, always including zero, with headroom above
/// the largest value.
fn value_range(table: &SeriesTable) -> (f64, f64) {
    let low = table.min_value().unwrap_or(0.0).min(0.0);
    let high = table.max_value().unwrap_or(0.0).max(0.0);
    (low, (high + high.abs() * 0.1).max(low + 1.0))
}

/// Draws one line per host column into an SVG file.
pub fn render(table: &SeriesTable, opts: &ChartOptions) -> Result<()> {
    let (start, mut end) = match (table.timestamps().first(), table.timestamps().last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(Error::EmptyDataset),
    };
    if end <= start {
        end = start + Duration::minutes(1);
    }

    let (low, high) = value_range(table);

    let root = SVGBackend::new(&opts.path, opts.size).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, LABEL_AREA_SIZE_LEFT)
        .set_label_area_size(LabelAreaPosition::Bottom, LABEL_AREA_SIZE_BOTTOM)
        .caption(&opts.caption, (FONT, CAPTION_FONT_SIZE))
        .build_cartesian_2d(start..end, low..high)
        .map_err(render_error)?;

    let tz = opts.timezone;
    chart
        .configure_mesh()
        .x_labels(6)
        .x_label_formatter(&|x: &DateTime<Utc>| x.with_timezone(&tz).format(TIME_FORMAT).to_string())
        .x_desc("Time")
        .y_desc(opts.y_label.as_str())
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()
        .map_err(render_error)?;

    for (idx, column) in table.columns().iter().enumerate() {
        let style = Palette99::pick(idx).stroke_width(2);
        let points: Vec<(DateTime<Utc>, f64)> = table
            .timestamps()
            .iter()
            .zip(&column.values)
            .filter_map(|(ts, value)| value.map(|v| (*ts, v)))
            .collect();

        chart
            .draw_series(LineSeries::new(points, style))
            .map_err(render_error)?
            .label(column.host.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .label_font((FONT, LABEL_FONT_SIZE))
        .position(UpperLeft)
        .draw()
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    tracing::info!(
        "wrote chart with {} series to {}",
        table.columns().len(),
        opts.path.display()
    );
    Ok(())
}
