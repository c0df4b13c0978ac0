use crate::spreadsheet::RowSet;
use chrono::NaiveDate;
use serde::Serialize;

/// Configuration options for chart rendering
///
/// Only affects how a [`LineChart`] is drawn, never which points it holds.
#[cfg(feature = "web")]
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,

    /// Font size of the caption
    pub caption_size: u32,
}

#[cfg(feature = "web")]
impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            width: 900,
            height: 450,
            caption_size: 24,
        }
    }
}

/// One plotted observation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Single-series line chart of `value` over `date`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ChartPoint>,
}

impl LineChart {
    /// Builds the chart for a filtered result
    ///
    /// The title names the active category, or "All Tests" when none is
    /// selected. Points are ordered by date (ties keep row order) and rows
    /// without a value are left out.
    ///
    /// # Returns
    /// * `None` when the result is empty, so no chart is shown
    pub fn from_rows(rows: &RowSet, test_type: Option<&str>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        let mut points: Vec<ChartPoint> = rows
            .records()
            .iter()
            .filter_map(|r| r.value.map(|value| ChartPoint { date: r.date, value }))
            .collect();
        points.sort_by_key(|p| p.date);

        Some(LineChart {
            title: format!("{} over Time", test_type.unwrap_or("All Tests")),
            x_label: "date".to_string(),
            y_label: "value".to_string(),
            points,
        })
    }

    /// Renders the chart as an inline SVG document
    ///
    /// Dates are plotted as day numbers and labelled back as `YYYY-MM-DD`.
    /// Degenerate ranges (a single day, a flat series) are padded so the
    /// axes always have extent.
    ///
    /// # Arguments
    /// * `options` - Size and font settings
    ///
    /// # Returns
    /// * A Result containing the SVG markup or a drawing error
    #[cfg(feature = "web")]
    pub fn render_svg(&self, options: &GraphOptions) -> Result<String, Box<dyn std::error::Error>> {
        use chrono::Datelike;
        use plotters::prelude::*;

        let data: Vec<(i32, f64)> = self
            .points
            .iter()
            .map(|p| (p.date.num_days_from_ce(), p.value))
            .collect();

        let (x_range, y_range) = axis_ranges(&data);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
                .into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(&self.title, ("sans-serif", options.caption_size).into_font())
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x_range, y_range)?;

            chart
                .configure_mesh()
                .x_desc(&self.x_label)
                .y_desc(&self.y_label)
                .x_labels(6)
                .x_label_formatter(&|day| day_label(*day))
                .y_label_formatter(&|v| format!("{:.2}", v))
                .draw()?;

            chart.draw_series(LineSeries::new(data.iter().copied(), &BLUE))?;
            chart.draw_series(
                data.iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
            )?;

            root.present()?;
        }

        Ok(svg)
    }
}

#[cfg(feature = "web")]
fn axis_ranges(data: &[(i32, f64)]) -> (std::ops::Range<i32>, std::ops::Range<f64>) {
    let min_x = data.iter().map(|(x, _)| *x).min().unwrap_or(0);
    let max_x = data.iter().map(|(x, _)| *x).max().unwrap_or(1);
    let min_y = data.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let max_y = data.iter().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max);

    let x_range = if min_x == max_x {
        (min_x - 1)..(max_x + 1)
    } else {
        min_x..max_x
    };

    let y_range = if !min_y.is_finite() || !max_y.is_finite() {
        0.0..1.0
    } else if min_y == max_y {
        (min_y - 1.0)..(max_y + 1.0)
    } else {
        let pad = (max_y - min_y) * 0.05;
        (min_y - pad)..(max_y + pad)
    };

    (x_range, y_range)
}

#[cfg(feature = "web")]
fn day_label(day: i32) -> String {
    NaiveDate::from_num_days_from_ce_opt(day)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
