//! Year-count bar chart rendered as SVG.
//!
//! Every year between the earliest and latest publication gets a bar, so gaps
//! show up as zero-height slots. Rows without a year are not plotted.

use crate::error::{Result, ScholarError};
use crate::table::YearCounts;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 100.0;
const BAR_FILL: &str = "blue";
const MAX_TICKS: usize = 8;

/// Axis labels
pub const X_LABEL: &str = "Year";
pub const Y_LABEL: &str = "Count of Papers Published Per Year";

/// Render the counts as an SVG document.
pub fn render_year_counts_svg(counts: &YearCounts) -> Result<String> {
    let bars = counts.dense();
    if bars.is_empty() {
        return Err(ScholarError::Validation(
            "no publications with a known year to plot".to_string(),
        ));
    }

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_h;

    let max_count = bars.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let step = tick_step(max_count);
    let y_max = (max_count.div_ceil(step) * step).max(step) as f64;
    let slot = plot_w / bars.len() as f64;
    let bar_w = slot * 0.9;

    let mut svg = String::new();
    // fmt::Write into a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

    for (i, (year, count)) in bars.iter().enumerate() {
        let x = MARGIN_LEFT + i as f64 * slot + (slot - bar_w) / 2.0;
        let bar_h = *count as f64 / y_max * plot_h;
        let _ = writeln!(
            svg,
            r#"<rect class="bar" data-year="{year}" data-count="{count}" x="{x:.2}" y="{y:.2}" width="{bar_w:.2}" height="{bar_h:.2}" fill="{BAR_FILL}"/>"#,
            y = baseline - bar_h,
        );

        let label_x = MARGIN_LEFT + (i as f64 + 0.5) * slot;
        let label_y = baseline + 8.0;
        let _ = writeln!(
            svg,
            r#"<text x="{label_x:.2}" y="{label_y:.2}" font-size="11" text-anchor="end" dominant-baseline="middle" transform="rotate(-90 {label_x:.2} {label_y:.2})">{year}</text>"#,
        );
    }

    let mut tick = 0;
    while tick as f64 <= y_max {
        let y = baseline - tick as f64 / y_max * plot_h;
        let _ = writeln!(
            svg,
            r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{MARGIN_LEFT:.2}" y2="{y:.2}" stroke="black"/>"#,
            x1 = MARGIN_LEFT - 5.0,
        );
        let _ = writeln!(
            svg,
            r#"<text x="{x:.2}" y="{y:.2}" font-size="11" text-anchor="end" dominant-baseline="middle">{tick}</text>"#,
            x = MARGIN_LEFT - 8.0,
        );
        tick += step;
    }

    // classic theme: axis lines only, no grid
    let _ = writeln!(
        svg,
        r#"<line x1="{MARGIN_LEFT:.2}" y1="{MARGIN_TOP:.2}" x2="{MARGIN_LEFT:.2}" y2="{baseline:.2}" stroke="black"/>"#,
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{MARGIN_LEFT:.2}" y1="{baseline:.2}" x2="{x2:.2}" y2="{baseline:.2}" stroke="black"/>"#,
        x2 = WIDTH - MARGIN_RIGHT,
    );

    let _ = writeln!(
        svg,
        r#"<text x="{x:.2}" y="{y:.2}" font-size="14" text-anchor="middle">{X_LABEL}</text>"#,
        x = MARGIN_LEFT + plot_w / 2.0,
        y = HEIGHT - 15.0,
    );
    let y_label_y = MARGIN_TOP + plot_h / 2.0;
    let _ = writeln!(
        svg,
        r#"<text x="25" y="{y_label_y:.2}" font-size="14" text-anchor="middle" transform="rotate(-90 25 {y_label_y:.2})">{Y_LABEL}</text>"#,
    );
    svg.push_str("</svg>\n");

    Ok(svg)
}

/// Render and write the chart to `path`.
pub fn save_year_counts_plot(counts: &YearCounts, path: &Path) -> Result<()> {
    let svg = render_year_counts_svg(counts)?;
    std::fs::write(path, svg)?;
    info!(path = %path.display(), "Saved plot");
    Ok(())
}

/// Smallest 1/2/5 x 10^k step giving at most `MAX_TICKS` intervals.
fn tick_step(max: usize) -> usize {
    let mut magnitude = 1;
    loop {
        for factor in [1, 2, 5] {
            let step = factor * magnitude;
            if max.div_ceil(step) <= MAX_TICKS {
                return step;
            }
        }
        magnitude *= 10;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Publication;
    use tempfile::tempdir;

    fn counts(years: &[Option<i32>]) -> YearCounts {
        let publications: Vec<Publication> = years
            .iter()
            .enumerate()
            .map(|(i, y)| Publication::new(format!("Paper {}", i), *y))
            .collect();
        YearCounts::from_publications(&publications)
    }

    #[test]
    fn test_fills_missing_years() {
        let svg = render_year_counts_svg(&counts(&[Some(2018), Some(2021), Some(2021), None]))
            .expect("render");

        assert_eq!(svg.matches(r#"class="bar""#).count(), 4);
        assert!(svg.contains(r#"data-year="2019" data-count="0""#));
        assert!(svg.contains(r#"data-year="2020" data-count="0""#));
        assert!(svg.contains(r#"data-year="2021" data-count="2""#));
        assert!(svg.contains(Y_LABEL));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_out_of_range_year_does_not_widen_axis() {
        let svg = render_year_counts_svg(&counts(&[Some(2020), Some(99999), Some(5), Some(i32::MAX)]))
            .expect("render");

        assert_eq!(svg.matches(r#"class="bar""#).count(), 1);
        assert!(svg.contains(r#"data-year="2020" data-count="1""#));
    }

    #[test]
    fn test_unknown_only_is_rejected() {
        let err = render_year_counts_svg(&counts(&[None, None])).expect_err("should fail");
        assert!(matches!(err, ScholarError::Validation(_)));
    }

    #[test]
    fn test_tick_step() {
        assert_eq!(tick_step(0), 1);
        assert_eq!(tick_step(8), 1);
        assert_eq!(tick_step(9), 2);
        assert_eq!(tick_step(37), 5);
        assert_eq!(tick_step(950), 200);
    }

    #[test]
    fn test_save_plot() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("plot.svg");
        save_year_counts_plot(&counts(&[Some(2020)]), &path)?;
        assert!(std::fs::read_to_string(&path)?.starts_with("<svg"));
        Ok(())
    }
}
