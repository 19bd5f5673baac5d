//! Inline SVG line charts for the HTML report.

use std::fmt::Write;

pub const WIDTH: f64 = 900.0;
const PADDING: f64 = 40.0;

/// One line on a panel. `None` values leave a gap.
pub struct Series<'a> {
    pub label: String,
    pub color: &'a str,
    pub values: Vec<Option<f64>>,
}

/// Triangle marker at bar `index`: up for buys, down for sells.
pub struct Marker {
    pub index: usize,
    pub value: f64,
    pub up: bool,
}

struct Scale {
    min: f64,
    scale_x: f64,
    scale_y: f64,
    height: f64,
}

impl Scale {
    fn new(series: &[Series<'_>], markers: &[Marker], len: usize, height: f64, zero: bool) -> Self {
        let values = series
            .iter()
            .flat_map(|s| s.values.iter().flatten().copied())
            .chain(markers.iter().map(|m| m.value))
            .chain(zero.then_some(0.0));
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let (min, max) = if min.is_finite() { (min, max) } else { (0.0, 1.0) };

        let plot_width = WIDTH - 2.0 * PADDING;
        let plot_height = height - 2.0 * PADDING;
        let range = max - min;
        let scale_y = if range > 0.0 {
            plot_height / range
        } else {
            1.0
        };
        let scale_x = if len > 1 {
            plot_width / (len - 1) as f64
        } else {
            0.0
        };
        Scale {
            min,
            scale_x,
            scale_y,
            height,
        }
    }

    fn x(&self, i: usize) -> f64 {
        PADDING + i as f64 * self.scale_x
    }

    fn y(&self, v: f64) -> f64 {
        self.height - PADDING - (v - self.min) * self.scale_y
    }
}

/// Contiguous runs of defined points, one polyline each.
fn polylines(values: &[Option<f64>], scale: &Scale) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(v) => current.push(format!("{:.1},{:.1}", scale.x(i), scale.y(*v))),
            None if !current.is_empty() => lines.push(std::mem::take(&mut current).join(" ")),
            None => {}
        }
    }
    if !current.is_empty() {
        lines.push(current.join(" "));
    }
    lines
}

pub fn render_panel(
    title: &str,
    series: &[Series<'_>],
    markers: &[Marker],
    zero_line: bool,
    height: f64,
) -> String {
    let len = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    if len == 0 {
        return format!("<p>No data for {title}.</p>");
    }
    let scale = Scale::new(series, markers, len, height, zero_line);

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg class="chart" viewBox="0 0 {WIDTH:.0} {height:.0}" width="{WIDTH:.0}" height="{height:.0}" xmlns="http://www.w3.org/2000/svg">"#
    );
    let _ = write!(
        svg,
        r#"<text x="{PADDING:.0}" y="20" class="title">{}</text>"#,
        escape_html(title)
    );
    let _ = write!(
        svg,
        r##"<line x1="{PADDING:.0}" y1="{PADDING:.0}" x2="{PADDING:.0}" y2="{:.0}" stroke="#888"/>"##,
        height - PADDING
    );

    if zero_line {
        let y = scale.y(0.0);
        let _ = write!(
            svg,
            r##"<line x1="{PADDING:.0}" y1="{y:.1}" x2="{:.0}" y2="{y:.1}" stroke="gray" stroke-dasharray="4 3"/>"##,
            WIDTH - PADDING
        );
    }

    for (n, s) in series.iter().enumerate() {
        for points in polylines(&s.values, &scale) {
            let _ = write!(
                svg,
                r#"<polyline fill="none" stroke="{}" stroke-width="1.2" points="{points}"/>"#,
                s.color
            );
        }
        let _ = write!(
            svg,
            r#"<text x="{:.0}" y="{:.0}" fill="{}" class="legend">{}</text>"#,
            WIDTH - PADDING - 90.0,
            20.0 + 14.0 * n as f64,
            s.color,
            escape_html(&s.label)
        );
    }

    for m in markers {
        let x = scale.x(m.index);
        let y = scale.y(m.value);
        let (points, color) = if m.up {
            (
                format!("{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}", x, y, x - 6.0, y + 10.0, x + 6.0, y + 10.0),
                "#d4a000",
            )
        } else {
            (
                format!("{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}", x, y, x - 6.0, y - 10.0, x + 6.0, y - 10.0),
                "magenta",
            )
        };
        let _ = write!(svg, r#"<polygon class="marker" points="{points}" fill="{color}"/>"#);
    }

    svg.push_str("</svg>");
    svg
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(values: Vec<Option<f64>>) -> Series<'static> {
        Series {
            label: "Close".into(),
            color: "black",
            values,
        }
    }

    #[test]
    fn empty_panel() {
        let out = render_panel("Price", &[], &[], false, 300.0);
        assert_eq!(out, "<p>No data for Price.</p>");
    }

    #[test]
    fn single_series_renders_one_polyline() {
        let out = render_panel(
            "Price",
            &[line(vec![Some(1.0), Some(2.0), Some(3.0)])],
            &[],
            false,
            300.0,
        );
        assert!(out.starts_with("<svg"));
        assert!(out.ends_with("</svg>"));
        assert_eq!(out.matches("<polyline").count(), 1);
        assert!(out.contains(r#"height="300""#));
    }

    #[test]
    fn gaps_split_polylines() {
        let out = render_panel(
            "MA",
            &[line(vec![None, Some(1.0), Some(2.0), None, Some(3.0)])],
            &[],
            false,
            200.0,
        );
        assert_eq!(out.matches("<polyline").count(), 2);
    }

    #[test]
    fn markers_and_zero_line() {
        let out = render_panel(
            "Bias",
            &[line(vec![Some(-1.0), Some(2.0)])],
            &[
                Marker {
                    index: 0,
                    value: -1.0,
                    up: true,
                },
                Marker {
                    index: 1,
                    value: 2.0,
                    up: false,
                },
            ],
            true,
            200.0,
        );
        assert_eq!(out.matches(r#"class="marker""#).count(), 2);
        assert!(out.contains("stroke-dasharray"));
    }

    #[test]
    fn flat_series_does_not_divide_by_zero() {
        let out = render_panel("Flat", &[line(vec![Some(5.0), Some(5.0)])], &[], false, 200.0);
        assert!(!out.contains("NaN"));
        assert!(!out.contains("inf"));
    }

    #[test]
    fn escapes_titles() {
        assert_eq!(escape_html("A&B <x>"), "A&amp;B &lt;x&gt;");
    }
}
