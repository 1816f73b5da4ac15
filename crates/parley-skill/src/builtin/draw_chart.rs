// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SVG line chart rendering.
//!
//! Produces a fixed-size chart with a "nice" Y scale and X labels thinned
//! to a minimum spacing, rotated when dense.

use async_trait::async_trait;
use parley_core::ParleyError;
use serde::Deserialize;
use serde_json::Value;

use crate::tool::Tool;

const WIDTH: f64 = 500.0;
const HEIGHT: f64 = 350.0;
const TOP_PADDING: f64 = 20.0;
const BOTTOM_PADDING: f64 = 60.0;
const LEFT_PADDING: f64 = 60.0;
const RIGHT_PADDING: f64 = 20.0;
const MAX_Y_TICKS: f64 = 10.0;
const NICE_STEPS: [f64; 4] = [1.0, 2.0, 5.0, 10.0];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    pub x_axis: String,
    pub y_axis: String,
    pub data: Vec<f64>,
    pub labels: Vec<String>,
}

pub struct DrawChartTool;

#[async_trait]
impl Tool for DrawChartTool {
    fn name(&self) -> &str {
        "drawChart"
    }

    fn description(&self) -> &str {
        "draw graph using svg"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "xAxis": { "type": "string", "description": "X axis label" },
                "yAxis": { "type": "string", "description": "Y axis label" },
                "data": {
                    "type": "array",
                    "description": "data values",
                    "items": { "type": "number" }
                },
                "labels": {
                    "type": "array",
                    "description": "Array of labels for each data point on the X axis (must match the length of data)",
                    "items": { "type": "string" }
                }
            },
            "required": ["xAxis", "yAxis", "data", "labels"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, input: Value) -> Result<Value, ParleyError> {
        let request: ChartRequest = serde_json::from_value(input).map_err(|e| ParleyError::Tool {
            message: format!("invalid chart request: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(Value::String(render_chart(&request)?))
    }
}

/// Renders the chart. Needs at least two points and one label per point.
pub fn render_chart(request: &ChartRequest) -> Result<String, ParleyError> {
    let data = &request.data;
    if data.len() < 2 {
        return Err(ParleyError::tool("drawChart needs at least 2 data points"));
    }
    if request.labels.len() != data.len() {
        return Err(ParleyError::tool(format!(
            "drawChart got {} labels for {} data points",
            request.labels.len(),
            data.len()
        )));
    }

    let font_size = (HEIGHT / 30.0).min(10.0);
    let chart_width = WIDTH - (LEFT_PADDING + RIGHT_PADDING);
    let chart_height = HEIGHT - (TOP_PADDING + BOTTOM_PADDING);

    let max_value = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_value = data.iter().copied().fold(f64::INFINITY, f64::min);
    let range = if max_value - min_value == 0.0 {
        1.0
    } else {
        max_value - min_value
    };
    let y_of = |value: f64| HEIGHT - BOTTOM_PADDING - ((value - min_value) / range) * chart_height;

    let point_spacing = chart_width / (data.len() - 1) as f64;
    let min_label_spacing = (chart_width / 20.0).min(25.0);
    let x_label_step = ((min_label_spacing / point_spacing).ceil() as usize).max(1);
    let rotate = x_label_step < 3;

    let points = data
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{},{}", LEFT_PADDING + i as f64 * point_spacing, y_of(*v)))
        .collect::<Vec<_>>()
        .join(" ");

    let mut x_ticks = Vec::new();
    for (i, label) in request.labels.iter().enumerate() {
        if i % x_label_step != 0 {
            continue;
        }
        let x = LEFT_PADDING + i as f64 * point_spacing + (HEIGHT / 60.0).min(5.0);
        let y = HEIGHT - BOTTOM_PADDING + font_size / 2.0;
        let label = escape_xml(label);
        x_ticks.push(if rotate {
            format!(
                r#"<text x="{x}" y="{y}" text-anchor="end" font-size="{font_size}" transform="rotate(-45, {x}, {y}) translate({font_size}, -{half})">{label}</text>"#,
                half = font_size / 2.0
            )
        } else {
            format!(r#"<text x="{x}" y="{y}" text-anchor="middle" font-size="{font_size}">{label}</text>"#)
        });
    }

    let y_ticks = y_tick_values(min_value, max_value, range)
        .into_iter()
        .map(|value| {
            format!(
                r#"<text x="{}" y="{}" text-anchor="end" font-size="{font_size}">{value:.1}</text>"#,
                LEFT_PADDING - font_size,
                y_of(value) + font_size / 2.0
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut circles = String::new();
    for (i, value) in data.iter().enumerate() {
        circles.push_str(&format!(
            r#"<circle cx="{}" cy="{}" r="3" fill="steelblue" data-value="{value}" />"#,
            LEFT_PADDING + i as f64 * point_spacing,
            y_of(*value)
        ));
    }

    let baseline = HEIGHT - BOTTOM_PADDING;
    let lines = [
        format!(r#"<svg width="{WIDTH}" height="{HEIGHT}" xmlns="http://www.w3.org/2000/svg">"#),
        r#"<rect width="100%" height="100%" fill="white" />"#.to_string(),
        "<g>".to_string(),
        format!(
            r#"<line x1="{LEFT_PADDING}" y1="{baseline}" x2="{}" y2="{baseline}" stroke="black" />"#,
            WIDTH - RIGHT_PADDING
        ),
        format!(
            r#"<line x1="{LEFT_PADDING}" y1="{TOP_PADDING}" x2="{LEFT_PADDING}" y2="{baseline}" stroke="black" />"#
        ),
        format!(
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            WIDTH / 2.0,
            HEIGHT - 5.0,
            escape_xml(&request.x_axis)
        ),
        format!(
            r#"<text x="15" y="{mid}" text-anchor="middle" dominant-baseline="middle" transform="rotate(-90, 15, {mid})">{}</text>"#,
            escape_xml(&request.y_axis),
            mid = HEIGHT / 2.0
        ),
        x_ticks.join("\n"),
        y_ticks,
        format!(r#"<polyline fill="none" stroke="steelblue" stroke-width="2" points="{points}" />"#),
        circles,
    ];
    let mut svg = String::new();
    for line in &lines {
        svg.push_str(line);
        svg.push('\n');
    }
    svg.push_str("</g>\n</svg>");
    Ok(svg)
}

/// Tick values from the floor to the ceiling of the data range, spaced by
/// the smallest nice step that yields at most ten intervals.
fn y_tick_values(min_value: f64, max_value: f64, range: f64) -> Vec<f64> {
    let rough_step = range / MAX_Y_TICKS;
    let pow10 = 10f64.powf(rough_step.log10().floor());
    let step = NICE_STEPS
        .iter()
        .map(|s| s * pow10)
        .find(|s| *s >= rough_step)
        .unwrap_or(10.0 * pow10);

    let start = (min_value / step).floor() * step;
    let end = (max_value / step).ceil() * step;
    let intervals = ((end - start) / step).round();
    if !intervals.is_finite() || intervals < 0.0 {
        return Vec::new();
    }
    // floor/ceil add at most one interval on each side
    let intervals = intervals.min(MAX_Y_TICKS + 2.0) as usize;
    (0..=intervals).map(|k| start + k as f64 * step).collect()
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(data: Vec<f64>, labels: &[&str]) -> ChartRequest {
        ChartRequest {
            x_axis: "Month".into(),
            y_axis: "Sales".into(),
            data,
            labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn renders_polyline_and_one_circle_per_point() {
        let svg = render_chart(&request(vec![1.0, 3.0, 2.0], &["Jan", "Feb", "Mar"])).unwrap();
        assert!(svg.starts_with(r#"<svg width="500" height="350""#));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(r#"points="60,290 270,20 480,155""#), "{svg}");
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains(r#"data-value="3""#));
        assert!(svg.contains(">Month</text>"));
        assert!(svg.contains(">Sales</text>"));
    }

    #[test]
    fn y_ticks_use_nice_steps() {
        // range 70 -> rough step 7 -> step 10
        let ticks = y_tick_values(15.0, 85.0, 70.0);
        assert_eq!(ticks, vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0]);

        // range 100 -> rough step 10 -> step 10
        let ticks = y_tick_values(0.0, 100.0, 100.0);
        assert_eq!(ticks.len(), 11);
        assert_eq!(ticks[10], 100.0);
    }

    #[test]
    fn y_ticks_stay_bounded_at_large_magnitudes() {
        // a 0.2 step is below the spacing of f64 values near 1e16
        let ticks = y_tick_values(1e16, 1e16 + 2.0, 2.0);
        assert!(!ticks.is_empty());
        assert!(ticks.len() <= MAX_Y_TICKS as usize + 3);

        let svg = render_chart(&request(vec![1e16, 1e16 + 2.0], &["a", "b"])).unwrap();
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn overflowing_range_yields_no_y_ticks() {
        let ticks = y_tick_values(-1e308, 1e308, f64::INFINITY);
        assert!(ticks.is_empty());
    }

    #[test]
    fn few_points_label_every_point_rotated() {
        let svg = render_chart(&request(vec![1.0, 2.0], &["a", "b"])).unwrap();
        assert!(svg.contains("rotate(-45"));
        assert!(svg.contains(">a</text>"));
        assert!(svg.contains(">b</text>"));
    }

    #[test]
    fn dense_labels_are_thinned() {
        let data: Vec<f64> = (0..30).map(f64::from).collect();
        let labels: Vec<String> = (0..30).map(|i| format!("d{i}")).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let svg = render_chart(&request(data, &refs)).unwrap();
        // 420/29 spacing, 21 min spacing -> every 2nd label
        assert!(svg.contains("rotate(-45"));
        assert!(svg.contains(">d0</text>"));
        assert!(!svg.contains(">d1</text>"));
        assert!(svg.contains(">d2</text>"));
    }

    #[test]
    fn very_dense_labels_stay_upright() {
        let data: Vec<f64> = (0..100).map(f64::from).collect();
        let labels: Vec<String> = (0..100).map(|i| format!("p{i}")).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let svg = render_chart(&request(data, &refs)).unwrap();
        // every 5th label
        assert!(!svg.contains("rotate(-45"));
        assert!(svg.contains(r#"text-anchor="middle" font-size="10">p5</text>"#));
        assert!(!svg.contains(">p4</text>"));
    }

    #[test]
    fn flat_series_does_not_divide_by_zero() {
        let svg = render_chart(&request(vec![5.0, 5.0, 5.0], &["a", "b", "c"])).unwrap();
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("inf"));
    }

    #[test]
    fn labels_are_escaped() {
        let svg = render_chart(&request(vec![1.0, 2.0], &["<b>", "R&D"])).unwrap();
        assert!(svg.contains("&lt;b&gt;"));
        assert!(svg.contains("R&amp;D"));
    }

    #[test]
    fn rejects_single_point() {
        let err = render_chart(&request(vec![1.0], &["a"])).unwrap_err();
        assert_eq!(err.to_string(), "drawChart needs at least 2 data points");
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let err = render_chart(&request(vec![1.0, 2.0, 3.0], &["a", "b"])).unwrap_err();
        assert_eq!(err.to_string(), "drawChart got 2 labels for 3 data points");
    }

    #[tokio::test]
    async fn invoke_returns_svg_string() {
        let result = DrawChartTool
            .invoke(serde_json::json!({
                "xAxis": "x", "yAxis": "y", "data": [1, 2], "labels": ["a", "b"]
            }))
            .await
            .unwrap();
        assert!(result.as_str().unwrap().starts_with("<svg"));
    }
}
