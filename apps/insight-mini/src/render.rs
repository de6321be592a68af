use insight_client::ViewState;
use insight_shape::{ChartKind, ChartSeries, DashboardView};
use serde_json::{json, Value as JsonValue};

pub const DEFAULT_WIDTH: usize = 40;

/// One-line status for non-ready states, full chart blocks otherwise.
pub fn render_state(state: &ViewState, width: usize) -> String {
    match state {
        ViewState::Loading => "loading...".to_string(),
        ViewState::NoData => "No records match the current filters.".to_string(),
        ViewState::Unavailable(message) => format!("Data unavailable: {message}"),
        ViewState::Ready(view) => render_view(view, width),
    }
}

pub fn render_view(view: &DashboardView, width: usize) -> String {
    let mut out = format!("{} records\n", view.record_count);
    for kind in ChartKind::ALL {
        out.push_str(&format!("\n== {} ==\n", kind.title()));
        let body = match view.counts(kind) {
            Some(series) => chart(series, width, |v| v.to_string(), |v| *v as f64),
            None => chart(
                &view.intensity_by_year,
                width,
                |v| format!("{v:.2}"),
                |v| *v,
            ),
        };
        out.push_str(&body);
    }
    out
}

fn chart<T>(
    series: &ChartSeries<T>,
    width: usize,
    label_value: impl Fn(&T) -> String,
    magnitude: impl Fn(&T) -> f64,
) -> String {
    let points = match series {
        ChartSeries::NoData => return "  (no data)\n".to_string(),
        ChartSeries::Ready(points) => points,
    };
    let label_width = points
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);
    let max = points
        .iter()
        .map(|p| magnitude(&p.value))
        .fold(0.0_f64, f64::max);
    let mut out = String::new();
    for point in points {
        let bar = "#".repeat(bar_len(magnitude(&point.value), max, width));
        out.push_str(&format!(
            "  {:<label_width$} {bar} {}\n",
            point.label,
            label_value(&point.value)
        ));
    }
    out
}

/// Bar length scaled to the chart maximum; any positive value gets at least one cell.
pub fn bar_len(value: f64, max: f64, width: usize) -> usize {
    if width == 0 || max <= 0.0 || value <= 0.0 || !value.is_finite() {
        return 0;
    }
    let len = (value / max * width as f64).round() as usize;
    len.clamp(1, width)
}

pub fn state_json(state: &ViewState) -> JsonValue {
    match state {
        ViewState::Loading => json!({"status": "loading"}),
        ViewState::NoData => json!({"status": "no_data"}),
        ViewState::Unavailable(message) => json!({"status": "unavailable", "message": message}),
        ViewState::Ready(view) => json!({"status": "ready", "view": view}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_protocol::Record;
    use insight_shape::ZeroMetric;

    fn view() -> DashboardView {
        let records = vec![
            Record::new()
                .with("sector", "Energy")
                .with("end_year", "2020")
                .with("intensity", 3),
            Record::new()
                .with("sector", "Energy")
                .with("end_year", "2020")
                .with("intensity", 5),
            Record::new().with("sector", "Health").with("end_year", "2021"),
        ];
        DashboardView::from_records(&records, ZeroMetric::Skip)
    }

    #[test]
    fn bars_scale_to_the_largest_value() {
        assert_eq!(bar_len(10.0, 10.0, 40), 40);
        assert_eq!(bar_len(5.0, 10.0, 40), 20);
        assert_eq!(bar_len(0.01, 10.0, 40), 1);
        assert_eq!(bar_len(0.0, 10.0, 40), 0);
        assert_eq!(bar_len(3.0, 0.0, 40), 0);
        assert_eq!(bar_len(3.0, 3.0, 0), 0);
    }

    #[test]
    fn ready_view_prints_every_chart_block() {
        let text = render_state(&ViewState::Ready(view()), 10);
        assert!(text.starts_with("3 records\n"));
        for kind in ChartKind::ALL {
            assert!(text.contains(&format!("== {} ==", kind.title())), "{kind:?}");
        }
        assert!(text.contains("  Energy ########## 2\n"));
        assert!(text.contains("  Health ##### 1\n"));
        assert!(text.contains("  2020 ########## 4.00\n"));
        assert!(!text.contains("2021"));
        // regions, pestles, countries and topics have no values
        assert_eq!(text.matches("(no data)").count(), 4);
    }

    #[test]
    fn non_ready_states_are_single_lines() {
        assert_eq!(render_state(&ViewState::Loading, 10), "loading...");
        assert_eq!(
            render_state(&ViewState::NoData, 10),
            "No records match the current filters."
        );
        assert_eq!(
            render_state(&ViewState::Unavailable("database is locked".into()), 10),
            "Data unavailable: database is locked"
        );
    }

    #[test]
    fn json_output_tags_the_state() {
        let ready = state_json(&ViewState::Ready(view()));
        assert_eq!(ready["status"], json!("ready"));
        assert_eq!(ready["view"]["record_count"], json!(3));
        assert_eq!(ready["view"]["regions"]["status"], json!("no_data"));
        assert_eq!(
            state_json(&ViewState::Unavailable("down".into())),
            json!({"status": "unavailable", "message": "down"})
        );
    }
}
