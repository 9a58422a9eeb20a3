use crate::utils::format_utils::bytes_to_mb;
use sbdash_common::{TrafficPoint, TrafficSample};
use std::collections::BTreeMap;

/// 图表时间窗口（查询参数 `limit`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficWindow {
    OneHour,
    #[default]
    SixHours,
    TwelveHours,
    OneDay,
    SevenDays,
    FifteenDays,
    ThirtyDays,
}

impl TrafficWindow {
    /// Parse the selector sent by the chart. Empty or unknown selectors fall back to six hours.
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "1" => TrafficWindow::OneHour,
            "6" => TrafficWindow::SixHours,
            "12" => TrafficWindow::TwelveHours,
            "1d" => TrafficWindow::OneDay,
            "7d" => TrafficWindow::SevenDays,
            "15d" => TrafficWindow::FifteenDays,
            "30d" => TrafficWindow::ThirtyDays,
            _ => TrafficWindow::default(),
        }
    }

    /// Hour count passed upstream as `limit`.
    pub fn hours(&self) -> u32 {
        match self {
            TrafficWindow::OneHour => 1,
            TrafficWindow::SixHours => 6,
            TrafficWindow::TwelveHours => 12,
            TrafficWindow::OneDay => 24,
            TrafficWindow::SevenDays => 24 * 7,
            TrafficWindow::FifteenDays => 24 * 15,
            TrafficWindow::ThirtyDays => 24 * 30,
        }
    }
}

/// 将原始流量记录按时间戳合并为上传/下载（MB）序列
/// 每个不同的时间戳输出一个点，按时间升序排列
pub fn aggregate_traffic(samples: &[TrafficSample]) -> Vec<TrafficPoint> {
    // (up_mb, down_mb)
    let mut buckets: BTreeMap<i64, (f64, f64)> = BTreeMap::new();

    for sample in samples {
        let entry = buckets.entry(sample.date_time).or_insert((0.0, 0.0));
        let mb = bytes_to_mb(sample.traffic);
        if sample.direction {
            entry.0 += mb;
        } else {
            entry.1 += mb;
        }
    }

    buckets
        .into_iter()
        .map(|(time, (up, down))| TrafficPoint { time, up, down })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(date_time: i64, direction: bool, traffic: i64) -> TrafficSample {
        TrafficSample {
            date_time,
            direction,
            traffic,
            resource: "user".to_string(),
            tag: "alice".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input_yields_empty_series() {
        assert!(aggregate_traffic(&[]).is_empty());
    }

    #[test]
    fn test_merges_duplicate_timestamps() {
        let samples = vec![
            sample(100, true, 1_048_576),
            sample(100, true, 1_048_576),
            sample(100, false, 524_288),
        ];
        let points = aggregate_traffic(&samples);
        assert_eq!(
            points,
            vec![TrafficPoint {
                time: 100,
                up: 2.0,
                down: 0.5
            }]
        );
    }

    #[test]
    fn test_one_point_per_timestamp_sorted() {
        let samples = vec![
            sample(300, false, 1),
            sample(100, true, 1),
            sample(200, true, 1),
            sample(100, false, 1),
            sample(300, true, 1),
        ];
        let times: Vec<i64> = aggregate_traffic(&samples).iter().map(|p| p.time).collect();
        assert_eq!(times, vec![100, 200, 300]);
    }

    #[test]
    fn test_direction_totals_are_conserved() {
        let samples: Vec<TrafficSample> = (0..50)
            .map(|i| sample(1_700_000_000 + (i % 7) * 3600, i % 3 == 0, 12_345 * (i + 1)))
            .collect();

        let expected_up: i64 = samples.iter().filter(|s| s.direction).map(|s| s.traffic).sum();
        let expected_down: i64 = samples.iter().filter(|s| !s.direction).map(|s| s.traffic).sum();

        let points = aggregate_traffic(&samples);
        assert_eq!(points.len(), 7);

        let up: f64 = points.iter().map(|p| p.up).sum();
        let down: f64 = points.iter().map(|p| p.down).sum();
        assert!((up - expected_up as f64 / 1_048_576.0).abs() < 1e-9);
        assert!((down - expected_down as f64 / 1_048_576.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_traffic_passes_through() {
        let points = aggregate_traffic(&[sample(1, false, -1_048_576)]);
        assert_eq!(points[0].down, -1.0);
        assert_eq!(points[0].up, 0.0);
    }

    #[test]
    fn test_window_selector_table() {
        let table = [
            ("1", 1),
            ("6", 6),
            ("12", 12),
            ("1d", 24),
            ("7d", 168),
            ("15d", 360),
            ("30d", 720),
            ("", 6),
            ("foo", 6),
            ("7D", 6),
        ];
        for (selector, hours) in table {
            assert_eq!(TrafficWindow::from_selector(selector).hours(), hours, "{selector}");
        }
    }
}
