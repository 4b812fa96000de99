//! Statistics aggregation over query events.
//!
//! Reduces the events that fall inside a [`TimeWindow`] into a
//! [`RagStatistics`] snapshot. Aggregation is a pure function of its input:
//! the same events and window always produce bit-identical output, so
//! callers can recompute freely instead of caching.

use crate::types::{ErrorBreakdown, QueryEvent, RagStatistics, TimeWindow};

/// Percentile used for the latency tail.
pub const LATENCY_PERCENTILE: f64 = 0.95;

/// Aggregate the events inside `window` (inclusive on both ends).
///
/// Zero matching events yields all-zero statistics.
pub fn compute_statistics(events: &[QueryEvent], window: &TimeWindow) -> RagStatistics {
    let in_window: Vec<&QueryEvent> = events
        .iter()
        .filter(|e| window.contains(e.timestamp))
        .collect();

    if in_window.is_empty() {
        return RagStatistics {
            window: Some(window.clone()),
            ..Default::default()
        };
    }

    let count = in_window.len() as f64;
    let mut successes = 0u64;
    let mut relevance_sum = 0.0;
    let mut latency_sum = 0.0;
    let mut latencies = Vec::with_capacity(in_window.len());
    let mut error_breakdown = ErrorBreakdown::default();

    for event in &in_window {
        if event.success {
            successes += 1;
        }
        if let Some(kind) = event.error_kind() {
            error_breakdown.increment(kind);
        }
        relevance_sum += event.relevance_score;
        latency_sum += event.latency_ms;
        latencies.push(event.latency_ms);
    }

    latencies.sort_by(f64::total_cmp);

    RagStatistics {
        window: Some(window.clone()),
        query_count: in_window.len() as u64,
        success_rate: successes as f64 / count,
        avg_relevance_score: relevance_sum / count,
        avg_latency_ms: latency_sum / count,
        p95_latency_ms: percentile(&latencies, LATENCY_PERCENTILE),
        error_breakdown,
    }
}

/// Value at index `ceil(p * n) - 1` of an ascending slice, clamped to 0.
///
/// Returns 0.0 for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

/// Mean and population standard deviation.
pub fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, Granularity};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(base(), base() + Duration::hours(1), Granularity::Hour).unwrap()
    }

    fn event(i: i64, success: bool, relevance: f64, latency: f64) -> QueryEvent {
        QueryEvent {
            id: format!("q{i}"),
            timestamp: base() + Duration::minutes(i),
            success,
            relevance_score: relevance,
            confidence: 0.5,
            latency_ms: latency,
            token_count: 100,
            error_type: if success { None } else { Some("timeout".into()) },
        }
    }

    #[test]
    fn empty_input_yields_zero_statistics() {
        let stats = compute_statistics(&[], &window());
        assert_eq!(stats.query_count, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.avg_relevance_score, 0.0);
        assert_eq!(stats.avg_latency_ms, 0.0);
        assert_eq!(stats.p95_latency_ms, 0.0);
        assert_eq!(stats.window, Some(window()));
    }

    #[test]
    fn rates_and_means() {
        let events = vec![
            event(1, true, 0.9, 100.0),
            event(2, true, 0.7, 200.0),
            event(3, false, 0.2, 300.0),
            event(4, true, 0.8, 400.0),
        ];
        let stats = compute_statistics(&events, &window());

        assert_eq!(stats.query_count, 4);
        assert!((stats.success_rate - 0.75).abs() < 1e-12);
        assert!((stats.avg_relevance_score - 0.65).abs() < 1e-12);
        assert!((stats.avg_latency_ms - 250.0).abs() < 1e-12);
        assert_eq!(stats.error_breakdown.get(ErrorKind::Timeout), 1);
        assert_eq!(stats.error_breakdown.total(), 1);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let mut at_start = event(0, true, 1.0, 10.0);
        at_start.timestamp = base();
        let mut at_end = event(60, true, 1.0, 10.0);
        at_end.timestamp = base() + Duration::hours(1);
        let mut outside = event(61, false, 0.0, 10.0);
        outside.timestamp = base() + Duration::hours(1) + Duration::seconds(1);

        let stats = compute_statistics(&[at_start, at_end, outside], &window());
        assert_eq!(stats.query_count, 2);
        assert_eq!(stats.success_rate, 1.0);
    }

    #[test]
    fn p95_uses_ceil_index() {
        // 20 latencies 1..=20: ceil(0.95 * 20) - 1 = 18 -> 19.0
        let events: Vec<_> = (1..=20)
            .rev()
            .map(|i| event(i, true, 0.5, i as f64))
            .collect();
        let stats = compute_statistics(&events, &window());
        assert_eq!(stats.p95_latency_ms, 19.0);

        // 3 latencies: ceil(2.85) - 1 = 2 -> max
        let events = vec![
            event(1, true, 0.5, 50.0),
            event(2, true, 0.5, 10.0),
            event(3, true, 0.5, 30.0),
        ];
        assert_eq!(compute_statistics(&events, &window()).p95_latency_ms, 50.0);
    }

    #[test]
    fn single_event_p95_is_that_event() {
        let stats = compute_statistics(&[event(1, true, 0.5, 42.0)], &window());
        assert_eq!(stats.p95_latency_ms, 42.0);
    }

    #[test]
    fn unknown_and_missing_error_labels_count_as_unknown() {
        let mut unlabeled = event(1, false, 0.1, 10.0);
        unlabeled.error_type = None;
        let mut odd = event(2, false, 0.1, 10.0);
        odd.error_type = Some("gremlins".into());
        let mut labeled = event(3, false, 0.1, 10.0);
        labeled.error_type = Some("hallucination".into());

        let stats = compute_statistics(&[unlabeled, odd, labeled], &window());
        assert_eq!(stats.error_breakdown.get(ErrorKind::Unknown), 2);
        assert_eq!(stats.error_breakdown.get(ErrorKind::Hallucination), 1);
        assert!(stats.error_breakdown.total() <= stats.query_count);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let events: Vec<_> = (0..50)
            .map(|i| event(i, i % 7 != 0, (i as f64 * 0.37) % 1.0, (i * 13 % 97) as f64))
            .collect();
        let first = compute_statistics(&events, &window());
        let second = compute_statistics(&events, &window());
        assert_eq!(first, second);
        assert_eq!(first.avg_latency_ms.to_bits(), second.avg_latency_ms.to_bits());
    }

    #[test]
    fn mean_and_std_dev_population() {
        let (mean, std_dev) = mean_and_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std_dev - 2.0).abs() < 1e-12);
        assert_eq!(mean_and_std_dev(&[]), (0.0, 0.0));
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile(&[], 0.95), 0.0);
    }
}
