//! Time-window candidate filtering.
//!
//! Selects entities whose timestamps fall within a symmetric window of a
//! reference time. Both bounds are inclusive. All comparisons happen in
//! the fixed civil zone, so the window is correct across daylight-saving
//! transitions.

use chrono::Duration;

use crate::time::CivilTime;

/// An entity that fell inside the window, with its signed offset from the
/// reference time. Ephemeral; produced here, consumed by the matcher.
#[derive(Debug, Clone)]
pub struct MatchCandidate<T> {
    pub entity: T,
    /// `entity_time - reference_time`; negative means the entity is earlier.
    pub time_delta: Duration,
}

impl<T> MatchCandidate<T> {
    /// Absolute offset in fractional hours, for prompt display.
    pub fn delta_hours(&self) -> f64 {
        self.time_delta.num_seconds().abs() as f64 / 3600.0
    }
}

/// Filter `items` to those within `window_hours` of `reference`, inclusive
/// on both ends. `start` extracts the timestamp to test.
pub fn filter_window<T>(
    items: impl IntoIterator<Item = T>,
    reference: CivilTime,
    window_hours: i64,
    start: impl Fn(&T) -> CivilTime,
) -> Vec<MatchCandidate<T>> {
    let window = Duration::hours(window_hours);
    let lower = reference - window;
    let upper = reference + window;

    items
        .into_iter()
        .filter_map(|item| {
            let t = start(&item);
            if t >= lower && t <= upper {
                Some(MatchCandidate {
                    time_delta: t - reference,
                    entity: item,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_civil;

    #[test]
    fn test_boundaries_are_inclusive() {
        let reference = parse_civil("2024-12-02T12:00:00").unwrap();
        let times = vec![
            parse_civil("2024-12-02T00:00:00").unwrap(), // exactly -12h
            parse_civil("2024-12-03T00:00:00").unwrap(), // exactly +12h
            parse_civil("2024-12-01T23:59:59").unwrap(), // one second beyond
            parse_civil("2024-12-03T00:00:01").unwrap(), // one second beyond
        ];

        let kept = filter_window(times, reference, 12, |t| *t);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].time_delta, Duration::hours(-12));
        assert_eq!(kept[1].time_delta, Duration::hours(12));
    }

    #[test]
    fn test_delta_hours_is_absolute() {
        let reference = parse_civil("2024-12-02T12:00:00").unwrap();
        let times = vec![parse_civil("2024-12-02T09:00:00").unwrap()];
        let kept = filter_window(times, reference, 12, |t| *t);
        assert_eq!(kept[0].delta_hours(), 3.0);
    }

    #[test]
    fn test_window_spans_dst_transition() {
        // Fall-back 2024: clocks repeat 1-2 AM on Nov 3. An 8-hour window
        // around 11 PM Nov 2 covers 9 wall-clock hours of Nov 3.
        let reference = parse_civil("2024-11-02T23:00:00").unwrap();
        let inside = parse_civil("2024-11-03T06:00:00").unwrap();
        let outside = parse_civil("2024-11-03T07:00:00").unwrap();

        let kept = filter_window(vec![inside, outside], reference, 8, |t| *t);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let reference = parse_civil("2024-12-02T12:00:00").unwrap();
        let kept = filter_window(Vec::<CivilTime>::new(), reference, 12, |t| *t);
        assert!(kept.is_empty());
    }
}
