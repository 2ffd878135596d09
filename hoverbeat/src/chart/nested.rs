/*!
 * Nested event scheduling for sliders.
 *
 * A slider with `n` spans gets ticks inside every span, a repeat at the end
 * of every span but the last and a tail at the end of the last one.
 */
use hoverbeat_geometry::{Point, SliderPath};

use super::{NestedEvent, NestedEventKind};

/// Ticks closer than this fraction of a span to the span's end are dropped.
const TICK_END_MARGIN: f64 = 0.01;

/// Bounds tick generation for absurd tick rates.
const MAX_TICKS_PER_SPAN: u32 = 1024;

/// Computes the checkpoints of one slider.
///
/// `tick_interval` is in milliseconds; a non-finite or non-positive interval
/// disables ticks. Positions are absolute, offset by `anchor`.
pub fn schedule_nested_events(
    start_time: f64,
    duration: f64,
    repeat_count: u32,
    tick_interval: f64,
    path: &SliderPath,
    anchor: Point,
) -> Vec<NestedEvent> {
    let spans = repeat_count.max(1);

    if duration <= 0.0 || !duration.is_finite() {
        // Nothing to traverse; the slider collapses onto its tail.
        return vec![NestedEvent {
            time: start_time,
            kind: NestedEventKind::Tail,
            span_index: spans - 1,
            position: anchor + path.position_at_span_progress(spans - 1, 1.0),
        }];
    }

    let span_duration = duration / spans as f64;
    let ticks_enabled = tick_interval.is_finite() && tick_interval > 0.0;
    let tick_limit = span_duration * (1.0 - TICK_END_MARGIN);
    let mut events = Vec::new();

    for span in 0..spans {
        let span_start = start_time + span as f64 * span_duration;

        if ticks_enabled {
            let mut k = 1;
            loop {
                let offset = k as f64 * tick_interval;
                if offset >= tick_limit {
                    break;
                }
                if k > MAX_TICKS_PER_SPAN {
                    log::debug!("Tick interval {tick_interval} too small, capping ticks");
                    break;
                }

                events.push(NestedEvent {
                    time: span_start + offset,
                    kind: NestedEventKind::Tick,
                    span_index: span,
                    position: anchor + path.position_at_span_progress(span, offset / span_duration),
                });
                k += 1;
            }
        }

        let kind = if span + 1 == spans {
            NestedEventKind::Tail
        } else {
            NestedEventKind::Repeat
        };
        events.push(NestedEvent {
            time: start_time + (span + 1) as f64 * span_duration,
            kind,
            span_index: span,
            position: anchor + path.position_at_span_progress(span, 1.0),
        });
    }

    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}

#[cfg(test)]
mod tests {
    use hoverbeat_geometry::CurveType;

    use super::*;

    fn straight_path() -> SliderPath {
        SliderPath::new(
            CurveType::Linear,
            &[Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
            100.0,
        )
    }

    fn kinds(events: &[NestedEvent]) -> Vec<NestedEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn single_span_with_ticks() {
        use NestedEventKind::*;

        let events = schedule_nested_events(1000.0, 1000.0, 1, 250.0, &straight_path(), Point::zeros());

        assert_eq!(kinds(&events), vec![Tick, Tick, Tick, Tail]);
        let times = events.iter().map(|e| e.time).collect::<Vec<_>>();
        assert_eq!(times, vec![1250.0, 1500.0, 1750.0, 2000.0]);
        assert!((events[1].position - Point::new(50.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn repeats_mark_span_boundaries() {
        use NestedEventKind::*;

        let events = schedule_nested_events(0.0, 900.0, 3, f64::INFINITY, &straight_path(), Point::zeros());

        assert_eq!(kinds(&events), vec![Repeat, Repeat, Tail]);
        assert_eq!(events[0].time, 300.0);
        assert_eq!(events[1].time, 600.0);
        assert_eq!(events[2].time, 900.0);
        assert!((events[0].position - Point::new(100.0, 0.0)).norm() < 1e-9);
        assert!((events[1].position - Point::new(0.0, 0.0)).norm() < 1e-9);
        assert!((events[2].position - Point::new(100.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn ticks_in_reverse_span_move_backwards() {
        let events = schedule_nested_events(0.0, 800.0, 2, 100.0, &straight_path(), Point::new(10.0, 10.0));

        let reverse_ticks = events
            .iter()
            .filter(|e| e.kind == NestedEventKind::Tick && e.span_index == 1)
            .collect::<Vec<_>>();
        assert_eq!(reverse_ticks.len(), 3);
        assert!((reverse_ticks[0].position - Point::new(85.0, 10.0)).norm() < 1e-9);
        assert!((reverse_ticks[2].position - Point::new(35.0, 10.0)).norm() < 1e-9);
    }

    #[test]
    fn tick_too_close_to_span_end_is_dropped() {
        // 995 lies inside the last 1% of the span.
        let events = schedule_nested_events(0.0, 1000.0, 1, 995.0, &straight_path(), Point::zeros());
        assert_eq!(kinds(&events), vec![NestedEventKind::Tail]);
    }

    #[test]
    fn events_are_ordered_by_time() {
        let events = schedule_nested_events(500.0, 1234.0, 4, 77.0, &straight_path(), Point::zeros());

        assert!(events.windows(2).all(|w| w[0].time < w[1].time));
        assert_eq!(events.last().map(|e| e.kind), Some(NestedEventKind::Tail));
        assert!((events.last().map_or(0.0, |e| e.time) - 1734.0).abs() < 1e-9);
    }

    #[test]
    fn tiny_tick_interval_is_capped() {
        let events = schedule_nested_events(0.0, 1000.0, 1, 1e-6, &straight_path(), Point::zeros());
        assert_eq!(events.len() as u32, MAX_TICKS_PER_SPAN + 1);
    }

    #[test]
    fn zero_duration_collapses_to_tail() {
        let events = schedule_nested_events(100.0, 0.0, 3, 10.0, &straight_path(), Point::zeros());

        assert_eq!(kinds(&events), vec![NestedEventKind::Tail]);
        assert_eq!(events[0].time, 100.0);
    }
}
