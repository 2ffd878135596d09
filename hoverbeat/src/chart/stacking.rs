/*!
 * Stacking of objects placed on top of each other.
 *
 * Objects that share a position within a short time of each other are
 * shifted up-left by a fraction of the circle radius per stack level, so all
 * of them stay visible. Objects stacking on a slider's end are shifted
 * down-right instead.
 */
use hoverbeat_geometry::Point;

use super::HitObject;

/// Objects closer than this many pixels are considered on top of each other.
pub const STACK_DISTANCE: f64 = 3.0;

/// Fills in `stack_height` and `stacked_position` for objects ordered by
/// start time.
pub fn apply_stacking(objects: &mut [HitObject], stack_leniency: f64, circle_radius: f64) {
    for object in objects.iter_mut() {
        object.stack_height = 0;
    }

    for i in 0..objects.len() {
        if objects[i].is_spinner() {
            continue;
        }
        if objects[i].stack_height != 0 && !objects[i].is_slider() {
            continue;
        }

        let position = objects[i].position;
        let end_position = match objects[i].as_slider() {
            Some(slider) => position + slider.path.end_position(),
            None => position,
        };
        let stack_threshold = objects[i].approach_lead_time_ms * stack_leniency;
        let mut end_time = objects[i].end_time();
        let mut slider_stack = 0;

        for j in i + 1..objects.len() {
            if objects[j].start_time - stack_threshold > end_time {
                break;
            }
            if objects[j].is_spinner() {
                continue;
            }

            if (objects[j].position - position).norm() < STACK_DISTANCE {
                objects[i].stack_height += 1;
                end_time = objects[j].end_time();
            } else if (objects[j].position - end_position).norm() < STACK_DISTANCE {
                slider_stack += 1;
                objects[j].stack_height -= slider_stack;
                end_time = objects[j].end_time();
            }
        }
    }

    let offset = circle_radius / 10.0;
    for object in objects.iter_mut() {
        let shift = object.stack_height as f64 * offset;
        object.stacked_position = object.position - Point::new(shift, shift);
    }
}

#[cfg(test)]
mod tests {
    use crate::chart::parse_chart;

    #[test]
    fn stacked_circles_shift_up_left() {
        let chart = parse_chart(
            "[Difficulty]\nCircleSize:5\n\n[HitObjects]\n100,100,1000,1,0\n100,100,1100,1,0\n100,100,1200,1,0\n",
        )
        .chart;

        let heights = chart
            .hit_objects
            .iter()
            .map(|o| o.stack_height)
            .collect::<Vec<_>>();
        assert_eq!(heights, vec![2, 1, 0]);

        let first = &chart.hit_objects[0];
        assert!((first.stacked_position.x - (100.0 - 2.0 * 3.2)).abs() < 1e-9);
        assert!((first.stacked_position.y - (100.0 - 2.0 * 3.2)).abs() < 1e-9);
        assert_eq!(chart.hit_objects[2].stacked_position, chart.hit_objects[2].position);
    }

    #[test]
    fn distant_objects_do_not_stack() {
        let chart = parse_chart("[HitObjects]\n100,100,1000,1,0\n100,100,9000,1,0\n200,200,9100,1,0\n").chart;
        assert!(chart.hit_objects.iter().all(|o| o.stack_height == 0));
    }

    #[test]
    fn spinners_never_stack() {
        let chart = parse_chart("[HitObjects]\n256,192,1000,1,0\n256,192,1100,8,0,2000\n").chart;

        assert!(chart.hit_objects.iter().all(|o| o.stack_height == 0));
    }

    #[test]
    fn objects_on_slider_end_shift_down_right() {
        let chart = parse_chart(
            "[HitObjects]\n0,0,1000,2,0,L|100:0,1,100\n100,0,2000,1,0\n",
        )
        .chart;

        assert_eq!(chart.hit_objects[0].stack_height, 0);
        assert_eq!(chart.hit_objects[1].stack_height, -1);
        assert!(chart.hit_objects[1].stacked_position.x > 100.0);
    }
}
