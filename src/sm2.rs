//! SM-2 grading state machine.
//!
//! Quality scale is 0..=5. Grades below 3 are lapses: the repetition streak
//! resets and the card comes back tomorrow. Passing grades walk the interval
//! through 1 day, 6 days, then the previous interval times the ease factor.

use chrono::{Duration, NaiveDate};

use crate::models::{Grade, SchedulingRecord};

/// Advance `record` by one grading of quality `grade` on `today`.
///
/// Pure: the same inputs always give the same record back.
pub fn apply_grade(record: &SchedulingRecord, grade: Grade, today: NaiveDate) -> SchedulingRecord {
    let (repetitions, interval) = if grade.is_pass() {
        let repetitions = record.repetitions.saturating_add(1);
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            _ => grow_interval(record.interval, record.ease_factor),
        };
        (repetitions, interval)
    } else {
        (0, 1)
    };

    SchedulingRecord {
        card_id: record.card_id,
        interval,
        repetitions,
        ease_factor: next_ease(record.ease_factor, grade),
        next_review: Some(schedule_after(today, interval)),
        last_grade: Some(grade),
    }
}

/// Ease factor after a grade, floored at [`SchedulingRecord::MIN_EASE`].
pub fn next_ease(ease_factor: f64, grade: Grade) -> f64 {
    let miss = (Grade::MAX - grade.value()) as f64;
    let delta = 0.1 - miss * (0.08 + miss * 0.02);
    (ease_factor + delta).max(SchedulingRecord::MIN_EASE)
}

fn schedule_after(today: NaiveDate, interval: u32) -> NaiveDate {
    let latest = SchedulingRecord::latest_review_date();
    today
        .checked_add_signed(Duration::days(interval as i64))
        .map_or(latest, |date| date.min(latest))
}

fn grow_interval(interval: u32, ease_factor: f64) -> u32 {
    let grown = (interval as f64 * ease_factor).ceil();
    if grown >= SchedulingRecord::MAX_INTERVAL as f64 {
        SchedulingRecord::MAX_INTERVAL
    } else {
        (grown as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn grade(v: i64) -> Grade {
        Grade::new(v).unwrap()
    }

    fn record(repetitions: u32, interval: u32, ease_factor: f64) -> SchedulingRecord {
        SchedulingRecord {
            card_id: 1,
            interval,
            repetitions,
            ease_factor,
            next_review: Some(today()),
            last_grade: Some(grade(4)),
        }
    }

    mod scenario_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn first_perfect_grade_on_new_card() {
            let updated = apply_grade(&SchedulingRecord::new(1), grade(5), today());
            assert_eq!(updated.repetitions, 1);
            assert_eq!(updated.interval, 1);
            assert!((updated.ease_factor - 2.6).abs() < 1e-9);
            assert_eq!(updated.next_review, Some(today() + Duration::days(1)));
            assert_eq!(updated.last_grade, Some(grade(5)));
        }

        #[test]
        fn second_success_jumps_to_six_days() {
            let updated = apply_grade(&record(1, 1, 2.5), grade(4), today());
            assert_eq!(updated.repetitions, 2);
            assert_eq!(updated.interval, 6);
            assert_eq!(updated.next_review, Some(today() + Duration::days(6)));
        }

        #[test]
        fn third_success_multiplies_by_ease() {
            let updated = apply_grade(&record(2, 6, 2.5), grade(4), today());
            assert_eq!(updated.repetitions, 3);
            assert_eq!(updated.interval, 15);
            assert_eq!(updated.next_review, Some(today() + Duration::days(15)));
            // grade 4 leaves the ease factor unchanged
            assert!((updated.ease_factor - 2.5).abs() < 1e-9);
        }

        #[test]
        fn interval_rounds_up() {
            // 7 * 2.36 = 16.52
            let updated = apply_grade(&record(3, 7, 2.36), grade(5), today());
            assert_eq!(updated.interval, 17);
        }

        #[test]
        fn lapse_after_long_streak() {
            let before = record(5, 20, 2.5);
            let updated = apply_grade(&before, grade(1), today());
            assert_eq!(updated.repetitions, 0);
            assert_eq!(updated.interval, 1);
            assert_eq!(updated.next_review, Some(today() + Duration::days(1)));
            assert!(updated.ease_factor < before.ease_factor);
            assert!(updated.ease_factor >= SchedulingRecord::MIN_EASE);
        }

        #[test]
        fn first_answer_fails() {
            let updated = apply_grade(&SchedulingRecord::new(9), grade(0), today());
            assert_eq!(updated.card_id, 9);
            assert_eq!(updated.repetitions, 0);
            assert_eq!(updated.interval, 1);
            assert!((updated.ease_factor - 1.7).abs() < 1e-9);
        }
    }

    mod ease_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn ease_deltas_per_grade() {
            let expected = [-0.8, -0.54, -0.32, -0.14, 0.0, 0.1];
            for (g, delta) in expected.iter().enumerate() {
                let got = next_ease(2.5, grade(g as i64)) - 2.5;
                assert!(
                    (got - delta).abs() < 1e-9,
                    "grade {} expected delta {} got {}",
                    g,
                    delta,
                    got
                );
            }
        }

        #[test]
        fn ease_never_below_floor() {
            let starts = [1.3, 1.31, 1.5, 1.8, 2.5, 3.0];
            for start in starts {
                for g in Grade::all() {
                    let mut r = record(3, 10, start);
                    for _ in 0..10 {
                        r = apply_grade(&r, g, today());
                        assert!(
                            r.ease_factor >= SchedulingRecord::MIN_EASE,
                            "ease {} dropped below floor (start {}, grade {})",
                            r.ease_factor,
                            start,
                            g
                        );
                    }
                }
            }
        }

        #[test]
        fn floor_is_exact() {
            assert_eq!(next_ease(1.3, grade(0)), 1.3);
        }
    }

    mod transition_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn failure_always_resets() {
            for reps in [0, 1, 2, 7, 40] {
                for interval in [0, 1, 6, 250] {
                    for g in 0..3 {
                        let updated = apply_grade(&record(reps, interval, 2.1), grade(g), today());
                        assert_eq!(updated.repetitions, 0);
                        assert_eq!(updated.interval, 1);
                    }
                }
            }
        }

        #[test]
        fn perfect_streak_never_shrinks_interval() {
            let mut r = SchedulingRecord::new(1);
            let mut last = 0;
            for _ in 0..12 {
                r = apply_grade(&r, grade(5), today());
                assert!(r.interval >= last, "{} < {}", r.interval, last);
                last = r.interval;
            }
            assert!(r.interval > 1000);
        }

        #[test]
        fn interval_at_least_one_even_from_zero() {
            // a record with zero interval but an existing streak still gets a real interval
            let updated = apply_grade(&record(4, 0, 2.5), grade(3), today());
            assert_eq!(updated.interval, 1);
        }

        #[test]
        fn huge_interval_is_capped() {
            let updated = apply_grade(&record(10, u32::MAX - 1, 2.5), grade(5), today());
            assert_eq!(updated.interval, SchedulingRecord::MAX_INTERVAL);
            assert_eq!(
                updated.next_review,
                Some(today() + Duration::days(SchedulingRecord::MAX_INTERVAL as i64))
            );
        }

        #[test]
        fn review_date_never_passes_year_9999() {
            let late = NaiveDate::from_ymd_opt(9990, 1, 1).unwrap();
            let updated = apply_grade(&record(10, 20_000, 2.5), grade(5), late);
            assert_eq!(updated.interval, SchedulingRecord::MAX_INTERVAL);
            assert_eq!(
                updated.next_review,
                Some(SchedulingRecord::latest_review_date())
            );
        }

        #[test]
        fn deterministic() {
            let before = record(3, 15, 2.36);
            let a = apply_grade(&before, grade(4), today());
            let b = apply_grade(&before, grade(4), today());
            assert_eq!(a, b);
            assert_eq!(a.ease_factor.to_bits(), b.ease_factor.to_bits());
        }

        #[test]
        fn input_is_not_mutated() {
            let before = record(2, 6, 2.5);
            let snapshot = before.clone();
            let _ = apply_grade(&before, grade(0), today());
            assert_eq!(before, snapshot);
        }
    }
}
