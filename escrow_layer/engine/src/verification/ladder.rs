//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use chrono::{Duration, NaiveDateTime};
use tari_escrow_common_types::{DealId, DurationHours};
use tari_escrow_storage::models::{CheckType, NewVerificationSchedule};

/// Builds the complete check ladder for a freshly submitted post: one initial
/// check now, periodic checks at an interval derived from the observation
/// window, and a final check exactly at the deal deadline. No periodic check
/// is scheduled at or past the deadline, so the final row always covers the
/// end of the window regardless of interval rounding.
pub fn build_schedule_ladder(
    deal_id: DealId,
    posted_at: NaiveDateTime,
    duration: DurationHours,
    deadline: NaiveDateTime,
) -> Vec<NewVerificationSchedule> {
    let mut schedules = vec![NewVerificationSchedule {
        deal_id,
        scheduled_at: posted_at,
        check_type: CheckType::Initial,
    }];

    let interval = check_interval(duration);
    let mut next = posted_at + interval;
    while next < deadline {
        schedules.push(NewVerificationSchedule {
            deal_id,
            scheduled_at: next,
            check_type: CheckType::Periodic,
        });
        next = next + interval;
    }

    schedules.push(NewVerificationSchedule {
        deal_id,
        scheduled_at: deadline,
        check_type: CheckType::Final,
    });

    schedules
}

/// Short windows are checked frequently, long windows sparsely.
fn check_interval(duration: DurationHours) -> Duration {
    match duration.as_hours() {
        0..=24 => Duration::hours(4),
        25..=72 => Duration::hours(12),
        _ => Duration::hours(24),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn it_builds_the_full_ladder_for_a_24h_window() {
        let deal_id = DealId::new([1u8; 32]);
        let posted_at = t0();
        let deadline = posted_at + Duration::hours(24);
        let ladder = build_schedule_ladder(deal_id, posted_at, DurationHours::new(24).unwrap(), deadline);

        assert_eq!(ladder[0].check_type, CheckType::Initial);
        assert_eq!(ladder[0].scheduled_at, posted_at);

        let periodic = ladder
            .iter()
            .filter(|s| s.check_type == CheckType::Periodic)
            .collect::<Vec<_>>();
        // 4h apart: 16:00, 20:00, 00:00, 04:00, 08:00 (12:00 is the deadline)
        assert_eq!(periodic.len(), 5);
        for (i, schedule) in periodic.iter().enumerate() {
            assert_eq!(schedule.scheduled_at, posted_at + Duration::hours(4 * (i as i64 + 1)));
            assert!(schedule.scheduled_at < deadline);
        }

        let finals = ladder.iter().filter(|s| s.check_type == CheckType::Final).collect::<Vec<_>>();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].scheduled_at, deadline);

        assert!(ladder.iter().all(|s| s.scheduled_at <= deadline));
    }

    #[test]
    fn it_spaces_checks_by_window_length() {
        assert_eq!(check_interval(DurationHours::new(12).unwrap()), Duration::hours(4));
        assert_eq!(check_interval(DurationHours::new(24).unwrap()), Duration::hours(4));
        assert_eq!(check_interval(DurationHours::new(48).unwrap()), Duration::hours(12));
        assert_eq!(check_interval(DurationHours::new(72).unwrap()), Duration::hours(12));
        assert_eq!(check_interval(DurationHours::new(168).unwrap()), Duration::hours(24));
    }

    #[test]
    fn it_always_schedules_a_final_check_even_for_a_tiny_window() {
        let deal_id = DealId::new([2u8; 32]);
        let posted_at = t0();
        let deadline = posted_at + Duration::hours(1);
        let ladder = build_schedule_ladder(deal_id, posted_at, DurationHours::new(1).unwrap(), deadline);

        assert_eq!(ladder.len(), 2);
        assert_eq!(ladder[0].check_type, CheckType::Initial);
        assert_eq!(ladder[1].check_type, CheckType::Final);
        assert_eq!(ladder[1].scheduled_at, deadline);
    }
}
