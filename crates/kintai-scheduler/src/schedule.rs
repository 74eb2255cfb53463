use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone};

/// When a background loop fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Repeat with a fixed interval in seconds.
    Interval { every_secs: u64 },

    /// Run every day at the given hour and minute in the caller's time zone.
    Daily { hour: u8, minute: u8 },
}

impl Schedule {
    pub fn every_secs(every_secs: u64) -> Self {
        Schedule::Interval {
            every_secs: every_secs.max(1),
        }
    }

    /// The next local-midnight boundary.
    pub fn midnight() -> Self {
        Schedule::Daily { hour: 0, minute: 0 }
    }

    /// Time to wait from `from` until the next run.
    pub fn delay_from<Tz: TimeZone>(&self, from: &DateTime<Tz>) -> std::time::Duration {
        compute_next_run(self, from.clone())
            .and_then(|next| next.signed_duration_since(from.clone()).to_std().ok())
            .unwrap_or(std::time::Duration::from_secs(60))
    }
}

/// Compute the next execution time for `schedule` strictly after `from`.
///
/// `Daily` times that fall into a DST gap are pushed one hour forward; when
/// a local time occurs twice the earlier instant wins.
pub fn compute_next_run<Tz: TimeZone>(schedule: &Schedule, from: DateTime<Tz>) -> Option<DateTime<Tz>> {
    match schedule {
        Schedule::Interval { every_secs } => {
            Some(from + Duration::seconds(i64::try_from(*every_secs).ok()?))
        }

        Schedule::Daily { hour, minute } => {
            let time = NaiveTime::from_hms_opt(u32::from(*hour), u32::from(*minute), 0)?;
            let tz = from.timezone();
            let mut date = from.date_naive();
            // Today, then tomorrow; a third day covers a skipped DST day.
            for _ in 0..3 {
                if let Some(candidate) = resolve_local(&tz, date.and_time(time)) {
                    if candidate > from {
                        return Some(candidate);
                    }
                }
                date = date.succ_opt()?;
            }
            None
        }
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn interval_adds_fixed_delay() {
        let from = Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
        let next = compute_next_run(&Schedule::every_secs(600), from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 1, 10, 10, 0).unwrap());
    }

    #[test]
    fn midnight_is_next_day_boundary() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let from = jst.with_ymd_and_hms(2026, 2, 1, 23, 59, 30).unwrap();
        let next = compute_next_run(&Schedule::midnight(), from).unwrap();
        assert_eq!(next, jst.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap());
        assert_eq!(
            Schedule::midnight().delay_from(&from),
            std::time::Duration::from_secs(30)
        );
    }

    #[test]
    fn exactly_at_boundary_moves_to_tomorrow() {
        let from = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let next = compute_next_run(&Schedule::midnight(), from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn daily_later_today() {
        let from = Utc.with_ymd_and_hms(2026, 2, 1, 3, 0, 0).unwrap();
        let schedule = Schedule::Daily { hour: 4, minute: 30 };
        let next = compute_next_run(&schedule, from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 1, 4, 30, 0).unwrap());
    }

    #[test]
    fn out_of_range_daily_time_never_fires() {
        let from = Utc.with_ymd_and_hms(2026, 2, 1, 3, 0, 0).unwrap();
        assert_eq!(compute_next_run(&Schedule::Daily { hour: 24, minute: 0 }, from), None);
    }
}
