//! Walks the calendar to find the dates a monthly allowance falls due.

use time::{Date, Month};

use crate::child::AllowanceDay;

/// The most allowance payments a single reconciliation may make (100 years).
pub const MAX_OCCURRENCES: usize = 1200;

/// A lazy iterator over the dates a monthly allowance falls due, in order, up
/// to and including `until`.
///
/// At most one date is produced per calendar month. The allowance day is
/// clamped to the length of each month, so day 31 falls on 28 February in
/// 2023 and on 29 February in 2024.
#[derive(Debug, Clone)]
pub struct Occurrences {
    allowance_day: AllowanceDay,
    year: i32,
    month: Month,
    until: Date,
    is_done: bool,
}

impl Occurrences {
    /// The allowance days strictly after `start_date`.
    ///
    /// The start date itself is never paid, even when it falls on the
    /// allowance day. An allowance starting on 1 January with day 1 is first
    /// paid on 1 February.
    pub fn after_start(start_date: Date, allowance_day: AllowanceDay, until: Date) -> Self {
        let mut occurrences = Self {
            allowance_day,
            year: start_date.year(),
            month: start_date.month(),
            until,
            is_done: false,
        };

        match occurrence_in_month(occurrences.year, occurrences.month, allowance_day) {
            Some(first) if first > start_date => {}
            Some(_) => occurrences.advance_month(),
            None => occurrences.is_done = true,
        }

        occurrences
    }

    /// The allowance days from the calendar month after `last_payment`.
    pub fn after_payment(last_payment: Date, allowance_day: AllowanceDay, until: Date) -> Self {
        let mut occurrences = Self {
            allowance_day,
            year: last_payment.year(),
            month: last_payment.month(),
            until,
            is_done: false,
        };
        occurrences.advance_month();

        occurrences
    }

    /// The allowance days strictly after `start_date` in the months after
    /// `last_payment`.
    ///
    /// Resumes from whichever of the two is later, so moving the start date or
    /// the allowance day never pays a month twice.
    pub fn resume(
        start_date: Date,
        last_payment: Option<Date>,
        allowance_day: AllowanceDay,
        until: Date,
    ) -> Self {
        let from_start = Self::after_start(start_date, allowance_day, until);

        let Some(last_payment) = last_payment else {
            return from_start;
        };

        let from_payment = Self::after_payment(last_payment, allowance_day, until);
        if from_start.is_done || from_start.cursor() >= from_payment.cursor() {
            from_start
        } else {
            from_payment
        }
    }

    fn cursor(&self) -> (i32, u8) {
        (self.year, u8::from(self.month))
    }

    fn advance_month(&mut self) {
        if self.month == Month::December {
            self.year += 1;
        }

        self.month = self.month.next();
    }
}

impl Iterator for Occurrences {
    type Item = Date;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_done {
            return None;
        }

        match occurrence_in_month(self.year, self.month, self.allowance_day) {
            Some(date) if date <= self.until => {
                self.advance_month();
                Some(date)
            }
            _ => {
                self.is_done = true;
                None
            }
        }
    }
}

/// The date the allowance falls due in the given month.
///
/// Returns `None` only if the date is outside the range `time` supports.
pub fn occurrence_in_month(year: i32, month: Month, allowance_day: AllowanceDay) -> Option<Date> {
    let day = allowance_day.get().min(days_in_month(year, month)?);

    Date::from_calendar_date(year, month, day).ok()
}

fn days_in_month(year: i32, month: Month) -> Option<u8> {
    if month == Month::December {
        return Some(31);
    }

    Date::from_calendar_date(year, month.next(), 1)
        .ok()?
        .previous_day()
        .map(|date| date.day())
}

#[cfg(test)]
mod tests {
    use time::{Month, macros::date};

    use crate::child::AllowanceDay;

    use super::{Occurrences, days_in_month, occurrence_in_month};

    fn day(day: i64) -> AllowanceDay {
        AllowanceDay::new(day).unwrap()
    }

    #[test]
    fn first_occurrence_is_strictly_after_start_date() {
        let dates: Vec<_> =
            Occurrences::after_start(date!(2023 - 01 - 01), day(1), date!(2023 - 04 - 01))
                .collect();

        assert_eq!(
            dates,
            vec![
                date!(2023 - 02 - 01),
                date!(2023 - 03 - 01),
                date!(2023 - 04 - 01)
            ]
        );
    }

    #[test]
    fn first_occurrence_can_be_in_start_month() {
        let dates: Vec<_> =
            Occurrences::after_start(date!(2023 - 01 - 10), day(15), date!(2023 - 02 - 14))
                .collect();

        assert_eq!(dates, vec![date!(2023 - 01 - 15)]);
    }

    #[test]
    fn day_31_is_clamped_to_month_length() {
        let dates: Vec<_> =
            Occurrences::after_start(date!(2023 - 01 - 01), day(31), date!(2023 - 03 - 31))
                .collect();

        assert_eq!(
            dates,
            vec![
                date!(2023 - 01 - 31),
                date!(2023 - 02 - 28),
                date!(2023 - 03 - 31)
            ]
        );
    }

    #[test]
    fn clamps_to_leap_day() {
        assert_eq!(
            occurrence_in_month(2024, Month::February, day(31)),
            Some(date!(2024 - 02 - 29))
        );
        assert_eq!(
            occurrence_in_month(2023, Month::February, day(30)),
            Some(date!(2023 - 02 - 28))
        );
    }

    #[test]
    fn after_payment_starts_in_next_month() {
        let dates: Vec<_> =
            Occurrences::after_payment(date!(2023 - 02 - 28), day(31), date!(2023 - 04 - 30))
                .collect();

        assert_eq!(dates, vec![date!(2023 - 03 - 31), date!(2023 - 04 - 30)]);
    }

    #[test]
    fn after_payment_never_pays_twice_in_a_month() {
        let dates: Vec<_> =
            Occurrences::after_payment(date!(2023 - 03 - 01), day(20), date!(2023 - 03 - 31))
                .collect();

        assert!(dates.is_empty());
    }

    #[test]
    fn resume_without_payment_starts_after_start_date() {
        let dates: Vec<_> =
            Occurrences::resume(date!(2023 - 01 - 01), None, day(1), date!(2023 - 03 - 01))
                .collect();

        assert_eq!(dates, vec![date!(2023 - 02 - 01), date!(2023 - 03 - 01)]);
    }

    #[test]
    fn resume_skips_month_of_last_payment_when_start_moves_into_it() {
        let dates: Vec<_> = Occurrences::resume(
            date!(2023 - 03 - 05),
            Some(date!(2023 - 03 - 01)),
            day(20),
            date!(2023 - 04 - 30),
        )
        .collect();

        assert_eq!(dates, vec![date!(2023 - 04 - 20)]);
    }

    #[test]
    fn resume_uses_later_start_date() {
        let dates: Vec<_> = Occurrences::resume(
            date!(2023 - 05 - 15),
            Some(date!(2023 - 02 - 01)),
            day(1),
            date!(2023 - 07 - 01),
        )
        .collect();

        assert_eq!(dates, vec![date!(2023 - 06 - 01), date!(2023 - 07 - 01)]);
    }

    #[test]
    fn resume_uses_later_payment() {
        let dates: Vec<_> = Occurrences::resume(
            date!(2023 - 01 - 01),
            Some(date!(2023 - 03 - 01)),
            day(1),
            date!(2023 - 05 - 01),
        )
        .collect();

        assert_eq!(dates, vec![date!(2023 - 04 - 01), date!(2023 - 05 - 01)]);
    }

    #[test]
    fn crosses_year_boundary() {
        let dates: Vec<_> =
            Occurrences::after_payment(date!(2023 - 11 - 05), day(5), date!(2024 - 01 - 05))
                .collect();

        assert_eq!(dates, vec![date!(2023 - 12 - 05), date!(2024 - 01 - 05)]);
    }

    #[test]
    fn nothing_due_when_start_is_in_the_future() {
        let mut occurrences =
            Occurrences::after_start(date!(2024 - 01 - 01), day(1), date!(2023 - 06 - 01));

        assert_eq!(occurrences.next(), None);
    }

    #[test]
    fn today_is_inclusive() {
        let dates: Vec<_> =
            Occurrences::after_start(date!(2023 - 05 - 31), day(1), date!(2023 - 06 - 01))
                .collect();

        assert_eq!(dates, vec![date!(2023 - 06 - 01)]);
    }

    #[test]
    fn days_in_month_is_correct() {
        assert_eq!(days_in_month(2023, Month::January), Some(31));
        assert_eq!(days_in_month(2023, Month::April), Some(30));
        assert_eq!(days_in_month(2023, Month::February), Some(28));
        assert_eq!(days_in_month(2024, Month::February), Some(29));
        assert_eq!(days_in_month(2023, Month::December), Some(31));
    }
}
