use chrono::{Days, NaiveDate, NaiveDateTime, TimeDelta};
use log::debug;

use crate::data::TimeSlot;
use crate::error::PlannerError;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// The window exams may be placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    pub days: u32,
    pub slots_per_day: u32,
    /// Start of the first slot on the first day.
    pub anchor: NaiveDateTime,
}

impl Default for Horizon {
    fn default() -> Self {
        let anchor = NaiveDate::from_ymd_opt(2024, 12, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("2024-12-01 09:00 is a valid date");
        Self {
            days: 5,
            slots_per_day: 4,
            anchor,
        }
    }
}

impl Horizon {
    pub fn slot_count(&self) -> usize {
        self.days as usize * self.slots_per_day as usize
    }
}

/// Ordered slot starts, day by day. Consumed once.
#[derive(Debug, Clone)]
pub struct TimeSlots {
    horizon: Horizon,
    step: TimeDelta,
    next: usize,
}

impl TimeSlots {
    pub fn new(
        duration_minutes: i64,
        break_minutes: i64,
        horizon: Horizon,
    ) -> Result<Self, PlannerError> {
        if duration_minutes <= 0 {
            return Err(PlannerError::InvalidParameter(format!(
                "slot duration must be positive, got {duration_minutes} minutes"
            )));
        }
        if break_minutes < 0 {
            return Err(PlannerError::InvalidParameter(format!(
                "break duration must not be negative, got {break_minutes} minutes"
            )));
        }
        if horizon.days == 0 || horizon.slots_per_day == 0 {
            return Err(PlannerError::InvalidParameter(format!(
                "horizon must contain at least one slot, got {} days x {} slots",
                horizon.days, horizon.slots_per_day
            )));
        }

        let step_minutes = duration_minutes.saturating_add(break_minutes);
        let last_offset = step_minutes.saturating_mul(i64::from(horizon.slots_per_day) - 1);
        if last_offset >= MINUTES_PER_DAY {
            return Err(PlannerError::InvalidParameter(format!(
                "{} slots of {step_minutes} minutes run into the next day",
                horizon.slots_per_day
            )));
        }
        if horizon
            .anchor
            .checked_add_days(Days::new(u64::from(horizon.days)))
            .is_none()
        {
            return Err(PlannerError::InvalidParameter(
                "horizon extends past the representable calendar".to_string(),
            ));
        }

        let step = TimeDelta::try_minutes(step_minutes).ok_or_else(|| {
            PlannerError::InvalidParameter(format!(
                "slot step of {step_minutes} minutes is too large"
            ))
        })?;

        Ok(Self {
            horizon,
            step,
            next: 0,
        })
    }

    fn slot_at(&self, index: usize) -> Option<TimeSlot> {
        let per_day = self.horizon.slots_per_day as usize;
        let (day, slot) = (index / per_day, index % per_day);
        let offset = self.step.checked_mul(i32::try_from(slot).ok()?)?;
        self.horizon
            .anchor
            .checked_add_days(Days::new(day as u64))?
            .checked_add_signed(offset)
    }
}

impl Iterator for TimeSlots {
    type Item = TimeSlot;

    fn next(&mut self) -> Option<TimeSlot> {
        if self.next >= self.horizon.slot_count() {
            return None;
        }
        let slot = self.slot_at(self.next);
        self.next += 1;
        slot
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.horizon.slot_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimeSlots {}

/// Generates every slot of the horizon, strictly increasing.
pub fn generate_time_slots(
    duration_minutes: i64,
    break_minutes: i64,
    horizon: &Horizon,
) -> Result<Vec<TimeSlot>, PlannerError> {
    let slots: Vec<TimeSlot> = TimeSlots::new(duration_minutes, break_minutes, *horizon)?.collect();
    debug!(
        "Generated {} time slots ({} min exams, {} min breaks) starting {}",
        slots.len(),
        duration_minutes,
        break_minutes,
        horizon.anchor
    );
    Ok(slots)
}
