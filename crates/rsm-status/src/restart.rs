//! Weekly restart countdown from the in-simulation clock.
//!
//! The server-info feed reports a weekly clock like `"Monday 05:59"`. The
//! server restarts when that clock rolls over from Saturday 23:59 into
//! Sunday. One real minute is `ratio` simulated minutes.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: i64 = 24 * 60;
const MINUTES_PER_WEEK: i64 = 7 * MINUTES_PER_DAY;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestartPolicy {
    pub ratio: u32,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self { ratio: 60 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartCountdown {
    /// Real minutes until the next restart (floored).
    pub real_minutes: u32,
}

impl RestartCountdown {
    /// `"Next restart in ~2 hours and 18 minutes"`, or `"Restarting now"`.
    pub fn describe(&self) -> String {
        let h = self.real_minutes / 60;
        let m = self.real_minutes % 60;
        let hs = match h {
            0 => String::new(),
            1 => "1 hour".to_string(),
            n => format!("{n} hours"),
        };
        let ms = match m {
            0 => String::new(),
            1 => "1 minute".to_string(),
            n => format!("{n} minutes"),
        };
        match (hs.is_empty(), ms.is_empty()) {
            (true, true) => "Restarting now".to_string(),
            (false, false) => format!("Next restart in ~{hs} and {ms}"),
            (false, true) => format!("Next restart in ~{hs}"),
            (true, false) => format!("Next restart in ~{ms}"),
        }
    }
}

/// Parse `"<Weekday> HH:MM"` and compute the countdown. `None` when the
/// string does not parse.
pub fn restart_countdown(sim_time: &str, policy: RestartPolicy) -> Option<RestartCountdown> {
    let (day, clock) = sim_time.trim().split_once(' ')?;
    let weekday: Weekday = day.trim().parse().ok()?;
    let (hh, mm) = clock.trim().split_once(':')?;
    let hh: i64 = hh.parse().ok()?;
    let mm: i64 = mm.parse().ok()?;
    if !(0..24).contains(&hh) || !(0..60).contains(&mm) {
        return None;
    }

    // Sunday 00:00 is a whole week away; Saturday 23:59 is one minute away.
    let since_rollover =
        i64::from(weekday.num_days_from_sunday()) * MINUTES_PER_DAY + hh * 60 + mm;
    let sim_minutes = MINUTES_PER_WEEK - since_rollover;
    let real = sim_minutes / i64::from(policy.ratio.max(1));

    Some(RestartCountdown {
        real_minutes: u32::try_from(real).unwrap_or(u32::MAX),
    })
}
