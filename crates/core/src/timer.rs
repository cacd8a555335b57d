//! Packaging countdown and adherence tracking.
//!
//! Everything here is derived from `accepted_at` and the current time. Nothing
//! is stored between ticks, so values survive a restart unchanged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SlaConfig;
use crate::order::{Order, OrderPhase};

/// Remaining packaging time below which a countdown is flagged urgent.
const URGENT_THRESHOLD_MS: i64 = 60_000;

/// SLA adherence level of an accepted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceBand {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl AdherenceBand {
    /// Band for an elapsed time. Upper bounds are inclusive.
    pub fn from_elapsed(elapsed: Duration, sla: &SlaConfig) -> Self {
        let minutes = elapsed.num_milliseconds() as f64 / 60_000.0;
        if minutes <= sla.excellent_max_mins as f64 {
            AdherenceBand::Excellent
        } else if minutes <= sla.good_max_mins as f64 {
            AdherenceBand::Good
        } else if minutes <= sla.warning_max_mins as f64 {
            AdherenceBand::Warning
        } else {
            AdherenceBand::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdherenceBand::Excellent => "excellent",
            AdherenceBand::Good => "good",
            AdherenceBand::Warning => "warning",
            AdherenceBand::Critical => "critical",
        }
    }
}

/// Time left in the packaging window, clamped to zero.
///
/// A window too large to represent saturates instead of overflowing.
pub fn packaging_remaining(
    accepted_at: DateTime<Utc>,
    now: DateTime<Utc>,
    sla: &SlaConfig,
) -> Duration {
    let deadline = i64::try_from(sla.packaging_window_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|window| accepted_at.checked_add_signed(window));
    match deadline {
        Some(deadline) => (deadline - now).max(Duration::zero()),
        None => Duration::MAX,
    }
}

/// Time since acceptance. Never negative, even with a skewed clock.
pub fn adherence_elapsed(accepted_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - accepted_at).max(Duration::zero())
}

/// Render milliseconds as `m:ss`.
pub fn format_clock(ms: i64) -> String {
    let ms = ms.max(0);
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}

/// Packaging countdown of one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    pub remaining_ms: i64,
    pub display: String,
    pub expired: bool,
    pub urgent: bool,
}

/// Derived timer values of one order, recomputed every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTimers {
    pub order_id: String,
    pub status: OrderPhase,
    /// Present only while the order is packaging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<Countdown>,
    pub elapsed_ms: i64,
    pub elapsed_display: String,
    pub adherence: AdherenceBand,
}

impl OrderTimers {
    /// Timers for `order`, or `None` if the order is not tracked.
    pub fn compute(order: &Order, now: DateTime<Utc>, sla: &SlaConfig) -> Option<Self> {
        if !order.status.is_timed() {
            return None;
        }
        let accepted_at = order.accepted_at?;

        let countdown = (order.status == OrderPhase::Packaging).then(|| {
            let remaining_ms = packaging_remaining(accepted_at, now, sla).num_milliseconds();
            Countdown {
                remaining_ms,
                display: format_clock(remaining_ms),
                expired: remaining_ms == 0,
                urgent: remaining_ms < URGENT_THRESHOLD_MS,
            }
        });

        let elapsed = adherence_elapsed(accepted_at, now);
        Some(Self {
            order_id: order.id.clone(),
            status: order.status,
            countdown,
            elapsed_ms: elapsed.num_milliseconds(),
            elapsed_display: format_clock(elapsed.num_milliseconds()),
            adherence: AdherenceBand::from_elapsed(elapsed, sla),
        })
    }
}

/// Timers of every tracked order, in bucket order.
pub fn compute_all<'a>(
    orders: impl IntoIterator<Item = &'a Order>,
    now: DateTime<Utc>,
    sla: &SlaConfig,
) -> Vec<OrderTimers> {
    orders
        .into_iter()
        .filter_map(|o| OrderTimers::compute(o, now, sla))
        .collect()
}
