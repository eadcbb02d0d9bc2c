//! Dashboard projections: role-scoped KPI counts and schedule status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Progress;

/// Active/on-hold/total counts for a resource class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Records counted as running.
    pub active: usize,
    /// Records currently on hold.
    pub on_hold: usize,
    /// All records.
    pub total: usize,
}

/// Schedule position of a project relative to its planned end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeStatus {
    /// Work is fully complete, regardless of dates.
    Completed,
    /// Days left until the planned end.
    Remaining(i64),
    /// Days past the planned end.
    Overdue(i64),
    /// No planned end recorded.
    Unscheduled,
}

impl std::fmt::Display for TimeStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => formatter.write_str("Completed"),
            Self::Remaining(days) => write!(formatter, "{days}d remaining"),
            Self::Overdue(days) => write!(formatter, "{days}d over"),
            Self::Unscheduled => formatter.write_str("N/A"),
        }
    }
}

/// Computes the schedule position of a piece of work at `now`.
///
/// Completion wins over dates; partial days round up so a deadline later
/// today still counts as one day remaining.
#[must_use]
pub fn time_status(
    end_date: Option<DateTime<Utc>>,
    progress: Progress,
    now: DateTime<Utc>,
) -> TimeStatus {
    if progress.is_complete() {
        return TimeStatus::Completed;
    }

    let Some(end) = end_date else {
        return TimeStatus::Unscheduled;
    };

    let seconds = (end - now).num_seconds();
    let days = seconds.div_euclid(86_400)
        + i64::from(seconds.rem_euclid(86_400) > 0);

    if days < 0 {
        TimeStatus::Overdue(-days)
    } else {
        TimeStatus::Remaining(days)
    }
}

/// One row of the unfinished-projects overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOverviewItem {
    /// Project name.
    pub name: String,
    /// Completion percentage.
    pub progress: Progress,
    /// Schedule position at the time the summary was built.
    pub time_status: TimeStatus,
}

/// Role-scoped workspace summary.
///
/// Employees receive the zeroed shape; managers and admins receive the full
/// counts. The shape is identical for both so consumers need no branching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Client counts by engagement status.
    pub clients: StatusCounts,
    /// Project counts by lifecycle status.
    pub projects: StatusCounts,
    /// Total workspace members.
    pub total_users: usize,
    /// Up to three unfinished projects, closest deadline first.
    pub overview: Vec<ProjectOverviewItem>,
}
