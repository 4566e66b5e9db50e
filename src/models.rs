use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Raw member identifier. Display names are resolved by the member directory.
pub type MemberId = String;

/// Task priority, copied verbatim into generated tasks.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::UnknownPriority(other.to_string())),
        }
    }
}

/// How often a template comes due, with only the due-day fields valid for each cadence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Frequency {
    /// Every calendar day.
    Daily,
    /// Every matching weekday (0 = Sunday .. 6 = Saturday).
    Weekly { days: BTreeSet<u8> },
    /// Every other matching weekday.
    ///
    /// Without an `anchor` the phase restarts at the first match of each month.
    /// With one, "on" weeks are an even number of weeks away from the anchor's week.
    Biweekly {
        days: BTreeSet<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        anchor: Option<NaiveDate>,
    },
    /// One day of the month, clamped down in shorter months.
    Monthly { day: u8 },
}

impl Frequency {
    pub fn name(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly { .. } => "weekly",
            Frequency::Biweekly { .. } => "biweekly",
            Frequency::Monthly { .. } => "monthly",
        }
    }

    /// The `dueDays` view of this frequency, as shown to users.
    pub fn due_days(&self) -> Vec<u8> {
        match self {
            Frequency::Daily => Vec::new(),
            Frequency::Weekly { days } | Frequency::Biweekly { days, .. } => days.iter().copied().collect(),
            Frequency::Monthly { day } => vec![*day],
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly { days } | Frequency::Biweekly { days, .. } => {
                let names: Vec<&str> = days
                    .iter()
                    .filter_map(|d| crate::calendar::WEEKDAY_NAMES.get(*d as usize).copied())
                    .collect();
                write!(f, "{} ({})", self.name(), names.join(","))
            }
            Frequency::Monthly { day } => write!(f, "monthly (day {})", day),
        }
    }
}

/// Who gets each generated task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum Assignment {
    /// Always the same member. `None` means generated tasks are unassigned.
    Fixed {
        #[serde(default)]
        assignee: Option<MemberId>,
    },
    /// Round robin over `order`; `current_index` is whose turn is next.
    Rotation {
        order: Vec<MemberId>,
        #[serde(default)]
        current_index: usize,
    },
}

impl Assignment {
    pub fn name(&self) -> &'static str {
        match self {
            Assignment::Fixed { .. } => "fixed",
            Assignment::Rotation { .. } => "rotation",
        }
    }
}

/// A stored file reference. Copies get a fresh id and path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Unique identifier of this copy.
    pub id: Uuid,
    /// Original file name, shown to users.
    pub file_name: String,
    /// Location of the stored bytes.
    pub path: PathBuf,
}

/// The durable configuration for a repeating chore.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Unique identifier for the template.
    pub id: u64,
    /// Group (household) owning the template.
    pub group_id: String,
    /// Title copied into each generated task.
    pub title: String,
    /// Description copied into each generated task.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub frequency: Frequency,
    pub assignment: Assignment,
    /// Inactive templates are never projected or generated from.
    pub is_active: bool,
    /// When a task was last generated. Audit only.
    #[serde(default)]
    pub last_generated_at: Option<NaiveDateTime>,
    /// Cached read model, recomputed by [`Template::refresh_suggestion`].
    #[serde(default)]
    pub next_suggested_assignee: Option<MemberId>,
    /// Files copied into each generated task.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Optimistic concurrency token, bumped by the repository on every write.
    #[serde(default)]
    pub version: u64,
}

impl Template {
    /// Who the next generation would assign, without advancing anything.
    pub fn suggested_assignee(&self) -> Option<MemberId> {
        match &self.assignment {
            Assignment::Fixed { assignee } => assignee.clone(),
            Assignment::Rotation { order, current_index } => {
                crate::rotation::peek_next(order, *current_index).ok().cloned()
            }
        }
    }

    /// Recomputes `next_suggested_assignee` from the assignment state.
    pub fn refresh_suggestion(&mut self) {
        self.next_suggested_assignee = self.suggested_assignee();
    }
}

/// One calendar date on which a template is due.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub template_id: u64,
}

/// A task materialized from a template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTask {
    pub group_id: String,
    /// Template this task was generated from.
    pub source_template_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    /// Resolved member id; `None` when unassigned.
    pub assigned_to: Option<MemberId>,
    pub due_date: NaiveDate,
    /// Independent copies of the template's attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: NaiveDateTime,
}

/// A generated task as kept by the task repository.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: u64,
    #[serde(default)]
    pub completed: bool,
    #[serde(flatten)]
    pub task: GeneratedTask,
}

/// A household member.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

/// A household sharing templates and tasks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
}
