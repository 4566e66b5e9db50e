//! Template creation, edits and the active/inactive gate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::models::{Assignment, Frequency, MemberId, Priority, Template};
use crate::rotation;

/// What to do with a fixed-strategy template that has no assignee.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnassignedPolicy {
    /// Accept it; generated tasks are unassigned.
    #[default]
    Accept,
    /// Treat a missing assignee as a configuration error.
    Reject,
}

impl FromStr for UnassignedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Ok(UnassignedPolicy::Accept),
            "reject" => Ok(UnassignedPolicy::Reject),
            other => Err(format!("unknown unassigned policy '{}'", other)),
        }
    }
}

/// Raw template form, as submitted by a user.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TemplateInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `low`, `medium` or `high`; defaults to medium.
    #[serde(default)]
    pub priority: Option<String>,
    /// `daily`, `weekly`, `biweekly` or `monthly`.
    pub frequency: String,
    #[serde(default)]
    pub due_days: Vec<u8>,
    /// Optional phase anchor for biweekly templates.
    #[serde(default)]
    pub biweekly_anchor: Option<NaiveDate>,
    /// `fixed` or `rotation`.
    pub strategy: String,
    #[serde(default)]
    pub fixed_assignee: Option<MemberId>,
    #[serde(default)]
    pub rotation_order: Vec<MemberId>,
}

/// A partial edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TemplatePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    /// New frequency; takes `due_days` and `biweekly_anchor` with it.
    pub frequency: Option<String>,
    pub due_days: Option<Vec<u8>>,
    pub biweekly_anchor: Option<NaiveDate>,
    pub strategy: Option<String>,
    pub fixed_assignee: Option<MemberId>,
    pub rotation_order: Option<Vec<MemberId>>,
}

/// Validates a creation form into an active template with a fresh rotation.
pub fn validate_create(
    input: TemplateInput,
    id: u64,
    group_id: &str,
    policy: UnassignedPolicy,
) -> Result<Template, ValidationError> {
    let title = validate_title(&input.title)?;
    let priority = match input.priority.as_deref() {
        Some(p) => p.parse()?,
        None => Priority::default(),
    };
    let frequency = build_frequency(&input.frequency, &input.due_days, input.biweekly_anchor)?;
    let assignment = build_assignment(&input.strategy, input.fixed_assignee, input.rotation_order, policy)?;

    let mut template = Template {
        id,
        group_id: group_id.to_string(),
        title,
        description: input.description.trim().to_string(),
        priority,
        frequency,
        assignment,
        is_active: true,
        last_generated_at: None,
        next_suggested_assignee: None,
        attachments: Vec::new(),
        version: 0,
    };
    template.refresh_suggestion();
    debug!(template_id = id, group_id, frequency = template.frequency.name(), "template validated");
    Ok(template)
}

/// Applies an edit and revalidates the resulting shape.
///
/// Rotation position is kept when the strategy stays `rotation`, even if the
/// member order changed, unless it no longer fits the new order; then it
/// restarts at the first member. Switching into rotation also starts there.
pub fn apply_edit(
    template: &Template,
    patch: TemplatePatch,
    policy: UnassignedPolicy,
) -> Result<Template, ValidationError> {
    let mut updated = template.clone();

    if let Some(title) = patch.title {
        updated.title = validate_title(&title)?;
    }
    if let Some(description) = patch.description {
        updated.description = description.trim().to_string();
    }
    if let Some(priority) = patch.priority {
        updated.priority = priority.parse()?;
    }

    if patch.frequency.is_some() || patch.due_days.is_some() || patch.biweekly_anchor.is_some() {
        let name = patch.frequency.unwrap_or_else(|| template.frequency.name().to_string());
        let days = patch.due_days.unwrap_or_else(|| template.frequency.due_days());
        let anchor = patch.biweekly_anchor.or(match &template.frequency {
            Frequency::Biweekly { anchor, .. } => *anchor,
            _ => None,
        });
        updated.frequency = build_frequency(&name, &days, anchor)?;
    }

    if patch.strategy.is_some() || patch.fixed_assignee.is_some() || patch.rotation_order.is_some() {
        let name = patch.strategy.unwrap_or_else(|| template.assignment.name().to_string());
        let (old_assignee, old_order, old_index) = match &template.assignment {
            Assignment::Fixed { assignee } => (assignee.clone(), Vec::new(), None),
            Assignment::Rotation { order, current_index } => (None, order.clone(), Some(*current_index)),
        };
        let order = patch.rotation_order.unwrap_or(old_order);
        let assignee = patch.fixed_assignee.or(old_assignee);
        let mut assignment = build_assignment(&name, assignee, order, policy)?;
        if let (Assignment::Rotation { order, current_index }, Some(old)) = (&mut assignment, old_index) {
            let (index, reset) = rotation::normalize_index(order, old);
            if reset {
                warn!(template_id = template.id, old_index = old, len = order.len(), "rotation index out of range after edit, restarting at first member");
            }
            *current_index = index;
        }
        updated.assignment = assignment;
    }

    updated.refresh_suggestion();
    Ok(updated)
}

/// Flips the active gate. Nothing else changes.
pub fn toggle_active(template: &Template) -> Template {
    let mut toggled = template.clone();
    toggled.is_active = !toggled.is_active;
    toggled
}

fn validate_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(title.to_string())
}

fn build_frequency(
    name: &str,
    due_days: &[u8],
    anchor: Option<NaiveDate>,
) -> Result<Frequency, ValidationError> {
    match name.trim().to_lowercase().as_str() {
        "daily" => Ok(Frequency::Daily),
        "weekly" => Ok(Frequency::Weekly { days: weekdays(due_days, "weekly")? }),
        "biweekly" => Ok(Frequency::Biweekly { days: weekdays(due_days, "biweekly")?, anchor }),
        "monthly" => match due_days {
            [day] if (1..=31).contains(day) => Ok(Frequency::Monthly { day: *day }),
            [day] => Err(ValidationError::MonthDayOutOfRange(*day)),
            days => Err(ValidationError::WrongMonthDayCount(days.len())),
        },
        other => Err(ValidationError::UnknownFrequency(other.to_string())),
    }
}

fn weekdays(due_days: &[u8], frequency: &'static str) -> Result<BTreeSet<u8>, ValidationError> {
    if due_days.is_empty() {
        return Err(ValidationError::MissingDueDays(frequency));
    }
    if let Some(&bad) = due_days.iter().find(|&&d| d > 6) {
        return Err(ValidationError::WeekdayOutOfRange(bad));
    }
    Ok(due_days.iter().copied().collect())
}

fn build_assignment(
    name: &str,
    fixed_assignee: Option<MemberId>,
    rotation_order: Vec<MemberId>,
    policy: UnassignedPolicy,
) -> Result<Assignment, ValidationError> {
    match name.trim().to_lowercase().as_str() {
        "fixed" => {
            let assignee = fixed_assignee.filter(|a| !a.trim().is_empty());
            if assignee.is_none() && policy == UnassignedPolicy::Reject {
                return Err(ValidationError::MissingFixedAssignee);
            }
            Ok(Assignment::Fixed { assignee })
        }
        "rotation" => {
            let mut order: Vec<MemberId> = Vec::with_capacity(rotation_order.len());
            for member in rotation_order {
                let member = member.trim().to_string();
                if !member.is_empty() && !order.contains(&member) {
                    order.push(member);
                }
            }
            if order.is_empty() {
                return Err(ValidationError::EmptyRotationOrder);
            }
            Ok(Assignment::Rotation { order, current_index: 0 })
        }
        other => Err(ValidationError::UnknownStrategy(other.to_string())),
    }
}
