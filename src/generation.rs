//! Materializes a template into a task and advances its rotation.
//!
//! A generation runs `validate -> resolve assignee -> build task -> advance`.
//! Rotation only advances after the task has been built, and the caller gets
//! the task and the advanced template together so both can be persisted in
//! one atomic write (see [`GenerationUnit`]).

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::error::ScheduleError;
use crate::lifecycle::UnassignedPolicy;
use crate::models::{Assignment, GeneratedTask, MemberId, TaskRecord, Template};
use crate::projection;
use crate::repository::{AttachmentStore, GenerationUnit, StoreError};
use crate::rotation;

/// Caller-supplied parameters for one generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Current local time; also the default due date.
    pub now: NaiveDateTime,
    pub due_date: Option<NaiveDate>,
    /// One-off assignee for this task. Rotation still advances.
    pub assignee_override: Option<MemberId>,
    /// Reject with [`ScheduleError::NotDue`] if the template does not project on the due date.
    pub only_if_due: bool,
}

impl GenerationRequest {
    pub fn at(now: NaiveDateTime) -> Self {
        GenerationRequest { now, due_date: None, assignee_override: None, only_if_due: false }
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn assign_to(mut self, member: impl Into<MemberId>) -> Self {
        self.assignee_override = Some(member.into());
        self
    }

    pub fn only_if_due(mut self) -> Self {
        self.only_if_due = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationPolicy {
    pub unassigned: UnassignedPolicy,
}

/// The new task plus the template state to persist with it.
#[derive(Debug, Clone)]
pub struct Generation {
    pub task: GeneratedTask,
    pub template: Template,
    /// The stored rotation index was out of bounds and was reset to 0.
    pub rotation_clamped: bool,
}

/// Runs one generation against `template`. Nothing is mutated on failure.
pub fn generate<A>(
    template: &Template,
    request: &GenerationRequest,
    policy: GenerationPolicy,
    attachments: &mut A,
) -> Result<Generation, ScheduleError>
where
    A: AttachmentStore + ?Sized,
{
    validate(template, policy)?;

    let due_date = request.due_date.unwrap_or_else(|| request.now.date());
    if request.only_if_due && !projection::is_due_on(template, due_date) {
        return Err(ScheduleError::NotDue { template_id: template.id, date: due_date });
    }

    let (resolved, rotation_index, rotation_clamped) = match &template.assignment {
        Assignment::Fixed { assignee } => (assignee.clone(), None, false),
        Assignment::Rotation { order, current_index } => {
            let (index, clamped) = rotation::normalize_index(order, *current_index);
            if clamped {
                warn!(
                    template_id = template.id,
                    stored_index = *current_index,
                    members = order.len(),
                    "rotation index out of bounds, restarting rotation at first member"
                );
            }
            let member = rotation::peek_next(order, index)?.clone();
            (Some(member), Some(index), clamped)
        }
    };
    debug!(template_id = template.id, assignee = ?resolved, "assignee resolved");

    let copied = if template.attachments.is_empty() {
        Vec::new()
    } else {
        attachments
            .copy_attachments(&template.attachments)
            .map_err(|e| ScheduleError::Attachment(e.to_string()))?
    };

    let task = GeneratedTask {
        group_id: template.group_id.clone(),
        source_template_id: template.id,
        title: template.title.clone(),
        description: template.description.clone(),
        priority: template.priority,
        assigned_to: request.assignee_override.clone().or(resolved),
        due_date,
        attachments: copied,
        created_at: request.now,
    };

    let mut updated = template.clone();
    if let (Assignment::Rotation { order, current_index }, Some(index)) = (&mut updated.assignment, rotation_index) {
        *current_index = rotation::advance(order, index);
    }
    updated.last_generated_at = Some(request.now);
    updated.refresh_suggestion();

    info!(
        template_id = template.id,
        due = %task.due_date,
        assigned_to = ?task.assigned_to,
        next = ?updated.next_suggested_assignee,
        "task generated"
    );
    Ok(Generation { task, template: updated, rotation_clamped })
}

/// Loads a template, generates from it and commits both halves atomically.
pub fn generate_and_commit<S>(
    store: &mut S,
    group_id: &str,
    template_id: u64,
    request: &GenerationRequest,
    policy: GenerationPolicy,
) -> Result<(Template, TaskRecord), StoreError>
where
    S: GenerationUnit + AttachmentStore,
{
    let template = store
        .get_by_id(group_id, template_id)?
        .ok_or_else(|| StoreError::TemplateNotFound { group_id: group_id.to_string(), template_id })?;
    let generation = generate(&template, request, policy, store)?;
    store.commit_generation(&generation)
}

fn validate(template: &Template, policy: GenerationPolicy) -> Result<(), ScheduleError> {
    if !template.is_active {
        return Err(ScheduleError::InactiveTemplate(template.id));
    }
    match &template.assignment {
        Assignment::Rotation { order, .. } if order.is_empty() => Err(ScheduleError::InvalidStrategyConfig(
            "rotation strategy with an empty rotation order".into(),
        )),
        Assignment::Fixed { assignee: None } if policy.unassigned == UnassignedPolicy::Reject => Err(
            ScheduleError::InvalidStrategyConfig("fixed strategy without an assignee".into()),
        ),
        _ => Ok(()),
    }
}
