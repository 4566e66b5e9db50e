//! Collaborator interfaces the engine relies on.
//!
//! Implementations must apply [`GenerationUnit::commit_generation`] as one
//! atomic unit guarded per template; the engine does no locking of its own.
//! Two generations racing on one template otherwise skip or repeat a turn.

use thiserror::Error;

use crate::error::ScheduleError;
use crate::generation::Generation;
use crate::models::{Attachment, GeneratedTask, Group, MemberId, TaskRecord, Template};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template {template_id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict { template_id: u64, expected: u64, found: u64 },

    #[error("template {template_id} not found in group '{group_id}'")]
    TemplateNotFound { group_id: String, template_id: u64 },

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("group '{0}' not found")]
    GroupNotFound(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

pub trait TemplateRepository {
    fn get_by_id(&self, group_id: &str, template_id: u64) -> Result<Option<Template>, StoreError>;
    fn list(&self, group_id: &str) -> Result<Vec<Template>, StoreError>;
    fn list_active(&self, group_id: &str) -> Result<Vec<Template>, StoreError> {
        let mut templates = self.list(group_id)?;
        templates.retain(|t| t.is_active);
        Ok(templates)
    }
    /// Allocates an id for a template about to be created.
    fn next_template_id(&self) -> Result<u64, StoreError>;
    /// Inserts or updates. Updates must match the stored `version`.
    fn save(&mut self, template: &Template) -> Result<Template, StoreError>;
    /// Deletes the template and the attachments it owns. Returns whether it existed.
    fn delete(&mut self, group_id: &str, template_id: u64) -> Result<bool, StoreError>;
}

pub trait TaskRepository {
    fn create(&mut self, task: &GeneratedTask) -> Result<TaskRecord, StoreError>;
    fn list_tasks(&self, group_id: &str) -> Result<Vec<TaskRecord>, StoreError>;
    fn complete(&mut self, group_id: &str, task_id: u64) -> Result<TaskRecord, StoreError>;
}

pub trait AttachmentStore {
    /// Duplicates the referenced files; the copies are independent of the sources.
    fn copy_attachments(&mut self, sources: &[Attachment]) -> Result<Vec<Attachment>, StoreError>;
}

pub trait MemberDirectory {
    fn group(&self, group_id: &str) -> Result<Option<Group>, StoreError>;
    fn display_name(&self, group_id: &str, member: &MemberId) -> Option<String> {
        self.group(group_id)
            .ok()
            .flatten()
            .and_then(|g| g.members.into_iter().find(|m| &m.id == member))
            .map(|m| m.name)
    }
}

pub trait GenerationUnit: TemplateRepository + TaskRepository {
    /// Writes the advanced template and inserts the task together, or neither.
    fn commit_generation(&mut self, generation: &Generation) -> Result<(Template, TaskRecord), StoreError>;
}
