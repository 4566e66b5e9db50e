use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::generation::Generation;
use crate::models::{Attachment, GeneratedTask, Group, Member, TaskRecord, Template};
use crate::repository::{
    AttachmentStore, GenerationUnit, MemberDirectory, StoreError, TaskRepository, TemplateRepository,
};

const DB_FILE: &str = "chorewheel.json";
const ATTACHMENTS_DIR: &str = "attachments";

/// Everything the store keeps, written as a single JSON document.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct Database {
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default)]
    templates: Vec<Template>,
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

/// File-backed repository for groups, templates, tasks and attachments.
///
/// Every mutation re-reads the document from disk, applies the change and
/// replaces the file through a rename, so a generation commit lands as one
/// write. Template writes are checked against the stored `version`; a writer
/// holding a stale copy gets [`StoreError::Conflict`] instead of overwriting.
pub struct JsonStore {
    dir: PathBuf,
    db: Database,
}

impl JsonStore {
    /// Opens (or creates) a store in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let db = read_database(&dir.join(DB_FILE))?;
        debug!(dir = %dir.display(), templates = db.templates.len(), tasks = db.tasks.len(), "store opened");
        Ok(JsonStore { dir, db })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn db_path(&self) -> PathBuf {
        self.dir.join(DB_FILE)
    }

    fn attachments_dir(&self) -> PathBuf {
        self.dir.join(ATTACHMENTS_DIR)
    }

    /// Applies `f` to a fresh copy of the on-disk document and writes it back.
    fn mutate<T>(&mut self, f: impl FnOnce(&mut Database) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut db = read_database(&self.db_path())?;
        let out = f(&mut db)?;
        let path = self.db_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&db)?)?;
        fs::rename(&tmp, &path)?;
        self.db = db;
        Ok(out)
    }

    pub fn groups(&self) -> &[Group] {
        &self.db.groups
    }

    pub fn add_group(&mut self, id: &str, name: &str) -> Result<Group, StoreError> {
        let group = Group { id: id.to_string(), name: name.to_string(), members: Vec::new() };
        self.mutate(|db| {
            if let Some(existing) = db.groups.iter().find(|g| g.id == group.id) {
                return Ok(existing.clone());
            }
            db.groups.push(group.clone());
            Ok(group)
        })
    }

    /// Adds or renames a member.
    pub fn add_member(&mut self, group_id: &str, member_id: &str, name: &str) -> Result<Member, StoreError> {
        let member = Member { id: member_id.to_string(), name: name.to_string() };
        self.mutate(|db| {
            let group = find_group_mut(db, group_id)?;
            match group.members.iter_mut().find(|m| m.id == member.id) {
                Some(existing) => existing.name = member.name.clone(),
                None => group.members.push(member.clone()),
            }
            Ok(member)
        })
    }

    /// Removes a member from the group. Rotation orders are left as they are.
    pub fn remove_member(&mut self, group_id: &str, member_id: &str) -> Result<bool, StoreError> {
        self.mutate(|db| {
            let group = find_group_mut(db, group_id)?;
            let before = group.members.len();
            group.members.retain(|m| m.id != member_id);
            Ok(group.members.len() != before)
        })
    }

    /// Stores a copy of `source` and attaches it to the template.
    pub fn attach_file(&mut self, group_id: &str, template_id: u64, source: &Path) -> Result<Template, StoreError> {
        let mut template = self
            .get_by_id(group_id, template_id)?
            .ok_or_else(|| StoreError::TemplateNotFound { group_id: group_id.to_string(), template_id })?;
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let stored = self.store_file(source, &file_name)?;
        template.attachments.push(stored.clone());
        self.save(&template).inspect_err(|_| {
            let _ = fs::remove_file(&stored.path);
        })
    }

    /// Deletes the database and all stored attachments.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        remove_if_exists(&self.db_path())?;
        match fs::remove_dir_all(self.attachments_dir()) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        self.db = Database::default();
        info!(dir = %self.dir.display(), "store reset");
        Ok(())
    }

    fn store_file(&self, source: &Path, file_name: &str) -> Result<Attachment, StoreError> {
        let dir = self.attachments_dir();
        fs::create_dir_all(&dir)?;
        let id = Uuid::new_v4();
        let path = dir.join(format!("{}-{}", id, file_name));
        fs::copy(source, &path)?;
        Ok(Attachment { id, file_name: file_name.to_string(), path })
    }

    /// Removes files of attachments that never made it into a committed task.
    pub fn discard_attachments(&self, attachments: &[Attachment]) {
        for a in attachments {
            if let Err(e) = remove_if_exists(&a.path) {
                warn!(path = %a.path.display(), error = %e, "failed to remove attachment copy");
            }
        }
    }
}

impl TemplateRepository for JsonStore {
    fn get_by_id(&self, group_id: &str, template_id: u64) -> Result<Option<Template>, StoreError> {
        Ok(self
            .db
            .templates
            .iter()
            .find(|t| t.id == template_id && t.group_id == group_id)
            .cloned())
    }

    fn list(&self, group_id: &str) -> Result<Vec<Template>, StoreError> {
        Ok(self.db.templates.iter().filter(|t| t.group_id == group_id).cloned().collect())
    }

    fn next_template_id(&self) -> Result<u64, StoreError> {
        let on_disk = read_database(&self.db_path())?;
        Ok(on_disk.templates.iter().map(|t| t.id).max().unwrap_or(0) + 1)
    }

    fn save(&mut self, template: &Template) -> Result<Template, StoreError> {
        self.mutate(|db| {
            find_group_mut(db, &template.group_id)?;
            let saved = upsert_template(db, template)?;
            debug!(template_id = saved.id, version = saved.version, "template saved");
            Ok(saved)
        })
    }

    fn delete(&mut self, group_id: &str, template_id: u64) -> Result<bool, StoreError> {
        let removed = self.mutate(|db| {
            let position = db.templates.iter().position(|t| t.id == template_id && t.group_id == group_id);
            Ok(position.map(|i| db.templates.remove(i)))
        })?;
        match removed {
            Some(template) => {
                self.discard_attachments(&template.attachments);
                info!(template_id, group_id, "template deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl TaskRepository for JsonStore {
    fn create(&mut self, task: &GeneratedTask) -> Result<TaskRecord, StoreError> {
        self.mutate(|db| Ok(push_task(db, task)))
    }

    fn list_tasks(&self, group_id: &str) -> Result<Vec<TaskRecord>, StoreError> {
        Ok(self.db.tasks.iter().filter(|t| t.task.group_id == group_id).cloned().collect())
    }

    fn complete(&mut self, group_id: &str, task_id: u64) -> Result<TaskRecord, StoreError> {
        self.mutate(|db| {
            let record = db
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id && t.task.group_id == group_id)
                .ok_or(StoreError::TaskNotFound(task_id))?;
            record.completed = true;
            Ok(record.clone())
        })
    }
}

impl AttachmentStore for JsonStore {
    fn copy_attachments(&mut self, sources: &[Attachment]) -> Result<Vec<Attachment>, StoreError> {
        let mut copies = Vec::with_capacity(sources.len());
        for source in sources {
            match self.store_file(&source.path, &source.file_name) {
                Ok(copy) => copies.push(copy),
                Err(e) => {
                    self.discard_attachments(&copies);
                    return Err(e);
                }
            }
        }
        Ok(copies)
    }
}

impl MemberDirectory for JsonStore {
    fn group(&self, group_id: &str) -> Result<Option<Group>, StoreError> {
        Ok(self.db.groups.iter().find(|g| g.id == group_id).cloned())
    }
}

impl GenerationUnit for JsonStore {
    fn commit_generation(&mut self, generation: &Generation) -> Result<(Template, TaskRecord), StoreError> {
        let committed = self.mutate(|db| {
            let source = &generation.template;
            if !db.templates.iter().any(|t| t.id == source.id && t.group_id == source.group_id) {
                return Err(StoreError::TemplateNotFound {
                    group_id: source.group_id.clone(),
                    template_id: source.id,
                });
            }
            let template = upsert_template(db, source)?;
            let record = push_task(db, &generation.task);
            Ok((template, record))
        });
        match committed {
            Ok((template, record)) => {
                info!(template_id = template.id, task_id = record.id, version = template.version, "generation committed");
                Ok((template, record))
            }
            Err(e) => {
                self.discard_attachments(&generation.task.attachments);
                Err(e)
            }
        }
    }
}

fn read_database(path: &Path) -> Result<Database, StoreError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(serde_json::from_str(&s)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Database::default()),
        Err(e) => Err(e.into()),
    }
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn find_group_mut<'a>(db: &'a mut Database, group_id: &str) -> Result<&'a mut Group, StoreError> {
    db.groups
        .iter_mut()
        .find(|g| g.id == group_id)
        .ok_or_else(|| StoreError::GroupNotFound(group_id.to_string()))
}

/// Inserts a new template or replaces a stored one with a matching version.
fn upsert_template(db: &mut Database, template: &Template) -> Result<Template, StoreError> {
    let mut saved = template.clone();
    match db.templates.iter_mut().find(|t| t.id == template.id) {
        Some(stored) if stored.group_id != template.group_id => {
            return Err(StoreError::TemplateNotFound {
                group_id: template.group_id.clone(),
                template_id: template.id,
            });
        }
        Some(stored) => {
            if stored.version != template.version {
                return Err(StoreError::Conflict {
                    template_id: template.id,
                    expected: template.version,
                    found: stored.version,
                });
            }
            saved.version = stored.version + 1;
            *stored = saved.clone();
        }
        None => {
            saved.version = 1;
            db.templates.push(saved.clone());
        }
    }
    Ok(saved)
}

fn push_task(db: &mut Database, task: &GeneratedTask) -> TaskRecord {
    let id = db.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
    let record = TaskRecord { id, completed: false, task: task.clone() };
    db.tasks.push(record.clone());
    record
}
