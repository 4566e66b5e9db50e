use chrono::{Local, NaiveDate};
use ratatui::widgets::TableState;
use std::collections::BTreeMap;

use crate::calendar::YearMonth;
use crate::commands::{cmd_generate, cmd_template_remove, cmd_template_toggle, open_store};
use crate::config::Config;
use crate::models::Template;
use crate::projection;
use crate::repository::{MemberDirectory, TemplateRepository};

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub config: Config,
    pub group_id: String,
    pub window: YearMonth,
    pub today: NaiveDate,
    /// All templates in the group, paused ones included.
    pub templates: Vec<Template>,
    /// Titles of active templates due on each day of `window`.
    pub occurrences: BTreeMap<NaiveDate, Vec<String>>,
    pub template_state: TableState,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub status: String,
}

impl App {
    /// Creates a new App instance and loads initial data.
    pub fn new(config: Config, group_id: String) -> anyhow::Result<App> {
        let today = Local::now().date_naive();
        let mut app = App {
            config,
            group_id,
            window: YearMonth::of(today),
            today,
            templates: Vec::new(),
            occurrences: BTreeMap::new(),
            template_state: TableState::default(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            status: String::new(),
        };
        app.reload()?;
        if !app.templates.is_empty() {
            app.template_state.select(Some(0));
        }
        Ok(app)
    }

    /// Reloads templates from storage and re-projects the visible month.
    pub fn reload(&mut self) -> anyhow::Result<()> {
        let store = open_store(&self.config)?;
        self.templates = store.list(&self.group_id)?;
        self.project();
        if let Some(i) = self.template_state.selected() {
            if i >= self.templates.len() {
                self.template_state.select(self.templates.len().checked_sub(1));
            }
        }
        Ok(())
    }

    fn project(&mut self) {
        self.occurrences = projection::aggregate(&self.templates, self.window)
            .into_iter()
            .map(|(date, ts)| (date, ts.into_iter().map(|t| t.title.clone()).collect()))
            .collect();
    }

    fn reload_or_report(&mut self) {
        if let Err(e) = self.reload() {
            self.status = format!("Reload failed: {:#}", e);
        }
    }

    pub fn selected(&self) -> Option<&Template> {
        self.template_state.selected().and_then(|i| self.templates.get(i))
    }

    /// Dates in the visible month when the selected template is due.
    pub fn selected_dates(&self) -> Vec<NaiveDate> {
        self.selected()
            .map(|t| projection::project_dates(t, self.window))
            .unwrap_or_default()
    }

    /// Display name for a member id, falling back to the id.
    pub fn member_name(&self, member: Option<&String>) -> String {
        let Some(id) = member else {
            return "unassigned".to_string();
        };
        open_store(&self.config)
            .ok()
            .and_then(|s| s.display_name(&self.group_id, id))
            .unwrap_or_else(|| id.clone())
    }

    /// Selects the next template.
    pub fn next(&mut self) {
        if self.templates.is_empty() { return; }
        let i = match self.template_state.selected() {
            Some(i) if i + 1 < self.templates.len() => i + 1,
            _ => 0,
        };
        self.template_state.select(Some(i));
    }

    /// Selects the previous template.
    pub fn previous(&mut self) {
        if self.templates.is_empty() { return; }
        let i = match self.template_state.selected() {
            Some(0) | None => self.templates.len() - 1,
            Some(i) => i - 1,
        };
        self.template_state.select(Some(i));
    }

    pub fn next_month(&mut self) {
        self.window = self.window.next();
        self.project();
    }

    pub fn prev_month(&mut self) {
        self.window = self.window.prev();
        self.project();
    }

    pub fn this_month(&mut self) {
        self.window = YearMonth::of(self.today);
        self.project();
    }

    /// Pauses or resumes the selected template.
    pub fn toggle_selected(&mut self) {
        let Some(id) = self.selected().map(|t| t.id) else { return };
        self.status = match cmd_template_toggle(&self.config, Some(self.group_id.clone()), id, true) {
            Ok(()) => format!("Template {} toggled.", id),
            Err(e) => format!("Toggle failed: {:#}", e),
        };
        self.reload_or_report();
    }

    /// Deletes the selected template.
    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected().map(|t| t.id) else { return };
        self.status = match cmd_template_remove(&self.config, Some(self.group_id.clone()), id, true) {
            Ok(()) => format!("Template {} removed.", id),
            Err(e) => format!("Remove failed: {:#}", e),
        };
        self.reload_or_report();
    }

    /// Generates today's task from the selected template.
    pub fn generate_selected(&mut self, assignee: Option<String>) {
        let Some(id) = self.selected().map(|t| t.id) else { return };
        let result = cmd_generate(&self.config, Some(self.group_id.clone()), id, None, assignee, false, true);
        self.reload_or_report();
        self.status = match result {
            Ok(task_id) => {
                let next = self.selected().and_then(|t| t.next_suggested_assignee.clone());
                format!("Task {} created. Next up: {}", task_id, self.member_name(next.as_ref()))
            }
            Err(e) => format!("Generate failed: {:#}", e),
        };
    }

    /// Prompts for a one-off assignee before generating.
    pub fn start_override(&mut self) {
        if self.selected().is_none() { return; }
        self.input_mode = InputMode::Editing;
        self.input_buffer.clear();
    }

    pub fn handle_input(&mut self) {
        let input = self.input_buffer.trim().to_string();
        self.input_buffer.clear();
        self.input_mode = InputMode::Normal;
        if input.is_empty() {
            return;
        }
        self.generate_selected(Some(input));
    }
}
