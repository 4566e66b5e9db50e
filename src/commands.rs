use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Datelike, Local, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::calendar::{self, YearMonth, WEEKDAY_NAMES};
use crate::config::Config;
use crate::generation::{generate_and_commit, GenerationRequest};
use crate::lifecycle::{apply_edit, toggle_active, validate_create, TemplateInput, TemplatePatch};
use crate::models::{Assignment, MemberId, Priority, Template};
use crate::projection;
use crate::repository::{MemberDirectory, TaskRepository, TemplateRepository};
use crate::storage::JsonStore;

/// Opens the store configured in `config`.
pub fn open_store(config: &Config) -> anyhow::Result<JsonStore> {
    JsonStore::open(&config.data_dir)
        .with_context(|| format!("failed to open data directory {}", config.data_dir.display()))
}

fn group_or_default(config: &Config, group: Option<String>) -> String {
    group.unwrap_or_else(|| config.default_group.clone())
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{}', use YYYY-MM-DD", s))
}

/// Turns `mon,wed` or `1,3` (weekly) and `31` (monthly) into due-day numbers.
pub fn parse_due_days(frequency: &str, raw: &[String]) -> anyhow::Result<Vec<u8>> {
    let monthly = frequency.trim().eq_ignore_ascii_case("monthly");
    raw.iter()
        .map(|s| {
            let parsed = if monthly { s.trim().parse::<u8>().ok() } else { calendar::parse_weekday(s) };
            parsed.with_context(|| format!("invalid due day '{}'", s))
        })
        .collect()
}

fn member_label(store: &JsonStore, group_id: &str, member: Option<&MemberId>) -> String {
    match member {
        Some(id) => store.display_name(group_id, id).unwrap_or_else(|| id.clone()),
        None => "unassigned".to_string(),
    }
}

fn find_template(store: &JsonStore, group_id: &str, id: u64) -> anyhow::Result<Template> {
    store
        .get_by_id(group_id, id)?
        .with_context(|| format!("template {} not found in group '{}'", id, group_id))
}

/// Adds a new group (household).
pub fn cmd_group_add(config: &Config, id: String, name: Option<String>, silent: bool) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let name = name.unwrap_or_else(|| id.clone());
    let group = store.add_group(&id, &name)?;
    if !silent { println!("Group '{}' ready.", group.id); }
    Ok(())
}

pub fn cmd_group_list(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    if store.groups().is_empty() {
        println!("No groups found.");
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["ID", "Name", "Members"]);
    for g in store.groups() {
        table.add_row(vec![g.id.clone(), g.name.clone(), g.members.len().to_string()]);
    }
    println!("{table}");
    Ok(())
}

/// Adds a member to a group, or renames an existing one.
pub fn cmd_member_add(config: &Config, group: Option<String>, id: String, name: Option<String>, silent: bool) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let mut store = open_store(config)?;
    let name = name.unwrap_or_else(|| id.clone());
    store.add_member(&group_id, &id, &name)?;
    if !silent { println!("Member '{}' added to '{}'.", id, group_id); }
    Ok(())
}

/// Removes a member. Rotations that still list them are reported, not rewritten.
pub fn cmd_member_remove(config: &Config, group: Option<String>, id: String, silent: bool) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let mut store = open_store(config)?;
    if !store.remove_member(&group_id, &id)? {
        bail!("member '{}' not found in '{}'", id, group_id);
    }
    if !silent {
        println!("Member '{}' removed.", id);
        for t in store.list(&group_id)? {
            if let Assignment::Rotation { order, .. } = &t.assignment {
                if order.contains(&id) {
                    println!("Template {} ('{}') still rotates through '{}'.", t.id, t.title, id);
                }
            }
        }
    }
    Ok(())
}

pub fn cmd_member_list(config: &Config, group: Option<String>) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let store = open_store(config)?;
    let group = store.group(&group_id)?.with_context(|| format!("group '{}' not found", group_id))?;
    if group.members.is_empty() {
        println!("No members found.");
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["ID", "Name"]);
    for m in group.members {
        table.add_row(vec![m.id, m.name]);
    }
    println!("{table}");
    Ok(())
}

/// Validates and stores a new template. Returns its id.
pub fn cmd_template_add(config: &Config, group: Option<String>, input: TemplateInput, silent: bool) -> anyhow::Result<u64> {
    let group_id = group_or_default(config, group);
    let mut store = open_store(config)?;
    let id = store.next_template_id()?;
    let template = validate_create(input, id, &group_id, config.unassigned_policy)?;
    let saved = store.save(&template)?;
    if !silent {
        println!(
            "Template added (id = {}), next up: {}",
            saved.id,
            member_label(&store, &group_id, saved.next_suggested_assignee.as_ref())
        );
    }
    Ok(saved.id)
}

/// Lists templates in a formatted table.
///
/// By default, hides inactive templates unless `all` is true.
pub fn cmd_template_list(config: &Config, group: Option<String>, all: bool) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let store = open_store(config)?;
    let templates = if all { store.list(&group_id)? } else { store.list_active(&group_id)? };
    if templates.is_empty() {
        println!("No templates found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Frequency").add_attribute(Attribute::Bold),
            Cell::new("Strategy").add_attribute(Attribute::Bold),
            Cell::new("Next Up").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Last Generated").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for t in templates {
        let priority_color = match t.priority {
            Priority::High => Color::Red,
            Priority::Medium => Color::Yellow,
            Priority::Low => Color::Green,
        };
        let (status, status_color) = if t.is_active { ("Active", Color::Green) } else { ("Paused", Color::Grey) };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.frequency.to_string()),
            Cell::new(t.assignment.name()),
            Cell::new(member_label(&store, &group_id, t.next_suggested_assignee.as_ref())),
            Cell::new(t.priority).fg(priority_color),
            Cell::new(t.last_generated_at.map(|d| d.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(status).fg(status_color),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub fn cmd_template_show(config: &Config, group: Option<String>, id: u64) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let store = open_store(config)?;
    let t = find_template(&store, &group_id, id)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec!["Title".to_string(), t.title.clone()]);
    table.add_row(vec!["Description".to_string(), t.description.clone()]);
    table.add_row(vec!["Priority".to_string(), t.priority.to_string()]);
    table.add_row(vec!["Frequency".to_string(), t.frequency.to_string()]);
    match &t.assignment {
        Assignment::Fixed { assignee } => {
            table.add_row(vec!["Assignee".to_string(), member_label(&store, &group_id, assignee.as_ref())]);
        }
        Assignment::Rotation { order, current_index } => {
            let names: Vec<String> = order
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    let label = member_label(&store, &group_id, Some(m));
                    if i == *current_index { format!("[{}]", label) } else { label }
                })
                .collect();
            table.add_row(vec!["Rotation".to_string(), names.join(" -> ")]);
        }
    }
    table.add_row(vec!["Active".to_string(), t.is_active.to_string()]);
    let files: Vec<&str> = t.attachments.iter().map(|a| a.file_name.as_str()).collect();
    table.add_row(vec!["Attachments".to_string(), files.join(", ")]);

    let upcoming = projection::project_dates(&t, YearMonth::of(Local::now().date_naive()));
    let upcoming: Vec<String> = upcoming.iter().map(|d| d.format("%a %d").to_string()).collect();
    table.add_row(vec!["This month".to_string(), upcoming.join(", ")]);

    println!("Template {}", t.id);
    println!("{table}");
    Ok(())
}

/// Edits an existing template's details.
pub fn cmd_template_edit(config: &Config, group: Option<String>, id: u64, patch: TemplatePatch, silent: bool) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let mut store = open_store(config)?;
    let template = find_template(&store, &group_id, id)?;
    let edited = apply_edit(&template, patch, config.unassigned_policy)?;
    store.save(&edited)?;
    if !silent { println!("Template {} updated.", id); }
    Ok(())
}

/// Pauses an active template or resumes a paused one.
pub fn cmd_template_toggle(config: &Config, group: Option<String>, id: u64, silent: bool) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let mut store = open_store(config)?;
    let template = find_template(&store, &group_id, id)?;
    let saved = store.save(&toggle_active(&template))?;
    if !silent {
        println!("Template {} is now {}.", id, if saved.is_active { "active" } else { "paused" });
    }
    Ok(())
}

/// Removes a template and the attachments it owns. Generated tasks are kept.
pub fn cmd_template_remove(config: &Config, group: Option<String>, id: u64, silent: bool) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let mut store = open_store(config)?;
    if !store.delete(&group_id, id)? {
        bail!("template {} not found in group '{}'", id, group_id);
    }
    if !silent { println!("Template {} removed.", id); }
    Ok(())
}

pub fn cmd_template_attach(config: &Config, group: Option<String>, id: u64, file: PathBuf, silent: bool) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let mut store = open_store(config)?;
    let saved = store
        .attach_file(&group_id, id, &file)
        .with_context(|| format!("failed to attach {}", file.display()))?;
    if !silent { println!("Attached {} to template {} ({} file(s)).", file.display(), id, saved.attachments.len()); }
    Ok(())
}

/// Prints a month grid of every active template's occurrences.
pub fn cmd_calendar(config: &Config, group: Option<String>, year: Option<i32>, month: Option<u32>) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let store = open_store(config)?;
    let today = Local::now().date_naive();
    let window = YearMonth::new(year.unwrap_or(today.year()), month.unwrap_or(today.month()))?;
    let templates = store.list_active(&group_id)?;
    let by_date = projection::aggregate(&templates, window);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(WEEKDAY_NAMES.iter().map(|d| Cell::new(d).add_attribute(Attribute::Bold)));

    let lead = calendar::weekday_index(window.first_day()) as usize;
    let mut week: Vec<Cell> = (0..lead).map(|_| Cell::new("")).collect();
    for date in window.first_day().iter_days().take(window.days() as usize) {
        let mut text = date.day().to_string();
        for t in by_date.get(&date).into_iter().flatten() {
            text.push_str(&format!("\n{}", t.title));
        }
        let cell = if date == today { Cell::new(text).add_attribute(Attribute::Bold).fg(Color::Cyan) } else { Cell::new(text) };
        week.push(cell);
        if week.len() == 7 {
            table.add_row(std::mem::take(&mut week));
        }
    }
    if !week.is_empty() {
        while week.len() < 7 {
            week.push(Cell::new(""));
        }
        table.add_row(week);
    }

    println!("Calendar {} ({})", window, group_id);
    println!("{table}");
    Ok(())
}

/// Generates the next task from a template and advances its rotation. Returns the task id.
pub fn cmd_generate(
    config: &Config,
    group: Option<String>,
    id: u64,
    due: Option<String>,
    assignee: Option<String>,
    only_if_due: bool,
    silent: bool,
) -> anyhow::Result<u64> {
    let group_id = group_or_default(config, group);
    let mut store = open_store(config)?;
    let mut request = GenerationRequest::at(Local::now().naive_local());
    if let Some(d) = due {
        request = request.due(parse_date(&d)?);
    }
    if let Some(a) = assignee {
        request = request.assign_to(a);
    }
    if only_if_due {
        request = request.only_if_due();
    }

    let (template, record) = generate_and_commit(&mut store, &group_id, id, &request, config.generation_policy())?;
    if !silent {
        println!(
            "Task {} created for {} due {}. Next up: {}",
            record.id,
            member_label(&store, &group_id, record.task.assigned_to.as_ref()),
            record.task.due_date,
            member_label(&store, &group_id, template.next_suggested_assignee.as_ref()),
        );
    }
    Ok(record.id)
}

/// Lists generated tasks by due date.
///
/// By default, hides completed tasks unless `all` is true.
pub fn cmd_tasks(config: &Config, group: Option<String>, all: bool) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let store = open_store(config)?;
    let mut tasks = store.list_tasks(&group_id)?;
    if !all {
        tasks.retain(|t| !t.completed);
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    tasks.sort_by_key(|t| (t.task.due_date, t.id));

    let today = Local::now().date_naive();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Assigned").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("Template").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for t in tasks {
        let overdue = !t.completed && t.task.due_date < today;
        let status = if t.completed { "Done" } else { "Pending" };
        let status_color = if t.completed { Color::Green } else { Color::Yellow };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.task.title),
            Cell::new(member_label(&store, &group_id, t.task.assigned_to.as_ref())),
            Cell::new(t.task.due_date).fg(if overdue { Color::Red } else { Color::Reset }),
            Cell::new(t.task.source_template_id),
            Cell::new(status).fg(status_color),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Marks a generated task as complete.
pub fn cmd_complete(config: &Config, group: Option<String>, task_id: u64, silent: bool) -> anyhow::Result<()> {
    let group_id = group_or_default(config, group);
    let mut store = open_store(config)?;
    store.complete(&group_id, task_id)?;
    if !silent { println!("Task {} marked as complete.", task_id); }
    Ok(())
}

/// Resets the database by deleting all groups, templates, tasks and attachments.
pub fn cmd_reset(config: &Config, force: bool) -> anyhow::Result<()> {
    if !force {
        print!("Are you sure you want to delete all templates, tasks and attachments? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    open_store(config)?.reset()?;
    println!("Database reset successfully.");
    Ok(())
}
