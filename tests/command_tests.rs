use chorewheel::commands::*;
use chorewheel::config::Config;
use chorewheel::generation::{generate, GenerationPolicy, GenerationRequest};
use chorewheel::lifecycle::{TemplateInput, TemplatePatch, UnassignedPolicy};
use chorewheel::models::{Assignment, Attachment, Frequency};
use chorewheel::repository::{GenerationUnit, StoreError, TaskRepository, TemplateRepository};
use chorewheel::tui::app::App;
use chorewheel::tui::ui::ui;
use chorewheel::JsonStore;
use chrono::Local;
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use std::fs;
use tempfile::TempDir;
use uuid::Uuid;

fn with_test_db<F>(f: F)
where
    F: FnOnce(&Config),
{
    let dir = TempDir::new().unwrap();
    let config = Config::with_data_dir(dir.path());
    cmd_group_add(&config, "home".into(), Some("Flat 12".into()), true).unwrap();
    for (id, name) in [("ana", "Ana"), ("ben", "Ben"), ("cy", "Cy")] {
        cmd_member_add(&config, None, id.into(), Some(name.into()), true).unwrap();
    }
    f(&config);
}

fn rotation_input(title: &str) -> TemplateInput {
    TemplateInput {
        title: title.into(),
        frequency: "weekly".into(),
        due_days: vec![1, 4],
        strategy: "rotation".into(),
        rotation_order: vec!["ana".into(), "ben".into(), "cy".into()],
        ..Default::default()
    }
}

#[test]
fn test_add_and_list_templates() {
    with_test_db(|config| {
        let id = cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        let store = open_store(config).unwrap();
        let templates = store.list("home").unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id, id);
        assert_eq!(templates[0].title, "Bins");
        assert_eq!(templates[0].version, 1);
        assert_eq!(templates[0].next_suggested_assignee.as_deref(), Some("ana"));
    });
}

#[test]
fn test_template_needs_existing_group() {
    with_test_db(|config| {
        let err = cmd_template_add(config, Some("nowhere".into()), rotation_input("Bins"), true).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    });
}

#[test]
fn test_invalid_template_is_not_stored() {
    with_test_db(|config| {
        let mut input = rotation_input("Bins");
        input.frequency = "monthly".into();
        input.due_days = vec![1, 15];
        assert!(cmd_template_add(config, None, input, true).is_err());
        assert!(open_store(config).unwrap().list("home").unwrap().is_empty());
    });
}

#[test]
fn test_generate_rotates_and_persists() {
    with_test_db(|config| {
        let id = cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        for _ in 0..4 {
            cmd_generate(config, None, id, Some("2024-03-04".into()), None, false, true).unwrap();
        }

        let store = open_store(config).unwrap();
        let assigned: Vec<String> = store
            .list_tasks("home")
            .unwrap()
            .into_iter()
            .map(|t| t.task.assigned_to.unwrap())
            .collect();
        assert_eq!(assigned, vec!["ana", "ben", "cy", "ana"]);

        let template = store.get_by_id("home", id).unwrap().unwrap();
        assert_eq!(template.next_suggested_assignee.as_deref(), Some("ben"));
        assert!(template.last_generated_at.is_some());
        assert_eq!(template.version, 5);
    });
}

#[test]
fn test_paused_template_cannot_generate() {
    with_test_db(|config| {
        let id = cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        cmd_template_toggle(config, None, id, true).unwrap();
        let before = open_store(config).unwrap().get_by_id("home", id).unwrap().unwrap();
        assert!(!before.is_active);

        assert!(cmd_generate(config, None, id, None, None, false, true).is_err());

        let store = open_store(config).unwrap();
        let after = store.get_by_id("home", id).unwrap().unwrap();
        assert_eq!(after, before);
        assert!(store.list_tasks("home").unwrap().is_empty());

        cmd_template_toggle(config, None, id, true).unwrap();
        assert!(cmd_generate(config, None, id, None, None, false, true).is_ok());
    });
}

#[test]
fn test_edit_template() {
    with_test_db(|config| {
        let id = cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        let patch = TemplatePatch {
            title: Some("Recycling".into()),
            frequency: Some("monthly".into()),
            due_days: Some(vec![31]),
            ..Default::default()
        };
        cmd_template_edit(config, None, id, patch, true).unwrap();

        let t = open_store(config).unwrap().get_by_id("home", id).unwrap().unwrap();
        assert_eq!(t.title, "Recycling");
        assert_eq!(t.frequency, Frequency::Monthly { day: 31 });
        assert_eq!(t.version, 2);
    });
}

#[test]
fn test_complete_task() {
    with_test_db(|config| {
        let id = cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        let task_id = cmd_generate(config, None, id, None, Some("ben".into()), false, true).unwrap();
        cmd_complete(config, None, task_id, true).unwrap();

        let tasks = open_store(config).unwrap().list_tasks("home").unwrap();
        assert!(tasks[0].completed);
        assert_eq!(tasks[0].task.assigned_to.as_deref(), Some("ben"));
        assert_eq!(tasks[0].task.due_date, Local::now().date_naive());
    });
}

#[test]
fn test_attachments_survive_template_removal() {
    with_test_db(|config| {
        let id = cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        let source = config.data_dir.join("schedule.txt");
        fs::write(&source, "collection days").unwrap();
        cmd_template_attach(config, None, id, source.clone(), true).unwrap();
        cmd_generate(config, None, id, None, None, false, true).unwrap();

        let store = open_store(config).unwrap();
        let template_copy = store.get_by_id("home", id).unwrap().unwrap().attachments[0].path.clone();
        let task_copy = store.list_tasks("home").unwrap()[0].task.attachments[0].path.clone();
        assert_ne!(template_copy, task_copy);

        cmd_template_remove(config, None, id, true).unwrap();
        assert!(!template_copy.exists());
        assert_eq!(fs::read_to_string(&task_copy).unwrap(), "collection days");
        assert!(source.exists());
    });
}

#[test]
fn test_stale_generation_conflicts() {
    with_test_db(|config| {
        let id = cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        let mut first = JsonStore::open(&config.data_dir).unwrap();
        let mut second = JsonStore::open(&config.data_dir).unwrap();
        let template = first.get_by_id("home", id).unwrap().unwrap();
        let stale = second.get_by_id("home", id).unwrap().unwrap();

        let request = GenerationRequest::at(Local::now().naive_local());
        let g1 = generate(&template, &request, GenerationPolicy::default(), &mut first).unwrap();
        first.commit_generation(&g1).unwrap();

        let g2 = generate(&stale, &request, GenerationPolicy::default(), &mut second).unwrap();
        let err = second.commit_generation(&g2).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, found: 2, .. }));

        let store = open_store(config).unwrap();
        assert_eq!(store.list_tasks("home").unwrap().len(), 1);
        match store.get_by_id("home", id).unwrap().unwrap().assignment {
            Assignment::Rotation { current_index, .. } => assert_eq!(current_index, 1),
            other => panic!("unexpected assignment {:?}", other),
        }
    });
}

#[test]
fn test_template_id_from_other_group_is_not_found() {
    with_test_db(|config| {
        let id = cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        cmd_group_add(config, "work".into(), None, true).unwrap();

        let mut store = open_store(config).unwrap();
        let mut moved = store.get_by_id("home", id).unwrap().unwrap();
        moved.group_id = "work".into();
        let err = store.save(&moved).unwrap_err();
        assert!(matches!(err, StoreError::TemplateNotFound { template_id, ref group_id } if template_id == id && group_id == "work"));
        assert_eq!(store.get_by_id("home", id).unwrap().unwrap().version, 1);
    });
}

#[test]
fn test_edit_shrinking_rotation_keeps_suggestion() {
    with_test_db(|config| {
        let id = cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        for _ in 0..2 {
            cmd_generate(config, None, id, None, None, false, true).unwrap();
        }
        let patch = TemplatePatch {
            rotation_order: Some(vec!["ana".into(), "ben".into()]),
            ..Default::default()
        };
        cmd_template_edit(config, None, id, patch, true).unwrap();

        let t = open_store(config).unwrap().get_by_id("home", id).unwrap().unwrap();
        assert_eq!(t.next_suggested_assignee.as_deref(), Some("ana"));
        let task_id = cmd_generate(config, None, id, None, None, false, true).unwrap();
        let tasks = open_store(config).unwrap().list_tasks("home").unwrap();
        let task = tasks.iter().find(|r| r.id == task_id).unwrap();
        assert_eq!(task.task.assigned_to.as_deref(), Some("ana"));
    });
}

#[test]
fn test_discard_attachments_survives_unremovable_copy() {
    with_test_db(|config| {
        let store = open_store(config).unwrap();
        let blocked = config.data_dir.join("not-a-file");
        fs::create_dir_all(&blocked).unwrap();
        let stray = Attachment { id: Uuid::new_v4(), file_name: "x".into(), path: blocked.clone() };
        let gone = Attachment {
            id: Uuid::new_v4(),
            file_name: "y".into(),
            path: config.data_dir.join("y.txt"),
        };
        fs::write(&gone.path, "y").unwrap();

        store.discard_attachments(&[stray, gone.clone()]);
        assert!(blocked.is_dir());
        assert!(!gone.path.exists());
    });
}

#[test]
fn test_ui_shows_member_names() {
    with_test_db(|config| {
        cmd_template_add(config, None, rotation_input("Bins"), true).unwrap();
        let mut app = App::new(config.clone(), "home".into()).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let screen: String = terminal.backend().buffer().content().iter().map(|c| c.symbol()).collect();
        assert!(screen.contains("Ana"));
    });
}

#[test]
fn test_reject_policy_from_config() {
    with_test_db(|config| {
        let mut strict = config.clone();
        strict.unassigned_policy = UnassignedPolicy::Reject;
        let input = TemplateInput {
            title: "Plants".into(),
            frequency: "daily".into(),
            strategy: "fixed".into(),
            ..Default::default()
        };
        assert!(cmd_template_add(&strict, None, input.clone(), true).is_err());
        assert!(cmd_template_add(config, None, input, true).is_ok());
    });
}

#[test]
fn test_parse_due_days() {
    let weekly = parse_due_days("weekly", &["mon".into(), "thu".into()]).unwrap();
    assert_eq!(weekly, vec![1, 4]);
    let monthly = parse_due_days("monthly", &["31".into()]).unwrap();
    assert_eq!(monthly, vec![31]);
    assert!(parse_due_days("monthly", &["mon".into()]).is_err());
}
