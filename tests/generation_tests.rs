use chorewheel::generation::{generate, GenerationPolicy, GenerationRequest};
use chorewheel::lifecycle::UnassignedPolicy;
use chorewheel::models::{Assignment, Attachment, Frequency, Priority, Template};
use chorewheel::repository::{AttachmentStore, StoreError};
use chorewheel::ScheduleError;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use uuid::Uuid;

/// Records every copy request; optionally fails.
#[derive(Default)]
struct SpyAttachments {
    copies: usize,
    fail: bool,
}

impl AttachmentStore for SpyAttachments {
    fn copy_attachments(&mut self, sources: &[Attachment]) -> Result<Vec<Attachment>, StoreError> {
        if self.fail {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.copies += 1;
        Ok(sources
            .iter()
            .map(|a| Attachment {
                id: Uuid::new_v4(),
                file_name: a.file_name.clone(),
                path: PathBuf::from(format!("/copies/{}", a.file_name)),
            })
            .collect())
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(9, 30, 0).unwrap()
}

fn rotation_template(order: &[&str], current_index: usize) -> Template {
    let mut t = Template {
        id: 3,
        group_id: "home".into(),
        title: "Kitchen".into(),
        description: "Wipe surfaces".into(),
        priority: Priority::High,
        frequency: Frequency::Weekly { days: [1].into_iter().collect() },
        assignment: Assignment::Rotation {
            order: order.iter().map(|s| s.to_string()).collect(),
            current_index,
        },
        is_active: true,
        last_generated_at: None,
        next_suggested_assignee: None,
        attachments: Vec::new(),
        version: 4,
    };
    t.refresh_suggestion();
    t
}

fn fixed_template(assignee: Option<&str>) -> Template {
    let mut t = rotation_template(&["x"], 0);
    t.assignment = Assignment::Fixed { assignee: assignee.map(String::from) };
    t.refresh_suggestion();
    t
}

fn index_of(t: &Template) -> usize {
    match &t.assignment {
        Assignment::Rotation { current_index, .. } => *current_index,
        Assignment::Fixed { .. } => panic!("not a rotation"),
    }
}

#[test]
fn test_rotation_peeks_then_advances() {
    let t = rotation_template(&["A", "B", "C"], 2);
    assert_eq!(t.next_suggested_assignee.as_deref(), Some("C"));

    let g = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap();
    assert_eq!(g.task.assigned_to.as_deref(), Some("C"));
    assert_eq!(index_of(&g.template), 0);
    assert_eq!(g.template.next_suggested_assignee.as_deref(), Some("A"));
    assert_eq!(g.template.last_generated_at, Some(now()));
    assert!(!g.rotation_clamped);
}

#[test]
fn test_full_cycle_assigns_each_member_once() {
    let mut t = rotation_template(&["ana", "ben", "cy", "dee"], 1);
    let mut assigned = Vec::new();
    for _ in 0..4 {
        let g = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap();
        assigned.push(g.task.assigned_to.unwrap());
        t = g.template;
    }
    assert_eq!(assigned, vec!["ben", "cy", "dee", "ana"]);
    assert_eq!(index_of(&t), 1);
}

#[test]
fn test_task_snapshot_copies_fields() {
    let t = rotation_template(&["A"], 0);
    let due = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
    let g = generate(&t, &GenerationRequest::at(now()).due(due), GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap();
    assert_eq!(g.task.title, "Kitchen");
    assert_eq!(g.task.description, "Wipe surfaces");
    assert_eq!(g.task.priority, Priority::High);
    assert_eq!(g.task.source_template_id, 3);
    assert_eq!(g.task.group_id, "home");
    assert_eq!(g.task.due_date, due);
    assert_eq!(g.task.created_at, now());
}

#[test]
fn test_due_date_defaults_to_today() {
    let t = rotation_template(&["A"], 0);
    let g = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap();
    assert_eq!(g.task.due_date, now().date());
}

#[test]
fn test_fixed_strategy_never_rotates() {
    let mut t = fixed_template(Some("ana"));
    for _ in 0..3 {
        let g = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap();
        assert_eq!(g.task.assigned_to.as_deref(), Some("ana"));
        assert_eq!(g.template.assignment, t.assignment);
        assert_eq!(g.template.next_suggested_assignee.as_deref(), Some("ana"));
        t = g.template;
    }
}

#[test]
fn test_unassigned_fixed_is_accepted_by_default() {
    let t = fixed_template(None);
    let g = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap();
    assert_eq!(g.task.assigned_to, None);
    assert_eq!(g.template.next_suggested_assignee, None);
}

#[test]
fn test_unassigned_fixed_rejected_when_configured() {
    let t = fixed_template(None);
    let policy = GenerationPolicy { unassigned: UnassignedPolicy::Reject };
    let err = generate(&t, &GenerationRequest::at(now()), policy, &mut SpyAttachments::default()).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidStrategyConfig(_)));
}

#[test]
fn test_inactive_template_is_left_untouched() {
    let mut t = rotation_template(&["A", "B"], 1);
    t.is_active = false;
    let before = t.clone();
    let mut spy = SpyAttachments::default();
    let err = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut spy).unwrap_err();
    assert_eq!(err, ScheduleError::InactiveTemplate(3));
    assert_eq!(t, before);
    assert_eq!(spy.copies, 0);
}

#[test]
fn test_empty_rotation_is_invalid_config() {
    let t = rotation_template(&[], 0);
    let err = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidStrategyConfig(_)));
}

#[test]
fn test_override_does_not_change_rotation_turn_order() {
    let t = rotation_template(&["A", "B", "C"], 0);
    let request = GenerationRequest::at(now()).assign_to("guest");
    let g = generate(&t, &request, GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap();
    assert_eq!(g.task.assigned_to.as_deref(), Some("guest"));
    assert_eq!(index_of(&g.template), 1);
    assert_eq!(g.template.next_suggested_assignee.as_deref(), Some("B"));
}

#[test]
fn test_out_of_bounds_index_restarts_rotation() {
    // Index left over from when the order had five members.
    let t = rotation_template(&["A", "B"], 4);
    assert_eq!(t.next_suggested_assignee, None);
    let g = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap();
    assert!(g.rotation_clamped);
    assert_eq!(g.task.assigned_to.as_deref(), Some("A"));
    assert_eq!(index_of(&g.template), 1);
}

#[test]
fn test_only_if_due_rejects_off_days() {
    // Weekly on Mondays; 2024-03-05 is a Tuesday.
    let t = rotation_template(&["A", "B"], 0);
    let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let err = generate(
        &t,
        &GenerationRequest::at(now()).due(tuesday).only_if_due(),
        GenerationPolicy::default(),
        &mut SpyAttachments::default(),
    )
    .unwrap_err();
    assert_eq!(err, ScheduleError::NotDue { template_id: 3, date: tuesday });

    let g = generate(&t, &GenerationRequest::at(now()).only_if_due(), GenerationPolicy::default(), &mut SpyAttachments::default()).unwrap();
    assert_eq!(g.task.due_date, now().date());
}

#[test]
fn test_attachments_are_copied_not_shared() {
    let mut t = rotation_template(&["A"], 0);
    t.attachments.push(Attachment {
        id: Uuid::new_v4(),
        file_name: "rota.pdf".into(),
        path: PathBuf::from("/store/rota.pdf"),
    });
    let mut spy = SpyAttachments::default();
    let g = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut spy).unwrap();
    assert_eq!(spy.copies, 1);
    assert_eq!(g.task.attachments.len(), 1);
    assert_eq!(g.task.attachments[0].file_name, "rota.pdf");
    assert_ne!(g.task.attachments[0].id, t.attachments[0].id);
    assert_eq!(g.template.attachments, t.attachments);
}

#[test]
fn test_failed_attachment_copy_aborts_generation() {
    let mut t = rotation_template(&["A", "B"], 0);
    t.attachments.push(Attachment {
        id: Uuid::new_v4(),
        file_name: "rota.pdf".into(),
        path: PathBuf::from("/store/rota.pdf"),
    });
    let mut spy = SpyAttachments { copies: 0, fail: true };
    let err = generate(&t, &GenerationRequest::at(now()), GenerationPolicy::default(), &mut spy).unwrap_err();
    assert!(matches!(err, ScheduleError::Attachment(_)));
    assert_eq!(index_of(&t), 0);
}
