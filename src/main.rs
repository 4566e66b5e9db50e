//! # Chorewheel
//!
//! Recurring chores for shared households. Define a chore once, see on a
//! calendar when it is due, and generate tasks that rotate fairly through
//! the people who live with you.
//!
//! ## Usage
//!
//! ```bash
//! chorewheel group add home --name "Flat 12"
//! chorewheel member add ana --name Ana
//! chorewheel member add ben --name Ben
//!
//! # Bins every Monday and Thursday, alternating between Ana and Ben
//! chorewheel template add "Take out bins" -f weekly --days mon,thu --rotation ana,ben
//!
//! # Pay rent on the last day of every month
//! chorewheel template add "Pay rent" -f monthly --days 31 --fixed ana --priority high
//!
//! chorewheel calendar --month 3
//! chorewheel generate 1
//! chorewheel tasks
//! ```
//!
//! Running without arguments opens the interactive calendar.
//!
//! ## Configuration
//!
//! * `CHOREWHEEL_DB`: data directory (default: the platform data directory).
//! * `CHOREWHEEL_GROUP`: group used when `--group` is not given (default `home`).
//! * `CHOREWHEEL_UNASSIGNED`: `accept` or `reject` fixed templates without an assignee.
//! * `RUST_LOG`: log filter, e.g. `chorewheel=debug`.
//!
//! A `.env` file in the working directory is read first.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chorewheel::commands::*;
use chorewheel::config::{load_dotenv, Config};
use chorewheel::lifecycle::{TemplateInput, TemplatePatch};
use chorewheel::tui::run_tui;

#[derive(Parser)]
#[command(name = "chorewheel", version)]
#[command(about = "Recurring chores and fair rotations for shared households", long_about = None)]
struct Cli {
    /// Group (household) to operate on
    #[arg(short, long, global = true)]
    group: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage groups
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Manage group members
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
    /// Manage recurring task templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Show a month of occurrences for all active templates
    Calendar {
        #[arg(short, long)]
        year: Option<i32>,
        /// Month number (1-12)
        #[arg(short, long)]
        month: Option<u32>,
    },
    /// Generate the next task from a template
    Generate {
        /// Template ID
        id: u64,
        /// Due date in YYYY-MM-DD (default: today)
        #[arg(short, long)]
        due: Option<String>,
        /// Assign this one task to someone else; the rotation still moves on
        #[arg(short, long)]
        assignee: Option<String>,
        /// Only generate if the template is due on the due date
        #[arg(long)]
        only_if_due: bool,
    },
    /// List generated tasks
    Tasks {
        /// Show completed tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Mark a generated task as complete
    Complete {
        id: u64,
    },
    /// Reset the database (delete everything)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive calendar
    Ui,
}

#[derive(Subcommand)]
enum GroupCommands {
    /// Add a new group
    Add {
        /// Group ID
        id: String,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List groups
    List,
}

#[derive(Subcommand)]
enum MemberCommands {
    /// Add (or rename) a member
    Add {
        /// Member ID
        id: String,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Remove a member
    Remove {
        id: String,
    },
    /// List members
    List,
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Add a new template
    Add {
        /// Template title (quoted if it has spaces)
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// low, medium or high
        #[arg(short, long)]
        priority: Option<String>,
        /// daily, weekly, biweekly or monthly
        #[arg(short, long, default_value = "weekly")]
        frequency: String,
        /// Weekdays (mon,thu or 1,4) or a day of month (31)
        #[arg(long, value_delimiter = ',')]
        days: Vec<String>,
        /// Anchor date for biweekly phase (YYYY-MM-DD)
        #[arg(long)]
        anchor: Option<String>,
        /// Always assign this member
        #[arg(long, conflicts_with = "rotation")]
        fixed: Option<String>,
        /// Rotate through these members in order
        #[arg(long, value_delimiter = ',')]
        rotation: Vec<String>,
    },
    /// List templates
    List {
        /// Include paused templates
        #[arg(short, long)]
        all: bool,
    },
    /// Show a template in detail
    Show {
        id: u64,
    },
    /// Edit a template
    Edit {
        id: u64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<String>,
        #[arg(short, long)]
        frequency: Option<String>,
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<String>>,
        #[arg(long)]
        anchor: Option<String>,
        /// fixed or rotation
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        fixed: Option<String>,
        #[arg(long, value_delimiter = ',')]
        rotation: Option<Vec<String>>,
    },
    /// Pause or resume a template
    Toggle {
        id: u64,
    },
    /// Remove a template
    Remove {
        id: u64,
    },
    /// Attach a file that is copied into every generated task
    Attach {
        id: u64,
        file: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn parse_anchor(anchor: Option<String>) -> anyhow::Result<Option<chrono::NaiveDate>> {
    anchor
        .map(|a| chrono::NaiveDate::parse_from_str(&a, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid anchor date: {}", e))
}

fn run(cli: Cli, config: &Config) -> anyhow::Result<()> {
    let group = cli.group;
    match cli.command {
        Some(Commands::Group { command }) => match command {
            GroupCommands::Add { id, name } => cmd_group_add(config, id, name, false),
            GroupCommands::List => cmd_group_list(config),
        },
        Some(Commands::Member { command }) => match command {
            MemberCommands::Add { id, name } => cmd_member_add(config, group, id, name, false),
            MemberCommands::Remove { id } => cmd_member_remove(config, group, id, false),
            MemberCommands::List => cmd_member_list(config, group),
        },
        Some(Commands::Template { command }) => match command {
            TemplateCommands::Add { title, description, priority, frequency, days, anchor, fixed, rotation } => {
                let input = TemplateInput {
                    title,
                    description,
                    priority,
                    due_days: parse_due_days(&frequency, &days)?,
                    frequency,
                    biweekly_anchor: parse_anchor(anchor)?,
                    strategy: if rotation.is_empty() { "fixed".into() } else { "rotation".into() },
                    fixed_assignee: fixed,
                    rotation_order: rotation,
                };
                cmd_template_add(config, group, input, false).map(|_| ())
            }
            TemplateCommands::List { all } => cmd_template_list(config, group, all),
            TemplateCommands::Show { id } => cmd_template_show(config, group, id),
            TemplateCommands::Edit { id, title, description, priority, frequency, days, anchor, strategy, fixed, rotation } => {
                let due_days = match &days {
                    Some(days) => {
                        // Day names are read against the new frequency, or the stored one.
                        let freq = match &frequency {
                            Some(f) => f.clone(),
                            None => current_frequency(config, group.clone(), id)?,
                        };
                        Some(parse_due_days(&freq, days)?)
                    }
                    None => None,
                };
                let patch = TemplatePatch {
                    title,
                    description,
                    priority,
                    frequency,
                    due_days,
                    biweekly_anchor: parse_anchor(anchor)?,
                    strategy,
                    fixed_assignee: fixed,
                    rotation_order: rotation,
                };
                cmd_template_edit(config, group, id, patch, false)
            }
            TemplateCommands::Toggle { id } => cmd_template_toggle(config, group, id, false),
            TemplateCommands::Remove { id } => cmd_template_remove(config, group, id, false),
            TemplateCommands::Attach { id, file } => cmd_template_attach(config, group, id, file, false),
        },
        Some(Commands::Calendar { year, month }) => cmd_calendar(config, group, year, month),
        Some(Commands::Generate { id, due, assignee, only_if_due }) => {
            cmd_generate(config, group, id, due, assignee, only_if_due, false).map(|_| ())
        }
        Some(Commands::Tasks { all }) => cmd_tasks(config, group, all),
        Some(Commands::Complete { id }) => cmd_complete(config, group, id, false),
        Some(Commands::Reset { force }) => cmd_reset(config, force),
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => anyhow::bail!("Unsupported shell: {}", shell),
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "chorewheel", &mut io::stdout());
            Ok(())
        }
        Some(Commands::Ui) | None => run_tui(config, group),
    }
}

fn current_frequency(config: &Config, group: Option<String>, id: u64) -> anyhow::Result<String> {
    use chorewheel::repository::TemplateRepository;
    let store = open_store(config)?;
    let group_id = group.unwrap_or_else(|| config.default_group.clone());
    let template = store
        .get_by_id(&group_id, id)?
        .ok_or_else(|| anyhow::anyhow!("template {} not found in group '{}'", id, group_id))?;
    Ok(template.frequency.name().to_string())
}

fn main() -> ExitCode {
    load_dotenv();
    init_tracing();
    let cli = Cli::parse();
    let config = Config::from_env();
    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
