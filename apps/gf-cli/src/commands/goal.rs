// goal.rs — Goal subcommands: create, update, restructure, progress, inspect.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use gf_goal::{GoalNode, GoalPatch, GoalService, NewGoal};

use crate::config::{CliPaths, Session};

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Create a new goal, optionally under a parent.
    Create {
        /// Goal title (e.g., "Learn React").
        title: String,
        /// Parent goal ID; omit to create a root goal.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Deadline as RFC 3339 or YYYY-MM-DD.
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// Initial progress (clamped to 0..=100).
        #[arg(long, allow_negative_numbers = true)]
        progress: Option<i64>,
        /// Task IDs to link at creation (repeatable).
        #[arg(long = "task")]
        tasks: Vec<String>,
    },
    /// Update a goal's descriptive fields.
    Update {
        /// Goal ID.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        /// Deadline as RFC 3339 or YYYY-MM-DD.
        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<String>,
        #[arg(long)]
        clear_deadline: bool,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Append a note to a goal.
    Note {
        /// Goal ID.
        id: String,
        text: String,
    },
    /// Delete a goal and all of its descendants.
    Delete {
        /// Goal ID.
        id: String,
    },
    /// Make CHILD a sub-goal of PARENT.
    Attach { parent: String, child: String },
    /// Detach CHILD from PARENT, making it a root goal.
    Detach { parent: String, child: String },
    /// Set a goal's progress directly.
    Progress {
        /// Goal ID.
        id: String,
        /// New progress value (rounded, then clamped to 0..=100).
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Link an external task to a goal.
    Link { id: String, task: String },
    /// Unlink an external task from a goal.
    Unlink { id: String, task: String },
    /// Show details for a single goal.
    Show {
        /// Goal ID.
        id: String,
    },
    /// Print the goal hierarchy.
    Tree {
        /// Print only the subtree under this goal.
        id: Option<String>,
    },
}

pub fn execute(cmd: &GoalCommands, paths: &CliPaths) -> anyhow::Result<()> {
    let session = Session::open(paths)?;
    let svc = &session.service;

    let mutated = match cmd {
        GoalCommands::Create {
            title,
            parent,
            description,
            deadline,
            icon,
            color,
            progress,
            tasks,
        } => {
            let mut fields = NewGoal::new(title.as_str());
            if let Some(d) = description {
                fields = fields.with_description(d.as_str());
            }
            if let Some(d) = deadline {
                fields = fields.with_deadline(parse_deadline(d)?);
            }
            if let Some(i) = icon {
                fields = fields.with_icon(i.as_str());
            }
            if let Some(c) = color {
                fields = fields.with_color(c.as_str());
            }
            if let Some(p) = progress {
                fields = fields.with_progress(*p);
            }
            for task in tasks {
                fields = fields.with_task(task.as_str());
            }
            create_goal(svc, fields, parent.as_deref())?;
            true
        }
        GoalCommands::Update {
            id,
            title,
            description,
            clear_description,
            deadline,
            clear_deadline,
            icon,
            color,
        } => {
            let mut patch = GoalPatch::new();
            if let Some(t) = title {
                patch = patch.title(t.as_str());
            }
            if *clear_description {
                patch = patch.description(None);
            } else if let Some(d) = description {
                patch = patch.description(Some(d.clone()));
            }
            if *clear_deadline {
                patch = patch.deadline(None);
            } else if let Some(d) = deadline {
                patch = patch.deadline(Some(parse_deadline(d)?));
            }
            if let Some(i) = icon {
                patch = patch.icon(Some(i.clone()));
            }
            if let Some(c) = color {
                patch = patch.color(Some(c.clone()));
            }
            if patch.is_empty() {
                println!("Nothing to update.");
                false
            } else {
                let goal = svc.update_goal(id, patch)?;
                println!("Updated goal: {} ({})", goal.title, goal.id);
                true
            }
        }
        GoalCommands::Note { id, text } => {
            let goal = svc.add_note(id, text)?;
            println!("Added note to {} ({} note(s)).", goal.title, goal.notes.len());
            true
        }
        GoalCommands::Delete { id } => {
            let removed = svc.delete_goal(id)?;
            println!("Deleted {} goal(s).", removed.len());
            true
        }
        GoalCommands::Attach { parent, child } => {
            svc.add_child(parent, child)?;
            println!("Attached {} under {}.", child, parent);
            true
        }
        GoalCommands::Detach { parent, child } => {
            svc.remove_child(parent, child)?;
            println!("Detached {} from {}; it is now a root goal.", child, parent);
            true
        }
        GoalCommands::Progress { id, value } => {
            let goal = svc.set_progress(id, *value)?;
            println!("{}: {}% ({})", goal.title, goal.progress, goal.status());
            true
        }
        GoalCommands::Link { id, task } => {
            if svc.link_task(id, task)? {
                println!("Linked task {} to {}.", task, id);
            } else {
                println!("Task {} already linked to {}.", task, id);
            }
            true
        }
        GoalCommands::Unlink { id, task } => {
            if svc.unlink_task(id, task)? {
                println!("Unlinked task {} from {}.", task, id);
            } else {
                println!("Task {} was not linked to {}.", task, id);
            }
            true
        }
        GoalCommands::Show { id } => {
            show_goal(svc, id)?;
            false
        }
        GoalCommands::Tree { id } => {
            print_tree(svc, id.as_deref())?;
            false
        }
    };

    if mutated {
        session.save()?;
    }
    Ok(())
}

fn create_goal(svc: &GoalService, fields: NewGoal, parent: Option<&str>) -> anyhow::Result<()> {
    let goal = svc.create_goal(fields, parent)?;
    tracing::info!(goal_id = %goal.id, "goal created");

    println!("Goal created: {}", goal.id);
    println!("  Title:    {}", goal.title);
    if let Some(parent_id) = goal.parent_id {
        println!("  Parent:   {}", parent_id);
    }
    println!("  Progress: {}%", goal.progress);
    Ok(())
}

fn show_goal(svc: &GoalService, id: &str) -> anyhow::Result<()> {
    let goal = match svc.get_node(id)? {
        Some(g) => g,
        None => {
            eprintln!("Goal not found: {}", id);
            std::process::exit(1);
        }
    };
    let summary = svc.get_progress_summary(id)?;

    println!("Goal:     {}", goal.id);
    println!("Title:    {}", goal.title);
    if let Some(ref description) = goal.description {
        println!("About:    {}", description);
    }
    println!("Status:   {}", goal.status());
    println!("Progress: {}%", goal.progress);
    if let Some(parent_id) = goal.parent_id {
        println!("Parent:   {}", parent_id);
    }
    if let Some(deadline) = goal.deadline {
        println!("Deadline: {}", deadline.to_rfc3339());
    }
    if let Some(ref icon) = goal.icon {
        println!("Icon:     {}", icon);
    }
    if let Some(ref color) = goal.color {
        println!("Color:    {}", color);
    }
    println!("Created:  {}", goal.created_at.to_rfc3339());
    println!("Updated:  {}", goal.updated_at.to_rfc3339());
    if summary.total_descendants > 0 {
        println!(
            "Subgoals: {}/{} complete ({}%)",
            summary.completed_descendants, summary.total_descendants, summary.percent_complete
        );
    }
    if !goal.task_ids.is_empty() {
        let tasks: Vec<&str> = goal.task_ids.iter().map(|t| t.as_str()).collect();
        println!("Tasks:    {}", tasks.join(", "));
    }
    for note in &goal.notes {
        println!("  - {}", note);
    }

    Ok(())
}

fn print_tree(svc: &GoalService, id: Option<&str>) -> anyhow::Result<()> {
    let tops = match id {
        Some(id) => match svc.get_node(id)? {
            Some(g) => vec![g],
            None => {
                eprintln!("Goal not found: {}", id);
                std::process::exit(1);
            }
        },
        None => svc.get_roots()?,
    };

    if tops.is_empty() {
        println!("No goals found.");
        return Ok(());
    }

    let mut lines = Vec::new();
    for goal in &tops {
        tree_lines(svc, goal, 0, &mut lines)?;
    }
    for line in &lines {
        println!("{}", line);
    }
    Ok(())
}

fn tree_lines(
    svc: &GoalService,
    goal: &GoalNode,
    depth: usize,
    out: &mut Vec<String>,
) -> anyhow::Result<()> {
    out.push(format!(
        "{}[{:>3}%] {:<40} {}",
        "  ".repeat(depth),
        goal.progress,
        truncate(&goal.title, 38),
        goal.id
    ));
    for child in svc.get_children(&goal.id.to_string())? {
        tree_lines(svc, &child, depth + 1, out)?;
    }
    Ok(())
}

fn parse_deadline(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid deadline '{}': expected RFC 3339 or YYYY-MM-DD", raw))?;
    date.and_hms_opt(23, 59, 59)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| anyhow::anyhow!("invalid deadline '{}'", raw))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
