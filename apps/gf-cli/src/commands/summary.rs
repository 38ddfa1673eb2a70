// summary.rs — Dashboard overview of the whole forest.

use chrono::Utc;
use gf_goal::GoalBrief;

use super::goal::truncate;
use crate::config::{CliPaths, Session};

pub fn execute(limit: usize, paths: &CliPaths) -> anyhow::Result<()> {
    let session = Session::open(paths)?;
    let overview = session.service.overview(Utc::now(), limit)?;

    if overview.total_goals == 0 {
        println!("No goals found.");
        return Ok(());
    }

    println!(
        "{} goal(s), {} completed, overall progress {}%",
        overview.total_goals, overview.completed_goals, overview.overall_progress
    );

    print_briefs("Upcoming deadlines", &overview.upcoming_deadlines, true);
    print_briefs("Recent achievements", &overview.recent_achievements, false);
    Ok(())
}

fn print_briefs(heading: &str, briefs: &[GoalBrief], with_deadline: bool) {
    println!();
    println!("{}:", heading);
    if briefs.is_empty() {
        println!("  (none)");
        return;
    }
    for b in briefs {
        let when = if with_deadline {
            b.deadline.map(|d| d.format("%Y-%m-%d").to_string())
        } else {
            Some(b.updated_at.format("%Y-%m-%d").to_string())
        };
        println!(
            "  {:<32} {:>3}%  {}",
            truncate(&b.title, 30),
            b.progress,
            when.unwrap_or_default()
        );
    }
}
