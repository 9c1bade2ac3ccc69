use clap::Subcommand;
use realitycheck_core::StatsService;

use super::{print_json, CliResult, Runtime};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Stored offline-session stats
    Show,
    /// Rebuild stats from every completed offline session
    Recompute,
}

pub fn run(action: StatsAction, user: Option<String>) -> CliResult {
    let runtime = Runtime::load(user)?;
    let Some(user_id) = runtime.user_id() else {
        eprintln!("not signed in: pass --user or set user.current_user_id");
        return print_json(&serde_json::Value::Null);
    };
    let service = StatsService::new(&runtime.backend);

    match action {
        StatsAction::Show => print_json(&service.current(&user_id))?,
        StatsAction::Recompute => print_json(&service.recompute(&user_id, None))?,
    }
    Ok(())
}
