use std::sync::Arc;
use std::time::Duration;

use agentor_core::Orchestrator;

pub async fn run(orchestrator: &Arc<Orchestrator>, args: &[&str]) {
    let timeout_secs: u64 = match args {
        [] => 30,
        [raw] => match raw.parse() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("timeout must be a non-negative integer of seconds");
                30
            }
        },
        _ => {
            eprintln!("usage: shutdown [timeout-secs]");
            30
        }
    };

    println!("draining in-flight tasks (timeout {timeout_secs}s)...");
    match orchestrator.shutdown(Duration::from_secs(timeout_secs)).await {
        Ok(()) => println!("shutdown complete"),
        Err(e) => eprintln!("shutdown did not complete cleanly: {e}"),
    }
}
