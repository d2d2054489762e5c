use std::sync::Arc;

use agentor_core::Orchestrator;

pub fn run(orchestrator: &Arc<Orchestrator>, args: &[&str]) {
    let since: u64 = match args {
        [] => 0,
        [raw] => match raw.parse() {
            Ok(n) => n,
            Err(_) => return eprintln!("since must be a non-negative integer"),
        },
        _ => return eprintln!("usage: events [since]"),
    };

    for event in orchestrator.events(since) {
        println!(
            "#{} {:?} {} {}",
            event.seq,
            event.event_type,
            event.timestamp.to_rfc3339(),
            event.data,
        );
    }
}
