//! Line-oriented REPL over stdin, dispatching each line to a `commands::*`
//! handler against one shared [`Orchestrator`]. Grounded on `gator-cli`'s
//! per-command-file layout (one file per verb under `commands/`), adapted
//! from one-shot-process-per-invocation to a persistent loop since this
//! orchestrator has no external store to reconnect to between commands.

use std::io::{self, BufRead, Write as _};
use std::sync::Arc;

use agentor_core::Orchestrator;
use anyhow::Result;

use crate::commands;

const PROMPT: &str = "agentor> ";

pub async fn run(orchestrator: Arc<Orchestrator>) -> Result<()> {
    println!("agentor orchestrator ready. Type `help` for commands, `quit` to exit.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{PROMPT}");
        io::stdout().flush().ok();

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or("");
        let rest: Vec<&str> = parts.collect();

        match verb {
            "quit" | "exit" => break,
            "help" => commands::help::run(),
            "submit" => commands::submit::run(&orchestrator, &rest).await,
            "status" => commands::status::run(&orchestrator, &rest).await,
            "workers" => commands::workers::run(&orchestrator).await,
            "events" => commands::events::run(&orchestrator, &rest),
            "cancel" => commands::cancel::run(&orchestrator, &rest).await,
            "shutdown" => {
                commands::shutdown::run(&orchestrator, &rest).await;
                break;
            }
            other => eprintln!("unrecognized command {other:?}; type `help` for the command list"),
        }
    }

    Ok(())
}
