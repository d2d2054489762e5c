pub fn run() {
    println!(
        "\
commands:
  submit <type> <priority> <file> [<file> ...]   submit a task (type: code|test|docs|review|refactor)
  status <task-id>                               show one task's status, or all tasks if omitted
  workers                                        list registered workers and their state
  events [since]                                 show events with seq >= since (default 0)
  cancel <task-id>                                cancel a pending or in-flight task
  shutdown [timeout-secs]                        drain in-flight tasks and exit (default 30s)
  help                                            show this message
  quit | exit                                    exit without draining"
    );
}
