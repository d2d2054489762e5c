//! One module per REPL verb, mirroring `gator-cli`'s per-command-file
//! layout (`status_cmd.rs`, `dispatch_cmd.rs`, ...).

pub mod cancel;
pub mod events;
pub mod help;
pub mod shutdown;
pub mod status;
pub mod submit;
pub mod workers;
