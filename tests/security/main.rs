//! Security regression tests for packsafe-core.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::field_reassign_with_default)]

mod command_injection;
mod path_traversal;
mod runaway_process;
mod symlink_escape;
mod zip_bomb;
