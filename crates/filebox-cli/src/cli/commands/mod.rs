//! CLI command handlers, one per file.

mod fetch;
mod info;
mod json;
mod qr;

pub use fetch::run_fetch;
pub use info::run_info;
pub use json::{run_json, run_restore};
pub use qr::{print_qr, run_qr};
