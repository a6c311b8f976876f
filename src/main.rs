//! configstore CLI entry point
//!
//! Parses arguments and dispatches via `cli::run`. On failure the error is
//! written to stdout as a JSON object and the process exits non-zero.

use configstore::cli;

fn main() {
    if let Err(e) = cli::run() {
        let _ = cli::write_error(e.code_str(), e.message());
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
