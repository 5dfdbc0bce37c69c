mod bootstrap_helpers;

use std::io::Write;

use bootstrap_helpers::init_tracing;
use carson_cli::{run_cli_blocking, Cli};
use clap::Parser;

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let code = run_cli_blocking(cli, &mut stdout);
    let _ = stdout.flush();
    std::process::exit(code);
}
