//! `retrykit completions <shell>` – print a completion script to stdout.

use clap::Command;
use clap_complete::Shell;

pub fn run_completions(shell: Shell, cmd: &mut Command) {
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, cmd, name, &mut std::io::stdout());
}
