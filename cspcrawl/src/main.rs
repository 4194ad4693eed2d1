use cspcrawl::commands::command_argument_builder;
use cspcrawl::handlers::{handle_generate, init_tracing, print_banner};

#[tokio::main]
async fn main() {
    let mut cmd = command_argument_builder();
    let chosen_command = cmd.clone().get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_tracing(chosen_command.get_count("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("generate", primary_command)) => handle_generate(primary_command, quiet).await,
        _ => {
            // No subcommand provided, show usage
            let _ = cmd.print_help();
        }
    }
}
