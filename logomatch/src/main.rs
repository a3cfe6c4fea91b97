use colored::Colorize;
use logomatch::command_argument_builder;
use logomatch::handlers::{handle_compare, handle_group, handle_probe, init_logging, print_banner};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_logging(chosen_command.get_count("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("group", sub_matches)) => handle_group(sub_matches, quiet).await,
        Some(("probe", sub_matches)) => handle_probe(sub_matches).await,
        Some(("compare", sub_matches)) => handle_compare(sub_matches),
        // No subcommand provided, just show the banner
        None => return,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
