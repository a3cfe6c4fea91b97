pub mod commands;
pub mod handlers;

pub use commands::command_argument_builder;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    build_options, compare_fingerprints, load_domains_from_file, parse_domain_line,
    write_previews,
};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
