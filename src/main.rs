use clap::Parser;
use tracing_subscriber::EnvFilter;
use videx_autofill::cli::commands::{cmd_fill, cmd_generate, cmd_plan, cmd_template};
use videx_autofill::cli::config::{Cli, Commands, load_config};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Generate { output_dir } => cmd_generate(&config, &output_dir, cli.verbose),
        Commands::Template { output } => cmd_template(&config, output.as_deref()),
        Commands::Plan { data } => cmd_plan(&config, &data),
        Commands::Fill { data, output } => {
            cmd_fill(&config, &data, output.as_deref(), cli.verbose).map(|_| ())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// RUST_LOG wins; otherwise -v, -vv, -vvv raise the level from warn.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("videx_autofill={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
