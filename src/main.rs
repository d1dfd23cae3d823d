use color_eyre::Result;
use clap::Parser;
use flashdeck::{CardStore, Config, Gateway, GeminiService, Profile, SqliteRepository, cli::{Cli, Commands}};
use std::path::PathBuf;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config_path = cli.config.as_deref().map(flashdeck::utils::expand_path);
    let config = Config::load_with_profile(profile, config_path.as_deref())?;

    // Logs go next to the card storage; the guard must outlive the app
    let log_dir = flashdeck::utils::get_data_dir(profile)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logs");
    let _log_guard = flashdeck::logging::init_logging(&config.log_level, &log_dir);
    tracing::info!(?profile, "starting flashdeck");

    let storage_path = config.get_storage_path();
    let repository = SqliteRepository::new(
        storage_path.to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Storage path contains invalid UTF-8"))?
    )?;
    let mut store = CardStore::open(Box::new(repository))?;
    let gateway = Gateway::new(Box::new(GeminiService::from_config(&config.ai)));

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let app = flashdeck::tui::App::new(config, store, gateway);
            flashdeck::tui::run_event_loop(app)?;
        }
        Commands::Add { question, answer } => {
            flashdeck::cli::handle_add(question, answer, &mut store)?;
        }
        Commands::List => {
            flashdeck::cli::handle_list(&store);
        }
        Commands::Generate { topic, count } => {
            let count = count.unwrap_or_else(|| config.default_generation_count());
            flashdeck::cli::handle_generate(topic, count, &gateway, &mut store)?;
        }
    }

    Ok(())
}
