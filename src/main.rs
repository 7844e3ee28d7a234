use anyhow::Result;
use bookshelf::config::{self, AppConfig};
use bookshelf::library::{self, LibraryAction};
use clap::{Parser, Subcommand};
use log::{error, info};

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(about = "Personal library with a cover-upload relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Library(LibraryAction),

    /// Generate configuration file (.bookshelf.toml) in current directory
    Genconfig {
        /// Force overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logger, default info level, display file line number and time
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}:{}] {level_style}{}{level_style:#}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();

    // Try to load configuration file
    let app_config = if std::path::Path::new(config::CONFIG_FILE).exists() {
        match AppConfig::load_from_file(config::CONFIG_FILE) {
            Ok(cfg) => {
                let abs_path = std::fs::canonicalize(config::CONFIG_FILE)
                    .unwrap_or_else(|_| std::path::PathBuf::from(config::CONFIG_FILE));
                info!("Using configuration file: {}", abs_path.display());
                Some(cfg)
            }
            Err(e) => {
                error!("Failed to load configuration file: {}, using defaults", e);
                None
            }
        }
    } else {
        None
    };

    match cli.command {
        Commands::Library(action) => {
            library::run(action, app_config.as_ref())?;
        }

        Commands::Genconfig { force } => {
            if let Err(e) = AppConfig::generate_config_file(force) {
                error!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
