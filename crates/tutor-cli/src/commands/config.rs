use anyhow::{bail, Context, Result};
use tutor_cli::cli::ConfigCommands;
use tutor_core::TutorConfig;

pub fn handle(command: &ConfigCommands, config: &TutorConfig) -> Result<()> {
    match command {
        ConfigCommands::Init { out, force } => {
            let path = out.clone().unwrap_or_else(TutorConfig::default_path);
            if path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            TutorConfig::default()
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let rendered = toml::to_string_pretty(config)?;
            print!("{rendered}");
            Ok(())
        }
    }
}
