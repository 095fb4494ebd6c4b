use anyhow::Result;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.toml with the default template.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[publish]\n\
    cooldown_secs = 10\n\
    enabled = true\n\
    \n\
    [store]\n\
    db_file = \"tally.db\"\n";

/// Execute `tally init`. Creates the data directory skeleton:
///
/// ```text
/// <data_dir>/
///   config.toml    (default config template)
///   tally.db       (created lazily on first engine open)
///   tally.lock     (created lazily on first lock acquisition)
/// ```
///
/// # Errors
///
/// Returns an error if config.toml exists and `--force` is not set, or if a
/// filesystem operation fails.
pub fn run_init(args: &InitArgs, data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;

    let config_path = data_dir.join("config.toml");
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists. Use `tally init --force` to overwrite.",
            config_path.display()
        );
    }
    std::fs::write(&config_path, CONFIG_TOML)?;

    println!("initialized {}", data_dir.display());
    Ok(())
}
