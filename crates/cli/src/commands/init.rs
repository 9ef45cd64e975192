//! `linksort init`: write a default config file.

use linksort_config::AppConfig;

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    if config_path.exists() && !force {
        println!("  Config already exists: {}", config_path.display());
        println!("  Re-run with --force to overwrite it.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Wrote {}", config_path.display());
    println!();
    println!("  Set your API key before chatting:");
    println!("    export ANTHROPIC_API_KEY=sk-ant-...");
    Ok(())
}
