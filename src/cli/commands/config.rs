//! Configuration command.

use crate::config;

/// Print the active configuration, optionally writing the defaults first
pub fn cmd_config(init: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if init {
        match path {
            Some(ref p) if p.exists() => {
                println!("Config already exists at {}", p.display());
            }
            _ => {
                let written = config::save(&config::Config::default())?;
                println!("Wrote default config to {}", written.display());
            }
        }
    }

    match path {
        Some(ref p) if p.exists() => println!("# {}", p.display()),
        Some(ref p) => println!("# {} (not found, showing defaults)", p.display()),
        None => println!("# no config directory, showing defaults"),
    }
    println!("{}", toml::to_string_pretty(&config::load())?);

    Ok(())
}
