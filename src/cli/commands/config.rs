//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{GfoError, GfoResult};
use console::style;
use std::path::Path;

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager) -> GfoResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(&manager.load().await?)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Get { key }) => {
            let config = manager.load().await?;
            println!("{}", render_value(&lookup(&config, &key, manager.path())?));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> GfoResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> GfoResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        eprintln!(
            "{} Config already exists at {}",
            style("!").yellow(),
            path.display()
        );
        eprintln!("  Use --force to overwrite");
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    eprintln!(
        "{} Configuration initialized at {}",
        style("✓").green(),
        path.display()
    );

    Ok(())
}

/// Value for a dot-separated `section.key`
fn lookup(config: &Config, key: &str, path: &Path) -> GfoResult<toml::Value> {
    let invalid = || GfoError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: format!("unknown config key: {}", key),
    };

    let (section, name) = key.split_once('.').ok_or_else(invalid)?;
    config.get(section, name).ok_or_else(invalid)
}

/// Strings print bare, everything else in TOML notation
fn render_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_keys() {
        let config = Config::default();
        assert_eq!(
            render_value(&lookup(&config, "cache.ttl_seconds", Path::new("c.toml")).unwrap()),
            "3600"
        );
        assert_eq!(
            render_value(&lookup(&config, "log.format", Path::new("c.toml")).unwrap()),
            "text"
        );
    }

    #[test]
    fn lookup_unknown_key() {
        let config = Config::default();
        assert!(lookup(&config, "cache.nope", Path::new("c.toml")).is_err());
        assert!(lookup(&config, "ttl_seconds", Path::new("c.toml")).is_err());
    }
}
