use anyhow::Result;
use colored::Colorize;
use sitelog::config::{self, LogSettings};
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Displays the effective configuration with store credentials masked
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!(path = %config_path.display(), "Loading configuration for display");

    let settings = config::load_settings(Some(config_path))?;
    let sanitized = sanitize_secrets(&settings);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    Ok(())
}

/// Execute the config validate command
pub fn validate(config_path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());

    let settings = config::load_settings(Some(config_path))?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Default table: {}", settings.default_table);
    println!("  Console: {}", on_off(settings.console));
    println!("  Persist: {}", on_off(settings.persist));
    match &settings.store {
        Some(store) => println!("  Store: {} ({})", store.kind, mask_url(&store.url)),
        None => println!("  Store: {}", "none".dimmed()),
    }
    println!("  Ignored substrings: {}", settings.ignore.len());

    info!("Configuration validation successful");
    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn sanitize_secrets(settings: &LogSettings) -> LogSettings {
    let mut sanitized = settings.clone();
    if let Some(store) = &mut sanitized.store {
        store.url = mask_url(&store.url);
    }
    sanitized
}

/// Mask the password of a connection URL
///
/// Example: "mysql://root:secret@db/app" -> "mysql://root:***@db/app"
fn mask_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let authority_start = scheme_end + 3;
    let rest = &url[authority_start..];

    let Some(at) = rest.find('@') else {
        return url.to_string();
    };
    let userinfo = &rest[..at];

    match userinfo.find(':') {
        Some(colon) => format!(
            "{}{}:***{}",
            &url[..authority_start],
            &userinfo[..colon],
            &rest[at..]
        ),
        None => url.to_string(),
    }
}
