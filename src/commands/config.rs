use anyhow::Result;
use colored::Colorize;
use llm_monitor::config::{self, MonitorConfig};
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Displays the current configuration with the license key masked
pub fn show(path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!(path = %path.display(), "Loading configuration for display");

    let cfg = config::load_config(path)?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    // Serialize to TOML format
    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    info!("Configuration displayed successfully");
    Ok(())
}

/// Execute the config validate command
pub fn validate(path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!(path = %path.display(), "Validating configuration");

    let cfg = config::load_config(path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  Monitoring: {}",
        if cfg.has_credentials() {
            "enabled".green()
        } else {
            "disabled (missing license key or app name)".red()
        }
    );
    println!(
        "  Content recording: {}",
        if cfg.content_policy().should_record_content() {
            "on".green()
        } else {
            "off".dimmed()
        }
    );
    println!("  Vendor fallback: {}", cfg.adapter.vendor_fallback);
    println!("  Supportability metric: {}", cfg.supportability_metric_name());

    info!("Configuration validation successful");
    Ok(())
}

/// Sanitize secrets in configuration for safe display
fn sanitize_secrets(cfg: &MonitorConfig) -> MonitorConfig {
    let mut sanitized = cfg.clone();
    sanitized.license_key = sanitized.license_key.as_deref().map(mask_license_key);
    sanitized
}

/// Mask a license key for safe display
///
/// Shows first 4 and last 4 characters with an ellipsis in between
/// Example: "eu01xx1234567890abcdefNRAL" -> "eu01...NRAL"
fn mask_license_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        // Too short to mask meaningfully
        return "***".to_string();
    }

    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();

    format!("{}...{}", prefix, suffix)
}
