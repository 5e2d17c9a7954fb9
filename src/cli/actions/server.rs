use crate::{api, console::ConsoleConfig};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub config: ConsoleConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    api::new(args.port, args.config).await
}

fn startup_entries(args: &Args) -> Vec<(&'static str, String)> {
    let config = &args.config;
    let paths = config.paths();
    vec![
        ("listen", format!("tcp:{}", args.port)),
        ("server_origin", config.deployment.server_origin.clone()),
        ("tenant", config.deployment.tenant.clone()),
        ("app_base", config.deployment.app_base_with_tenant()),
        ("home_path", paths.home().to_string()),
        (
            "tenant_qualified_urls",
            config.deployment.tenant_qualified_urls.to_string(),
        ),
        ("feature_gate", config.endpoints.feature_gate.clone()),
        ("tenant_tier", config.endpoints.tenant_tier.clone()),
        (
            "governance_connectors",
            config.endpoints.governance_connectors.clone(),
        ),
        (
            "i18n_meta_hash",
            config
                .i18n
                .meta_hash
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        ),
        ("fallback_language", config.i18n.fallback_language.clone()),
        (
            "organization_associations",
            config.enable_organization_associations.to_string(),
        ),
        ("debug", config.debug.to_string()),
    ]
}

fn log_startup_args(args: &Args) {
    let entries = startup_entries(args);
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\nStartup configuration:", banner());
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    hash.trim().chars().take(7).collect()
}

const BANNER: &str = r"
  __________
 |  ______  |
 | |      | |
 | |      | |
 | |    o | |  V E S T I B U L E {VERSION}
 | |      | |
 |_|______|_|";
