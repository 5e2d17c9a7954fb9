//! Deployment, endpoint and localization arguments.

use crate::console::{
    config::{
        normalize_value, DeploymentConfig, I18nConfig, ServiceEndpoints, DEFAULT_FALLBACK_LANGUAGE,
        DEFAULT_ORGANIZATION_PREFIX, DEFAULT_SUPER_TENANT, DEFAULT_TENANT_PREFIX,
    },
    ConsoleConfig,
};
use anyhow::{bail, Result};
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use url::Url;

pub const ARG_SERVER_ORIGIN: &str = "server-origin";
pub const ARG_APP_BASE_NAME: &str = "app-base-name";
pub const ARG_TENANT: &str = "tenant";
pub const ARG_TENANT_PREFIX: &str = "tenant-prefix";
pub const ARG_ORGANIZATION_PREFIX: &str = "organization-prefix";
pub const ARG_SUPER_TENANT: &str = "super-tenant";
pub const ARG_TENANT_QUALIFIED_URLS: &str = "tenant-qualified-urls";
pub const ARG_HOME_PATH: &str = "home-path";
pub const ARG_FEATURE_GATE_ENDPOINT: &str = "feature-gate-endpoint";
pub const ARG_TENANT_TIER_ENDPOINT: &str = "tenant-tier-endpoint";
pub const ARG_GOVERNANCE_CONNECTORS_ENDPOINT: &str = "governance-connectors-endpoint";
pub const ARG_I18N_RESOURCE_PATH: &str = "i18n-resource-path";
pub const ARG_I18N_META_HASH: &str = "i18n-meta-hash";
pub const ARG_FALLBACK_LANGUAGE: &str = "fallback-language";
pub const ARG_ORGANIZATION_ASSOCIATIONS: &str = "enable-organization-associations";
pub const ARG_DEBUG: &str = "debug";

#[derive(Debug, Clone)]
pub struct Options {
    pub config: ConsoleConfig,
}

impl Options {
    /// Parse console arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the server origin or an endpoint is not a valid URL.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .and_then(|value| normalize_value(value))
        };
        let get_or = |id: &str, default: &str| get_non_empty(id).unwrap_or_else(|| default.to_string());
        let get_flag = |id: &str| matches.get_one::<bool>(id).copied().unwrap_or(false);

        let Some(server_origin) = get_non_empty(ARG_SERVER_ORIGIN) else {
            bail!("missing required argument: --{ARG_SERVER_ORIGIN}");
        };
        if Url::parse(&server_origin).is_err() {
            bail!("invalid --{ARG_SERVER_ORIGIN}: {server_origin}");
        }
        let server_origin = server_origin.trim_end_matches('/').to_string();

        let defaults = DeploymentConfig::default();
        let deployment = DeploymentConfig {
            app_base_name: matches
                .get_one::<String>(ARG_APP_BASE_NAME)
                .map_or(defaults.app_base_name, |value| value.trim().to_string()),
            tenant: get_or(ARG_TENANT, DEFAULT_SUPER_TENANT),
            tenant_prefix: get_or(ARG_TENANT_PREFIX, DEFAULT_TENANT_PREFIX),
            organization_prefix: get_or(ARG_ORGANIZATION_PREFIX, DEFAULT_ORGANIZATION_PREFIX),
            super_tenant: get_or(ARG_SUPER_TENANT, DEFAULT_SUPER_TENANT),
            tenant_qualified_urls: matches
                .get_one::<bool>(ARG_TENANT_QUALIFIED_URLS)
                .copied()
                .unwrap_or(true),
            home_path: get_or(ARG_HOME_PATH, &defaults.home_path),
            server_origin,
        };

        let mut endpoints = ServiceEndpoints::from_origin(&deployment.server_origin);
        if let Some(endpoint) = get_non_empty(ARG_FEATURE_GATE_ENDPOINT) {
            endpoints.feature_gate = endpoint;
        }
        if let Some(endpoint) = get_non_empty(ARG_TENANT_TIER_ENDPOINT) {
            endpoints.tenant_tier = endpoint;
        }
        if let Some(endpoint) = get_non_empty(ARG_GOVERNANCE_CONNECTORS_ENDPOINT) {
            endpoints.governance_connectors = endpoint;
        }
        for (name, endpoint) in [
            (ARG_FEATURE_GATE_ENDPOINT, &endpoints.feature_gate),
            (ARG_TENANT_TIER_ENDPOINT, &endpoints.tenant_tier),
            (
                ARG_GOVERNANCE_CONNECTORS_ENDPOINT,
                &endpoints.governance_connectors,
            ),
        ] {
            if Url::parse(endpoint).is_err() {
                bail!("invalid --{name}: {endpoint}");
            }
        }

        let i18n = I18nConfig {
            resource_path: get_or(ARG_I18N_RESOURCE_PATH, &I18nConfig::default().resource_path),
            meta_hash: get_non_empty(ARG_I18N_META_HASH),
            fallback_language: get_or(ARG_FALLBACK_LANGUAGE, DEFAULT_FALLBACK_LANGUAGE),
        };

        Ok(Self {
            config: ConsoleConfig {
                deployment,
                endpoints,
                i18n,
                enable_organization_associations: get_flag(ARG_ORGANIZATION_ASSOCIATIONS),
                debug: get_flag(ARG_DEBUG),
            },
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_deployment_args(command);
    let command = with_endpoint_args(command);
    with_i18n_args(command)
}

fn with_deployment_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SERVER_ORIGIN)
                .long(ARG_SERVER_ORIGIN)
                .help("Identity server origin, example: https://localhost:9443")
                .env("VESTIBULE_SERVER_ORIGIN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_APP_BASE_NAME)
                .long(ARG_APP_BASE_NAME)
                .help("Console base name without the tenant segment")
                .env("VESTIBULE_APP_BASE_NAME")
                .default_value("console"),
        )
        .arg(
            Arg::new(ARG_TENANT)
                .long(ARG_TENANT)
                .help("Tenant the console is served for")
                .env("VESTIBULE_TENANT")
                .default_value(DEFAULT_SUPER_TENANT),
        )
        .arg(
            Arg::new(ARG_TENANT_PREFIX)
                .long(ARG_TENANT_PREFIX)
                .help("Path segment that precedes the tenant domain")
                .env("VESTIBULE_TENANT_PREFIX")
                .default_value(DEFAULT_TENANT_PREFIX),
        )
        .arg(
            Arg::new(ARG_ORGANIZATION_PREFIX)
                .long(ARG_ORGANIZATION_PREFIX)
                .help("Path segment that precedes the organization name")
                .env("VESTIBULE_ORGANIZATION_PREFIX")
                .default_value(DEFAULT_ORGANIZATION_PREFIX),
        )
        .arg(
            Arg::new(ARG_SUPER_TENANT)
                .long(ARG_SUPER_TENANT)
                .help("Super tenant domain")
                .env("VESTIBULE_SUPER_TENANT")
                .default_value(DEFAULT_SUPER_TENANT),
        )
        .arg(
            Arg::new(ARG_TENANT_QUALIFIED_URLS)
                .long(ARG_TENANT_QUALIFIED_URLS)
                .help("Prefix console paths with /<tenant-prefix>/<tenant>")
                .env("VESTIBULE_TENANT_QUALIFIED_URLS")
                .default_value("true")
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_HOME_PATH)
                .long(ARG_HOME_PATH)
                .help("Landing route inside the console")
                .env("VESTIBULE_HOME_PATH")
                .default_value("/getting-started"),
        )
        .arg(
            Arg::new(ARG_ORGANIZATION_ASSOCIATIONS)
                .long(ARG_ORGANIZATION_ASSOCIATIONS)
                .help("Send users without a tenant association to tenant creation")
                .env("VESTIBULE_ENABLE_ORGANIZATION_ASSOCIATIONS")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_DEBUG)
                .long(ARG_DEBUG)
                .help("Enable console debug mode")
                .env("VESTIBULE_DEBUG")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}

fn with_endpoint_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FEATURE_GATE_ENDPOINT)
                .long(ARG_FEATURE_GATE_ENDPOINT)
                .help("Feature gate API URL (default: derived from the server origin)")
                .env("VESTIBULE_FEATURE_GATE_ENDPOINT"),
        )
        .arg(
            Arg::new(ARG_TENANT_TIER_ENDPOINT)
                .long(ARG_TENANT_TIER_ENDPOINT)
                .help("Tenant tier API URL (default: derived from the server origin)")
                .env("VESTIBULE_TENANT_TIER_ENDPOINT"),
        )
        .arg(
            Arg::new(ARG_GOVERNANCE_CONNECTORS_ENDPOINT)
                .long(ARG_GOVERNANCE_CONNECTORS_ENDPOINT)
                .help("Identity governance API URL (default: derived from the server origin)")
                .env("VESTIBULE_GOVERNANCE_CONNECTORS_ENDPOINT"),
        )
}

fn with_i18n_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_I18N_RESOURCE_PATH)
                .long(ARG_I18N_RESOURCE_PATH)
                .help("Path of the localization resources under the app base")
                .env("VESTIBULE_I18N_RESOURCE_PATH")
                .default_value("/resources/i18n"),
        )
        .arg(
            Arg::new(ARG_I18N_META_HASH)
                .long(ARG_I18N_META_HASH)
                .help("Content hash of the language metadata file")
                .env("VESTIBULE_I18N_META_HASH"),
        )
        .arg(
            Arg::new(ARG_FALLBACK_LANGUAGE)
                .long(ARG_FALLBACK_LANGUAGE)
                .help("Language used when the detected one is not supported")
                .env("VESTIBULE_FALLBACK_LANGUAGE")
                .default_value(DEFAULT_FALLBACK_LANGUAGE),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("vestibule"))
    }

    #[test]
    fn defaults_follow_the_server_origin() {
        temp_env::with_vars_unset(
            [
                "VESTIBULE_TENANT",
                "VESTIBULE_FEATURE_GATE_ENDPOINT",
                "VESTIBULE_GOVERNANCE_CONNECTORS_ENDPOINT",
                "VESTIBULE_ENABLE_ORGANIZATION_ASSOCIATIONS",
                "VESTIBULE_TENANT_QUALIFIED_URLS",
            ],
            || {
                let matches = command()
                    .try_get_matches_from(["vestibule", "--server-origin", "https://localhost:9443/"])
                    .unwrap();
                let config = Options::parse(&matches).unwrap().config;

                assert_eq!(config.deployment.server_origin, "https://localhost:9443");
                assert_eq!(config.deployment.tenant, "carbon.super");
                assert!(config.deployment.tenant_qualified_urls);
                assert_eq!(
                    config.endpoints.feature_gate,
                    "https://localhost:9443/api/server/v1/feature-gate/features"
                );
                assert_eq!(
                    config.endpoints.governance_connectors,
                    "https://localhost:9443/api/server/v1/identity-governance"
                );
                assert!(!config.enable_organization_associations);
                assert_eq!(config.i18n.fallback_language, "en-US");
                assert_eq!(config.i18n.meta_hash, None);
            },
        );
    }

    #[test]
    fn env_overrides() {
        temp_env::with_vars(
            [
                ("VESTIBULE_SERVER_ORIGIN", Some("https://is.example.org")),
                ("VESTIBULE_TENANT", Some("wso2.com")),
                ("VESTIBULE_TENANT_QUALIFIED_URLS", Some("false")),
                ("VESTIBULE_ENABLE_ORGANIZATION_ASSOCIATIONS", Some("true")),
                ("VESTIBULE_I18N_META_HASH", Some("3f2a")),
                (
                    "VESTIBULE_TENANT_TIER_ENDPOINT",
                    Some("https://billing.example.org/tier"),
                ),
            ],
            || {
                let matches = command().try_get_matches_from(["vestibule"]).unwrap();
                let config = Options::parse(&matches).unwrap().config;

                assert_eq!(config.deployment.tenant, "wso2.com");
                assert!(!config.deployment.tenant_qualified_urls);
                assert!(config.enable_organization_associations);
                assert_eq!(config.i18n.meta_hash.as_deref(), Some("3f2a"));
                assert_eq!(config.endpoints.tenant_tier, "https://billing.example.org/tier");
            },
        );
    }

    #[test]
    fn invalid_origin_is_rejected() {
        temp_env::with_vars([("VESTIBULE_SERVER_ORIGIN", Some("not a url"))], || {
            let matches = command().try_get_matches_from(["vestibule"]).unwrap();
            assert!(Options::parse(&matches).is_err());
        });
    }

    #[test]
    fn server_origin_is_required() {
        temp_env::with_vars_unset(["VESTIBULE_SERVER_ORIGIN"], || {
            assert!(command().try_get_matches_from(["vestibule"]).is_err());
        });
    }
}
