pub mod console;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("vestibule")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("VESTIBULE_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = console::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "vestibule");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_port_and_origin() {
        temp_env::with_vars_unset(["VESTIBULE_PORT", "VESTIBULE_LOG_LEVEL"], || {
            let matches = new().get_matches_from(vec![
                "vestibule",
                "--port",
                "9090",
                "--server-origin",
                "https://localhost:9443",
            ]);

            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(9090));
            assert_eq!(
                matches
                    .get_one::<String>(console::ARG_SERVER_ORIGIN)
                    .map(ToString::to_string),
                Some("https://localhost:9443".to_string())
            );
            assert_eq!(matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(), Some(0));
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("VESTIBULE_SERVER_ORIGIN", Some("https://localhost:9443")),
                ("VESTIBULE_PORT", Some("443")),
                ("VESTIBULE_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["vestibule"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, level) in (0u8..).zip(levels) {
            temp_env::with_vars(
                [
                    ("VESTIBULE_LOG_LEVEL", Some(level)),
                    ("VESTIBULE_SERVER_ORIGIN", Some("https://localhost:9443")),
                ],
                || {
                    let matches = new().get_matches_from(vec!["vestibule"]);
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        Some(index)
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for count in 1u8..=4 {
            temp_env::with_vars_unset(["VESTIBULE_LOG_LEVEL"], || {
                let flag = format!("-{}", "v".repeat(usize::from(count)));
                let matches = new().get_matches_from(vec![
                    "vestibule",
                    "--server-origin",
                    "https://localhost:9443",
                    flag.as_str(),
                ]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(count)
                );
            });
        }
    }
}
