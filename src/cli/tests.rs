use super::*;
use std::path::PathBuf;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }

    pub(super) fn assert_optional_flag_value(
        actual: Option<&str>,
        expected: Option<&str>,
        flag_name: &str,
        argv: &[&str],
    ) {
        assert_eq!(
            actual, expected,
            "unexpected value for {flag_name} when parsing argv={argv:?}"
        );
    }
}

use test_helpers::{assert_optional_flag_value, parse_args};

#[test]
fn test_no_subcommand_means_chat() {
    let args = parse_args(&["charchat"]);
    assert!(args.command.is_none());
    assert_eq!(args.command.unwrap_or(Commands::Chat), Commands::Chat);
}

#[test]
fn test_character_flag_parsing() {
    let cases: [(&[&str], Option<&str>); 4] = [
        (&["charchat", "-c", "Sherlock"], Some("Sherlock")),
        (&["charchat", "--character", "Captain Nemo"], Some("Captain Nemo")),
        (&["charchat"], None),
        (&["charchat", "-c", "Ada", "say", "hello"], Some("Ada")),
    ];

    for (argv, expected_character) in cases {
        let args = parse_args(argv);
        assert_optional_flag_value(
            args.character.as_deref(),
            expected_character,
            "character",
            argv,
        );
    }
}

#[test]
fn test_global_flags_combine() {
    let args = parse_args(&[
        "charchat",
        "--characters",
        "cast.json",
        "-m",
        "llama3-8b-8192",
        "--base-url",
        "http://localhost:8080/v1",
        "-l",
        "chat.log",
        "--trace-file",
        "trace.log",
        "chat",
    ]);

    assert_eq!(args.command, Some(Commands::Chat));
    assert_eq!(args.characters, Some(PathBuf::from("cast.json")));
    assert_eq!(args.model.as_deref(), Some("llama3-8b-8192"));
    assert_eq!(args.base_url.as_deref(), Some("http://localhost:8080/v1"));
    assert_eq!(args.log, Some(PathBuf::from("chat.log")));
    assert_eq!(args.trace_file, Some(PathBuf::from("trace.log")));

    let overrides = args.overrides();
    assert_eq!(overrides.characters, Some(PathBuf::from("cast.json")));
    assert_eq!(overrides.model.as_deref(), Some("llama3-8b-8192"));
    assert_eq!(overrides.character, None);
}

#[test]
fn test_say_collects_words() {
    let args = parse_args(&["charchat", "say", "my", "name", "is", "Ada"]);
    assert_eq!(
        args.command,
        Some(Commands::Say {
            prompt: vec![
                "my".to_string(),
                "name".to_string(),
                "is".to_string(),
                "Ada".to_string()
            ]
        })
    );
}

#[test]
fn test_set_parsing() {
    let args = parse_args(&["charchat", "set", "default-character", "Captain", "Nemo"]);
    assert_eq!(
        args.command,
        Some(Commands::Set {
            key: Some("default-character".to_string()),
            value: vec!["Captain".to_string(), "Nemo".to_string()],
        })
    );

    let args = parse_args(&["charchat", "set"]);
    assert_eq!(
        args.command,
        Some(Commands::Set {
            key: None,
            value: Vec::new(),
        })
    );
}

#[test]
fn test_unset_requires_key() {
    assert!(Args::try_parse_from(["charchat", "unset"]).is_err());
    let args = parse_args(&["charchat", "unset", "model"]);
    assert_eq!(
        args.command,
        Some(Commands::Unset {
            key: "model".to_string()
        })
    );
}

#[test]
fn test_simple_subcommands() {
    assert_eq!(
        parse_args(&["charchat", "characters"]).command,
        Some(Commands::Characters)
    );
    assert_eq!(parse_args(&["charchat", "auth"]).command, Some(Commands::Auth));
    assert_eq!(
        parse_args(&["charchat", "deauth"]).command,
        Some(Commands::Deauth)
    );
}
