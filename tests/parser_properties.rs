use jsondb_client::cli::{client_schema, OptionSchema, OptionSpec, OptionValue, ParsedOptions};
use jsondb_client::ParseError;
use proptest::prelude::*;

const MODES: &[&str] = &["fast", "slow"];

fn schema() -> OptionSchema {
    OptionSchema::new("probe")
        .option(OptionSpec::text("name").short('n').required())
        .option(OptionSpec::number("count"))
        .option(OptionSpec::flag("force"))
        .option(OptionSpec::choice("mode", MODES))
}

fn text_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _./:\\[\\]\",][a-zA-Z0-9 _./:\\[\\]\",-]{0,23}"
}

proptest! {
    #[test]
    fn formatted_options_parse_back(
        name in text_value(),
        count in proptest::option::of(any::<u64>()),
        force in any::<bool>(),
        mode in proptest::option::of(prop::sample::select(MODES)),
    ) {
        let mut expected = ParsedOptions::default();
        expected.insert("name", OptionValue::Text(name.clone()));
        if let Some(count) = count {
            expected.insert("count", OptionValue::Number(count));
        }
        expected.insert("force", OptionValue::Flag(force));
        if let Some(mode) = mode {
            expected.insert("mode", OptionValue::Choice(mode.to_string()));
        }

        let parsed = schema().parse(expected.to_tokens()).unwrap();
        prop_assert_eq!(parsed, expected);
    }

    #[test]
    fn missing_required_option_is_reported(
        count in any::<u64>(),
        force in any::<bool>(),
    ) {
        let mut tokens = vec!["--count".to_string(), count.to_string()];
        if force {
            tokens.push("--force".to_string());
        }

        let err = schema().parse(tokens).unwrap_err();
        prop_assert_eq!(err, ParseError::MissingRequiredOption("name".to_string()));
    }

    #[test]
    fn unknown_long_options_are_rejected(name in "[a-z]{3,12}") {
        prop_assume!(client_schema().find(&name).is_none());
        prop_assume!(name != "help" && name != "version");

        let token = format!("--{}", name);
        let err = client_schema().parse(["-t", "exit", token.as_str()]).unwrap_err();
        prop_assert_eq!(err, ParseError::UnrecognizedOption(token));
    }

    #[test]
    fn client_keys_survive_parsing(key in "[a-zA-Z0-9 _]{1,20}") {
        let options = client_schema().parse(["-t", "get", "-k", key.as_str()]).unwrap();
        prop_assert_eq!(options.text("key"), Some(key.as_str()));
        prop_assert_eq!(options.choice("type"), Some("get"));
    }
}
