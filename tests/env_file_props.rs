// tests/env_file_props.rs

use std::collections::HashMap;

use maple2_launcher::config::EnvFile;
use proptest::prelude::*;

fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("DB_IP".to_string()),
        Just("DB_PORT".to_string()),
        Just("DB_USER".to_string()),
        Just("MS2_DATA_FOLDER".to_string()),
        "[A-Z][A-Z_]{0,6}",
    ]
}

fn value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_./:=-]{0,12}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any sequence of `set` calls leaves one line per key holding the last
    /// value written, and never disturbs lines that are not `KEY=VALUE`.
    #[test]
    fn set_keeps_one_line_per_key_with_last_value(
        writes in proptest::collection::vec((key(), value()), 1..24)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvFile::in_root(dir.path());
        std::fs::write(env.path(), "# generated by tests\n").unwrap();

        let mut expected = HashMap::new();
        for (k, v) in &writes {
            env.set(k, v).unwrap();
            expected.insert(k.clone(), v.clone());
        }

        let contents = std::fs::read_to_string(env.path()).unwrap();
        prop_assert!(contents.starts_with("# generated by tests\n"));

        for (k, v) in &expected {
            let lines = contents
                .lines()
                .filter(|line| line.split_once('=').is_some_and(|(lk, _)| lk == k))
                .count();
            prop_assert_eq!(lines, 1, "key {} appears {} times", k, lines);
            prop_assert_eq!(env.get(k).unwrap(), Some(v.clone()));
        }
    }
}
