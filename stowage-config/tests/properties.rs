//! Property-based round-trip tests for the config writer

use proptest::prelude::*;
use stowage_config::*;

fn leaf() -> impl Strategy<Value = ConfigValue> {
    prop_oneof![
        any::<bool>().prop_map(ConfigValue::Bool),
        any::<i64>().prop_map(ConfigValue::Integer),
        (-4_000_000i32..4_000_000).prop_map(|n| ConfigValue::Float(f64::from(n) / 4.0)),
        "[ -~]{0,24}".prop_map(ConfigValue::String),
    ]
}

fn tree() -> impl Strategy<Value = Config> {
    let value = leaf().prop_recursive(3, 32, 6, |inner| {
        prop::collection::vec(("[a-z_]{1,8}", inner), 0..6)
            .prop_map(|entries| ConfigValue::Section(entries.into_iter().collect()))
    });
    prop::collection::vec(("[a-z_]{1,8}", value), 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    #[test]
    fn props_write_then_load_reproduces_tree(config in tree()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        ConfigWriter::new()
            .with_filename(&path)
            .with_config(config.clone())
            .write()
            .unwrap();

        let loaded = Config::load(&path).unwrap();
        prop_assert_eq!(loaded, config);
    }
}
