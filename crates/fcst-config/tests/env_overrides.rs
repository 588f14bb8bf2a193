use figment::Jail;
use fcst_config::{FcstConfig, IdenticalVersionPolicy};

#[test]
fn env_vars_map_to_nested_sections() {
    Jail::expect_with(|jail| {
        jail.set_env("FCST_CODEC__RETRACT_TOKEN", "NA");
        jail.set_env("FCST_VALIDATION__BIN_SUM_TOLERANCE", "0.01");
        jail.set_env("FCST_STORE__IDENTICAL_VERSION", "skip");

        let config = FcstConfig::load().expect("config loads");
        assert_eq!(config.codec.retract_token, "NA");
        assert!((config.validation.bin_sum_tolerance - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.store.identical_version, IdenticalVersionPolicy::Skip);
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        std::fs::create_dir(jail.directory().join(".fcst")).expect("create .fcst");
        jail.create_file(
            ".fcst/config.toml",
            r"
[store]
max_query_rows = 10
",
        )?;
        jail.set_env("FCST_STORE__MAX_QUERY_ROWS", "20");

        let config = FcstConfig::load().expect("config loads");
        assert_eq!(config.store.max_query_rows, 20);
        Ok(())
    });
}

#[test]
fn env_zero_rows_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("FCST_STORE__MAX_QUERY_ROWS", "0");
        assert!(FcstConfig::load().is_err());
        Ok(())
    });
}
