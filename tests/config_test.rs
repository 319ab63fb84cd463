use std::env;
use std::fs;
use tempfile::tempdir;

#[cfg(test)]
mod config_tests {
    use super::*;
    use claims_processor::config::Config;
    use claims_processor::live::LiveConfig;
    use std::time::Duration;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.logging.level, "ERROR");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.output, "console");

        assert_eq!(config.processing.batch_size, 10);
        assert!(config.processing.recursive);

        assert_eq!(config.streaming.poll_interval_secs, 5);
        assert_eq!(config.streaming.max_cycles, None);

        assert!(config.output.json_pretty);
        assert_eq!(config.output.metrics_file, "metrics_by_npi_ndc.json");
        assert_eq!(config.output.top_chains_file, "top2_chain_per_ndc.json");
        assert_eq!(config.output.top_quantities_file, "most_common_qty_per_ndc.json");
    }

    #[test]
    fn test_env_variable_override() {
        env::set_var("CLAIMS_BATCH_SIZE", "25");
        env::set_var("CLAIMS_JSON_PRETTY", "false");
        env::set_var("LOG_FORMAT", "json");
        env::set_var("CLAIMS_LOG_DIR", "/tmp/claims-logs");

        let mut config = Config::default();
        config
            .apply_env_overrides()
            .expect("Failed to apply env overrides");

        assert_eq!(config.processing.batch_size, 25);
        assert!(!config.output.json_pretty);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.paths.log_directory.to_str(), Some("/tmp/claims-logs"));

        env::set_var("CLAIMS_BATCH_SIZE", "lots");
        assert!(Config::default().apply_env_overrides().is_err());

        env::remove_var("CLAIMS_BATCH_SIZE");
        env::remove_var("CLAIMS_JSON_PRETTY");
        env::remove_var("LOG_FORMAT");
        env::remove_var("CLAIMS_LOG_DIR");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.processing.batch_size = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.streaming.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.output.top_chains_file = "  ".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.output.top_quantities_file = config.output.metrics_file.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_loading() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test-config.toml");

        let test_config = r#"
[logging]
level = "DEBUG"
format = "json"
output = "file"

[processing]
batch_size = 5
recursive = false

[streaming]
poll_interval_secs = 2
max_cycles = 10

[output]
json_pretty = false
metrics_file = "m.json"
top_chains_file = "c.json"
top_quantities_file = "q.json"

[paths]
log_directory = "/custom/logs"
        "#;

        fs::write(&config_path, test_config).expect("Failed to write test config");

        let config = Config::load_from_file(&config_path).expect("Failed to load config");

        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.logging.output, "file");
        assert_eq!(config.processing.batch_size, 5);
        assert!(!config.processing.recursive);
        assert_eq!(config.streaming.max_cycles, Some(10));
        assert_eq!(config.output.metrics_file, "m.json");

        let live = LiveConfig::from(&config.streaming);
        assert_eq!(live.poll_interval, Duration::from_secs(2));
        assert_eq!(live.max_cycles, Some(10));
    }

    #[test]
    fn test_malformed_config_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "[processing\nbatch_size = ").unwrap();

        assert!(Config::load_from_file(&config_path).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let toml_string = toml::to_string_pretty(&config).expect("Failed to serialize to TOML");
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("[processing]"));
        assert!(toml_string.contains("[streaming]"));
        assert!(toml_string.contains("[output]"));
        assert!(toml_string.contains("[paths]"));

        let deserialized: Config =
            toml::from_str(&toml_string).expect("Failed to deserialize TOML");
        assert_eq!(config.logging.level, deserialized.logging.level);
        assert_eq!(config.processing.batch_size, deserialized.processing.batch_size);
        assert_eq!(config.output.metrics_file, deserialized.output.metrics_file);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("saved.toml");

        let mut config = Config::default();
        config.streaming.poll_interval_secs = 42;
        config.save_to_file(&path).unwrap();

        let reloaded = Config::load_from_file(&path).unwrap();
        assert_eq!(reloaded.streaming.poll_interval_secs, 42);
    }
}
