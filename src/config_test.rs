use super::*;

#[test]
fn move_rule_defaults_to_any() {
    assert_eq!(parse_move_rule(None).unwrap(), MoveRule::Any);
    assert_eq!(parse_move_rule(Some("")).unwrap(), MoveRule::Any);
    assert_eq!(parse_move_rule(Some("any")).unwrap(), MoveRule::Any);
}

#[test]
fn move_rule_accepts_match_aliases() {
    assert_eq!(parse_move_rule(Some("match")).unwrap(), MoveRule::MatchTop);
    assert_eq!(parse_move_rule(Some(" match_top ")).unwrap(), MoveRule::MatchTop);
}

#[test]
fn move_rule_rejects_unknown() {
    let err = parse_move_rule(Some("strict")).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidMoveRule(ref raw) if raw == "strict"));
    assert!(err.to_string().contains("strict"));
}

#[test]
fn env_parse_falls_back_on_missing_key() {
    let value: u64 = env_parse("BALLSORT_TEST_SURELY_UNSET_KEY", 42);
    assert_eq!(value, 42);
}

#[test]
fn default_config_matches_constants() {
    let cfg = GameConfig::default();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.max_payload_bytes, 1024);
    assert_eq!(cfg.rate_limit_window, Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS));
    assert_eq!(cfg.move_rule, MoveRule::Any);
}

#[test]
fn positive_rejects_zero_durations_and_counts() {
    let err = positive("SWEEP_INTERVAL_SECS", Duration::ZERO).unwrap_err();
    assert!(matches!(err, ConfigError::NotPositive { key: "SWEEP_INTERVAL_SECS" }));
    assert!(err.to_string().contains("SWEEP_INTERVAL_SECS"));

    assert!(positive("RATE_LIMIT_WINDOW_MS", Duration::from_millis(0)).is_err());
    assert!(positive("RATE_LIMIT_MAX_MESSAGES", 0_u32).is_err());
    assert_eq!(positive("RATE_LIMIT_MAX_MESSAGES", 5_u32).unwrap(), 5);
    assert_eq!(
        positive("SWEEP_INTERVAL_SECS", Duration::from_secs(1)).unwrap(),
        Duration::from_secs(1)
    );
}

// Single test so the env mutations below never interleave.
#[test]
fn from_env_rejects_zero_sweep_interval_and_rate_window() {
    unsafe { std::env::set_var("SWEEP_INTERVAL_SECS", "0") };
    let err = GameConfig::from_env().unwrap_err();
    unsafe { std::env::remove_var("SWEEP_INTERVAL_SECS") };
    assert!(matches!(err, ConfigError::NotPositive { key: "SWEEP_INTERVAL_SECS" }));

    unsafe { std::env::set_var("RATE_LIMIT_WINDOW_MS", "0") };
    let err = GameConfig::from_env().unwrap_err();
    unsafe { std::env::remove_var("RATE_LIMIT_WINDOW_MS") };
    assert!(matches!(err, ConfigError::NotPositive { key: "RATE_LIMIT_WINDOW_MS" }));

    let cfg = GameConfig::from_env().expect("defaults are valid");
    assert_eq!(cfg.sweep_interval, Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));
}
