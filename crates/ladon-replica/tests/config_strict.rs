#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use ladon_replica::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
feed:
  backof_base_ms: 10 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.feed.backoff_base_ms, 100);
    assert_eq!(cfg.feed.backoff_max_ms, 30_000);
    assert!(cfg.feed.jitter);
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.kind().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn backoff_ranges_validated() {
    let inverted = r#"
version: 1
feed:
  backoff_base_ms: 500
  backoff_max_ms: 100
"#;
    assert!(config::load_from_str(inverted).is_err());

    let zero = r#"
version: 1
feed:
  backoff_base_ms: 0
"#;
    assert!(config::load_from_str(zero).is_err());
}

#[test]
fn feed_section_maps_to_backoff() {
    let cfg = config::load_from_str(
        r#"
version: 1
feed:
  backoff_base_ms: 50
  backoff_max_ms: 400
  jitter: false
"#,
    )
    .unwrap();
    let b = cfg.feed.backoff();
    assert_eq!(b.base, Duration::from_millis(50));
    assert_eq!(b.max, Duration::from_millis(400));
    assert!(!b.jitter);
}

#[test]
fn shipped_config_is_valid() {
    config::load_from_file("ladon.yaml").expect("ladon.yaml must load");
}
