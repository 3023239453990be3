use std::fs;

use bakers_dozen::config::{self, Config, Paths};
use bakers_dozen::{LearnedDepthCache, StateKey, StrategyKind};
use pretty_assertions::assert_eq;

#[test]
fn save_merges_with_what_is_on_disk() {
    let td = tempfile::tempdir().expect("tmpdir");
    let path = td.path().join("nested").join("learned.json");

    let a = LearnedDepthCache::new();
    a.record(StateKey(1), 5);
    a.record(StateKey(2), 3);
    a.save(&path).expect("save a");

    let b = LearnedDepthCache::new();
    b.record(StateKey(1), 2);
    b.record(StateKey(2), 9);
    b.record(StateKey(3), 7);
    b.save(&path).expect("save b");

    let loaded = LearnedDepthCache::try_load(&path).expect("load");
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.get(StateKey(1)), Some(2));
    assert_eq!(loaded.get(StateKey(2)), Some(3));
    assert_eq!(loaded.get(StateKey(3)), Some(7));
    assert_eq!(loaded.origin(), Some(path.as_path()));
    assert!(!path.with_extension("json.tmp").exists());

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["version"], 1);
    assert_eq!(raw["depths"]["3"], 7);
}

#[test]
fn save_data_writes_back_to_the_origin() {
    let td = tempfile::tempdir().expect("tmpdir");
    let path = td.path().join("learned.json");
    let cache = LearnedDepthCache::load(&path);
    assert!(cache.is_empty());
    cache.record(StateKey(u64::MAX), 4);
    cache.save_data().expect("save");
    assert_eq!(LearnedDepthCache::load(&path).get(StateKey(u64::MAX)), Some(4));

    // A cache without an origin has nothing to save.
    LearnedDepthCache::new().save_data().expect("no-op");
}

#[test]
fn config_roundtrip() {
    let td = tempfile::tempdir().expect("tmpdir");
    let base = td.path();
    let cfg_dir = base.join("cfg");
    let data_dir = base.join("data");
    let paths = Paths {
        cfg_file: cfg_dir.join("config.json"),
        cfg_dir,
        log_dir: data_dir.join("logs"),
        cache_file: data_dir.join("learned.json"),
        data_dir,
    };

    assert_eq!(config::load_from(&paths), Config::default());

    let mut cfg = Config::default();
    cfg.strategy = StrategyKind::IterativeDeepening;
    cfg.search.max_states = None;
    cfg.search.ida_height = 6;
    cfg.search.weights.jitter = 0.0;
    cfg.grace_ms = 250;
    cfg.watchdog_ms = 30_000;
    config::save_atomic(&cfg, &paths).expect("save");

    let parsed = config::load_from(&paths);
    assert_eq!(parsed, cfg);
    assert_eq!(parsed.cache_path(&paths), paths.cache_file);
    assert_eq!(parsed.watchdog(), std::time::Duration::from_secs(30));

    fs::write(&paths.cfg_file, "{ \"strategy\": \"depth-bounded\" }").unwrap();
    let partial = config::load_from(&paths);
    assert_eq!(partial.strategy, StrategyKind::DepthBounded);
    assert_eq!(partial.search, Config::default().search);
}
