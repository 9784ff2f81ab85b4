// tests/topics_config.rs
use std::{env, fs};

use topic_digest::ingest::config::{load_topics_default, load_topics_from, ENV_TOPICS_PATH};

#[test]
fn explicit_paths_support_toml_and_json() {
    let tmp = tempfile::tempdir().unwrap();

    let toml_p = tmp.path().join("topics.toml");
    fs::write(&toml_p, "topics = [\"Robotics\", \" robotics \", \"AI safety\", \"\"]\n").unwrap();
    assert_eq!(
        load_topics_from(&toml_p).unwrap(),
        vec!["Robotics".to_string(), "AI safety".to_string()]
    );

    let json_p = tmp.path().join("topics.json");
    fs::write(&json_p, r#"["quantum computing", "Healthcare"]"#).unwrap();
    assert_eq!(
        load_topics_from(&json_p).unwrap(),
        vec!["quantum computing".to_string(), "Healthcare".to_string()]
    );

    let bad = tmp.path().join("topics.yaml");
    fs::write(&bad, "topics:\n  - a\n").unwrap();
    assert!(load_topics_from(&bad).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ does not interfere.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_TOPICS_PATH);

    // no files → no configured topics
    assert!(load_topics_default().unwrap().is_empty());

    // config/topics.json is the last fallback
    fs::create_dir_all("config").unwrap();
    fs::write("config/topics.json", r#"["from json"]"#).unwrap();
    assert_eq!(load_topics_default().unwrap(), vec!["from json".to_string()]);

    // config/topics.toml wins over json
    fs::write("config/topics.toml", r#"topics = ["from toml"]"#).unwrap();
    assert_eq!(load_topics_default().unwrap(), vec!["from toml".to_string()]);

    // env has priority
    let p = tmp.path().join("custom.json");
    fs::write(&p, r#"["from env"]"#).unwrap();
    env::set_var(ENV_TOPICS_PATH, p.display().to_string());
    assert_eq!(load_topics_default().unwrap(), vec!["from env".to_string()]);

    // env pointing nowhere is an error, not a silent fallback
    env::set_var(ENV_TOPICS_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(load_topics_default().is_err());

    env::remove_var(ENV_TOPICS_PATH);
    env::set_current_dir(&old).unwrap();
}
