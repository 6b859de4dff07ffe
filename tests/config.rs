use std::path::PathBuf;

use queue_lens::config::{
    ConfigError, ConfigFile, ConfigSource, ProfileProblem, queue_name_from_url,
};
use queue_lens::message::MessageFormat;

fn parse(text: &str) -> ConfigFile {
    toml::from_str(text).expect("toml")
}

const VALID: &str = r#"
persist_dir = "/tmp/queue-lens-messages"

[[profiles]]
name = "checkout"
queue_url = "https://sqs.eu-west-1.amazonaws.com/000000000000/checkout-events"
aws_config_source = "profile:staging"
format = "json"
subset_key = "detail"
context_key = "tenantId"

[[profiles]]
name = "audit"
queue_url = "https://sqs.eu-west-1.amazonaws.com/000000000000/audit"
aws_config_source = "env"
format = "none"
"#;

#[test]
fn resolves_a_json_profile() {
    let file = parse(VALID);
    let config = file.profile("checkout").expect("profile");

    assert_eq!(config.queue_name, "checkout-events");
    assert_eq!(config.format, MessageFormat::Json);
    assert_eq!(
        config.aws_config_source,
        ConfigSource::SharedProfile(String::from("staging"))
    );
    assert_eq!(config.subset_key.as_deref(), Some("detail"));
    assert_eq!(config.context_key.as_deref(), Some("tenantId"));
    assert_eq!(file.persist_root(), PathBuf::from("/tmp/queue-lens-messages"));
    assert!(file.validate().is_empty());
}

#[test]
fn resolves_a_plain_text_profile() {
    let config = parse(VALID).profile("audit").expect("profile");
    assert_eq!(config.format, MessageFormat::PlainText);
    assert_eq!(config.aws_config_source, ConfigSource::Env);
    assert_eq!(config.context_key, None);
}

#[test]
fn persist_root_defaults_to_messages() {
    let file = parse("[[profiles]]\nname = \"x\"\n");
    assert_eq!(file.persist_root(), PathBuf::from("messages"));
}

#[test]
fn unknown_profile_lists_available_names() {
    let err = parse(VALID).profile("nope").expect_err("missing");
    match &err {
        ConfigError::ProfileNotFound { available, .. } => {
            assert_eq!(available, &vec![String::from("checkout"), String::from("audit")]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("checkout, audit"));
}

#[test]
fn no_profiles_is_an_error() {
    let file = parse("");
    assert!(matches!(file.profile("x"), Err(ConfigError::NoProfiles)));
    assert!(matches!(file.validate().as_slice(), [ConfigError::NoProfiles]));
}

#[test]
fn every_problem_is_reported() {
    let file = parse(
        r#"
[[profiles]]
name = "  "
queue_url = "http://localhost/queue"
aws_config_source = "assume:arn"
format = "none"
context_key = "tenant"
subset_key = " "
"#,
    );

    let errors = file.validate();
    assert_eq!(errors.len(), 1);
    let ConfigError::InvalidProfile { problems, index, .. } = &errors[0] else {
        panic!("unexpected error: {}", errors[0]);
    };
    assert_eq!(*index, 0);
    assert_eq!(
        problems,
        &vec![
            ProfileProblem::EmptyName,
            ProfileProblem::QueueUrl(String::from("http://localhost/queue")),
            ProfileProblem::ConfigSourceUnknown(String::from("assume:arn")),
            ProfileProblem::ContextKeyRequiresJson,
            ProfileProblem::SubsetKeyRequiresJson,
            ProfileProblem::SubsetKeyEmpty,
        ]
    );
}

#[test]
fn unknown_format_and_empty_source() {
    let file = parse(
        r#"
[[profiles]]
name = "bad"
queue_url = "https://sqs.eu-west-1.amazonaws.com/000000000000/q"
aws_config_source = "profile:"
format = "xml"
"#,
    );
    let err = file.profile("bad").expect_err("invalid");
    let text = err.to_string();
    assert!(text.contains("\"xml\""), "{text}");
    assert!(text.contains("config source is empty"), "{text}");
}

#[test]
fn load_reports_the_path() {
    let path = std::env::temp_dir().join(format!("ql-missing-{}.toml", uuid::Uuid::new_v4()));
    let err = ConfigFile::load(&path).expect_err("missing file");
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains(&path.display().to_string()));
}

#[test]
fn load_reads_a_file() {
    let dir = std::env::temp_dir().join(format!("ql-cfg-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("mkdir");
    let path = dir.join("queue-lens.toml");
    std::fs::write(&path, VALID).expect("write");

    let file = ConfigFile::load(&path).expect("load");
    assert_eq!(file.profiles.len(), 2);

    std::fs::write(&path, "profiles = 3").expect("write");
    assert!(matches!(ConfigFile::load(&path), Err(ConfigError::Parse { .. })));
}

#[test]
fn queue_name_is_last_path_segment() {
    assert_eq!(
        queue_name_from_url("https://sqs.us-east-1.amazonaws.com/123/orders.fifo"),
        "orders.fifo"
    );
    assert_eq!(queue_name_from_url("https://host/123/orders/"), "orders");
}
