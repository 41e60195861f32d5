//! End-to-end behavior of a record: schema errors surfacing at validated
//! paths, default passthrough outside a scope, and validator chaining.

use serde_json::{json, Value};

use vrec_engine::{ChangeOptions, JsonSchema, Only, Path, Record, RecordConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn p(s: &str) -> Path {
    Path::parse(s).unwrap()
}

#[test]
fn test_null_username_reports_type_error() {
    init_tracing();
    let schema = JsonSchema::new(&json!({
        "type": "object",
        "required": ["username"],
        "properties": {"username": {"type": "string"}}
    }))
    .unwrap();
    let mut record = Record::builder().schema(schema).build().unwrap();

    record
        .change([("username", Value::Null)], ChangeOptions::new().validate())
        .unwrap();

    assert_eq!(record.active_errors(), json!({"username": "must be a string"}));
    assert_eq!(record.snapshot(), json!({"username": null}));
}

#[test]
fn test_short_array_reports_min_items_once_validated() {
    init_tracing();
    let schema = JsonSchema::new(&json!({
        "type": "object",
        "properties": {"a": {"type": "array", "minItems": 2}}
    }))
    .unwrap();
    let mut record = Record::builder()
        .schema(schema)
        .input(json!({"a": []}))
        .build()
        .unwrap();

    record
        .change_value("a[0]", Value::Null, ChangeOptions::new())
        .unwrap();
    assert_eq!(record.snapshot(), json!({"a": [null]}));
    assert_eq!(record.active_errors(), json!({}));

    record.validate(["a"]).unwrap();
    assert_eq!(
        record.active_errors(),
        json!({"a": "must contain at least 2 items"})
    );
}

#[test]
fn test_defaults_outside_single_scope_pass_through() {
    let defaults = json!({"user": {"details": {"username": "user1"}, "friendIds": []}});
    let config = RecordConfig::default().with_only(Only::Single(p("user.details")));
    let record = Record::builder()
        .config(config)
        .defaults(defaults.clone())
        .build()
        .unwrap();

    assert_eq!(record.snapshot(), defaults);
    assert_eq!(record.values_with_defaults(), json!({"username": "user1"}));
}

#[test]
fn test_chained_validators_fold_in_order() {
    init_tracing();
    let mut record = Record::builder()
        .validator_fn(|ctx| {
            let mut values = ctx.values.clone();
            let mut errors = ctx.errors.clone();
            if ctx.values_with_defaults["username"] == json!("rudeWord") {
                values["username"] = json!("******");
                errors["username"] = json!("contains profanity");
            }
            vrec_engine::StageOutput { values, errors }
        })
        .validator_fn(|ctx| vrec_engine::StageOutput::pass(ctx))
        .build()
        .unwrap();

    record
        .change_value("username", json!("rudeWord"), ChangeOptions::new().validate())
        .unwrap();

    assert_eq!(record.values(), &json!({"username": "******"}));
    assert_eq!(record.snapshot(), json!({"username": "******"}));
    assert_eq!(
        record.active_errors(),
        json!({"username": "contains profanity"})
    );
    assert_eq!(record.last_transitions().len(), 3);
}
