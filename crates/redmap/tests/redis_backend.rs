//! Runs against a live server:
//! REDMAP_TEST_REDIS_URL=redis://127.0.0.1:6379 cargo test -p redmap --test redis_backend -- --ignored

use redmap::{Database, FieldType, RedmapConfig, RedmapError, Schema, StoreError};
use serde_json::json;

fn config() -> RedmapConfig {
    let mut config = RedmapConfig::default();
    if let Ok(url) = std::env::var("REDMAP_TEST_REDIS_URL") {
        config.store.url = url;
    }
    config
}

#[tokio::test]
#[ignore]
async fn test_model_round_trip_on_redis() {
    let db = Database::new(config());
    db.connect().await.unwrap();

    let schema = Schema::builder()
        .field("id", FieldType::Number)
        .indexed("flag", FieldType::Number)
        .field("label", FieldType::String)
        .build()
        .unwrap();
    // Clear leftovers of an earlier run before registering
    let store = db.store().unwrap();
    store.drop_namespace(&"redmap-it:users".into()).await.unwrap();
    let model = db.model("redmap-it:users", schema).await.unwrap();

    let raws: Vec<_> = (0..30)
        .map(|i| json!({ "id": i, "flag": i % 3, "label": format!("u{}", i) }))
        .collect();
    model.set_many(&raws).await.unwrap();

    assert_eq!(model.find_by(&json!({ "flag": 1 })).await.unwrap().len(), 10);

    model.set(&json!({ "id": 1, "flag": 2 })).await.unwrap();
    assert_eq!(model.find_by(&json!({ "flag": 1 })).await.unwrap().len(), 9);

    store.drop_namespace(model.namespace()).await.unwrap();
    db.close().await.unwrap();
    assert!(matches!(
        model.get(1).await,
        Err(RedmapError::Store(StoreError::NotConnected))
    ));
}
