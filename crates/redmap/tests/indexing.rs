use std::collections::BTreeSet;
use std::sync::Arc;

use redmap::{Entity, FieldType, KvBackend, Model, Query, RecordStore, Schema, Value};
use redmap_store::test_utils::CountingBackend;
use redmap_store::InMemoryBackend;
use serde_json::json;

fn schema() -> Schema {
    Schema::builder()
        .field("id", FieldType::Number)
        .indexed("flag", FieldType::Number)
        .indexed("even", FieldType::Boolean)
        .field("label", FieldType::String)
        .build()
        .unwrap()
}

fn raw(i: i64) -> serde_json::Value {
    json!({ "id": i, "flag": i % 3, "even": i % 2 == 0, "label": format!("entity-{}", i) })
}

async fn model_on(store: Arc<RecordStore>) -> Model {
    Model::register("things", schema(), store).await.unwrap()
}

async fn memory_model() -> Model {
    model_on(Arc::new(RecordStore::new(Arc::new(InMemoryBackend::new())))).await
}

fn ids_of(entities: &[Entity]) -> BTreeSet<i64> {
    entities
        .iter()
        .map(|e| e.id().as_f64().unwrap() as i64)
        .collect()
}

#[tokio::test]
async fn test_hundred_entities_by_flag() {
    let model = memory_model().await;
    for i in 1..=100 {
        model.set(&raw(i)).await.unwrap();
    }

    let found = model.find_by(&json!({ "flag": 1 })).await.unwrap();
    let expected: BTreeSet<i64> = (1..=100).filter(|i| i % 3 == 1).collect();
    assert_eq!(found.len(), 34);
    assert_eq!(ids_of(&found), expected);

    for entity in &found {
        let i = entity.id().as_f64().unwrap() as i64;
        assert_eq!(entity, &model.create(&raw(i)).unwrap());
    }
}

#[tokio::test]
async fn test_intersection_matches_linear_scan() {
    let model = memory_model().await;
    let raws: Vec<_> = (0..60).map(raw).collect();
    model.set_many(&raws).await.unwrap();
    let everything = model.all().await.unwrap();
    assert_eq!(everything.len(), 60);

    for flag in 0..3 {
        for even in [true, false] {
            let query = Query::new().where_eq("flag", flag).where_eq("even", even);
            let expected: BTreeSet<i64> = everything
                .iter()
                .filter(|e| {
                    e.get("flag") == Some(&Value::from(flag)) && e.get("even") == Some(&Value::from(even))
                })
                .map(|e| e.id().as_f64().unwrap() as i64)
                .collect();

            let found = model.find(&query).await.unwrap();
            assert_eq!(ids_of(&found), expected, "flag={} even={}", flag, even);
        }
    }
}

#[tokio::test]
async fn test_update_moves_between_entries() {
    let model = memory_model().await;
    model.set(&raw(7)).await.unwrap();
    assert_eq!(model.find_by(&json!({ "flag": 1 })).await.unwrap().len(), 1);

    model.set(&json!({ "id": 7, "flag": 2, "even": false })).await.unwrap();
    assert!(model.find_by(&json!({ "flag": 1 })).await.unwrap().is_empty());
    assert_eq!(model.find_ids(&Query::new().where_eq("flag", 2)).await.unwrap(), vec!["7"]);
}

#[tokio::test]
async fn test_unindexed_update_is_free() {
    let backend = CountingBackend::in_memory();
    let model = model_on(Arc::new(RecordStore::new(Arc::new(backend.clone())))).await;
    model.set(&raw(1)).await.unwrap();

    backend.reset();
    model
        .set(&json!({ "id": 1, "flag": 1, "even": false, "label": "renamed" }))
        .await
        .unwrap();
    assert_eq!(backend.set_mutations(), 0);
}

#[tokio::test]
async fn test_delete_removes_everything_but_registry() {
    let backend = CountingBackend::in_memory();
    let model = model_on(Arc::new(RecordStore::new(Arc::new(backend.clone())))).await;
    let raws: Vec<_> = (0..10).map(raw).collect();
    model.set_many(&raws).await.unwrap();

    let ids: Vec<Value> = (0..10i64).map(Value::from).collect();
    assert_eq!(model.del(&ids).await.unwrap(), 10);

    assert!(model.all().await.unwrap().is_empty());
    for flag in 0..3 {
        assert!(model.find_by(&json!({ "flag": flag })).await.unwrap().is_empty());
    }
    // Only the index registry survives
    assert_eq!(backend.keys_matching("*").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_batch_equals_sequential() {
    let sequential = memory_model().await;
    let batched = memory_model().await;
    let raws: Vec<_> = (0..25).map(raw).collect();

    for r in &raws {
        sequential.set(r).await.unwrap();
    }
    batched.set_many(&raws).await.unwrap();

    let ids: Vec<Value> = (0..25i64).map(Value::from).collect();
    let mut a = sequential.get_many(&ids).await.unwrap();
    let mut b = batched.get_many(&ids).await.unwrap();
    a.sort_by_key(|e| e.id().as_f64().unwrap() as i64);
    b.sort_by_key(|e| e.id().as_f64().unwrap() as i64);
    assert_eq!(a, b);

    for flag in 0..3 {
        let q = Query::new().where_eq("flag", flag);
        let mut x = sequential.find_ids(&q).await.unwrap();
        let mut y = batched.find_ids(&q).await.unwrap();
        x.sort();
        y.sort();
        assert_eq!(x, y);
    }
}

#[tokio::test]
async fn test_grouped_round_trips_bounded_by_distinct_pairs() {
    let backend = CountingBackend::in_memory();
    let model = model_on(Arc::new(RecordStore::new(Arc::new(backend.clone())))).await;
    let raws: Vec<_> = (0..300).map(raw).collect();

    backend.reset();
    model.add_many(&raws).await.unwrap();

    // 3 flag values + 2 even values
    assert_eq!(backend.set_mutations(), 5);
}
