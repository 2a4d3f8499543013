//! Request bodies sent to Elasticsearch.

use serde_json::{Value, json};

use crate::domain::entities::PostId;

/// Index mapping: 64-bit id, analyzed title and content, exact-match tags.
pub(crate) fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "long" },
                "title": { "type": "text", "analyzer": "standard" },
                "content": { "type": "text", "analyzer": "standard" },
                "tags": { "type": "keyword" }
            }
        }
    })
}

pub(crate) fn full_text(query: &str, size: usize) -> Value {
    json!({
        "query": {
            "multi_match": {
                "query": query,
                "fields": ["title", "content"],
                "type": "best_fields",
                "fuzziness": "AUTO"
            }
        },
        "sort": [{ "_score": { "order": "desc" } }],
        "from": 0,
        "size": size
    })
}

pub(crate) fn related_by_tags(tags: &[String], exclude_id: PostId, size: usize) -> Value {
    let should: Vec<Value> = tags
        .iter()
        .map(|tag| json!({ "term": { "tags": tag } }))
        .collect();
    json!({
        "query": {
            "bool": {
                "should": should,
                "must_not": [{ "term": { "id": exclude_id } }],
                "minimum_should_match": 1
            }
        },
        "sort": [{ "_score": { "order": "desc" } }],
        "size": size
    })
}
