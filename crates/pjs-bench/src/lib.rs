//! Shared fixtures for the storage benchmarks
//!
//! Documents are generated deterministically so that runs stay comparable.

use std::fmt::Write as _;

pub use pjson_rs_storage::{Error, Result};

/// Single flat object
pub const SMALL_JSON: &str = r#"{"id": 1, "name": "test", "status": "active"}"#;

/// Nested user record with a short array
pub const MEDIUM_JSON: &str = r#"{
  "user": {
    "id": 12345,
    "name": "John Doe",
    "email": "john.doe@example.com",
    "status": "active",
    "profile": {
      "bio": "Software engineer",
      "location": "San Francisco",
      "company": "TechCorp"
    },
    "posts": [
      {"id": 1, "title": "Hello World", "likes": 25},
      {"id": 2, "title": "Tech Tips", "likes": 42}
    ]
  }
}"#;

/// Catalogue of `items` records, each with nested metadata and tags
pub fn catalogue_json(items: usize) -> String {
    let mut out = String::from(r#"{"data": ["#);
    for i in 0..items {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(
            out,
            r#"{{"id": {i}, "name": "Item {i}", "description": "This is item number {i} "#
        );
        let _ = write!(
            out,
            r#"with some content", "price": {:.2}, "category": "Category {}", "active": {}, "#,
            i as f64 * 1.5 + 10.0,
            i % 10,
            i % 2 == 0
        );
        out.push_str(
            r#""metadata": {"created": "2024-01-01T10:30:00Z", "tags": ["tag1", "tag2", "tag3"]}}"#,
        );
    }
    let _ = write!(out, r#"], "total": {items}, "page": 1, "#);
    out.push_str(r#""metadata": {"generated_at": "2024-01-15T12:00:00Z", "version": "1.0"}}"#);
    out
}

/// Array nested `depth` levels deep around a single number
pub fn nested_json(depth: usize) -> String {
    let mut out = "[".repeat(depth);
    out.push('0');
    out.push_str(&"]".repeat(depth));
    out
}

/// Named fixtures used by every parsing benchmark
pub fn fixtures() -> Vec<(&'static str, String)> {
    vec![
        ("small", SMALL_JSON.to_string()),
        ("medium", MEDIUM_JSON.to_string()),
        ("large", catalogue_json(1000)),
    ]
}
