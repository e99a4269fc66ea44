// src/db/query.rs
//
// Filter and sort evaluation shared by the store backends.

use std::cmp::Ordering;

use serde_json::Value;

use super::document_store::{Document, Filter, FindQuery, SortOrder};

/// Every filter key must match. A missing document field matches `null`;
/// an array field matches a scalar it contains.
pub fn matches(document: &Document, filter: &Filter) -> bool {
    filter.iter().all(|(key, expected)| {
        let actual = document.get(key).unwrap_or(&Value::Null);
        value_matches(actual, expected)
    })
}

fn value_matches(actual: &Value, expected: &Value) -> bool {
    if values_equal(actual, expected) {
        return true;
    }
    match actual {
        Value::Array(items) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        _ => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order used for sorting: null < bool < number < string < array < object
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(xs), Value::Array(ys)) => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| compare_values(x, y))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_documents(a: &Document, b: &Document, sort: &[(String, SortOrder)]) -> Ordering {
    for (key, order) in sort {
        let ordering = compare_values(
            a.get(key).unwrap_or(&Value::Null),
            b.get(key).unwrap_or(&Value::Null),
        );
        let ordering = match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering.is_ne() {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Filter, sort (stable), skip and limit, cloning only what is returned
pub fn select(documents: &[Document], filter: &Filter, query: &FindQuery) -> Vec<Document> {
    let mut matched: Vec<&Document> = documents.iter().filter(|d| matches(d, filter)).collect();

    if !query.sort.is_empty() {
        matched.sort_by(|a, b| compare_documents(a, b, &query.sort));
    }

    matched
        .into_iter()
        .skip(query.skip)
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}
