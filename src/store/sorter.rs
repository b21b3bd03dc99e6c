//! Row ordering for the in-memory store
//!
//! Sorts rows by one or more fields, deterministically.

use std::cmp::Ordering;

use serde_json::Value;

use super::matcher::compare_values;
use super::{SortDirection, SortSpec, StoredDocument};

/// Sorts stored rows
pub struct DocumentSorter;

impl DocumentSorter {
    /// Sorts rows according to the sort specifications, first spec first.
    ///
    /// Sort is stable; rows that compare equal keep insertion order.
    pub fn sort(documents: &mut [StoredDocument], specs: &[SortSpec]) {
        if specs.is_empty() {
            return;
        }

        documents.sort_by(|a, b| {
            for spec in specs {
                let a_val = a.field(&spec.field);
                let b_val = b.field(&spec.field);

                let ordering = Self::compare_fields(a_val.as_ref(), b_val.as_ref());
                let ordering = match spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };

                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Compares two JSON values for sorting.
    ///
    /// Ordering rules:
    /// - missing < null < bool < number < string < array < object
    /// - For same types, natural ordering
    fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let type_order = |v: &Value| -> u8 {
                    match v {
                        Value::Null => 0,
                        Value::Bool(_) => 1,
                        Value::Number(_) => 2,
                        Value::String(_) => 3,
                        Value::Array(_) => 4,
                        Value::Object(_) => 5,
                    }
                };

                let a_type = type_order(a_val);
                let b_type = type_order(b_val);

                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                // Same ordering filters use; arrays and objects are not compared
                compare_values(a_val, b_val).unwrap_or(Ordering::Equal)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_doc(id: &str, body: Value) -> StoredDocument {
        StoredDocument::new(id, body.as_object().cloned().unwrap_or_default())
    }

    fn ids(docs: &[StoredDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_sort_ascending_and_descending() {
        let mut docs = vec![
            make_doc("c", json!({"age": 30.0})),
            make_doc("a", json!({"age": 20.0})),
            make_doc("b", json!({"age": 25.0})),
        ];

        DocumentSorter::sort(&mut docs, &[SortSpec::asc("age")]);
        assert_eq!(ids(&docs), vec!["a", "b", "c"]);

        DocumentSorter::sort(&mut docs, &[SortSpec::desc("age")]);
        assert_eq!(ids(&docs), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_stable() {
        let mut docs = vec![
            make_doc("a", json!({"age": 25})),
            make_doc("b", json!({"age": 25})),
            make_doc("c", json!({"age": 25})),
        ];

        DocumentSorter::sort(&mut docs, &[SortSpec::asc("age")]);
        assert_eq!(ids(&docs), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_secondary_key() {
        let mut docs = vec![
            make_doc("1", json!({"name": "Doe", "age": 40})),
            make_doc("2", json!({"name": "Aunty", "age": 42})),
            make_doc("3", json!({"name": "Doe", "age": 34})),
        ];

        DocumentSorter::sort(&mut docs, &[SortSpec::asc("name"), SortSpec::desc("age")]);
        assert_eq!(ids(&docs), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_large_ints_sort_exactly() {
        // Both round to the same f64
        let big = 9_007_199_254_740_993i64;
        let mut docs = vec![
            make_doc("a", json!({"n": big})),
            make_doc("b", json!({"n": big - 1})),
        ];

        DocumentSorter::sort(&mut docs, &[SortSpec::asc("n")]);
        assert_eq!(ids(&docs), vec!["b", "a"]);
    }

    #[test]
    fn test_missing_sorts_first() {
        let mut docs = vec![
            make_doc("a", json!({"age": 1})),
            make_doc("b", json!({})),
            make_doc("c", json!({"age": null})),
        ];

        DocumentSorter::sort(&mut docs, &[SortSpec::asc("age")]);
        assert_eq!(ids(&docs), vec!["b", "c", "a"]);
    }
}
