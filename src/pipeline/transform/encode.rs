//! Label encoding of categorical columns.
//!
//! Codes are assigned 0..k-1 over the sorted distinct values of the batch.
//! When every distinct value is an integer literal they sort numerically,
//! otherwise lexicographically by their text form. Codes do not depend on
//! row order.

use crate::error::{EtlError, Result};
use crate::table::{Table, Value};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Vocabulary learned from one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    #[serde(skip)]
    codes: HashMap<String, i64>,
}

impl LabelEncoder {
    /// Learn the vocabulary of `values`. Missing cells are rejected.
    pub fn fit(column: &str, values: &[Value]) -> Result<Self> {
        let mut distinct: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (row, value) in values.iter().enumerate() {
            let key = category_key(column, row, value)?;
            if seen.insert(key.clone()) {
                distinct.push(key);
            }
        }

        let numeric: Option<Vec<i64>> = distinct.iter().map(|s| s.parse::<i64>().ok()).collect();
        match numeric {
            Some(nums) => {
                let mut pairs: Vec<(i64, String)> = nums.into_iter().zip(distinct).collect();
                pairs.sort();
                distinct = pairs.into_iter().map(|(_, s)| s).collect();
            }
            None => distinct.sort(),
        }

        let codes = distinct
            .iter()
            .enumerate()
            .map(|(code, class)| (class.clone(), code as i64))
            .collect();
        Ok(Self {
            classes: distinct,
            codes,
        })
    }

    /// Map values to codes. Values outside the learned vocabulary are an error.
    pub fn transform(&self, column: &str, values: Vec<Value>) -> Result<Vec<Value>> {
        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                let key = category_key(column, row, &value)?;
                self.codes
                    .get(&key)
                    .map(|code| Value::Int(*code))
                    .ok_or_else(|| EtlError::TypeCoercion {
                        column: column.to_string(),
                        row,
                        value: key,
                        expected: "known category",
                    })
            })
            .collect()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn code_of(&self, class: &str) -> Option<i64> {
        self.codes.get(class).copied()
    }
}

fn category_key(column: &str, row: usize, value: &Value) -> Result<String> {
    match value {
        Value::Null => Err(EtlError::TypeCoercion {
            column: column.to_string(),
            row,
            value: "<null>".to_string(),
            expected: "category",
        }),
        other => Ok(other.to_string()),
    }
}

/// Encoders built by one transform run, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EncoderState {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderState {
    pub fn get(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    /// Vocabulary size per encoded column.
    pub fn vocabulary_sizes(&self) -> BTreeMap<String, usize> {
        self.encoders
            .iter()
            .map(|(name, enc)| (name.clone(), enc.len()))
            .collect()
    }

    fn insert(&mut self, column: &str, encoder: LabelEncoder) {
        self.encoders.insert(column.to_string(), encoder);
    }
}

/// Fit a fresh encoder per column and replace its values with codes.
pub fn encode_columns(mut table: Table, columns: &[&str]) -> Result<(Table, EncoderState)> {
    let mut state = EncoderState::default();
    for &name in columns {
        let encoder = LabelEncoder::fit(name, &table.require(name)?.values)?;
        table = table.replace_column(name, |values| encoder.transform(name, values))?;
        state.insert(name, encoder);
    }
    Ok((table, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn texts(cells: &[&str]) -> Vec<Value> {
        cells.iter().map(|c| Value::Text(c.to_string())).collect()
    }

    #[test]
    fn test_fit_sorts_lexicographically() {
        let enc = LabelEncoder::fit("job", &texts(&["pilot", "baker", "pilot", "actor"])).unwrap();
        assert_eq!(enc.classes(), &["actor", "baker", "pilot"]);
        assert_eq!(enc.code_of("pilot"), Some(2));
    }

    #[test]
    fn test_fit_sorts_integer_literals_numerically() {
        let enc = LabelEncoder::fit("cc_num", &texts(&["100", "9", "20"])).unwrap();
        assert_eq!(enc.classes(), &["9", "20", "100"]);
    }

    #[test]
    fn test_mixed_values_fall_back_to_text_order() {
        let enc = LabelEncoder::fit("x", &texts(&["100", "9", "a"])).unwrap();
        assert_eq!(enc.classes(), &["100", "9", "a"]);
    }

    #[test]
    fn test_null_category_is_fatal() {
        let values = vec![Value::Text("a".into()), Value::Null];
        let err = LabelEncoder::fit("job", &values).unwrap_err();
        assert!(matches!(err, EtlError::TypeCoercion { row: 1, expected: "category", .. }));
    }

    #[test]
    fn test_unknown_value_is_rejected_by_transform() {
        let enc = LabelEncoder::fit("job", &texts(&["a"])).unwrap();
        assert!(enc.transform("job", texts(&["b"])).is_err());
    }

    #[test]
    fn test_encode_columns_is_independent_of_row_order() {
        let build = |cells: &[&str]| {
            Table::from_columns(vec![Column::new("category", texts(cells))]).unwrap()
        };
        let (forward, s1) = encode_columns(build(&["b", "a", "c"]), &["category"]).unwrap();
        let (reversed, s2) = encode_columns(build(&["c", "a", "b"]), &["category"]).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(
            forward.column("category").unwrap().values,
            vec![Value::Int(1), Value::Int(0), Value::Int(2)]
        );
        assert_eq!(
            reversed.column("category").unwrap().values,
            vec![Value::Int(2), Value::Int(0), Value::Int(1)]
        );
        assert_eq!(s1.vocabulary_sizes().get("category"), Some(&3));
    }
}
