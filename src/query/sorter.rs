//! Single-key record ordering
//!
//! Nulls and absent fields sort last ascending and first descending.
//! Keys of incompatible value families abort the sort with an error
//! before any record moves.

use std::borrow::Borrow;
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::errors::QueryError;
use super::field::resolve_present;
use crate::canonical::{tagged_dict, Dict, DictSerializable, Record};

/// Sort order: one field path and a direction flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSort {
    /// Dotted path of the sort key
    pub field: String,
    /// Descending when true
    #[serde(default)]
    pub reversed: bool,
}

impl SingleSort {
    pub fn new(field: impl Into<String>, reversed: bool) -> Self {
        Self {
            field: field.into(),
            reversed,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, false)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, true)
    }

    /// Compares two records on the sort key, direction applied.
    pub fn compare(&self, a: &Record, b: &Record) -> Result<Ordering, QueryError> {
        let ordering = match (
            resolve_present(a, &self.field),
            resolve_present(b, &self.field),
        ) {
            (None, None) => return Ok(Ordering::Equal),
            (None, Some(_)) => return Ok(self.nulls(Ordering::Greater)),
            (Some(_), None) => return Ok(self.nulls(Ordering::Less)),
            (Some(x), Some(y)) => self.compare_values(x, y)?,
        };
        Ok(if self.reversed {
            ordering.reverse()
        } else {
            ordering
        })
    }

    /// Stable in-place sort.
    ///
    /// Every present key is checked before anything moves: keys from more
    /// than one value family fail the sort and leave the slice untouched.
    pub fn sort<R: Borrow<Record>>(&self, records: &mut [R]) -> Result<(), QueryError> {
        self.check_families(records)?;
        // Keys share one family, so `compare` is a total order here
        records.sort_by(|a, b| {
            self.compare(a.borrow(), b.borrow())
                .unwrap_or(Ordering::Equal)
        });
        Ok(())
    }

    fn check_families<R: Borrow<Record>>(&self, records: &[R]) -> Result<(), QueryError> {
        let mut first: Option<(&Value, Option<Family>)> = None;
        for record in records {
            let Some(value) = resolve_present(record.borrow(), &self.field) else {
                continue;
            };
            let family = Family::of(value);
            match first {
                None => first = Some((value, family)),
                Some((seen, seen_family)) => {
                    if seen_family.is_none() || seen_family != family {
                        return Err(self.not_comparable(seen, value));
                    }
                }
            }
        }
        Ok(())
    }

    /// Placement of a null key relative to a present one; the reverse flag
    /// flips it together with value ordering.
    fn nulls(&self, ascending: Ordering) -> Ordering {
        if self.reversed {
            ascending.reverse()
        } else {
            ascending
        }
    }

    fn compare_values(&self, a: &Value, b: &Value) -> Result<Ordering, QueryError> {
        match (SortKey::of(a), SortKey::of(b)) {
            (Some(SortKey::Numeric(x)), Some(SortKey::Numeric(y))) => Ok(x.cmp_exact(y)),
            (Some(SortKey::Text(x)), Some(SortKey::Text(y))) => Ok(x.cmp(y)),
            _ => Err(self.not_comparable(a, b)),
        }
    }

    fn not_comparable(&self, a: &Value, b: &Value) -> QueryError {
        QueryError::NotComparable {
            field: self.field.clone(),
            left: a.to_string(),
            right: b.to_string(),
        }
    }
}

/// Value families that order among themselves. Booleans order as 0 and 1
/// among numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Numeric,
    Text,
}

impl Family {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) | Value::Number(_) => Some(Family::Numeric),
            Value::String(_) => Some(Family::Text),
            _ => None,
        }
    }
}

enum SortKey<'a> {
    Numeric(Numeric),
    Text(&'a str),
}

impl<'a> SortKey<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(SortKey::Numeric(Numeric::Int(i128::from(*b)))),
            Value::Number(n) => Some(SortKey::Numeric(Numeric::of(n))),
            Value::String(s) => Some(SortKey::Text(s)),
            _ => None,
        }
    }
}

/// A JSON number compared exactly, integers against floats included.
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    fn of(n: &Number) -> Self {
        match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => Numeric::Int(i128::from(i)),
            (None, Some(u)) => Numeric::Int(i128::from(u)),
            _ => Numeric::Float(n.as_f64().unwrap_or(0.0)),
        }
    }

    fn cmp_exact(self, other: Numeric) -> Ordering {
        match (self, other) {
            (Numeric::Int(i), Numeric::Int(j)) => i.cmp(&j),
            (Numeric::Int(i), Numeric::Float(f)) => int_float_cmp(i, f),
            (Numeric::Float(f), Numeric::Int(i)) => int_float_cmp(i, f).reverse(),
            // JSON numbers are never NaN
            (Numeric::Float(f), Numeric::Float(g)) => {
                f.partial_cmp(&g).unwrap_or(Ordering::Equal)
            }
        }
    }
}

/// Integers here lie in [-2^63, 2^64), where every integral f64 converts
/// to i128 exactly.
fn int_float_cmp(i: i128, f: f64) -> Ordering {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f >= 2.0 * TWO_POW_63 {
        return Ordering::Less;
    }
    if f < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i128)) {
        Ordering::Equal => 0.0_f64
            .partial_cmp(&(f - whole))
            .unwrap_or(Ordering::Equal),
        ordering => ordering,
    }
}

impl DictSerializable for SingleSort {
    const CLASS_NAME: &'static str = "SingleSort";
    const VERSION: &'static str = "2";
    type Error = QueryError;

    fn to_dict(&self) -> Dict {
        tagged_dict(self, Self::CLASS_NAME, Self::VERSION)
    }

    fn from_dict(src: &Dict) -> Result<Self, QueryError> {
        serde_json::from_value(Value::Object(src.clone())).map_err(|e| QueryError::Malformed {
            class_name: Self::CLASS_NAME,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn keys(records: &[Record]) -> Vec<Value> {
        records
            .iter()
            .map(|r| r.get("f").cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn test_nulls_last_ascending() {
        let mut rs = records(vec![json!({"f": 1}), json!({"f": null}), json!({"f": 2})]);
        SingleSort::asc("f").sort(&mut rs).unwrap();
        assert_eq!(keys(&rs), vec![json!(1), json!(2), Value::Null]);
    }

    #[test]
    fn test_nulls_first_descending() {
        let mut rs = records(vec![json!({"f": 1}), json!({"f": null}), json!({"f": 2})]);
        SingleSort::desc("f").sort(&mut rs).unwrap();
        assert_eq!(keys(&rs), vec![Value::Null, json!(2), json!(1)]);
    }

    #[test]
    fn test_absent_field_behaves_like_null() {
        let mut rs = records(vec![json!({}), json!({"f": "b"}), json!({"f": "a"})]);
        SingleSort::asc("f").sort(&mut rs).unwrap();
        assert_eq!(keys(&rs), vec![json!("a"), json!("b"), Value::Null]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut rs = records(vec![
            json!({"f": 1, "id": "a"}),
            json!({"f": 1, "id": "b"}),
            json!({"f": 0, "id": "c"}),
        ]);
        SingleSort::asc("f").sort(&mut rs).unwrap();
        let ids: Vec<_> = rs.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("c"), json!("a"), json!("b")]);
    }

    #[test]
    fn test_mixed_families_fail() {
        let mut rs = records(vec![json!({"f": 1}), json!({"f": "one"})]);
        let err = SingleSort::asc("f").sort(&mut rs).unwrap_err();
        assert!(matches!(err, QueryError::NotComparable { .. }));
    }

    #[test]
    fn test_mixed_families_fail_before_reordering() {
        let mut rs = records(
            (0..60)
                .map(|i| {
                    if i % 3 == 0 {
                        json!({"f": format!("s{}", i)})
                    } else {
                        json!({"f": 60 - i})
                    }
                })
                .collect(),
        );
        let before = rs.clone();
        for sort in [SingleSort::asc("f"), SingleSort::desc("f")] {
            let err = sort.sort(&mut rs).unwrap_err();
            assert!(matches!(err, QueryError::NotComparable { .. }));
            assert_eq!(rs, before);
        }
    }

    #[test]
    fn test_single_unorderable_key_among_nulls_sorts() {
        let mut rs = records(vec![json!({"f": null}), json!({"f": [1, 2]}), json!({})]);
        SingleSort::asc("f").sort(&mut rs).unwrap();
        assert_eq!(rs[0]["f"], json!([1, 2]));
    }

    #[test]
    fn test_array_keys_fail() {
        let mut rs = records(vec![json!({"f": [1]}), json!({"f": [2]})]);
        assert!(SingleSort::asc("f").sort(&mut rs).is_err());
    }

    #[test]
    fn test_booleans_order_among_numbers() {
        let mut rs = records(vec![
            json!({"f": 2}),
            json!({"f": true}),
            json!({"f": 0.5}),
            json!({"f": false}),
        ]);
        SingleSort::asc("f").sort(&mut rs).unwrap();
        assert_eq!(
            keys(&rs),
            vec![json!(false), json!(0.5), json!(true), json!(2)]
        );
    }

    #[test]
    fn test_integers_and_floats_compare_exactly() {
        let mut rs = records(vec![
            json!({"f": 3}),
            json!({"f": 2.5}),
            json!({"f": -1.5}),
            json!({"f": -1}),
            json!({"f": u64::MAX}),
            json!({"f": -2}),
        ]);
        SingleSort::asc("f").sort(&mut rs).unwrap();
        assert_eq!(
            keys(&rs),
            vec![
                json!(-2),
                json!(-1.5),
                json!(-1),
                json!(2.5),
                json!(3),
                json!(u64::MAX)
            ]
        );
    }

    #[test]
    fn test_sorts_borrowed_records() {
        let rs = records(vec![json!({"f": 3}), json!({"f": 1})]);
        let mut refs: Vec<&Record> = rs.iter().collect();
        SingleSort::asc("f").sort(&mut refs).unwrap();
        assert_eq!(refs[0]["f"], json!(1));
    }

    #[test]
    fn test_dict_form() {
        let sort = SingleSort::desc("age");
        let d = sort.to_dict();
        assert_eq!(d["className"], json!("SingleSort"));
        assert_eq!(d["reversed"], json!(true));
        assert_eq!(SingleSort::from_dict(&d).unwrap(), sort);
    }
}
