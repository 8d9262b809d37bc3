use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single attribute value carried by an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    List(Vec<AttrValue>),
}

/// Attribute mapping of an edge. Ordered so exports are stable.
pub type Attributes = BTreeMap<String, AttrValue>;

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "NULL"),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Real(r) => write!(f, "{}", r),
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::List(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<f64> for AttrValue {
    fn from(r: f64) -> Self {
        AttrValue::Real(r)
    }
}

/// Collects, per key, the values of every member in order. Members missing a key
/// contribute `Null` so list positions line up with the member order.
pub fn zip_attributes<'a, I>(members: I) -> Attributes
where
    I: IntoIterator<Item = &'a Attributes>,
{
    let members: Vec<&Attributes> = members.into_iter().collect();
    let mut merged: BTreeMap<String, Vec<AttrValue>> = BTreeMap::new();

    for key in members.iter().flat_map(|m| m.keys()) {
        merged.entry(key.clone()).or_default();
    }

    for (key, values) in merged.iter_mut() {
        for member in &members {
            values.push(member.get(key).cloned().unwrap_or(AttrValue::Null));
        }
    }

    merged
        .into_iter()
        .map(|(k, v)| (k, AttrValue::List(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_attributes_fills_missing_with_null() {
        let mut a = Attributes::new();
        a.insert("name".to_string(), "High St".into());
        a.insert("lanes".to_string(), AttrValue::Int(2));

        let mut b = Attributes::new();
        b.insert("name".to_string(), "Low St".into());

        let zipped = zip_attributes([&a, &b]);
        assert_eq!(
            zipped.get("name"),
            Some(&AttrValue::List(vec!["High St".into(), "Low St".into()]))
        );
        assert_eq!(
            zipped.get("lanes"),
            Some(&AttrValue::List(vec![AttrValue::Int(2), AttrValue::Null]))
        );
    }

    #[test]
    fn test_display_list() {
        let v = AttrValue::List(vec![AttrValue::Int(1), "x".into()]);
        assert_eq!(v.to_string(), "[1, x]");
    }
}
