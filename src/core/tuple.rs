use std::fmt::Display;

use serde::{ser::SerializeMap, Serialize, Serializer};

use super::Datum;

/// One result row: column names paired with their values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuple {
    pub keys: Vec<String>,
    pub values: Vec<Datum>,
}

/// Ordered sequence of rows produced by a query.
pub type RowSet = Vec<Tuple>;

impl Tuple {
    pub fn new(keys: Vec<String>, values: Vec<Datum>) -> Self {
        let mut tuple = Tuple::new_default();
        for (key, value) in keys.into_iter().zip(values) {
            tuple.insert(key, value);
        }
        tuple
    }

    pub fn new_default() -> Self {
        Tuple {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Sets `key` to `value`. A row is a mapping, so a repeated column name
    /// overwrites the earlier value in place.
    pub fn insert(&mut self, key: String, value: Datum) {
        match self.keys.iter().position(|k| *k == key) {
            Some(index) => self.values[index] = value,
            None => {
                self.keys.push(key);
                self.values.push(value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get_by_name(&self, column_name: &str) -> Option<Datum> {
        self.keys
            .iter()
            .position(|key| key == column_name)
            .map(|index| self.values[index].clone())
    }

    /// Column-order independent rendering: `name:value` pairs sorted by
    /// column name and joined with `|`.
    pub fn canonical(&self) -> String {
        let mut pairs = self.keys.iter().zip(self.values.iter()).collect::<Vec<_>>();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
            .into_iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl Serialize for Tuple {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.keys.len()))?;
        for (key, value) in self.keys.iter().zip(self.values.iter()) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Display for Tuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = self
            .values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "{}", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Datum)]) -> Tuple {
        let (keys, values): (Vec<_>, Vec<_>) = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .unzip();
        Tuple::new(keys, values)
    }

    #[test]
    fn canonical_ignores_column_order() {
        let a = row(&[("name", Datum::String("ada".into())), ("id", Datum::Int(1))]);
        let b = row(&[("id", Datum::Int(1)), ("name", Datum::String("ada".into()))]);
        assert_eq!(a.canonical(), "id:1|name:ada");
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn repeated_column_keeps_last_value() {
        let t = row(&[("id", Datum::Int(1)), ("id", Datum::Int(2))]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.get_by_name("id"), Some(Datum::Int(2)));
    }

    #[test]
    fn serializes_as_object_in_select_order() {
        let t = row(&[("name", Datum::String("ada".into())), ("id", Datum::Int(1))]);
        assert_eq!(serde_json::to_string(&t).unwrap(), r#"{"name":"ada","id":1}"#);
        assert_eq!(t.to_string(), "ada, 1");
    }
}
