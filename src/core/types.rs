use super::Value;
use std::collections::HashMap;

/// Column payload or row-targeting criteria, keyed by column name.
pub type ColumnMap = HashMap<String, Value>;

/// Build a [`ColumnMap`] from `(name, value)` pairs.
pub fn columns<K, V, I>(pairs: I) -> ColumnMap
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
