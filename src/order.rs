//! Reshapes the unordered rows returned by a bulk fetch back into results
//! aligned with the keys that were requested.
//!
//! Both operations build one index from correlation value to row(s) and then
//! project it over the requested keys, so they run in `O(rows + keys)`. A key
//! without rows is not an error: it maps to `None` for [`one_to_one`] and to
//! an empty `Vec` for [`one_to_many`].

use std::collections::HashMap;
use std::hash::Hash;

/// A row with a primary identity. The identity is the default correlation
/// field used by [`one_to_one`] and [`one_to_many`].
pub trait Row {
    type Id: Clone + Hash + Eq;

    fn id(&self) -> Self::Id;
}

/// Aligns rows to `keys` by their primary identity. See [`one_to_one_by`].
pub fn one_to_one<R>(keys: &[R::Id], rows: Vec<R>) -> Vec<Option<R>>
where
    R: Row + Clone,
{
    one_to_one_by(keys, rows, R::id)
}

/// Aligns rows to `keys` using `field` as the correlation value. Position `i`
/// of the result holds the row matching `keys[i]`, or `None` when nothing
/// matched.
///
/// Storage is expected to return at most one row per key. When it returns
/// more, the first matching row in `rows` wins and later ones are ignored.
pub fn one_to_one_by<K, R>(keys: &[K], rows: Vec<R>, field: impl Fn(&R) -> K) -> Vec<Option<R>>
where
    K: Hash + Eq,
    R: Clone,
{
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        index.entry(field(&row)).or_insert(row);
    }

    keys.iter().map(|key| index.get(key).cloned()).collect()
}

/// Groups rows under `keys` by their primary identity. See [`one_to_many_by`].
pub fn one_to_many<R>(keys: &[R::Id], rows: Vec<R>) -> Vec<Vec<R>>
where
    R: Row + Clone,
{
    one_to_many_by(keys, rows, R::id)
}

/// Groups rows under `keys` using `field` as the correlation value. Position
/// `i` holds every row matching `keys[i]`, in the order those rows appeared
/// in `rows`.
pub fn one_to_many_by<K, R>(keys: &[K], rows: Vec<R>, field: impl Fn(&R) -> K) -> Vec<Vec<R>>
where
    K: Hash + Eq,
    R: Clone,
{
    let mut index: HashMap<K, Vec<R>> = HashMap::new();
    for row in rows {
        index.entry(field(&row)).or_default().push(row);
    }

    keys.iter()
        .map(|key| index.get(key).cloned().unwrap_or_default())
        .collect()
}
