use indexmap::IndexMap;
use smallvec::{smallvec, SmallVec};

use super::{UclStr, Value, ValueKind};

/// One object entry: the original key spelling plus the chain of values
/// inserted under it. A chain longer than one element is an implicit
/// array produced by duplicate keys.
#[derive(Debug, Clone)]
pub(crate) struct Chain {
    pub(crate) key: UclStr,
    pub(crate) values: SmallVec<[Value; 1]>,
    generation: u32,
}

/// Insertion-ordered mapping from key to value chain.
///
/// Keys are unique within the map; inserting a duplicate key during a
/// parse appends to the existing entry's chain instead of discarding
/// anything. A map is either case-sensitive or folds ASCII case, chosen
/// at construction.
#[derive(Debug, Clone, Default)]
pub struct ObjectMap {
    entries: IndexMap<String, Chain>,
    case_insensitive: bool,
}

impl ObjectMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_case_insensitive() -> Self {
        Self {
            entries: IndexMap::new(),
            case_insensitive: true,
        }
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Number of distinct keys. Implicit-array chains count once.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fold(&self, key: &str) -> String {
        if self.case_insensitive {
            key.to_ascii_lowercase()
        } else {
            key.to_string()
        }
    }

    /// Head value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&self.fold(key)).map(|c| &c.values[0])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let folded = self.fold(key);
        self.entries.get_mut(&folded).map(|c| &mut c.values[0])
    }

    /// Every value inserted under a key, in insertion order.
    pub fn get_all(&self, key: &str) -> Option<&[Value]> {
        self.entries.get(&self.fold(key)).map(|c| c.values.as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&self.fold(key))
    }

    /// Replace whatever is stored under `key` with a single value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let folded = self.fold(&key);
        self.entries.insert(
            folded,
            Chain {
                key: UclStr::owned(key),
                values: smallvec![value],
                generation: 0,
            },
        );
    }

    /// Append `value` to the chain under `key`, creating the entry when
    /// absent. This is the duplicate-key behavior of the parser.
    pub fn append(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let folded = self.fold(&key);
        match self.entries.get_mut(&folded) {
            Some(chain) => chain.values.push(value),
            None => {
                self.entries.insert(
                    folded,
                    Chain {
                        key: UclStr::owned(key),
                        values: smallvec![value],
                        generation: 0,
                    },
                );
            }
        }
    }

    /// Remove an entry, returning its full chain. The caller takes
    /// ownership of the values; insertion order of other keys is kept.
    pub fn remove(&mut self, key: &str) -> Option<Vec<Value>> {
        self.entries
            .shift_remove(&self.fold(key))
            .map(|c| c.values.into_vec())
    }

    /// Collapsed iteration: one (key, head value) pair per distinct key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.values().map(|c| (c.key.as_str(), &c.values[0]))
    }

    /// Expanded iteration: every chain element, duplicates included.
    pub fn iter_expanded(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .values()
            .flat_map(|c| c.values.iter().map(move |v| (c.key.as_str(), v)))
    }

    /// Per-key chains, for callers that need the duplicate structure.
    pub fn iter_chains(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.entries
            .values()
            .map(|c| (c.key.as_str(), c.values.as_slice()))
    }

    /// Parser-side insertion. Duplicates within the same chunk
    /// generation chain into an implicit array; collisions across
    /// generations are resolved by priority: the existing value wins on
    /// higher or equal priority, except that two objects merge
    /// recursively.
    pub(crate) fn insert_parsed(&mut self, key: UclStr, value: Value, generation: u32) {
        let folded = self.fold(key.as_str());
        let Some(chain) = self.entries.get_mut(&folded) else {
            self.entries.insert(
                folded,
                Chain {
                    key,
                    values: smallvec![value],
                    generation,
                },
            );
            return;
        };

        if chain.generation == generation {
            chain.values.push(value);
            return;
        }

        let existing = &mut chain.values[0];
        if existing.is_object() && value.is_object() {
            if let (ValueKind::Object(dst), ValueKind::Object(src)) =
                (&mut existing.kind, value.kind)
            {
                dst.merge_from(src, generation);
            }
            return;
        }
        if value.priority() > existing.priority() {
            chain.key = key;
            chain.values = smallvec![value];
            chain.generation = generation;
        }
    }

    /// Merge every entry of `other` into `self` with `insert_parsed`
    /// semantics. Used when an include collides object-vs-object.
    pub(crate) fn merge_from(&mut self, other: ObjectMap, generation: u32) {
        for (_, chain) in other.entries {
            for value in chain.values {
                self.insert_parsed(chain.key.clone(), value, generation);
            }
        }
    }
}

impl PartialEq for ObjectMap {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.values().all(|chain| {
            other
                .get_all(chain.key.as_str())
                .is_some_and(|vs| vs == chain.values.as_slice())
        })
    }
}

impl FromIterator<(String, Value)> for ObjectMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut map = ObjectMap::new();
        for (k, v) in iter {
            map.append(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_insertion_order_preserved() {
        let mut map = ObjectMap::new();
        map.insert("zeta", Value::from(1));
        map.insert("alpha", Value::from(2));
        map.insert("mid", Value::from(3));
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[rstest::rstest]
    fn test_append_builds_chain_without_inflating_len() {
        let mut map = ObjectMap::new();
        map.append("a", Value::from(1));
        map.append("a", Value::from(2));
        map.append("b", Value::from(3));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get_all("a").unwrap().len(), 2);
        assert_eq!(map.iter().count(), 2);
        assert_eq!(map.iter_expanded().count(), 3);
    }

    #[rstest::rstest]
    fn test_case_insensitive_lookup_keeps_spelling() {
        let mut map = ObjectMap::new_case_insensitive();
        map.insert("Listen", Value::from("0.0.0.0"));
        assert!(map.contains_key("LISTEN"));
        assert_eq!(map.get("listen").unwrap().as_str(), Some("0.0.0.0"));
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["Listen"]);
    }

    #[rstest::rstest]
    fn test_remove_returns_chain() {
        let mut map = ObjectMap::new();
        map.append("a", Value::from(1));
        map.append("a", Value::from(2));
        let removed = map.remove("a").unwrap();
        assert_eq!(removed.len(), 2);
        assert!(map.is_empty());
        assert!(map.remove("a").is_none());
    }

    #[rstest::rstest]
    fn test_same_generation_duplicates_chain() {
        let mut map = ObjectMap::new();
        map.insert_parsed(UclStr::owned("a"), Value::from(1), 7);
        map.insert_parsed(UclStr::owned("a"), Value::from(2), 7);
        assert_eq!(map.get_all("a").unwrap().len(), 2);
    }

    #[rstest::rstest]
    fn test_cross_generation_existing_wins_on_equal_priority() {
        let mut map = ObjectMap::new();
        map.insert_parsed(UclStr::owned("a"), Value::from(1), 1);
        map.insert_parsed(UclStr::owned("a"), Value::from(2), 2);
        assert_eq!(map.get("a").unwrap().as_i64(), Some(1));
        assert_eq!(map.get_all("a").unwrap().len(), 1);
    }

    #[rstest::rstest]
    fn test_cross_generation_higher_priority_replaces() {
        let mut map = ObjectMap::new();
        map.insert_parsed(UclStr::owned("a"), Value::from(1), 1);
        map.insert_parsed(UclStr::owned("a"), Value::from(2).with_priority(3), 2);
        assert_eq!(map.get("a").unwrap().as_i64(), Some(2));
    }

    #[rstest::rstest]
    fn test_cross_generation_objects_merge_recursively() {
        let mut inner_a = ObjectMap::new();
        inner_a.insert("x", Value::from(1));
        let mut inner_b = ObjectMap::new();
        inner_b.insert("y", Value::from(2));

        let mut map = ObjectMap::new();
        map.insert_parsed(UclStr::owned("srv"), Value::object(inner_a), 1);
        map.insert_parsed(UclStr::owned("srv"), Value::object(inner_b), 2);

        let merged = map.get("srv").unwrap().as_object().unwrap();
        assert_eq!(merged.get("x").unwrap().as_i64(), Some(1));
        assert_eq!(merged.get("y").unwrap().as_i64(), Some(2));
    }

    #[rstest::rstest]
    fn test_map_equality_ignores_key_order() {
        let mut a = ObjectMap::new();
        a.insert("x", Value::from(1));
        a.insert("y", Value::from(2));
        let mut b = ObjectMap::new();
        b.insert("y", Value::from(2));
        b.insert("x", Value::from(1));
        assert_eq!(a, b);

        b.insert("x", Value::from(9));
        assert_ne!(a, b);
    }
}
