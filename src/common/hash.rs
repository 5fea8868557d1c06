use std::hash::Hasher;

use xxhash_rust::xxh3::Xxh3;

use crate::common::labels::LabelSet;

/// Returns a canonical 64-bit hash of the label set: keys are visited in
/// lexicographic order, each key and value terminated by NUL so that
/// ("ab","c") and ("a","bc") cannot collide.
pub fn hash_labels(labels: &LabelSet) -> u64 {
    let mut hasher = Xxh3::with_seed(0);
    let mut keys: Vec<&String> = labels.keys().collect();
    keys.sort();

    for key in keys {
        hasher.write(key.as_bytes());
        hasher.write(&[0]);
        if let Some(value) = labels.get(key) {
            hasher.write(value.as_bytes());
        }
        hasher.write(&[0]);
    }
    hasher.finish()
}
