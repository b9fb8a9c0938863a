use simpledex_core::{hash_blake3, Hash};

/// Compute state root from key-value pairs
///
/// Entries are sorted by key first, so input order does not matter.
pub fn compute_state_root<'a, I>(entries: I) -> Hash
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let mut sorted: Vec<_> = entries.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let leaves: Vec<Hash> = sorted
        .iter()
        .map(|(k, v)| {
            let mut data = Vec::with_capacity(k.len() + v.len());
            data.extend_from_slice(k);
            data.extend_from_slice(v);
            hash_blake3(&data)
        })
        .collect();

    merkle_root(&leaves)
}

fn merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return Hash::ZERO;
    }

    let mut level = hashes.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|chunk| {
                // Odd node count: the last node is paired with itself
                let right = chunk.get(1).unwrap_or(&chunk[0]);
                let mut data = [0u8; 64];
                data[..32].copy_from_slice(chunk[0].as_bytes());
                data[32..].copy_from_slice(right.as_bytes());
                hash_blake3(&data)
            })
            .collect();
    }

    level[0]
}
