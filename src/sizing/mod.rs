//! Deep Size Estimation Module
//!
//! Estimates the number of bytes a value occupies, including everything it
//! owns or points to, using [`deepsize`]. Used to size cache entries against
//! the memory limit.
//!
//! Shared pointees (`Rc`, `Arc`) are identified by address in the
//! estimation's [`Context`]. A pointee already visited adds nothing, so
//! cyclic graphs terminate and cost the same as the graph with the back
//! edge removed.
//!
//! Records derive [`DeepSizeOf`]. Hash tables can be costed by bucket
//! instead of by reserved capacity through [`mapping_children`] in a manual
//! impl. Payloads that cannot implement the trait are sized with an explicit
//! function instead (see `Cache::with_sizer`).
//!
//! ```
//! use memcap_cache::sizing::{estimate_size, DeepSizeOf};
//!
//! #[derive(DeepSizeOf)]
//! struct User {
//!     id: u64,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! let user = User { id: 1, name: String::with_capacity(8), tags: Vec::new() };
//! assert_eq!(estimate_size(&user), std::mem::size_of::<User>() + 8);
//! ```

use std::mem;

pub use deepsize::{Context, DeepSizeOf};

/// Bookkeeping bytes of one hash bucket.
const BUCKET_HEADER: usize = 16;
/// Key/value slots per hash bucket.
const BUCKET_SLOTS: usize = 8;
/// Average number of filled slots per bucket before the table grows.
const LOAD_FACTOR: f64 = 6.5;

/// Estimates the byte footprint of `value`, following references and
/// counting each shared pointee once.
pub fn estimate_size<T: DeepSizeOf>(value: &T) -> usize {
    value.deep_size_of()
}

// == Bucketed Mapping ==
/// Heap bytes of a hash table holding `entries`, costed by bucket: a header
/// per bucket, every key and value, and the unfilled slots as zero values.
///
/// Meant for `deep_size_of_children` of types wrapping a map.
pub fn mapping_children<'a, K, V, I>(entries: I, context: &mut Context) -> usize
where
    K: DeepSizeOf + 'a,
    V: DeepSizeOf + 'a,
    I: ExactSizeIterator<Item = (&'a K, &'a V)>,
{
    let slot = mem::size_of::<K>() + mem::size_of::<V>();
    let len = entries.len();
    let buckets = bucket_count(len);

    let filled: usize = entries
        .map(|(key, value)| {
            slot + key.deep_size_of_children(context) + value.deep_size_of_children(context)
        })
        .sum();
    let empty_slots = (buckets * BUCKET_SLOTS).saturating_sub(len);

    BUCKET_HEADER * buckets + filled + empty_slots * slot
}

/// Buckets a hash table holds for `len` entries: the smallest power of two
/// keeping the load under [`LOAD_FACTOR`], at least one.
fn bucket_count(len: usize) -> usize {
    if len == 0 {
        return 1;
    }
    ((len as f64 / LOAD_FACTOR).ceil() as usize).next_power_of_two()
}
