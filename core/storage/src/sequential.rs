//! Batch writes for backends without transactions.
//!
//! The previous value of every key in a batch is read first. Ops then run
//! in order, and when one fails the keys already written are restored in
//! reverse order before the error is returned.

use std::collections::HashMap;
use tracing::warn;

use crate::provider::StoreOp;
use vaultgate_common::Result;

/// Blocking single-key access used by [`apply_with_rollback`].
pub trait KeyValueOps {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Apply `batch` through `ops`, undoing completed writes on failure.
///
/// # Errors
/// - A read of a previous value fails (nothing has been written yet)
/// - An op fails; the first error is returned after the rollback
pub fn apply_with_rollback<S: KeyValueOps + ?Sized>(ops: &S, batch: &[StoreOp]) -> Result<()> {
    let mut previous: HashMap<&str, Option<String>> = HashMap::new();
    for op in batch {
        if !previous.contains_key(op.key()) {
            previous.insert(op.key(), ops.get(op.key())?);
        }
    }

    for (index, op) in batch.iter().enumerate() {
        let result = match op {
            StoreOp::Put { key, value } => ops.put(key, value),
            StoreOp::Delete { key } => ops.delete(key),
        };
        if let Err(e) = result {
            warn!(
                "Batch stopped at op {} of {} ({}): {}",
                index + 1,
                batch.len(),
                op.key(),
                e
            );
            restore(ops, &batch[..index], &previous);
            return Err(e);
        }
    }
    Ok(())
}

fn restore<S: KeyValueOps + ?Sized>(
    ops: &S,
    applied: &[StoreOp],
    previous: &HashMap<&str, Option<String>>,
) {
    for op in applied.iter().rev() {
        let key = op.key();
        let result = match previous.get(key) {
            Some(Some(value)) => ops.put(key, value),
            _ => ops.delete(key),
        };
        if let Err(e) = result {
            warn!("Failed to restore {} after a failed batch: {}", key, e);
        }
    }
}
