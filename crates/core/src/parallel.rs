//! Parallel/sequential execution helpers.
//!
//! Walk-forward windows and sweep cells are independent, so they are mapped
//! over rayon's pool. Every helper takes a `force_sequential` flag so tests
//! and profiling can run the same code path on one thread.

use rayon::prelude::*;

/// Map a function over a slice, potentially in parallel.
///
/// Returns results in input order regardless of the execution mode.
#[inline]
pub fn map_slice<T, F, R>(slice: &[T], f: F, force_sequential: bool) -> Vec<R>
where
    T: Sync,
    F: Fn(&T) -> R + Sync + Send,
    R: Send,
{
    if force_sequential {
        slice.iter().map(f).collect()
    } else {
        slice.par_iter().map(f).collect()
    }
}

/// Filter-map over a slice, potentially in parallel, keeping input order.
#[inline]
pub fn filter_map_slice<T, F, R>(slice: &[T], f: F, force_sequential: bool) -> Vec<R>
where
    T: Sync,
    F: Fn(&T) -> Option<R> + Sync + Send,
    R: Send,
{
    if force_sequential {
        slice.iter().filter_map(f).collect()
    } else {
        slice.par_iter().filter_map(f).collect()
    }
}
