//! Bounded fire-and-collect runner for named analysis units.
//!
//! A unit is a named future. At most `worker_count` units are polled at once;
//! each outcome is filed under the unit's name, so completion order never
//! shows in the result. A failing or panicking unit is recorded and its
//! siblings keep running.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};

use crate::metadata::MetadataResult;

/// A named analysis future.
pub type Unit<'a, T> = (String, BoxFuture<'a, MetadataResult<T>>);

/// Outcomes of one batch of units, keyed by unit name.
#[derive(Debug)]
pub struct UnitResults<T> {
    pub outputs: BTreeMap<String, T>,
    pub failures: BTreeMap<String, String>,
}

impl<T> Default for UnitResults<T> {
    fn default() -> Self {
        Self {
            outputs: BTreeMap::new(),
            failures: BTreeMap::new(),
        }
    }
}

impl<T> UnitResults<T> {
    pub fn len(&self) -> usize {
        self.outputs.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the successful outputs.
    pub fn take_outputs(&mut self) -> BTreeMap<String, T> {
        std::mem::take(&mut self.outputs)
    }
}

/// Run `units` with at most `worker_count` in flight.
pub async fn run_units<'a, T>(units: Vec<Unit<'a, T>>, worker_count: usize) -> UnitResults<T>
where
    T: Send + 'a,
{
    let limit = worker_count.max(1);
    let mut completed = stream::iter(units.into_iter().map(|(name, fut)| async move {
        let outcome = AssertUnwindSafe(fut).catch_unwind().await;
        (name, outcome)
    }))
    .buffer_unordered(limit);

    let mut results = UnitResults::default();
    while let Some((name, outcome)) = completed.next().await {
        match outcome {
            Ok(Ok(output)) => {
                results.outputs.insert(name, output);
            }
            Ok(Err(err)) => {
                tracing::warn!(unit = %name, error = %err, "analysis unit failed");
                results.failures.insert(name, err.to_string());
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(unit = %name, panic = %message, "analysis unit panicked");
                results.failures.insert(name, format!("analysis panicked: {}", message));
            }
        }
    }
    results
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
