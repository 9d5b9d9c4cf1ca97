//! Reusable functor fixtures.
//!
//! - [`CallLog`] records the order in which kernels run.
//! - [`logged_sum`] is a per-entity unit that sums its inputs plus one.
//! - [`fill_focus`] writes a constant over the focus set.
//! - [`FailAfter`] fails deterministically after N calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use choreo_core::FunctorError;
use choreo_schedule::{Functor, FunctorBuilder};

/// Shared record of kernel invocations, one name per call.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_string());
    }

    /// Every recorded call, in order.
    pub fn entries(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded calls with consecutive repeats collapsed.
    pub fn runs(&self) -> Vec<String> {
        let mut runs = self.entries();
        runs.dedup();
        runs
    }

    /// Number of calls recorded for `name`.
    pub fn count(&self, name: &str) -> usize {
        self.entries().iter().filter(|n| *n == name).count()
    }
}

/// Per-entity unit writing `1 + Σ inputs` and logging each call.
pub fn logged_sum(family: &str, name: &str, inputs: &[&str], log: &CallLog) -> FunctorBuilder {
    let log = log.clone();
    let label = name.trim_start_matches('_').to_string();
    Functor::builder(family, name)
        .inputs(inputs.iter().copied())
        .scalar(move |args| {
            log.record(&label);
            1.0 + args.iter().sum::<f64>()
        })
}

/// Iterating unit that sets `variable` to `value` for every focus entity.
pub fn fill_focus(family: &str, name: &str, variable: &str, value: f64) -> FunctorBuilder {
    let variable = variable.to_string();
    Functor::builder(family, name).sweep(move |ctx| {
        let focus = ctx.focus().to_vec();
        let store = ctx.store_mut();
        for id in focus {
            store.set(&variable, id, value)?;
        }
        Ok(())
    })
}

/// Call counter for an iterating unit that fails after `succeed_count` calls.
#[derive(Clone)]
pub struct FailAfter {
    pub succeed_count: usize,
    calls: Arc<AtomicUsize>,
}

impl FailAfter {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times the kernel has run.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Builder for the failing unit.
    pub fn builder(&self, family: &str, name: &str) -> FunctorBuilder {
        let calls = Arc::clone(&self.calls);
        let succeed_count = self.succeed_count;
        Functor::builder(family, name).sweep(move |_| {
            let n = calls.fetch_add(1, Ordering::Relaxed);
            if n >= succeed_count {
                return Err(FunctorError::ExecutionFailed {
                    reason: format!("deliberate failure after {succeed_count} successful calls"),
                });
            }
            Ok(())
        })
    }
}
