//! Stress tests for recordkit.
//!
//! These helpers drive many transactions against one object from several
//! threads and report whether admission stayed exclusive.

use parking_lot::Mutex;
use recordkit_core::{CoreResult, PersistedObject, PersistenceHooks, TransactionId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Property incremented by [`stress_counter_transactions`].
pub const COUNTER: &str = "Counter";

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Transactions each thread runs.
    pub rounds: usize,
    /// How long each transaction holds the object.
    pub hold: Duration,
    /// Roll back every n-th transaction instead of ending it (0 disables).
    pub rollback_every: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            rounds: 25,
            hold: Duration::from_micros(200),
            rollback_every: 0,
        }
    }
}

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Transactions in the order they were admitted.
    pub admissions: Vec<TransactionId>,
    /// Times a transaction was admitted while another was inside.
    pub overlaps: usize,
    /// Transactions that were rolled back.
    pub rolled_back: usize,
    /// Transactions whose effects were kept.
    pub committed: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Returns true if no two transactions were ever inside together.
    pub fn is_exclusive(&self) -> bool {
        self.overlaps == 0
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Admitted: {}", self.admissions.len());
        println!("Committed: {}", self.committed);
        println!("Rolled back: {}", self.rolled_back);
        println!("Overlaps: {}", self.overlaps);
        println!("Duration: {:?}", self.duration);
    }
}

/// Runs read-increment-write transactions on [`COUNTER`] from several
/// threads.
///
/// With exclusive admission the counter ends at `committed` plus its
/// starting value; any lost update shows up as a smaller count.
///
/// # Errors
///
/// Returns the first error any transaction step raised.
pub fn stress_counter_transactions<H: PersistenceHooks + 'static>(
    object: &PersistedObject<H>,
    config: &StressConfig,
) -> CoreResult<StressTestResult> {
    let inside = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let rolled_back = Arc::new(AtomicUsize::new(0));
    let admissions = Arc::new(Mutex::new(Vec::new()));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let object = object.clone();
            let config = config.clone();
            let inside = Arc::clone(&inside);
            let overlaps = Arc::clone(&overlaps);
            let rolled_back = Arc::clone(&rolled_back);
            let admissions = Arc::clone(&admissions);
            thread::spawn(move || -> CoreResult<()> {
                for round in 1..=config.rounds {
                    let txn = object.begin_transaction()?;
                    if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    admissions.lock().push(txn.id());

                    let count = object.get_property::<i64>(COUNTER)?;
                    object.set_property_in(&txn, COUNTER, count + 1)?;
                    thread::sleep(config.hold);

                    let rollback = config.rollback_every > 0 && round % config.rollback_every == 0;
                    if rollback {
                        object.rollback(&txn)?;
                        rolled_back.fetch_add(1, Ordering::SeqCst);
                    }
                    inside.fetch_sub(1, Ordering::SeqCst);
                    object.end_transaction(&txn)?;
                }
                Ok(())
            })
        })
        .collect();

    let mut first_error = None;
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                first_error.get_or_insert(e);
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    let admissions = std::mem::take(&mut *admissions.lock());
    let rolled_back = rolled_back.load(Ordering::SeqCst);
    Ok(StressTestResult {
        committed: admissions.len() - rolled_back,
        admissions,
        overlaps: overlaps.load(Ordering::SeqCst),
        rolled_back,
        duration: start.elapsed(),
    })
}
