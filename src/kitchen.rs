//! Kitchen demos: cooperative concurrency on a tokio runtime.
//!
//! A burger takes longer than a bun. Cooking them one after the other
//! costs the sum of both; cooking them concurrently costs the longer one.
//! The remaining demos cover timeouts, cancellation with cleanup, task
//! groups, completion-order streaming, and moving blocking or CPU-bound
//! work off the async threads.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const BURGER: &str = "Cooked 'Burger'!!";
pub const BUN: &str = "Cooked 'Bun'!!";

/// How long each step takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KitchenTimings {
    pub burger: Duration,
    pub bun: Duration,
    /// Blocking I/O stand-in run on the blocking pool.
    pub blocking: Duration,
    /// CPU-bound stand-in run on worker threads.
    pub cpu_task: Duration,
}

impl Default for KitchenTimings {
    fn default() -> Self {
        Self {
            burger: Duration::from_secs(2),
            bun: Duration::from_secs(1),
            blocking: Duration::from_secs(1),
            cpu_task: Duration::from_secs(2),
        }
    }
}

/// Dishes in the order they were returned, plus wall time.
#[derive(Debug, Clone)]
pub struct Order {
    pub dishes: Vec<String>,
    pub elapsed: Duration,
}

/// How a cancelled cook ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The task beat the cancellation.
    Finished(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Kitchen {
    timings: KitchenTimings,
}

impl Kitchen {
    pub fn new(timings: KitchenTimings) -> Self {
        Self { timings }
    }

    pub async fn cook_burger(&self) -> String {
        info!("Grilling Burger...");
        tokio::time::sleep(self.timings.burger).await;
        info!("Burger is ready!");
        BURGER.to_string()
    }

    pub async fn toast_bun(&self) -> String {
        info!("Toasting bun...");
        tokio::time::sleep(self.timings.bun).await;
        info!("Bun is ready!");
        BUN.to_string()
    }

    /// One dish after the other. Non-blocking, but not concurrent.
    pub async fn prepare_sequential(&self) -> Order {
        let start = Instant::now();
        let burger = self.cook_burger().await;
        let bun = self.toast_bun().await;
        let elapsed = start.elapsed();
        info!(
            "Time taken to prepare order: {:.3} seconds",
            elapsed.as_secs_f64()
        );
        Order {
            dishes: vec![burger, bun],
            elapsed,
        }
    }

    /// Both dishes at once on the current task.
    pub async fn prepare_concurrent(&self) -> Order {
        let start = Instant::now();
        let (burger, bun) = tokio::join!(self.cook_burger(), self.toast_bun());
        let elapsed = start.elapsed();
        info!(
            "Time taken to prepare order (concurrently): {:.3} seconds",
            elapsed.as_secs_f64()
        );
        Order {
            dishes: vec![burger, bun],
            elapsed,
        }
    }

    /// Give up on the burger once `limit` has passed. The cook future is
    /// dropped, which cancels it.
    pub async fn cook_with_timeout(&self, limit: Duration) -> Result<String> {
        tokio::time::timeout(limit, self.cook_burger())
            .await
            .map_err(|_| Error::Timeout(limit))
    }

    /// Start the burger as its own task and abort it after `delay`.
    /// Cleanup runs whichever way the task ended.
    pub async fn cancel_after(&self, delay: Duration) -> Result<CancelOutcome> {
        let kitchen = *self;
        let task = tokio::spawn(async move { kitchen.cook_burger().await });
        tokio::time::sleep(delay).await;
        task.abort();

        let outcome = match task.await {
            Ok(dish) => Ok(CancelOutcome::Finished(dish)),
            Err(e) if e.is_cancelled() => {
                info!("Burger task was cancelled.");
                Ok(CancelOutcome::Cancelled)
            }
            Err(e) => Err(Error::Task(e)),
        };
        info!("Cleaning up...");
        outcome
    }

    /// Both dishes as a task group: every task finishes before this
    /// returns, and the first failure aborts the rest.
    /// Results come back burger first, bun second.
    pub async fn task_group(&self) -> Result<Vec<String>> {
        let mut group = JoinSet::new();
        let kitchen = *self;
        group.spawn(async move { (0, kitchen.cook_burger().await) });
        group.spawn(async move { (1, kitchen.toast_bun().await) });

        let mut dishes = vec![String::new(), String::new()];
        while let Some(joined) = group.join_next().await {
            match joined {
                Ok((idx, dish)) => dishes[idx] = dish,
                Err(e) => {
                    group.abort_all();
                    return Err(Error::Task(e));
                }
            }
        }
        info!(
            "Both tasks have completed now: {}, {}",
            dishes[0], dishes[1]
        );
        Ok(dishes)
    }

    /// Yield each dish as soon as it is ready rather than in submit order.
    pub async fn stream_as_completed(&self) -> Result<Order> {
        let start = Instant::now();
        let mut pending = JoinSet::new();
        let kitchen = *self;
        pending.spawn(async move { kitchen.cook_burger().await });
        pending.spawn(async move { kitchen.toast_bun().await });

        let mut dishes = Vec::with_capacity(2);
        while let Some(joined) = pending.join_next().await {
            let dish = joined?;
            info!("Task completed: {dish}");
            dishes.push(dish);
        }
        let elapsed = start.elapsed();
        info!("Time taken to cook: {:.3} seconds", elapsed.as_secs_f64());
        Ok(Order { dishes, elapsed })
    }

    /// Run a blocking sleep on the blocking pool while an async sleep of
    /// the same length runs on the runtime. Takes one period, not two.
    pub async fn offload_blocking(&self) -> Result<Duration> {
        let start = Instant::now();
        let pause = self.timings.blocking;
        info!("started offload_blocking at {}", clock());

        let (blocking, ()) = tokio::join!(
            tokio::task::spawn_blocking(move || blocking_io(pause)),
            tokio::time::sleep(pause),
        );
        blocking?;

        info!("finished offload_blocking at {}", clock());
        Ok(start.elapsed())
    }

    /// `n` CPU-bound tasks, each on the blocking pool. Returns the task
    /// indices in submit order.
    pub async fn run_in_threads(&self, n: usize) -> Result<Vec<usize>> {
        let start = Instant::now();
        let work = self.timings.cpu_task;
        let handles: Vec<_> = (0..n)
            .map(|i| tokio::task::spawn_blocking(move || cpu_bound_task(i, work)))
            .collect();

        let mut results = Vec::with_capacity(n);
        for handle in handles {
            results.push(handle.await?);
        }
        info!("Results: {results:?}");
        info!(
            "Time taken to run in threads: {:.3} seconds",
            start.elapsed().as_secs_f64()
        );
        Ok(results)
    }

    /// Map `inputs` over a fixed pool of `workers` OS threads. Output order
    /// matches input order.
    pub fn run_in_pool(&self, workers: usize, inputs: &[usize]) -> Result<Vec<usize>> {
        let start = std::time::Instant::now();
        let work = self.timings.cpu_task;
        let results = pool_map(workers, inputs, |input| cpu_bound_task(input, work))?;
        info!("Results: {results:?}");
        info!(
            "Time taken to run in pool: {:.3} seconds",
            start.elapsed().as_secs_f64()
        );
        Ok(results)
    }
}

/// Apply `f` to every input on at most `workers` scoped threads, keeping
/// input order. Every worker is joined before a panic is reported.
fn pool_map<F>(workers: usize, inputs: &[usize], f: F) -> Result<Vec<usize>>
where
    F: Fn(usize) -> usize + Sync,
{
    if workers == 0 {
        return Err(Error::Config("worker pool needs at least one worker".into()));
    }
    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<usize>>> = Mutex::new(vec![None; inputs.len()]);

    let panicked = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers.min(inputs.len().max(1)))
            .map(|_| {
                scope.spawn(|| {
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(&input) = inputs.get(idx) else {
                            break;
                        };
                        let output = f(input);
                        slots.lock().unwrap_or_else(|e| e.into_inner())[idx] = Some(output);
                    }
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(|joined| joined.is_err())
            .count()
    });

    if panicked > 0 {
        warn!(panicked, "pool workers panicked");
        return Err(Error::Other(format!("{panicked} pool worker(s) panicked")));
    }

    Ok(slots
        .into_inner()
        .unwrap_or_else(|e| e.into_inner())
        .into_iter()
        .flatten()
        .collect())
}

fn clock() -> String {
    chrono::Local::now().format("%X").to_string()
}

fn blocking_io(pause: Duration) {
    info!("start blocking_io at {}", clock());
    std::thread::sleep(pause);
    info!("blocking_io complete at {}", clock());
}

fn cpu_bound_task(input: usize, work: Duration) -> usize {
    info!(input, "Doing some CPU-bound task...");
    std::thread::sleep(work);
    info!(input, "Task complete!");
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_reports_every_panicking_worker_as_an_error() {
        let err = pool_map(3, &[1, 2, 3, 4, 5, 6], |input| {
            std::thread::sleep(Duration::from_millis(20));
            panic!("worker failed on {input}");
        })
        .unwrap_err();

        match err {
            Error::Other(msg) => assert_eq!(msg, "3 pool worker(s) panicked"),
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn pool_map_keeps_input_order() {
        let out = pool_map(2, &[3, 1, 2], |input| input * 10).unwrap();
        assert_eq!(out, [30, 10, 20]);
    }
}
