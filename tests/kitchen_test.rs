//! Integration tests for the kitchen concurrency demos.

use std::time::Duration;

use asyncq::error::Error;
use asyncq::kitchen::{BUN, BURGER, CancelOutcome, Kitchen, KitchenTimings};

fn quick_kitchen() -> Kitchen {
    Kitchen::new(KitchenTimings {
        burger: Duration::from_secs(2),
        bun: Duration::from_secs(1),
        blocking: Duration::from_millis(500),
        cpu_task: Duration::from_millis(20),
    })
}

// ---------------------------------------------------------------------------
// Sequential vs concurrent
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn sequential_order_costs_the_sum_of_both_dishes() {
    let order = quick_kitchen().prepare_sequential().await;
    assert_eq!(order.dishes, [BURGER, BUN]);
    assert!(order.elapsed >= Duration::from_secs(3), "{:?}", order.elapsed);
}

#[tokio::test(start_paused = true)]
async fn concurrent_order_costs_the_longest_dish() {
    let order = quick_kitchen().prepare_concurrent().await;
    assert_eq!(order.dishes, [BURGER, BUN]);
    assert!(order.elapsed >= Duration::from_secs(2));
    assert!(order.elapsed < Duration::from_secs(3), "{:?}", order.elapsed);
}

// ---------------------------------------------------------------------------
// Timeouts and cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn burger_slower_than_the_limit_times_out() {
    let limit = Duration::from_secs(1);
    match quick_kitchen().cook_with_timeout(limit).await {
        Err(Error::Timeout(d)) => assert_eq!(d, limit),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn burger_within_the_limit_is_served() {
    let dish = quick_kitchen()
        .cook_with_timeout(Duration::from_secs(3))
        .await
        .unwrap();
    assert_eq!(dish, BURGER);
}

#[tokio::test(start_paused = true)]
async fn aborting_a_running_task_reports_cancellation() {
    let outcome = quick_kitchen()
        .cancel_after(Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(outcome, CancelOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn aborting_a_finished_task_keeps_its_result() {
    let outcome = quick_kitchen()
        .cancel_after(Duration::from_secs(3))
        .await
        .unwrap();
    assert_eq!(outcome, CancelOutcome::Finished(BURGER.to_string()));
}

// ---------------------------------------------------------------------------
// Groups and streaming
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn task_group_returns_results_in_submit_order() {
    let dishes = quick_kitchen().task_group().await.unwrap();
    assert_eq!(dishes, [BURGER, BUN]);
}

#[tokio::test(start_paused = true)]
async fn as_completed_yields_the_faster_dish_first() {
    let order = quick_kitchen().stream_as_completed().await.unwrap();
    assert_eq!(order.dishes, [BUN, BURGER]);
    assert!(order.elapsed < Duration::from_secs(3));
}

// ---------------------------------------------------------------------------
// Offloading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blocking_work_overlaps_with_async_sleep() {
    let elapsed = quick_kitchen().offload_blocking().await.unwrap();
    let period = Duration::from_millis(500);
    assert!(elapsed >= period);
    // Serial execution would take two full periods.
    assert!(elapsed < 2 * period - Duration::from_millis(100), "{elapsed:?}");
}

#[tokio::test]
async fn threads_return_results_in_submit_order() {
    let results = quick_kitchen().run_in_threads(4).await.unwrap();
    assert_eq!(results, [0, 1, 2, 3]);
}

#[test]
fn pool_map_preserves_input_order() {
    let results = quick_kitchen().run_in_pool(2, &[5, 6, 7, 8, 9]).unwrap();
    assert_eq!(results, [5, 6, 7, 8, 9]);
}

#[test]
fn pool_with_no_inputs_returns_nothing() {
    let results = quick_kitchen().run_in_pool(3, &[]).unwrap();
    assert!(results.is_empty());
}

#[test]
fn pool_without_workers_is_rejected() {
    let err = quick_kitchen().run_in_pool(0, &[1]).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
