//! # Deferrable Coalescing Properties
//!
//! For any burst of schedule requests issued before the next wakeup, the
//! executor fires exactly once, at the earliest requested time.

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tile_arbiter::infrastructure::runtime::deferrable::{Deferrable, DeferredTask};

fn counted_task(counter: Arc<AtomicUsize>) -> DeferredTask {
    Arc::new(move || {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_burst_coalesces_to_single_firing(delays in prop::collection::vec(10u64..500, 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let (fired_early, fired_at_earliest, fired_finally) = runtime.block_on(async {
            let counter = Arc::new(AtomicUsize::new(0));
            let deferrable = Deferrable::new("prop", counted_task(counter.clone()), None);
            deferrable.start();
            tokio::task::yield_now().await;

            for delay in &delays {
                deferrable.schedule(Duration::from_millis(*delay));
            }
            let earliest = *delays.iter().min().unwrap();

            // Nothing may fire before the earliest request
            tokio::time::sleep(Duration::from_millis(earliest.saturating_sub(5))).await;
            tokio::task::yield_now().await;
            let fired_early = counter.load(Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
            let fired_at_earliest = counter.load(Ordering::SeqCst);

            // And never again, no matter how long the later requests were
            tokio::time::sleep(Duration::from_millis(1000)).await;
            tokio::task::yield_now().await;
            let fired_finally = counter.load(Ordering::SeqCst);

            deferrable.stop().await;
            (fired_early, fired_at_earliest, fired_finally)
        });

        prop_assert_eq!(fired_early, 0);
        prop_assert_eq!(fired_at_earliest, 1);
        prop_assert_eq!(fired_finally, 1);
    }
}
