use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use client::cache::{CacheManager, QueryClient, QueryKey};
use client::scroll::visible_range;
use client::timing::{debounce, throttle};
use tokio::time::{Instant, sleep, sleep_until};

#[tokio::test(start_paused = true)]
async fn debounced_burst_runs_once_after_quiet_period() {
    let start = Instant::now();
    let fired_at = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&fired_at);
    let save_draft = debounce(Duration::from_millis(100), false, move |_: ()| {
        sink.lock().unwrap().push(start.elapsed());
    });

    for at in [0, 30, 60] {
        sleep_until(start + Duration::from_millis(at)).await;
        save_draft.call(());
    }
    sleep_until(start + Duration::from_millis(500)).await;

    let fired_at = fired_at.lock().unwrap();
    assert_eq!(fired_at.len(), 1);
    assert!(fired_at[0] >= Duration::from_millis(160));
    assert!(fired_at[0] < Duration::from_millis(170));
}

#[tokio::test(start_paused = true)]
async fn cache_entry_expires_between_reads() {
    let mut cache = CacheManager::new();
    cache.set("x".to_string(), 42, Duration::from_millis(50));

    sleep(Duration::from_millis(10)).await;
    assert_eq!(cache.get("x"), Some(42));

    sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.get("x"), None);
    assert!(!cache.contains_key("x"));
}

#[tokio::test(start_paused = true)]
async fn throttled_search_matches_window_count() {
    let count = Arc::new(AtomicUsize::new(0));
    let inner = Arc::clone(&count);
    let on_input = throttle(Duration::from_millis(200), move |_: &str| {
        inner.fetch_add(1, Ordering::SeqCst);
    });

    // 每 100ms 一次输入，覆盖 4 个窗口
    for _ in 0..8 {
        on_input.call("alg");
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(count.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn enrollment_invalidates_course_queries() {
    let queries: QueryClient<Vec<String>> = QueryClient::new(Duration::from_secs(60));
    let loads = Arc::new(AtomicUsize::new(0));
    let key = QueryKey::from("courses").with_filter("student", 12);

    for _ in 0..2 {
        let loads = Arc::clone(&loads);
        let courses: Result<_, ()> = queries
            .fetch(key.clone(), move || async move {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["Chemistry".to_string()])
            })
            .await;
        assert_eq!(courses.unwrap(), vec!["Chemistry".to_string()]);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    queries
        .mutate(async { Ok::<_, ()>(()) }, &[QueryKey::from("courses")])
        .await
        .unwrap();
    assert!(queries.get(&key).is_none());
}

#[test]
fn large_list_renders_bounded_slice() {
    let range = visible_range(0.0, 400.0, 20.0, 10_000);
    assert_eq!(range.start, 0);
    assert!(range.len() <= 30);
}
