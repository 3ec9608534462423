// tests/tempo/bounded_tests.rs

#[cfg(test)]
mod tests {
    use flux_tempo::{BoundedConfig, BoundedRunner, RunError, TempoError, run_bounded};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::{Instant, sleep};

    // Tracks how many operations are running and the most seen at once
    #[derive(Clone, Default)]
    struct Gauge {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_preserves_input_order() {
        // later items finish first
        let out = run_bounded(
            vec![1u64, 2, 3, 4, 5],
            |x| async move {
                sleep(Duration::from_millis((6 - x) * 10)).await;
                Ok::<_, ()>(x * 2)
            },
            &BoundedConfig::unbounded(),
        )
        .await
        .unwrap();

        assert_eq!(out, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn doubles_with_limit_of_two() {
        let gauge = Gauge::default();

        let out = run_bounded(
            vec![1, 2, 3, 4, 5],
            |x| {
                let gauge = gauge.clone();
                async move {
                    gauge.enter();
                    sleep(Duration::from_millis(10)).await;
                    gauge.exit();
                    Ok::<_, ()>(x * 2)
                }
            },
            &BoundedConfig::new(2),
        )
        .await
        .unwrap();

        assert_eq!(out, vec![2, 4, 6, 8, 10]);
        assert_eq!(gauge.peak(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_never_exceeds_limit() {
        for limit in [1usize, 2, 3, 7] {
            let gauge = Gauge::default();
            let items: Vec<u64> = (0..20).collect();

            let out = run_bounded(
                items.clone(),
                |x| {
                    let gauge = gauge.clone();
                    async move {
                        gauge.enter();
                        // uneven durations so slots free up out of order
                        sleep(Duration::from_millis(5 + (x * 7) % 13)).await;
                        gauge.exit();
                        Ok::<_, ()>(x)
                    }
                },
                &BoundedConfig::new(limit),
            )
            .await
            .unwrap();

            assert_eq!(out, items);
            assert!(gauge.peak() <= limit, "limit {limit} exceeded: {}", gauge.peak());
            assert_eq!(gauge.peak(), limit);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn limit_of_one_runs_sequentially() {
        let events = Arc::new(Mutex::new(Vec::new()));

        run_bounded(
            vec![1, 2, 3],
            |x| {
                let events = events.clone();
                async move {
                    events.lock().push(format!("start {x}"));
                    sleep(Duration::from_millis(10)).await;
                    events.lock().push(format!("end {x}"));
                    Ok::<_, ()>(())
                }
            },
            &BoundedConfig::new(1),
        )
        .await
        .unwrap();

        assert_eq!(
            *events.lock(),
            vec!["start 1", "end 1", "start 2", "end 2", "start 3", "end 3"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn every_item_processed_exactly_once() {
        let counts: Arc<Vec<AtomicUsize>> = Arc::new((0..50).map(|_| AtomicUsize::new(0)).collect());

        let out = run_bounded(
            0..50usize,
            |i| {
                let counts = counts.clone();
                async move {
                    counts[i].fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_millis((i % 4) as u64)).await;
                    Ok::<_, ()>(i)
                }
            },
            &BoundedConfig::new(4),
        )
        .await
        .unwrap();

        assert_eq!(out, (0..50).collect::<Vec<_>>());
        assert!(counts.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_failure_stops_launching_and_drains_in_flight() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let result = run_bounded(
            0..10usize,
            |i| {
                let started = started.clone();
                let finished = finished.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_millis(10 + i as u64)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    if i == 3 { Err(format!("item {i} broke")) } else { Ok(i) }
                }
            },
            &BoundedConfig::new(2),
        )
        .await;

        match result {
            Err(RunError::Task { index, source }) => {
                assert_eq!(index, 3);
                assert_eq!(source, "item 3 broke");
            }
            other => panic!("expected task failure, got {other:?}"),
        }

        let started = started.load(Ordering::SeqCst);
        assert!(started < 10, "items kept launching after failure");
        assert_eq!(finished.load(Ordering::SeqCst), started);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_failure_returns_without_waiting_for_rest() {
        let begun = Instant::now();

        let result = run_bounded(
            vec![0u64, 1, 2],
            |i| async move {
                if i == 0 {
                    sleep(Duration::from_millis(10)).await;
                    Err("first item failed")
                } else {
                    sleep(Duration::from_secs(60)).await;
                    Ok(i)
                }
            },
            &BoundedConfig::unbounded(),
        )
        .await;

        assert!(matches!(result, Err(RunError::Task { index: 0, .. })));
        assert!(begun.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn launch_delay_spaces_starts() {
        let begun = Instant::now();
        let starts = Arc::new(Mutex::new(Vec::new()));

        let runner = BoundedRunner::with_config(
            BoundedConfig::unbounded().launch_delay(Duration::from_millis(50)),
        )
        .unwrap();

        let out = runner
            .run(vec!['a', 'b', 'c'], |c| {
                let starts = starts.clone();
                async move {
                    starts.lock().push(begun.elapsed());
                    Ok::<_, ()>(c.to_ascii_uppercase())
                }
            })
            .await
            .unwrap();

        assert_eq!(out, vec!['A', 'B', 'C']);
        assert_eq!(
            *starts.lock(),
            vec![
                Duration::ZERO,
                Duration::from_millis(50),
                Duration::from_millis(100)
            ]
        );
        // no delay after the last launch
        assert_eq!(begun.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn launch_delay_keeps_in_flight_work_moving() {
        let begun = Instant::now();
        let finishes = Arc::new(Mutex::new(Vec::new()));

        run_bounded(
            vec![0usize, 1],
            |i| {
                let finishes = finishes.clone();
                async move {
                    sleep(Duration::from_millis(10)).await;
                    finishes.lock().push((i, begun.elapsed()));
                    Ok::<_, ()>(())
                }
            },
            &BoundedConfig::new(2).launch_delay(Duration::from_millis(100)),
        )
        .await
        .unwrap();

        // item 0 completes while the runner waits to launch item 1
        assert_eq!(
            *finishes.lock(),
            vec![
                (0, Duration::from_millis(10)),
                (1, Duration::from_millis(110))
            ]
        );
    }

    #[tokio::test]
    async fn zero_concurrency_is_invalid_argument() {
        let result = BoundedRunner::with_config(BoundedConfig::new(0));
        assert!(matches!(result, Err(TempoError::InvalidConcurrency(0))));

        let result = run_bounded(
            vec![1],
            |x: i32| async move { Ok::<_, ()>(x) },
            &BoundedConfig::unbounded().concurrency(0),
        )
        .await;
        assert!(matches!(
            result,
            Err(RunError::Config(TempoError::InvalidConcurrency(0)))
        ));
    }
}
