use agent_perf_adapters::{AgentClient, AgentError, AgentReply, SimulatedAgent};
use agent_perf_benchmarks::io::read_report;
use agent_perf_core::{Provider, SessionStatus, TestConfiguration, TestMode};
use agent_perf_runner::{RunnerOptions, SessionManager};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn simulated(iterations: u32, mode: TestMode) -> TestConfiguration {
    TestConfiguration::builder()
        .provider(Provider::Simulated)
        .test_mode(mode)
        .iterations(iterations)
        .batch_size(4)
        .concurrent_requests(3)
        .simulated_latency_ms(10)
        .build()
        .unwrap()
}

/// Fails its first call (the warm-up), then behaves like a simulated agent.
struct FlakyWarmup {
    calls: AtomicU32,
    inner: SimulatedAgent,
}

#[async_trait]
impl AgentClient for FlakyWarmup {
    fn provider(&self) -> Provider {
        Provider::Simulated
    }

    async fn invoke(&self, prompt: &str) -> Result<AgentReply, AgentError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(AgentError::InvalidResponse("cold start".into()));
        }
        self.inner.invoke(prompt).await
    }

    async fn invoke_streaming(&self, prompt: &str) -> Result<AgentReply, AgentError> {
        self.invoke(prompt).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_completed_run_has_expected_stats() {
    let manager = SessionManager::default();
    let id = manager.start(simulated(5, TestMode::Standard)).unwrap();

    let snapshot = manager.wait(&id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert_eq!(snapshot.current_iteration, 5);
    assert_eq!(snapshot.iteration_times_ms.len(), 5);
    assert_eq!(snapshot.success_count, 5);
    assert_eq!(snapshot.failure_count, 0);
    assert!((snapshot.stats.average_ms - 10.0).abs() < 1.0);
    assert_eq!(snapshot.stats.estimated_time_remaining_ms, 0.0);
    assert!(snapshot.warmup_successful);
    assert!(snapshot.end_time.is_some());
    assert!(snapshot.machine_info.is_some());
    assert!(snapshot.report_path.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stop_after_second_iteration() {
    let manager = SessionManager::default();
    let id = manager.start(simulated(10, TestMode::Standard)).unwrap();

    let mut rx = manager.subscribe(&id).unwrap();
    rx.wait_for(|s| s.current_iteration >= 2).await.unwrap();
    assert!(manager.stop());

    let snapshot = manager.wait(&id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Stopped);
    let recorded = snapshot.iteration_times_ms.len();
    assert!((2..=3).contains(&recorded), "recorded {}", recorded);
    assert_eq!(snapshot.current_iteration as usize, recorded);
}

#[tokio::test(start_paused = true)]
async fn test_stop_twice() {
    let manager = SessionManager::default();
    let id = manager.start(simulated(10, TestMode::Standard)).unwrap();

    assert!(manager.stop());
    assert!(!manager.stop());
    manager.wait(&id).await;
    assert!(!manager.stop());
}

#[tokio::test(start_paused = true)]
async fn test_stop_after_completion_returns_false() {
    let manager = SessionManager::default();
    let id = manager.start(simulated(2, TestMode::Standard)).unwrap();
    manager.wait(&id).await;

    assert!(!manager.stop());
    assert_eq!(
        manager.status(Some(&id)).unwrap().status,
        SessionStatus::Completed
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_session_id() {
    let manager = SessionManager::default();
    let id = manager.start(simulated(1, TestMode::Standard)).unwrap();
    assert!(manager.status(Some("no-such-session")).is_none());
    manager.wait(&id).await;
}

#[tokio::test(start_paused = true)]
async fn test_second_start_stops_first() {
    let manager = SessionManager::default();
    let first = manager.start(simulated(10, TestMode::Standard)).unwrap();
    let second = manager.start(simulated(3, TestMode::Standard)).unwrap();
    assert_ne!(first, second);

    assert_eq!(
        manager.status(Some(&first)).unwrap().status,
        SessionStatus::Stopped
    );
    assert_eq!(
        manager.status(Some(&second)).unwrap().status,
        SessionStatus::Running
    );

    let done = manager.wait(&second).await.unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(manager.status(None).unwrap().session_id, second);
}

#[tokio::test(start_paused = true)]
async fn test_every_mode_records_n_latencies() {
    for mode in TestMode::ALL {
        let manager = SessionManager::default();
        let id = manager.start(simulated(7, mode)).unwrap();
        let snapshot = manager.wait(&id).await.unwrap();

        assert_eq!(snapshot.status, SessionStatus::Completed, "{}", mode);
        assert_eq!(snapshot.iteration_times_ms.len(), 7, "{}", mode);
        assert_eq!(
            snapshot.success_count + snapshot.failure_count,
            snapshot.current_iteration,
            "{}",
            mode
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_streaming_and_scenarios_extras() {
    let manager = SessionManager::default();

    let id = manager.start(simulated(4, TestMode::Streaming)).unwrap();
    let streaming = manager.wait(&id).await.unwrap();
    assert_eq!(streaming.time_to_first_token_ms.len(), 4);

    let id = manager.start(simulated(5, TestMode::Scenarios)).unwrap();
    let scenarios = manager.wait(&id).await.unwrap();
    assert_eq!(scenarios.scenario_results.len(), 5);
    assert!(scenarios.scenario_results.values().all(|v| v.len() == 1));
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_monotonic() {
    let manager = SessionManager::default();
    let id = manager.start(simulated(6, TestMode::Standard)).unwrap();
    let mut rx = manager.subscribe(&id).unwrap();

    let mut seen = Vec::new();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(
            snapshot.iteration_times_ms.len(),
            snapshot.current_iteration as usize
        );
        seen.push(snapshot.current_iteration);
        if snapshot.is_terminal() || rx.changed().await.is_err() {
            break;
        }
    }
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&6));
}

#[tokio::test]
async fn test_agent_construction_failure_fails_session() {
    let factory = |_: &TestConfiguration| -> Result<Arc<dyn AgentClient>, AgentError> {
        Err(AgentError::Configuration("no backend".into()))
    };
    let manager = SessionManager::new(Arc::new(factory), RunnerOptions::default());
    let id = manager.start(simulated(3, TestMode::Standard)).unwrap();

    let snapshot = manager.wait(&id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Failed);
    assert!(snapshot.error_message.unwrap().contains("no backend"));
    assert_eq!(snapshot.current_iteration, 0);
}

#[tokio::test(start_paused = true)]
async fn test_warmup_failure_is_not_fatal() {
    let factory = |_: &TestConfiguration| -> Result<Arc<dyn AgentClient>, AgentError> {
        Ok(Arc::new(FlakyWarmup {
            calls: AtomicU32::new(0),
            inner: SimulatedAgent::new(Duration::from_millis(5)),
        }))
    };
    let manager = SessionManager::new(Arc::new(factory), RunnerOptions::default());
    let id = manager.start(simulated(3, TestMode::Standard)).unwrap();

    let snapshot = manager.wait(&id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert!(!snapshot.warmup_successful);
    assert_eq!(snapshot.success_count, 3);
}

#[tokio::test(start_paused = true)]
async fn test_report_written_to_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(
        Arc::new(agent_perf_adapters::DefaultAgentFactory::default()),
        RunnerOptions {
            output_dir: Some(dir.path().to_path_buf()),
            ..RunnerOptions::default()
        },
    );
    let id = manager.start(simulated(3, TestMode::Batch)).unwrap();

    let snapshot = manager.wait(&id).await.unwrap();
    let path = snapshot.report_path.expect("report path");
    let report = read_report(&path).unwrap();
    assert_eq!(report.test_info.session_id, id);
    assert_eq!(report.test_info.status, SessionStatus::Completed);
    assert_eq!(report.metrics.completed_iterations, 3);
    assert!(report.resources.gc_collections.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_starts_leave_one_running() {
    let manager = Arc::new(SessionManager::default());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager
                    .start(simulated(10_000, TestMode::Standard))
                    .unwrap()
            })
        })
        .collect();
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    let sessions = manager.sessions();
    assert_eq!(sessions.len(), ids.len());
    let running: Vec<_> = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Running)
        .collect();
    assert_eq!(running.len(), 1);
    assert!(sessions
        .iter()
        .filter(|s| s.session_id != running[0].session_id)
        .all(|s| s.status == SessionStatus::Stopped));

    let last = running[0].session_id.clone();
    assert!(manager.stop());
    let snapshot = manager.wait(&last).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Stopped);
    for id in &ids {
        let snapshot = manager.wait(id).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Stopped);
    }
}
