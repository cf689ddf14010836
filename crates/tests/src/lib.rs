//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 分发器 -> 队列客户端的 e2e 测试
//! - 饱和、拒绝与重试场景

#[cfg(test)]
mod contract_tests {
    use contracts::{CounterName, CounterSnapshot};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_counter_snapshot_wire_format() {
        let snapshot = CounterSnapshot {
            inbound_received: 1,
            attempted: 2,
            succeeded: 3,
            failed: 4,
            aborted: 5,
            retried: 6,
            rejected: 7,
        };
        let json = serde_json::to_value(snapshot).unwrap();
        for name in CounterName::ALL {
            assert_eq!(json[name.as_str()], snapshot.get(name), "{name}");
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        Batch, BridgeConfig, ClientError, ErrorCategory, RetryPolicyKind, ServiceError,
    };
    use dispatcher::{create_dispatcher, DispatcherBuilder, MemoryQueueClient, MemoryReply};
    use observability::{LogConfig, LogFormat};
    use tokio::time::{sleep, timeout};

    /// 收集格式化后的日志输出
    #[derive(Clone, Default)]
    struct LogSink(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogSink {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    const BASE_TOML: &str = r#"
[queue]
queue_url = "https://queue.example/000000000000/e2e.fifo"
message_group_id = "e2e-group"
client = "memory"
send_timeout_ms = 2000

[pool]
workers = 4
backlog_capacity = 32

[telemetry]
rate_interval_ms = 20
pool_interval_ms = 50
"#;

    fn config() -> BridgeConfig {
        ConfigLoader::load_from_str(BASE_TOML, ConfigFormat::Toml).unwrap()
    }

    fn batch(prefix: &str, n: usize) -> Batch {
        (0..n).map(|i| format!("{prefix}-{i}")).collect()
    }

    /// 3 条消息全部接受：succeeded=3, attempted=1, rejected=0
    #[tokio::test]
    async fn test_e2e_three_messages_accepted() {
        let client = MemoryQueueClient::new("mem");
        let dispatcher = DispatcherBuilder::new(config(), client.clone()).build().unwrap();

        dispatcher.record_inbound(3);
        assert!(dispatcher.send(["m1", "m2", "m3"].into_iter().collect()));
        let snapshot = dispatcher.shutdown().await;

        assert_eq!(snapshot.succeeded, 3);
        assert_eq!(snapshot.attempted, 1);
        assert_eq!(snapshot.rejected, 0);
        assert_eq!(snapshot.inbound_received, 3);

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        let entries = &requests[0].entries;
        assert_eq!(
            entries.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["0", "1", "2"]
        );
        assert_eq!(
            entries.iter().map(|e| e.body.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2", "m3"]
        );
        assert!(entries.iter().all(|e| e.group_id == "e2e-group"));
        assert_eq!(requests[0].queue_url, "https://queue.example/000000000000/e2e.fifo");
    }

    /// 积压已满时提交被拒绝，只增加 rejected
    #[tokio::test]
    async fn test_e2e_saturated_pool_rejects() {
        let mut cfg = config();
        cfg.pool.workers = 1;
        cfg.pool.backlog_capacity = 1;

        let client = MemoryQueueClient::new("mem");
        client.hold();
        let dispatcher = DispatcherBuilder::new(cfg, client.clone()).build().unwrap();

        assert!(dispatcher.send(batch("running", 2)));
        timeout(Duration::from_secs(2), async {
            while dispatcher.pool_stats().active != 1 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(dispatcher.send(batch("queued", 2)));
        assert_eq!(dispatcher.pool_stats().queued, 1);

        let before = dispatcher.counters();
        assert!(!dispatcher.send(batch("dropped", 2)));
        let after = dispatcher.counters();

        assert_eq!(after.rejected, before.rejected + 1);
        assert_eq!(after.succeeded, before.succeeded);
        assert_eq!(after.failed, before.failed);
        assert_eq!(after.attempted, before.attempted);

        client.release();
        let snapshot = dispatcher.shutdown().await;
        assert_eq!(snapshot.attempted, 2);
        assert_eq!(snapshot.succeeded, 4);
        assert_eq!(snapshot.rejected, 1);

        // the refused batch never reached the queue
        assert!(client
            .requests()
            .iter()
            .flat_map(|r| r.entries.iter())
            .all(|e| !e.body.starts_with("dropped")));
    }

    /// 服务端拒绝：failed 增加，success 不变，日志带状态码与请求 id
    #[tokio::test]
    async fn test_e2e_service_rejection() {
        let logs = LogSink::default();
        let sink = logs.clone();
        let log_config = LogConfig {
            format: LogFormat::Compact,
            default_level: "info".to_string(),
            ansi: false,
        };
        let _guard = tracing::subscriber::set_default(observability::subscriber(
            &log_config,
            move || sink.clone(),
        ));

        let client = MemoryQueueClient::new("mem");
        client.push_reply(MemoryReply::Reject(ServiceError {
            message: "The specified queue does not exist".into(),
            status_code: 400,
            error_code: "AWS.SimpleQueueService.NonExistentQueue".into(),
            category: ErrorCategory::Client,
            request_id: "5b3c7c2f-0000-0000-0000-000000000000".into(),
        }));
        let dispatcher = DispatcherBuilder::new(config(), client).build().unwrap();

        dispatcher.send(batch("x", 3));
        let snapshot = dispatcher.shutdown().await;

        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.succeeded, 0);
        assert_eq!(snapshot.attempted, 1);

        let output = logs.text();
        assert!(output.contains("status_code=400"), "{output}");
        assert!(
            output.contains("request_id=5b3c7c2f-0000-0000-0000-000000000000"),
            "{output}"
        );
    }

    /// 客户端错误与部分接受
    #[tokio::test]
    async fn test_e2e_mixed_outcomes() {
        let mut cfg = config();
        cfg.pool.workers = 1;

        let client = MemoryQueueClient::new("mem");
        client.push_reply(MemoryReply::Fail(ClientError::Transport("connection reset".into())));
        client.push_reply(MemoryReply::AcceptFirst(1));
        let dispatcher = DispatcherBuilder::new(cfg, client).build().unwrap();

        dispatcher.send(batch("a", 2));
        dispatcher.send(batch("b", 3));
        dispatcher.send(batch("c", 4));
        let snapshot = dispatcher.shutdown().await;

        assert_eq!(snapshot.attempted, 3);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.succeeded, 1 + 4);
        assert_eq!(snapshot.retried, 0);
        assert_eq!(snapshot.aborted, 0);
    }

    /// Backoff 策略：节流后重试，客户端错误耗尽后放弃
    #[tokio::test]
    async fn test_e2e_backoff_retry_and_abort() {
        let mut cfg = config();
        cfg.pool.workers = 1;
        cfg.retry.policy = RetryPolicyKind::Backoff;
        cfg.retry.max_attempts = 2;
        cfg.retry.initial_delay_ms = 1;
        cfg.retry.max_delay_ms = 5;
        ConfigLoader::validate(&cfg).unwrap();

        let client = MemoryQueueClient::new("mem");
        // batch 1: throttled, then accepted
        client.push_reply(MemoryReply::Reject(ServiceError {
            message: "Rate exceeded".into(),
            status_code: 429,
            error_code: "ThrottlingException".into(),
            category: ErrorCategory::Service,
            request_id: "r1".into(),
        }));
        client.push_reply(MemoryReply::AcceptAll);
        // batch 2: fails twice, aborted
        client.push_reply(MemoryReply::Fail(ClientError::Timeout { timeout_ms: 10 }));
        client.push_reply(MemoryReply::Fail(ClientError::Timeout { timeout_ms: 10 }));

        let dispatcher = DispatcherBuilder::new(cfg, client.clone()).build().unwrap();
        dispatcher.send(batch("first", 2));
        dispatcher.send(batch("second", 2));
        let snapshot = dispatcher.shutdown().await;

        assert_eq!(snapshot.attempted, 2);
        assert_eq!(snapshot.succeeded, 2);
        assert_eq!(snapshot.failed, 3);
        assert_eq!(snapshot.retried, 2);
        assert_eq!(snapshot.aborted, 1);
        assert_eq!(client.requests().len(), 4);
    }

    /// 多 worker 高并发：计数器不丢失
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_concurrent_batches() {
        let mut cfg = config();
        cfg.pool.workers = 10;
        cfg.pool.backlog_capacity = 1000;

        let client = MemoryQueueClient::new("mem").with_delay(Duration::from_millis(1));
        let dispatcher = DispatcherBuilder::new(cfg, client.clone()).build().unwrap();

        for i in 0..200 {
            assert!(dispatcher.send(batch(&format!("b{i}"), 10)));
        }
        let snapshot = dispatcher.shutdown().await;

        assert_eq!(snapshot.attempted, 200);
        assert_eq!(snapshot.succeeded, 2000);
        assert_eq!(snapshot.rejected, 0);
        assert_eq!(client.requests().len(), 200);
    }

    /// 遥测 hook 最终看到排空后的计数
    #[tokio::test]
    async fn test_e2e_telemetry_hook() {
        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&samples);

        let dispatcher = DispatcherBuilder::new(config(), MemoryQueueClient::new("mem"))
            .on_sample(move |snapshot, pool| {
                observability::record_counters(snapshot);
                observability::record_pool_stats(pool);
                sink.lock().unwrap().push((snapshot.succeeded, pool.workers));
            })
            .build()
            .unwrap();

        dispatcher.send(batch("t", 5));
        sleep(Duration::from_millis(60)).await;
        dispatcher.shutdown().await;

        let samples = samples.lock().unwrap();
        assert!(samples.len() >= 2);
        assert_eq!(samples.last().map(|s| s.0), Some(5));
        // workers have stopped by the final sample
        assert_eq!(samples.last().map(|s| s.1), Some(0));
    }

    /// 文件客户端：从配置创建并写入 JSON lines
    #[tokio::test]
    async fn test_e2e_file_client_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.jsonl");

        let mut cfg = config();
        cfg.queue.client = contracts::ClientType::File;
        cfg.queue
            .params
            .insert("path".into(), path.display().to_string());
        ConfigLoader::validate(&cfg).unwrap();

        let dispatcher = create_dispatcher(cfg).unwrap();
        dispatcher.send(batch("f", 3));
        let snapshot = dispatcher.shutdown().await;
        assert_eq!(snapshot.succeeded, 3);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2]["body"], "f-2");
        assert_eq!(lines[0]["group_id"], "e2e-group");
        assert_ne!(lines[0]["deduplication_id"], lines[1]["deduplication_id"]);
    }
}
