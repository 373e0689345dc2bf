//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - Mock 设备 e2e 测试（无需相机）
//! - 配置驱动的全链路测试

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use capture::{CaptureWorker, CaptureWorkerConfig, ImuMonitor, SampleReader};
    use contracts::{CapturedSample, ImuSettings, SamplerConfig, SinkKind, SinkSpec};
    use device_factory::{DeviceFactory, MockDevice, MockDeviceConfig};
    use dispatcher::create_dispatcher;
    use tokio::sync::mpsc;

    fn free_run_worker_config() -> CaptureWorkerConfig {
        CaptureWorkerConfig {
            cadence_hz: 0.0,
            ..Default::default()
        }
    }

    /// End-to-end test: MockDevice -> CaptureWorker -> Dispatcher
    ///
    /// 验证完整的数据流：
    /// 1. MockDevice 按拓扑生成四路合成帧
    /// 2. CaptureWorker 轮询四条队列并组装 CapturedSample
    /// 3. Dispatcher 将样本分发到 sinks
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        // Setup: boot a mock rig with bounded frame production
        let device = MockDevice::with_config(MockDeviceConfig {
            fps: 200.0,
            frame_limit: Some(20),
            ..Default::default()
        });
        let mut sampler = SamplerConfig::with_resolution(32);
        sampler.output_size = 32;
        let mut factory = DeviceFactory::new(device);
        let rig = factory
            .boot_rig(&sampler, &ImuSettings::default())
            .await
            .unwrap();

        // Capture worker over the four output queues
        let reader = SampleReader::new(rig.taps, &sampler).unwrap();
        let mut worker = CaptureWorker::spawn(reader, sampler, free_run_worker_config());
        let capture_rx = worker.take_receiver().unwrap();

        // Create dispatcher with log sink
        let (sample_tx, sample_rx) = mpsc::channel::<CapturedSample>(100);
        let sink_specs = vec![SinkSpec {
            name: "test_log".to_string(),
            kind: SinkKind::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }];

        let dispatcher = create_dispatcher(sink_specs, sample_rx).await.unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let target_samples = 5u64;

        // Bridge capture output into the dispatcher
        let pipeline_handle = tokio::spawn(async move {
            let mut forwarded = 0u64;
            let mut last_cycle = 0u64;

            while let Ok(sample) = capture_rx.recv().await {
                assert_eq!(sample.tensor.size(), 32);
                assert!(sample.cycle > last_cycle, "cycles must be monotonic");
                last_cycle = sample.cycle;

                if sample_tx.send(sample).await.is_err() {
                    break;
                }
                forwarded += 1;
                if forwarded >= target_samples {
                    break;
                }
            }

            (forwarded, last_cycle)
        });

        // Wait for pipeline with timeout
        let result = tokio::time::timeout(Duration::from_secs(5), pipeline_handle).await;

        // Stop the rig
        factory.shutdown().await.unwrap();
        worker.shutdown();

        // Wait for dispatcher (bridge task dropped the sender)
        let _ = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle).await;

        // Verify results
        assert!(result.is_ok(), "Pipeline timed out");
        let (forwarded, last_cycle) = result.unwrap().unwrap();
        assert!(
            forwarded >= target_samples,
            "Should forward at least {} samples, got {}",
            target_samples,
            forwarded
        );
        assert!(last_cycle >= forwarded);
    }

    /// IMU 旁路流与四流采样循环并行工作
    #[tokio::test]
    async fn test_e2e_imu_side_stream() {
        let imu = ImuSettings {
            enabled: true,
            rate_hz: 100,
            ..Default::default()
        };
        let device = MockDevice::with_config(MockDeviceConfig {
            fps: 200.0,
            frame_limit: Some(10),
            ..Default::default()
        });
        let mut sampler = SamplerConfig::with_resolution(16);
        sampler.output_size = 16;
        let mut factory = DeviceFactory::new(device);
        let rig = factory.boot_rig(&sampler, &imu).await.unwrap();

        let mut monitor = ImuMonitor::spawn(rig.imu.expect("imu queue should be open"));

        let reader = SampleReader::new(rig.taps, &sampler).unwrap();
        let mut worker = CaptureWorker::spawn(reader, sampler, free_run_worker_config());
        let capture_rx = worker.take_receiver().unwrap();

        // Drain samples until the rig runs out of frames
        let drained = tokio::time::timeout(Duration::from_secs(5), async move {
            let mut samples = 0u64;
            while capture_rx.recv().await.is_ok() {
                samples += 1;
            }
            samples
        })
        .await;

        factory.shutdown().await.unwrap();
        worker.shutdown();
        monitor.join();

        assert!(drained.is_ok(), "Pipeline timed out");
        assert!(drained.unwrap() > 0, "Should capture at least one sample");
        assert!(monitor.reports_seen() > 0, "IMU reports should be drained");
    }

    /// 配置驱动链路：TOML -> blueprint -> mock rig -> file sink 落盘
    #[tokio::test]
    async fn test_e2e_config_to_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let config = format!(
            r#"
[rig]
name = "e2e_rig"
preview_resolution = 32
output_size = 32

[capture]
cadence_hz = 0.0

[[sinks]]
name = "files"
kind = "file"

[sinks.params]
base_path = "{}"
"#,
            dir.path().display()
        );

        let blueprint =
            config_loader::ConfigLoader::load_from_str(&config, config_loader::ConfigFormat::Toml)
                .unwrap();
        let sampler = blueprint.to_sampler_config();

        let device = MockDevice::with_config(MockDeviceConfig {
            fps: 200.0,
            frame_limit: Some(5),
            ..Default::default()
        });
        let mut factory = DeviceFactory::new(device);
        let rig = factory.boot_rig(&sampler, &blueprint.imu).await.unwrap();

        let reader = SampleReader::new(rig.taps, &sampler).unwrap();
        let mut worker = CaptureWorker::spawn(
            reader,
            sampler,
            CaptureWorkerConfig::from(&blueprint.capture),
        );
        let capture_rx = worker.take_receiver().unwrap();

        let (sample_tx, sample_rx) = mpsc::channel::<CapturedSample>(16);
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), sample_rx)
            .await
            .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let bridge = tokio::spawn(async move {
            let mut forwarded = 0u64;
            while let Ok(sample) = capture_rx.recv().await {
                if sample_tx.send(sample).await.is_err() {
                    break;
                }
                forwarded += 1;
            }
            forwarded
        });

        let forwarded = tokio::time::timeout(Duration::from_secs(5), bridge)
            .await
            .expect("pipeline timed out")
            .unwrap();

        factory.shutdown().await.unwrap();
        worker.shutdown();
        let _ = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle).await;

        assert!(forwarded > 0, "Should forward at least one sample");

        // 会话目录下应当有成套的 PNG 与元数据
        let session = std::fs::read_dir(dir.path())
            .unwrap()
            .next()
            .expect("session dir created")
            .unwrap()
            .path();
        for sub in ["meta", "color", "disparity", "depth", "confidence"] {
            let entries = std::fs::read_dir(session.join(sub)).unwrap().count();
            assert!(entries > 0, "{} should not be empty", sub);
        }
    }

    /// 停机顺序：先关设备再停 worker，阻塞轮询不得挂死
    #[tokio::test]
    async fn test_e2e_shutdown_unblocks_capture() {
        let device = MockDevice::with_config(MockDeviceConfig {
            fps: 30.0,
            ..Default::default()
        });
        let mut sampler = SamplerConfig::with_resolution(16);
        sampler.output_size = 16;
        let mut factory = DeviceFactory::new(device);
        let rig = factory
            .boot_rig(&sampler, &ImuSettings::default())
            .await
            .unwrap();

        let reader = SampleReader::new(rig.taps, &sampler).unwrap();
        let mut worker = CaptureWorker::spawn(reader, sampler, free_run_worker_config());
        let capture_rx = worker.take_receiver().unwrap();

        // One sample proves the loop is alive
        let first = tokio::time::timeout(Duration::from_secs(5), capture_rx.recv())
            .await
            .expect("capture timed out")
            .unwrap();
        assert_eq!(first.tensor.size(), 16);

        // Closing the device closes every queue, so join must return promptly
        factory.shutdown().await.unwrap();
        let joined = tokio::task::spawn_blocking(move || {
            worker.shutdown();
        });
        tokio::time::timeout(Duration::from_secs(5), joined)
            .await
            .expect("worker did not stop after device close")
            .unwrap();
    }
}
