//! 采样指标收集模块
//!
//! 基于 CaptureMeta 收集和统计采样循环的运行指标。

use contracts::CaptureMeta;
use metrics::{counter, gauge, histogram};

/// 从 CaptureMeta 记录指标
///
/// 每次产生 CapturedSample 时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_sample_metrics;
///
/// while let Ok(sample) = rx.recv().await {
///     record_sample_metrics(&sample.meta, sample.cycle, sample.t_capture);
///     // ...
/// }
/// ```
pub fn record_sample_metrics(meta: &CaptureMeta, cycle: u64, t_capture: f64) {
    // 样本计数器
    counter!("stereo_sampler_samples_total").increment(1);

    // 周期号 (用于检测跳拍)
    gauge!("stereo_sampler_last_cycle").set(cycle as f64);

    // 单轮轮询时长 (微秒)
    histogram!("stereo_sampler_poll_micros").record(meta.poll_micros as f64);

    // 陈旧帧复用
    let stale_count = meta.stale_streams.len();
    gauge!("stereo_sampler_streams_stale").set(stale_count as f64);
    if stale_count > 0 {
        counter!("stereo_sampler_samples_with_stale_total").increment(1);
        for stream in &meta.stale_streams {
            counter!("stereo_sampler_stream_stale_total", "stream" => stream.to_string())
                .increment(1);
        }
    }

    // 各流相对主时钟的偏移
    for (stream, timestamp) in &meta.timestamps {
        let skew_ms = (timestamp - t_capture) * 1000.0;

        gauge!(
            "stereo_sampler_stream_skew_ms",
            "stream" => stream.to_string()
        )
        .set(skew_ms);

        histogram!(
            "stereo_sampler_stream_skew_ms_hist",
            "stream" => stream.to_string()
        )
        .record(skew_ms.abs());
    }
}

/// 记录样本分发
pub fn record_sample_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "stereo_sampler_samples_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录采样与分发之间桥接通道的深度
pub fn record_channel_depth(depth: usize) {
    gauge!("stereo_sampler_channel_depth").set(depth as f64);
}

/// 采样指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CaptureMetricsAggregator {
    /// 总样本数
    pub total_samples: u64,

    /// 陈旧帧复用总次数
    pub total_stale_serves: u64,

    /// 含陈旧帧的样本数
    pub samples_with_stale: u64,

    /// 轮询时长统计 (微秒)
    pub poll_stats: RunningStats,

    /// 各流时钟偏移统计 (毫秒, 绝对值)
    pub skew_stats: RunningStats,

    /// 各流陈旧复用次数
    pub stale_counts: std::collections::HashMap<String, u64>,
}

impl CaptureMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, meta: &CaptureMeta, t_capture: f64) {
        self.total_samples += 1;
        self.total_stale_serves += meta.stale_streams.len() as u64;

        if !meta.stale_streams.is_empty() {
            self.samples_with_stale += 1;
            for stream in &meta.stale_streams {
                *self.stale_counts.entry(stream.to_string()).or_insert(0) += 1;
            }
        }

        // 轮询时长 (微秒)
        self.poll_stats.push(meta.poll_micros as f64);

        // 时钟偏移 (毫秒)
        for timestamp in meta.timestamps.values() {
            self.skew_stats.push((timestamp - t_capture).abs() * 1000.0);
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_samples: self.total_samples,
            total_stale_serves: self.total_stale_serves,
            samples_with_stale: self.samples_with_stale,
            stale_rate: if self.total_samples > 0 {
                self.samples_with_stale as f64 / self.total_samples as f64 * 100.0
            } else {
                0.0
            },
            poll_micros: StatsSummary::from(&self.poll_stats),
            skew_ms: StatsSummary::from(&self.skew_stats),
            stream_stale_counts: self.stale_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_samples: u64,
    pub total_stale_serves: u64,
    pub samples_with_stale: u64,
    pub stale_rate: f64,
    pub poll_micros: StatsSummary,
    pub skew_ms: StatsSummary,
    pub stream_stale_counts: std::collections::HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Metrics Summary ===")?;
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(
            f,
            "Samples with stale frames: {} ({:.2}%)",
            self.samples_with_stale, self.stale_rate
        )?;
        writeln!(f, "Stale frame serves: {}", self.total_stale_serves)?;
        writeln!(f, "Poll duration (us): {}", self.poll_micros)?;
        writeln!(f, "Stream skew (ms): {}", self.skew_ms)?;

        if !self.stream_stale_counts.is_empty() {
            writeln!(f, "Stale stream counts:")?;
            for (stream, count) in &self.stream_stale_counts {
                writeln!(f, "  {}: {}", stream, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
