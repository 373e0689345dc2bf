//! FileSink - writes samples to disk with folder structure

use chrono::Local;
use contracts::{CaptureMeta, CapturedSample, RawFrame, RigError, SampleSink};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// Per-sample metadata record written next to the image files
#[derive(Serialize)]
struct MetaRecord<'a> {
    t_capture: f64,
    cycle: u64,
    meta: &'a CaptureMeta,
}

/// Sink that writes samples to disk files
///
/// Each run gets its own timestamped session directory under the base path.
pub struct FileSink {
    name: String,
    session_dir: PathBuf,
    created_dirs: HashSet<PathBuf>,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        let session = format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"));
        let session_dir = config.base_path.join(session);
        fs::create_dir_all(&session_dir)?;

        Ok(Self {
            name: name.into(),
            session_dir,
            created_dirs: HashSet::new(),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    /// Session directory this sink writes into
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    fn subdir(&mut self, name: &str) -> std::io::Result<PathBuf> {
        let dir = self.session_dir.join(name);
        if !self.created_dirs.contains(&dir) {
            fs::create_dir_all(&dir)?;
            self.created_dirs.insert(dir.clone());
        }
        Ok(dir)
    }

    fn write_sample_to_disk(&mut self, sample: &CapturedSample) -> std::io::Result<()> {
        let cycle = sample.cycle;

        // 1. Metadata
        let meta_dir = self.subdir("meta")?;
        let meta_path = meta_dir.join(format!("{}.json", cycle));
        let meta_file = File::create(meta_path)?;
        let record = MetaRecord {
            t_capture: sample.t_capture,
            cycle,
            meta: &sample.meta,
        };
        serde_json::to_writer(meta_file, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        // 2. Tensor channels
        self.save_color(cycle, sample)?;
        self.save_disparity(cycle, sample)?;

        // 3. Depth-family side frames
        self.save_gray16(cycle, "depth", &sample.depth)?;
        self.save_gray8(cycle, "confidence", &sample.confidence)?;

        Ok(())
    }

    /// Color channels 0-2 of the tensor, re-interleaved for PNG encoding
    fn save_color(&mut self, cycle: u64, sample: &CapturedSample) -> std::io::Result<()> {
        let side = sample.tensor.size();
        let plane = side as usize * side as usize;
        let bytes = sample.tensor.as_bytes();

        let mut rgb = vec![0u8; plane * 3];
        for i in 0..plane {
            rgb[i * 3] = bytes[i];
            rgb[i * 3 + 1] = bytes[plane + i];
            rgb[i * 3 + 2] = bytes[2 * plane + i];
        }

        let path = self.subdir("color")?.join(format!("{}.png", cycle));
        image::save_buffer(path, &rgb, side, side, image::ColorType::Rgb8)
            .map_err(std::io::Error::other)
    }

    /// Disparity plane (tensor channel 3) as an 8-bit grayscale PNG
    fn save_disparity(&mut self, cycle: u64, sample: &CapturedSample) -> std::io::Result<()> {
        let side = sample.tensor.size();
        let plane = side as usize * side as usize;
        let bytes = sample.tensor.as_bytes();

        let path = self.subdir("disparity")?.join(format!("{}.png", cycle));
        image::save_buffer(
            path,
            &bytes[3 * plane..4 * plane],
            side,
            side,
            image::ColorType::L8,
        )
        .map_err(std::io::Error::other)
    }

    fn save_gray8(&mut self, cycle: u64, kind: &str, frame: &RawFrame) -> std::io::Result<()> {
        let path = self.subdir(kind)?.join(format!("{}.png", cycle));
        image::save_buffer(
            path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::L8,
        )
        .map_err(std::io::Error::other)
    }

    fn save_gray16(&mut self, cycle: u64, kind: &str, frame: &RawFrame) -> std::io::Result<()> {
        let path = self.subdir(kind)?.join(format!("{}.png", cycle));
        // save_buffer expects native-endian u16 samples for L16
        image::save_buffer(
            path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::L16,
        )
        .map_err(std::io::Error::other)
    }

    fn persist_sample(&mut self, sample: &CapturedSample) -> Result<(), RigError> {
        self.write_sample_to_disk(sample).map_err(|e| {
            error!(sink = %self.name, cycle = sample.cycle, error = %e, "Write failed");
            RigError::sink_write(&self.name, e.to_string())
        })
    }
}

impl SampleSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, sample),
        fields(sink = %self.name, cycle = sample.cycle)
    )]
    async fn write(&mut self, sample: &CapturedSample) -> Result<(), RigError> {
        self.persist_sample(sample)?;
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), RigError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), RigError> {
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}
