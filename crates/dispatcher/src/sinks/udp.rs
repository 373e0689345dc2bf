//! UdpSink - UDP fire-and-forget streaming

use contracts::{CapturedSample, RigError, SampleSink};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Configuration for UdpSink
#[derive(Debug, Clone)]
pub struct UdpSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: WireFormat,
    /// Max packet size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl UdpSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => WireFormat::Bincode,
            Some("json") | None => WireFormat::Json,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Sink that sends samples over UDP
pub struct UdpSink {
    name: String,
    config: UdpSinkConfig,
    socket: Option<UdpSocket>,
}

impl UdpSink {
    /// Create a new UdpSink
    #[instrument(name = "udp_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: UdpSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        // Bind to any available port
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            "UdpSink connected"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "udp_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, RigError> {
        let name = name.into();
        let config = UdpSinkConfig::from_params(params)
            .map_err(|e| RigError::sink_write(name.as_str(), e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| RigError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    fn serialize_sample(&self, sample: &CapturedSample) -> Result<Vec<u8>, String> {
        // Serialize the full sample
        match self.config.format {
            WireFormat::Json => {
                serde_json::to_vec(sample).map_err(|e| format!("json error: {}", e))
            }
            WireFormat::Bincode => {
                bincode::serialize(sample).map_err(|e| format!("bincode error: {}", e))
            }
        }
    }

    fn socket(&self) -> Result<&UdpSocket, RigError> {
        self.socket
            .as_ref()
            .ok_or_else(|| RigError::sink_write(&self.name, "socket not connected"))
    }

    fn prepare_payload(&self, sample: &CapturedSample) -> Result<Vec<u8>, RigError> {
        let data = self
            .serialize_sample(sample)
            .map_err(|e| RigError::sink_write(&self.name, e))?;

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Payload exceeds max packet size, send may fail"
            );
        }

        Ok(data)
    }

    async fn transmit(&self, socket: &UdpSocket, data: &[u8], cycle: u64) {
        match socket.send(data).await {
            Ok(sent) => {
                debug!(sink = %self.name, cycle, bytes = sent, "Sent");
            }
            Err(e) => {
                // Log but don't fail - UDP is best-effort
                error!(sink = %self.name, error = %e, "UDP send failed");
            }
        }
    }
}

impl SampleSink for UdpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "udp_sink_write",
        skip(self, sample),
        fields(sink = %self.name, cycle = sample.cycle)
    )]
    async fn write(&mut self, sample: &CapturedSample) -> Result<(), RigError> {
        let socket = self.socket()?;
        let data = self.prepare_payload(sample)?;
        self.transmit(socket, &data, sample.cycle).await;
        Ok(())
    }

    #[instrument(name = "udp_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), RigError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "udp_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), RigError> {
        self.socket = None;
        debug!(sink = %self.name, "UdpSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_udp_sink_config_parsing() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("format".to_string(), "json".to_string());

        let config = UdpSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.format, WireFormat::Json);
    }

    #[tokio::test]
    async fn test_udp_sink_rejects_unknown_format() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("format".to_string(), "msgpack".to_string());

        assert!(UdpSinkConfig::from_params(&params).is_err());
    }

    #[tokio::test]
    async fn test_udp_sink_create() {
        let config = UdpSinkConfig {
            addr: "127.0.0.1:19999".parse().unwrap(),
            format: WireFormat::Json,
            max_packet_size: 65000,
        };

        let sink = UdpSink::new("test_udp", config).await;
        // Should succeed even if no receiver (UDP doesn't care)
        assert!(sink.is_ok());
    }

    #[tokio::test]
    async fn test_udp_sink_write() {
        let config = UdpSinkConfig {
            addr: "127.0.0.1:19998".parse().unwrap(),
            format: WireFormat::Bincode,
            max_packet_size: 65000,
        };

        let mut sink = UdpSink::new("test_udp", config).await.unwrap();

        // Should not fail even with no receiver
        let result = sink.write(&testing::sample(1)).await;
        assert!(result.is_ok());
    }
}
