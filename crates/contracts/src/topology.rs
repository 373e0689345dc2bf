//! PipelineTopology - Pipeline Builder output
//!
//! Declarative node graph executed by the device runtime.

use serde::{Deserialize, Serialize};

use crate::{RigError, StreamId};

/// Node handle within a topology
pub type NodeId = u32;

/// Well-known node port names
pub mod ports {
    pub const PREVIEW: &str = "preview";
    pub const OUT: &str = "out";
    pub const LEFT: &str = "left";
    pub const RIGHT: &str = "right";
    pub const DISPARITY: &str = "disparity";
    pub const DEPTH: &str = "depth";
    pub const CONFIDENCE: &str = "confidence_map";
    pub const INPUT: &str = "input";
}

/// Declarative pipeline graph
///
/// Built once by the pipeline builder, then handed to a device runtime.
/// Immutable after construction; the runtime owns it for the session.
#[derive(Debug, Clone, Default)]
pub struct PipelineTopology {
    nodes: Vec<NodeSpec>,
    links: Vec<Link>,
    taps: Vec<TapSpec>,
}

/// A node plus its stable handle
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
}

/// Directed connection between two node ports
#[derive(Debug, Clone)]
pub struct Link {
    pub from: NodeId,
    pub from_port: String,
    pub to: NodeId,
    pub to_port: String,
}

/// Named output tap (stream name -> tap node)
#[derive(Debug, Clone)]
pub struct TapSpec {
    pub stream: StreamId,
    pub node: NodeId,
}

/// Node variants understood by the device runtime
#[derive(Debug, Clone)]
pub enum NodeKind {
    ColorCamera(ColorCameraNode),
    MonoCamera(MonoCameraNode),
    StereoDepth(StereoDepthNode),
    Imu(ImuNode),
    OutputTap(OutputTapNode),
}

impl NodeKind {
    /// Variant name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::ColorCamera(_) => "color_camera",
            NodeKind::MonoCamera(_) => "mono_camera",
            NodeKind::StereoDepth(_) => "stereo_depth",
            NodeKind::Imu(_) => "imu",
            NodeKind::OutputTap(_) => "output_tap",
        }
    }
}

/// Color camera with a square preview output
#[derive(Debug, Clone, Copy)]
pub struct ColorCameraNode {
    pub preview_width: u32,
    pub preview_height: u32,
    /// false = planar channel layout on the preview output
    pub interleaved: bool,
}

/// Monochrome camera bound to one side of the stereo rig
#[derive(Debug, Clone, Copy)]
pub struct MonoCameraNode {
    pub socket: CameraSocket,
    pub width: u32,
    pub height: u32,
}

/// Physical camera socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSocket {
    Left,
    Right,
}

/// Stereo matcher configuration flags
#[derive(Debug, Clone, Copy)]
pub struct StereoDepthNode {
    pub lr_check: bool,
    pub extended_disparity: bool,
    pub subpixel: bool,
}

/// IMU rotation-vector reports
#[derive(Debug, Clone, Copy)]
pub struct ImuNode {
    pub rate_hz: u32,
    pub batch_report_threshold: u32,
    pub max_batch_reports: u32,
}

/// Named link out of the pipeline
#[derive(Debug, Clone)]
pub struct OutputTapNode {
    pub stream: StreamId,
}

impl PipelineTopology {
    /// Create empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its handle
    pub fn add_node(&mut self, label: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(NodeSpec {
            id,
            label: label.into(),
            kind,
        });
        id
    }

    /// Connect `from:from_port` to `to:to_port`
    pub fn link(
        &mut self,
        from: NodeId,
        from_port: &str,
        to: NodeId,
        to_port: &str,
    ) -> Result<(), RigError> {
        for (end, id) in [("from", from), ("to", to)] {
            if self.node(id).is_none() {
                return Err(RigError::topology(
                    format!("#{id}"),
                    format!("link {end} endpoint does not exist"),
                ));
            }
        }
        self.links.push(Link {
            from,
            from_port: from_port.to_string(),
            to,
            to_port: to_port.to_string(),
        });
        Ok(())
    }

    /// Expose `from:from_port` as a named output stream.
    ///
    /// Creates the tap node and its input link. Stream names must be unique
    /// within a topology.
    pub fn expose(
        &mut self,
        stream: StreamId,
        from: NodeId,
        from_port: &str,
    ) -> Result<NodeId, RigError> {
        if self.taps.iter().any(|tap| tap.stream == stream) {
            return Err(RigError::topology(
                stream.as_str(),
                "duplicate output stream name",
            ));
        }
        let tap = self.add_node(
            format!("xout_{stream}"),
            NodeKind::OutputTap(OutputTapNode {
                stream: stream.clone(),
            }),
        );
        self.link(from, from_port, tap, ports::INPUT)?;
        self.taps.push(TapSpec { stream, node: tap });
        Ok(tap)
    }

    /// Look up a node by handle
    pub fn node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.get(id as usize)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    /// All links in insertion order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Output taps in declaration order (the fixed poll order)
    pub fn taps(&self) -> &[TapSpec] {
        &self.taps
    }

    /// The node feeding a named tap, if any
    pub fn tap_source(&self, stream: &str) -> Option<&NodeSpec> {
        let tap = self.taps.iter().find(|tap| tap.stream == stream)?;
        let link = self.links.iter().find(|link| link.to == tap.node)?;
        self.node(link.from)
    }
}
