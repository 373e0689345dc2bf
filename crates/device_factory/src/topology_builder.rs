//! Stereo rig topology construction
//!
//! Builds the declarative node graph for one color camera, a left/right mono
//! pair feeding the stereo matcher, and one output tap per sample stream.

use contracts::topology::{
    ports, CameraSocket, ColorCameraNode, ImuNode, MonoCameraNode, NodeKind, PipelineTopology,
    StereoDepthNode,
};
use contracts::{ImuSettings, RigError, SamplerConfig, IMU_STREAM};

/// Build the stereo sampling topology.
///
/// Tap declaration order follows `config.streams`, which is also the fixed
/// poll order downstream. The IMU tap, when enabled, sits outside that cycle.
pub fn build_stereo_topology(
    config: &SamplerConfig,
    imu: &ImuSettings,
) -> Result<PipelineTopology, RigError> {
    let (mono_width, mono_height) = config.mono_resolution.dims();

    let mut topology = PipelineTopology::new();

    let color = topology.add_node(
        "color",
        NodeKind::ColorCamera(ColorCameraNode {
            preview_width: config.preview_resolution,
            preview_height: config.preview_resolution,
            interleaved: false,
        }),
    );
    let left = topology.add_node(
        "mono_left",
        NodeKind::MonoCamera(MonoCameraNode {
            socket: CameraSocket::Left,
            width: mono_width,
            height: mono_height,
        }),
    );
    let right = topology.add_node(
        "mono_right",
        NodeKind::MonoCamera(MonoCameraNode {
            socket: CameraSocket::Right,
            width: mono_width,
            height: mono_height,
        }),
    );
    let stereo = topology.add_node(
        "stereo",
        NodeKind::StereoDepth(StereoDepthNode {
            lr_check: config.stereo.lr_check,
            extended_disparity: config.stereo.extended_disparity,
            subpixel: config.stereo.subpixel,
        }),
    );

    topology.link(left, ports::OUT, stereo, ports::LEFT)?;
    topology.link(right, ports::OUT, stereo, ports::RIGHT)?;

    let [rgb, disparity, depth, confidence] = &config.streams;
    topology.expose(rgb.clone(), color, ports::PREVIEW)?;
    topology.expose(disparity.clone(), stereo, ports::DISPARITY)?;
    topology.expose(depth.clone(), stereo, ports::DEPTH)?;
    topology.expose(confidence.clone(), stereo, ports::CONFIDENCE)?;

    if imu.enabled {
        let imu_node = topology.add_node(
            "imu",
            NodeKind::Imu(ImuNode {
                rate_hz: imu.rate_hz,
                batch_report_threshold: imu.batch_report_threshold,
                max_batch_reports: imu.max_batch_reports,
            }),
        );
        topology.expose(IMU_STREAM.into(), imu_node, ports::OUT)?;
    }

    Ok(topology)
}
