//! 配置校验模块
//!
//! 校验规则：
//! - preview_resolution / output_size > 0
//! - fps > 0, cadence_hz >= 0
//! - 立体匹配: extended_disparity 与 subpixel 互斥 (设备约束)
//! - IMU 启用时 rate_hz / batch 字段 >= 1
//! - sink 名称非空且唯一
//! - udp sink 必须带 addr 参数

use std::collections::HashSet;

use contracts::{RigBlueprint, RigError, SinkKind};

/// 校验 RigBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RigBlueprint) -> Result<(), RigError> {
    validate_rig(blueprint)?;
    validate_stereo(blueprint)?;
    validate_capture(blueprint)?;
    validate_imu(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 校验相机几何参数
fn validate_rig(blueprint: &RigBlueprint) -> Result<(), RigError> {
    let rig = &blueprint.rig;
    if rig.preview_resolution == 0 {
        return Err(RigError::config_validation(
            "rig.preview_resolution",
            "preview_resolution must be > 0",
        ));
    }
    if rig.output_size == 0 {
        return Err(RigError::config_validation(
            "rig.output_size",
            "output_size must be > 0",
        ));
    }
    if rig.fps <= 0.0 {
        return Err(RigError::config_validation(
            "rig.fps",
            format!("fps must be > 0, got {}", rig.fps),
        ));
    }
    Ok(())
}

/// 校验立体匹配开关
fn validate_stereo(blueprint: &RigBlueprint) -> Result<(), RigError> {
    let stereo = &blueprint.stereo;
    // 设备端不支持同时开启扩展视差与亚像素
    if stereo.extended_disparity && stereo.subpixel {
        return Err(RigError::config_validation(
            "stereo.extended_disparity / stereo.subpixel",
            "extended_disparity and subpixel cannot both be enabled",
        ));
    }
    Ok(())
}

/// 校验采样设置
fn validate_capture(blueprint: &RigBlueprint) -> Result<(), RigError> {
    let capture = &blueprint.capture;
    if capture.cadence_hz < 0.0 {
        return Err(RigError::config_validation(
            "capture.cadence_hz",
            format!("cadence_hz must be >= 0, got {}", capture.cadence_hz),
        ));
    }
    if capture.channel_capacity == 0 {
        return Err(RigError::config_validation(
            "capture.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }
    Ok(())
}

/// 校验 IMU 设置 (仅启用时)
fn validate_imu(blueprint: &RigBlueprint) -> Result<(), RigError> {
    let imu = &blueprint.imu;
    if !imu.enabled {
        return Ok(());
    }
    if imu.rate_hz == 0 {
        return Err(RigError::config_validation(
            "imu.rate_hz",
            "rate_hz must be > 0 when imu is enabled",
        ));
    }
    if imu.batch_report_threshold == 0 || imu.max_batch_reports == 0 {
        return Err(RigError::config_validation(
            "imu.batch_report_threshold / imu.max_batch_reports",
            "batch settings must be >= 1 when imu is enabled",
        ));
    }
    if imu.batch_report_threshold > imu.max_batch_reports {
        return Err(RigError::config_validation(
            "imu.batch_report_threshold",
            format!(
                "batch_report_threshold ({}) must be <= max_batch_reports ({})",
                imu.batch_report_threshold, imu.max_batch_reports
            ),
        ));
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &RigBlueprint) -> Result<(), RigError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(RigError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(RigError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.kind == SinkKind::Udp && !sink.params.contains_key("addr") {
            return Err(RigError::config_validation(
                format!("sinks[name={}].params", sink.name),
                "udp sink requires an 'addr' parameter",
            ));
        }
    }
    Ok(())
}
