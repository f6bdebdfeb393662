//! 配置校验模块
//!
//! 校验规则：
//! - CCD 尺寸在传感器范围内，分箱值对扫描模式合法
//! - 位深属于允许集合
//! - 合成参数在物理范围内 (曝光、光子通量、读出噪声、转换因子)
//! - 帧源频率 > 0
//! - sink 必填字段齐全

use contracts::{
    CameraBlueprint, CameraError, SinkType, SourceConfig, SynthesisParameters, ALLOWED_BIT_DEPTHS,
};
use pattern_engine::{allowed_binning_for, SensorLimits};

/// 曝光时间上限 (毫秒)
const MAX_EXPOSURE_MS: f64 = 10_000.0;

/// 校验 CameraBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &CameraBlueprint) -> Result<(), CameraError> {
    validate_sensor(blueprint)?;
    validate_pixel_format(blueprint)?;
    validate_exposures(blueprint)?;
    validate_synthesis(&blueprint.synthesis)?;
    validate_source(blueprint)?;
    validate_sink(blueprint)?;
    Ok(())
}

/// 校验 CCD 尺寸、扫描模式与分箱
fn validate_sensor(blueprint: &CameraBlueprint) -> Result<(), CameraError> {
    let camera = &blueprint.camera;
    let limits = SensorLimits::default();

    for (field, value) in [
        ("camera.ccd_width", camera.ccd_width),
        ("camera.ccd_height", camera.ccd_height),
    ] {
        if value < limits.min_ccd || value > limits.max_ccd {
            return Err(CameraError::config_validation(
                field,
                format!(
                    "must be in {}..={}, got {value}",
                    limits.min_ccd, limits.max_ccd
                ),
            ));
        }
    }

    if !(1..=3).contains(&camera.scan_mode) {
        return Err(CameraError::config_validation(
            "camera.scan_mode",
            format!("must be in 1..=3, got {}", camera.scan_mode),
        ));
    }

    if camera.binning == 0 || camera.binning > limits.max_binning {
        return Err(CameraError::config_validation(
            "camera.binning",
            format!(
                "must be in 1..={}, got {}",
                limits.max_binning, camera.binning
            ),
        ));
    }

    let allowed = allowed_binning_for(camera.scan_mode);
    if !allowed.contains(&camera.binning) {
        return Err(CameraError::config_validation(
            "camera.binning",
            format!(
                "binning {} not allowed in scan mode {} (allowed: {allowed:?})",
                camera.binning, camera.scan_mode
            ),
        ));
    }

    // 分箱后至少保留一个像素
    if camera.ccd_width / camera.binning == 0 || camera.ccd_height / camera.binning == 0 {
        return Err(CameraError::config_validation(
            "camera.binning",
            "binned frame would be empty",
        ));
    }

    Ok(())
}

/// 校验位深
fn validate_pixel_format(blueprint: &CameraBlueprint) -> Result<(), CameraError> {
    if let Some(depth) = blueprint.camera.bit_depth {
        if !ALLOWED_BIT_DEPTHS.contains(&depth) {
            return Err(CameraError::config_validation(
                "camera.bit_depth",
                format!("must be one of {ALLOWED_BIT_DEPTHS:?}, got {depth}"),
            ));
        }
    }
    Ok(())
}

/// 校验读出时间与曝光序列
fn validate_exposures(blueprint: &CameraBlueprint) -> Result<(), CameraError> {
    let camera = &blueprint.camera;

    if !(camera.readout_ms >= 0.0) {
        return Err(CameraError::config_validation(
            "camera.readout_ms",
            format!("must be >= 0, got {}", camera.readout_ms),
        ));
    }

    for (i, exposure) in camera.exposure_sequence.iter().enumerate() {
        if !(0.0..=MAX_EXPOSURE_MS).contains(exposure) {
            return Err(CameraError::config_validation(
                format!("camera.exposure_sequence[{i}]"),
                format!("must be in [0, {MAX_EXPOSURE_MS}] ms, got {exposure}"),
            ));
        }
    }

    if !(blueprint.sequence.interval_ms >= 0.0) {
        return Err(CameraError::config_validation(
            "sequence.interval_ms",
            format!("must be >= 0, got {}", blueprint.sequence.interval_ms),
        ));
    }

    Ok(())
}

/// 校验合成参数
fn validate_synthesis(params: &SynthesisParameters) -> Result<(), CameraError> {
    check_range("synthesis.exposure_ms", params.exposure_ms, 0.0, MAX_EXPOSURE_MS)?;
    check_range("synthesis.photon_flux", params.photon_flux, 2.0, 5000.0)?;
    check_range(
        "synthesis.read_noise_electrons",
        params.read_noise_electrons,
        0.25,
        50.0,
    )?;
    check_range(
        "synthesis.photon_conversion_factor",
        params.photon_conversion_factor,
        0.01,
        10.0,
    )?;
    check_range("synthesis.drop_fraction", params.drop_fraction, 0.0, 1.0)?;
    check_range(
        "synthesis.saturate_fraction",
        params.saturate_fraction,
        0.0,
        1.0,
    )?;

    if !(params.stripe_width > 0.0) {
        return Err(CameraError::config_validation(
            "synthesis.stripe_width",
            format!("must be > 0, got {}", params.stripe_width),
        ));
    }

    Ok(())
}

/// 校验帧源
fn validate_source(blueprint: &CameraBlueprint) -> Result<(), CameraError> {
    if let SourceConfig::MockHardware { frequency_hz } = blueprint.source {
        if !(frequency_hz > 0.0) {
            return Err(CameraError::config_validation(
                "source.frequency_hz",
                format!("frequency_hz must be > 0, got {frequency_hz}"),
            ));
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sink(blueprint: &CameraBlueprint) -> Result<(), CameraError> {
    let sink = &blueprint.sink;

    if sink.name.is_empty() {
        return Err(CameraError::config_validation(
            "sink.name",
            "sink name cannot be empty",
        ));
    }

    match sink.sink_type {
        SinkType::CircularBuffer if sink.capacity == 0 => Err(CameraError::config_validation(
            format!("sink[{}].capacity", sink.name),
            "capacity must be > 0",
        )),
        SinkType::File if sink.path.is_none() => Err(CameraError::config_validation(
            format!("sink[{}].path", sink.name),
            "file sink requires a path",
        )),
        _ => Ok(()),
    }
}

/// 闭区间检查，NaN 视为越界
fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), CameraError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CameraError::config_validation(
            field,
            format!("must be in [{min}, {max}], got {value}"),
        ))
    }
}
