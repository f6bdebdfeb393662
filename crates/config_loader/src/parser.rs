//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{CameraBlueprint, CameraError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<CameraBlueprint, CameraError> {
    toml::from_str(content).map_err(|e| CameraError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<CameraBlueprint, CameraError> {
    serde_json::from_str(content).map_err(|e| CameraError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<CameraBlueprint, CameraError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{PixelFormat, SinkType, SourceConfig, SynthesisMode};

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[camera]
label = "Bench"
ccd_width = 1024
ccd_height = 768
binning = 2
pixel_format = "16bit"
bit_depth = 12
readout_ms = 5.0
exposure_sequence = [5.0, 10.0]

[synthesis]
mode = "gaussian_noise"
exposure_ms = 20.0
photon_flux = 100.0
seed = 42

[source]
kind = "mock_hardware"
frequency_hz = 50.0

[sequence]
frame_count = 100
interval_ms = 10.0
stop_on_overflow = true

[sink]
name = "ring"
sink_type = "circular_buffer"
capacity = 8

[trigger]
device = "soft"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.camera.label, "Bench");
        assert_eq!(bp.camera.pixel_format, PixelFormat::Mono16);
        assert_eq!(bp.camera.bit_depth, Some(12));
        assert_eq!(bp.camera.exposure_sequence, vec![5.0, 10.0]);
        assert_eq!(bp.synthesis.mode, SynthesisMode::GaussianNoise);
        assert_eq!(bp.synthesis.seed, Some(42));
        assert_eq!(bp.source, SourceConfig::MockHardware { frequency_hz: 50.0 });
        assert_eq!(bp.sequence.frame_count, Some(100));
        assert_eq!(bp.sink.sink_type, SinkType::CircularBuffer);
        assert_eq!(bp.trigger.unwrap().device, "soft");
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "camera": { "ccd_width": 256, "ccd_height": 256 },
            "sink": { "name": "log", "sink_type": "log" }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.camera.ccd_width, 256);
        assert_eq!(bp.sink.sink_type, SinkType::Log);
        assert_eq!(bp.source, SourceConfig::Synthesized);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, CameraError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_pixel_format_is_parse_error() {
        let content = r#"
[camera]
pixel_format = "12bitYUV"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(CameraError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
