//! 渲染器配置，对应 `config/ember.toml`

use std::path::Path;

use anyhow::Context;
use ember_crate_tools::config::load_toml_or_default;
use ember_render_graph::config::RenderGraphConfig;
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `error` / `warn` / `info` / `debug` / `trace`
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// 级联阴影
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    pub cascade_count: u32,
    pub resolution: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            cascade_count: 4,
            resolution: 2048,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// 降采样次数，同时受纹理最大 mip 数限制
    pub downsample_steps: u32,
    pub filter_radius: f32,
    pub strength: f32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            downsample_steps: 7,
            filter_radius: 0.005,
            strength: 0.04,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmberConfig {
    pub frames_in_flight: usize,
    /// 为 true 时最终图像直接写入外部传入的 back buffer
    pub render_to_swapchain: bool,
    /// headless 程序渲染的帧数
    pub frames: u32,
    pub viewport: ViewportConfig,
    pub shadow: ShadowConfig,
    pub bloom: BloomConfig,
    pub log: LogConfig,
    pub render_graph: RenderGraphConfig,
}

impl Default for EmberConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 3,
            render_to_swapchain: true,
            frames: 6,
            viewport: ViewportConfig::default(),
            shadow: ShadowConfig::default(),
            bloom: BloomConfig::default(),
            log: LogConfig::default(),
            render_graph: RenderGraphConfig::default(),
        }
    }
}

impl EmberConfig {
    /// 读取配置文件并校验，文件不存在时使用默认配置
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config: Self = load_toml_or_default(path)?;
        config.validate().with_context(|| format!("配置校验失败: {:?}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.frames_in_flight >= 1, "frames_in_flight 至少为 1");
        anyhow::ensure!(
            self.viewport.width > 0 && self.viewport.height > 0,
            "viewport 尺寸不能为 0: {}x{}",
            self.viewport.width,
            self.viewport.height
        );
        anyhow::ensure!(self.shadow.cascade_count >= 1, "shadow.cascade_count 至少为 1");
        anyhow::ensure!(self.shadow.resolution > 0, "shadow.resolution 不能为 0");
        anyhow::ensure!(self.bloom.downsample_steps >= 1, "bloom.downsample_steps 至少为 1");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ember_crate_tools::config::parse_toml;

    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: EmberConfig = parse_toml("").unwrap();
        assert_eq!(config, EmberConfig::default());
        assert_eq!(config.frames_in_flight, 3);
        assert!(config.render_graph.async_compute);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_tables() {
        let config: EmberConfig = parse_toml(
            r#"
            frames_in_flight = 2
            render_to_swapchain = false

            [viewport]
            width = 640

            [render_graph]
            async_copy = false
            print_execution_plan = true

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.frames_in_flight, 2);
        assert!(!config.render_to_swapchain);
        assert_eq!(config.viewport.width, 640);
        assert_eq!(config.viewport.height, 720);
        assert!(config.render_graph.async_compute);
        assert!(!config.render_graph.async_copy);
        assert!(config.render_graph.print_execution_plan);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.bloom, BloomConfig::default());
    }

    #[test]
    fn test_zero_frames_in_flight_is_rejected() {
        let config: EmberConfig = parse_toml("frames_in_flight = 0").unwrap();
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("frames_in_flight"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = EmberConfig::load("this/file/does/not/exist.toml").unwrap();
        assert_eq!(config, EmberConfig::default());
    }

    #[test]
    fn test_workspace_config_is_valid() {
        let path = ember_crate_tools::resource::EmberPath::default_config_path();
        EmberConfig::load(path).unwrap();
    }
}
