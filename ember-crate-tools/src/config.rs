use anyhow::Context;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// 从 TOML 文件加载配置
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("读取配置文件失败: {:?}", path))?;
    parse_toml(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path))
}

/// 从 TOML 字符串解析配置
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> anyhow::Result<T> {
    let config = toml::from_str(content)?;
    Ok(config)
}

/// 加载配置，文件不存在时使用默认值
///
/// 文件存在但解析失败时仍然返回错误。
pub fn load_toml_or_default<T: DeserializeOwned + Default>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!("配置文件不存在，使用默认配置: {:?}", path);
        return Ok(T::default());
    }
    load_toml(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        width: u32,
        name: String,
    }

    #[test]
    fn test_parse_partial() {
        let sample: Sample = parse_toml("width = 64").unwrap();
        assert_eq!(sample, Sample { width: 64, name: String::new() });
    }

    #[test]
    fn test_parse_error() {
        assert!(parse_toml::<Sample>("width = \"wide\"").is_err());
    }

    #[test]
    fn test_missing_file_defaults() {
        let sample: Sample = load_toml_or_default("this/file/does/not/exist.toml").unwrap();
        assert_eq!(sample, Sample::default());
    }
}
