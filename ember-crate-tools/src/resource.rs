use std::path::{Path, PathBuf};

/// 统一路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导）。
///
/// # 使用示例
/// ```ignore
/// let config = EmberPath::config_path("ember.toml"); // config/ember.toml
/// ```
pub struct EmberPath {}
// 核心路径
impl EmberPath {
    /// 获取工作区根目录
    pub fn workspace_path() -> PathBuf {
        // 本 crate 位于工作区根目录下一层
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.parent().unwrap_or(manifest_dir).to_path_buf()
    }

    pub fn target_path() -> PathBuf {
        Self::workspace_path().join("target")
    }
}
// 根目录下
impl EmberPath {
    /// 获取 `config/` 目录下的文件路径
    pub fn config_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("config").join(filename)
    }

    /// 默认配置文件 `config/ember.toml`
    pub fn default_config_path() -> PathBuf {
        Self::config_path("ember.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path() {
        let path = EmberPath::default_config_path();
        assert!(path.ends_with("config/ember.toml"));
        assert!(path.starts_with(EmberPath::workspace_path()));
    }
}
