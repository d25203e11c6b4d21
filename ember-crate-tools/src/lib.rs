//! Ember 工具集
//!
//! 提供日志初始化、TOML 配置加载、工作区路径管理等通用工具。
//!
//! # EmberPath
//! 基于工作区根目录的统一路径管理，避免硬编码相对路径。
//!
//! # 配置
//! 各个 crate 自己定义可反序列化的配置结构，统一通过 [`config::load_toml`] 读取。

pub mod config;
pub mod init_log;
pub mod resource;
