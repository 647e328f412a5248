//! 程序配置
//!
//! `Config.txt` 是逐行的 `key=value` 文本。加载后得到只读的 [`BatchConfig`]，
//! 整个批处理期间不会被修改。

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "Config.txt";

/// 必填配置项
pub const REQUIRED_KEYS: [&str; 11] = [
    "InputFolder",
    "OutputFolder",
    "ReadFolders",
    "CreateFolders",
    "BrightFoldersPoint",
    "Debug",
    "Avance",
    "Visor",
    "Dev",
    "ENDPOINT",
    "PREDICTION_KEY",
];

/// Dev 模式下固定使用的孔位
const DEV_READ_FOLDERS: &str = "A01";
/// Dev 模式下固定使用的采集点
const DEV_BRIGHT_POINTS: &str = "POINT 00001\\BRIGHT,POINT 00002\\BRIGHT";

/// 批处理配置
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// 输入根目录（`<InputFolder>/<well>/<point>`）
    pub input_folder: PathBuf,
    /// 输出根目录（`<OutputFolder>/<well>/<point前11字符>.avi`）
    pub output_folder: PathBuf,
    /// 日志目录
    pub log_folder: PathBuf,
    /// 需要读取的孔位（按配置顺序）
    pub read_folders: Vec<String>,
    /// 需要预先创建输出目录的孔位
    pub create_folders: Vec<String>,
    /// 每个孔位下的采集点
    pub bright_points: Vec<String>,
    /// 同时把日志输出到控制台
    pub debug: bool,
    /// 输出进度百分比
    pub progress: bool,
    /// 交互式查看器（批处理模式下不支持）
    pub viewer: bool,
    /// 开发模式
    pub dev: bool,
    /// 分类服务地址
    pub endpoint: String,
    /// 分类服务密钥
    pub prediction_key: String,
    // --- 可选项 ---
    /// 分类请求超时（秒）
    pub request_timeout_secs: u64,
    /// 同时处理的单元数量（1 = 顺序执行）
    pub max_concurrent_units: usize,
    /// 输出视频帧率
    pub frame_rate: u32,
}

impl BatchConfig {
    /// 从配置文件加载并校验
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let map = parse_key_values(&content);
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_map(&map, base_dir)
    }

    /// 从键值映射构造
    ///
    /// 一次性报告所有缺失或为空的必填项。
    /// `base_dir` 用于确定未配置 `LogFolder` 时的默认日志目录。
    pub fn from_map(map: &HashMap<String, String>, base_dir: &Path) -> Result<Self, ConfigError> {
        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| map.get(**key).map_or(true, |v| v.trim().is_empty()))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }

        let get = |key: &str| map.get(key).map(|v| v.trim()).unwrap_or_default();
        let dev = parse_flag(get("Dev"));

        let (read_folders, bright_points) = if dev {
            (split_list(DEV_READ_FOLDERS), split_list(DEV_BRIGHT_POINTS))
        } else {
            (split_list(get("ReadFolders")), split_list(get("BrightFoldersPoint")))
        };

        let log_folder = match map.get("LogFolder").map(|v| v.trim()) {
            Some(v) if !v.is_empty() => PathBuf::from(v),
            _ => base_dir.join("LogFolder"),
        };

        Ok(Self {
            input_folder: PathBuf::from(get("InputFolder")),
            output_folder: PathBuf::from(get("OutputFolder")),
            log_folder,
            read_folders,
            create_folders: split_list(get("CreateFolders")),
            bright_points,
            debug: parse_flag(get("Debug")),
            progress: parse_flag(get("Avance")),
            viewer: parse_flag(get("Visor")),
            dev,
            endpoint: get("ENDPOINT").to_string(),
            prediction_key: get("PREDICTION_KEY").to_string(),
            request_timeout_secs: parse_optional(map, "RequestTimeoutSecs", 30)?,
            max_concurrent_units: parse_optional(map, "MaxConcurrentUnits", 1)?.max(1),
            frame_rate: parse_optional(map, "FrameRate", 7)?,
        })
    }

    /// 计划处理的单元总数
    pub fn total_units(&self) -> usize {
        self.read_folders.len() * self.bright_points.len()
    }

    /// 用于调试输出的配置清单（密钥已遮蔽）
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("InputFolder", self.input_folder.display().to_string()),
            ("OutputFolder", self.output_folder.display().to_string()),
            ("LogFolder", self.log_folder.display().to_string()),
            ("ReadFolders", self.read_folders.join(",")),
            ("CreateFolders", self.create_folders.join(",")),
            ("BrightFoldersPoint", self.bright_points.join(",")),
            ("Debug", self.debug.to_string()),
            ("Avance", self.progress.to_string()),
            ("Visor", self.viewer.to_string()),
            ("Dev", self.dev.to_string()),
            ("ENDPOINT", self.endpoint.clone()),
            ("PREDICTION_KEY", mask_secret(&self.prediction_key)),
            ("RequestTimeoutSecs", self.request_timeout_secs.to_string()),
            ("MaxConcurrentUnits", self.max_concurrent_units.to_string()),
            ("FrameRate", self.frame_rate.to_string()),
        ]
    }
}

/// 解析 `key=value` 文本
///
/// 只处理包含 `=` 的行，按第一个 `=` 切分，键和值都去掉首尾空白。
pub fn parse_key_values(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// 逗号分隔列表，保留顺序并丢弃空项
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn parse_optional<T: std::str::FromStr>(
    map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match map.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            expected: std::any::type_name::<T>(),
        }),
    }
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}
