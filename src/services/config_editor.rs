//! 配置文件改写 - 业务能力层
//!
//! 只改写 `ReadFolders=` 和 `CreateFolders=` 两行，其余行原样保留。

use std::path::Path;
use tracing::debug;

use crate::error::ConfigError;
use crate::models::WellId;

const READ_FOLDERS_KEY: &str = "ReadFolders";
const CREATE_FOLDERS_KEY: &str = "CreateFolders";

/// 用选中的孔位改写配置文件
///
/// - 已有的键行被替换（保留原来的位置）
/// - 缺少的键追加到文件末尾
/// - 保留原文件的换行风格
pub fn update_well_selection(config_path: &Path, wells: &[WellId]) -> Result<(), ConfigError> {
    let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;

    let value = wells.iter().map(WellId::as_str).collect::<Vec<_>>().join(",");
    let updated = rewrite_keys(
        &content,
        &[(READ_FOLDERS_KEY, &value), (CREATE_FOLDERS_KEY, &value)],
    );

    std::fs::write(config_path, updated).map_err(|source| ConfigError::Write {
        path: config_path.to_path_buf(),
        source,
    })?;
    debug!("已更新 {}: {}={}", config_path.display(), READ_FOLDERS_KEY, value);
    Ok(())
}

/// 替换 `key=...` 行的值，返回新文本
pub fn rewrite_keys(content: &str, pairs: &[(&str, &str)]) -> String {
    let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let mut seen = vec![false; pairs.len()];

    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            let key = line.split_once('=').map(|(k, _)| k.trim());
            match key.and_then(|k| pairs.iter().position(|(p, _)| *p == k)) {
                Some(i) => {
                    seen[i] = true;
                    format!("{}={}", pairs[i].0, pairs[i].1)
                }
                None => line.to_string(),
            }
        })
        .collect();

    for (i, (key, value)) in pairs.iter().enumerate() {
        if !seen[i] {
            lines.push(format!("{}={}", key, value));
        }
    }

    let mut out = lines.join(newline);
    if content.is_empty() || content.ends_with('\n') {
        out.push_str(newline);
    }
    out
}
