//! 孔位标识
//!
//! 一个大写字母（列）+ 两位补零的数字（行），例如 `A01`

use crate::error::LayoutError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// 单字母列的上限
pub const MAX_COLUMNS: usize = 26;
/// 两位行号的上限
pub const MAX_ROWS: usize = 99;

fn well_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][0-9]{2}$").expect("static regex"))
}

/// 孔位标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WellId(String);

impl WellId {
    /// 由 0 起始的列索引和 1 起始的行号构造
    pub fn from_grid(col: usize, row: usize) -> Result<Self, LayoutError> {
        if col >= MAX_COLUMNS {
            return Err(LayoutError::ColumnsOutOfRange(col + 1));
        }
        if row == 0 || row > MAX_ROWS {
            return Err(LayoutError::RowsOutOfRange(row));
        }
        let letter = char::from(b'A' + col as u8);
        Ok(Self(format!("{}{:02}", letter, row)))
    }

    /// 解析用户输入的孔位（忽略首尾空白，大小写不敏感）
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let candidate = text.trim().to_ascii_uppercase();
        if well_pattern().is_match(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(LayoutError::UnknownWell(text.trim().to_string()))
        }
    }

    /// 是否符合"字母 + 两位数字"的规范形式
    pub fn is_canonical(text: &str) -> bool {
        well_pattern().is_match(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WellId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_grid() {
        assert_eq!(WellId::from_grid(0, 1).unwrap().as_str(), "A01");
        assert_eq!(WellId::from_grid(2, 12).unwrap().as_str(), "C12");
        assert_eq!(WellId::from_grid(25, 99).unwrap().as_str(), "Z99");
    }

    #[test]
    fn test_from_grid_out_of_range() {
        assert_eq!(
            WellId::from_grid(26, 1),
            Err(LayoutError::ColumnsOutOfRange(27))
        );
        assert_eq!(WellId::from_grid(0, 0), Err(LayoutError::RowsOutOfRange(0)));
        assert_eq!(
            WellId::from_grid(0, 100),
            Err(LayoutError::RowsOutOfRange(100))
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(WellId::parse(" b07 ").unwrap().as_str(), "B07");
        assert!(WellId::parse("B7").is_err());
        assert!(WellId::parse("AA01").is_err());
    }
}
