//! 板布局生成 - 业务能力层
//!
//! 把"行 × 列"的板尺寸转换为规范的孔位标识列表（按列优先顺序）

use crate::error::LayoutError;
use crate::models::well::{WellId, MAX_COLUMNS, MAX_ROWS};

/// 预设板尺寸（行 x 列）
pub const PRESET_SIZES: [&str; 6] = ["1 x 1", "2 x 2", "3 x 2", "4 x 3", "8 x 6", "12 x 8"];

/// 板布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateLayout {
    pub rows: usize,
    pub cols: usize,
}

impl PlateLayout {
    pub fn new(rows: usize, cols: usize) -> Result<Self, LayoutError> {
        if cols == 0 || cols > MAX_COLUMNS {
            return Err(LayoutError::ColumnsOutOfRange(cols));
        }
        if rows == 0 || rows > MAX_ROWS {
            return Err(LayoutError::RowsOutOfRange(rows));
        }
        Ok(Self { rows, cols })
    }

    /// 解析 `"2 x 16"` 或 `"2x16"`
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let (rows, cols) = parse(text)?;
        Self::new(rows, cols)
    }

    /// 按列优先顺序生成全部孔位
    pub fn wells(&self) -> Vec<WellId> {
        (0..self.cols)
            .flat_map(|col| (1..=self.rows).map(move |row| (col, row)))
            .filter_map(|(col, row)| WellId::from_grid(col, row).ok())
            .collect()
    }

    /// 从布局中挑选一个子集，结果保持布局顺序
    ///
    /// 任何不在布局内的孔位都会导致 `UnknownWell`
    pub fn select<S: AsRef<str>>(&self, chosen: &[S]) -> Result<Vec<WellId>, LayoutError> {
        let all = self.wells();
        let mut picked = Vec::with_capacity(chosen.len());
        for text in chosen {
            let well = WellId::parse(text.as_ref())?;
            if !all.contains(&well) {
                return Err(LayoutError::UnknownWell(well.to_string()));
            }
            picked.push(well);
        }
        Ok(all.into_iter().filter(|w| picked.contains(w)).collect())
    }
}

/// 解析板尺寸文本，返回 (行, 列)
///
/// 接受 `" x "` 或 `"x"` 分隔，忽略首尾空白
pub fn parse(text: &str) -> Result<(usize, usize), LayoutError> {
    let format_error = || LayoutError::Format(text.to_string());
    let (rows, cols) = text
        .trim()
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(format_error)?;
    let rows = rows.trim().parse().map_err(|_| format_error())?;
    let cols = cols.trim().parse().map_err(|_| format_error())?;
    Ok((rows, cols))
}

/// 生成孔位列表：列索引 `c ∈ [0, cols)`，行号 `r ∈ [1, rows]`，输出 `letter(c) + 两位 r`
pub fn generate(rows: usize, cols: usize) -> Result<Vec<WellId>, LayoutError> {
    Ok(PlateLayout::new(rows, cols)?.wells())
}
