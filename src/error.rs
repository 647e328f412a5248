use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
///
/// 只有 `Config` / `Layout` / `Bootstrap` 会中止整个批处理，
/// 其余错误都在单元边界被捕获。
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 板布局错误
    #[error("板布局错误: {0}")]
    Layout(#[from] LayoutError),
    /// 单元处理错误
    #[error("单元错误: {0}")]
    Unit(#[from] UnitError),
    /// 输出目录创建失败
    #[error("无法创建目录 {path}: {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误（致命）
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写回配置文件失败
    #[error("无法写入配置文件 {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 必填键缺失或为空
    #[error("以下配置项不存在或为空: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
    /// 值无法解析
    #[error("配置项 {key} 的值 '{value}' 无法转换为 {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// 板布局错误（对应 FormatError）
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// 尺寸文本格式不正确
    #[error("板尺寸格式不正确: '{0}'，示例: '2 x 16'")]
    Format(String),
    /// 列数超出单字母范围
    #[error("列数 {0} 超出范围 [1, 26]")]
    ColumnsOutOfRange(usize),
    /// 行数超出两位编号范围
    #[error("行数 {0} 超出范围 [1, 99]")]
    RowsOutOfRange(usize),
    /// 选择的孔位不在布局内
    #[error("孔位 {0} 不在当前板布局内")]
    UnknownWell(String),
}

/// 方向分类器错误（单元内降级为不翻转）
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// 序列首帧不存在
    #[error("首帧不存在: {0}")]
    FrameMissing(PathBuf),
    /// 导出 JPEG 失败
    #[error("导出 JPEG 失败 ({path}): {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// 读取 JPEG 字节失败
    #[error("读取 JPEG 失败 ({path}): {source}")]
    ReadPreview {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 网络请求失败（含超时）
    #[error("请求分类服务失败 ({endpoint}): {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 非 2xx 响应
    #[error("分类服务返回错误状态 {status}: {body}")]
    Status { status: u16, body: String },
    /// 响应不是合法 JSON
    #[error("无法解析分类服务响应: {source}")]
    Parse {
        body: String,
        #[source]
        source: serde_json::Error,
    },
    /// 后台任务异常退出
    #[error("后台任务失败: {0}")]
    Task(String),
}

/// 图像序列加载错误
#[derive(Debug, Error)]
pub enum LoadError {
    /// 读取目录失败
    #[error("无法读取目录 {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 目录中没有帧
    #[error("目录中没有可用的帧: {0}")]
    NoFrames(PathBuf),
    /// 首帧解码失败
    #[error("无法解码首帧 {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// 视频编码错误
#[derive(Debug, Error)]
pub enum EncodeError {
    /// I/O 失败
    #[error("写入视频失败 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 没有可编码的帧
    #[error("没有可编码的帧")]
    Empty,
    /// 总大小超出 RIFF 1.0 的 4 GB 上限
    #[error("视频总大小 {bytes} 字节超出 AVI 4 GB 上限")]
    TooLarge { bytes: u64 },
    /// 帧宽或帧高超出 AVI 头字段范围
    #[error("帧尺寸 {width}x{height} 超出 AVI 支持范围 (最大 65535)")]
    FrameTooLarge { width: u32, height: u32 },
    /// 帧尺寸不一致
    #[error("第 {index} 帧尺寸 {actual:?} 与首帧 {expected:?} 不一致")]
    DimensionMismatch {
        index: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// 单元级错误，永远不会越过单元边界
#[derive(Debug, Error)]
pub enum UnitError {
    /// 输入目录不存在（记为跳过）
    #[error("输入目录不存在: {0}")]
    DirectoryMissing(PathBuf),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// 后台编码任务异常退出
    #[error("编码任务失败: {0}")]
    Task(String),
}

impl UnitError {
    /// 是否应计为"跳过"而不是"失败"
    pub fn is_skip(&self) -> bool {
        matches!(self, UnitError::DirectoryMissing(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
