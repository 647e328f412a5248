//! 图像序列读取 - 基础设施层
//!
//! 把一个目录中按数字编号的图像文件读成有序的帧序列。
//! 序列的采样类型由首帧决定，后续帧统一转换为相同类型。

use image::{DynamicImage, GrayImage, ImageBuffer, ImageReader, Luma, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::LoadError;

/// 16 位灰度帧
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;
/// 32 位浮点灰度帧
pub type GrayF32Image = ImageBuffer<Luma<f32>, Vec<f32>>;

/// 有序帧序列
#[derive(Debug, Clone)]
pub enum FrameStack {
    Gray8(Vec<GrayImage>),
    Gray16(Vec<Gray16Image>),
    Float(Vec<GrayF32Image>),
    Rgb(Vec<RgbImage>),
}

impl FrameStack {
    /// 以首帧决定采样类型
    pub fn start_with(first: DynamicImage) -> Self {
        match first {
            DynamicImage::ImageLuma8(img) => FrameStack::Gray8(vec![img]),
            DynamicImage::ImageLuma16(img) => FrameStack::Gray16(vec![img]),
            DynamicImage::ImageRgb8(img) => FrameStack::Rgb(vec![img]),
            other @ DynamicImage::ImageLumaA8(_) => FrameStack::Gray8(vec![other.to_luma8()]),
            other @ DynamicImage::ImageLumaA16(_) => FrameStack::Gray16(vec![other.to_luma16()]),
            other @ DynamicImage::ImageRgba8(_) => FrameStack::Rgb(vec![other.to_rgb8()]),
            other => FrameStack::Float(vec![other.to_luma32f()]),
        }
    }

    fn push(&mut self, frame: DynamicImage) {
        match self {
            FrameStack::Gray8(frames) => frames.push(frame.to_luma8()),
            FrameStack::Gray16(frames) => frames.push(frame.to_luma16()),
            FrameStack::Float(frames) => frames.push(frame.to_luma32f()),
            FrameStack::Rgb(frames) => frames.push(frame.to_rgb8()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FrameStack::Gray8(frames) => frames.len(),
            FrameStack::Gray16(frames) => frames.len(),
            FrameStack::Float(frames) => frames.len(),
            FrameStack::Rgb(frames) => frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 文件名（不含扩展名）是否为纯数字编号
fn frame_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// 列出目录中的帧文件，按编号排序
pub fn list_frame_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut numbered: Vec<(u64, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| frame_number(&path).map(|n| (n, path)))
        .collect();
    numbered.sort();

    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

/// 解码单个图像文件（按内容识别格式，不依赖扩展名大小写）
pub fn decode_image(path: &Path) -> Result<DynamicImage, image::ImageError> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

/// 读取整个序列
///
/// 没有帧或首帧无法解码时返回 `LoadError`；后续无法解码的帧会被跳过并记录警告。
pub fn read_sequence(dir: &Path) -> Result<FrameStack, LoadError> {
    let files = list_frame_files(dir)?;
    let (first_path, rest) = files
        .split_first()
        .ok_or_else(|| LoadError::NoFrames(dir.to_path_buf()))?;

    let first = decode_image(first_path).map_err(|source| LoadError::Decode {
        path: first_path.clone(),
        source,
    })?;
    let mut stack = FrameStack::start_with(first);

    for path in rest {
        match decode_image(path) {
            Ok(frame) => stack.push(frame),
            Err(e) => warn!("⚠️ 跳过无法解码的帧 {}: {}", path.display(), e),
        }
    }

    debug!("读取序列完成: {} ({} 帧)", dir.display(), stack.len());
    Ok(stack)
}
