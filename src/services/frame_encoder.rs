//! 帧变换与编码 - 业务能力层
//!
//! 只负责"一个序列 → 一个视频文件"：加载、归一化到 8 位灰度、可选水平翻转、编码。
//! 不关心孔位、分类服务或进度。

use image::imageops;
use image::{GrayImage, Luma};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EncodeError, LoadError, UnitError};
use crate::infrastructure::avi_writer;
use crate::infrastructure::frame_io::{self, FrameStack, Gray16Image, GrayF32Image};

/// 默认帧率
pub const DEFAULT_FRAME_RATE: u32 = 7;
/// 输出文件名取采集点标识的前 N 个字符
pub const OUTPUT_NAME_CHARS: usize = 11;

/// 视频编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// 无压缩 8 位 DIB
    #[default]
    Uncompressed,
}

/// 帧变换编码器
#[derive(Debug, Clone, Copy)]
pub struct FrameTransformEncoder {
    frame_rate: u32,
    codec: Codec,
}

impl Default for FrameTransformEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_RATE)
    }
}

impl FrameTransformEncoder {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate,
            codec: Codec::Uncompressed,
        }
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// 加载序列目录
    pub fn load(&self, sequence_dir: &Path) -> Result<FrameStack, LoadError> {
        frame_io::read_sequence(sequence_dir)
    }

    /// 编码到 `output_path`，父目录不存在时自动创建，已有文件总是被覆盖
    pub fn encode(&self, frames: &[GrayImage], output_path: &Path) -> Result<(), EncodeError> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| EncodeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        match self.codec {
            Codec::Uncompressed => avi_writer::write_gray_avi(frames, output_path, self.frame_rate),
        }
    }

    /// 完整流程：加载 → 归一化 → 可选翻转 → 编码
    ///
    /// # 返回
    /// 返回写入的帧数
    pub fn transcode(
        &self,
        sequence_dir: &Path,
        output_path: &Path,
        flip_frames: bool,
    ) -> Result<usize, UnitError> {
        let stack = self.load(sequence_dir)?;
        let mut frames = normalize(&stack);
        if flip_frames {
            flip(&mut frames);
            debug!("已对 {} 帧应用水平翻转", frames.len());
        }
        self.encode(&frames, output_path)?;
        Ok(frames.len())
    }
}

/// 输出文件名：采集点标识的前 11 个字符 + `.avi`（不足 11 个字符时原样使用）
pub fn output_file_name(point: &str) -> String {
    let prefix: String = point.chars().take(OUTPUT_NAME_CHARS).collect();
    format!("{}.avi", prefix)
}

/// 输出路径：`<output_root>/<well>/<前11字符>.avi`
pub fn output_path(output_root: &Path, well: &str, point: &str) -> PathBuf {
    output_root.join(well).join(output_file_name(point))
}

/// 把任意位深的序列转换为 8 位灰度
///
/// - 8 位灰度：原样保留
/// - RGB：`(r + g + b) / 3`
/// - 16 位：按整个序列的 [min, max] 线性缩放，`scale = 256 / (max - min + 1)`
/// - 浮点：按整个序列的 [min, max] 线性缩放，`scale = 255 / (max - min)`
pub fn normalize(stack: &FrameStack) -> Vec<GrayImage> {
    match stack {
        FrameStack::Gray8(frames) => frames.clone(),
        FrameStack::Rgb(frames) => frames
            .iter()
            .map(|f| {
                GrayImage::from_fn(f.width(), f.height(), |x, y| {
                    let [r, g, b] = f.get_pixel(x, y).0;
                    Luma([((r as u32 + g as u32 + b as u32) / 3) as u8])
                })
            })
            .collect(),
        FrameStack::Gray16(frames) => normalize_u16(frames),
        FrameStack::Float(frames) => normalize_f32(frames),
    }
}

fn normalize_u16(frames: &[Gray16Image]) -> Vec<GrayImage> {
    let (min, max) = frames
        .iter()
        .flat_map(|f| f.as_raw().iter().copied())
        .fold((u16::MAX, u16::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min > max {
        return Vec::new();
    }
    let scale = 256.0 / (f64::from(max) - f64::from(min) + 1.0);
    frames
        .iter()
        .map(|f| {
            GrayImage::from_fn(f.width(), f.height(), |x, y| {
                let v = f.get_pixel(x, y).0[0];
                let scaled = (f64::from(v - min) * scale + 0.5) as u32;
                Luma([scaled.min(255) as u8])
            })
        })
        .collect()
}

fn normalize_f32(frames: &[GrayF32Image]) -> Vec<GrayImage> {
    let (min, max) = frames
        .iter()
        .flat_map(|f| f.as_raw().iter().copied())
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    let scale = if range > 0.0 { 255.0 / range } else { 0.0 };
    frames
        .iter()
        .map(|f| {
            GrayImage::from_fn(f.width(), f.height(), |x, y| {
                let v = f.get_pixel(x, y).0[0];
                if !v.is_finite() {
                    return Luma([0]);
                }
                Luma([(((v - min) * scale) + 0.5).clamp(0.0, 255.0) as u8])
            })
        })
        .collect()
}

/// 水平镜像每一帧，帧数和顺序不变
pub fn flip(frames: &mut [GrayImage]) {
    for frame in frames.iter_mut() {
        imageops::flip_horizontal_in_place(frame);
    }
}
