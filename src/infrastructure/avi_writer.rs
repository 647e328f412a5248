//! 无压缩 AVI 写入器 - 基础设施层
//!
//! 只支持单一视频流、8 位灰度调色板 DIB。所有块大小都可以预先算出，
//! 因此按顺序一次写完，不需要回写文件头。

use image::GrayImage;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::EncodeError;

const AVIF_HASINDEX: u32 = 0x10;
const AVIIF_KEYFRAME: u32 = 0x10;
const AVIH_SIZE: u32 = 56;
const STRH_SIZE: u32 = 56;
const BITMAPINFOHEADER_SIZE: u32 = 40;
const PALETTE_SIZE: u32 = 256 * 4;
const FRAME_CHUNK_ID: &[u8; 4] = b"00db";

/// RIFF 1.0 块大小字段上限
const RIFF_MAX_BYTES: u64 = u32::MAX as u64;
/// `rcFrame` 只能表示 16 位的宽高
const MAX_FRAME_SIDE: u32 = u16::MAX as u32;

/// 写入一个 8 位灰度 AVI 文件（总是覆盖已有文件）
///
/// # 参数
/// - `frames`: 尺寸一致的灰度帧
/// - `path`: 输出路径（父目录需已存在）
/// - `frame_rate`: 帧率
///
/// 尺寸或总大小超出 RIFF 1.0 的范围时，在创建文件之前返回错误
pub fn write_gray_avi(
    frames: &[GrayImage],
    path: &Path,
    frame_rate: u32,
) -> Result<(), EncodeError> {
    let sizes = Layout::for_frames(frames)?.chunk_sizes()?;
    let io_err = |source: io::Error| EncodeError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    sizes
        .write(&mut out, frames, frame_rate.max(1))
        .and_then(|_| out.flush())
        .map_err(io_err)
}

/// 帧尺寸信息，大小按 u64 计算
#[derive(Debug, Clone, Copy)]
struct Layout {
    width: u32,
    height: u32,
    stride: u32,
    frame_bytes: u64,
    frame_count: u64,
}

impl Layout {
    fn for_frames(frames: &[GrayImage]) -> Result<Self, EncodeError> {
        let first = frames.first().ok_or(EncodeError::Empty)?;
        let expected = first.dimensions();
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.dimensions() != expected)
        {
            return Err(EncodeError::DimensionMismatch {
                index,
                expected,
                actual: frame.dimensions(),
            });
        }

        let (width, height) = expected;
        if width > MAX_FRAME_SIDE || height > MAX_FRAME_SIDE {
            return Err(EncodeError::FrameTooLarge { width, height });
        }
        // 宽度不超过 u16::MAX，补齐后不会溢出
        let stride = (width + 3) & !3;
        Ok(Self {
            width,
            height,
            stride,
            frame_bytes: u64::from(stride) * u64::from(height),
            frame_count: frames.len() as u64,
        })
    }

    fn strf_size(&self) -> u64 {
        u64::from(BITMAPINFOHEADER_SIZE + PALETTE_SIZE)
    }

    fn strl_size(&self) -> u64 {
        4 + (8 + u64::from(STRH_SIZE)) + (8 + self.strf_size())
    }

    fn hdrl_size(&self) -> u64 {
        4 + (8 + u64::from(AVIH_SIZE)) + (8 + self.strl_size())
    }

    fn movi_size(&self) -> Option<u64> {
        self.frame_count
            .checked_mul(self.frame_bytes.checked_add(8)?)?
            .checked_add(4)
    }

    fn idx1_size(&self) -> Option<u64> {
        self.frame_count.checked_mul(16)
    }

    /// RIFF 块声明的大小（不含 `RIFF` 和大小字段本身）
    fn riff_size(&self) -> Option<u64> {
        (4 + (8 + self.hdrl_size()) + 8 + 8)
            .checked_add(self.movi_size()?)?
            .checked_add(self.idx1_size()?)
    }

    /// 校验总大小并换算为 32 位块大小
    fn chunk_sizes(&self) -> Result<ChunkSizes, EncodeError> {
        let (movi, idx1, riff) = match (self.movi_size(), self.idx1_size(), self.riff_size()) {
            (Some(movi), Some(idx1), Some(riff)) if riff <= RIFF_MAX_BYTES => (movi, idx1, riff),
            (_, _, riff) => {
                return Err(EncodeError::TooLarge {
                    bytes: riff.map_or(u64::MAX, |b| b.saturating_add(8)),
                })
            }
        };
        // 以下各项都小于 riff，不会截断
        let narrow = |v: u64| v as u32;
        Ok(ChunkSizes {
            width: self.width,
            height: self.height,
            stride: self.stride,
            frame_bytes: narrow(self.frame_bytes),
            frame_count: narrow(self.frame_count),
            strf: narrow(self.strf_size()),
            strl: narrow(self.strl_size()),
            hdrl: narrow(self.hdrl_size()),
            movi: narrow(movi),
            idx1: narrow(idx1),
            riff: narrow(riff),
        })
    }
}

/// 已校验的 32 位块大小
struct ChunkSizes {
    width: u32,
    height: u32,
    stride: u32,
    frame_bytes: u32,
    frame_count: u32,
    strf: u32,
    strl: u32,
    hdrl: u32,
    movi: u32,
    idx1: u32,
    riff: u32,
}

impl ChunkSizes {
    fn write<W: Write>(
        &self,
        out: &mut W,
        frames: &[GrayImage],
        frame_rate: u32,
    ) -> io::Result<()> {
        chunk_header(out, b"RIFF", self.riff)?;
        out.write_all(b"AVI ")?;

        // hdrl
        chunk_header(out, b"LIST", self.hdrl)?;
        out.write_all(b"hdrl")?;
        self.write_avih(out, frame_rate)?;

        chunk_header(out, b"LIST", self.strl)?;
        out.write_all(b"strl")?;
        self.write_strh(out, frame_rate)?;
        self.write_strf(out)?;

        // movi
        chunk_header(out, b"LIST", self.movi)?;
        out.write_all(b"movi")?;
        let padding = vec![0u8; (self.stride - self.width) as usize];
        for frame in frames {
            chunk_header(out, FRAME_CHUNK_ID, self.frame_bytes)?;
            // DIB 行序自下而上
            for row in frame.as_raw().chunks_exact(self.width as usize).rev() {
                out.write_all(row)?;
                out.write_all(&padding)?;
            }
        }

        // idx1，偏移量相对于 "movi" 标识
        chunk_header(out, b"idx1", self.idx1)?;
        let mut offset = 4u32;
        for _ in 0..self.frame_count {
            out.write_all(FRAME_CHUNK_ID)?;
            put_u32(out, AVIIF_KEYFRAME)?;
            put_u32(out, offset)?;
            put_u32(out, self.frame_bytes)?;
            offset = offset.wrapping_add(8 + self.frame_bytes);
        }
        Ok(())
    }

    fn write_avih<W: Write>(&self, out: &mut W, frame_rate: u32) -> io::Result<()> {
        chunk_header(out, b"avih", AVIH_SIZE)?;
        put_u32(out, 1_000_000 / frame_rate)?; // dwMicroSecPerFrame
        put_u32(out, self.frame_bytes.saturating_mul(frame_rate))?; // dwMaxBytesPerSec
        put_u32(out, 0)?; // dwPaddingGranularity
        put_u32(out, AVIF_HASINDEX)?;
        put_u32(out, self.frame_count)?;
        put_u32(out, 0)?; // dwInitialFrames
        put_u32(out, 1)?; // dwStreams
        put_u32(out, self.frame_bytes)?; // dwSuggestedBufferSize
        put_u32(out, self.width)?;
        put_u32(out, self.height)?;
        out.write_all(&[0u8; 16]) // dwReserved[4]
    }

    fn write_strh<W: Write>(&self, out: &mut W, frame_rate: u32) -> io::Result<()> {
        chunk_header(out, b"strh", STRH_SIZE)?;
        out.write_all(b"vids")?;
        out.write_all(b"DIB ")?;
        put_u32(out, 0)?; // dwFlags
        put_u16(out, 0)?; // wPriority
        put_u16(out, 0)?; // wLanguage
        put_u32(out, 0)?; // dwInitialFrames
        put_u32(out, 1)?; // dwScale
        put_u32(out, frame_rate)?; // dwRate
        put_u32(out, 0)?; // dwStart
        put_u32(out, self.frame_count)?; // dwLength
        put_u32(out, self.frame_bytes)?; // dwSuggestedBufferSize
        put_u32(out, u32::MAX)?; // dwQuality = -1
        put_u32(out, 0)?; // dwSampleSize
        // rcFrame，宽高已限制在 u16 范围内
        put_u16(out, 0)?;
        put_u16(out, 0)?;
        put_u16(out, self.width as u16)?;
        put_u16(out, self.height as u16)
    }

    fn write_strf<W: Write>(&self, out: &mut W) -> io::Result<()> {
        chunk_header(out, b"strf", self.strf)?;
        put_u32(out, BITMAPINFOHEADER_SIZE)?;
        put_u32(out, self.width)?;
        put_u32(out, self.height)?; // 正数 = 自下而上
        put_u16(out, 1)?; // biPlanes
        put_u16(out, 8)?; // biBitCount
        put_u32(out, 0)?; // BI_RGB
        put_u32(out, self.frame_bytes)?;
        put_u32(out, 0)?;
        put_u32(out, 0)?;
        put_u32(out, 256)?; // biClrUsed
        put_u32(out, 0)?;
        for level in 0..=255u8 {
            out.write_all(&[level, level, level, 0])?;
        }
        Ok(())
    }
}

fn chunk_header<W: Write>(out: &mut W, id: &[u8; 4], size: u32) -> io::Result<()> {
    out.write_all(id)?;
    put_u32(out, size)
}

fn put_u32<W: Write>(out: &mut W, value: u32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

fn put_u16<W: Write>(out: &mut W, value: u16) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}
