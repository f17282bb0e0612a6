//! Intake Context - 上传图片

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;

use super::IntakeError;

/// 支持的图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// 用户选择的待分析图片
///
/// 不变量:
/// - 内容非空
/// - 格式可识别
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, IntakeError> {
        let file_name = file_name.into();
        let format = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .ok_or_else(|| IntakeError::UnsupportedFormat(file_name.clone()))?;

        if bytes.is_empty() {
            return Err(IntakeError::EmptyImage(file_name));
        }

        Ok(Self {
            file_name,
            format,
            bytes,
        })
    }

    /// 检查图片大小上限
    pub fn ensure_within(&self, limit: u64) -> Result<(), IntakeError> {
        let size = self.bytes.len() as u64;
        if limit > 0 && size > limit {
            return Err(IntakeError::ImageTooLarge { size, limit });
        }
        Ok(())
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 编码为 base64（保存报告时使用）
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}
