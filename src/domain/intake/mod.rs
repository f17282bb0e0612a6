//! Intake Context - 用户输入限界上下文
//!
//! 职责:
//! - 上传图片的校验（格式、大小）
//! - 症状问卷（AdditionalInfo）的校验

mod errors;
mod image;
mod questionnaire;

pub use errors::IntakeError;
pub use image::{ImageFormat, ImageUpload};
pub use questionnaire::{AdditionalInfo, DurationBucket, MAX_ITCH_LEVEL, MAX_NOTES_LEN};
