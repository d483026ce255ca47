use crate::card_scanner::{
    IdentificationSource, IdentifiedCard, MatchCandidate, Rect, ScanError, ScanStatus,
};
use serde::{Deserialize, Serialize};

/// 宿主传入的 RGBA 帧
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

/// 宿主传入的 YUV420 帧
#[derive(Debug, Clone)]
pub struct CameraYuvFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanPhase {
    Idle,
    Searching,
    Steadying,
    Stable,
    Unmatched,
    Identified,
    AwaitingText,
}

impl From<ScanStatus> for ScanPhase {
    fn from(status: ScanStatus) -> Self {
        match status {
            ScanStatus::Idle => ScanPhase::Idle,
            ScanStatus::Searching => ScanPhase::Searching,
            ScanStatus::Steadying => ScanPhase::Steadying,
            ScanStatus::Stable => ScanPhase::Stable,
            ScanStatus::Unmatched => ScanPhase::Unmatched,
            ScanStatus::Identified => ScanPhase::Identified,
            ScanStatus::AwaitingText => ScanPhase::AwaitingText,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl From<Rect> for OverlayRect {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            w: r.w,
            h: r.h,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: String,
    pub distance: u32,
}

impl From<MatchCandidate> for MatchInfo {
    fn from(c: MatchCandidate) -> Self {
        Self {
            id: c.id,
            distance: c.distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedCardInfo {
    pub card_id: String,
    pub distance: u32,
    /// 是否来自编号条带 OCR
    pub from_code: bool,
}

impl From<IdentifiedCard> for IdentifiedCardInfo {
    fn from(card: IdentifiedCard) -> Self {
        Self {
            card_id: card.id,
            distance: card.distance,
            from_code: card.source == IdentificationSource::CodeStrip,
        }
    }
}

/// 需要宿主 OCR 的编号条带图像
#[derive(Debug, Clone)]
pub struct TextRegionRequest {
    pub request_id: u64,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ScanFrameResult {
    pub phase: ScanPhase,
    pub guide: OverlayRect,
    pub card: Option<OverlayRect>,
    pub sample_region: Option<OverlayRect>,
    pub top_matches: Vec<MatchInfo>,
    pub identified: Option<IdentifiedCardInfo>,
    pub text_request: Option<TextRegionRequest>,
}

#[derive(Debug, Clone)]
pub struct ScanStats {
    pub processed_frames: u64,
    pub identified_cards: u64,
}

/// 用于生成 hashes.json 的卡图
#[derive(Debug, Clone)]
pub struct CardImageInput {
    pub card_id: String,
    pub image_bytes: Vec<u8>,
}

/// 扫描器 API 错误类型，FRB 友好的设计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerApiError {
    pub error_type: String,
    pub message: String,
}

impl ScannerApiError {
    pub(crate) fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn session_poisoned() -> Self {
        Self::new("SessionPoisoned", "scan session lock poisoned")
    }
}

impl From<ScanError> for ScannerApiError {
    fn from(e: ScanError) -> Self {
        let error_type = match &e {
            ScanError::InvalidFrame { .. } => "InvalidFrame",
            ScanError::BufferSize { .. } => "InvalidFrame",
            ScanError::Reference(_) => "ReferenceDatabase",
            ScanError::Config(_) => "InvalidConfig",
        };
        Self::new(error_type, e.to_string())
    }
}

impl std::fmt::Display for ScannerApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for ScannerApiError {}
