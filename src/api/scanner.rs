//! 卡牌扫描器

use crate::api::models::card::{
    CameraFrame, CameraYuvFrame, CardImageInput, IdentifiedCardInfo, ScanFrameResult,
    ScanStats, ScannerApiError, TextRegionRequest,
};
use crate::card_scanner::{
    Frame, FrameOutcome, RawFrame, RecognitionTicket, ScanConfig, ScanError, ScanSession,
};
use crate::core::reference::{build_reference_records, CardImage, ReferenceDb, ReferenceError};
use flutter_rust_bridge::frb;
use log::info;
use std::sync::{Arc, Mutex};

struct ScannerInner {
    session: ScanSession,
    pending: Option<(u64, RecognitionTicket)>,
    next_request_id: u64,
}

impl ScannerInner {
    fn build_result(&mut self, outcome: FrameOutcome) -> ScanFrameResult {
        let text_request = outcome.recognition.map(|request| {
            let request_id = self.next_request_id;
            self.next_request_id += 1;
            self.pending = Some((request_id, request.ticket));
            let (width, height) = request.region.dimensions();
            TextRegionRequest {
                request_id,
                width,
                height,
                rgba: request.region.into_raw(),
            }
        });

        ScanFrameResult {
            phase: outcome.status.into(),
            guide: outcome.overlay.guide.into(),
            card: outcome.overlay.card.map(Into::into),
            sample_region: outcome.overlay.sample_region.map(Into::into),
            top_matches: outcome.top_matches.into_iter().map(Into::into).collect(),
            identified: outcome.identified.map(Into::into),
            text_request,
        }
    }
}

/// 卡牌扫描器 - 边缘检测 + 稳定过滤 + aHash 匹配
///
/// ```dart
/// final scanner = CardScanner.create(hashesJson: json);
/// final result = scanner.processFrame(frame: cameraFrame);
/// if (result.identified != null) collection.add(result.identified!.cardId);
/// ```
#[frb(opaque)]
pub struct CardScanner {
    inner: Mutex<ScannerInner>,
}

impl CardScanner {
    /// 加载 hashes.json 并开始会话；config_json 为空时使用默认参数
    #[frb(sync)]
    pub fn create(
        hashes_json: String,
        config_json: Option<String>,
    ) -> Result<Self, ScannerApiError> {
        crate::init_logging();

        let config = match config_json {
            Some(json) => ScanConfig::from_json(&json)?,
            None => ScanConfig::default(),
        };
        let db = ReferenceDb::from_json(&hashes_json).map_err(ScanError::from)?;
        let session = ScanSession::start(config, Arc::new(db))?;

        info!("🎬 CardScanner: created");
        Ok(Self {
            inner: Mutex::new(ScannerInner {
                session,
                pending: None,
                next_request_id: 0,
            }),
        })
    }

    #[frb(sync)]
    pub fn process_frame(&self, frame: CameraFrame) -> Result<ScanFrameResult, ScannerApiError> {
        let frame = Frame::new(
            frame.width,
            frame.height,
            frame.rgba,
            frame.timestamp_ms,
            frame.frame_number,
        );
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| ScannerApiError::session_poisoned())?;
        let outcome = inner.session.process_frame(&frame)?;
        Ok(inner.build_result(outcome))
    }

    #[frb(sync)]
    pub fn process_yuv_frame(
        &self,
        frame: CameraYuvFrame,
    ) -> Result<ScanFrameResult, ScannerApiError> {
        let raw = RawFrame {
            width: frame.width,
            height: frame.height,
            y_plane: frame.y_plane,
            u_plane: frame.u_plane,
            v_plane: frame.v_plane,
            timestamp_ms: frame.timestamp_ms,
            frame_number: frame.frame_number,
        };
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| ScannerApiError::session_poisoned())?;
        let outcome = inner.session.process_raw_frame(&raw)?;
        Ok(inner.build_result(outcome))
    }

    /// OCR 结果回调；text 为 None 表示识别失败
    ///
    /// 每个 `text_request` 都必须回调一次，识别失败也要传 None。
    /// 未回调的请求不会超时：扫描器会一直停在 `AwaitingText`，
    /// 直到 `stop()` / `restart()`。
    #[frb(sync)]
    pub fn complete_text_request(
        &self,
        request_id: u64,
        now_ms: u64,
        text: Option<String>,
    ) -> Result<Option<IdentifiedCardInfo>, ScannerApiError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| ScannerApiError::session_poisoned())?;

        let ticket = match inner.pending {
            Some((id, ticket)) if id == request_id => ticket,
            _ => return Ok(None),
        };
        inner.pending = None;

        let result = text.ok_or_else(|| "text recognition failed".to_string());
        Ok(inner
            .session
            .complete_recognition(ticket, now_ms, result)
            .map(Into::into))
    }

    #[frb(sync)]
    pub fn stop(&self) -> Result<(), ScannerApiError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| ScannerApiError::session_poisoned())?;
        inner.pending = None;
        inner.session.stop();
        Ok(())
    }

    #[frb(sync)]
    pub fn restart(&self) -> Result<(), ScannerApiError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| ScannerApiError::session_poisoned())?;
        inner.pending = None;
        inner.session.restart();
        Ok(())
    }

    #[frb(sync, getter)]
    pub fn stats(&self) -> Result<ScanStats, ScannerApiError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| ScannerApiError::session_poisoned())?;
        Ok(ScanStats {
            processed_frames: inner.session.frame_count(),
            identified_cards: inner.session.identified_count(),
        })
    }
}

impl Drop for CardScanner {
    fn drop(&mut self) {
        info!("🗑️ CardScanner: released");
    }
}

/// 由卡图批量生成 hashes.json 内容
#[frb]
pub fn build_reference_json(images: Vec<CardImageInput>) -> Result<String, ScannerApiError> {
    let images = images
        .into_iter()
        .map(|img| CardImage {
            id: img.card_id,
            bytes: img.image_bytes,
        })
        .collect();
    let records = build_reference_records(images);
    if records.is_empty() {
        return Err(ScanError::from(ReferenceError::Empty).into());
    }
    serde_json::to_string(&records)
        .map_err(|e| ScannerApiError::new("ReferenceDatabase", e.to_string()))
}
