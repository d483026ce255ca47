use crate::card_scanner::code_reader::{extract_card_code, TextRecognizer};
use crate::card_scanner::error::ScanError;
use crate::card_scanner::frame::{Frame, RawFrame, Rect};
use crate::card_scanner::hasher::ahash_region;
use crate::card_scanner::matcher::{top_matches, MatchCandidate};
use crate::card_scanner::rect_detector::{DetectorConfig, RectDetector};
use crate::card_scanner::region::{guide_frame, SamplingProfile};
use crate::card_scanner::stability::{StabilityConfig, StabilityTracker};
use crate::card_scanner::state_machine::{
    GateConfig, GateState, IdentifiedCard, RecognitionTicket, ScanGate,
};
use crate::core::reference::{ReferenceDb, ReferenceError};
use image::RgbaImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub detector: DetectorConfig,
    pub stability: StabilityConfig,
    pub gate: GateConfig,
    pub profile: SamplingProfile,
    /// 每次扫描附带的候选数量（调试展示）
    pub debug_top_k: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            stability: StabilityConfig::default(),
            gate: GateConfig::default(),
            profile: SamplingProfile::Artwork,
            debug_top_k: 5,
        }
    }
}

impl ScanConfig {
    /// 低延迟：少量稳定帧即扫描
    pub fn responsive() -> Self {
        Self {
            stability: StabilityConfig {
                min_stable_frames: 6,
                ..Default::default()
            },
            gate: GateConfig {
                scan_interval_ms: 350,
                accept_cooldown_ms: 900,
                match_threshold: 12,
            },
            ..Default::default()
        }
    }

    /// 高准确：更长的稳定窗口和冷却
    pub fn conservative() -> Self {
        Self {
            stability: StabilityConfig {
                min_stable_frames: 18,
                ..Default::default()
            },
            gate: GateConfig {
                scan_interval_ms: 2000,
                accept_cooldown_ms: 2500,
                match_threshold: 10,
            },
            ..Default::default()
        }
    }

    pub fn for_code_strip() -> Self {
        Self {
            profile: SamplingProfile::CodeStrip,
            gate: GateConfig {
                scan_interval_ms: 1500,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ScanError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ScanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        let d = &self.detector;
        if d.downsample == 0 || d.sample_stride == 0 {
            return Err(ScanError::Config(
                "downsample and sample_stride must be >= 1".to_string(),
            ));
        }
        if !(d.min_aspect > 0.0 && d.min_aspect < d.max_aspect) {
            return Err(ScanError::Config(format!(
                "aspect band [{}, {}] is empty",
                d.min_aspect, d.max_aspect
            )));
        }
        if d.threshold_multiplier <= 0.0 {
            return Err(ScanError::Config(
                "threshold_multiplier must be positive".to_string(),
            ));
        }
        if self.debug_top_k == 0 {
            return Err(ScanError::Config("debug_top_k must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// 用户可见的当前理解
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    Idle,
    /// 没有检测到卡片
    Searching,
    /// 检测到卡片，尚未稳定
    Steadying,
    /// 已稳定，等待下一次扫描窗口
    Stable,
    /// 本帧扫描过，但没有被接受
    Unmatched,
    Identified,
    /// 等待外部文字识别
    AwaitingText,
}

/// 叠加层几何信息，仅供绘制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayGeometry {
    pub guide: Rect,
    pub card: Option<Rect>,
    pub sample_region: Option<Rect>,
}

/// 宿主需要执行的 OCR 请求
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub ticket: RecognitionTicket,
    pub region: RgbaImage,
}

#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub status: ScanStatus,
    pub overlay: OverlayGeometry,
    pub top_matches: Vec<MatchCandidate>,
    pub identified: Option<IdentifiedCard>,
    pub recognition: Option<RecognitionRequest>,
}

impl FrameOutcome {
    fn new(status: ScanStatus, overlay: OverlayGeometry) -> Self {
        Self {
            status,
            overlay,
            top_matches: Vec::new(),
            identified: None,
            recognition: None,
        }
    }
}

/// 一次扫描会话：持有全部可变状态，参考库只读共享
pub struct ScanSession {
    config: ScanConfig,
    db: Arc<ReferenceDb>,
    detector: RectDetector,
    tracker: StabilityTracker,
    gate: ScanGate,
    frame_counter: u64,
    identified_counter: u64,
}

impl ScanSession {
    pub fn start(config: ScanConfig, db: Arc<ReferenceDb>) -> Result<Self, ScanError> {
        config.validate()?;
        if db.is_empty() {
            return Err(ReferenceError::Empty.into());
        }

        let mut gate = ScanGate::with_config(config.gate.clone());
        gate.start();

        info!(
            "🎬 ScanSession: started ({:?}, {} reference cards)",
            config.profile,
            db.len()
        );
        Ok(Self {
            detector: RectDetector::with_config(config.detector.clone()),
            tracker: StabilityTracker::with_config(config.stability.clone()),
            gate,
            config,
            db,
            frame_counter: 0,
            identified_counter: 0,
        })
    }

    /// 停止会话，放弃进行中的扫描。重复调用安全
    pub fn stop(&mut self) {
        if self.gate.is_active() {
            info!("⏹️ ScanSession: stopped after {} frames", self.frame_counter);
        }
        self.tracker.reset();
        self.gate.stop();
    }

    pub fn restart(&mut self) {
        self.stop();
        self.frame_counter = 0;
        self.identified_counter = 0;
        self.gate.start();
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_active()
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn identified_count(&self) -> u64 {
        self.identified_counter
    }

    pub fn process_raw_frame(&mut self, raw: &RawFrame) -> Result<FrameOutcome, ScanError> {
        let frame = raw.to_rgba()?;
        self.process_frame(&frame)
    }

    /// 每帧调用一次：检测 → 稳定 → （间隔允许时）采样 → 哈希 → 匹配 → 冷却
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameOutcome, ScanError> {
        frame.validate()?;
        let (w, h) = (frame.width, frame.height);
        let guide = guide_frame(w, h);

        if !self.gate.is_active() {
            return Ok(FrameOutcome::new(
                ScanStatus::Idle,
                OverlayGeometry {
                    guide,
                    card: None,
                    sample_region: None,
                },
            ));
        }

        self.frame_counter += 1;
        let now_ms = frame.timestamp_ms();

        let card = self.detector.detect(frame);
        let stable = self.tracker.update(card, w, h);
        let profile = self.config.profile;

        let mut outcome = FrameOutcome::new(
            if card.is_some() {
                ScanStatus::Steadying
            } else {
                ScanStatus::Searching
            },
            OverlayGeometry {
                guide,
                card,
                sample_region: card.map(|r| profile.sample(r, w, h)),
            },
        );

        if self.gate.is_busy() {
            outcome.status = ScanStatus::AwaitingText;
            return Ok(outcome);
        }

        let Some(stable_rect) = stable else {
            return Ok(outcome);
        };
        outcome.status = ScanStatus::Stable;

        if !self.gate.try_begin_scan(now_ms) {
            return Ok(outcome);
        }

        let region = profile.sample(stable_rect, w, h);
        match profile {
            SamplingProfile::Artwork => {
                let query = ahash_region(frame, region);
                let top = top_matches(query, &self.db, self.config.debug_top_k);
                debug!(
                    "scan @{}ms q={} top: {}",
                    now_ms,
                    query,
                    top.iter()
                        .map(|c| format!("{}:{}", c.id, c.distance))
                        .collect::<Vec<_>>()
                        .join(" | ")
                );

                let identified = self.gate.finish_scan(now_ms, top.first());
                outcome.status = if identified.is_some() {
                    self.identified_counter += 1;
                    ScanStatus::Identified
                } else {
                    ScanStatus::Unmatched
                };
                outcome.top_matches = top;
                outcome.identified = identified;
            }
            SamplingProfile::CodeStrip => {
                if let Some(ticket) = self.gate.begin_recognition() {
                    outcome.status = ScanStatus::AwaitingText;
                    outcome.recognition = Some(RecognitionRequest {
                        ticket,
                        region: frame.crop_rgba(region),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// 宿主完成 OCR 后回调。识别失败视为没有编号，不影响会话
    pub fn complete_recognition(
        &mut self,
        ticket: RecognitionTicket,
        now_ms: u64,
        result: Result<String, String>,
    ) -> Option<IdentifiedCard> {
        let code = match result {
            Ok(text) => {
                let code = extract_card_code(&text);
                if code.is_none() {
                    debug!("no card code in OCR text {:?}", text);
                }
                code
            }
            Err(e) => {
                warn!("⚠️ Text recognition failed: {}", e);
                None
            }
        };

        let identified = self.gate.finish_recognition(ticket, now_ms, code.as_deref());
        if identified.is_some() {
            self.identified_counter += 1;
        }
        identified
    }

    /// 同步执行 OCR 的便捷入口
    pub fn process_frame_with_recognizer(
        &mut self,
        frame: &Frame,
        recognizer: &dyn TextRecognizer,
    ) -> Result<FrameOutcome, ScanError> {
        let mut outcome = self.process_frame(frame)?;

        if let Some(request) = outcome.recognition.take() {
            let result = recognizer.recognize(&request.region);
            let identified =
                self.complete_recognition(request.ticket, frame.timestamp_ms(), result);
            outcome.status = if identified.is_some() {
                ScanStatus::Identified
            } else {
                ScanStatus::Unmatched
            };
            outcome.identified = identified;
        }

        Ok(outcome)
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        debug!("ScanSession: released");
    }
}
