//! 实时卡牌识别流水线
//!
//! 每帧流程：
//! 1. 边缘检测 - 下采样灰度 + Sobel 幅值，自适应阈值求卡片包围盒
//! 2. 稳定过滤 - 矩形连续多帧不动才采样
//! 3. 区域采样 - 按卡面比例取插画区域或编号条带
//! 4. 指纹匹配 - aHash + 汉明距离 top-K
//! 5. 节奏控制 - 扫描间隔与入库冷却

pub mod code_reader;
pub mod edge_map;
pub mod error;
pub mod frame;
pub mod hasher;
pub mod matcher;
pub mod pipeline;
pub mod rect_detector;
pub mod region;
pub mod stability;
pub mod state_machine;

pub use code_reader::{extract_card_code, MockTextRecognizer, TextRecognizer};
pub use error::ScanError;
pub use frame::{Frame, PixelFormat, RawFrame, Rect};
pub use hasher::{ahash_region, ahash_rgba, hamming_hex, Fingerprint};
pub use matcher::{best_match, top_matches, MatchCandidate};
pub use pipeline::{
    FrameOutcome, OverlayGeometry, RecognitionRequest, ScanConfig, ScanSession, ScanStatus,
};
pub use rect_detector::{DetectorConfig, RectDetector};
pub use region::{guide_frame, SamplingProfile};
pub use stability::{StabilityConfig, StabilityTracker};
pub use state_machine::{
    GateConfig, GateState, IdentificationSource, IdentifiedCard, RecognitionTicket, ScanGate,
};
