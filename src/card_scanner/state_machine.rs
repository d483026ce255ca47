//! 扫描节奏状态机：扫描间隔与入库冷却两个独立计时器

use super::matcher::MatchCandidate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// 外部 OCR 调用的凭据，会话停止后旧凭据失效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecognitionTicket {
    epoch: u64,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Armed,
    Sampling,
    /// 等待外部文字识别返回
    Busy { ticket: RecognitionTicket },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// 两次扫描尝试的最小间隔
    pub scan_interval_ms: u64,
    /// 两次确认入库的最小间隔
    pub accept_cooldown_ms: u64,
    /// 汉明距离 <= 该值才接受
    pub match_threshold: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 350,
            accept_cooldown_ms: 1200,
            match_threshold: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanGateState {
    pub last_scan_attempt_at: Option<u64>,
    pub last_accepted_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentificationSource {
    Artwork,
    CodeStrip,
}

/// 识别成功事件，交给宿主做入库、UI 和震动反馈
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedCard {
    pub id: String,
    pub distance: u32,
    pub source: IdentificationSource,
}

pub struct ScanGate {
    state: GateState,
    config: GateConfig,
    timers: ScanGateState,
    epoch: u64,
    next_seq: u64,
}

impl ScanGate {
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    pub fn with_config(config: GateConfig) -> Self {
        Self {
            state: GateState::Idle,
            config,
            timers: ScanGateState::default(),
            epoch: 0,
            next_seq: 0,
        }
    }

    pub fn start(&mut self) {
        self.epoch += 1;
        self.timers = ScanGateState::default();
        self.state = GateState::Armed;
    }

    /// 可在任意时刻调用，未完成的识别凭据随之作废
    pub fn stop(&mut self) {
        if self.state != GateState::Idle {
            debug!("gate: stop from {:?}", self.state);
        }
        self.epoch += 1;
        self.timers = ScanGateState::default();
        self.state = GateState::Idle;
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn timers(&self) -> ScanGateState {
        self.timers
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.state != GateState::Idle
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, GateState::Busy { .. })
    }

    fn elapsed_more_than(now_ms: u64, last: Option<u64>, window_ms: u64) -> bool {
        match last {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > window_ms,
        }
    }

    /// Armed → Sampling，需要距上次尝试超过扫描间隔
    pub fn try_begin_scan(&mut self, now_ms: u64) -> bool {
        if self.state != GateState::Armed
            || !Self::elapsed_more_than(now_ms, self.timers.last_scan_attempt_at, self.config.scan_interval_ms)
        {
            return false;
        }
        self.timers.last_scan_attempt_at = Some(now_ms);
        self.state = GateState::Sampling;
        true
    }

    /// 完成一次指纹匹配，无论结果都回到 Armed
    pub fn finish_scan(
        &mut self,
        now_ms: u64,
        best: Option<&MatchCandidate>,
    ) -> Option<IdentifiedCard> {
        if self.state != GateState::Sampling {
            return None;
        }
        self.state = GateState::Armed;

        let best = best?;
        if best.distance > self.config.match_threshold {
            debug!("gate: best {} d={} above threshold", best.id, best.distance);
            return None;
        }
        self.accept(now_ms, &best.id, best.distance, IdentificationSource::Artwork)
    }

    /// Sampling → Busy，忙碌期间不会发出第二张凭据
    pub fn begin_recognition(&mut self) -> Option<RecognitionTicket> {
        if self.state != GateState::Sampling {
            return None;
        }
        let ticket = RecognitionTicket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.state = GateState::Busy { ticket };
        Some(ticket)
    }

    /// 外部识别返回。过期凭据（会话已停止或重启）直接忽略
    pub fn finish_recognition(
        &mut self,
        ticket: RecognitionTicket,
        now_ms: u64,
        card_id: Option<&str>,
    ) -> Option<IdentifiedCard> {
        if self.state != (GateState::Busy { ticket }) {
            debug!("gate: ignoring stale recognition ticket {:?}", ticket);
            return None;
        }
        self.state = GateState::Armed;
        self.accept(now_ms, card_id?, 0, IdentificationSource::CodeStrip)
    }

    fn accept(
        &mut self,
        now_ms: u64,
        id: &str,
        distance: u32,
        source: IdentificationSource,
    ) -> Option<IdentifiedCard> {
        if !Self::elapsed_more_than(now_ms, self.timers.last_accepted_at, self.config.accept_cooldown_ms) {
            debug!("gate: {} within cooldown", id);
            return None;
        }
        self.timers.last_accepted_at = Some(now_ms);
        info!("🃏 Card identified: {} (d={}, {:?})", id, distance, source);
        Some(IdentifiedCard {
            id: id.to_string(),
            distance,
            source,
        })
    }
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, distance: u32) -> MatchCandidate {
        MatchCandidate {
            id: id.to_string(),
            distance,
        }
    }

    fn armed_gate() -> ScanGate {
        let mut gate = ScanGate::new();
        gate.start();
        gate
    }

    #[test]
    fn test_idle_gate_never_scans() {
        let mut gate = ScanGate::new();
        assert_eq!(gate.state(), GateState::Idle);
        assert!(!gate.try_begin_scan(10_000));
    }

    #[test]
    fn test_armed_to_sampling_to_armed() {
        let mut gate = armed_gate();
        assert!(gate.try_begin_scan(0));
        assert_eq!(gate.state(), GateState::Sampling);

        assert_eq!(gate.finish_scan(10, None), None);
        assert_eq!(gate.state(), GateState::Armed);
    }

    #[test]
    fn test_scan_interval() {
        let mut gate = armed_gate();
        assert!(gate.try_begin_scan(1000));
        gate.finish_scan(1000, None);

        assert!(!gate.try_begin_scan(1200));
        assert!(!gate.try_begin_scan(1350));
        assert!(gate.try_begin_scan(1351));
    }

    #[test]
    fn test_threshold() {
        let mut gate = armed_gate();
        gate.try_begin_scan(0);
        assert_eq!(gate.finish_scan(0, Some(&candidate("OP01-001", 20))), None);

        gate.try_begin_scan(1000);
        let event = gate.finish_scan(1000, Some(&candidate("OP01-001", 12)));
        assert_eq!(
            event,
            Some(IdentifiedCard {
                id: "OP01-001".to_string(),
                distance: 12,
                source: IdentificationSource::Artwork,
            })
        );
    }

    #[test]
    fn test_accept_cooldown() {
        let mut gate = armed_gate();
        let best = candidate("X", 0);

        gate.try_begin_scan(0);
        assert!(gate.finish_scan(0, Some(&best)).is_some());

        // 扫描可以继续，但冷却期内不再入库
        assert!(gate.try_begin_scan(400));
        assert!(gate.finish_scan(400, Some(&best)).is_none());
        assert!(gate.try_begin_scan(1200));
        assert!(gate.finish_scan(1200, Some(&best)).is_none());
        assert!(gate.try_begin_scan(1600));
        assert!(gate.finish_scan(1600, Some(&best)).is_some());
        assert_eq!(gate.timers().last_accepted_at, Some(1600));
    }

    #[test]
    fn test_recognition_busy_blocks_second_ticket() {
        let mut gate = armed_gate();
        gate.try_begin_scan(0);
        let ticket = gate.begin_recognition().unwrap();
        assert!(gate.is_busy());
        assert_eq!(gate.begin_recognition(), None);
        assert!(!gate.try_begin_scan(5000));

        let event = gate.finish_recognition(ticket, 100, Some("ST01-001"));
        assert_eq!(event.map(|e| e.source), Some(IdentificationSource::CodeStrip));
        assert_eq!(gate.state(), GateState::Armed);
    }

    #[test]
    fn test_recognition_failure_returns_to_armed() {
        let mut gate = armed_gate();
        gate.try_begin_scan(0);
        let ticket = gate.begin_recognition().unwrap();
        assert_eq!(gate.finish_recognition(ticket, 50, None), None);
        assert_eq!(gate.state(), GateState::Armed);
        assert_eq!(gate.timers().last_accepted_at, None);
    }

    #[test]
    fn test_stop_invalidates_ticket() {
        let mut gate = armed_gate();
        gate.try_begin_scan(0);
        let ticket = gate.begin_recognition().unwrap();

        gate.stop();
        gate.stop();
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.timers(), ScanGateState::default());

        gate.start();
        assert_eq!(gate.finish_recognition(ticket, 100, Some("OP01-001")), None);
        assert_eq!(gate.state(), GateState::Armed);
    }

    #[test]
    fn test_finish_scan_after_stop_is_noop() {
        let mut gate = armed_gate();
        gate.try_begin_scan(0);
        gate.stop();
        assert_eq!(gate.finish_scan(0, Some(&candidate("X", 0))), None);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn test_steady_card_one_event_per_cooldown() {
        let config = GateConfig {
            scan_interval_ms: 350,
            accept_cooldown_ms: 1000,
            match_threshold: 12,
        };
        let mut gate = ScanGate::with_config(config);
        gate.start();
        let best = candidate("X", 3);

        let mut accepted = Vec::new();
        for now in (0..10_000u64).step_by(33) {
            if gate.try_begin_scan(now) && gate.finish_scan(now, Some(&best)).is_some() {
                accepted.push(now);
            }
        }

        assert!(accepted.len() <= 10, "{:?}", accepted);
        assert!(accepted.len() >= 7, "{:?}", accepted);
        assert!(accepted.windows(2).all(|w| w[1] - w[0] > 1000));
    }
}
