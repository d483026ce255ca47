//! 编号条带：外部 OCR 接口 + 从原始文字中提取卡牌编号

use image::RgbaImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};

/// 外部文字识别引擎（可能很慢，由宿主实现）
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, region: &RgbaImage) -> Result<String, String>;
}

/// 编号语法：OP01-001 / ST10-005 / EB01-012 / PRB01-001 / P-042
static CARD_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(OP|ST|EB|PRB)([0-9OI]{2})|(P))-([0-9OI]{3})\b").expect("valid card code pattern")
});

static DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[-–—_]\s*").expect("valid dash pattern"));

/// OCR 常见误识：数字位上的 O/I
fn fix_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'O' => '0',
            'I' => '1',
            other => other,
        })
        .collect()
}

/// 从 OCR 原文中提取第一个符合语法的编号
pub fn extract_card_code(raw: &str) -> Option<String> {
    let upper = raw.to_uppercase();
    let normalized = DASH.replace_all(&upper, "-");

    let caps = CARD_CODE.captures(&normalized)?;
    let number = fix_digits(caps.get(4)?.as_str());

    match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(prefix), Some(set), _) => Some(format!(
            "{}{}-{}",
            prefix.as_str(),
            fix_digits(set.as_str()),
            number
        )),
        (_, _, Some(promo)) => Some(format!("{}-{}", promo.as_str(), number)),
        _ => None,
    }
}

/// 测试用识别器：按调用次数返回预设结果
pub struct MockTextRecognizer {
    responses: Box<dyn Fn(u64) -> Result<String, String> + Send + Sync>,
    calls: AtomicU64,
}

impl MockTextRecognizer {
    pub fn with_text(text: &str) -> Self {
        let text = text.to_string();
        Self::with_pattern(move |_| Ok(text.clone()))
    }

    pub fn failing() -> Self {
        Self::with_pattern(|_| Err("recognizer unavailable".to_string()))
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            responses: Box::new(pattern),
            calls: AtomicU64::new(0),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for MockTextRecognizer {
    fn recognize(&self, _region: &RgbaImage) -> Result<String, String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responses)(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_codes() {
        assert_eq!(extract_card_code("OP01-001"), Some("OP01-001".to_string()));
        assert_eq!(extract_card_code("EB01-012"), Some("EB01-012".to_string()));
        assert_eq!(extract_card_code("PRB01-001"), Some("PRB01-001".to_string()));
        assert_eq!(extract_card_code("P-042"), Some("P-042".to_string()));
    }

    #[test]
    fn test_noisy_ocr_text() {
        assert_eq!(
            extract_card_code("SR  op01 - 016 Monkey.D.Luffy"),
            Some("OP01-016".to_string())
        );
        assert_eq!(extract_card_code("ST10–005"), Some("ST10-005".to_string()));
        assert_eq!(extract_card_code("OPO1-OO1"), Some("OP01-001".to_string()));
    }

    #[test]
    fn test_no_code() {
        assert_eq!(extract_card_code(""), None);
        assert_eq!(extract_card_code("Leader 5000 Power"), None);
        assert_eq!(extract_card_code("OP01-0012"), None);
        assert_eq!(extract_card_code("XP-001"), None);
    }

    #[test]
    fn test_mock_recognizer_counts_calls() {
        let recognizer = MockTextRecognizer::with_pattern(|n| {
            if n == 0 {
                Err("timeout".to_string())
            } else {
                Ok("ST01-001".to_string())
            }
        });
        let region = RgbaImage::new(4, 4);
        assert!(recognizer.recognize(&region).is_err());
        assert_eq!(recognizer.recognize(&region).as_deref(), Ok("ST01-001"));
        assert_eq!(recognizer.call_count(), 2);
    }
}
