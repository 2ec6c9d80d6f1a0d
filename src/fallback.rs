//! Quyết định quay về tiếng Anh
//!
//! Engine chỉ mô tả tổ hợp; còn "từ này hoá ra không phải tiếng Việt,
//! trả lại đúng phím đã gõ" là quyết định của tầng ngoài. Module này gom
//! các phép thử đó: host gọi [`should_fallback_to_english`] khi chọn
//! chuỗi hiển thị, và [`must_restore_word`] trước khi chốt một từ.

use crate::core::chars::has_vietnamese_char;
use crate::core::composition::Mode;
use crate::core::engine::Engine;

/// Tuỳ chọn của tầng quay về tiếng Anh.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    /// Tự trả từ không phải tiếng Việt về chuỗi phím gốc
    pub auto_restore: bool,
    /// Không quay về tiếng Anh khi từ kết thúc bằng `d` hoặc đã có `đ`
    /// (dd hay dùng trong viết tắt)
    pub dd_free_style: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        FallbackPolicy {
            auto_restore: true,
            dd_free_style: false,
        }
    }
}

/// Chuỗi hiển thị có nên là bản tiếng Anh không. Dùng kiểm tra lỏng
/// (tiền tố): từ đang gõ dở chưa bị phạt. `check_vietnamese` đòi từ
/// phải chứa ký tự tiếng Việt rồi mới xét, tránh đụng vào từ thuần
/// ASCII.
pub fn should_fallback_to_english(
    engine: &Engine,
    policy: &FallbackPolicy,
    check_vietnamese: bool,
) -> bool {
    if !policy.auto_restore {
        return false;
    }
    let word = engine.processed_string(Mode::VIETNAMESE | Mode::LOWER_CASE);
    if word.is_empty() {
        return false;
    }
    if policy.dd_free_style && (word.ends_with('d') || word.contains('đ')) {
        return false;
    }
    if check_vietnamese && !has_vietnamese_char(&word) {
        return false;
    }
    !engine.is_valid(false)
}

/// Từ cuối có phải trả về chuỗi phím gốc trước khi chốt không: đã bị
/// bộ gõ biến đổi nhưng không phải một âm tiết tiếng Việt trọn vẹn.
pub fn must_restore_word(engine: &Engine, policy: &FallbackPolicy) -> bool {
    if !policy.auto_restore {
        return false;
    }
    let word = engine.processed_string(Mode::VIETNAMESE | Mode::LOWER_CASE);
    if word.is_empty() || !has_vietnamese_char(&word) {
        return false;
    }
    !engine.is_valid(true)
}
