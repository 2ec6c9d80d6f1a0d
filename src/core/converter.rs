//! Chuyển cả một chuỗi phím Telex thành văn bản tiếng Việt
//!
//! Chạy trọn đường ống của bộ gõ trên một chuỗi có sẵn: từng phím qua
//! engine, gặp ký tự ngắt từ thì xét trả từ về chuỗi gốc nếu nó không
//! phải tiếng Việt. Dùng cho bộ chuyển dòng lệnh và kiểm thử đầu-cuối.

use crate::core::composition::Mode;
use crate::core::engine::{Engine, EngineFlags};
use crate::core::rules::{parse_input_method, telex_definition, InputMethod};
use crate::fallback::{must_restore_word, FallbackPolicy};
use std::sync::Arc;
use std::sync::LazyLock;

static TELEX: LazyLock<Arc<InputMethod>> = LazyLock::new(|| {
    // bảng có sẵn, luôn phân tích được (có test giữ bất biến này)
    let im = parse_input_method("Telex", &telex_definition())
        .expect("bảng Telex có sẵn phải hợp lệ");
    Arc::new(im)
});

/// Chuyển một chuỗi phím bằng kiểu gõ Telex với cờ mặc định.
/// Từ không phải tiếng Việt được giữ nguyên như đã gõ.
pub fn convert(input: &str) -> String {
    let mut engine = Engine::new(Arc::clone(&TELEX), EngineFlags::standard());
    convert_with(&mut engine, &FallbackPolicy::default(), input)
}

/// Chuyển một chuỗi phím trên engine cho trước. Engine được reset trước
/// khi bắt đầu.
pub fn convert_with(engine: &mut Engine, policy: &FallbackPolicy, input: &str) -> String {
    engine.reset();
    for key in input.chars() {
        if engine.can_process_key(key) {
            engine.process_key(key, Mode::VIETNAMESE);
        } else {
            // ngắt từ: chốt từ đứng trước
            if must_restore_word(engine, policy) {
                engine.restore_last_word();
            }
            engine.process_key(key, Mode::ENGLISH);
        }
    }
    if must_restore_word(engine, policy) {
        engine.restore_last_word();
    }
    engine.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT)
}
