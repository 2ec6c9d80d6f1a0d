//! Kiểm thử đầu-cuối: đường ống gõ phím hoàn chỉnh qua API công khai

use std::sync::Arc;
use vikey::{
    convert, must_restore_word, parse_input_method, telex_definition, Engine, EngineFlags,
    FallbackPolicy, Mode,
};

fn telex_engine(flags: EngineFlags) -> Engine {
    let method = parse_input_method("Telex", &telex_definition()).unwrap();
    Engine::new(Arc::new(method), flags)
}

fn type_vn(s: &str) -> String {
    let mut e = telex_engine(EngineFlags::standard());
    e.process_string(s, Mode::VIETNAMESE);
    e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT)
}

#[test]
fn test_typical_words() {
    assert_eq!(type_vn("chuyeenr"), "chuyển");
    assert_eq!(type_vn("ddoongf"), "đồng");
    assert_eq!(type_vn("uwowng"), "ương");
    assert_eq!(type_vn("hoas"), "hóa");
    assert_eq!(type_vn("tooss"), "too");
    assert_eq!(type_vn("Vieetj Nam"), "Việt Nam");
}

#[test]
fn test_old_tone_style() {
    let mut e = telex_engine(EngineFlags::AUTO_CORRECT);
    e.process_string("hoas", Mode::VIETNAMESE);
    assert_eq!(e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT), "hoá");
}

#[test]
fn test_uppercase_preserved() {
    assert_eq!(type_vn("Chuyeenr"), "Chuyển");
}

#[test]
fn test_empty_composition_is_valid() {
    let e = telex_engine(EngineFlags::standard());
    assert!(e.is_valid(false));
    assert_eq!(e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT), "");
}

#[test]
fn test_english_mode_lowercase_identity() {
    // gõ toàn chế độ English: chuỗi ra đúng từng phím đã hạ chữ thường
    let mut e = telex_engine(EngineFlags::standard());
    let input = "ddoongf chis";
    e.process_string(input, Mode::ENGLISH);
    assert_eq!(e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT), input);
}

#[test]
fn test_backspace_round_trip() {
    // xoá rồi gõ lại ký tự cuối: tổ hợp render về đúng trạng thái cũ
    for word in ["chuyeen", "ddoong", "uwowng", "tieen"] {
        let mut e = telex_engine(EngineFlags::standard());
        e.process_string(word, Mode::VIETNAMESE);
        let before = e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT);
        let raw_before = e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT);

        let last = word.chars().last().unwrap();
        e.remove_last_char(true);
        e.process_key(last, Mode::VIETNAMESE);

        assert_eq!(
            e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT),
            before,
            "hỏng với {}",
            word
        );
        assert_eq!(
            e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT),
            raw_before
        );
    }
}

#[test]
fn test_restore_round_trip() {
    for word in ["chuyeenr", "vieetj", "uwowng", "toossf"] {
        let mut e = telex_engine(EngineFlags::standard());
        e.process_string(word, Mode::VIETNAMESE);
        e.restore_last_word();
        assert_eq!(
            e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT),
            word,
            "hỏng với {}",
            word
        );
    }
}

#[test]
fn test_backspace_across_restored_word() {
    let mut e = telex_engine(EngineFlags::standard());
    e.process_string("chuyeenr", Mode::VIETNAMESE);
    e.restore_last_word();
    e.remove_last_char(true);
    assert_eq!(
        e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT),
        "chuyeen"
    );
}

#[test]
fn test_surrounding_text_ingest() {
    let mut e = telex_engine(EngineFlags::standard());
    e.process_surrounding_text("bộ gõ");
    assert_eq!(e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT), "bộ gõ");
    // xoá lùi từng ký tự thật trên màn hình
    e.remove_last_char(false);
    e.remove_last_char(false);
    assert_eq!(e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT), "bộ ");
}

#[test]
fn test_word_break_never_carries_marks() {
    let mut e = telex_engine(EngineFlags::standard());
    e.process_string("an2 ddi", Mode::VIETNAMESE);
    assert_eq!(
        e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT),
        "an2 đi"
    );
}

#[test]
fn test_fallback_pipeline() {
    let policy = FallbackPolicy::default();

    // từ hợp lệ thì không bị trả về
    let mut e = telex_engine(EngineFlags::standard());
    e.process_string("vowis", Mode::VIETNAMESE);
    assert_eq!(e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT), "với");
    assert!(!must_restore_word(&e, &policy));

    // từ hỏng thì trả về đúng chuỗi phím gốc
    let mut e = telex_engine(EngineFlags::standard());
    e.process_string("awk", Mode::VIETNAMESE);
    assert!(must_restore_word(&e, &policy));
    e.restore_last_word();
    assert_eq!(e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT), "awk");
}

#[test]
fn test_convert_full_pipeline() {
    assert_eq!(
        convert("towi yeeu tieengs vieetj"),
        "tơi yêu tiếng việt"
    );
    assert_eq!(convert("hello ddoongf chis"), "hello đồng chí");
}

#[test]
fn test_reset_clears_state() {
    let mut e = telex_engine(EngineFlags::standard());
    e.process_string("ddoongf", Mode::VIETNAMESE);
    e.reset();
    assert_eq!(e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT), "");
    e.process_string("as", Mode::VIETNAMESE);
    assert_eq!(e.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT), "á");
}
