//! Engine xử lý phím: nhận từng phím gõ, quyết định thêm ký tự, đặt
//! dấu hay hoàn tác dấu, và giữ tổ hợp luôn nhất quán
//!
//! Mọi thao tác chạy đồng bộ và không bao giờ trả lỗi: phím không xử lý
//! được trở thành ký tự thường. Engine sở hữu tổ hợp của riêng nó; kiểu
//! gõ bất biến và chia sẻ được giữa nhiều engine.

use crate::core::chars::{is_punctuation, strip_mark, strip_tone, to_lower, MarkKind, ToneKind};
use crate::core::composition::{Composition, Mode, Transformation};
use crate::core::rules::{InputMethod, Rule, RuleKind, VIRTUAL_KEY};
use crate::core::syllable::is_valid_syllable;
use crate::core::tone::{find_tone_target, marked_letters};
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Tuỳ chọn của engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EngineFlags: u8 {
        /// Đặt thanh kiểu chuẩn (hóa, tùy); tắt đi thì dùng kiểu mới
        /// (hoá, tuỳ)
        const STD_TONE_STYLE = 1 << 0;
        /// Bật các phép nắn tự động nhiều luật (tắt uow)
        const AUTO_CORRECT = 1 << 1;
    }
}

impl EngineFlags {
    /// Bộ cờ mặc định.
    pub fn standard() -> Self {
        EngineFlags::STD_TONE_STYLE | EngineFlags::AUTO_CORRECT
    }
}

/// Engine gõ tiếng Việt. Một thể hiện phục vụ một luồng nhập; bên gọi
/// tự xếp hàng các lời gọi nếu dùng từ nhiều luồng.
pub struct Engine {
    input_method: Arc<InputMethod>,
    composition: Composition,
    flags: EngineFlags,
}

impl Engine {
    pub fn new(input_method: Arc<InputMethod>, flags: EngineFlags) -> Self {
        Engine {
            input_method,
            composition: Composition::new(),
            flags,
        }
    }

    pub fn input_method(&self) -> &InputMethod {
        &self.input_method
    }

    pub fn flags(&self) -> EngineFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: EngineFlags) {
        self.flags = flags;
    }

    /// Engine có xử lý được phím này không (thuần tuý, không đổi trạng
    /// thái).
    pub fn can_process_key(&self, key: char) -> bool {
        self.input_method.is_effective_key(to_lower(key))
    }

    /// Từ cuối có phải âm tiết tiếng Việt hợp lệ không. `strict` đòi âm
    /// tiết trọn vẹn, ngược lại chấp nhận tiền tố gõ dở.
    pub fn is_valid(&self, strict: bool) -> bool {
        let start = self.last_word_start();
        let toneless = self
            .composition
            .flatten_from(start, Mode::TONE_LESS | Mode::LOWER_CASE);
        is_valid_syllable(&toneless, strict)
    }

    /// Chuỗi hiển thị theo chế độ render; không có [`Mode::FULL_TEXT`]
    /// thì chỉ render từ cuối.
    pub fn processed_string(&self, mode: Mode) -> String {
        if mode.contains(Mode::FULL_TEXT) {
            self.composition.flatten(mode)
        } else {
            self.composition.flatten_from(self.last_word_start(), mode)
        }
    }

    /// Xử lý lần lượt từng ký tự của một chuỗi.
    pub fn process_string(&mut self, s: &str, mode: Mode) {
        for key in s.chars() {
            self.process_key(key, mode);
        }
    }

    /// Xử lý một phím gõ. Thao tác trung tâm của engine.
    pub fn process_key(&mut self, key: char, mode: Mode) {
        let lower = to_lower(key);
        let is_upper = key.is_uppercase();

        // chế độ English hoặc phím ngoài kiểu gõ: chỉ thêm ký tự
        if mode.contains(Mode::ENGLISH) || !self.can_process_key(lower) {
            let t = Transformation::appending(lower, is_upper);
            if mode.contains(Mode::IN_REVERSE_ORDER) {
                self.composition.push_front(t);
            } else {
                self.composition.push(t);
            }
            return;
        }

        // phím chỉ tác động lên âm tiết cuối
        let syllable = self.last_syllable_start();

        if !self.try_undo_double_mark(syllable, lower, is_upper)
            && !self.try_apply_rules(syllable, lower, is_upper)
        {
            // không luật nào áp dụng được: phím trở thành ký tự thường
            self.composition
                .push(Transformation::appending(lower, is_upper));
            if self.flags.contains(EngineFlags::AUTO_CORRECT) {
                self.apply_uow_shortcut(syllable);
            }
        }

        // âm tiết đổi hình thì thanh có thể phải dời chỗ
        self.refresh_last_tone(syllable);
    }

    /// Xoá ký tự hiển thị cuối cùng: bỏ phép Append cuối và mọi phép
    /// trỏ vào nó (xoá `ế` của `tiến` phải bỏ cả dấu mũ lẫn dấu sắc).
    pub fn remove_last_char(&mut self, refresh_tone: bool) {
        let Some(last_append) = self.composition.last_appending() else {
            return;
        };
        let key = self.composition.items()[last_append].rule.key;
        if !self.can_process_key(key) {
            // ký tự ngắt từ không bao giờ bị phép khác trỏ tới
            self.composition.pop();
            return;
        }
        self.composition.remove_target_group(last_append);
        if refresh_tone {
            let syllable = self.last_syllable_start();
            self.refresh_last_tone(syllable);
        }
    }

    /// Thay từ cuối bằng đúng chuỗi phím người dùng đã gõ. Dùng khi một
    /// từ bị bộ gõ sửa nhưng hoá ra không phải tiếng Việt.
    pub fn restore_last_word(&mut self) {
        let start = self.last_word_start();
        if start >= self.composition.len() {
            return;
        }
        let raw = self.composition.break_into_keystrokes(start);
        self.composition.truncate(start);
        for t in raw {
            self.composition.push(t);
        }
    }

    /// Xoá sạch tổ hợp.
    pub fn reset(&mut self) {
        self.composition.clear();
    }

    /// Dựng lại tổ hợp từ văn bản đứng trước con trỏ trong ứng dụng,
    /// đọc từ phải sang trái, để backspace thao tác đúng trên những gì
    /// đã hiển thị. Văn bản coi như đã chốt nên chỉ nhập ở chế độ
    /// English; dấu câu nằm trong kiểu gõ được thay bằng khoảng trắng
    /// để không nối nhầm âm tiết.
    pub fn process_surrounding_text(&mut self, text: &str) {
        self.reset();
        for ch in text.chars().rev() {
            let ch = if is_punctuation(ch) && self.can_process_key(ch) {
                ' '
            } else {
                ch
            };
            self.process_key(ch, Mode::ENGLISH | Mode::IN_REVERSE_ORDER);
        }
    }

    /// Truy cập tổ hợp (chủ yếu cho kiểm thử và host).
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    fn std_style(&self) -> bool {
        self.flags.contains(EngineFlags::STD_TONE_STYLE)
    }

    fn last_word_start(&self) -> usize {
        self.composition.last_word_start(&self.input_method.keys)
    }

    /// Âm tiết cuối trùng với từ cuối: ranh giới đều là ký tự ngắt từ
    /// ngoài tập phím hiệu lực.
    fn last_syllable_start(&self) -> usize {
        self.last_word_start()
    }

    /// Gõ lặp một phím dấu phụ ngay sau dấu nó vừa đặt thì hoàn tác
    /// dấu: `aaa` ra `aa`, `uww` ra `uw`, `ddd` ra `dd`.
    fn try_undo_double_mark(&mut self, syllable: usize, lower: char, is_upper: bool) -> bool {
        let items = self.composition.items();
        if items.len() <= syllable {
            return false;
        }
        let Some(last) = items.last() else {
            return false;
        };
        if last.rule.key != lower || !matches!(last.rule.kind, RuleKind::Mark { .. }) {
            return false;
        }
        let target = last.target;
        self.composition.push(Transformation {
            rule: Rule {
                key: lower,
                kind: RuleKind::RemoveMark,
            },
            target,
            is_upper,
        });
        true
    }

    /// Thử từng luật của phím trên âm tiết cuối. Trả về `false` nếu
    /// không luật nào có chỗ áp dụng.
    fn try_apply_rules(&mut self, syllable: usize, lower: char, is_upper: bool) -> bool {
        let rules: Vec<Rule> = self.input_method.rules_for(lower).cloned().collect();

        for rule in &rules {
            match rule.kind {
                RuleKind::Tone(tone) => {
                    if let Some((active, target, _)) = self.active_tone(syllable) {
                        if active == tone {
                            // phím thanh lặp trên âm tiết đã mang đúng
                            // thanh đó: gỡ thanh, trả âm tiết về chữ gốc
                            self.toggle_tone_off(syllable, lower, is_upper, target);
                            return true;
                        }
                    }
                    if let Some(target) =
                        find_tone_target(&self.composition, syllable, self.std_style())
                    {
                        self.composition.push(Transformation {
                            rule: Rule {
                                key: lower,
                                kind: RuleKind::Tone(tone),
                            },
                            target: Some(target),
                            is_upper,
                        });
                        return true;
                    }
                }
                RuleKind::RemoveTone => {
                    if let Some((_, target, _)) = self.active_tone(syllable) {
                        self.composition.push(Transformation {
                            rule: Rule {
                                key: lower,
                                kind: RuleKind::RemoveTone,
                            },
                            target: Some(target),
                            is_upper,
                        });
                        return true;
                    }
                }
                _ => {}
            }
        }

        // dấu phụ: quét phép Append từ phải sang, phép nào khớp luật
        // nào trước thì đặt dấu ở đó ("uo" + w ra "uơ" chứ không "ưo")
        let mark_rules: Vec<(char, char, MarkKind)> = rules
            .iter()
            .filter_map(|r| match r.kind {
                RuleKind::Mark { from, to, mark } => Some((from, to, mark)),
                _ => None,
            })
            .collect();
        if mark_rules.is_empty() {
            return false;
        }
        for index in (syllable..self.composition.len()).rev() {
            let t = &self.composition.items()[index];
            if !t.is_appending() {
                continue;
            }
            let base = strip_mark(strip_tone(to_lower(t.rule.key)));
            for &(from, to, mark) in &mark_rules {
                if base == from && !self.has_active_mark(syllable, index, mark) {
                    self.composition.push(Transformation {
                        rule: Rule {
                            key: lower,
                            kind: RuleKind::Mark { from, to, mark },
                        },
                        target: Some(index),
                        is_upper,
                    });
                    return true;
                }
            }
        }
        false
    }

    /// Thanh đang sống của âm tiết: (thanh, phép Append đích, phím hoa).
    fn active_tone(&self, syllable: usize) -> Option<(ToneKind, usize, bool)> {
        let mut active = None;
        for t in &self.composition.items()[syllable..] {
            match t.rule.kind {
                RuleKind::Tone(tone) => {
                    if let Some(target) = t.target {
                        active = Some((tone, target, t.is_upper));
                    }
                }
                RuleKind::RemoveTone => active = None,
                _ => {}
            }
        }
        active
    }

    /// Phép Append này có đang mang dấu phụ loại `mark` không.
    fn has_active_mark(&self, syllable: usize, append: usize, mark: MarkKind) -> bool {
        let mut active = false;
        for t in &self.composition.items()[syllable..] {
            if t.target != Some(append) {
                continue;
            }
            match t.rule.kind {
                RuleKind::Mark { mark: m, .. } if m == mark => active = true,
                RuleKind::RemoveMark => active = false,
                _ => {}
            }
        }
        active
    }

    /// Gỡ thanh khi phím thanh gõ lặp: thanh mất và các dấu phụ trong
    /// âm tiết cũng trả về chữ gốc (`tooss` ra `too`).
    fn toggle_tone_off(&mut self, syllable: usize, lower: char, is_upper: bool, target: usize) {
        self.composition.push(Transformation {
            rule: Rule {
                key: lower,
                kind: RuleKind::RemoveTone,
            },
            target: Some(target),
            is_upper,
        });
        let appends: Vec<usize> = (syllable..self.composition.len())
            .filter(|&i| self.composition.items()[i].is_appending())
            .collect();
        for append in appends {
            if self.has_any_active_mark(syllable, append) {
                self.composition.push(Transformation {
                    rule: Rule {
                        key: VIRTUAL_KEY,
                        kind: RuleKind::RemoveMark,
                    },
                    target: Some(append),
                    is_upper: false,
                });
            }
        }
    }

    fn has_any_active_mark(&self, syllable: usize, append: usize) -> bool {
        let mut active = false;
        for t in &self.composition.items()[syllable..] {
            if t.target != Some(append) {
                continue;
            }
            match t.rule.kind {
                RuleKind::Mark { .. } => active = true,
                RuleKind::RemoveMark => active = false,
                _ => {}
            }
        }
        active
    }

    /// Tắt `uow`: sau một phím rơi về thêm ký tự, nếu âm tiết kết thúc
    /// bằng `u` + `ơ`(+ đuôi chữ cái) thì tự đặt dấu móc lên `u` bằng
    /// một luật ảo, cho phép gõ `uong` + `w` giữa chừng thành `ương`.
    fn apply_uow_shortcut(&mut self, syllable: usize) {
        if !self.input_method.has_super_key() {
            return;
        }
        let letters = marked_letters(&self.composition, syllable);
        let mut i = letters.len();
        while i > 0 && letters[i - 1].1 != 'ơ' && letters[i - 1].1.is_alphabetic() {
            i -= 1;
        }
        let mut saw_horn = false;
        while i > 0 && letters[i - 1].1 == 'ơ' {
            saw_horn = true;
            i -= 1;
        }
        if !saw_horn || i == 0 || letters[i - 1].1 != 'u' {
            return;
        }
        self.composition.push(Transformation {
            rule: Rule {
                key: VIRTUAL_KEY,
                kind: RuleKind::Mark {
                    from: 'u',
                    to: 'ư',
                    mark: MarkKind::Horn,
                },
            },
            target: Some(letters[i - 1].0),
            is_upper: false,
        });
    }

    /// Nắn lại vị trí thanh sau khi âm tiết thay đổi. Chỉ nắn khi âm
    /// tiết còn là tiền tố tiếng Việt hợp lệ; thanh cũ để nguyên, phép
    /// thanh ảo mới đè lên khi render.
    fn refresh_last_tone(&mut self, syllable: usize) {
        let Some((tone, current, is_upper)) = self.active_tone(syllable) else {
            return;
        };
        let toneless = self
            .composition
            .flatten_from(syllable, Mode::TONE_LESS | Mode::LOWER_CASE);
        if !is_valid_syllable(&toneless, false) {
            return;
        }
        let Some(desired) = find_tone_target(&self.composition, syllable, self.std_style())
        else {
            return;
        };
        if desired != current {
            self.composition.push(Transformation {
                rule: Rule {
                    key: VIRTUAL_KEY,
                    kind: RuleKind::Tone(tone),
                },
                target: Some(desired),
                is_upper,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{parse_input_method, telex_definition, vni_definition};

    fn telex() -> Engine {
        let im = parse_input_method("Telex", &telex_definition()).unwrap();
        Engine::new(Arc::new(im), EngineFlags::standard())
    }

    fn vn(engine: &Engine) -> String {
        engine.processed_string(Mode::VIETNAMESE | Mode::FULL_TEXT)
    }

    fn typed(s: &str) -> String {
        let mut e = telex();
        e.process_string(s, Mode::VIETNAMESE);
        vn(&e)
    }

    #[test]
    fn test_basic_words() {
        assert_eq!(typed("chuyeenr"), "chuyển");
        assert_eq!(typed("ddoongf"), "đồng");
        assert_eq!(typed("uwowng"), "ương");
        assert_eq!(typed("vieetj"), "việt");
        assert_eq!(typed("nguyeenx"), "nguyễn");
    }

    #[test]
    fn test_tone_style_flag() {
        assert_eq!(typed("hoas"), "hóa");
        let im = parse_input_method("Telex", &telex_definition()).unwrap();
        let mut e = Engine::new(Arc::new(im), EngineFlags::AUTO_CORRECT);
        e.process_string("hoas", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "hoá");
    }

    #[test]
    fn test_tone_toggle_restores_raw_letters() {
        assert_eq!(typed("toos"), "tố");
        assert_eq!(typed("tooss"), "too");
    }

    #[test]
    fn test_remove_tone_key() {
        // z chỉ xoá thanh, giữ dấu phụ
        assert_eq!(typed("toosz"), "tô");
        // không có thanh thì z thành ký tự thường
        assert_eq!(typed("toz"), "toz");
    }

    #[test]
    fn test_tone_replacement() {
        assert_eq!(typed("tosf"), "tò");
        assert_eq!(typed("chuyrx"), "chũy");
    }

    #[test]
    fn test_double_mark_undo() {
        assert_eq!(typed("aaa"), "aa");
        assert_eq!(typed("ddd"), "dd");
        assert_eq!(typed("uww"), "uw");
        assert_eq!(typed("ooo"), "oo");
    }

    #[test]
    fn test_uow_shortcut() {
        // dấu móc chỉ hiện khi có ký tự theo sau
        assert_eq!(typed("uow"), "uơ");
        assert_eq!(typed("uown"), "ươn");
        assert_eq!(typed("thuowng"), "thương");
        assert_eq!(typed("ruowuj"), "rượu");
        assert_eq!(typed("tuowi"), "tươi");
    }

    #[test]
    fn test_uow_shortcut_needs_auto_correct() {
        let im = parse_input_method("Telex", &telex_definition()).unwrap();
        let mut e = Engine::new(Arc::new(im), EngineFlags::STD_TONE_STYLE);
        e.process_string("uown", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "uơn");
    }

    #[test]
    fn test_tone_reanchors_as_syllable_grows() {
        // thanh hỏi dời từ u sang ê khi âm tiết dài ra
        let mut e = telex();
        e.process_string("chuyr", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "chủy");
        e.process_string("een", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "chuyển");
    }

    #[test]
    fn test_uppercase() {
        assert_eq!(typed("Chuyeenr"), "Chuyển");
        assert_eq!(typed("DDoongf"), "Đồng");
        assert_eq!(typed("VIEETJ"), "VIỆT");
    }

    #[test]
    fn test_word_break_resets_extraction() {
        assert_eq!(typed("Vieetj Nam"), "Việt Nam");
        let mut e = telex();
        e.process_string("anh ", Mode::VIETNAMESE);
        e.process_string("emr", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "anh ẻm");
    }

    #[test]
    fn test_english_mode_is_literal() {
        let mut e = telex();
        e.process_string("ddoongf", Mode::ENGLISH);
        assert_eq!(
            e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT),
            "ddoongf"
        );
        assert_eq!(vn(&e), "ddoongf");
    }

    #[test]
    fn test_raw_string_round_trip() {
        let mut e = telex();
        e.process_string("chuyeenr", Mode::VIETNAMESE);
        assert_eq!(
            e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT),
            "chuyeenr"
        );
        e.restore_last_word();
        assert_eq!(vn(&e), "chuyeenr");
        assert_eq!(
            e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT),
            "chuyeenr"
        );
    }

    #[test]
    fn test_restore_preserves_case() {
        let mut e = telex();
        e.process_string("Chuyeenr", Mode::VIETNAMESE);
        e.restore_last_word();
        assert_eq!(vn(&e), "Chuyeenr");
    }

    #[test]
    fn test_backspace_removes_effects_together() {
        let mut e = telex();
        e.process_string("tieens", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "tiến");
        e.remove_last_char(true);
        assert_eq!(vn(&e), "tiế");
        e.remove_last_char(true);
        // mất ê thì mất cả mũ lẫn sắc
        assert_eq!(vn(&e), "ti");
    }

    #[test]
    fn test_backspace_round_trip() {
        let mut e = telex();
        e.process_string("chuyeenr", Mode::VIETNAMESE);
        let before = vn(&e);
        e.process_key('g', Mode::VIETNAMESE);
        e.remove_last_char(true);
        assert_eq!(vn(&e), before);
    }

    #[test]
    fn test_backspace_refreshes_tone() {
        // "toán" bỏ n: thanh dời từ a về áp chót -> "toá"? kiểu chuẩn
        // đặt lại trên o
        let mut e = telex();
        e.process_string("toans", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "toán");
        e.remove_last_char(true);
        assert_eq!(vn(&e), "tóa");
    }

    #[test]
    fn test_backspace_on_word_break() {
        let mut e = telex();
        e.process_string("an ", Mode::VIETNAMESE);
        e.remove_last_char(true);
        assert_eq!(vn(&e), "an");
    }

    #[test]
    fn test_is_valid() {
        let mut e = telex();
        e.process_string("vieetj", Mode::VIETNAMESE);
        assert!(e.is_valid(true));
        assert!(e.is_valid(false));

        let mut e = telex();
        e.process_string("vw", Mode::VIETNAMESE);
        assert!(!e.is_valid(false));

        // vần uyê chưa có phụ âm cuối: mới là tiền tố
        let mut e = telex();
        e.process_string("chuyee", Mode::VIETNAMESE);
        assert!(e.is_valid(false));
        assert!(!e.is_valid(true));
    }

    #[test]
    fn test_is_valid_empty() {
        let e = telex();
        assert!(e.is_valid(false));
        assert!(e.is_valid(true));
    }

    #[test]
    fn test_can_process_key() {
        let e = telex();
        assert!(e.can_process_key('a'));
        assert!(e.can_process_key('W'));
        assert!(!e.can_process_key(' '));
        assert!(!e.can_process_key('1'));
        assert!(!e.can_process_key('đ'));
    }

    #[test]
    fn test_reset() {
        let mut e = telex();
        e.process_string("vieetj", Mode::VIETNAMESE);
        e.reset();
        assert_eq!(vn(&e), "");
        assert!(e.composition().is_empty());
    }

    #[test]
    fn test_process_surrounding_text() {
        let mut e = telex();
        e.process_surrounding_text("xin chào");
        assert_eq!(
            e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT),
            "xin chào"
        );
        // backspace thao tác trên đúng ký tự cuối
        e.remove_last_char(false);
        assert_eq!(
            e.processed_string(Mode::ENGLISH | Mode::FULL_TEXT),
            "xin chà"
        );
    }

    #[test]
    fn test_vni() {
        let im = parse_input_method("VNI", &vni_definition()).unwrap();
        let mut e = Engine::new(Arc::new(im), EngineFlags::standard());
        e.process_string("dd", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "dd"); // VNI không dùng dd
        e.reset();
        e.process_string("d9o6ng2", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "đồng");
        e.reset();
        e.process_string("tuo7i", Mode::VIETNAMESE);
        assert_eq!(vn(&e), "tươi");
    }

    #[test]
    fn test_deterministic() {
        let a = typed("nghieeng");
        let b = typed("nghieeng");
        assert_eq!(a, b);
        assert_eq!(a, "nghiêng");
    }
}
