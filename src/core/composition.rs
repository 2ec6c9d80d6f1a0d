//! Tổ hợp đang gõ: chuỗi các phép biến đổi và thuật toán trải phẳng
//!
//! Mỗi phím gõ sinh ra một (hoặc vài) [`Transformation`] nối vào cuối
//! tổ hợp. Phép Append thêm ký tự; phép dấu phụ/dấu thanh trỏ ngược về
//! một phép Append đứng trước qua chỉ số trong cùng mảng (không dùng
//! con trỏ, `reset` chỉ là xoá mảng). Trải phẳng tổ hợp theo một chế độ
//! render cho ra đúng chuỗi cần hiển thị.

use crate::core::chars::{
    apply_mark, apply_tone, is_word_break, to_upper, MarkKind, ToneKind,
};
use crate::core::rules::{Rule, RuleKind, VIRTUAL_KEY};
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Chế độ xử lý phím và render chuỗi.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode: u8 {
        /// Áp dụng đầy đủ dấu phụ lẫn dấu thanh
        const VIETNAMESE = 1 << 0;
        /// Bỏ qua mọi luật, trả về đúng chuỗi phím gốc
        const ENGLISH = 1 << 1;
        /// Chỉ áp dụng dấu phụ, bỏ dấu thanh
        const TONE_LESS = 1 << 2;
        /// Chỉ áp dụng dấu thanh trên chữ cái gốc, bỏ dấu phụ
        const MARK_LESS = 1 << 3;
        /// Ép toàn bộ về chữ thường
        const LOWER_CASE = 1 << 4;
        /// Render cả tổ hợp thay vì chỉ từ cuối
        const FULL_TEXT = 1 << 5;
        /// Bên nhận đọc chuỗi từ phải sang trái
        const IN_REVERSE_ORDER = 1 << 6;
    }
}

/// Một phép biến đổi trong tổ hợp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub rule: Rule,
    /// Chỉ số của phép Append mà phép này tác động (luôn nhỏ hơn chỉ số
    /// của chính nó); Append không có target
    pub target: Option<usize>,
    /// Phím gốc được gõ hoa
    pub is_upper: bool,
}

impl Transformation {
    /// Phép thêm ký tự thường từ một phím gõ.
    pub fn appending(lower_key: char, is_upper: bool) -> Self {
        Transformation {
            rule: Rule::appending(lower_key),
            target: None,
            is_upper,
        }
    }

    pub fn is_appending(&self) -> bool {
        matches!(self.rule.kind, RuleKind::Append)
    }
}

/// Một dấu phụ đã đặt lên một ký tự, cùng trạng thái hoàn tác của nó.
struct MarkEntry {
    mark: MarkKind,
    key: char,
    is_upper: bool,
    canceled: bool,
}

/// Một ô ký tự trên "canvas" khi trải phẳng.
struct Slot {
    base: char,
    is_upper: bool,
    /// Chỉ số âm tiết, để mỗi âm tiết chỉ giữ đúng một dấu thanh
    segment: usize,
    marks: Vec<MarkEntry>,
}

/// Tổ hợp đang gõ của một engine. Sở hữu độc quyền; kiểu gõ mới là thứ
/// được chia sẻ giữa các engine.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    items: Vec<Transformation>,
}

impl Composition {
    pub fn new() -> Self {
        Composition { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Transformation] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, t: Transformation) {
        self.items.push(t);
    }

    pub fn pop(&mut self) -> Option<Transformation> {
        self.items.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// Bỏ một phép Append cùng mọi phép trỏ vào nó. Chỉ dùng với phép
    /// Append cuối: các phép đứng lại đều trỏ về chỉ số nhỏ hơn nên
    /// target không cần đánh lại.
    pub fn remove_target_group(&mut self, append: usize) {
        let mut index = 0;
        self.items.retain(|t| {
            let keep = index != append && t.target != Some(append);
            index += 1;
            keep
        });
    }

    /// Chèn một phép vào đầu tổ hợp (nhập ngược văn bản quanh con trỏ).
    /// Mọi target hiện có dịch lên 1.
    pub fn push_front(&mut self, t: Transformation) {
        for item in &mut self.items {
            if let Some(target) = item.target.as_mut() {
                *target += 1;
            }
        }
        self.items.insert(0, t);
    }

    /// Chỉ số của phép Append cuối cùng.
    pub fn last_appending(&self) -> Option<usize> {
        self.items.iter().rposition(Transformation::is_appending)
    }

    /// Điểm bắt đầu của từ cuối: sau phép Append ngắt từ gần nhất.
    /// Một ký tự nối từ nếu là chữ cái hoặc là phím hiệu lực của kiểu gõ
    /// (VNI dùng chữ số làm phím bổ trợ).
    pub fn last_word_start(&self, effective_keys: &[char]) -> usize {
        for (i, t) in self.items.iter().enumerate().rev() {
            if t.is_appending()
                && is_word_break(t.rule.key)
                && !effective_keys.contains(&t.rule.key)
            {
                return i + 1;
            }
        }
        0
    }

    /// Tách các phép của từ cuối thành chuỗi Append phím gốc, dùng khi
    /// trả lại đúng những gì người dùng đã gõ. Phím ảo không có mặt
    /// trong chuỗi gốc nên bị bỏ qua.
    pub fn break_into_keystrokes(&self, from: usize) -> Vec<Transformation> {
        self.items[from..]
            .iter()
            .filter(|t| !t.rule.is_virtual())
            .map(|t| Transformation::appending(t.rule.key, t.is_upper))
            .collect()
    }

    /// Trải phẳng cả tổ hợp.
    pub fn flatten(&self, mode: Mode) -> String {
        self.flatten_from(0, mode)
    }

    /// Trải phẳng các phép từ chỉ số `from` đến cuối.
    ///
    /// Chế độ tiếng Việt: mỗi Append mở một ô ký tự; dấu phụ biến đổi ô
    /// đích; dấu phụ bị hoàn tác hiện lại phím của nó thành ký tự
    /// thường ngay sau ô đích; trong mỗi âm tiết chỉ dấu thanh sống
    /// cuối cùng được áp dụng.
    pub fn flatten_from(&self, from: usize, mode: Mode) -> String {
        if mode.contains(Mode::ENGLISH) {
            return self.flatten_english(from, mode);
        }

        let with_marks = !mode.contains(Mode::MARK_LESS);
        let with_tones = !mode.contains(Mode::TONE_LESS);

        let mut slots: Vec<Slot> = Vec::new();
        let mut slot_of: HashMap<usize, usize> = HashMap::new();
        let mut segment = 0usize;
        // dấu thanh sống của từng âm tiết: (ô đích, thanh, phím hoa)
        let mut segment_tone: HashMap<usize, Option<(usize, ToneKind, bool)>> = HashMap::new();

        for (offset, t) in self.items[from..].iter().enumerate() {
            let index = from + offset;
            match &t.rule.kind {
                RuleKind::Append => {
                    let ch = t.rule.key;
                    if is_word_break(ch) {
                        segment += 1;
                    }
                    slots.push(Slot {
                        base: ch,
                        is_upper: t.is_upper,
                        segment,
                        marks: Vec::new(),
                    });
                    slot_of.insert(index, slots.len() - 1);
                }
                RuleKind::Mark { mark, .. } => {
                    if !with_marks {
                        continue;
                    }
                    if let Some(&s) = t.target.as_ref().and_then(|i| slot_of.get(i)) {
                        slots[s].marks.push(MarkEntry {
                            mark: *mark,
                            key: t.rule.key,
                            is_upper: t.is_upper,
                            canceled: false,
                        });
                    }
                }
                RuleKind::RemoveMark => {
                    if !with_marks {
                        continue;
                    }
                    if let Some(&s) = t.target.as_ref().and_then(|i| slot_of.get(i)) {
                        for entry in &mut slots[s].marks {
                            entry.canceled = true;
                        }
                    }
                }
                RuleKind::Tone(tone) => {
                    if !with_tones {
                        continue;
                    }
                    if let Some(&s) = t.target.as_ref().and_then(|i| slot_of.get(i)) {
                        segment_tone
                            .insert(slots[s].segment, Some((s, *tone, t.is_upper)));
                    }
                }
                RuleKind::RemoveTone => {
                    if !with_tones {
                        continue;
                    }
                    if let Some(&s) = t.target.as_ref().and_then(|i| slot_of.get(i)) {
                        segment_tone.insert(slots[s].segment, None);
                    }
                }
            }
        }

        // thanh của mỗi âm tiết đặt sau cùng, lên ký tự đã mang dấu phụ
        let mut slot_tone: HashMap<usize, (ToneKind, bool)> = HashMap::new();
        for entry in segment_tone.into_values().flatten() {
            let (s, tone, upper) = entry;
            slot_tone.insert(s, (tone, upper));
        }

        let lower_only = mode.contains(Mode::LOWER_CASE);
        let mut out = String::with_capacity(slots.len());
        for (s, slot) in slots.iter().enumerate() {
            let mut ch = slot.base;
            let mut upper = slot.is_upper;
            for entry in slot.marks.iter().filter(|m| !m.canceled) {
                ch = apply_mark(ch, entry.mark);
                upper |= entry.is_upper;
            }
            if let Some(&(tone, tone_upper)) = slot_tone.get(&s) {
                ch = apply_tone(ch, tone);
                upper |= tone_upper;
            }
            out.push(render_case(ch, upper, lower_only));
            // dấu phụ bị hoàn tác: phím hiện lại thành ký tự thường
            for entry in slot.marks.iter().filter(|m| m.canceled) {
                if entry.key != VIRTUAL_KEY {
                    out.push(render_case(entry.key, entry.is_upper, lower_only));
                }
            }
        }

        if mode.contains(Mode::IN_REVERSE_ORDER) {
            out = out.chars().rev().collect();
        }
        out
    }

    /// Chế độ English: đúng chuỗi phím đã gõ, phím ảo không hiện.
    fn flatten_english(&self, from: usize, mode: Mode) -> String {
        let lower_only = mode.contains(Mode::LOWER_CASE);
        let mut out = String::new();
        for t in &self.items[from..] {
            if t.rule.key != VIRTUAL_KEY {
                out.push(render_case(t.rule.key, t.is_upper, lower_only));
            }
        }
        if mode.contains(Mode::IN_REVERSE_ORDER) {
            out = out.chars().rev().collect();
        }
        out
    }
}

fn render_case(ch: char, is_upper: bool, lower_only: bool) -> char {
    if is_upper && !lower_only {
        to_upper(ch)
    } else {
        ch
    }
}
