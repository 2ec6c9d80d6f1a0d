//! Chọn nguyên âm mang dấu thanh trong âm tiết
//!
//! Khi âm tiết dài ra hoặc ngắn lại, nguyên âm mang thanh có thể phải
//! đổi: `chuyr` đặt thanh hỏi lên u (`chủy`), gõ tiếp thành `chuyeenr`
//! thì thanh phải dời sang ê (`chuyển`). Engine gọi lại bộ chọn này sau
//! mỗi lần tổ hợp thay đổi.

use crate::core::chars::{apply_mark, is_vowel, mark_of, strip_mark, to_lower};
use crate::core::composition::Composition;
use crate::core::rules::RuleKind;

/// Dựng lại dãy `(chỉ số phép Append, ký tự)` của âm tiết từ `from`
/// đến cuối tổ hợp: đã áp dấu phụ còn sống, bỏ thanh, chữ thường.
pub(crate) fn marked_letters(composition: &Composition, from: usize) -> Vec<(usize, char)> {
    let mut letters: Vec<(usize, char)> = Vec::new();
    for (offset, t) in composition.items()[from..].iter().enumerate() {
        let index = from + offset;
        match &t.rule.kind {
            RuleKind::Append => letters.push((index, to_lower(t.rule.key))),
            RuleKind::Mark { mark, .. } => {
                if let Some(target) = t.target {
                    if let Some(l) = letters.iter_mut().find(|l| l.0 == target) {
                        l.1 = apply_mark(l.1, *mark);
                    }
                }
            }
            RuleKind::RemoveMark => {
                if let Some(target) = t.target {
                    if let Some(l) = letters.iter_mut().find(|l| l.0 == target) {
                        l.1 = strip_mark(l.1);
                    }
                }
            }
            _ => {}
        }
    }
    letters
}

/// Chỉ số phép Append của nguyên âm phải mang dấu thanh trong âm tiết
/// bắt đầu từ `from`, hoặc `None` nếu âm tiết không có nguyên âm.
///
/// Quy tắc, theo thứ tự:
/// 1. Có nguyên âm mang dấu phụ (ă â ê ô ơ ư): lấy nguyên âm mang dấu
///    bên phải nhất (`người`, `nước`).
/// 2. Cụm >= 2 nguyên âm có phụ âm theo sau: lấy nguyên âm cuối cụm
///    (`hoàng`, `toán`).
/// 3. Cụm >= 2 nguyên âm cuối âm tiết: kiểu chuẩn lấy nguyên âm áp
///    chót (`hóa`, `tùy`, `khuỷu`); kiểu mới dời sang nguyên âm cuối
///    với các cụm oa/oe/uy (`hoá`, `tuỳ`).
/// 4. Còn lại: nguyên âm duy nhất.
///
/// `u` sau `q` và `i` của `gi` thuộc phụ âm đầu, không tính vào cụm
/// nguyên âm (`quý`, `giá`).
pub fn find_tone_target(composition: &Composition, from: usize, std_style: bool) -> Option<usize> {
    let letters = marked_letters(composition, from);

    // cụm nguyên âm liền nhau bên phải nhất
    let mut end = letters.len();
    while end > 0 && !is_vowel(letters[end - 1].1) {
        end -= 1;
    }
    if end == 0 {
        return None;
    }
    let mut start = end;
    while start > 0 && is_vowel(letters[start - 1].1) {
        start -= 1;
    }
    let has_coda = end < letters.len();
    let mut cluster: Vec<(usize, char)> = letters[start..end].to_vec();

    // quý: u dính vào q; giá: i dính vào g khi còn nguyên âm khác
    if start > 0 {
        let before = letters[start - 1].1;
        if before == 'q' && cluster.first().map(|l| l.1) == Some('u') {
            cluster.remove(0);
        } else if before == 'g' && cluster.first().map(|l| l.1) == Some('i') && cluster.len() > 1
        {
            cluster.remove(0);
        }
    }
    if cluster.is_empty() {
        return None;
    }

    if let Some(l) = cluster.iter().rev().find(|l| mark_of(l.1).is_some()) {
        return Some(l.0);
    }
    if cluster.len() >= 2 && has_coda {
        return cluster.last().map(|l| l.0);
    }
    if cluster.len() >= 2 {
        if !std_style && cluster.len() == 2 {
            let pair: String = cluster.iter().map(|l| l.1).collect();
            if matches!(pair.as_str(), "oa" | "oe" | "uy") {
                return cluster.last().map(|l| l.0);
            }
        }
        return Some(cluster[cluster.len() - 2].0);
    }
    cluster.first().map(|l| l.0)
}
