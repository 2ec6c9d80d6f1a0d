//! Kiểm tra âm tiết tiếng Việt: (phụ âm đầu)? + vần + (phụ âm cuối)?
//!
//! Đầu vào là âm tiết đã bỏ dấu thanh, giữ dấu phụ, chữ thường, đúng
//! dạng `flatten(TONE_LESS | LOWER_CASE)` của tổ hợp. Các bảng là hằng
//! độc lập với kiểu gõ.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Ràng buộc phụ âm cuối của một vần.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodaRule {
    /// Không bao giờ có phụ âm cuối (ai, ươi, ...)
    Open,
    /// Bắt buộc có phụ âm cuối (iê, ươ, ă, ...)
    Closed,
    /// Tuỳ ý (a, oa, uy, ...)
    Free,
}

lazy_static! {
    /// Phụ âm đầu hợp lệ.
    static ref ONSETS: Vec<&'static str> = vec![
        "b", "c", "ch", "d", "đ", "g", "gh", "gi", "h", "k", "kh", "l", "m", "n", "ng",
        "ngh", "nh", "p", "ph", "qu", "r", "s", "t", "th", "tr", "v", "x",
    ];

    /// Vần hợp lệ cùng ràng buộc phụ âm cuối của từng vần.
    static ref NUCLEI: HashMap<&'static str, CodaRule> = {
        use CodaRule::*;
        let mut m = HashMap::new();
        for (seq, rule) in [
            // nguyên âm đơn
            ("a", Free), ("ă", Closed), ("â", Closed), ("e", Free), ("ê", Free),
            ("i", Free), ("o", Free), ("ô", Free), ("ơ", Free), ("u", Free),
            ("ư", Free), ("y", Free),
            // nguyên âm đôi
            ("ai", Open), ("ao", Open), ("au", Open), ("ay", Open),
            ("âu", Open), ("ây", Open), ("eo", Open), ("êu", Open),
            ("ia", Open), ("iê", Closed), ("iu", Open),
            ("oa", Free), ("oă", Closed), ("oe", Free), ("oi", Open),
            ("oo", Closed), ("ôi", Open), ("ơi", Open),
            ("ua", Open), ("uâ", Closed), ("uê", Free), ("ui", Open),
            ("uô", Closed), ("uơ", Open), ("uy", Free),
            ("ưa", Open), ("ưi", Open), ("ươ", Closed), ("ưu", Open),
            ("yê", Closed),
            // nguyên âm ba
            ("iêu", Open), ("oai", Open), ("oao", Open), ("oay", Open), ("oeo", Open),
            ("uây", Open), ("uôi", Open), ("uya", Open), ("uyê", Closed), ("uyu", Open),
            ("ươi", Open), ("ươu", Open), ("yêu", Open),
        ] {
            m.insert(seq, rule);
        }
        m
    };

    /// Phụ âm cuối hợp lệ.
    static ref CODAS: Vec<&'static str> = vec!["c", "ch", "m", "n", "ng", "nh", "p", "t"];
}

fn starts_with(chars: &[char], prefix: &str) -> bool {
    let p: Vec<char> = prefix.chars().collect();
    chars.len() >= p.len() && chars[..p.len()] == p[..]
}

fn to_string(chars: &[char]) -> String {
    chars.iter().collect()
}

/// Âm tiết có hợp lệ không. `strict` đòi hỏi một âm tiết trọn vẹn;
/// ngược lại chấp nhận mọi tiền tố còn có thể gõ tiếp thành âm tiết
/// hợp lệ. Chuỗi rỗng hợp lệ và render thành chuỗi rỗng.
pub fn is_valid_syllable(syllable: &str, strict: bool) -> bool {
    let chars: Vec<char> = syllable.chars().collect();
    if chars.is_empty() {
        return true;
    }

    // "q" chưa đủ phụ âm đầu nhưng vẫn gõ tiếp được thành "qu"
    if !strict && syllable == "q" {
        return true;
    }

    // thử mọi cách tách phụ âm đầu, dài trước ngắn sau; lùi lại khi
    // phần còn lại không ra vần ("gìn" tách g + in chứ không phải gi + n)
    let mut onset_splits: Vec<usize> = vec![0];
    for onset in ONSETS.iter() {
        if starts_with(&chars, onset) {
            onset_splits.push(onset.chars().count());
        }
    }
    onset_splits.sort_unstable_by(|a, b| b.cmp(a));

    for &onset_len in &onset_splits {
        let rest = &chars[onset_len..];
        if rest.is_empty() {
            if !strict && onset_len > 0 {
                return true;
            }
            continue;
        }
        if parse_rhyme(rest, strict) {
            return true;
        }
    }
    false
}

/// Phần sau phụ âm đầu: vần + (phụ âm cuối)?.
fn parse_rhyme(rest: &[char], strict: bool) -> bool {
    let max = rest.len().min(3);
    for nucleus_len in (1..=max).rev() {
        let nucleus = to_string(&rest[..nucleus_len]);
        let Some(&rule) = NUCLEI.get(nucleus.as_str()) else {
            continue;
        };
        let coda = &rest[nucleus_len..];
        if coda.is_empty() {
            // thiếu phụ âm cuối: chưa trọn vẹn với vần Closed, nhưng
            // vẫn là tiền tố gõ tiếp được
            if !strict || rule != CodaRule::Closed {
                return true;
            }
            continue;
        }
        if rule == CodaRule::Open {
            continue;
        }
        if CODAS.contains(&to_string(coda).as_str()) {
            return true;
        }
    }
    false
}
