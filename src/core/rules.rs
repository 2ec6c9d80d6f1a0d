//! Mô hình luật gõ: dịch bảng định nghĩa kiểu gõ (Telex, VNI, ...) thành
//! tập luật mà engine diễn giải
//!
//! Bảng định nghĩa ánh xạ mỗi phím bổ trợ sang một nhãn: tên dấu thanh
//! (`DauSac`, `DauHuyen`, ...), `XoaDauThanh`, hoặc một nhóm nguyên âm
//! dạng `A_Â` / `UOA_ƯƠĂ`. Nhãn sai làm hỏng cả kiểu gõ nên được báo lỗi
//! ngay lúc phân tích; sau đó engine không bao giờ trả lỗi nữa.

use crate::core::chars::{mark_of, strip_mark, to_lower, MarkKind, ToneKind};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Phím ảo: luật được engine tự sinh (ví dụ tắt `uow`), không xuất hiện
/// trong chuỗi phím gốc.
pub const VIRTUAL_KEY: char = '\0';

/// Bảng định nghĩa một kiểu gõ: phím -> nhãn.
pub type InputMethodDefinition = BTreeMap<char, String>;

/// Lỗi định nghĩa kiểu gõ. Đây là loại lỗi duy nhất của toàn bộ engine,
/// phát hiện lúc phân tích bảng định nghĩa.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("phím '{key}': nhãn không hợp lệ: {tag}")]
    UnknownTag { key: char, tag: String },
    #[error("phím '{key}': nhóm nguyên âm không hợp lệ: {tag}")]
    BadVowelGroup { key: char, tag: String },
}

/// Tác dụng của một luật.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Thêm ký tự vào cuối tổ hợp
    Append,
    /// Đặt dấu phụ lên một ký tự đã gõ: `from` -> `to`
    Mark {
        from: char,
        to: char,
        mark: MarkKind,
    },
    /// Đặt dấu thanh lên âm tiết hiện tại
    Tone(ToneKind),
    /// Xoá dấu thanh đang có
    RemoveTone,
    /// Hoàn tác dấu phụ: dấu bị huỷ và phím sinh ra nó hiện lại thành
    /// ký tự thường (gõ `aaa` ra `aa`)
    RemoveMark,
}

/// Một luật gõ cụ thể, đã khai triển từ bảng định nghĩa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Phím kích hoạt (chữ thường), hoặc [`VIRTUAL_KEY`]
    pub key: char,
    pub kind: RuleKind,
}

impl Rule {
    pub fn appending(key: char) -> Self {
        Rule {
            key,
            kind: RuleKind::Append,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.key == VIRTUAL_KEY
    }
}

/// Một kiểu gõ hoàn chỉnh: tập luật cùng các phân loại phím mà engine
/// cần khi tách từ và xử lý tắt.
#[derive(Debug, Clone)]
pub struct InputMethod {
    pub name: String,
    /// Luật đã khai triển, theo thứ tự khai triển của từng nhãn
    pub rules: Vec<Rule>,
    /// Mọi phím engine xử lý được: bảng chữ cái ASCII + phím bổ trợ
    pub keys: Vec<char>,
    /// Phím chỉ thêm ký tự (không có luật bổ trợ nào)
    pub appending_keys: Vec<char>,
    /// Phím dấu thanh
    pub tone_keys: Vec<char>,
    /// Phím "siêu": mang luật móc cho cả u lẫn o, dùng cho tắt `uow`
    pub super_keys: Vec<char>,
}

impl InputMethod {
    /// Các luật kích hoạt bởi một phím (chữ thường).
    pub fn rules_for(&self, lower_key: char) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.key == lower_key)
    }

    pub fn is_effective_key(&self, lower_key: char) -> bool {
        self.keys.contains(&lower_key)
    }

    pub fn has_super_key(&self) -> bool {
        !self.super_keys.is_empty()
    }
}

fn parse_tag(key: char, tag: &str) -> Result<Vec<Rule>, DefinitionError> {
    let tone = match tag {
        "DauSac" => Some(ToneKind::Acute),
        "DauHuyen" => Some(ToneKind::Grave),
        "DauHoi" => Some(ToneKind::HookAbove),
        "DauNga" => Some(ToneKind::Tilde),
        "DauNang" => Some(ToneKind::UnderDot),
        _ => None,
    };
    if let Some(tone) = tone {
        return Ok(vec![Rule {
            key,
            kind: RuleKind::Tone(tone),
        }]);
    }
    if tag == "XoaDauThanh" {
        return Ok(vec![Rule {
            key,
            kind: RuleKind::RemoveTone,
        }]);
    }

    // Nhóm nguyên âm "UOA_ƯƠĂ": vế trái và vế phải ghép cặp theo vị trí.
    let Some((left, right)) = tag.split_once('_') else {
        return Err(DefinitionError::UnknownTag {
            key,
            tag: tag.to_string(),
        });
    };
    let from: Vec<char> = left.chars().map(to_lower).collect();
    let to: Vec<char> = right.chars().map(to_lower).collect();
    if from.is_empty() || from.len() != to.len() {
        return Err(DefinitionError::BadVowelGroup {
            key,
            tag: tag.to_string(),
        });
    }
    let mut rules = Vec::with_capacity(from.len());
    for (&f, &t) in from.iter().zip(&to) {
        let mark = match mark_of(t) {
            Some(mark) if strip_mark(t) == f => mark,
            _ => {
                return Err(DefinitionError::BadVowelGroup {
                    key,
                    tag: tag.to_string(),
                })
            }
        };
        rules.push(Rule {
            key,
            kind: RuleKind::Mark { from: f, to: t, mark },
        });
    }
    Ok(rules)
}

/// Phân tích bảng định nghĩa thành một [`InputMethod`]. Thuần tuý: cùng
/// một bảng luôn cho cùng một kết quả.
pub fn parse_input_method(
    name: &str,
    definition: &InputMethodDefinition,
) -> Result<InputMethod, DefinitionError> {
    let mut rules = Vec::new();
    for (&key, tag) in definition {
        rules.extend(parse_tag(to_lower(key), tag)?);
    }

    let rule_keys: Vec<char> = {
        let mut ks: Vec<char> = rules.iter().map(|r| r.key).collect();
        ks.sort_unstable();
        ks.dedup();
        ks
    };
    let appending_keys: Vec<char> = ('a'..='z').filter(|c| !rule_keys.contains(c)).collect();
    let mut keys: Vec<char> = ('a'..='z').collect();
    for &k in &rule_keys {
        if !keys.contains(&k) {
            keys.push(k);
        }
    }
    let tone_keys: Vec<char> = rules
        .iter()
        .filter(|r| matches!(r.kind, RuleKind::Tone(_)))
        .map(|r| r.key)
        .collect();
    let super_keys: Vec<char> = rule_keys
        .iter()
        .copied()
        .filter(|&k| {
            let horns = rules
                .iter()
                .filter(|r| {
                    r.key == k
                        && matches!(
                            r.kind,
                            RuleKind::Mark {
                                mark: MarkKind::Horn,
                                ..
                            }
                        )
                })
                .count();
            horns >= 2
        })
        .collect();

    Ok(InputMethod {
        name: name.to_string(),
        rules,
        keys,
        appending_keys,
        tone_keys,
        super_keys,
    })
}

/// Bảng định nghĩa Telex chuẩn.
pub fn telex_definition() -> InputMethodDefinition {
    BTreeMap::from([
        ('z', "XoaDauThanh".to_string()),
        ('s', "DauSac".to_string()),
        ('f', "DauHuyen".to_string()),
        ('r', "DauHoi".to_string()),
        ('x', "DauNga".to_string()),
        ('j', "DauNang".to_string()),
        ('a', "A_Â".to_string()),
        ('e', "E_Ê".to_string()),
        ('o', "O_Ô".to_string()),
        ('w', "UOA_ƯƠĂ".to_string()),
        ('d', "D_Đ".to_string()),
    ])
}

/// Bảng định nghĩa VNI (phím bổ trợ là chữ số).
pub fn vni_definition() -> InputMethodDefinition {
    BTreeMap::from([
        ('1', "DauSac".to_string()),
        ('2', "DauHuyen".to_string()),
        ('3', "DauHoi".to_string()),
        ('4', "DauNga".to_string()),
        ('5', "DauNang".to_string()),
        ('6', "AEO_ÂÊÔ".to_string()),
        ('7', "UO_ƯƠ".to_string()),
        ('8', "A_Ă".to_string()),
        ('9', "D_Đ".to_string()),
        ('0', "XoaDauThanh".to_string()),
    ])
}

static BUILTIN_DEFINITIONS: LazyLock<BTreeMap<String, InputMethodDefinition>> =
    LazyLock::new(|| {
        BTreeMap::from([
            ("Telex".to_string(), telex_definition()),
            ("VNI".to_string(), vni_definition()),
        ])
    });

/// Các kiểu gõ có sẵn (bản sao, người gọi có thể sửa tuỳ ý).
pub fn builtin_definitions() -> BTreeMap<String, InputMethodDefinition> {
    BUILTIN_DEFINITIONS.clone()
}
