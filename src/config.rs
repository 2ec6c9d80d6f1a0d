//! Đọc/ghi cấu hình (JSON)

use crate::core::engine::EngineFlags;
use crate::core::rules::InputMethodDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Cấu hình vikey
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VikeyConfig {
    /// Tên kiểu gõ: "Telex", "VNI" hoặc một kiểu tự định nghĩa
    #[serde(default = "default_input_method")]
    pub input_method: String,
    /// Đặt thanh kiểu chuẩn (hóa) thay vì kiểu mới (hoá)
    #[serde(default = "default_true")]
    pub std_tone_style: bool,
    /// Bật các phép nắn tự động (tắt uow)
    #[serde(default = "default_true")]
    pub auto_correct: bool,
    /// Tự trả từ không phải tiếng Việt về chuỗi phím gốc
    #[serde(default = "default_true")]
    pub auto_restore_non_vietnamese: bool,
    /// Giữ nguyên từ kết thúc bằng d hoặc chứa đ khi xét trả về
    #[serde(default)]
    pub dd_free_style: bool,
    /// Kiểu gõ tự định nghĩa: tên -> bảng phím -> nhãn
    #[serde(default)]
    pub custom_methods: BTreeMap<String, InputMethodDefinition>,
}

fn default_input_method() -> String {
    "Telex".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for VikeyConfig {
    fn default() -> Self {
        Self {
            input_method: default_input_method(),
            std_tone_style: true,
            auto_correct: true,
            auto_restore_non_vietnamese: true,
            dd_free_style: false,
            custom_methods: BTreeMap::new(),
        }
    }
}

impl VikeyConfig {
    /// Cờ engine tương ứng với cấu hình.
    pub fn engine_flags(&self) -> EngineFlags {
        let mut flags = EngineFlags::empty();
        if self.std_tone_style {
            flags |= EngineFlags::STD_TONE_STYLE;
        }
        if self.auto_correct {
            flags |= EngineFlags::AUTO_CORRECT;
        }
        flags
    }
}

/// Đường dẫn file cấu hình: `$XDG_CONFIG_HOME/vikey/config.json`,
/// không có thì `~/.config/vikey/config.json`.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from("/var/tmp"));
    base.join("vikey").join("config.json")
}

/// Đọc cấu hình (file hỏng hoặc chưa có thì dùng mặc định).
pub fn load_config() -> VikeyConfig {
    let path = config_path();
    match fs::read_to_string(&path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("cấu hình {} không đọc được: {}", path.display(), e);
            VikeyConfig::default()
        }),
        Err(_) => VikeyConfig::default(),
    }
}

/// Ghi cấu hình.
pub fn save_config(config: &VikeyConfig) -> Result<(), String> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("không tạo được thư mục cấu hình: {}", e))?;
    }
    let json = serde_json::to_string_pretty(config).map_err(|e| format!("không mã hoá được: {}", e))?;
    fs::write(&path, json).map_err(|e| format!("không ghi được file cấu hình: {}", e))?;
    Ok(())
}
