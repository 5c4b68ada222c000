use serde::{Deserialize, Serialize};

/// 用户偏好设置（持久化为 settings 表中的一行 JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub dark_theme: bool,
    #[serde(default)]
    pub realtime_analysis: bool,
    #[serde(default = "default_true")]
    pub notifications: bool,
}

fn default_true() -> bool { true }

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            dark_theme: false,
            realtime_analysis: false,
            notifications: true,
        }
    }
}
