use serde::{Deserialize, Serialize};

/// 解析与输出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conf {
    /// 是否识别双对话（角色名结尾的 ^）
    pub use_dual_dialogue: bool,
    /// 重新输出时是否隐藏场景编号
    pub suppress_scene_numbers: bool,
    /// 每处理多少行/段落检查一次取消并尝试汇报进度
    pub progress_batch_size: usize,
    /// 两次进度回调之间的最小间隔（毫秒）
    pub progress_min_interval_ms: u64,
}

impl Default for Conf {
    fn default() -> Self {
        Conf {
            use_dual_dialogue: true,
            suppress_scene_numbers: false,
            progress_batch_size: 100,
            progress_min_interval_ms: 10,
        }
    }
}

impl Conf {
    /// 从 JSON 读取配置，缺省字段使用默认值
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
