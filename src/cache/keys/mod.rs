/// 缓存键模块
/// 提供各种缓存键生成函数

// 章节缓存键模块
pub mod chapter_keys;

pub use chapter_keys::{
    CHAPTER_KEY_PATTERN, chapter_detail_key, chapter_list_key, upload_echo_key,
};
