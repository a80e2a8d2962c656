// 缓存模块
// 共享存储抽象与旁路缓存操作

pub mod keys;
pub mod operations;
pub mod store;

// 重新导出常用类型和函数，方便其他模块使用
pub use operations::read_through;
pub use store::{MemoryStore, RedisStore, SharedStore};
