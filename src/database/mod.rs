// 数据库模块
// 实体定义与存储库实现

pub mod entities;
pub mod repositories;
