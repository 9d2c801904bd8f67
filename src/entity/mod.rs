//! Entity module - SeaORM 实体定义
//!
//! 包含所有数据库表对应的实体模型

pub mod organization;
pub mod user_organization;
pub mod user_organization_change_log;
