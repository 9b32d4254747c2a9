//! 用户实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::StoredRecord;
use crate::schema::RegisterUserRequest;

/// 用户实体
///
/// 邮箱唯一性只在应用层通过写入前的查询保证，不是事务约束。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// 用户唯一ID
    pub id: String,
    /// 邮箱（二级索引）
    #[validate(email, custom(function = "crate::schema::email_with_tld"))]
    pub email: String,
    /// 显示名称
    #[validate(length(min = 2, max = 30))]
    pub name: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn register(id: String, request: RegisterUserRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: request.email,
            name: request.name,
            created_at: now,
        }
    }
}

impl StoredRecord for User {
    const ENTITY: &'static str = "user";
}
