//! 通用类型定义

use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户 ID
///
/// 用户由外部认证服务管理，这里只引用其标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[display("{_0}")]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

/// 审计信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditInfo {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for AuditInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// 分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl Pagination {
    /// 单页最大条数
    pub const MAX_LIMIT: u32 = 100;

    /// 规范化分页参数: page 至少为 1, limit 落在 [1, MAX_LIMIT]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// 以 u64 计算，任意 page 都不会溢出
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// 分页元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl PageInfo {
    pub fn new(pagination: &Pagination, total: u64) -> Self {
        let total_pages = if pagination.limit == 0 {
            0
        } else {
            total.div_ceil(pagination.limit as u64) as u32
        };
        Self {
            page: pagination.page,
            limit: pagination.limit,
            total,
            total_pages,
        }
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        Self {
            items,
            pagination: PageInfo::new(pagination, total),
        }
    }

    pub fn total_pages(&self) -> u32 {
        self.pagination.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normalizes_input() {
        let p = Pagination::new(0, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 1);

        let p = Pagination::new(3, 500);
        assert_eq!(p.limit, Pagination::MAX_LIMIT);
        assert_eq!(p.offset(), 200);
    }

    #[test]
    fn test_offset_for_huge_page() {
        let p = Pagination::new(50_000_000, 100);
        assert_eq!(p.offset(), 4_999_999_900);

        let p = Pagination::new(u32::MAX, Pagination::MAX_LIMIT);
        assert_eq!(p.offset(), (u64::from(u32::MAX) - 1) * 100);
    }

    #[test]
    fn test_page_info_total_pages() {
        let p = Pagination::new(1, 10);
        assert_eq!(PageInfo::new(&p, 0).total_pages, 0);
        assert_eq!(PageInfo::new(&p, 10).total_pages, 1);
        assert_eq!(PageInfo::new(&p, 11).total_pages, 2);
    }

    #[test]
    fn test_page_info_serializes_camel_case() {
        let info = PageInfo::new(&Pagination::new(2, 5), 12);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["page"], 2);
    }

    #[test]
    fn test_user_id_parse() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }
}
