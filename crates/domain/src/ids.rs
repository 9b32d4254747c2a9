//! 实体标识符生成

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// 生成全局唯一的实体 ID
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// 基于 UUID v4 的生成器
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// 顺序生成 `prefix-1`、`prefix-2` ... 的确定性生成器，测试时使用
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_are_unique() {
        let generator = UuidIdGenerator;
        let ids: HashSet<String> = (0..1000).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| Uuid::parse_str(id).is_ok()));
    }

    #[test]
    fn sequential_ids_follow_prefix() {
        let generator = SequentialIdGenerator::new("user");
        assert_eq!(generator.generate(), "user-1");
        assert_eq!(generator.generate(), "user-2");
    }
}
