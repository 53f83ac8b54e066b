//! 单目标证据收集器
//! 只追加、线程安全，两个通道都可写入；不去重

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::evidence::Evidence;

/// 证据快照：框架名 -> 证据列表
pub type EvidenceSnapshot = BTreeMap<String, Vec<Evidence>>;

#[derive(Debug, Default)]
pub struct EvidenceCollector {
    inner: Mutex<EvidenceSnapshot>,
}

impl EvidenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, evidence: Evidence) {
        self.lock()
            .entry(evidence.framework().to_string())
            .or_default()
            .push(evidence);
    }

    pub fn extend<I: IntoIterator<Item = Evidence>>(&self, evidence: I) {
        let mut guard = self.lock();
        for item in evidence {
            guard.entry(item.framework().to_string()).or_default().push(item);
        }
    }

    pub fn snapshot(&self) -> EvidenceSnapshot {
        self.lock().clone()
    }

    /// 证据总条数
    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // 写入方 panic 不影响已收集的证据
    fn lock(&self) -> MutexGuard<'_, EvidenceSnapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
