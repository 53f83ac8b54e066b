//! 检测模块：证据产出、收集与置信度裁决
pub mod global;
pub mod analyzer;
pub mod evidence;
pub mod collector;
pub mod resolver;

// 导出核心接口
pub use self::global::{global_catalog, init_global_catalog, init_global_catalog_with};
pub use self::analyzer::{DocumentAnalyzer, ProbeAnalyzer, RenderAnalyzer};
pub use self::evidence::{Channel, Evidence, Tier};
pub use self::collector::{EvidenceCollector, EvidenceSnapshot};
pub use self::resolver::{ConfidenceResolver, FrameworkVerdict, Verdict};
