//! 编译模块：将原始指纹表编译为可执行的匹配规则
pub mod pattern;
pub mod compiler;

pub use self::pattern::{
    FlatRule, GatedRule, Matcher, Rule, RuleSet, ScriptKey, Signal, SignalCatalog, SignalHit,
};
pub use self::compiler::CatalogCompiler;
