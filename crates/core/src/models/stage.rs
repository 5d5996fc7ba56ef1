use std::fmt;

use crate::errors::{ExportError, ExportResult};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    SourceLoad,
    Extraction,
    Packaging,
    Validation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SourceLoad => "source-load",
            Stage::Extraction => "extraction",
            Stage::Packaging => "packaging",
            Stage::Validation => "validation",
        };
        write!(f, "{name}")
    }
}

/// 流水线运行状态机
///
/// 状态只能沿固定顺序向前推进：
/// `Init -> DbReady -> DataLoaded -> Extracted -> Packaged -> Validated`
///
/// 任意阶段出错会直接进入终态`Failed`，携带出错阶段和底层错误信息。
/// `Validated`与`Failed`为终态，不接受任何后续迁移。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Init,
    DbReady,
    DataLoaded,
    Extracted,
    Packaged,
    Validated,
    Failed { stage: Stage, message: String },
}

impl RunState {
    fn ordinal(&self) -> Option<u8> {
        match self {
            RunState::Init => Some(0),
            RunState::DbReady => Some(1),
            RunState::DataLoaded => Some(2),
            RunState::Extracted => Some(3),
            RunState::Packaged => Some(4),
            RunState::Validated => Some(5),
            RunState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Validated | RunState::Failed { .. })
    }

    /// 推进到紧邻的下一个状态；任何其他迁移均为非法
    pub fn advance(&self, next: RunState) -> ExportResult<RunState> {
        match (self.ordinal(), next.ordinal()) {
            (Some(from), Some(to)) if to == from + 1 => Ok(next),
            _ => Err(ExportError::InvalidTransition {
                from: format!("{self:?}"),
                to: format!("{next:?}"),
            }),
        }
    }

    /// 从任意非终态进入失败终态
    pub fn fail(&self, stage: Stage, message: impl Into<String>) -> ExportResult<RunState> {
        if self.is_terminal() {
            return Err(ExportError::InvalidTransition {
                from: format!("{self:?}"),
                to: "Failed".to_string(),
            });
        }
        Ok(RunState::Failed {
            stage,
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_in_order() {
        let state = RunState::Init;
        let state = state.advance(RunState::DbReady).unwrap();
        let state = state.advance(RunState::DataLoaded).unwrap();
        let state = state.advance(RunState::Extracted).unwrap();
        let state = state.advance(RunState::Packaged).unwrap();
        let state = state.advance(RunState::Validated).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let state = RunState::Init;
        assert!(state.advance(RunState::DataLoaded).is_err());
        assert!(state.advance(RunState::Validated).is_err());
    }

    #[test]
    fn test_backward_transition_is_rejected() {
        let state = RunState::Extracted;
        assert!(state.advance(RunState::DataLoaded).is_err());
        assert!(state.advance(RunState::Extracted).is_err());
    }

    #[test]
    fn test_failure_is_terminal() {
        let state = RunState::DataLoaded;
        let failed = state.fail(Stage::Extraction, "job flow died").unwrap();
        assert!(failed.is_terminal());
        assert!(failed.advance(RunState::Extracted).is_err());
        assert!(failed.fail(Stage::Validation, "again").is_err());
    }

    #[test]
    fn test_validated_accepts_no_further_transition() {
        let state = RunState::Validated;
        assert!(state.advance(RunState::Validated).is_err());
        assert!(state.fail(Stage::Validation, "late").is_err());
    }
}
