use thiserror::Error;

use super::Step;
use crate::amount::AmountError;
use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("金额配置非法: {0}")]
    Amount(#[from] AmountError),
    #[error("步骤「{step}」失败: {source}")]
    Step {
        step: Step,
        #[source]
        source: LedgerError,
    },
}

impl WorkflowError {
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::Step { step, .. } => Some(*step),
            Self::Amount(_) => None,
        }
    }

    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            Self::Step { source, .. } => Some(source),
            Self::Amount(_) => None,
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// 为账本调用结果标注所属步骤。
pub(crate) trait AtStep<T> {
    fn at(self, step: Step) -> WorkflowResult<T>;
}

impl<T> AtStep<T> for Result<T, LedgerError> {
    fn at(self, step: Step) -> WorkflowResult<T> {
        self.map_err(|source| WorkflowError::Step { step, source })
    }
}
