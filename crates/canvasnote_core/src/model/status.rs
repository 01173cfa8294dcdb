//! Task lifecycle states shown by status content.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    #[default]
    Todo,
    InProgress,
    Done,
    /// No longer actionable.
    Cancelled,
}

impl TaskStatus {
    /// Stable display string, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Next state when the chip is clicked.
    pub fn cycle(self) -> Self {
        match self {
            Self::Todo => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done | Self::Cancelled => Self::Todo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TaskStatus;

    #[test]
    fn cycle_wraps_back_to_todo() {
        assert_eq!(TaskStatus::Todo.cycle(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::Done.cycle(), TaskStatus::Todo);
        assert_eq!(TaskStatus::Cancelled.cycle(), TaskStatus::Todo);
    }
}
