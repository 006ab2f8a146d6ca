use super::Task;

/// Runs every task inline on the submitting thread.
///
/// Errors and panics reach the caller untouched; there is no worker boundary
/// to isolate them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateExecutor;

impl ImmediateExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn post(&self, task: Task) -> anyhow::Result<()> {
        task()
    }
}
