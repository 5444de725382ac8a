use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Host-provided facts about the current invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub aws_request_id: String,
    pub log_stream_name: Option<String>,
    pub deadline: Option<SystemTime>,
}

impl InvocationContext {
    pub fn with_deadline(mut self, deadline: SystemTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_log_stream_name(mut self, log_stream_name: impl Into<String>) -> Self {
        self.log_stream_name = Some(log_stream_name.into());
        self
    }

    /// `None` when the host did not report a deadline.
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline.map(|deadline| {
            deadline
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        })
    }

    pub fn deadline_passed(&self) -> bool {
        self.remaining_time() == Some(Duration::ZERO)
    }
}

impl From<&lambda_runtime::Context> for InvocationContext {
    fn from(context: &lambda_runtime::Context) -> Self {
        let log_stream = context.env_config.log_stream.trim();
        Self {
            aws_request_id: context.request_id.clone(),
            log_stream_name: (!log_stream.is_empty()).then(|| log_stream.to_string()),
            deadline: (context.deadline > 0)
                .then(|| UNIX_EPOCH + Duration::from_millis(context.deadline)),
        }
    }
}
