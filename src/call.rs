/// Call data handed over by the telephony platform for one inbound call.
#[derive(Debug, Default, Clone)]
pub struct CallContext {
    pub caller_id: String,     // Raw CLI as presented by the trunk
    pub called_number: String, // DID that was dialed
    pub is_inbound: bool,
}

impl CallContext {
    pub fn inbound(caller_id: impl Into<String>, called_number: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
            called_number: called_number.into(),
            is_inbound: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CallControlError {
    #[error("Call could not be terminated: {0}")]
    TerminateFailed(String),
}

/// Effects the screener may perform on the call it is screening.
///
/// Implemented by the host platform. The screener never talks to the
/// telephony layer directly.
pub trait CallControl: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
    fn terminate(&self) -> Result<(), CallControlError>;
}

/// Platform stand-in that only writes to the process log.
///
/// Used by the CLI; terminating just records that a hangup was requested.
#[derive(Debug, Default)]
pub struct LoggingCall {
    terminated: std::sync::atomic::AtomicBool,
}

impl LoggingCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn was_terminated(&self) -> bool {
        self.terminated.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl CallControl for LoggingCall {
    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn error(&self, message: &str) {
        log::error!("{message}");
    }

    fn terminate(&self) -> Result<(), CallControlError> {
        log::info!("Terminating call");
        self.terminated
            .store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
