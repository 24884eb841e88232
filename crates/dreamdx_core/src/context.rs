//! Per-request context threaded through the service.

use crate::DreamCommand;
use derive_getters::Getters;
use uuid::Uuid;

/// Identity of one request.
///
/// Created at the edge for each incoming call and passed explicitly down the
/// call chain; nothing about a dream is held in process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct RequestContext {
    /// Unique id used to correlate log lines
    request_id: Uuid,
    /// User the request acts for
    user_id: Option<String>,
    /// Session the request targets
    session_id: Option<String>,
}

impl RequestContext {
    /// Context with a fresh request id and no identity.
    pub fn anonymous() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: None,
            session_id: None,
        }
    }

    /// Context for the given command.
    pub fn for_command(command: &DreamCommand) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: command.user_id().map(String::from),
            session_id: command.key().map(|k| k.session_id.clone()),
        }
    }
}
