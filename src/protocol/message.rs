//! Request and Response messages

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::state::{DocumentStore, StateCache, StateSnapshot};

/// Request from an editing screen
///
/// # Example
/// ```json
/// {"type":"GET_STATE","id":"1"}
/// {"type":"SET_STATE","id":"2","state":{"cues":[],"variables":[]}}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "GET_STATE")]
    GetState {
        /// Correlation id echoed in the response
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    #[serde(rename = "SET_STATE")]
    SetState {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        state: StateSnapshot,
    },
}

impl Request {
    pub fn id(&self) -> Option<&str> {
        match self {
            Request::GetState { id } | Request::SetState { id, .. } => id.as_deref(),
        }
    }
}

/// Response to an editing screen
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    #[serde(rename = "STATE")]
    State {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        state: StateSnapshot,
    },

    #[serde(rename = "ERROR")]
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        message: String,
    },
}

impl Response {
    pub fn error(id: Option<String>, message: impl Into<String>) -> Self {
        Response::Error {
            id,
            message: message.into(),
        }
    }
}

/// Answer a request against the persisted document
///
/// `SET_STATE` also installs the stored snapshot in `cache`, so this context
/// doesn't wait for its own change notification.
pub fn handle_request<S: DocumentStore>(cache: &StateCache<S>, request: Request) -> Response {
    match request {
        Request::GetState { id } => match cache.store().get() {
            Ok(state) => Response::State {
                id,
                state: state.unwrap_or_default(),
            },
            Err(e) => {
                warn!(error = %e, severity = ?e.severity(), "GET_STATE failed");
                Response::error(id, e.user_message())
            }
        },
        Request::SetState { id, state } => match cache.write(state) {
            Ok(current) => {
                info!(
                    cues = current.snapshot.cues.len(),
                    variables = current.snapshot.variables.len(),
                    "SET_STATE applied"
                );
                Response::State {
                    id,
                    state: current.snapshot.clone(),
                }
            }
            Err(e) => {
                warn!(error = %e, severity = ?e.severity(), "SET_STATE failed");
                Response::error(id, e.user_message())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Cue, MemoryStore};

    #[test]
    fn test_request_wire_format() {
        let json = serde_json::to_string(&Request::GetState { id: None }).unwrap();
        assert_eq!(json, r#"{"type":"GET_STATE"}"#);

        let request: Request =
            serde_json::from_str(r#"{"type":"SET_STATE","id":"7","state":{}}"#).unwrap();
        assert_eq!(request.id(), Some("7"));
        assert!(matches!(request, Request::SetState { .. }));
    }

    #[test]
    fn test_get_state_on_empty_store_returns_defaults() {
        let cache = StateCache::new(MemoryStore::new());
        let response = handle_request(&cache, Request::GetState { id: Some("a".into()) });
        assert_eq!(
            response,
            Response::State {
                id: Some("a".into()),
                state: StateSnapshot::default()
            }
        );
    }

    #[test]
    fn test_set_state_persists_and_updates_cache() {
        let store = MemoryStore::new();
        let cache = StateCache::new(store.clone());
        let state = StateSnapshot {
            cues: vec![Cue::new("1", ":sig", "Regards")],
            ..Default::default()
        };

        let response = handle_request(&cache, Request::SetState { id: None, state });

        let Response::State { state: stored, .. } = response else {
            panic!("expected STATE response");
        };
        assert!(stored.meta.updated_at > 0);
        assert_eq!(store.get().unwrap(), Some(stored));
        assert!(cache.current().index.lookup(":sig").is_some());
    }
}
