//! Messaging between the component and its host: the outgoing
//! configuration-request capability, cross-context messages, and the
//! broadcast channel the host uses to clear the selected stage.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::interaction::ConfigPatch;
use crate::ir::QueryFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisualizationType {
    SankeyChart,
}

/// Cross-context message, encoded as `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisMessage {
    #[serde(rename = "CUSTOM_VIS_HANDSHAKE")]
    Handshake(VisualizationType),
    HideDetailPanel,
    SetStage(String),
    ClearSelectedStage,
}

impl VisMessage {
    pub fn handshake() -> Self {
        Self::Handshake(VisualizationType::SankeyChart)
    }

    /// Decodes an incoming message; anything unrecognized is `None`.
    pub fn parse(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Host capability for requesting configuration changes. Requests are fire
/// and forget; the host re-renders with the patched configuration.
pub trait HostBridge {
    fn request_config_update(&self, patch: ConfigPatch);
}

/// Channel to the enclosing context (handshake, detail-panel messages).
pub trait MessageSink {
    fn post_message(&self, message: &VisMessage);
}

/// Sends `patch` if the capability exists. Returns whether it was sent.
pub fn request_update(bridge: Option<&dyn HostBridge>, patch: ConfigPatch) -> bool {
    match bridge {
        Some(bridge) => {
            debug!(patch = %patch.to_json(), "requesting config update");
            bridge.request_config_update(patch);
            true
        }
        None => {
            debug!(patch = %patch.to_json(), "no host bridge, dropping config update");
            false
        }
    }
}

pub fn post_message(sink: Option<&dyn MessageSink>, message: &VisMessage) -> bool {
    match sink {
        Some(sink) => {
            debug!(message = %message.to_json(), "posting message");
            sink.post_message(message);
            true
        }
        None => {
            debug!(message = %message.to_json(), "no message sink, dropping message");
            false
        }
    }
}

type Listener = Rc<dyn Fn(&VisMessage)>;

#[derive(Default)]
struct ChannelState {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Single-threaded broadcast of incoming host messages.
#[derive(Clone, Default)]
pub struct MessageChannel {
    state: Rc<RefCell<ChannelState>>,
}

impl MessageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&VisMessage) + 'static) -> Subscription {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push((id, Rc::new(listener)));
        trace!(id, listeners = state.listeners.len(), "listener subscribed");
        Subscription {
            id,
            state: Rc::downgrade(&self.state),
        }
    }

    /// Delivers `message` to every listener live at the time of the call.
    /// Returns the number of listeners invoked.
    pub fn broadcast(&self, message: &VisMessage) -> usize {
        let listeners: Vec<Listener> = self
            .state
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in &listeners {
            listener(message);
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

/// Owned listener registration. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    state: Weak<RefCell<ChannelState>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.borrow_mut();
            state.listeners.retain(|(id, _)| *id != self.id);
            trace!(id = self.id, "listener removed");
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected no pivots, found {0}")]
    Pivots(usize),
    #[error("expected at least 2 dimensions, found {0}")]
    TooFewDimensions(usize),
    #[error("expected exactly 1 measure, found {0}")]
    MeasureCount(usize),
}

/// Field shape the chart can draw: no pivots, two or more dimensions, one
/// measure.
pub fn validate(fields: &QueryFields) -> Result<(), ValidationError> {
    if !fields.pivots.is_empty() {
        return Err(ValidationError::Pivots(fields.pivots.len()));
    }
    if fields.dimension_like.len() < 2 {
        return Err(ValidationError::TooFewDimensions(fields.dimension_like.len()));
    }
    if fields.measure_like.len() != 1 {
        return Err(ValidationError::MeasureCount(fields.measure_like.len()));
    }
    Ok(())
}

/// Host double that records every request and message. Used by the CLI's
/// simulated host loop and by tests.
#[derive(Debug, Default)]
pub struct RecordingHost {
    patches: RefCell<Vec<ConfigPatch>>,
    messages: RefCell<Vec<VisMessage>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patches(&self) -> Vec<ConfigPatch> {
        self.patches.borrow().clone()
    }

    pub fn messages(&self) -> Vec<VisMessage> {
        self.messages.borrow().clone()
    }

    pub fn take_patches(&self) -> Vec<ConfigPatch> {
        std::mem::take(&mut *self.patches.borrow_mut())
    }

    pub fn take_messages(&self) -> Vec<VisMessage> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }
}

impl HostBridge for RecordingHost {
    fn request_config_update(&self, patch: ConfigPatch) {
        self.patches.borrow_mut().push(patch);
    }
}

impl MessageSink for RecordingHost {
    fn post_message(&self, message: &VisMessage) {
        self.messages.borrow_mut().push(message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FieldDescriptor;
    use std::cell::Cell;

    #[test]
    fn messages_use_type_and_payload() {
        assert_eq!(
            VisMessage::handshake().to_json(),
            r#"{"type":"CUSTOM_VIS_HANDSHAKE","payload":"SANKEY_CHART"}"#
        );
        assert_eq!(
            VisMessage::SetStage("TARGET_MATCH".to_string()).to_json(),
            r#"{"type":"SET_STAGE","payload":"TARGET_MATCH"}"#
        );
        assert_eq!(
            VisMessage::parse(r#"{"type":"CLEAR_SELECTED_STAGE"}"#),
            Some(VisMessage::ClearSelectedStage)
        );
        assert_eq!(VisMessage::parse(r#"{"type":"SOMETHING_ELSE"}"#), None);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let channel = MessageChannel::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let subscription = channel.subscribe(move |_| counter.set(counter.get() + 1));
        assert_eq!(channel.broadcast(&VisMessage::ClearSelectedStage), 1);
        drop(subscription);
        assert_eq!(channel.broadcast(&VisMessage::ClearSelectedStage), 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_channel_drops_cleanly() {
        let channel = MessageChannel::new();
        let subscription = channel.subscribe(|_| {});
        drop(channel);
        drop(subscription);
    }

    #[test]
    fn missing_bridge_is_skipped() {
        assert!(!request_update(None, ConfigPatch::selected_detail_stage("")));
        let host = RecordingHost::new();
        assert!(request_update(Some(&host), ConfigPatch::selected_detail_stage("")));
        assert_eq!(host.patches().len(), 1);
    }

    #[test]
    fn validation_rules() {
        let dim = |name: &str| FieldDescriptor::new(name, name);
        let mut fields = QueryFields {
            dimension_like: vec![dim("a"), dim("b")],
            measure_like: vec![dim("n")],
            pivots: Vec::new(),
        };
        assert_eq!(validate(&fields), Ok(()));

        fields.measure_like.clear();
        assert_eq!(validate(&fields), Err(ValidationError::MeasureCount(0)));

        fields.measure_like = vec![dim("n")];
        fields.dimension_like.pop();
        assert_eq!(validate(&fields), Err(ValidationError::TooFewDimensions(1)));

        fields.dimension_like.push(dim("b"));
        fields.pivots.push(dim("p"));
        assert_eq!(validate(&fields), Err(ValidationError::Pivots(1)));
    }
}
