//! Outbound side of the messaging channel.
//!
//! Each message type has one pending slot: a new request replaces the payload
//! and restarts the debounce timer, so bursts of edits collapse into one frame
//! carrying the latest state. Fired frames go through a FIFO queue that is
//! drained whenever the transport is open. Time is passed in as milliseconds
//! so the host owns the clock.

use bp_core::{MessageType, encode_frame};
use serde_json::value::RawValue;
use std::collections::{BTreeMap, VecDeque};

/// Anything frames can be written to.
pub trait Transport {
    fn is_open(&self) -> bool;

    /// # Errors
    /// Returns an error when the frame could not be handed to the socket.
    fn send(&mut self, frame: &str) -> Result<(), String>;
}

#[derive(Debug, Clone)]
struct Pending {
    payload: Box<RawValue>,
    due: u64,
}

#[derive(Debug)]
pub struct Outbox {
    debounce_ms: u64,
    pending: BTreeMap<MessageType, Pending>,
    queue: VecDeque<String>,
}

impl Outbox {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            pending: BTreeMap::new(),
            queue: VecDeque::new(),
        }
    }

    /// Schedule `payload` for `kind`, replacing any pending payload of the
    /// same kind and restarting its timer.
    pub fn request(&mut self, kind: MessageType, payload: Box<RawValue>, now: u64) {
        self.pending.insert(
            kind,
            Pending {
                payload,
                due: now + self.debounce_ms,
            },
        );
    }

    /// Earliest time a pending message fires.
    pub fn next_due(&self) -> Option<u64> {
        self.pending.values().map(|p| p.due).min()
    }

    /// Fire every message due at `now` and flush the queue if possible.
    /// Returns the number of frames written.
    pub fn poll(&mut self, now: u64, transport: &mut impl Transport) -> usize {
        let mut due: Vec<(MessageType, Pending)> = Vec::new();
        self.pending.retain(|kind, p| {
            if p.due <= now {
                due.push((*kind, p.clone()));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(kind, p)| (p.due, *kind));
        for (kind, p) in due {
            match encode_frame(kind, &p.payload) {
                Ok(frame) => {
                    log::debug!("channel: {kind} fired");
                    self.queue.push_back(frame);
                }
                Err(e) => log::error!("channel: dropping {kind}: {e}"),
            }
        }
        self.flush(transport)
    }

    /// Write queued frames in order until the queue is empty or the transport
    /// refuses one. A refused frame stays at the head of the queue.
    pub fn flush(&mut self, transport: &mut impl Transport) -> usize {
        let mut sent = 0;
        while transport.is_open() {
            let Some(frame) = self.queue.pop_front() else {
                break;
            };
            if let Err(e) = transport.send(&frame) {
                log::warn!("channel: send failed, requeued: {e}");
                self.queue.push_front(frame);
                break;
            }
            sent += 1;
        }
        sent
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

/// Fixed-delay reconnect timer.
#[derive(Debug)]
pub struct Reconnect {
    delay_ms: u64,
    next: Option<u64>,
}

impl Reconnect {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            next: None,
        }
    }

    /// Socket closed at `now`: schedule the next attempt unless one is
    /// already scheduled.
    pub fn closed(&mut self, now: u64) -> u64 {
        *self.next.get_or_insert(now + self.delay_ms)
    }

    /// `true` once when the scheduled attempt is due.
    pub fn due(&mut self, now: u64) -> bool {
        match self.next {
            Some(at) if at <= now => {
                self.next = None;
                true
            }
            _ => false,
        }
    }

    pub fn opened(&mut self) {
        self.next = None;
    }

    pub fn scheduled(&self) -> Option<u64> {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        open: bool,
        fail_next: bool,
        frames: Vec<String>,
    }

    impl Transport for Recorder {
        fn is_open(&self) -> bool {
            self.open
        }

        fn send(&mut self, frame: &str) -> Result<(), String> {
            if std::mem::take(&mut self.fail_next) {
                return Err("socket busy".into());
            }
            self.frames.push(frame.to_string());
            Ok(())
        }
    }

    #[test]
    fn burst_collapses_to_latest() {
        let mut outbox = Outbox::new(500);
        let mut socket = Recorder {
            open: true,
            ..Default::default()
        };
        outbox.request(MessageType::Progress, raw("10"), 0);
        outbox.request(MessageType::Progress, raw("20"), 300);
        assert_eq!(outbox.poll(700, &mut socket), 0);
        assert_eq!(outbox.poll(800, &mut socket), 1);
        assert_eq!(socket.frames, vec![r#"{"progress":20}"#]);
    }

    #[test]
    fn closed_transport_queues_in_order() {
        let mut outbox = Outbox::new(0);
        let mut socket = Recorder::default();
        outbox.request(MessageType::RenderStatus, raw(r#""genrating""#), 0);
        outbox.poll(0, &mut socket);
        outbox.request(MessageType::Progress, raw("50"), 1);
        outbox.poll(1, &mut socket);
        assert_eq!(outbox.queued(), 2);

        socket.open = true;
        assert_eq!(outbox.flush(&mut socket), 2);
        assert_eq!(
            socket.frames,
            vec![r#"{"render_status":"genrating"}"#, r#"{"progress":50}"#]
        );
    }

    #[test]
    fn failed_send_keeps_frame_at_head() {
        let mut outbox = Outbox::new(0);
        let mut socket = Recorder {
            open: true,
            fail_next: true,
            ..Default::default()
        };
        outbox.request(MessageType::Queue, raw("null"), 0);
        assert_eq!(outbox.poll(0, &mut socket), 0);
        assert_eq!(outbox.queued(), 1);
        assert_eq!(outbox.flush(&mut socket), 1);
        assert_eq!(socket.frames, vec![r#"{"queue":true}"#]);
    }

    #[test]
    fn reconnect_fires_once_after_delay() {
        let mut reconnect = Reconnect::new(5000);
        assert_eq!(reconnect.closed(100), 5100);
        assert_eq!(reconnect.closed(200), 5100);
        assert!(!reconnect.due(5000));
        assert!(reconnect.due(5100));
        assert!(!reconnect.due(6000));
    }
}
