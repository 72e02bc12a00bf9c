use std::time::Duration;

use crate::types::{FragmentIndex, MessageIndex};

/// Send-side state of the block message currently being fragmented
pub struct FragmentSender {
    active: bool,
    message_index: MessageIndex,
    num_fragments: u16,
    num_acked: u16,
    acked: Vec<bool>,
    time_last_sent: Vec<Option<Duration>>,
}

impl FragmentSender {
    pub fn new() -> Self {
        Self {
            active: false,
            message_index: 0,
            num_fragments: 0,
            num_acked: 0,
            acked: Vec::new(),
            time_last_sent: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.num_fragments = 0;
        self.num_acked = 0;
        self.acked.clear();
        self.time_last_sent.clear();
    }

    pub fn is_sending(&self, message_index: MessageIndex) -> bool {
        self.active && self.message_index == message_index
    }

    pub fn num_fragments(&self) -> u16 {
        self.num_fragments
    }

    pub fn start(&mut self, message_index: MessageIndex, num_fragments: u16) {
        self.active = true;
        self.message_index = message_index;
        self.num_fragments = num_fragments;
        self.num_acked = 0;
        self.acked.clear();
        self.acked.resize(usize::from(num_fragments), false);
        self.time_last_sent.clear();
        self.time_last_sent.resize(usize::from(num_fragments), None);
    }

    /// The first unacked fragment that was never sent or whose resend time
    /// has passed
    pub fn next_fragment(&self, now: Duration, resend_time: Duration) -> Option<FragmentIndex> {
        if !self.active {
            return None;
        }
        (0..self.num_fragments).find(|fragment_id| {
            let index = usize::from(*fragment_id);
            !self.acked[index]
                && self.time_last_sent[index].map_or(true, |sent| sent + resend_time <= now)
        })
    }

    /// Records that `fragment_id` went out at `now`, returning whether it was
    /// sent before
    pub fn mark_sent(&mut self, fragment_id: FragmentIndex, now: Duration) -> bool {
        let slot = &mut self.time_last_sent[usize::from(fragment_id)];
        slot.replace(now).is_some()
    }

    /// Acknowledges one fragment. Returns `None` if it doesn't belong to the
    /// active block or was already acked, otherwise whether the whole block
    /// is now acked.
    pub fn ack(&mut self, message_index: MessageIndex, fragment_id: FragmentIndex) -> Option<bool> {
        if !self.is_sending(message_index) {
            return None;
        }
        let acked = self.acked.get_mut(usize::from(fragment_id))?;
        if *acked {
            return None;
        }
        *acked = true;
        self.num_acked += 1;
        if self.num_acked == self.num_fragments {
            self.reset();
            return Some(true);
        }
        Some(false)
    }
}
