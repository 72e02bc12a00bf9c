use std::time::Duration;

use log::warn;

use crate::{
    constants::{
        CONSERVATIVE_FRAGMENT_HEADER_BITS, CONSERVATIVE_MESSAGE_HEADER_BITS, GIVE_UP_BITS,
    },
    messages::{
        channels::{
            channel::ChannelCounters,
            channel_config::ChannelConfig,
            channel_packet_data::{message_index_bits, BlockFragment, IndexedMessage},
            senders::{error::SenderError, fragment_sender::FragmentSender},
        },
        message::MessageRef,
    },
    sequence_buffer::SequenceBuffer,
    types::{FragmentIndex, MessageIndex, PacketIndex},
};

struct SendQueueEntry {
    message: MessageRef,
    /// Payload bits, measured once at send time
    measured_bits: u32,
    block: bool,
    time_last_sent: Option<Duration>,
}

struct SentPacketEntry {
    acked: bool,
    message_indices: Vec<MessageIndex>,
    fragment: Option<(MessageIndex, FragmentIndex)>,
}

/// Send side of a reliable ordered channel.
///
/// Messages wait in the send queue, keyed by their message id, until a packet
/// carrying them is acknowledged. Each generated packet is remembered so its
/// acknowledgment can retire exactly the messages (or the block fragment) it
/// carried.
pub struct ReliableSender {
    send_message_index: MessageIndex,
    oldest_unacked_message_index: MessageIndex,
    send_queue: SequenceBuffer<SendQueueEntry>,
    sent_packets: SequenceBuffer<SentPacketEntry>,
    fragment_sender: FragmentSender,
    /// Furthest ahead of the oldest unacked message the sender may go
    window: u16,
}

impl ReliableSender {
    pub fn new(config: &ChannelConfig) -> Self {
        // both sizes are validated to be at most 32768
        let window = config.send_queue_size.min(config.receive_queue_size) as u16;
        Self {
            send_message_index: 0,
            oldest_unacked_message_index: 0,
            send_queue: SequenceBuffer::with_capacity(config.send_queue_size),
            sent_packets: SequenceBuffer::with_capacity(config.sent_packet_buffer_size),
            fragment_sender: FragmentSender::new(),
            window,
        }
    }

    pub fn reset(&mut self) {
        self.send_message_index = 0;
        self.oldest_unacked_message_index = 0;
        self.send_queue.reset();
        self.sent_packets.reset();
        self.fragment_sender.reset();
    }

    pub fn can_send(&self) -> bool {
        self.send_queue.available(self.send_message_index)
    }

    /// Queues `message` under the next message id, which is returned
    pub fn send(
        &mut self,
        message: MessageRef,
        measured_bits: u32,
    ) -> Result<MessageIndex, SenderError> {
        if !self.can_send() {
            return Err(SenderError::SendQueueFull);
        }

        let index = self.send_message_index;
        message.set_id(index);
        let block = message.is_block();
        self.send_queue
            .insert(
                index,
                SendQueueEntry {
                    message,
                    measured_bits,
                    block,
                    time_last_sent: None,
                },
            )
            .map_err(|_| SenderError::SendQueueFull)?;
        self.send_message_index = index.wrapping_add(1);
        Ok(index)
    }

    /// Number of messages sent but not yet acknowledged
    pub fn num_unacked(&self) -> usize {
        usize::from(
            self.send_message_index
                .wrapping_sub(self.oldest_unacked_message_index),
        )
    }

    pub fn has_messages_to_send(&self) -> bool {
        self.oldest_unacked_message_index != self.send_message_index
    }

    /// Whether the oldest unacked message is a block, which is then sent
    /// fragment by fragment before anything after it
    pub fn sending_block(&self) -> bool {
        self.send_queue
            .find(self.oldest_unacked_message_index)
            .is_some_and(|entry| entry.block)
    }

    /// Picks the messages that are due for (re)sending and fit in
    /// `budget_bits`, in id order, and records them as sent in
    /// `packet_index`. Returns the messages and the bits they will take.
    pub fn collect_messages(
        &mut self,
        packet_index: PacketIndex,
        now: Duration,
        budget_bits: u32,
        config: &ChannelConfig,
        kind_bits: u32,
        counters: &mut ChannelCounters,
    ) -> Option<(Vec<IndexedMessage>, u32)> {
        let mut used_bits = CONSERVATIVE_MESSAGE_HEADER_BITS;
        let mut give_up_counter = 0;
        let mut previous: Option<MessageIndex> = None;
        let mut messages: Vec<IndexedMessage> = Vec::new();

        for offset in 0..self.window {
            if budget_bits.saturating_sub(used_bits) < GIVE_UP_BITS {
                break;
            }
            if give_up_counter > self.send_queue.size() {
                break;
            }

            let index = self.oldest_unacked_message_index.wrapping_add(offset);
            let Some(entry) = self.send_queue.find_mut(index) else {
                continue;
            };
            if entry.block {
                break;
            }

            let due = entry
                .time_last_sent
                .map_or(true, |sent| sent + config.message_resend_time <= now);
            if due && budget_bits >= entry.measured_bits {
                let message_bits = entry.measured_bits
                    + kind_bits
                    + message_index_bits(previous, index);
                if used_bits + message_bits > budget_bits {
                    give_up_counter += 1;
                    continue;
                }

                used_bits += message_bits;
                if entry.time_last_sent.replace(now).is_some() {
                    counters.messages_resent += 1;
                }
                messages.push(IndexedMessage::new(index, entry.message.clone()));
                previous = Some(index);
            }

            if messages.len() == config.max_messages_per_packet {
                break;
            }
        }

        if messages.is_empty() {
            return None;
        }

        let message_indices = messages.iter().map(|indexed| indexed.index).collect();
        self.record_packet(
            packet_index,
            SentPacketEntry {
                acked: false,
                message_indices,
                fragment: None,
            },
        );
        Some((messages, used_bits))
    }

    /// Picks the next fragment of the block at the head of the queue, if one
    /// is due and fits in `budget_bits`, and records it as sent in
    /// `packet_index`
    pub fn collect_fragment(
        &mut self,
        packet_index: PacketIndex,
        now: Duration,
        budget_bits: u32,
        config: &ChannelConfig,
        kind_bits: u32,
        counters: &mut ChannelCounters,
    ) -> Option<(BlockFragment, u32)> {
        let message_index = self.oldest_unacked_message_index;
        let entry = self.send_queue.find(message_index)?;
        let block = entry.message.block()?;
        let fragment_size = config.block_fragment_size;

        if !self.fragment_sender.is_sending(message_index) {
            // validated against max_block_size at send time, at most 65535
            let num_fragments = config.fragments_for(block.len()) as u16;
            self.fragment_sender.start(message_index, num_fragments);
        }

        let fragment_id = self
            .fragment_sender
            .next_fragment(now, config.fragment_resend_time)?;
        let start = usize::from(fragment_id) * fragment_size;
        let end = (start + fragment_size).min(block.len());
        let data = block[start..end].to_vec();

        let mut fragment_bits = CONSERVATIVE_FRAGMENT_HEADER_BITS + (data.len() as u32) * 8;
        if fragment_id == 0 {
            fragment_bits += kind_bits + entry.measured_bits;
        }
        if fragment_bits > budget_bits {
            return None;
        }

        let message = (fragment_id == 0).then(|| entry.message.clone());
        let fragment = BlockFragment {
            message_index,
            fragment_id,
            num_fragments: self.fragment_sender.num_fragments(),
            data,
            message,
        };

        if self.fragment_sender.mark_sent(fragment_id, now) {
            counters.messages_resent += 1;
        }
        counters.fragments_sent += 1;
        self.record_packet(
            packet_index,
            SentPacketEntry {
                acked: false,
                message_indices: Vec::new(),
                fragment: Some((message_index, fragment_id)),
            },
        );
        Some((fragment, fragment_bits))
    }

    fn record_packet(&mut self, packet_index: PacketIndex, entry: SentPacketEntry) {
        if let Err(err) = self.sent_packets.insert(packet_index, entry) {
            warn!("Sent packet {} not tracked for acks: {}", packet_index, err);
        }
    }

    /// Retires whatever `packet_index` carried. Returns whether this was the
    /// first ack for a packet this sender knows about; repeated acks have no
    /// effect.
    pub fn process_ack(
        &mut self,
        packet_index: PacketIndex,
        counters: &mut ChannelCounters,
    ) -> bool {
        let Some(packet) = self.sent_packets.find_mut(packet_index) else {
            return false;
        };
        if packet.acked {
            return false;
        }
        packet.acked = true;
        let message_indices = std::mem::take(&mut packet.message_indices);
        let fragment = packet.fragment;

        for index in message_indices {
            if self.send_queue.remove(index).is_some() {
                counters.messages_acked += 1;
            }
        }

        if let Some((message_index, fragment_id)) = fragment {
            if self.fragment_sender.ack(message_index, fragment_id) == Some(true)
                && self.send_queue.remove(message_index).is_some()
            {
                counters.messages_acked += 1;
            }
        }

        self.update_oldest_unacked();
        true
    }

    fn update_oldest_unacked(&mut self) {
        while self.oldest_unacked_message_index != self.send_message_index
            && !self.send_queue.exists(self.oldest_unacked_message_index)
        {
            self.oldest_unacked_message_index = self.oldest_unacked_message_index.wrapping_add(1);
        }
    }
}
