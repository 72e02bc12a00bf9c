use std::{any::TypeId, collections::HashMap};

use crate::{constants::MAX_MESSAGE_KINDS, messages::message::Message};

/// The type tag of a registered message, assigned in registration order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageKind {
    net_id: u16,
}

impl MessageKind {
    pub fn from_net_id(net_id: u16) -> Self {
        Self { net_id }
    }

    pub fn net_id(&self) -> u16 {
        self.net_id
    }
}

struct KindEntry {
    name: &'static str,
    is_block: bool,
    size: usize,
    constructor: fn() -> Box<dyn Message>,
}

fn construct<M: Message + Default>() -> Box<dyn Message> {
    Box::<M>::default()
}

/// Registry of message types. Registration is closed once the owning
/// factory is built.
pub struct MessageKinds {
    entries: Vec<KindEntry>,
    kind_map: HashMap<TypeId, MessageKind>,
}

impl MessageKinds {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            kind_map: HashMap::new(),
        }
    }

    /// Registers `M` under the next free kind.
    ///
    /// # Panics
    ///
    /// Panics if `M` is already registered or the registry is full.
    pub fn add_message<M: Message + Default>(&mut self) -> MessageKind {
        let type_id = TypeId::of::<M>();
        if self.kind_map.contains_key(&type_id) {
            panic!(
                "Message type `{}` is registered twice",
                std::any::type_name::<M>()
            );
        }
        if self.entries.len() >= MAX_MESSAGE_KINDS {
            panic!(
                "Cannot register more than {} message kinds",
                MAX_MESSAGE_KINDS
            );
        }

        // bounded by MAX_MESSAGE_KINDS above
        let kind = MessageKind::from_net_id(self.entries.len() as u16);
        self.entries.push(KindEntry {
            name: std::any::type_name::<M>(),
            is_block: M::is_block_message(),
            size: std::mem::size_of::<M>(),
            constructor: construct::<M>,
        });
        self.kind_map.insert(type_id, kind);
        kind
    }

    pub fn kind_of<M: Message>(&self) -> Option<MessageKind> {
        self.kind_map.get(&TypeId::of::<M>()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, kind: MessageKind) -> bool {
        usize::from(kind.net_id) < self.entries.len()
    }

    pub fn is_block(&self, kind: MessageKind) -> bool {
        self.entry(kind).is_some_and(|entry| entry.is_block)
    }

    pub fn name(&self, kind: MessageKind) -> Option<&'static str> {
        self.entry(kind).map(|entry| entry.name)
    }

    /// Highest registered net id, the upper bound for kinds on the wire
    pub(crate) fn max_net_id(&self) -> u32 {
        u32::try_from(self.entries.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    /// Size in bytes charged to the allocator for one message of `kind`
    pub(crate) fn size(&self, kind: MessageKind) -> Option<usize> {
        self.entry(kind).map(|entry| entry.size)
    }

    /// Builds a default instance of `kind`
    pub(crate) fn construct(&self, kind: MessageKind) -> Option<Box<dyn Message>> {
        self.entry(kind).map(|entry| (entry.constructor)())
    }

    fn entry(&self, kind: MessageKind) -> Option<&KindEntry> {
        self.entries.get(usize::from(kind.net_id))
    }
}

impl Default for MessageKinds {
    fn default() -> Self {
        Self::new()
    }
}
