use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use log::{error, warn};

use crate::{
    allocator::Allocator,
    messages::{
        error::MessageFactoryError,
        message::{Message, MessageRef},
        message_kinds::{MessageKind, MessageKinds},
    },
};

cfg_if! {
    if #[cfg(debug_assertions)] {
        use std::{collections::HashMap, sync::Mutex};

        type Tracked = Mutex<HashMap<u64, (MessageKind, Arc<AtomicUsize>)>>;
    }
}

/// Bookkeeping of the messages a factory has created and not yet destroyed.
/// Shared by the factory and every message it creates, so that messages can
/// report their destruction without keeping the factory alive.
pub(crate) struct LiveMessages {
    count: AtomicUsize,
    next_serial: AtomicU64,
    #[cfg(debug_assertions)]
    tracked: Tracked,
}

impl LiveMessages {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            next_serial: AtomicU64::new(0),
            #[cfg(debug_assertions)]
            tracked: Mutex::new(HashMap::new()),
        }
    }

    fn next_serial(&self) -> u64 {
        self.next_serial.fetch_add(1, Ordering::Relaxed)
    }

    fn on_create(&self, serial: u64, message: &MessageRef) {
        self.count.fetch_add(1, Ordering::AcqRel);
        cfg_if! {
            if #[cfg(debug_assertions)] {
                if let Ok(mut tracked) = self.tracked.lock() {
                    tracked.insert(serial, (message.kind(), message.handle_counter()));
                }
            } else {
                let _ = (serial, message);
            }
        }
    }

    pub(crate) fn on_destroy(&self, serial: u64) {
        self.count.fetch_sub(1, Ordering::AcqRel);
        cfg_if! {
            if #[cfg(debug_assertions)] {
                if let Ok(mut tracked) = self.tracked.lock() {
                    tracked.remove(&serial);
                }
            } else {
                let _ = serial;
            }
        }
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Kind and reference count of every live message. Only tracked in debug
    /// builds.
    fn report(&self) -> Vec<(MessageKind, usize)> {
        cfg_if! {
            if #[cfg(debug_assertions)] {
                let Ok(tracked) = self.tracked.lock() else {
                    return Vec::new();
                };
                let mut report: Vec<(u64, MessageKind, usize)> = tracked
                    .iter()
                    .map(|(serial, (kind, handles))| {
                        (*serial, *kind, handles.load(Ordering::Relaxed))
                    })
                    .collect();
                report.sort_by_key(|(serial, _, _)| *serial);
                report.into_iter().map(|(_, kind, ref_count)| (kind, ref_count)).collect()
            } else {
                Vec::new()
            }
        }
    }
}

struct FactoryHandle {
    kinds: MessageKinds,
    allocator: Allocator,
    live: Arc<LiveMessages>,
}

impl Drop for FactoryHandle {
    fn drop(&mut self) {
        let count = self.live.count();
        if count == 0 {
            return;
        }

        error!("Message factory torn down with {} leaked messages", count);
        for (kind, ref_count) in self.live.report() {
            error!(
                "leaked message: kind {} ({}), {} references",
                kind.net_id(),
                self.kinds.name(kind).unwrap_or("unknown"),
                ref_count
            );
        }

        if cfg!(debug_assertions) && !std::thread::panicking() {
            panic!("Message factory torn down with {} leaked messages", count);
        }
    }
}

/// Builds a [`MessageFactory`], registering every message type up front
pub struct MessageFactoryBuilder {
    allocator: Allocator,
    kinds: MessageKinds,
}

impl MessageFactoryBuilder {
    pub fn add_message<M: Message + Default>(mut self) -> Self {
        self.kinds.add_message::<M>();
        self
    }

    pub fn build(self) -> MessageFactory {
        MessageFactory {
            handle: Arc::new(FactoryHandle {
                kinds: self.kinds,
                allocator: self.allocator,
                live: Arc::new(LiveMessages::new()),
            }),
        }
    }
}

/// Creates messages of registered kinds out of one peer's [`Allocator`].
///
/// Clones share the same registry and leak tracking. When the last clone is
/// dropped while messages it created are still alive, the leak is logged,
/// and in debug builds it panics.
#[derive(Clone)]
pub struct MessageFactory {
    handle: Arc<FactoryHandle>,
}

impl MessageFactory {
    pub fn builder(allocator: Allocator) -> MessageFactoryBuilder {
        MessageFactoryBuilder {
            allocator,
            kinds: MessageKinds::new(),
        }
    }

    pub fn kinds(&self) -> &MessageKinds {
        &self.handle.kinds
    }

    pub fn num_kinds(&self) -> usize {
        self.handle.kinds.len()
    }

    pub fn kind_of<M: Message>(&self) -> Option<MessageKind> {
        self.handle.kinds.kind_of::<M>()
    }

    pub fn allocator(&self) -> &Allocator {
        &self.handle.allocator
    }

    /// Creates a message of `kind` with a reference count of 1
    pub fn try_create(&self, kind: MessageKind) -> Result<MessageRef, MessageFactoryError> {
        let handle = &self.handle;
        let kinds = &handle.kinds;
        let size = kinds
            .size(kind)
            .ok_or(MessageFactoryError::KindNotRegistered {
                kind: kind.net_id(),
            })?;

        let allocation = handle.allocator.try_allocate(size)?;
        let payload = kinds
            .construct(kind)
            .ok_or(MessageFactoryError::KindNotRegistered {
                kind: kind.net_id(),
            })?;

        let serial = handle.live.next_serial();
        let message = MessageRef::new(
            kind,
            kinds.is_block(kind),
            payload,
            handle.allocator.clone(),
            allocation,
            handle.live.clone(),
            serial,
        );
        handle.live.on_create(serial, &message);
        Ok(message)
    }

    /// Creates a message of `kind`, or returns `None` if the allocator is
    /// exhausted.
    ///
    /// # Panics
    ///
    /// Panics if `kind` was never registered.
    pub fn create(&self, kind: MessageKind) -> Option<MessageRef> {
        match self.try_create(kind) {
            Ok(message) => Some(message),
            Err(MessageFactoryError::KindNotRegistered { kind }) => {
                panic!("Message kind {} is not registered with this factory", kind)
            }
            Err(err) => {
                warn!("Failed to create message: {}", err);
                None
            }
        }
    }

    /// Like [`MessageFactory::create`], for the kind `M` was registered as
    pub fn create_typed<M: Message>(&self) -> Option<MessageRef> {
        let Some(kind) = self.kind_of::<M>() else {
            panic!(
                "Message type `{}` is not registered with this factory",
                std::any::type_name::<M>()
            );
        };
        self.create(kind)
    }

    pub fn add_ref(&self, message: &MessageRef) -> MessageRef {
        debug_assert!(self.created(message));
        message.clone()
    }

    pub fn release(&self, message: MessageRef) {
        debug_assert!(self.created(&message));
        drop(message);
    }

    pub(crate) fn created(&self, message: &MessageRef) -> bool {
        message.belongs_to(&self.handle.live)
    }

    /// Number of messages created by this factory and not yet destroyed
    pub fn num_live_messages(&self) -> usize {
        self.handle.live.count()
    }

    pub fn check_leaks(&self) -> Result<(), MessageFactoryError> {
        match self.num_live_messages() {
            0 => Ok(()),
            count => Err(MessageFactoryError::Leaked { count }),
        }
    }
}
