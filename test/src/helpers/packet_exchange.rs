use std::time::Duration;

use channelwire::ConnectionConfig;
use log::debug;

use crate::{
    helpers::test_endpoint::TestEndpoint,
    local_socket::{LinkConditions, LocalSocketPair},
};

pub const TICK: Duration = Duration::from_millis(33);

/// A client and a server joined by a pair of lossy links
pub struct TestNetwork {
    pub client: TestEndpoint,
    pub server: TestEndpoint,
    pub sockets: LocalSocketPair,
}

impl TestNetwork {
    pub fn new(config: ConnectionConfig, conditions: LinkConditions, seed: u64) -> Self {
        Self {
            client: TestEndpoint::new(config.clone()),
            server: TestEndpoint::new(config),
            sockets: LocalSocketPair::new(conditions, seed),
        }
    }

    pub fn set_conditions(&mut self, conditions: LinkConditions) {
        self.sockets.set_conditions(conditions);
    }

    /// Advances both endpoints by one tick, sends one packet each way and
    /// delivers whatever the links let through
    pub fn tick(&mut self) {
        self.client.advance_time(TICK);
        self.server.advance_time(TICK);

        let to_server = self.client.generate().expect("client failed to generate a packet");
        let to_client = self.server.generate().expect("server failed to generate a packet");
        self.sockets.to_server.send(to_server);
        self.sockets.to_client.send(to_client);

        for datagram in self.sockets.to_server.advance() {
            if let Err(err) = self.server.receive(&datagram) {
                debug!("server rejected packet {}: {}", datagram.packet_index, err);
            }
        }
        for datagram in self.sockets.to_client.advance() {
            if let Err(err) = self.client.receive(&datagram) {
                debug!("client rejected packet {}: {}", datagram.packet_index, err);
            }
        }
    }

    pub fn tick_n(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Ticks until `done` holds or `max_ticks` pass. Returns whether `done`
    /// was reached.
    pub fn run_until(
        &mut self,
        max_ticks: usize,
        mut done: impl FnMut(&TestNetwork) -> bool,
    ) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            self.tick();
        }
        done(self)
    }
}

/// Sends one packet each way between two endpoints with nothing lost and no
/// time passing
pub fn exchange_packets(client: &mut TestEndpoint, server: &mut TestEndpoint) {
    let to_server = client.generate().expect("client failed to generate a packet");
    let to_client = server.generate().expect("server failed to generate a packet");
    server.receive(&to_server).expect("server rejected a packet");
    client.receive(&to_client).expect("client rejected a packet");
}

pub fn exchange_packets_n_times(
    client: &mut TestEndpoint,
    server: &mut TestEndpoint,
    times: usize,
) {
    for _ in 0..times {
        exchange_packets(client, server);
    }
}

/// Advances both endpoints by `delta`, then exchanges one packet each way
pub fn tick_and_exchange(client: &mut TestEndpoint, server: &mut TestEndpoint, delta: Duration) {
    client.advance_time(delta);
    server.advance_time(delta);
    exchange_packets(client, server);
}
