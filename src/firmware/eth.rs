//! W5500 Ethernet link and the embassy-net stack on top of it.
//!
//! The module runs in MACRAW mode, so smoltcp (through embassy-net) does
//! DHCP and UDP. The broadcaster only sees [`EthTransport`].

use core::net::Ipv4Addr;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_net::udp::{self, PacketMetadata, UdpSocket};
use embassy_net::{Stack, StackResources};
use embassy_net_wiznet::chip::W5500;
use embassy_net_wiznet::{Device, Runner, State};
use embassy_nrf::gpio::{Input, Output};
use embassy_nrf::peripherals::SPI3;
use embassy_nrf::spim::Spim;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::StaticCell;
use trip_computer::config::{BROADCAST_UDP_PORT, ETH_MAC_ADDR};
use trip_computer::{subnet_broadcast, Transport, TransportError};

type EthSpi = ExclusiveDevice<Spim<'static, SPI3>, Output<'static>, Delay>;
type EthRunner = Runner<'static, W5500, EthSpi, Input<'static>, Output<'static>>;

static ETH_STATE: StaticCell<State<2, 2>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<2>> = StaticCell::new();

#[embassy_executor::task]
async fn ethernet_task(runner: EthRunner) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, Device<'static>>) -> ! {
    runner.run().await
}

/// Bring up the W5500 and start the network stack with DHCPv4.
///
/// Must be called exactly once. Returns as soon as the tasks are
/// running; the link comes up in the background.
pub async fn init(
    spawner: &Spawner,
    spi: EthSpi,
    int: Input<'static>,
    reset: Output<'static>,
    seed: u64,
) -> Stack<'static> {
    let state = ETH_STATE.init(State::<2, 2>::new());
    let (device, runner) = unwrap!(
        embassy_net_wiznet::new(ETH_MAC_ADDR, state, spi, int, reset).await
    );
    unwrap!(spawner.spawn(ethernet_task(runner)));

    let config = embassy_net::Config::dhcpv4(Default::default());
    let resources = NET_RESOURCES.init(StackResources::new());
    let (stack, runner) = embassy_net::new(device, config, resources, seed);
    unwrap!(spawner.spawn(net_task(runner)));

    info!("Net: W5500 up, waiting for DHCP");
    stack
}

/// Broadcast transport over an embassy-net UDP socket.
pub struct EthTransport<'a> {
    stack: Stack<'static>,
    socket: UdpSocket<'a>,
}

impl<'a> EthTransport<'a> {
    pub fn new(
        stack: Stack<'static>,
        rx_meta: &'a mut [PacketMetadata],
        rx_buffer: &'a mut [u8],
        tx_meta: &'a mut [PacketMetadata],
        tx_buffer: &'a mut [u8],
    ) -> Self {
        let mut socket = UdpSocket::new(stack, rx_meta, rx_buffer, tx_meta, tx_buffer);
        // Ephemeral source port; we never receive.
        unwrap!(socket.bind(0));
        Self { stack, socket }
    }
}

impl Transport for EthTransport<'_> {
    fn is_connected(&self) -> bool {
        self.stack.is_link_up() && self.stack.config_v4().is_some()
    }

    fn local_broadcast_address(&self) -> Ipv4Addr {
        match self.stack.config_v4() {
            Some(cfg) => subnet_broadcast(cfg.address.address(), cfg.address.prefix_len()),
            None => Ipv4Addr::BROADCAST,
        }
    }

    async fn send_broadcast(&mut self, to: Ipv4Addr, payload: &[u8]) -> Result<(), TransportError> {
        self.socket
            .send_to(payload, (to, BROADCAST_UDP_PORT))
            .await
            .map_err(|e| match e {
                udp::SendError::NoRoute => TransportError::Disconnected,
                _ => TransportError::SendFailed,
            })
    }
}
