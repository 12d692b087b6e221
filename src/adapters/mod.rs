//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter | Implements            | Connects to                        |
//! |---------|-----------------------|------------------------------------|
//! | `adc`   | SampleReader          | MCP3208 over `embedded-hal` SPI    |
//! | `board` | (builds adc + gpio)   | Linux GPIO cdev + spidev           |
//! | `gpio`  | DigitalOutput         | `embedded-hal` output pins         |
//! | `sim`   | SampleReader          | injected values / counter          |
//! |         | DigitalOutput         | in-memory pin levels               |
//! | `udp`   | DatagramSink          | `std::net::UdpSocket`              |
//! | `time`  | Clock                 | `Instant` / virtual time           |

pub mod adc;
pub mod board;
pub mod gpio;
pub mod sim;
pub mod time;
pub mod udp;
