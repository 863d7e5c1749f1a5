//! Wire formats spoken with the robot.
//!
//! Three distinct surfaces: RTP video ingress with latency metadata in
//! header extensions, the little-endian servo control protocol on the
//! request/response link, and the fixed 21-byte fire-and-forget control
//! datagrams.

pub mod datagram;
pub mod rtp;
pub mod servo;
