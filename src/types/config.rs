//! Streaming configuration.
//!
//! Everything the client needs to know before a session starts: where the
//! robot is, which ports carry the two eyes, codec and resolution of the
//! streams, and the head-movement tuning applied when poses are sent back.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Default robot-side address.
pub const DEFAULT_ROBOT_ADDR: IpOctets = IpOctets([192, 168, 1, 105]);
/// Default headset-side address.
pub const DEFAULT_HEADSET_ADDR: IpOctets = IpOctets([10, 0, 24, 42]);
/// Default RTP ingress port for the left eye.
pub const DEFAULT_PORT_LEFT: u16 = 8554;
/// Default RTP ingress port for the right eye.
pub const DEFAULT_PORT_RIGHT: u16 = 8556;
/// Destination port for robot-control datagrams.
pub const SERVO_DATAGRAM_PORT: u16 = 32115;
/// Local port the control link listens on for polls.
pub const CONTROL_LINK_PORT: u16 = 31285;

/// Configuration errors, surfaced synchronously from the builder.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Resolution label is not in the known catalogue.
    #[error("unknown resolution label: {0}")]
    UnknownResolution(String),

    /// Resolution index is outside the catalogue.
    #[error("resolution index out of range: {0}")]
    ResolutionIndex(usize),

    /// Address string did not parse as four dotted octets.
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    /// A movement range with min above max.
    #[error("movement range {0} has min above max")]
    InvalidRange(&'static str),
}

/// An IPv4 address carried as raw octets.
///
/// The wire protocols and the configuration surface both deal in bytes,
/// so the address is stored that way and only formatted on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpOctets(pub [u8; 4]);

impl IpOctets {
    /// View as a `std` address for socket calls.
    #[must_use]
    pub fn to_ipv4(self) -> Ipv4Addr {
        Ipv4Addr::new(self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl From<[u8; 4]> for IpOctets {
    fn from(octets: [u8; 4]) -> Self {
        Self(octets)
    }
}

impl From<Ipv4Addr> for IpOctets {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr.octets())
    }
}

impl fmt::Display for IpOctets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for IpOctets {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 4];
        let mut count = 0;
        for segment in s.split('.') {
            if count == 4 {
                return Err(ConfigError::InvalidAddress(s.to_string()));
            }
            octets[count] = segment
                .parse::<u8>()
                .map_err(|_| ConfigError::InvalidAddress(s.to_string()))?;
            count += 1;
        }
        if count != 4 {
            return Err(ConfigError::InvalidAddress(s.to_string()));
        }
        Ok(Self(octets))
    }
}

/// Discover the local IPv4 address used for outbound traffic.
///
/// Connects a throwaway UDP socket to a dummy destination and reads the
/// address the OS picked for it. No packet is sent.
#[must_use]
pub fn local_ipv4() -> Option<IpOctets> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:9").ok()?;
    match socket.local_addr().ok()? {
        std::net::SocketAddr::V4(addr) => Some(IpOctets(addr.ip().octets())),
        std::net::SocketAddr::V6(_) => None,
    }
}

/// Video codec carried by the RTP streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// Motion JPEG (RTP payload 26).
    #[default]
    Jpeg,
    /// H.264 (dynamic payload 96).
    H264,
    /// H.265 (dynamic payload 96).
    H265,
}

impl Codec {
    /// RTP `encoding-name` for this codec.
    #[must_use]
    pub fn encoding_name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::H264 => "H264",
            Self::H265 => "H265",
        }
    }

    /// RTP payload type number.
    #[must_use]
    pub fn payload_type(self) -> u8 {
        match self {
            Self::Jpeg => 26,
            Self::H264 | Self::H265 => 96,
        }
    }
}

/// Whether both eyes carry distinct streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoMode {
    /// Two independent streams, one per eye.
    #[default]
    Stereo,
    /// Single stream mirrored into both eyes.
    Mono,
}

/// A named camera resolution from the fixed catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraResolution {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Catalogue label.
    pub label: &'static str,
}

/// The resolutions the robot cameras can be configured to.
pub const RESOLUTIONS: &[CameraResolution] = &[
    CameraResolution { width: 640, height: 360, label: "nHD" },
    CameraResolution { width: 960, height: 540, label: "qHD" },
    CameraResolution { width: 1024, height: 576, label: "WSVGA" },
    CameraResolution { width: 1280, height: 720, label: "HD" },
    CameraResolution { width: 1600, height: 900, label: "HD+" },
    CameraResolution { width: 1920, height: 1080, label: "FHD" },
    CameraResolution { width: 2048, height: 1152, label: "QWXGA" },
    CameraResolution { width: 2560, height: 1440, label: "QHD" },
    CameraResolution { width: 3200, height: 1800, label: "WQXGA+" },
    CameraResolution { width: 3840, height: 2160, label: "UHD" },
];

impl CameraResolution {
    /// Look up a resolution by catalogue label.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownResolution` for labels outside the
    /// catalogue.
    pub fn from_label(label: &str) -> Result<Self, ConfigError> {
        RESOLUTIONS
            .iter()
            .find(|r| r.label == label)
            .copied()
            .ok_or_else(|| ConfigError::UnknownResolution(label.to_string()))
    }

    /// Look up a resolution by catalogue index.
    ///
    /// # Errors
    /// Returns `ConfigError::ResolutionIndex` if out of range.
    pub fn from_index(index: usize) -> Result<Self, ConfigError> {
        RESOLUTIONS
            .get(index)
            .copied()
            .ok_or(ConfigError::ResolutionIndex(index))
    }

    /// Position of this resolution in the catalogue.
    #[must_use]
    pub fn index(&self) -> usize {
        RESOLUTIONS
            .iter()
            .position(|r| r == self)
            .unwrap_or_default()
    }

    /// Width-to-height ratio.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Byte size of one RGB frame at this resolution.
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// RTP `x-dimensions` caps string, `"W,H"`.
    #[must_use]
    pub fn x_dimensions(&self) -> String {
        format!("{},{}", self.width, self.height)
    }
}

impl Default for CameraResolution {
    fn default() -> Self {
        // FHD, same default the robot cameras boot with.
        RESOLUTIONS[5]
    }
}

/// Mechanical limits of the camera head, in servo hardware units,
/// plus the gain applied to lead the operator's motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementRange {
    /// Minimum azimuth target.
    pub azimuth_min: i32,
    /// Maximum azimuth target.
    pub azimuth_max: i32,
    /// Minimum elevation target.
    pub elevation_min: i32,
    /// Maximum elevation target.
    pub elevation_max: i32,
    /// Gain of the displacement-proportional speed boost.
    pub speed_multiplier: f32,
}

impl Default for MovementRange {
    fn default() -> Self {
        Self {
            azimuth_min: -1_073_741_824,
            azimuth_max: i32::MAX,
            elevation_min: -715_827_882,
            elevation_max: 715_827_882,
            speed_multiplier: 0.0,
        }
    }
}

impl MovementRange {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.azimuth_min > self.azimuth_max {
            return Err(ConfigError::InvalidRange("azimuth"));
        }
        if self.elevation_min > self.elevation_max {
            return Err(ConfigError::InvalidRange("elevation"));
        }
        Ok(())
    }
}

/// Session configuration for the telepresence client.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Local bind hint for the control sockets.
    pub headset_ip: IpOctets,
    /// Robot address, destination for control traffic and datagrams.
    pub peer_ip: IpOctets,
    /// RTP ingress port, left eye.
    pub port_left: u16,
    /// RTP ingress port, right eye.
    pub port_right: u16,
    /// Local port the control link answers polls on.
    pub control_port: u16,
    /// Stream codec.
    pub codec: Codec,
    /// Stream resolution; fixes buffer sizes and RTP `x-dimensions`.
    pub resolution: CameraResolution,
    /// Presentation rate hint. Not enforced.
    pub fps: u32,
    /// Stereo or mono delivery.
    pub video_mode: VideoMode,
    /// NTP server the shared clock disciplines against.
    pub ntp_server: String,
    /// Mechanical head range and speed-boost gain.
    pub movement_range: MovementRange,
    /// Upper bound for the serialized head-speed field.
    pub head_movement_max_speed: u32,
    /// Milliseconds of lead when sampling the head pose.
    pub head_movement_prediction_ms: u32,
    /// Master gate for fire-and-forget robot-control datagrams.
    pub robot_control_enabled: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            headset_ip: DEFAULT_HEADSET_ADDR,
            peer_ip: DEFAULT_ROBOT_ADDR,
            port_left: DEFAULT_PORT_LEFT,
            port_right: DEFAULT_PORT_RIGHT,
            control_port: CONTROL_LINK_PORT,
            codec: Codec::default(),
            resolution: CameraResolution::default(),
            fps: 60,
            video_mode: VideoMode::default(),
            ntp_server: "pool.ntp.org".to_string(),
            movement_range: MovementRange::default(),
            head_movement_max_speed: 300_000,
            head_movement_prediction_ms: 0,
            robot_control_enabled: false,
        }
    }
}

impl StreamingConfig {
    /// Create a new config builder.
    #[must_use]
    pub fn builder() -> StreamingConfigBuilder {
        StreamingConfigBuilder::default()
    }
}

/// Builder for `StreamingConfig`.
#[derive(Debug, Clone, Default)]
pub struct StreamingConfigBuilder {
    config: StreamingConfig,
    resolution_label: Option<String>,
}

impl StreamingConfigBuilder {
    /// Set the local bind hint.
    #[must_use]
    pub fn headset_ip(mut self, ip: IpOctets) -> Self {
        self.config.headset_ip = ip;
        self
    }

    /// Set the robot address.
    #[must_use]
    pub fn peer_ip(mut self, ip: IpOctets) -> Self {
        self.config.peer_ip = ip;
        self
    }

    /// Set the left/right RTP ingress ports.
    #[must_use]
    pub fn ports(mut self, left: u16, right: u16) -> Self {
        self.config.port_left = left;
        self.config.port_right = right;
        self
    }

    /// Set the control-link local port.
    #[must_use]
    pub fn control_port(mut self, port: u16) -> Self {
        self.config.control_port = port;
        self
    }

    /// Set the stream codec.
    #[must_use]
    pub fn codec(mut self, codec: Codec) -> Self {
        self.config.codec = codec;
        self
    }

    /// Set the resolution by catalogue label; validated at `build`.
    #[must_use]
    pub fn resolution_label(mut self, label: &str) -> Self {
        self.resolution_label = Some(label.to_string());
        self
    }

    /// Set the resolution directly.
    #[must_use]
    pub fn resolution(mut self, resolution: CameraResolution) -> Self {
        self.config.resolution = resolution;
        self
    }

    /// Set the presentation rate hint.
    #[must_use]
    pub fn fps(mut self, fps: u32) -> Self {
        self.config.fps = fps;
        self
    }

    /// Set stereo or mono delivery.
    #[must_use]
    pub fn video_mode(mut self, mode: VideoMode) -> Self {
        self.config.video_mode = mode;
        self
    }

    /// Set the NTP server host.
    #[must_use]
    pub fn ntp_server(mut self, host: &str) -> Self {
        self.config.ntp_server = host.to_string();
        self
    }

    /// Set the mechanical movement range.
    #[must_use]
    pub fn movement_range(mut self, range: MovementRange) -> Self {
        self.config.movement_range = range;
        self
    }

    /// Set the serialized head-speed ceiling.
    #[must_use]
    pub fn head_movement_max_speed(mut self, speed: u32) -> Self {
        self.config.head_movement_max_speed = speed;
        self
    }

    /// Set the pose sampling lead in milliseconds.
    #[must_use]
    pub fn head_movement_prediction_ms(mut self, ms: u32) -> Self {
        self.config.head_movement_prediction_ms = ms;
        self
    }

    /// Set the displacement-proportional speed-boost gain.
    #[must_use]
    pub fn head_movement_speed_multiplier(mut self, gain: f32) -> Self {
        self.config.movement_range.speed_multiplier = gain;
        self
    }

    /// Enable or disable robot-control datagram sends.
    #[must_use]
    pub fn robot_control_enabled(mut self, enabled: bool) -> Self {
        self.config.robot_control_enabled = enabled;
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` for unknown resolution labels or inverted
    /// movement ranges. The error is synchronous; a running session
    /// keeps its previous configuration.
    pub fn build(mut self) -> Result<StreamingConfig, ConfigError> {
        if let Some(label) = self.resolution_label.take() {
            self.config.resolution = CameraResolution::from_label(&label)?;
        }
        self.config.movement_range.validate()?;
        Ok(self.config)
    }
}
