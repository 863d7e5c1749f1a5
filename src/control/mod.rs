//! Control plane back to the robot.
//!
//! Two egress paths share the robot's address but never a socket: the
//! request/response [`ControlLink`] answering the robot's polls with
//! priority-collapsed servo commands, and the fire-and-forget
//! [`RobotControlSender`] streaming head poses and base velocities.

pub mod hud;
pub mod link;
pub mod pose;
pub mod queue;
pub mod robot;

pub use hud::{HudSnapshot, HudState, TeleoperationUpdate};
pub use link::ControlLink;
pub use pose::{PoseMapper, ELEVATION_BOOST_BIAS, FILTER_BETA};
pub use queue::{Priority, TaskQueue};
pub use robot::RobotControlSender;

#[cfg(test)]
mod tests;
