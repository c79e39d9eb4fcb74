pub mod ecpix5;
pub mod generic;

use thiserror::Error;

/// Rejected configuration-time parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{axis} timing has a zero-width {field} field")]
    ZeroWidth {
        axis: &'static str,
        field: &'static str,
    },
    #[error("{axis} timing totals {whole}, which overflows the 16-bit counter")]
    AxisTooLong { axis: &'static str, whole: u32 },
    #[error("channel depth {0} is outside 1..=16")]
    InvalidDepth(u8),
    #[error("pin width {pins} does not fit a {depth}-bit channel")]
    InvalidPinWidth { pins: u8, depth: u8 },
    #[error("test card size {width}x{height} is empty")]
    InvalidCardSize { width: u16, height: u16 },
}
