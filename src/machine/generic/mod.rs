pub mod i2c;
pub mod init;
pub mod testcard;
pub mod vsync;
