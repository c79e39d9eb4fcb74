use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::machine::ecpix5::TransmitterPort;

/// A complete picture as seen on the transmitter port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pin_width: u8,
    pixels: Vec<[u16; 3]>,
}

impl Frame {
    fn new(width: usize, height: usize, pin_width: u8) -> Self {
        Self {
            width,
            height,
            pin_width,
            pixels: vec![[0; 3]; width * height],
        }
    }

    /// Pixel value at the port's pin width.
    pub fn pixel(&self, x: usize, y: usize) -> [u16; 3] {
        self.pixels[y * self.width + x]
    }

    /// Pixel value scaled to 8 bits per channel.
    pub fn rgb8(&self, x: usize, y: usize) -> [u8; 3] {
        self.pixel(x, y).map(|c| {
            if self.pin_width >= 8 {
                (c >> (self.pin_width - 8)) as u8
            } else {
                (c << (8 - self.pin_width)) as u8
            }
        })
    }

    /// Binary PPM (P6), 8 bits per channel.
    pub fn write_ppm(&self, mut w: impl Write) -> io::Result<()> {
        write!(w, "P6\n{} {}\n255\n", self.width, self.height)?;
        for y in 0..self.height {
            for x in 0..self.width {
                w.write_all(&self.rgb8(x, y))?;
            }
        }
        w.flush()
    }

    pub fn save_ppm(&self, path: &Path) -> io::Result<()> {
        self.write_ppm(BufWriter::new(File::create(path)?))
    }
}

/// Rebuilds frames from the port's sync and data-enable signals, the way a
/// sink would: vsync starts a frame, each data-enable run is one line.
pub struct FrameCapture {
    current: Frame,
    last: Option<Frame>,
    /// Seen a vsync, so `current` started at the top of a frame.
    locked: bool,
    line: Option<usize>,
    x: usize,
    last_de: bool,
    last_vsync: bool,
}

impl FrameCapture {
    pub fn new(width: usize, height: usize, pin_width: u8) -> Self {
        Self {
            current: Frame::new(width, height, pin_width),
            last: None,
            locked: false,
            line: None,
            x: 0,
            last_de: false,
            last_vsync: false,
        }
    }

    /// The most recent complete frame.
    pub fn frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }

    pub fn sample(&mut self, port: &TransmitterPort) {
        if port.vsync && !self.last_vsync {
            let lines = self.line.map_or(0, |l| l + 1);
            if self.locked && lines == self.current.height {
                debug!("capture: frame complete");
                self.last = Some(self.current.clone());
            } else if self.locked {
                debug!("capture: dropped frame with {lines} lines");
            }
            self.locked = true;
            self.line = None;
            self.current.pixels.fill([0; 3]);
        }
        self.last_vsync = port.vsync;

        if port.de && !self.last_de {
            self.line = Some(self.line.map_or(0, |l| l + 1));
            self.x = 0;
        }
        self.last_de = port.de;

        if !(self.locked && port.de) {
            return;
        }
        let Some(y) = self.line else {
            return;
        };
        if self.x < self.current.width && y < self.current.height {
            let index = y * self.current.width + self.x;
            self.current.pixels[index] = [port.r, port.g, port.b];
        } else {
            trace!("capture: pixel ({}, {y}) outside frame", self.x);
        }
        self.x += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::ecpix5::{DviConfig, DviTester, Variant};
    use crate::machine::generic::testcard::{DISC, GRID_BACKGROUND, GRID_LINE};

    fn capture_frames(variant: Variant, frames: u64) -> (DviTester, FrameCapture) {
        let mut dvi = DviTester::new(&DviConfig {
            variant,
            bus_divisor: 8,
            ..Default::default()
        })
        .unwrap();
        let mut capture = FrameCapture::new(1024, 768, variant.pin_width());
        while dvi.frames() <= frames {
            capture.sample(&dvi.port());
            dvi.tick();
        }
        (dvi, capture)
    }

    #[test]
    fn test_captures_xga_test_card() {
        let (_, capture) = capture_frames(Variant::Ecpix5_85, 2);
        let frame = capture.frame().unwrap();
        assert_eq!((frame.width, frame.height), (1024, 768));
        assert_eq!(frame.pixel(512, 384), [DISC.r, DISC.g, DISC.b]);
        // Frame counter was 2 while this frame was drawn.
        assert_eq!(frame.pixel(2, 5), [GRID_LINE.r, GRID_LINE.g, GRID_LINE.b]);
        assert_eq!(frame.pixel(5, 130), [GRID_LINE.r, GRID_LINE.g, GRID_LINE.b]);
        assert_eq!(frame.pixel(0, 0), [0x600, 0x600, 0x600]);
        assert_eq!(frame.pixel(0, 0)[0], GRID_BACKGROUND.r);
    }

    #[test]
    fn test_no_frame_before_lock() {
        let mut capture = FrameCapture::new(4, 4, 12);
        let port = TransmitterPort {
            de: true,
            ..Default::default()
        };
        for _ in 0..100 {
            capture.sample(&port);
        }
        assert!(capture.frame().is_none());
    }

    #[test]
    fn test_ppm_output() {
        let (_, capture) = capture_frames(Variant::Ecpix5_45, 1);
        let frame = capture.frame().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.ppm");
        frame.save_ppm(&path).unwrap();

        let data = std::fs::read(&path).unwrap();
        let header = b"P6\n1024 768\n255\n";
        assert!(data.starts_with(header));
        assert_eq!(data.len(), header.len() + 1024 * 768 * 3);
        let center = header.len() + (384 * 1024 + 512) * 3;
        assert_eq!(&data[center..center + 3], &[0xf0, 0x39, 0xf3]);
    }

    #[test]
    fn test_rgb8_scaling() {
        let mut frame = Frame::new(1, 1, 12);
        frame.pixels[0] = [0xfff, 0x600, 0x394];
        assert_eq!(frame.rgb8(0, 0), [0xff, 0x60, 0x39]);
        let mut frame = Frame::new(1, 1, 4);
        frame.pixels[0] = [0xf, 0x6, 0x0];
        assert_eq!(frame.rgb8(0, 0), [0xf0, 0x60, 0x00]);
    }
}
