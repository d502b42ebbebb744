//! Frame acquisition.
//!
//! The control loop only knows the `FrameSource` trait; the `xcap`-backed
//! implementation captures whichever monitor contains the configured region
//! and crops to it. Any failure along the way yields `None`; a missed frame
//! is routine, not an error.

use vision::{Frame, Rect};

use crate::config::CaptureRegion;

pub trait FrameSource {
	fn capture(&mut self) -> Option<Frame>;
}

pub struct MonitorRegionSource {
	region: CaptureRegion,
	max_height: Option<u32>,
}

impl MonitorRegionSource {
	pub fn new(region: CaptureRegion, max_height: Option<u32>) -> Self {
		Self { region, max_height }
	}

	fn find_monitor(&self) -> Option<xcap::Monitor> {
		let monitors = xcap::Monitor::all().ok()?;
		monitors.into_iter().find(|monitor| {
			let (Ok(x), Ok(y), Ok(w), Ok(h)) = (
				monitor.x(),
				monitor.y(),
				monitor.width(),
				monitor.height(),
			) else {
				return false;
			};
			self.region.left >= x
				&& self.region.left < x + w as i32
				&& self.region.top >= y
				&& self.region.top < y + h as i32
		})
	}
}

impl FrameSource for MonitorRegionSource {
	fn capture(&mut self) -> Option<Frame> {
		let monitor = self.find_monitor()?;
		let image = monitor.capture_image().ok()?;
		let origin_x = monitor.x().ok()?;
		let origin_y = monitor.y().ok()?;

		let full = Frame::from_rgba(image.width() as usize, image.as_raw());
		let mut frame = full.crop(Rect::new(
			(self.region.left - origin_x).max(0) as u32,
			(self.region.top - origin_y).max(0) as u32,
			self.region.width,
			self.region.height,
		));

		if let Some(max_height) = self.max_height {
			frame.resize_max_height(max_height);
		}

		Some(frame)
	}
}
