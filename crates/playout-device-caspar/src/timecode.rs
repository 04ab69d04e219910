use crate::content::SourceKind;
use playout_device::Millis;

/// `HH:MM:SS:FF`, where `FF` is a frame count at `time_base` frames per
/// second. Exact integer arithmetic throughout; the only rounding is the
/// millisecond-to-frame conversion, done with a half-up round.
#[must_use]
pub fn format_timecode(ms: Millis, time_base: u32) -> String {
	let total_seconds = ms / 1_000;
	let frac_ms = ms % 1_000;

	let mut hh = total_seconds / 3_600;
	let mut mm = (total_seconds % 3_600) / 60;
	let mut ss = total_seconds % 60;
	let mut ff = (frac_ms * u64::from(time_base) + 500) / 1_000;

	if ff >= u64::from(time_base) {
		ff -= u64::from(time_base);
		ss += 1;
	}
	if ss >= 60 {
		ss -= 60;
		mm += 1;
	}
	if mm >= 60 {
		mm -= 60;
		hh += 1;
	}

	format!("{hh:02}:{mm:02}:{ss:02}:{ff:02}")
}

/// Frames into the clip a layer starting playback *now* (`now >= start`)
/// should seek to. `Live` feeds and unknown-length looping files have no
/// meaningful seek position and always start at zero (`spec.md` §4.4).
#[must_use]
pub fn seek_frames(now: Millis, start: Millis, time_base: u32, source: &SourceKind) -> u64 {
	match source {
		SourceKind::Live | SourceKind::Route { .. } => 0,
		SourceKind::File { length_known: false } => 0,
		SourceKind::File { length_known: true } => {
			let elapsed = now.saturating_sub(start);
			elapsed * u64::from(time_base) / 1_000
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formats_whole_seconds_with_zero_frames() {
		assert_eq!(format_timecode(10_000, 25), "00:00:10:00");
	}

	#[test]
	fn formats_fractional_seconds_at_25fps() {
		assert_eq!(format_timecode(1_200, 25), "00:00:01:05");
	}

	#[test]
	fn formats_fractional_seconds_at_50fps() {
		assert_eq!(format_timecode(11_200, 50), "00:00:11:10");
	}

	#[test]
	fn carries_frame_overflow_into_seconds() {
		// 999ms at 25fps rounds to frame 25, which must carry into the next second.
		assert_eq!(format_timecode(999, 25), "00:00:01:00");
	}

	#[test]
	fn live_source_never_seeks() {
		assert_eq!(seek_frames(20_000, 5_000, 25, &SourceKind::Live), 0);
	}

	#[test]
	fn unknown_length_looping_file_never_seeks() {
		assert_eq!(seek_frames(20_000, 5_000, 25, &SourceKind::File { length_known: false }), 0);
	}

	#[test]
	fn known_length_file_seeks_elapsed_frames() {
		assert_eq!(seek_frames(10_200, 200, 25, &SourceKind::File { length_known: true }), 250);
	}
}
