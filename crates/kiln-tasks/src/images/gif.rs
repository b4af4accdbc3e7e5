//! GIF re-encoding.

use std::borrow::Cow;

use super::OptimizeError;

/// Row order of the four GIF interlace passes as `(first row, step)`.
const INTERLACE_PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Re-encode every frame, optionally interlaced.
///
/// Palettes, frame delays, disposal and the loop count are kept as decoded.
pub(crate) fn optimize(data: &[u8], interlaced: bool) -> Result<Vec<u8>, OptimizeError> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(data)?;

    let (width, height) = (decoder.width(), decoder.height());
    let global_palette = decoder.global_palette().map(<[u8]>::to_vec).unwrap_or_default();
    let repeat = decoder.repeat();

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame()? {
        frames.push(frame.clone());
    }

    let mut out = Vec::with_capacity(data.len());
    {
        let mut encoder = gif::Encoder::new(&mut out, width, height, &global_palette)?;
        if frames.len() > 1 {
            encoder.set_repeat(repeat)?;
        }
        for mut frame in frames {
            // The decoder hands out rows in display order regardless of the source flag
            if interlaced {
                let rows = interlace(&frame.buffer, usize::from(frame.width));
                frame.buffer = Cow::Owned(rows);
            }
            frame.interlaced = interlaced;
            encoder.write_frame(&frame)?;
        }
    }
    Ok(out)
}

/// Reorder display-order rows into interlaced storage order.
fn interlace(buffer: &[u8], width: usize) -> Vec<u8> {
    let rows: Vec<&[u8]> = buffer.chunks(width.max(1)).collect();
    let mut out = Vec::with_capacity(buffer.len());
    for (first, step) in INTERLACE_PASSES {
        for row in rows.iter().skip(first).step_by(step) {
            out.extend_from_slice(row);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PALETTE: [u8; 6] = [0, 0, 0, 255, 255, 255];

    /// A 4x10 two-frame GIF whose row `n` is filled with `n % 2`.
    fn striped_gif() -> (Vec<u8>, Vec<u8>) {
        let pixels: Vec<u8> = (0..10u8).flat_map(|row| [row % 2; 4]).collect();
        let mut data = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut data, 4, 10, &PALETTE).unwrap();
            encoder.set_repeat(gif::Repeat::Infinite).unwrap();
            for _ in 0..2 {
                let mut frame = gif::Frame::default();
                frame.width = 4;
                frame.height = 10;
                frame.delay = 10;
                frame.buffer = Cow::Owned(pixels.clone());
                encoder.write_frame(&frame).unwrap();
            }
        }
        (data, pixels)
    }

    /// Decode every frame as `(interlace flag, display-order pixels, delay)`.
    ///
    /// The flag is read from the frame descriptor before the pixels, since
    /// reading a frame deinterlaces it and clears the flag.
    fn decode(data: &[u8]) -> Vec<(bool, Vec<u8>, u16)> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(data).unwrap();
        let mut frames = Vec::new();
        while let Some(frame) = decoder.next_frame_info().unwrap() {
            let (interlaced, delay) = (frame.interlaced, frame.delay);
            let mut buffer = vec![0; decoder.buffer_size()];
            decoder.read_into_buffer(&mut buffer).unwrap();
            frames.push((interlaced, buffer, delay));
        }
        frames
    }

    #[test]
    fn test_interlace_row_order() {
        let buffer: Vec<u8> = (0..10).collect();
        assert_eq!(interlace(&buffer, 1), vec![0, 8, 4, 2, 6, 1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_interlace_keeps_whole_rows() {
        let buffer = [1, 1, 2, 2, 3, 3];
        assert_eq!(interlace(&buffer, 2), vec![1, 1, 3, 3, 2, 2]);
    }

    #[test]
    fn test_optimize_interlaces_every_frame() {
        let (data, pixels) = striped_gif();

        let optimized = optimize(&data, true).unwrap();

        let frames = decode(&optimized);
        assert_eq!(frames.len(), 2);
        for (interlaced, buffer, delay) in frames {
            assert!(interlaced, "frame descriptor is not interlaced");
            assert_eq!(buffer, pixels);
            assert_eq!(delay, 10);
        }
    }

    #[test]
    fn test_optimize_without_interlacing() {
        let (data, pixels) = striped_gif();

        let optimized = optimize(&data, false).unwrap();

        let frames = decode(&optimized);
        assert!(frames.iter().all(|(interlaced, buffer, _)| !interlaced && *buffer == pixels));
    }

    #[test]
    fn test_invalid_gif() {
        let result = optimize(b"GIF89a-not-really", true);
        assert!(matches!(result, Err(OptimizeError::GifDecode(_))));
    }
}
