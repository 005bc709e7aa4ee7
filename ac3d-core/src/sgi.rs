/// Decoder for SGI (`.rgb`, `.rgba`, `.bw`, ...) images
///
/// Layout: a 512-byte big-endian header followed by one plane per channel,
/// stored bottom row first, either verbatim or run-length encoded. Output is
/// always 8-bit RGBA with the top row first.
use byteorder::{BigEndian, ByteOrder};
use log::debug;

use crate::error::ImageError;

pub const HEADER_SIZE: usize = 512;
/// Value of the first two header bytes in well-formed files
pub const MAGIC: u16 = 474;

const STORAGE_OFFSET: usize = 2;
const XSIZE_OFFSET: usize = 6;
const YSIZE_OFFSET: usize = 8;
const ZSIZE_OFFSET: usize = 10;

/// File extensions routed to this decoder
const EXTENSIONS: &[&str] = &["sgi", "rgba", "rgb", "ra", "bw"];

/// Whether `filename` names an image this decoder handles, judging by its
/// extension
pub fn is_sgi_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Verbatim,
    Rle,
}

impl TryFrom<u8> for Storage {
    type Error = ImageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Verbatim),
            1 => Ok(Self::Rle),
            other => Err(ImageError::UnsupportedStorageMode(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub storage: Storage,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Self, ImageError> {
        if data.len() < HEADER_SIZE {
            return Err(ImageError::Truncated {
                needed: HEADER_SIZE,
                len: data.len(),
            });
        }
        if BigEndian::read_u16(data) != MAGIC {
            debug!("SGI header without magic number");
        }

        let storage = Storage::try_from(data[STORAGE_OFFSET])?;
        let width = usize::from(BigEndian::read_u16(&data[XSIZE_OFFSET..]));
        let height = usize::from(BigEndian::read_u16(&data[YSIZE_OFFSET..]));
        let channels = BigEndian::read_u16(&data[ZSIZE_OFFSET..]);

        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions);
        }
        if !(1..=4).contains(&channels) {
            return Err(ImageError::UnsupportedChannels(channels));
        }

        Ok(Self {
            storage,
            width,
            height,
            channels: usize::from(channels),
        })
    }

    /// Byte within an RGBA pixel that source channel `channel` lands in.
    /// Two-channel images are luminance plus alpha.
    fn channel_offset(&self, channel: usize) -> usize {
        if self.channels == 2 && channel == 1 {
            3
        } else {
            channel
        }
    }
}

/// An 8-bit RGBA image, top row first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl DecodedImage {
    /// Zeroed image, or `TooLarge` if the pixel buffer cannot be allocated
    fn blank(width: usize, height: usize) -> Result<Self, ImageError> {
        let bytes = width * height * 4;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| ImageError::TooLarge { bytes })?;
        data.resize(bytes, 0);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Whether both sides are powers of two, which decides texture wrap and
    /// mipmapping in the renderer
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Output row for source row `row`, counted from the bottom
    fn row_mut(&mut self, row: usize) -> &mut [u8] {
        let span = self.width * 4;
        let start = (self.height - 1 - row) * span;
        &mut self.data[start..start + span]
    }
}

/// Decode an SGI image into RGBA
pub fn decode(data: &[u8]) -> Result<DecodedImage, ImageError> {
    let header = Header::parse(data)?;

    // Input is checked against the header before any pixels are allocated.
    match header.storage {
        Storage::Verbatim => {
            let needed = verbatim_len(&header);
            if data.len() < needed {
                return Err(ImageError::Truncated {
                    needed,
                    len: data.len(),
                });
            }
            let mut image = DecodedImage::blank(header.width, header.height)?;
            decode_verbatim(&data[HEADER_SIZE..needed], &header, &mut image);
            Ok(finish(image, &header))
        }
        Storage::Rle => {
            let starts = read_offset_table(data, &header)?;
            let mut image = DecodedImage::blank(header.width, header.height)?;
            decode_rle(data, &starts, &header, &mut image)?;
            Ok(finish(image, &header))
        }
    }
}

fn finish(mut image: DecodedImage, header: &Header) -> DecodedImage {
    expand_channels(&mut image, header.channels);

    debug!(
        "decoded {}x{} SGI image, {} channels, {:?}",
        header.width, header.height, header.channels, header.storage
    );
    image
}

/// Header plus one byte per pixel per channel
fn verbatim_len(header: &Header) -> usize {
    HEADER_SIZE + header.width * header.height * header.channels
}

/// `planes` holds exactly the pixel bytes following the header
fn decode_verbatim(planes: &[u8], header: &Header, image: &mut DecodedImage) {
    let mut rows = planes.chunks_exact(header.width);
    for channel in 0..header.channels {
        let offset = header.channel_offset(channel);
        for row in 0..header.height {
            let Some(source) = rows.next() else {
                return;
            };
            for (pixel, &value) in image.row_mut(row).chunks_exact_mut(4).zip(source) {
                pixel[offset] = value;
            }
        }
    }
}

/// Row start offsets, one per row per channel. Every offset must point
/// inside `data`.
fn read_offset_table(data: &[u8], header: &Header) -> Result<Vec<u32>, ImageError> {
    let rows = header.height * header.channels;
    let table_end = HEADER_SIZE + rows * 4;
    if data.len() < table_end {
        return Err(ImageError::Truncated {
            needed: table_end,
            len: data.len(),
        });
    }

    let mut starts = vec![0u32; rows];
    BigEndian::read_u32_into(&data[HEADER_SIZE..table_end], &mut starts);
    if let Some(&start) = starts.iter().find(|&&start| start as usize >= data.len()) {
        return Err(ImageError::Truncated {
            needed: start as usize + 1,
            len: data.len(),
        });
    }
    Ok(starts)
}

fn decode_rle(
    data: &[u8],
    starts: &[u32],
    header: &Header,
    image: &mut DecodedImage,
) -> Result<(), ImageError> {
    for channel in 0..header.channels {
        let offset = header.channel_offset(channel);
        for row in 0..header.height {
            let start = starts[channel * header.height + row] as usize;
            decode_rle_row(data, start, image.row_mut(row), offset)
                .map_err(|e| match e {
                    ImageError::RowOverflow { .. } => ImageError::RowOverflow { row, channel },
                    other => other,
                })?;
        }
    }
    Ok(())
}

/// Decode one run-length row into every fourth byte of `row`, starting at
/// `offset`
fn decode_rle_row(data: &[u8], start: usize, row: &mut [u8], offset: usize) -> Result<(), ImageError> {
    let byte = |at: usize| {
        data.get(at).copied().ok_or(ImageError::Truncated {
            needed: at + 1,
            len: data.len(),
        })
    };
    let mut pixels = row.chunks_exact_mut(4).map(|pixel| &mut pixel[offset]);
    let overflow = ImageError::RowOverflow { row: 0, channel: 0 };

    let mut src = start;
    loop {
        let control = byte(src)?;
        src += 1;
        let count = usize::from(control & 0x7f);
        if count == 0 {
            return Ok(());
        }

        if control & 0x80 != 0 {
            for _ in 0..count {
                *pixels.next().ok_or(overflow.clone())? = byte(src)?;
                src += 1;
            }
        } else {
            let value = byte(src)?;
            src += 1;
            for _ in 0..count {
                *pixels.next().ok_or(overflow.clone())? = value;
            }
        }
    }
}

/// Fill the RGBA bytes a source with fewer than four channels left unset
fn expand_channels(image: &mut DecodedImage, channels: usize) {
    for pixel in image.data.chunks_exact_mut(4) {
        match channels {
            1 => {
                pixel[1] = pixel[0];
                pixel[2] = pixel[0];
                pixel[3] = 255;
            }
            2 => {
                pixel[1] = pixel[0];
                pixel[2] = pixel[0];
            }
            3 => pixel[3] = 255,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(storage: u8, width: u16, height: u16, channels: u16) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        BigEndian::write_u16(&mut data[0..], MAGIC);
        data[STORAGE_OFFSET] = storage;
        data[3] = 1;
        BigEndian::write_u16(&mut data[XSIZE_OFFSET..], width);
        BigEndian::write_u16(&mut data[YSIZE_OFFSET..], height);
        BigEndian::write_u16(&mut data[ZSIZE_OFFSET..], channels);
        data
    }

    #[test]
    fn test_verbatim_rows_are_flipped() {
        // 2x2 greyscale, bottom row first in the file.
        let mut data = header(0, 2, 2, 1);
        data.extend_from_slice(&[10, 20, 30, 40]);
        let image = decode(&data).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
        assert_eq!(image.pixel(0, 0), [30, 30, 30, 255]);
        assert_eq!(image.pixel(1, 0), [40, 40, 40, 255]);
        assert_eq!(image.pixel(0, 1), [10, 10, 10, 255]);
        assert_eq!(image.pixel(1, 1), [20, 20, 20, 255]);
    }

    #[test]
    fn test_luminance_alpha() {
        let mut data = header(0, 1, 1, 2);
        data.extend_from_slice(&[100, 7]);
        let image = decode(&data).unwrap();
        assert_eq!(image.pixel(0, 0), [100, 100, 100, 7]);
    }

    #[test]
    fn test_rgb_forces_opaque() {
        let mut data = header(0, 1, 1, 3);
        data.extend_from_slice(&[1, 2, 3]);
        assert_eq!(decode(&data).unwrap().pixel(0, 0), [1, 2, 3, 255]);

        let mut data = header(0, 1, 1, 4);
        data.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(decode(&data).unwrap().pixel(0, 0), [1, 2, 3, 4]);
    }

    #[test]
    fn test_rle_runs() {
        // One 5-pixel greyscale row: a literal run of 2, then a repeat of 3.
        let mut data = header(1, 5, 1, 1);
        let start = (HEADER_SIZE + 4) as u32;
        data.extend_from_slice(&start.to_be_bytes());
        data.extend_from_slice(&[0x82, 9, 8, 0x03, 5, 0x00]);
        let image = decode(&data).unwrap();
        let row: Vec<u8> = (0..5).map(|x| image.pixel(x, 0)[0]).collect();
        assert_eq!(row, vec![9, 8, 5, 5, 5]);
    }

    #[test]
    fn test_rle_overflow() {
        let mut data = header(1, 2, 1, 1);
        let start = (HEADER_SIZE + 4) as u32;
        data.extend_from_slice(&start.to_be_bytes());
        data.extend_from_slice(&[0x03, 5, 0x00]);
        assert_eq!(
            decode(&data),
            Err(ImageError::RowOverflow { row: 0, channel: 0 })
        );
    }

    #[test]
    fn test_rle_truncated() {
        let mut data = header(1, 2, 1, 1);
        let start = (HEADER_SIZE + 4) as u32;
        data.extend_from_slice(&start.to_be_bytes());
        data.extend_from_slice(&[0x82, 5]);
        assert!(matches!(decode(&data), Err(ImageError::Truncated { .. })));
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(
            decode(&[0u8; 100]),
            Err(ImageError::Truncated { needed: 512, .. })
        ));
        assert_eq!(
            decode(&header(2, 1, 1, 1)),
            Err(ImageError::UnsupportedStorageMode(2))
        );
        assert_eq!(
            decode(&header(0, 1, 1, 5)),
            Err(ImageError::UnsupportedChannels(5))
        );
        assert_eq!(decode(&header(0, 0, 1, 1)), Err(ImageError::InvalidDimensions));
        assert!(matches!(
            decode(&header(0, 2, 2, 1)),
            Err(ImageError::Truncated { .. })
        ));
    }

    #[test]
    fn test_oversized_header_fails_before_decoding() {
        // Claims 65535x65535x4 with no pixel data behind it.
        assert_eq!(
            decode(&header(0, u16::MAX, u16::MAX, 4)),
            Err(ImageError::Truncated {
                needed: HEADER_SIZE + 65535 * 65535 * 4,
                len: HEADER_SIZE,
            })
        );
        assert_eq!(
            decode(&header(1, u16::MAX, u16::MAX, 4)),
            Err(ImageError::Truncated {
                needed: HEADER_SIZE + 65535 * 4 * 4,
                len: HEADER_SIZE,
            })
        );
    }

    #[test]
    fn test_rle_offset_past_end() {
        let mut data = header(1, 1000, 1, 1);
        data.extend_from_slice(&10_000u32.to_be_bytes());
        assert_eq!(
            decode(&data),
            Err(ImageError::Truncated {
                needed: 10_001,
                len: HEADER_SIZE + 4,
            })
        );
    }

    #[test]
    fn test_extensions() {
        assert!(is_sgi_extension("textures/wood.RGB"));
        assert!(is_sgi_extension("panel.rgba"));
        assert!(is_sgi_extension("mask.bw"));
        assert!(!is_sgi_extension("photo.png"));
        assert!(!is_sgi_extension("rgb"));
    }

    #[test]
    fn test_power_of_two() {
        let image = DecodedImage::blank(64, 32).unwrap();
        assert!(image.is_power_of_two());
        let image = DecodedImage::blank(64, 48).unwrap();
        assert!(!image.is_power_of_two());
    }
}
