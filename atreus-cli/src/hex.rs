//! Intel HEX firmware images, as written by `avr-objcopy -O ihex`.

use anyhow::{bail, ensure, Context, Result};

/// A contiguous run of bytes at an absolute address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub address: u32,
    pub data: Vec<u8>,
}

/// A flat firmware image starting at `base`; gaps are filled with 0xFF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub base: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
enum Record {
    Data { offset: u16, bytes: Vec<u8> },
    EndOfFile,
    /// Types 02 and 04 move the base added to later data offsets.
    Base(u32),
    /// Types 03 and 05 carry an entry point, which the bootloader ignores.
    StartAddress,
}

/// Parse one `:`-prefixed line and verify its checksum.
fn parse_record(line: &str) -> Result<Record> {
    let Some(hex) = line.strip_prefix(':') else {
        bail!("missing start code ':'");
    };
    let bytes = decode_hex_bytes(hex).context("invalid hex data")?;
    ensure!(bytes.len() >= 5, "record too short");

    let count = bytes[0] as usize;
    ensure!(
        bytes.len() == count + 5,
        "expected {} data bytes, got {}",
        count,
        bytes.len() - 5
    );
    // All bytes, checksum included, sum to zero mod 256.
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    ensure!(sum == 0, "checksum mismatch");

    let offset = u16::from_be_bytes([bytes[1], bytes[2]]);
    let payload = &bytes[4..4 + count];
    let record = match bytes[3] {
        0x00 => Record::Data {
            offset,
            bytes: payload.to_vec(),
        },
        0x01 => Record::EndOfFile,
        0x02 | 0x04 => {
            ensure!(count == 2, "base address record must carry 2 bytes");
            let value = u16::from_be_bytes([payload[0], payload[1]]) as u32;
            Record::Base(if bytes[3] == 0x02 { value << 4 } else { value << 16 })
        }
        0x03 | 0x05 => Record::StartAddress,
        other => bail!("unsupported record type 0x{:02X}", other),
    };
    Ok(record)
}

/// Parse HEX text into address-ordered segments, merging contiguous data.
pub fn parse_segments(input: &str) -> Result<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut base = 0u32;

    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = parse_record(line).with_context(|| format!("line {}", index + 1))?;

        match record {
            Record::Data { offset, bytes } => {
                let address = base + offset as u32;
                match segments.last_mut() {
                    Some(last) if last.address + last.data.len() as u32 == address => {
                        last.data.extend_from_slice(&bytes);
                    }
                    _ => segments.push(Segment {
                        address,
                        data: bytes,
                    }),
                }
            }
            Record::EndOfFile => break,
            Record::Base(value) => base = value,
            Record::StartAddress => {}
        }
    }

    segments.sort_by_key(|s| s.address);
    Ok(segments)
}

impl Image {
    /// Lay segments out in one buffer spanning the lowest to highest address.
    pub fn from_segments(segments: &[Segment]) -> Result<Self> {
        let (Some(first), Some(end)) = (
            segments.iter().map(|s| s.address).min(),
            segments
                .iter()
                .map(|s| s.address + s.data.len() as u32)
                .max(),
        ) else {
            bail!("no data segments in HEX file");
        };

        let mut data = vec![0xFFu8; (end - first) as usize];
        for segment in segments {
            let start = (segment.address - first) as usize;
            data[start..start + segment.data.len()].copy_from_slice(&segment.data);
        }
        Ok(Self { base: first, data })
    }

    /// Extend the image downwards with erased bytes so `base` is a
    /// multiple of `align`.
    pub fn aligned(&self, align: u32) -> Self {
        let base = self.base - self.base % align;
        let mut data = vec![0xFFu8; (self.base - base) as usize];
        data.extend_from_slice(&self.data);
        Self { base, data }
    }

    /// One past the last byte of the image.
    pub fn end(&self) -> u32 {
        self.base + self.data.len() as u32
    }
}

/// Read a whole HEX file into a flat image.
pub fn load(input: &str) -> Result<Image> {
    let segments = parse_segments(input).context("parsing Intel HEX file")?;
    Image::from_segments(&segments)
}

fn decode_hex_bytes(hex: &str) -> Result<Vec<u8>> {
    ensure!(hex.len() % 2 == 0, "odd number of hex characters");
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            let pair = hex
                .get(i..i + 2)
                .with_context(|| format!("non-ASCII data at position {}", i))?;
            u8::from_str_radix(pair, 16).with_context(|| format!("invalid hex at position {}", i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_data_record() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F78\n\
                   :00000001FF\n";
        let segments = parse_segments(hex).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].address, 0);
        assert_eq!(segments[0].data, (0u8..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_segment_base() {
        let hex = ":020000020100FB\n\
                   :10000000112233445566778899AABBCCDDEEFF00F8\n\
                   :00000001FF\n";
        let segments = parse_segments(hex).unwrap();
        // 0x0100 << 4
        assert_eq!(segments[0].address, 0x1000);
    }

    #[test]
    fn test_linear_base_and_start_address() {
        let hex = ":020000040001F9\n\
                   :0100000055AA\n\
                   :0400000500000000F7\n\
                   :00000001FF\n";
        let segments = parse_segments(hex).unwrap();
        assert_eq!(
            segments,
            vec![Segment {
                address: 0x1_0000,
                data: vec![0x55]
            }]
        );
    }

    #[test]
    fn test_bad_checksum() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F00\n";
        let err = parse_segments(hex).unwrap_err();
        assert!(format!("{:#}", err).contains("checksum"));
    }

    #[test]
    fn test_missing_start_code() {
        assert!(parse_segments("00000001FF\n").is_err());
    }

    #[test]
    fn test_records_after_eof_are_ignored() {
        let hex = ":0100000055AA\n\
                   :00000001FF\n\
                   :0100010066AA\n";
        let segments = parse_segments(hex).unwrap();
        assert_eq!(segments[0].data, vec![0x55]);
    }

    #[test]
    fn test_contiguous_records_merge() {
        let hex = ":04000000AABBCCDDEE\n\
                   :04000400112233444E\n\
                   :00000001FF\n";
        let segments = parse_segments(hex).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(
            segments[0].data,
            vec![0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44]
        );
    }

    #[test]
    fn test_image_fills_gaps() {
        let segments = vec![
            Segment {
                address: 0x100,
                data: vec![0xAA, 0xBB],
            },
            Segment {
                address: 0x110,
                data: vec![0xCC, 0xDD],
            },
        ];
        let image = Image::from_segments(&segments).unwrap();
        assert_eq!(image.base, 0x100);
        assert_eq!(image.data.len(), 0x12);
        assert_eq!(image.end(), 0x112);
        assert_eq!(&image.data[..3], &[0xAA, 0xBB, 0xFF]);
        assert_eq!(&image.data[0x10..], &[0xCC, 0xDD]);
    }

    #[test]
    fn test_aligned_pads_front() {
        let image = load(":01001000559A\n:00000001FF\n").unwrap();
        assert_eq!(image.base, 0x10);

        let image = image.aligned(128);
        assert_eq!(image.base, 0);
        assert_eq!(image.data.len(), 0x11);
        assert!(image.data[..0x10].iter().all(|&b| b == 0xFF));
        assert_eq!(image.data[0x10], 0x55);
        assert_eq!(image.end(), 0x11);
    }

    #[test]
    fn test_aligned_keeps_aligned_image() {
        let image = Image {
            base: 0x100,
            data: vec![1, 2, 3],
        };
        assert_eq!(image.aligned(128), image);
    }

    #[test]
    fn test_empty_image_is_an_error() {
        assert!(load(":00000001FF\n").is_err());
    }
}
