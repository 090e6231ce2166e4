//! PNG encoding for straight-alpha RGBA pixels.
//!
//! Track renderings usually hold few distinct colours (a background plus the
//! palette steps actually used), so [`encode_png`] first tries an indexed
//! image (colour type 3) and falls back to full RGBA (colour type 6) when more
//! than 256 colours are present.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use rayon::prelude::*;
use track_common::{GeekError, GeekResult};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colours in an indexed image.
const MAX_PALETTE_SIZE: usize = 256;

/// Pixel count above which colour indexing runs on the rayon pool.
const PARALLEL_THRESHOLD: usize = 64 * 64;

const COLOUR_TYPE_INDEXED: u8 = 3;
const COLOUR_TYPE_RGBA: u8 = 6;

/// A palette plus one palette index per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedImage {
    pub palette: Vec<[u8; 4]>,
    pub indices: Vec<u8>,
}

/// Encode RGBA pixels, choosing indexed or RGBA output.
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> GeekResult<Vec<u8>> {
    check_dimensions(pixels.len(), width, height, 4)?;
    match index_colours(pixels) {
        Some(indexed) => encode_indexed(&indexed, width, height),
        None => encode_rgba(pixels, width, height),
    }
}

/// Build a palette for `pixels`, or `None` if they use more than 256 colours.
pub fn index_colours(pixels: &[u8]) -> Option<IndexedImage> {
    if pixels.len() / 4 >= PARALLEL_THRESHOLD {
        index_colours_parallel(pixels)
    } else {
        index_colours_sequential(pixels)
    }
}

fn pack(pixel: &[u8]) -> u32 {
    u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]])
}

fn index_colours_sequential(pixels: &[u8]) -> Option<IndexedImage> {
    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for pixel in pixels.chunks_exact(4) {
        let key = pack(pixel);
        let index = match lookup.get(&key) {
            Some(&index) => index,
            None => {
                if palette.len() == MAX_PALETTE_SIZE {
                    return None;
                }
                let index = palette.len() as u8;
                palette.push([pixel[0], pixel[1], pixel[2], pixel[3]]);
                lookup.insert(key, index);
                index
            }
        };
        indices.push(index);
    }
    Some(IndexedImage { palette, indices })
}

/// Collect distinct colours per chunk in parallel, merge them, then map
/// pixels to indices in parallel.
fn index_colours_parallel(pixels: &[u8]) -> Option<IndexedImage> {
    let pixels_per_chunk = (pixels.len() / 4 / rayon::current_num_threads()).max(256);
    let chunk_bytes = pixels_per_chunk * 4;

    let per_chunk: Vec<HashSet<u32>> = pixels
        .par_chunks(chunk_bytes)
        .map(|chunk| {
            let mut seen = HashSet::with_capacity(MAX_PALETTE_SIZE);
            for pixel in chunk.chunks_exact(4) {
                seen.insert(pack(pixel));
                if seen.len() > MAX_PALETTE_SIZE {
                    break;
                }
            }
            seen
        })
        .collect();

    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for key in per_chunk.into_iter().flatten() {
        if lookup.contains_key(&key) {
            continue;
        }
        if palette.len() == MAX_PALETTE_SIZE {
            return None;
        }
        lookup.insert(key, palette.len() as u8);
        palette.push(key.to_le_bytes());
    }

    let indices: Vec<u8> = pixels
        .par_chunks(chunk_bytes)
        .flat_map_iter(|chunk| {
            chunk
                .chunks_exact(4)
                .map(|pixel| lookup.get(&pack(pixel)).copied().unwrap_or(0))
                .collect::<Vec<u8>>()
        })
        .collect();

    Some(IndexedImage { palette, indices })
}

/// Encode an indexed image, adding a tRNS chunk when any entry is translucent.
pub fn encode_indexed(image: &IndexedImage, width: u32, height: u32) -> GeekResult<Vec<u8>> {
    check_dimensions(image.indices.len(), width, height, 1)?;
    if image.palette.is_empty() || image.palette.len() > MAX_PALETTE_SIZE {
        return Err(GeekError::Render(format!(
            "Indexed PNG needs 1 to {} palette entries, got {}",
            MAX_PALETTE_SIZE,
            image.palette.len()
        )));
    }

    let mut png = start_png(width, height, COLOUR_TYPE_INDEXED);

    let plte: Vec<u8> = image.palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if image.palette.iter().any(|c| c[3] < u8::MAX) {
        let trns: Vec<u8> = image.palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = compress_scanlines(&image.indices, width as usize)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Encode full 8-bit RGBA.
pub fn encode_rgba(pixels: &[u8], width: u32, height: u32) -> GeekResult<Vec<u8>> {
    check_dimensions(pixels.len(), width, height, 4)?;
    let mut png = start_png(width, height, COLOUR_TYPE_RGBA);
    let idat = compress_scanlines(pixels, width as usize * 4)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn check_dimensions(len: usize, width: u32, height: u32, bytes_per_pixel: usize) -> GeekResult<()> {
    let expected = width as usize * height as usize * bytes_per_pixel;
    if width == 0 || height == 0 || len != expected {
        return Err(GeekError::Render(format!(
            "Pixel buffer of {} bytes does not match a {}x{} image",
            len, width, height
        )));
    }
    Ok(())
}

/// Signature plus IHDR for an 8-bit, non-interlaced image.
fn start_png(width: u32, height: u32, colour_type: u8) -> Vec<u8> {
    let mut png = SIGNATURE.to_vec();
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    // bit depth, colour type, compression, filter, interlace
    ihdr.extend_from_slice(&[8, colour_type, 0, 0, 0]);
    write_chunk(&mut png, b"IHDR", &ihdr);
    png
}

/// Prefix every row with filter type 0 and zlib-compress the result.
fn compress_scanlines(data: &[u8], row_bytes: usize) -> GeekResult<Vec<u8>> {
    let mut raw = Vec::with_capacity(data.len() + data.len() / row_bytes.max(1));
    for row in data.chunks_exact(row_bytes) {
        raw.push(0);
        raw.extend_from_slice(row);
    }
    let compression_failed = |e: std::io::Error| GeekError::Render(format!("IDAT compression failed: {}", e));
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).map_err(compression_failed)?;
    encoder.finish().map_err(compression_failed)
}

fn write_chunk(png: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let crc_start = png.len();
    png.extend_from_slice(kind);
    png.extend_from_slice(data);
    let crc = crc32fast::hash(&png[crc_start..]);
    png.extend_from_slice(&crc.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_colours_sequential() {
        let pixels = [
            255, 0, 0, 255, //
            0, 255, 0, 255, //
            255, 0, 0, 255, //
        ];
        let indexed = index_colours_sequential(&pixels).unwrap();
        assert_eq!(indexed.palette, vec![[255, 0, 0, 255], [0, 255, 0, 255]]);
        assert_eq!(indexed.indices, vec![0, 1, 0]);
    }

    #[test]
    fn test_index_colours_parallel_matches_pixels() {
        let colours = [[10, 20, 30, 255], [40, 50, 60, 128], [0, 0, 0, 0]];
        let mut pixels = Vec::new();
        for i in 0..(128 * 128) {
            pixels.extend_from_slice(&colours[i % 3]);
        }
        let indexed = index_colours_parallel(&pixels).unwrap();
        assert_eq!(indexed.palette.len(), 3);
        for (i, &index) in indexed.indices.iter().enumerate() {
            assert_eq!(indexed.palette[index as usize], colours[i % 3]);
        }
    }

    #[test]
    fn test_too_many_colours() {
        let pixels: Vec<u8> = (0..300u32).flat_map(|i| [i as u8, (i >> 8) as u8, 0, 255]).collect();
        assert!(index_colours(&pixels).is_none());
    }

    #[test]
    fn test_chunk_crc() {
        let mut png = Vec::new();
        write_chunk(&mut png, b"IEND", &[]);
        // Well-known IEND chunk bytes
        assert_eq!(png, vec![0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130]);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(encode_png(&[0, 0, 0, 255], 2, 1).is_err());
        assert!(encode_rgba(&[], 0, 0).is_err());
    }
}
