//! PNG `tEXt` chunk embedding.
//!
//! PNG has no EXIF block of its own in most readers, so the synthetic record
//! is stored as six `tEXt` key/value chunks inserted directly before `IEND`.

use anyhow::{Context, Result};
use img_parts::Bytes;
use img_parts::png::{Png, PngChunk};
use std::path::Path;

use crate::atomic;
use crate::synthetic::SyntheticMetadata;

pub const TEXT_CHUNK: [u8; 4] = *b"tEXt";
pub const END_CHUNK: [u8; 4] = *b"IEND";

/// PNG keywords are 1–79 Latin-1 bytes.
const MAX_KEYWORD_LEN: usize = 79;

/// The six key/value pairs written for a record, in insertion order.
pub fn text_entries(metadata: &SyntheticMetadata) -> [(&'static str, String); 6] {
    [
        ("Software", metadata.software.clone()),
        ("Creation Time", metadata.creation_time.clone()),
        ("Model", metadata.device_model.clone()),
        ("Location", metadata.location.clone()),
        ("GPS", metadata.gps.clone()),
        ("Resolution", metadata.resolution.clone()),
    ]
}

/// Insert the metadata text chunks into the PNG at `path`, replacing the file
/// atomically.
pub fn write_png_text(path: &Path, metadata: &SyntheticMetadata) -> Result<()> {
    let file_bytes = std::fs::read(path).context("Failed to read image file")?;
    let mut png = Png::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse PNG: {e}"))?;

    insert_text_chunks(&mut png, &text_entries(metadata))?;

    let output = png.encoder().bytes();
    atomic::write_bytes(path, &output).context("Failed to write PNG file")?;
    log::debug!("  PNG text chunks written: {}", metadata.device_model);
    Ok(())
}

/// Insert one `tEXt` chunk per entry, in order, immediately before `IEND`.
pub fn insert_text_chunks<K, V>(png: &mut Png, entries: &[(K, V)]) -> Result<()>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let chunks = png.chunks_mut();
    match chunks.last() {
        Some(last) if last.kind() == END_CHUNK => {}
        _ => anyhow::bail!("PNG chunk stream does not end with IEND"),
    }

    let insert_at = chunks.len() - 1;
    for (offset, (key, value)) in entries.iter().enumerate() {
        let contents = encode_text(key.as_ref(), value.as_ref())?;
        chunks.insert(insert_at + offset, PngChunk::new(TEXT_CHUNK, Bytes::from(contents)));
    }
    Ok(())
}

/// Collect all `tEXt` key/value pairs from a PNG, in file order.
pub fn text_chunks(png: &Png) -> Vec<(String, String)> {
    png.chunks()
        .iter()
        .filter(|c| c.kind() == TEXT_CHUNK)
        .filter_map(|c| decode_text(c.contents()))
        .collect()
}

/// `keyword \0 text`, both Latin-1. Characters outside Latin-1 become `?`.
fn encode_text(keyword: &str, text: &str) -> Result<Vec<u8>> {
    if keyword.is_empty() || keyword.len() > MAX_KEYWORD_LEN {
        anyhow::bail!("Invalid PNG text keyword {keyword:?}");
    }
    let mut bytes = to_latin1(keyword);
    bytes.push(0);
    bytes.extend(to_latin1(text));
    Ok(bytes)
}

fn decode_text(contents: &[u8]) -> Option<(String, String)> {
    let nul = contents.iter().position(|&b| b == 0)?;
    let key = contents[..nul].iter().map(|&b| b as char).collect();
    let value = contents[nul + 1..].iter().map(|&b| b as char).collect();
    Some((key, value))
}

fn to_latin1(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
