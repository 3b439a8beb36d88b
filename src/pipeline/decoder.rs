//! Adaptive dictionary decompression of live feed frames
//!
//! Frames arrive as strings whose characters are dictionary codes. Codes
//! 0..=255 stand for themselves; every code after the first registers one new
//! dictionary entry, so the table is rebuilt from scratch on each call.

use std::collections::HashMap;

use crate::error::DecodeError;

const BASE_DICT_SIZE: u32 = 256;

/// Decode a frame whose characters are the dictionary codes.
pub fn decode_frame(frame: &str) -> Result<String, DecodeError> {
    decode(frame.chars().map(u32::from))
}

/// Expand a stream of dictionary codes back into text.
pub fn decode<I>(codes: I) -> Result<String, DecodeError>
where
    I: IntoIterator<Item = u32>,
{
    let mut codes = codes.into_iter();
    let first = codes.next().ok_or(DecodeError::Empty)?;

    // Entry for code `i` lives at index `i`
    let mut table: Vec<String> = (0..BASE_DICT_SIZE)
        .map(|c| char::from_u32(c).map(String::from).unwrap_or_default())
        .collect();

    let mut w = char::from_u32(first)
        .ok_or(DecodeError::InvalidCodePoint(first))?
        .to_string();
    let mut out = w.clone();

    for (offset, k) in codes.enumerate() {
        let next_code = table.len() as u32;
        let entry = match table.get(k as usize) {
            Some(known) => known.clone(),
            None if k == next_code => {
                let mut e = w.clone();
                e.extend(w.chars().next());
                e
            }
            None => {
                return Err(DecodeError::UnknownCode {
                    code: k,
                    position: offset + 1,
                })
            }
        };
        out.push_str(&entry);

        let mut added = w;
        added.extend(entry.chars().next());
        table.push(added);

        w = entry;
    }

    Ok(out)
}

/// Reference compressor: the exact inverse of [`decode`].
///
/// Only characters up to U+00FF can be encoded since higher code points
/// collide with dictionary codes.
pub fn compress(text: &str) -> Result<Vec<u32>, DecodeError> {
    let mut dict: HashMap<String, u32> = HashMap::new();
    let mut next_code = BASE_DICT_SIZE;
    let mut codes = Vec::new();
    let mut w = String::new();

    for c in text.chars() {
        if u32::from(c) >= BASE_DICT_SIZE {
            return Err(DecodeError::Unencodable(c));
        }
        let mut wc = w.clone();
        wc.push(c);
        if wc.chars().count() == 1 || dict.contains_key(&wc) {
            w = wc;
            continue;
        }
        codes.push(code_of(&dict, &w));
        dict.insert(wc, next_code);
        next_code += 1;
        w = c.to_string();
    }

    if !w.is_empty() {
        codes.push(code_of(&dict, &w));
    }
    Ok(codes)
}

/// Render codes as a frame string, the way the feed sends them.
pub fn codes_to_frame(codes: &[u32]) -> Result<String, DecodeError> {
    codes
        .iter()
        .map(|&c| char::from_u32(c).ok_or(DecodeError::InvalidCodePoint(c)))
        .collect()
}

fn code_of(dict: &HashMap<String, u32>, w: &str) -> u32 {
    let mut chars = w.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => u32::from(c),
        _ => dict[w],
    }
}
