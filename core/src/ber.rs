//! Re-encodes BER as DER so the `der` decoders accept it.
//!
//! CMS producers commonly emit indefinite lengths (`30 80 ... 00 00`) and
//! constructed OCTET STRINGs. Both are rewritten into their definite,
//! primitive DER forms; everything else is copied through unchanged.

const MAX_DEPTH: usize = 64;
const MAX_LENGTH: usize = 16 * 1024 * 1024;

const CONSTRUCTED: u8 = 0x20;
const OCTET_STRING: u8 = 0x04;

/// Converts one BER element spanning all of `input` into DER.
pub fn to_der(input: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(input.len());
    let used = convert(input, 0, &mut out)?;
    if used != input.len() {
        return Err(format!(
            "{} trailing bytes after top-level element",
            input.len() - used
        ));
    }
    Ok(out)
}

enum Length {
    Definite(usize),
    Indefinite,
}

/// Reads the identifier octets; returns (identifier bytes, constructed).
fn read_tag(data: &[u8]) -> Result<(&[u8], bool), String> {
    let first = *data.first().ok_or("truncated tag")?;
    let mut end = 1;
    if first & 0x1f == 0x1f {
        loop {
            let b = *data.get(end).ok_or("truncated high tag number")?;
            end += 1;
            if b & 0x80 == 0 {
                break;
            }
            if end > 6 {
                return Err("tag number too large".to_string());
            }
        }
    }
    Ok((&data[..end], first & CONSTRUCTED != 0))
}

/// Returns the length and the number of bytes it occupied.
fn read_length(data: &[u8]) -> Result<(Length, usize), String> {
    let first = *data.first().ok_or("truncated length")?;
    if first < 0x80 {
        return Ok((Length::Definite(first as usize), 1));
    }
    if first == 0x80 {
        return Ok((Length::Indefinite, 1));
    }
    let n = (first & 0x7f) as usize;
    if n > 4 || 1 + n > data.len() {
        return Err("unsupported length encoding".to_string());
    }
    let mut length = 0usize;
    for b in &data[1..1 + n] {
        length = (length << 8) | *b as usize;
    }
    if length > MAX_LENGTH {
        return Err(format!("length {} exceeds maximum {}", length, MAX_LENGTH));
    }
    Ok((Length::Definite(length), 1 + n))
}

fn write_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// Converts the element at the start of `data`, appending it to `out`.
/// Returns the number of input bytes consumed.
fn convert(data: &[u8], depth: usize, out: &mut Vec<u8>) -> Result<usize, String> {
    if depth > MAX_DEPTH {
        return Err("nesting too deep".to_string());
    }
    let (tag, constructed) = read_tag(data)?;
    let tag_len = tag.len();
    let (length, length_len) = read_length(&data[tag_len..])?;
    let header = tag_len + length_len;

    if !constructed {
        let len = match length {
            Length::Definite(len) => len,
            Length::Indefinite => return Err("indefinite length on primitive".to_string()),
        };
        let end = header
            .checked_add(len)
            .filter(|end| *end <= data.len())
            .ok_or("primitive value overruns input")?;
        out.extend_from_slice(tag);
        write_length(len, out);
        out.extend_from_slice(&data[header..end]);
        return Ok(end);
    }

    // Children are converted into a scratch buffer so the definite length is
    // known before the header is written.
    let mut body = Vec::new();
    let consumed = match length {
        Length::Definite(len) => {
            let end = header
                .checked_add(len)
                .filter(|end| *end <= data.len())
                .ok_or("constructed value overruns input")?;
            let mut pos = header;
            while pos < end {
                pos += convert(&data[pos..end], depth + 1, &mut body)?;
            }
            end
        }
        Length::Indefinite => {
            let mut pos = header;
            loop {
                match data.get(pos..pos + 2) {
                    Some([0, 0]) => break pos + 2,
                    Some(_) => pos += convert(&data[pos..], depth + 1, &mut body)?,
                    None => return Err("missing end-of-contents".to_string()),
                }
            }
        }
    };

    if tag == [CONSTRUCTED | OCTET_STRING] {
        // Constructed OCTET STRING: DER wants the segments concatenated.
        let joined = join_octet_segments(&body)?;
        out.push(OCTET_STRING);
        write_length(joined.len(), out);
        out.extend_from_slice(&joined);
    } else {
        out.extend_from_slice(tag);
        write_length(body.len(), out);
        out.extend_from_slice(&body);
    }
    Ok(consumed)
}

// `body` is already DER, so every segment is a primitive OCTET STRING.
fn join_octet_segments(body: &[u8]) -> Result<Vec<u8>, String> {
    let mut joined = Vec::with_capacity(body.len());
    let mut pos = 0;
    while pos < body.len() {
        if body[pos] != OCTET_STRING {
            return Err(format!(
                "unexpected tag 0x{:02x} inside constructed OCTET STRING",
                body[pos]
            ));
        }
        let (length, length_len) = read_length(&body[pos + 1..])?;
        let len = match length {
            Length::Definite(len) => len,
            Length::Indefinite => return Err("indefinite OCTET STRING segment".to_string()),
        };
        let start = pos + 1 + length_len;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= body.len())
            .ok_or("OCTET STRING segment overruns input")?;
        joined.extend_from_slice(&body[start..end]);
        pos = end;
    }
    Ok(joined)
}
