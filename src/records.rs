//! Extraction of JSON objects from subprocess output that may carry log
//! lines and banners around the JSON.

/// Drop everything before the first `{`. Output without any `{` is returned
/// unchanged so the caller can report it.
pub fn strip_leading_noise(out: &[u8]) -> &[u8] {
    match out.iter().position(|&b| b == b'{') {
        Some(start) => &out[start..],
        None => out,
    }
}

/// Split concatenated top-level JSON objects into candidate records.
///
/// Scanning starts at the first `{`. Each candidate spans from the end of the
/// previous record to the brace that closes the next balanced object, so any
/// stray bytes between records stay attached to the following candidate and
/// fail to parse. Bytes after the last complete object are a trailing
/// fragment and are dropped, unless no complete object was found, in which
/// case the whole remainder is the only candidate.
pub fn split_records(out: &[u8]) -> Vec<&[u8]> {
    let Some(start) = out.iter().position(|&b| b == b'{') else {
        return Vec::new();
    };
    let out = &out[start..];

    let mut records = Vec::new();
    let mut pos = 0;
    while pos < out.len() {
        let Some(open) = out[pos..].iter().position(|&b| b == b'{') else {
            break;
        };
        match object_end(&out[pos + open..]) {
            Some(len) => {
                let end = pos + open + len;
                records.push(&out[pos..end]);
                pos = end;
            }
            None => break,
        }
    }

    if records.is_empty() {
        records.push(out);
    }
    records
}

/// Length of the balanced object starting at `bytes[0] == b'{'`, string and
/// escape aware.
fn object_end(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// True when `bytes` is exactly one JSON object, ignoring surrounding
/// whitespace.
pub fn is_json_object(bytes: &[u8]) -> bool {
    matches!(
        serde_json::from_slice::<serde_json::Value>(bytes),
        Ok(serde_json::Value::Object(_))
    )
}
