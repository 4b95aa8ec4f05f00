/// Repair raw ICS bytes into well-formed logical property lines.
///
/// Normalizes line endings, unfolds continuation lines, and drops the two
/// corruption patterns strict parsers choke on: blank lines and properties
/// whose name is nothing but digits. Order of surviving lines is preserved
/// and the function never fails; garbage in, fewer lines out.
pub fn sanitize(raw: &[u8]) -> Vec<Vec<u8>> {
    // Normalize CRLF and bare CR to LF
    let mut text = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter().peekable();
    while let Some(&b) = bytes.next() {
        if b == b'\r' {
            if bytes.peek() == Some(&&b'\n') {
                bytes.next();
            }
            text.push(b'\n');
        } else {
            text.push(b);
        }
    }

    // Unfold: a leading space or tab marks a continuation of the previous
    // logical line; strip exactly the first whitespace byte and concatenate
    let mut unfolded: Vec<Vec<u8>> = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    for line in text.split(|&b| b == b'\n') {
        if line.first() == Some(&b' ') || line.first() == Some(&b'\t') {
            current.extend_from_slice(&line[1..]);
        } else {
            if !current.is_empty() {
                unfolded.push(std::mem::take(&mut current));
            }
            current = line.to_vec();
        }
    }
    if !current.is_empty() {
        unfolded.push(current);
    }

    unfolded.retain(|line| !is_blank(line) && !has_numeric_property_name(line));
    unfolded
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Lines like `02:SOMEVALUE` are a known corruption pattern: the property
/// name (before the first `:`, trimmed) is nothing but decimal digits
fn has_numeric_property_name(line: &[u8]) -> bool {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return false;
    };
    let trimmed = trim_ascii(&line[..colon]);
    !trimmed.is_empty() && trimmed.iter().all(u8::is_ascii_digit)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
