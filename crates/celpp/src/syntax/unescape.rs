//! Decoding of quoted string and bytes literals.

/// Decodes a string or bytes token lexeme (prefix and quotes included).
///
/// For strings the result is valid UTF-8; `\x` and octal escapes denote code
/// points. For bytes they denote single octets and `\u`/`\U` are rejected.
pub fn unescape(lexeme: &str) -> Result<Vec<u8>, String> {
    let prefix_len = lexeme.find(['"', '\'']).ok_or_else(|| "missing quote".to_string())?;
    let prefix = lexeme[..prefix_len].to_ascii_lowercase();
    let raw = prefix.contains('r');
    let is_bytes = prefix.contains('b');

    let quoted = &lexeme[prefix_len..];
    let quote_len = if quoted.starts_with("'''") || quoted.starts_with("\"\"\"") { 3 } else { 1 };
    if quoted.len() < 2 * quote_len {
        return Err("unterminated literal".to_string());
    }
    let body = &quoted[quote_len..quoted.len() - quote_len];

    if raw {
        return Ok(body.as_bytes().to_vec());
    }

    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            push_char(&mut out, ch);
            continue;
        }

        let esc = chars.next().ok_or_else(|| "trailing backslash".to_string())?;
        match esc {
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0b),
            '\\' | '\'' | '"' | '`' | '?' => out.push(esc as u8),
            'x' | 'X' => {
                let value = read_hex(&mut chars, 2)?;
                push_code(&mut out, value, is_bytes)?;
            }
            'u' | 'U' if is_bytes => {
                return Err(format!("\\{esc} escapes are not allowed in bytes literals"));
            }
            'u' => {
                let value = read_hex(&mut chars, 4)?;
                push_code(&mut out, value, false)?;
            }
            'U' => {
                let value = read_hex(&mut chars, 8)?;
                push_code(&mut out, value, false)?;
            }
            '0'..='3' => {
                let mut value = esc.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    let digit = chars
                        .next()
                        .and_then(|c| c.to_digit(8))
                        .ok_or_else(|| "octal escapes need three digits".to_string())?;
                    value = value * 8 + digit;
                }
                push_code(&mut out, value, is_bytes)?;
            }
            other => return Err(format!("invalid escape sequence '\\{other}'")),
        }
    }

    Ok(out)
}

fn read_hex(chars: &mut impl Iterator<Item = char>, count: usize) -> Result<u32, String> {
    let mut value = 0u32;
    for _ in 0..count {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| format!("hex escape needs {count} digits"))?;
        value = value * 16 + digit;
    }
    Ok(value)
}

fn push_code(out: &mut Vec<u8>, value: u32, is_bytes: bool) -> Result<(), String> {
    if is_bytes {
        let byte = u8::try_from(value).map_err(|_| format!("escape value {value} is not a byte"))?;
        out.push(byte);
        return Ok(());
    }
    let ch = char::from_u32(value).ok_or_else(|| format!("invalid code point {value:#x}"))?;
    push_char(out, ch);
    Ok(())
}

fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}
