//! Canonical event serialization.
//!
//! The event id is the SHA-256 of `[0,<pubkey>,<created_at>,<kind>,<tags>,<content>]`
//! encoded with no whitespace and minimal string escaping. Every relay and
//! client hashes the same bytes, so the writer here is explicit about each
//! rule instead of delegating to a general JSON encoder:
//!
//! - `"` and `\` are backslash-escaped
//! - `\b`, `\t`, `\n`, `\f`, `\r` use their short escapes
//! - remaining bytes `0x00..=0x1F` become `\u00xx` (lowercase hex)
//! - `/`, DEL and everything above ASCII are written as literal UTF-8
//! - integers are bare decimal, empty tag lists are `[]`

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Build the canonical payload for the given event fields.
pub fn canonical_payload(
    pubkey: &str,
    created_at: i64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> String {
    let mut out = String::with_capacity(
        96 + content.len() + tags.iter().flatten().map(|v| v.len() + 3).sum::<usize>(),
    );

    out.push_str("[0,");
    write_json_string(&mut out, pubkey);
    out.push(',');
    out.push_str(&created_at.to_string());
    out.push(',');
    out.push_str(&kind.to_string());
    out.push(',');
    write_tags(&mut out, tags);
    out.push(',');
    write_json_string(&mut out, content);
    out.push(']');

    out
}

/// Escape a string the way the canonical payload does, including the quotes.
pub fn escape_json_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    write_json_string(&mut out, value);
    out
}

fn write_tags(out: &mut String, tags: &[Vec<String>]) {
    out.push('[');
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('[');
        for (j, value) in tag.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            write_json_string(out, value);
        }
        out.push(']');
    }
    out.push(']');
}

fn write_json_string(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{0C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                let byte = c as u8;
                out.push_str("\\u00");
                out.push(HEX[(byte >> 4) as usize] as char);
                out.push(HEX[(byte & 0x0f) as usize] as char);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
