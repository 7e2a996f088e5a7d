//! HTML/XML entity decoding for tag values.
//!
//! Models frequently escape `&`, `<` and `>` inside tag bodies. Decoding is a
//! single left-to-right pass: `&amp;lt;` becomes `&lt;`, not `<`. Unknown or
//! unterminated entities are emitted verbatim, so already-decoded text
//! passes through unchanged.

/// Longest entity body we look at before giving up (`#x10FFFF` fits).
const MAX_ENTITY_LEN: usize = 10;

/// Decode named (`amp`, `lt`, `gt`, `quot`, `apos`, `nbsp`) and numeric
/// (`&#NNN;`, `&#xHH;`) entities.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let decoded = after
            .find(';')
            .filter(|&semi| semi > 0 && semi <= MAX_ENTITY_LEN)
            .and_then(|semi| decode_entity(&after[..semi]).map(|ch| (ch, semi)));

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(body: &str) -> Option<char> {
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let num = body.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
