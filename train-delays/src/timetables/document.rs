//! Whole-document XML deserialization.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::de::DeserializeOwned;

use super::error::ParseError;

/// Deserialize `xml` after checking that it is one well-formed document.
///
/// The serde deserializer stops at the end of the first root element, so
/// anything after it (a second root, a truncated concatenation, stray text)
/// would otherwise be ignored. Comments, processing instructions and
/// whitespace around the root are allowed.
pub(crate) fn from_document<T: DeserializeOwned>(
    document: &'static str,
    xml: &str,
) -> Result<T, ParseError> {
    check_single_root(xml).map_err(|message| ParseError::new(document, message, xml))?;
    quick_xml::de::from_str(xml).map_err(|e| ParseError::new(document, e, xml))
}

fn check_single_root(xml: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(xml);
    let mut depth: usize = 0;
    let mut root_closed = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{e} at byte {}", reader.error_position()))?;
        let position = reader.buffer_position();

        match event {
            Event::Start(_) => {
                if depth == 0 && root_closed {
                    return Err(format!("junk after document element at byte {position}"));
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unmatched end tag at byte {position}"))?;
                if depth == 0 {
                    root_closed = true;
                }
            }
            Event::Empty(_) if depth == 0 => {
                if root_closed {
                    return Err(format!("junk after document element at byte {position}"));
                }
                root_closed = true;
            }
            Event::Text(text) if depth == 0 => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(format!("text outside the document element at byte {position}"));
                }
            }
            Event::CData(_) if depth == 0 => {
                return Err(format!("text outside the document element at byte {position}"));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth > 0 {
        return Err("unexpected end of document".to_string());
    }
    if !root_closed {
        return Err("no document element".to_string());
    }
    Ok(())
}
