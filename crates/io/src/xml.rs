// XML import: repeated work-item elements with code / name / quantity children
//
// Element names are matched case-insensitively on their local name (namespace
// prefixes ignored), in Russian and English.

use quick_xml::events::Event;
use quick_xml::Reader;
use vorcheck_core::{CellValue, Table};

use crate::error::FormatReadError;

const ITEM_TAGS: &[&str] = &["работа", "позиция", "строка", "row", "item", "position", "workitem"];
const CODE_TAGS: &[&str] = &["шифр", "код", "обоснование", "code"];
const NAME_TAGS: &[&str] = &["наименование", "название", "name", "description"];
const QUANTITY_TAGS: &[&str] = &["количество", "объем", "объём", "кол-во", "quantity", "volume", "qty"];

/// Fixed output columns.
pub const COLUMNS: [&str; 3] = ["code", "name", "quantity"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Code = 0,
    Name = 1,
    Quantity = 2,
}

#[derive(Debug)]
struct OpenItem {
    depth: usize,
    slot: usize,
    fields: [Option<String>; 3],
}

#[derive(Debug)]
struct OpenField {
    depth: usize,
    field: Field,
    text: String,
}

/// Extract `code, name, quantity` rows from every work-item element, at any depth.
pub fn extract(bytes: &[u8]) -> Result<Table, FormatReadError> {
    let decoded = crate::decode_text(bytes);
    let text = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    // Slots are reserved when an item opens so output follows document order
    let mut slots: Vec<Option<[Option<String>; 3]>> = Vec::new();
    let mut items: Vec<OpenItem> = Vec::new();
    let mut field: Option<OpenField> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = local_name(e.local_name().as_ref());

                if is_one_of(&name, ITEM_TAGS) {
                    items.push(OpenItem { depth, slot: slots.len(), fields: Default::default() });
                    slots.push(None);
                } else if field.is_none() {
                    let parent_is_item = items.last().is_some_and(|item| item.depth + 1 == depth);
                    if let (true, Some(kind)) = (parent_is_item, field_kind(&name)) {
                        field = Some(OpenField { depth, field: kind, text: String::new() });
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(e.local_name().as_ref());
                if is_one_of(&name, ITEM_TAGS) {
                    slots.push(Some(Default::default()));
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(open) = field.as_mut() {
                    open.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(open) = field.as_mut() {
                    open.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some(open) = field.as_mut() {
                    if let Some(c) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                        open.text.push(c);
                    }
                }
            }
            Ok(Event::End(_)) => {
                if field.as_ref().is_some_and(|open| open.depth == depth) {
                    if let (Some(open), Some(item)) = (field.take(), items.last_mut()) {
                        let slot = &mut item.fields[open.field as usize];
                        // First occurrence wins
                        if slot.is_none() {
                            *slot = Some(open.text);
                        }
                    }
                }
                if items.last().is_some_and(|item| item.depth == depth) {
                    if let Some(item) = items.pop() {
                        slots[item.slot] = Some(item.fields);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FormatReadError::malformed(
                    "xml",
                    format!("at byte {}: {}", reader.error_position(), e),
                ))
            }
            Ok(_) => {}
        }
    }

    if !items.is_empty() {
        return Err(FormatReadError::malformed("xml", "document ends inside an open element"));
    }

    tracing::debug!("xml: {} work item element(s)", slots.len());
    if slots.is_empty() {
        return Err(FormatReadError::NoTable("xml"));
    }

    let rows = slots
        .into_iter()
        .flatten()
        .map(|[code, name, quantity]| {
            vec![
                text_cell(code),
                text_cell(name),
                quantity.map_or(CellValue::Empty, |q| parse_quantity(&q)),
            ]
        })
        .collect();

    Ok(Table::new(COLUMNS.iter().map(|c| c.to_string()).collect(), rows))
}

/// Quantity text → number: comma is the decimal point, everything except
/// digits and the first decimal point is dropped. No digit → empty.
pub fn parse_quantity(raw: &str) -> CellValue {
    let mut seen_point = false;
    let cleaned: String = raw
        .chars()
        .map(|c| if c == ',' { '.' } else { c })
        .filter(|c| match c {
            '0'..='9' => true,
            '.' if !seen_point => {
                seen_point = true;
                true
            }
            _ => false,
        })
        .collect();

    if !cleaned.bytes().any(|b| b.is_ascii_digit()) {
        return CellValue::Empty;
    }
    cleaned.parse::<f64>().map_or(CellValue::Empty, CellValue::Number)
}

fn text_cell(value: Option<String>) -> CellValue {
    value.map_or(CellValue::Empty, |s| CellValue::text(s.trim()))
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_lowercase()
}

fn is_one_of(name: &str, tags: &[&str]) -> bool {
    tags.contains(&name)
}

fn field_kind(name: &str) -> Option<Field> {
    if is_one_of(name, CODE_TAGS) {
        Some(Field::Code)
    } else if is_one_of(name, NAME_TAGS) {
        Some(Field::Name)
    } else if is_one_of(name, QUANTITY_TAGS) {
        Some(Field::Quantity)
    } else {
        None
    }
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let n = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(n)
        }
    }
}
