//! SVG structural cleanup.
//!
//! Removes content browsers never render: the XML declaration, doctype,
//! processing instructions, comments, `<metadata>` subtrees and whitespace-only
//! text between tags. Whitespace inside text content elements, or under
//! `xml:space="preserve"`, is rendered and stays. Element ids are never
//! rewritten.

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::OptimizeError;

/// Elements whose character data is rendered, blank runs included.
const TEXT_CONTENT: [&[u8]; 3] = [b"text", b"tspan", b"textPath"];

/// Clean up `data`. With `remove_view_box`, the root `viewBox` is dropped when
/// it is exactly `0 0 <width> <height>`.
pub(crate) fn optimize(data: &[u8], remove_view_box: bool) -> Result<Vec<u8>, OptimizeError> {
    let text = std::str::from_utf8(data)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut writer = Writer::new(Vec::with_capacity(data.len()));
    let mut seen_root = false;
    // One entry per open element: whether blank text inside it is kept
    let mut preserve: Vec<bool> = Vec::new();

    loop {
        let keep_blank = preserve.last().copied().unwrap_or(false);
        match reader.read_event()? {
            Event::Eof => break,
            Event::Decl(_) | Event::DocType(_) | Event::PI(_) | Event::Comment(_) => {}
            Event::Start(e) if e.name().as_ref() == b"metadata" => {
                reader.read_to_end(e.name())?;
            }
            Event::Empty(e) if e.name().as_ref() == b"metadata" => {}
            Event::Text(t) if !keep_blank && t.iter().all(u8::is_ascii_whitespace) => {}
            Event::Start(e) if !seen_root && e.name().as_ref() == b"svg" => {
                seen_root = true;
                preserve.push(keeps_whitespace(&e, false)?);
                writer.write_event(Event::Start(clean_root(&e, remove_view_box)?))?;
            }
            Event::Empty(e) if !seen_root && e.name().as_ref() == b"svg" => {
                seen_root = true;
                writer.write_event(Event::Empty(clean_root(&e, remove_view_box)?))?;
            }
            Event::Start(e) => {
                preserve.push(keeps_whitespace(&e, keep_blank)?);
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                preserve.pop();
                writer.write_event(Event::End(e))?;
            }
            event => writer.write_event(event)?,
        }
    }

    Ok(writer.into_inner())
}

/// Copy of the root element, minus a redundant `viewBox`.
fn clean_root(
    element: &BytesStart<'_>,
    remove_view_box: bool,
) -> Result<BytesStart<'static>, OptimizeError> {
    let attrs = element
        .attributes()
        .collect::<Result<Vec<Attribute<'_>>, _>>()?;
    let value = |key: &[u8]| {
        attrs
            .iter()
            .find(|a| a.key.as_ref() == key)
            .map(|a| String::from_utf8_lossy(&a.value).into_owned())
    };

    let drop_view_box = remove_view_box
        && match (value(b"viewBox"), value(b"width"), value(b"height")) {
            (Some(view_box), Some(width), Some(height)) => {
                view_box_matches(&view_box, &width, &height)
            }
            _ => false,
        };

    let mut root = element.clone().into_owned();
    root.clear_attributes();
    for attr in attrs {
        if drop_view_box && attr.key.as_ref() == b"viewBox" {
            continue;
        }
        root.push_attribute(attr);
    }
    Ok(root)
}

/// Whether blank text directly inside `element` is significant.
fn keeps_whitespace(element: &BytesStart<'_>, inherited: bool) -> Result<bool, OptimizeError> {
    if inherited || TEXT_CONTENT.contains(&element.local_name().as_ref()) {
        return Ok(true);
    }
    Ok(element
        .try_get_attribute("xml:space")?
        .is_some_and(|attr| attr.value.as_ref() == b"preserve"))
}

/// True when `view_box` is `0 0 width height` with unitless or `px` sizes.
fn view_box_matches(view_box: &str, width: &str, height: &str) -> bool {
    let numbers: Vec<f64> = view_box
        .split(|c: char| c.is_ascii_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    let [x, y, w, h] = numbers.as_slice() else {
        return false;
    };

    let size = |s: &str| s.trim().trim_end_matches("px").parse::<f64>().ok();
    match (size(width), size(height)) {
        (Some(width), Some(height)) => {
            *x == 0.0
                && *y == 0.0
                && (*w - width).abs() < f64::EPSILON
                && (*h - height).abs() < f64::EPSILON
        }
        _ => false,
    }
}
