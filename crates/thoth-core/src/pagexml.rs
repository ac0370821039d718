//! Metadata injection into PAGE XML transcripts.
//!
//! Exported transcripts carry no document context of their own, so the
//! pipeline splices it in under a scratch `temp` namespace before writing
//! the file: the namespace declaration goes on the `PcGts` root, `temp:id`
//! and `temp:urltoimg` attributes go on the first `Page` element, and one
//! `temp:*` child per metadata field is appended to the existing `Metadata`
//! element. The downstream TEI stylesheet picks these up and drops the
//! namespace again.
//!
//! The transcript is streamed event by event; everything that is not being
//! annotated passes through byte for byte, so region and line content stay
//! exactly as the platform delivered them.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::AppError;
use crate::models::{DocumentMeta, Page};

/// Namespace URI bound to the `temp` prefix on annotated transcripts.
pub const TEMP_NAMESPACE: &str = "temporary";

/// Annotates a PAGE XML transcript with document metadata.
///
/// Returns `Ok(None)` when the body is well-formed XML but not a PAGE
/// document (root element other than `PcGts`); such bodies are not worth an
/// error, the caller just skips the page. Broken XML surfaces as
/// [`AppError::Xml`] and a PAGE document without a `Metadata` element as
/// [`AppError::InvalidTranscript`].
///
/// Annotating an already annotated transcript replaces the earlier `temp`
/// declaration and attributes instead of duplicating them.
pub fn annotate_transcript(
    xml: &[u8],
    doc: &DocumentMeta,
    page: &Page,
) -> Result<Option<Vec<u8>>, AppError> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();

    let mut root_seen = false;
    let mut page_annotated = false;
    let mut metadata_injected = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                if !root_seen {
                    root_seen = true;
                    if e.local_name().as_ref() != b"PcGts" {
                        return Ok(None);
                    }
                    writer.write_event(Event::Start(with_temp_namespace(&e)?))?;
                } else if !page_annotated && e.local_name().as_ref() == b"Page" {
                    page_annotated = true;
                    writer.write_event(Event::Start(with_page_attributes(&e, page)?))?;
                } else {
                    writer.write_event(Event::Start(e))?;
                }
            }
            Event::Empty(e) => {
                if !root_seen {
                    root_seen = true;
                    if e.local_name().as_ref() != b"PcGts" {
                        return Ok(None);
                    }
                    writer.write_event(Event::Empty(with_temp_namespace(&e)?))?;
                } else if !metadata_injected && e.local_name().as_ref() == b"Metadata" {
                    // A childless Metadata element gets expanded so the
                    // temp children have somewhere to live.
                    metadata_injected = true;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    writer.write_event(Event::Start(e))?;
                    write_temp_children(&mut writer, doc, page)?;
                    writer.write_event(Event::End(BytesEnd::new(name)))?;
                } else if !page_annotated && e.local_name().as_ref() == b"Page" {
                    page_annotated = true;
                    writer.write_event(Event::Empty(with_page_attributes(&e, page)?))?;
                } else {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::End(e) => {
                if !metadata_injected && e.local_name().as_ref() == b"Metadata" {
                    metadata_injected = true;
                    write_temp_children(&mut writer, doc, page)?;
                }
                writer.write_event(Event::End(e))?;
            }
            other => writer.write_event(other)?,
        }
    }

    if !root_seen {
        return Ok(None);
    }
    if !metadata_injected {
        return Err(AppError::InvalidTranscript(
            "transcript has no Metadata element".to_string(),
        ));
    }
    Ok(Some(writer.into_inner()))
}

/// Rebuilds the root element with the `temp` namespace declared, dropping
/// any declaration left over from an earlier annotation.
fn with_temp_namespace(e: &BytesStart) -> Result<BytesStart<'static>, AppError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut elem = BytesStart::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"xmlns:temp" {
            continue;
        }
        elem.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
    }
    elem.push_attribute(("xmlns:temp", TEMP_NAMESPACE));
    Ok(elem)
}

/// Rebuilds a `Page` element with `temp:id` and `temp:urltoimg` set,
/// replacing earlier values if present.
fn with_page_attributes(e: &BytesStart, page: &Page) -> Result<BytesStart<'static>, AppError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut elem = BytesStart::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"temp:id" || attr.key.as_ref() == b"temp:urltoimg" {
            continue;
        }
        elem.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
    }
    elem.push_attribute(("temp:id", page.number.to_string().as_str()));
    elem.push_attribute(("temp:urltoimg", page.image_url.as_str()));
    Ok(elem)
}

/// Writes the metadata children in their fixed order: title, description,
/// page number, transcript status, uploader, then one element per language.
fn write_temp_children<W: std::io::Write>(
    writer: &mut Writer<W>,
    doc: &DocumentMeta,
    page: &Page,
) -> Result<(), AppError> {
    writer
        .create_element("temp:title")
        .write_text_content(BytesText::new(&doc.title))?;
    writer
        .create_element("temp:desc")
        .write_text_content(BytesText::new(&doc.description))?;
    writer
        .create_element("temp:pagenumber")
        .write_text_content(BytesText::new(&page.number.to_string()))?;
    writer
        .create_element("temp:tsStatus")
        .write_text_content(BytesText::new(page.status.as_str()))?;
    writer
        .create_element("temp:uploader")
        .write_text_content(BytesText::new(&doc.uploader))?;
    for language in &doc.languages {
        writer
            .create_element("temp:language")
            .write_text_content(BytesText::new(language))?;
    }
    Ok(())
}
