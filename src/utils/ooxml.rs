//! Plain-text extraction from Office Open XML packages (`.docx`, `.pptx`).
//!
//! Both formats are zip archives of XML parts; only the parts holding body text are read.

use anyhow::{Context as _, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

fn open_package(data: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(data)).context("file is not a valid Office Open XML package")
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String> {
    let mut part = archive
        .by_name(name)
        .with_context(|| format!("package has no {} part", name))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .with_context(|| format!("could not read {}", name))?;
    Ok(xml)
}

/// Paragraphs of the main document part, each followed by a newline.
pub fn docx_text(data: &[u8]) -> Result<String> {
    let mut archive = open_package(data)?;
    let xml = read_part(&mut archive, "word/document.xml")?;
    document_paragraphs(&xml)
}

fn document_paragraphs(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut paragraph = String::new();
    let mut paragraph_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event().context("malformed document.xml")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => paragraph_depth += 1,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if paragraph_depth > 0 => paragraph.push('\t'),
                b"br" | b"cr" if paragraph_depth > 0 => paragraph.push('\n'),
                // <w:p/> is an empty paragraph
                b"p" if paragraph_depth == 0 => out.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    paragraph_depth = paragraph_depth.saturating_sub(1);
                    if paragraph_depth == 0 {
                        out.push_str(&paragraph);
                        out.push('\n');
                        paragraph.clear();
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                paragraph.push_str(&t.unescape().context("bad text escape")?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

const PRESENTATION: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Text of every top-level shape with a text body, slide by slide.
pub fn pptx_text(data: &[u8]) -> Result<String> {
    let mut archive = open_package(data)?;

    let slides = slide_parts(&mut archive)?;
    if slides.is_empty() {
        anyhow::bail!("presentation contains no slides");
    }

    let mut out = String::new();
    for name in slides {
        let xml = read_part(&mut archive, &name)?;
        out.push_str(&slide_shapes_text(&xml).with_context(|| format!("malformed {}", name))?);
    }
    Ok(out)
}

fn has_part(archive: &ZipArchive<Cursor<&[u8]>>, name: &str) -> bool {
    archive.file_names().any(|n| n == name)
}

/// Slide part names in presentation order.
///
/// The order is the `p:sldIdLst` of the presentation part, resolved through its
/// relationships. Packages missing either part fall back to the number in the
/// slide file name.
fn slide_parts(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<Vec<String>> {
    if has_part(archive, PRESENTATION) && has_part(archive, PRESENTATION_RELS) {
        let ids = slide_relationship_ids(&read_part(archive, PRESENTATION)?)?;
        let targets = relationship_targets(&read_part(archive, PRESENTATION_RELS)?)?;
        return ids
            .iter()
            .map(|id| {
                targets
                    .get(id)
                    .map(|target| slide_part_name(target))
                    .with_context(|| format!("slide relationship {} has no target", id))
            })
            .collect();
    }

    let mut numbered: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

fn slide_relationship_ids(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event().context("malformed presentation.xml")? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                for attr in e.attributes() {
                    let attr = attr?;
                    // the unprefixed `id` is the numeric slide id
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        ids.push(attr.unescape_value()?.into_owned());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}

fn relationship_targets(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event().context("malformed presentation relationships")? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(targets)
}

/// Targets are relative to `ppt/` unless they start at the package root.
fn slide_part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

fn slide_shapes_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut group_depth = 0usize;
    let mut in_shape = false;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"grpSp" => group_depth += 1,
                b"sp" if group_depth == 0 => {
                    in_shape = true;
                    paragraphs.clear();
                }
                b"p" if in_shape => paragraphs.push(String::new()),
                b"t" if in_shape => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"br" if in_shape => {
                    if let Some(p) = paragraphs.last_mut() {
                        p.push('\n');
                    }
                }
                b"p" if in_shape => paragraphs.push(String::new()),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"grpSp" => group_depth = group_depth.saturating_sub(1),
                b"sp" if in_shape && group_depth == 0 => {
                    out.push_str(&paragraphs.join("\n"));
                    out.push('\n');
                    in_shape = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = paragraphs.last_mut() {
                    p.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}
