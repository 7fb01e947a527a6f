//! Minimal WordprocessingML (.docx) writer and reader.
//!
//! Documents are built from a flat list of styled paragraphs. The reader
//! walks `w:p` elements and collects their `w:t` runs, with `w:br`/`w:cr`
//! as line breaks and `w:tab` as a tab. The paragraph style comes from
//! `w:pStyle`. Everything else is skipped.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use rq_core::ResearchResult;

use crate::error::{ReportError, Result};
use crate::{numbered_report_filename, report_filename, TIMESTAMP_FORMAT};

const DOCUMENT_PART: &str = "word/document.xml";
const MAX_NAME_ATTEMPTS: u32 = 1000;

const TITLE: &str = "Research Report";
const TOPIC_HEADING: &str = "Topic";
const REPORT_HEADING: &str = "Report";
const REFERENCES_HEADING: &str = "References";
const TIMESTAMP_PREFIX: &str = "Timestamp: ";
/// Separator between report paragraphs; each part becomes one `w:p`.
const PARAGRAPH_SEPARATOR: &str = "\n\n";

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
<Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:pPr><w:spacing w:after="160"/></w:pPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="200"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="26"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:style>
</w:styles>"#;

const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/></w:lvl></w:abstractNum>
<w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
</w:numbering>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Normal,
    Heading1,
    Heading2,
    ListBullet,
}

impl Style {
    fn id(self) -> Option<&'static str> {
        match self {
            Style::Normal => None,
            Style::Heading1 => Some("Heading1"),
            Style::Heading2 => Some("Heading2"),
            Style::ListBullet => Some("ListBullet"),
        }
    }

    fn from_id(id: &str) -> Self {
        match id {
            "Heading1" | "Title" => Style::Heading1,
            "Heading2" => Style::Heading2,
            "ListBullet" | "ListParagraph" => Style::ListBullet,
            _ => Style::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Paragraph {
    style: Style,
    text: String,
}

impl Paragraph {
    fn new(style: Style, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

/// Contents recovered from a saved report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDocument {
    pub timestamp: Option<String>,
    pub topic: String,
    pub report: String,
    pub sources: Vec<String>,
}

/// Write `result` to `path` as a .docx document, creating parent directories.
pub fn save_docx(result: &ResearchResult, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    write_report(File::create(path)?, result)?;

    tracing::info!(path = %path.display(), kind = result.kind(), "Saved report document");
    Ok(path.to_path_buf())
}

/// Write `result` into `dir` under a `report_<timestamp>.docx` name no other
/// report holds. Reports saved within the same second get a numeric suffix.
pub fn save_new_docx(result: &ResearchResult, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let now = Local::now();
    for n in 1..=MAX_NAME_ATTEMPTS {
        let path = dir.join(numbered_report_filename(&now, n));
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        };

        write_report(file, result)?;
        tracing::info!(path = %path.display(), kind = result.kind(), "Saved report document");
        return Ok(path);
    }

    Err(ReportError::NameExhausted(report_filename(&now)))
}

fn write_report(file: File, result: &ResearchResult) -> Result<()> {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    write_package(file, &layout(result, &timestamp))?;
    Ok(())
}

fn layout(result: &ResearchResult, timestamp: &str) -> Vec<Paragraph> {
    let mut paragraphs = vec![
        Paragraph::new(Style::Heading1, TITLE),
        Paragraph::new(Style::Normal, format!("{}{}", TIMESTAMP_PREFIX, timestamp)),
    ];

    match result {
        ResearchResult::Structured(response) => {
            paragraphs.push(Paragraph::new(Style::Heading2, TOPIC_HEADING));
            paragraphs.push(Paragraph::new(Style::Normal, response.topic.as_str()));
            paragraphs.push(Paragraph::new(Style::Heading2, REPORT_HEADING));
            paragraphs.extend(
                response
                    .report
                    .split(PARAGRAPH_SEPARATOR)
                    .map(|p| Paragraph::new(Style::Normal, p)),
            );
            paragraphs.push(Paragraph::new(Style::Heading2, REFERENCES_HEADING));
            paragraphs.extend(
                response
                    .sources
                    .iter()
                    .map(|s| Paragraph::new(Style::ListBullet, s.as_str())),
            );
        }
        ResearchResult::Unstructured(text) => {
            paragraphs.push(Paragraph::new(Style::Normal, text.as_str()));
        }
    }

    paragraphs
}

fn write_package<W: Write + Seek>(writer: W, paragraphs: &[Paragraph]) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("word/styles.xml", STYLES),
        ("word/numbering.xml", NUMBERING),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    zip.start_file(DOCUMENT_PART, options)?;
    write_document(&mut zip, paragraphs)?;

    Ok(zip.finish()?)
}

fn write_document<W: Write>(out: W, paragraphs: &[Paragraph]) -> Result<()> {
    let mut writer = Writer::new(out);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("w:document").with_attributes([("xmlns:w", WORDML_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("w:body")))?;
    for paragraph in paragraphs {
        write_paragraph(&mut writer, paragraph)?;
    }
    writer.write_event(Event::Empty(BytesStart::new("w:sectPr")))?;
    writer.write_event(Event::End(BytesEnd::new("w:body")))?;
    writer.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(())
}

fn write_paragraph<W: Write>(writer: &mut Writer<W>, paragraph: &Paragraph) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("w:p")))?;
    if let Some(id) = paragraph.style.id() {
        writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
        writer.write_event(Event::Empty(
            BytesStart::new("w:pStyle").with_attributes([("w:val", id)]),
        ))?;
        writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
    }

    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    for (i, line) in paragraph.text.split('\n').enumerate() {
        if i > 0 {
            writer.write_event(Event::Empty(BytesStart::new("w:br")))?;
        }
        writer.write_event(Event::Start(
            BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
        ))?;
        writer.write_event(Event::Text(BytesText::from_escaped(escape_text(line))))?;
        writer.write_event(Event::End(BytesEnd::new("w:t")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

/// Escape run text. Carriage returns are kept as character references so
/// parsers do not fold them into line feeds; other C0 controls are not
/// allowed in XML 1.0 and are dropped.
fn escape_text(text: &str) -> String {
    let allowed: String = text
        .chars()
        .filter(|&c| c >= '\u{20}' || c == '\t' || c == '\r')
        .collect();
    escape(allowed.as_str()).replace('\r', "&#13;")
}

fn read_document_xml(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut part = match archive.by_name(DOCUMENT_PART) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => {
            return Err(ReportError::MissingPart(DOCUMENT_PART.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

fn parse_paragraphs(xml: &str) -> Result<Vec<Paragraph>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    // Open paragraphs; text boxes can nest a `w:p` inside another.
    let mut open: Vec<Paragraph> = Vec::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => open.push(Paragraph::new(Style::Normal, "")),
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => {
                let Some(current) = open.last_mut() else {
                    if e.local_name().as_ref() == b"p" {
                        paragraphs.push(Paragraph::new(Style::Normal, ""));
                    }
                    continue;
                };
                match e.local_name().as_ref() {
                    b"p" => paragraphs.push(Paragraph::new(Style::Normal, "")),
                    b"pStyle" => {
                        if let Some(id) = attribute_value(&e, b"val")? {
                            current.style = Style::from_id(&id);
                        }
                    }
                    // `w:tab` also declares tab stops in `w:pPr`
                    b"br" | b"cr" if in_run => current.text.push('\n'),
                    b"tab" if in_run => current.text.push('\t'),
                    _ => {}
                }
            }
            Event::Text(t) if in_text => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) if in_text => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.extend(open.pop()),
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn attribute_value(element: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes().flatten() {
        if attr.key.local_name().as_ref() == local_name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Text of every paragraph in document order.
pub fn read_docx_paragraphs(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let xml = read_document_xml(path.as_ref())?;
    Ok(parse_paragraphs(&xml)?.into_iter().map(|p| p.text).collect())
}

/// Recover topic, report text and sources from a saved report.
pub fn read_docx_report(path: impl AsRef<Path>) -> Result<ReportDocument> {
    #[derive(Clone, Copy)]
    enum Section {
        Preamble,
        Topic,
        Report,
        References,
        Other,
    }

    let xml = read_document_xml(path.as_ref())?;
    let mut doc = ReportDocument::default();
    let mut topic_lines = Vec::new();
    let mut report_paragraphs = Vec::new();
    let mut section = Section::Preamble;

    for paragraph in parse_paragraphs(&xml)? {
        match paragraph.style {
            Style::Heading1 => continue,
            Style::Heading2 => {
                section = match paragraph.text.trim() {
                    TOPIC_HEADING => Section::Topic,
                    REPORT_HEADING => Section::Report,
                    REFERENCES_HEADING => Section::References,
                    _ => Section::Other,
                };
                continue;
            }
            _ => {}
        }

        match section {
            Section::Preamble => {
                if let Some(ts) = paragraph.text.strip_prefix(TIMESTAMP_PREFIX) {
                    doc.timestamp = Some(ts.to_string());
                } else {
                    report_paragraphs.push(paragraph.text);
                }
            }
            Section::Topic => topic_lines.push(paragraph.text),
            Section::Report => report_paragraphs.push(paragraph.text),
            Section::References => doc.sources.push(paragraph.text),
            Section::Other => {}
        }
    }

    doc.topic = topic_lines.join("\n");
    doc.report = report_paragraphs.join(PARAGRAPH_SEPARATOR);
    Ok(doc)
}
