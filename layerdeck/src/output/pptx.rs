//! Minimal PresentationML (PPTX) writer.
//!
//! Produces one slide master with a single blank layout, a notes master, and
//! per slide: a solid background, one picture and optional speaker notes.
//! Media are embedded as PNG.

use std::io::{Seek, Write};

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use zip::CompressionMethod;
use zip::result::ZipResult;
use zip::write::{SimpleFileOptions, ZipWriter};

/// English Metric Units per inch
pub const EMU_PER_INCH: f64 = 914_400.0;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_NOTES_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";
const REL_NOTES_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const EMPTY_GROUP: &str = concat!(
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
);

const CLR_MAP: &str = concat!(
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" "#,
    r#"accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" "#,
    r#"accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#
);

/// Notes page size (portrait letter), fixed by convention
const NOTES_CX: i64 = 6_858_000;
const NOTES_CY: i64 = 9_144_000;

/// Picture position and size on a slide, in EMU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureFrame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

#[derive(Debug, Clone)]
struct DeckSlide {
    png: Vec<u8>,
    frame: PictureFrame,
    notes: Option<String>,
}

/// An in-memory slide deck, serialized with [`PptxDeck::write_to`]
#[derive(Debug, Clone)]
pub struct PptxDeck {
    title: String,
    width: i64,
    height: i64,
    background: String,
    created: DateTime<Utc>,
    slides: Vec<DeckSlide>,
}

impl PptxDeck {
    /// `background` is a six-digit hex RGB value; anything else becomes black.
    pub fn new(title: impl Into<String>, width: i64, height: i64, background: &str) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            background: normalize_hex_color(background).unwrap_or_else(|| "000000".to_string()),
            created: Utc::now(),
            slides: Vec::new(),
        }
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Append a blank slide showing `png` at `frame`, with optional speaker notes
    pub fn add_slide(&mut self, png: Vec<u8>, frame: PictureFrame, notes: Option<String>) {
        let notes = notes.filter(|text| !text.trim().is_empty());
        self.slides.push(DeckSlide { png, frame, notes });
    }

    /// Serialize the deck as a zip package into `writer`
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> ZipResult<W> {
        let mut zip = ZipWriter::new(writer);
        let xml = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        // PNG data is already compressed
        let media = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let put = |zip: &mut ZipWriter<W>, name: &str, body: &str| -> ZipResult<()> {
            zip.start_file(name, xml)?;
            zip.write_all(XML_DECLARATION.as_bytes())?;
            zip.write_all(body.as_bytes())?;
            Ok(())
        };

        put(&mut zip, "[Content_Types].xml", &self.content_types())?;
        put(&mut zip, "_rels/.rels", &package_rels())?;
        put(&mut zip, "docProps/core.xml", &self.core_properties())?;
        put(&mut zip, "docProps/app.xml", &self.app_properties())?;
        put(&mut zip, "ppt/presentation.xml", &self.presentation())?;
        put(&mut zip, "ppt/_rels/presentation.xml.rels", &self.presentation_rels())?;
        put(&mut zip, "ppt/slideMasters/slideMaster1.xml", &self.slide_master())?;
        put(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &relationships(&[
                ("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
                ("rId2", REL_THEME, "../theme/theme1.xml"),
            ]),
        )?;
        put(&mut zip, "ppt/slideLayouts/slideLayout1.xml", &slide_layout())?;
        put(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            &relationships(&[("rId1", REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml")]),
        )?;
        put(&mut zip, "ppt/notesMasters/notesMaster1.xml", &notes_master())?;
        put(
            &mut zip,
            "ppt/notesMasters/_rels/notesMaster1.xml.rels",
            &relationships(&[("rId1", REL_THEME, "../theme/theme2.xml")]),
        )?;
        put(&mut zip, "ppt/theme/theme1.xml", &theme("Deck"))?;
        put(&mut zip, "ppt/theme/theme2.xml", &theme("Notes"))?;

        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            let image_target = format!("../media/image{}.png", n);
            let notes_target = format!("../notesSlides/notesSlide{}.xml", n);

            put(&mut zip, &format!("ppt/slides/slide{}.xml", n), &self.slide(slide))?;

            let mut rels = vec![
                ("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
                ("rId2", REL_IMAGE, image_target.as_str()),
            ];
            if slide.notes.is_some() {
                rels.push(("rId3", REL_NOTES_SLIDE, notes_target.as_str()));
            }
            put(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", n),
                &relationships(&rels),
            )?;

            if let Some(notes) = &slide.notes {
                let slide_target = format!("../slides/slide{}.xml", n);
                put(
                    &mut zip,
                    &format!("ppt/notesSlides/notesSlide{}.xml", n),
                    &notes_slide(notes),
                )?;
                put(
                    &mut zip,
                    &format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", n),
                    &relationships(&[
                        ("rId1", REL_NOTES_MASTER, "../notesMasters/notesMaster1.xml"),
                        ("rId2", REL_SLIDE, slide_target.as_str()),
                    ]),
                )?;
            }

            zip.start_file(format!("ppt/media/image{}.png", n), media)?;
            zip.write_all(&slide.png)?;
        }

        zip.finish()
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );
        xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
        xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
        xml.push_str(r#"<Default Extension="png" ContentType="image/png"/>"#);

        let mut overrides = vec![
            ("/ppt/presentation.xml".to_string(), "presentationml.presentation.main+xml"),
            ("/ppt/slideMasters/slideMaster1.xml".to_string(), "presentationml.slideMaster+xml"),
            ("/ppt/slideLayouts/slideLayout1.xml".to_string(), "presentationml.slideLayout+xml"),
            ("/ppt/notesMasters/notesMaster1.xml".to_string(), "presentationml.notesMaster+xml"),
            ("/ppt/theme/theme1.xml".to_string(), "theme+xml"),
            ("/ppt/theme/theme2.xml".to_string(), "theme+xml"),
            ("/docProps/app.xml".to_string(), "extended-properties+xml"),
        ];
        for (i, slide) in self.slides.iter().enumerate() {
            overrides.push((format!("/ppt/slides/slide{}.xml", i + 1), "presentationml.slide+xml"));
            if slide.notes.is_some() {
                overrides.push((
                    format!("/ppt/notesSlides/notesSlide{}.xml", i + 1),
                    "presentationml.notesSlide+xml",
                ));
            }
        }
        for (part, kind) in overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="application/vnd.openxmlformats-officedocument.{}"/>"#,
                part, kind
            ));
        }
        xml.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
        xml.push_str("</Types>");
        xml
    }

    fn core_properties(&self) -> String {
        let timestamp = self.created.format("%Y-%m-%dT%H:%M:%SZ");
        format!(
            concat!(
                r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
                r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
                r#"xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
                "<dc:title>{title}</dc:title><dc:creator>layerdeck</dc:creator>",
                r#"<dcterms:created xsi:type="dcterms:W3CDTF">{ts}</dcterms:created>"#,
                r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{ts}</dcterms:modified>"#,
                "</cp:coreProperties>"
            ),
            title = escape(self.title.as_str()),
            ts = timestamp,
        )
    }

    fn app_properties(&self) -> String {
        let notes = self.slides.iter().filter(|s| s.notes.is_some()).count();
        format!(
            concat!(
                r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#,
                "<Application>layerdeck</Application><Slides>{}</Slides><Notes>{}</Notes>",
                "</Properties>"
            ),
            self.slides.len(),
            notes
        )
    }

    fn presentation(&self) -> String {
        let mut xml = format!(
            r#"<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}">"#
        );
        xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
        xml.push_str(r#"<p:notesMasterIdLst><p:notesMasterId r:id="rId2"/></p:notesMasterIdLst>"#);
        if !self.slides.is_empty() {
            xml.push_str("<p:sldIdLst>");
            for i in 0..self.slides.len() {
                xml.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, 4 + i));
            }
            xml.push_str("</p:sldIdLst>");
        }
        xml.push_str(&format!(
            r#"<p:sldSz cx="{}" cy="{}"/><p:notesSz cx="{}" cy="{}"/>"#,
            self.width, self.height, NOTES_CX, NOTES_CY
        ));
        xml.push_str("</p:presentation>");
        xml
    }

    fn presentation_rels(&self) -> String {
        let slide_targets: Vec<(String, String)> = (0..self.slides.len())
            .map(|i| (format!("rId{}", 4 + i), format!("slides/slide{}.xml", i + 1)))
            .collect();

        let mut rels = vec![
            ("rId1", REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml"),
            ("rId2", REL_NOTES_MASTER, "notesMasters/notesMaster1.xml"),
            ("rId3", REL_THEME, "theme/theme1.xml"),
        ];
        rels.extend(
            slide_targets
                .iter()
                .map(|(id, target)| (id.as_str(), REL_SLIDE, target.as_str())),
        );
        relationships(&rels)
    }

    fn background(&self) -> String {
        format!(
            r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
            self.background
        )
    }

    fn slide_master(&self) -> String {
        format!(
            concat!(
                r#"<p:sldMaster xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}">"#,
                "<p:cSld>{bg}<p:spTree>{group}</p:spTree></p:cSld>{clr}",
                r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
                "</p:sldMaster>"
            ),
            a = NS_A,
            r = NS_R,
            p = NS_P,
            bg = self.background(),
            group = EMPTY_GROUP,
            clr = CLR_MAP,
        )
    }

    fn slide(&self, slide: &DeckSlide) -> String {
        let frame = slide.frame;
        format!(
            concat!(
                r#"<p:sld xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}">"#,
                "<p:cSld>{bg}<p:spTree>{group}",
                "<p:pic><p:nvPicPr>",
                r#"<p:cNvPr id="2" name="Picture 1"/>"#,
                r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/>"#,
                "</p:nvPicPr>",
                r#"<p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
                r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr>"#,
                "</p:pic>",
                "</p:spTree></p:cSld>",
                "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>",
                "</p:sld>"
            ),
            a = NS_A,
            r = NS_R,
            p = NS_P,
            bg = self.background(),
            group = EMPTY_GROUP,
            x = frame.x,
            y = frame.y,
            cx = frame.cx,
            cy = frame.cy,
        )
    }
}

/// Uppercase six-digit hex color, or `None` if `value` is not one
pub fn normalize_hex_color(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_start_matches('#');
    (trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| trimmed.to_ascii_uppercase())
}

fn package_rels() -> String {
    relationships(&[
        ("rId1", REL_OFFICE_DOCUMENT, "ppt/presentation.xml"),
        ("rId2", REL_CORE_PROPERTIES, "docProps/core.xml"),
        ("rId3", REL_EXTENDED_PROPERTIES, "docProps/app.xml"),
    ])
}

fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(r#"<Relationships xmlns="{NS_REL}">"#);
    for (id, kind, target) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id,
            kind,
            escape(*target)
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn slide_layout() -> String {
    format!(
        concat!(
            r#"<p:sldLayout xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" type="blank" preserve="1">"#,
            r#"<p:cSld name="Blank"><p:spTree>{group}</p:spTree></p:cSld>"#,
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>",
            "</p:sldLayout>"
        ),
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = EMPTY_GROUP,
    )
}

fn notes_master() -> String {
    format!(
        concat!(
            r#"<p:notesMaster xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}">"#,
            "<p:cSld><p:spTree>{group}</p:spTree></p:cSld>{clr}",
            "</p:notesMaster>"
        ),
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = EMPTY_GROUP,
        clr = CLR_MAP,
    )
}

fn notes_slide(text: &str) -> String {
    let paragraphs: String = text
        .lines()
        .map(|line| {
            if line.is_empty() {
                "<a:p/>".to_string()
            } else {
                format!(
                    r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                    escape(line)
                )
            }
        })
        .collect();

    format!(
        concat!(
            r#"<p:notes xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}">"#,
            "<p:cSld><p:spTree>{group}",
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/>"#,
            r#"<p:cNvSpPr><a:spLocks noGrp="1" noRot="1" noChangeAspect="1"/></p:cNvSpPr>"#,
            r#"<p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/>"#,
            r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#,
            r#"<p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/>"#,
            "<p:txBody><a:bodyPr/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>",
            "</p:spTree></p:cSld>",
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>",
            "</p:notes>"
        ),
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = EMPTY_GROUP,
        paragraphs = paragraphs,
    )
}

fn theme(name: &str) -> String {
    let solid = |color: &str| format!(r#"<a:solidFill><a:schemeClr val="{}"/></a:solidFill>"#, color);
    let line = |w: u32| {
        format!(
            r#"<a:ln w="{}"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
            w
        )
    };
    let fills = format!("{0}{0}{0}", solid("phClr"));

    format!(
        concat!(
            r#"<a:theme xmlns:a="{a}" name="{name}"><a:themeElements>"#,
            r#"<a:clrScheme name="{name}">"#,
            r#"<a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>"#,
            r#"<a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>"#,
            r#"<a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2>"#,
            r#"<a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4>"#,
            r#"<a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6>"#,
            r#"<a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink>"#,
            "</a:clrScheme>",
            r#"<a:fontScheme name="{name}">"#,
            r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
            r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
            "</a:fontScheme>",
            r#"<a:fmtScheme name="{name}">"#,
            "<a:fillStyleLst>{fills}</a:fillStyleLst>",
            "<a:lnStyleLst>{l1}{l2}{l3}</a:lnStyleLst>",
            "<a:effectStyleLst>",
            "<a:effectStyle><a:effectLst/></a:effectStyle>",
            "<a:effectStyle><a:effectLst/></a:effectStyle>",
            "<a:effectStyle><a:effectLst/></a:effectStyle>",
            "</a:effectStyleLst>",
            "<a:bgFillStyleLst>{fills}</a:bgFillStyleLst>",
            "</a:fmtScheme>",
            "</a:themeElements></a:theme>"
        ),
        a = NS_A,
        name = name,
        fills = fills,
        l1 = line(6350),
        l2 = line(12700),
        l3 = line(19050),
    )
}
