use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::block::{self, DataBlock, InlineEncoding, Location, LocationAttr};
use crate::error::{Error, Result};
use crate::fits::FitsKeyword;
use crate::image::{
    self, ColorFilterArray, ColorSpace, Image, ImageType, PixelStorage, Property, SampleFormat,
};
use crate::value::{Value, ValueKind};

/// Resolver for attachment-located payloads: `(pos, size) -> bytes`.
pub(crate) type Fetch<'a> = &'a mut dyn FnMut(u64, u64) -> Result<Vec<u8>>;

/// Everything a header describes. Image pixel blocks stay unresolved when
/// attachment-located; all other blocks are resident after parsing.
#[derive(Debug, Default)]
pub(crate) struct ParsedUnit {
    pub images: Vec<Image>,
    pub properties: Vec<Property>,
    pub thumbnail: Option<Image>,
}

/// <xisf>
pub(crate) fn parse_unit(header: &[u8], fetch: Fetch<'_>) -> Result<ParsedUnit> {
    let mut reader = Reader::from_reader(header);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::with_capacity(1024);
    let mut unit = ParsedUnit::default();
    let mut in_root = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => {
                if !in_root {
                    check_root(&e)?;
                    in_root = true;
                    buf.clear();
                    continue;
                }
                match local_name(e.name().as_ref()) {
                    b"Image" => {
                        unit.images
                            .push(parse_image(&mut reader, &e, b"Image", true, fetch)?);
                    }
                    b"Thumbnail" => {
                        unit.thumbnail =
                            Some(parse_image(&mut reader, &e, b"Thumbnail", true, fetch)?);
                    }
                    b"Property" => {
                        unit.properties
                            .push(parse_property(&mut reader, &e, true, fetch)?);
                    }
                    b"Metadata" => parse_metadata(&mut reader, &mut unit.properties, fetch)?,
                    other => skip_element(&mut reader, other)?,
                }
            }
            Event::Empty(e) => {
                if !in_root {
                    check_root(&e)?;
                    break;
                }
                match local_name(e.name().as_ref()) {
                    b"Image" => {
                        unit.images
                            .push(parse_image(&mut reader, &e, b"Image", false, fetch)?);
                    }
                    b"Thumbnail" => {
                        unit.thumbnail =
                            Some(parse_image(&mut reader, &e, b"Thumbnail", false, fetch)?);
                    }
                    b"Property" => {
                        unit.properties
                            .push(parse_property(&mut reader, &e, false, fetch)?);
                    }
                    _ => {}
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"xisf" => break,
            Event::Eof => {
                if !in_root {
                    return Err(Error::MalformedHeader("missing <xisf> root element".into()));
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(unit)
}

fn check_root(start: &BytesStart) -> Result<()> {
    if local_name(start.name().as_ref()) != b"xisf" {
        return Err(Error::MalformedHeader(format!(
            "root element is {:?}, expected <xisf>",
            String::from_utf8_lossy(start.name().as_ref())
        )));
    }
    match get_attr(start, b"version").as_deref() {
        Some("1.0") => Ok(()),
        Some(other) => Err(Error::MalformedHeader(format!(
            "unsupported XISF version {other:?}"
        ))),
        None => Err(Error::MalformedHeader("missing XISF version".into())),
    }
}

/// <Image> / <Thumbnail>
fn parse_image<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
    end: &[u8],
    has_body: bool,
    fetch: Fetch<'_>,
) -> Result<Image> {
    let geometry = get_attr(start, b"geometry").unwrap_or_default();
    let dims: Vec<&str> = geometry.split(':').collect();
    if dims.len() != 3 {
        return Err(Error::UnsupportedFeature(format!(
            "geometry {geometry:?}: only two-dimensional images are supported"
        )));
    }
    let mut sizes = [0u64; 3];
    for (out, text) in sizes.iter_mut().zip(&dims) {
        *out = text
            .parse()
            .map_err(|_| Error::InvalidValue(format!("bad geometry {geometry:?}")))?;
    }

    let mut image = Image::new(sizes[0], sizes[1], sizes[2])?;
    image.set_sample_format(SampleFormat::from_name(
        get_attr(start, b"sampleFormat").as_deref().unwrap_or(""),
    ));
    image.color_space =
        ColorSpace::from_name(get_attr(start, b"colorSpace").as_deref().unwrap_or(""));
    // files that omit the attribute read back as planar
    image.set_pixel_storage_tag(PixelStorage::from_name(
        get_attr(start, b"pixelStorage").as_deref().unwrap_or(""),
    ));
    image.image_type =
        ImageType::from_name(get_attr(start, b"imageType").as_deref().unwrap_or(""));

    if let Some(bounds) = get_attr(start, b"bounds") {
        let parts: Vec<&str> = bounds.split(':').collect();
        if parts.len() == 2 {
            let lo = parts[0]
                .parse()
                .map_err(|_| Error::InvalidValue(format!("bad bounds {bounds:?}")))?;
            let hi = parts[1]
                .parse()
                .map_err(|_| Error::InvalidValue(format!("bad bounds {bounds:?}")))?;
            image.bounds = (lo, hi);
        }
    }

    if get_attr(start, b"location").is_none() {
        return Err(Error::InvalidReference("image has no location".into()));
    }
    let inline_encoding = parse_block_attributes(start, &mut image.data_block)?;

    let mut inline_text = String::new();
    let mut embedded: Option<(String, InlineEncoding)> = None;
    let mut buf = Vec::with_capacity(1024);
    while has_body {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"Property" => {
                    let property = parse_property(reader, &e, true, fetch)?;
                    image.add_property(property)?;
                }
                b"FITSKeyword" => {
                    image.add_fits_keyword(parse_fits_keyword(&e));
                    skip_element(reader, b"FITSKeyword")?;
                }
                b"ColorFilterArray" => {
                    image.cfa = Some(parse_cfa(&e)?);
                    skip_element(reader, b"ColorFilterArray")?;
                }
                b"ICCProfile" => {
                    image.icc_profile = parse_icc_profile(reader, &e, true, fetch)?;
                }
                b"Data" if image.data_block.location == Location::Embedded => {
                    let encoding = parse_encoding(get_attr(&e, b"encoding"))?;
                    let content = read_text_content(reader, b"Data")?;
                    embedded = Some((content, encoding));
                }
                other => skip_element(reader, other)?,
            },
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"Property" => {
                    let property = parse_property(reader, &e, false, fetch)?;
                    image.add_property(property)?;
                }
                b"FITSKeyword" => image.add_fits_keyword(parse_fits_keyword(&e)),
                b"ColorFilterArray" => image.cfa = Some(parse_cfa(&e)?),
                b"ICCProfile" => {
                    image.icc_profile = parse_icc_profile(reader, &e, false, fetch)?;
                }
                _ => {}
            },
            Event::Text(t) => inline_text.push_str(&t.unescape().map_err(xml_error)?),
            Event::End(e) if local_name(e.name().as_ref()) == end => break,
            Event::Eof => {
                return Err(Error::MalformedHeader(format!(
                    "unexpected end of header inside <{}>",
                    String::from_utf8_lossy(end)
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    match image.data_block.location {
        Location::Inline => {
            image
                .data_block
                .decompress_from(inline_text.as_bytes(), inline_encoding)?;
            image.verify_pixel_block()?;
        }
        Location::Embedded => {
            let (content, encoding) = embedded.ok_or_else(|| {
                Error::MalformedHeader("embedded image without a <Data> element".into())
            })?;
            image
                .data_block
                .decompress_from(content.as_bytes(), Some(encoding))?;
            image.verify_pixel_block()?;
        }
        // pixels are fetched on demand
        Location::Attachment => image.data_block.data = crate::bytes::ByteBuffer::default(),
    }

    Ok(image)
}

/// <Property>
fn parse_property<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
    has_body: bool,
    fetch: Fetch<'_>,
) -> Result<Property> {
    let id = get_attr(start, b"id").unwrap_or_default();
    let type_name = get_attr(start, b"type").unwrap_or_default();
    let kind = ValueKind::from_name(&type_name).ok_or_else(|| {
        Error::InvalidValue(format!("unknown property type {type_name:?} on {id:?}"))
    })?;

    let mut property = Property {
        id,
        value: Value::Monostate,
        comment: get_attr(start, b"comment").unwrap_or_default(),
        format: get_attr(start, b"format").unwrap_or_default(),
    };

    let value_attr = get_attr(start, b"value");
    let has_location = get_attr(start, b"location").is_some();

    if kind == ValueKind::String && !has_location {
        // exactly one of attribute and inner text carries the string
        property.value = match value_attr {
            Some(text) => {
                if has_body {
                    skip_element(reader, b"Property")?;
                }
                Value::String(text)
            }
            None => {
                let text = if has_body {
                    read_text_content(reader, b"Property")?
                } else {
                    String::new()
                };
                Value::String(text)
            }
        };
        return Ok(property);
    }

    if kind == ValueKind::Monostate {
        if has_body {
            skip_element(reader, b"Property")?;
        }
        return Ok(property);
    }

    if kind.uses_value_attribute() {
        let text = value_attr.ok_or_else(|| {
            Error::InvalidValue(format!("property {:?} has no value", property.id))
        })?;
        property.value = Value::parse_scalar(kind, &text)?;
        if has_body {
            skip_element(reader, b"Property")?;
        }
        return Ok(property);
    }

    // data-block payloads: strings with a location, vectors, matrices
    if !has_location {
        return Err(Error::InvalidReference(format!(
            "property {:?} carries a data block but has no location",
            property.id
        )));
    }
    let mut data_block = DataBlock::default();
    let inline_encoding = parse_block_attributes(start, &mut data_block)?;
    read_block_element(reader, b"Property", has_body, &mut data_block, inline_encoding, fetch)?;
    let bytes = data_block.data.as_slice();

    property.value = if kind == ValueKind::String {
        Value::String(
            String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::InvalidValue(format!("property {:?} is not UTF-8", property.id)))?,
        )
    } else if kind.is_vector() {
        let length: usize = get_attr(start, b"length")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                Error::InvalidValue(format!("vector property {:?} has no length", property.id))
            })?;
        Value::vector_from_le_bytes(kind, length, bytes)?
    } else {
        let rows: usize = get_attr(start, b"rows")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                Error::InvalidValue(format!("matrix property {:?} has no rows", property.id))
            })?;
        let cols: usize = get_attr(start, b"columns")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                Error::InvalidValue(format!("matrix property {:?} has no columns", property.id))
            })?;
        Value::matrix_from_le_bytes(kind, rows, cols, bytes)?
    };
    Ok(property)
}

/// <Metadata>
fn parse_metadata<R: BufRead>(
    reader: &mut Reader<R>,
    properties: &mut Vec<Property>,
    fetch: Fetch<'_>,
) -> Result<()> {
    let mut buf = Vec::with_capacity(512);
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => {
                if local_name(e.name().as_ref()) == b"Property" {
                    properties.push(parse_property(reader, &e, true, fetch)?);
                } else {
                    skip_element(reader, e.name().as_ref())?;
                }
            }
            Event::Empty(e) => {
                if local_name(e.name().as_ref()) == b"Property" {
                    properties.push(parse_property(reader, &e, false, fetch)?);
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"Metadata" => break,
            Event::Eof => {
                return Err(Error::MalformedHeader(
                    "unexpected end of header inside <Metadata>".into(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// <FITSKeyword>
fn parse_fits_keyword(start: &BytesStart) -> FitsKeyword {
    FitsKeyword {
        name: get_attr(start, b"name").unwrap_or_default(),
        value: get_attr(start, b"value").unwrap_or_default(),
        comment: get_attr(start, b"comment").unwrap_or_default(),
    }
}

/// <ColorFilterArray>
fn parse_cfa(start: &BytesStart) -> Result<ColorFilterArray> {
    let pattern = get_attr(start, b"pattern").unwrap_or_default();
    image::validate_cfa_pattern(&pattern)?;
    Ok(ColorFilterArray {
        width: get_attr(start, b"width").and_then(|v| v.parse().ok()).unwrap_or(0),
        height: get_attr(start, b"height").and_then(|v| v.parse().ok()).unwrap_or(0),
        pattern,
    })
}

/// <ICCProfile>
fn parse_icc_profile<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
    has_body: bool,
    fetch: Fetch<'_>,
) -> Result<crate::bytes::ByteBuffer> {
    let mut data_block = DataBlock::default();
    let inline_encoding = parse_block_attributes(start, &mut data_block)?;
    read_block_element(
        reader,
        b"ICCProfile",
        has_body,
        &mut data_block,
        inline_encoding,
        fetch,
    )?;
    Ok(data_block.data)
}

/// Pull `compression`, `subblocks` and `location` off an element that owns
/// a data block. Returns the inline transport encoding when the location
/// is inline.
fn parse_block_attributes(
    start: &BytesStart,
    data_block: &mut DataBlock,
) -> Result<Option<InlineEncoding>> {
    if let Some(attr) = get_attr(start, b"compression") {
        data_block.parse_compression(&attr)?;
    }
    if let Some(attr) = get_attr(start, b"subblocks") {
        data_block.parse_sub_blocks(&attr)?;
    }
    let Some(attr) = get_attr(start, b"location") else {
        return Ok(None);
    };
    let location = block::parse_location(&attr)?;
    data_block.apply_location(location);
    Ok(match location {
        LocationAttr::Inline(encoding) => Some(encoding),
        _ => None,
    })
}

/// Read a block-carrying element's body and leave its payload resident:
/// inline text, an embedded `<Data>` child, or a fetched attachment.
fn read_block_element<R: BufRead>(
    reader: &mut Reader<R>,
    end: &[u8],
    has_body: bool,
    data_block: &mut DataBlock,
    inline_encoding: Option<InlineEncoding>,
    fetch: Fetch<'_>,
) -> Result<()> {
    let mut text = String::new();
    let mut embedded: Option<(String, InlineEncoding)> = None;

    if has_body {
        let mut buf = Vec::with_capacity(512);
        loop {
            match reader.read_event_into(&mut buf).map_err(xml_error)? {
                Event::Start(e) => {
                    if local_name(e.name().as_ref()) == b"Data" {
                        let encoding = parse_encoding(get_attr(&e, b"encoding"))?;
                        let content = read_text_content(reader, b"Data")?;
                        embedded = Some((content, encoding));
                    } else {
                        skip_element(reader, e.name().as_ref())?;
                    }
                }
                Event::Text(t) => text.push_str(&t.unescape().map_err(xml_error)?),
                Event::End(e) if local_name(e.name().as_ref()) == end => break,
                Event::Eof => {
                    return Err(Error::MalformedHeader(format!(
                        "unexpected end of header inside <{}>",
                        String::from_utf8_lossy(end)
                    )));
                }
                _ => {}
            }
            buf.clear();
        }
    }

    match data_block.location {
        Location::Inline => data_block.decompress_from(text.as_bytes(), inline_encoding),
        Location::Embedded => {
            let (content, encoding) = embedded.ok_or_else(|| {
                Error::MalformedHeader("embedded block without a <Data> element".into())
            })?;
            data_block.decompress_from(content.as_bytes(), Some(encoding))
        }
        Location::Attachment => {
            let bytes = fetch(data_block.attachment_pos, data_block.attachment_size)?;
            data_block.decompress_from(&bytes, None)
        }
    }
}

fn parse_encoding(attr: Option<String>) -> Result<InlineEncoding> {
    match attr.as_deref() {
        None | Some("base64") => Ok(InlineEncoding::Base64),
        Some("base16") => Ok(InlineEncoding::Base16),
        Some(other) => Err(Error::InvalidValue(format!(
            "unknown data encoding {other:?}"
        ))),
    }
}

fn get_attr(start: &BytesStart, name: &[u8]) -> Option<String> {
    for attr in start.attributes().with_checks(false).flatten() {
        if attr.key.as_ref() == name {
            return attr.unescape_value().ok().map(|v| v.to_string());
        }
    }
    None
}

#[inline]
fn local_name(raw: &[u8]) -> &[u8] {
    match raw.iter().rposition(|&b| b == b':') {
        Some(colon) => &raw[colon + 1..],
        None => raw,
    }
}

fn skip_element<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<()> {
    let mut depth = 1usize;
    let mut buf = Vec::with_capacity(256);
    while depth != 0 {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                depth -= 1;
                if depth == 0 && local_name(e.name().as_ref()) != end {
                    return Err(Error::MalformedHeader(format!(
                        "mismatched </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn read_text_content<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<String> {
    let mut buf = Vec::with_capacity(512);
    let mut out = String::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Text(t) => out.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(t) => out.push_str(&String::from_utf8_lossy(&t.into_inner())),
            Event::End(e) if local_name(e.name().as_ref()) == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn xml_error<E: std::fmt::Display>(e: E) -> Error {
    Error::MalformedHeader(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_fetch() -> impl FnMut(u64, u64) -> Result<Vec<u8>> {
        |_, _| panic!("no attachment expected")
    }

    fn parse(header: &str) -> Result<ParsedUnit> {
        let mut fetch = no_fetch();
        parse_unit(header.as_bytes(), &mut fetch)
    }

    #[test]
    fn rejects_wrong_version_and_root() {
        let err = parse(r#"<xisf version="2.0"></xisf>"#).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));

        let err = parse(r#"<fits version="1.0"></fits>"#).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));

        let err = parse("not xml at all").unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let unit = parse(
            r#"<xisf version="1.0">
                 <Extension><Deep><Deeper/></Deep></Extension>
                 <Property id="Flag" type="Boolean" value="1"/>
               </xisf>"#,
        )
        .unwrap();
        assert_eq!(unit.properties.len(), 1);
        assert_eq!(unit.properties[0].value, Value::Boolean(true));
    }

    #[test]
    fn inline_image_with_metadata_children() {
        let unit = parse(
            r#"<xisf version="1.0">
                 <Image geometry="2:2:1" sampleFormat="UInt8" colorSpace="Gray"
                        pixelStorage="Planar" imageType="Flat" location="inline:base64">
                   <FITSKeyword name="RA" value="226.97" comment="right ascension"/>
                   <ColorFilterArray pattern="RGGB" width="2" height="2"/>
                   <Property id="Note" type="String">hello</Property>
                   AAECAw==
                 </Image>
               </xisf>"#,
        )
        .unwrap();
        let image = &unit.images[0];
        assert_eq!(image.width(), 2);
        assert_eq!(image.image_type, ImageType::Flat);
        assert_eq!(image.data_block.data.as_slice(), &[0, 1, 2, 3]);
        assert_eq!(image.fits_keywords().len(), 1);
        assert_eq!(image.cfa.as_ref().unwrap().pattern, "RGGB");
        assert_eq!(
            image.property("Note").unwrap().value,
            Value::String("hello".into())
        );
    }

    #[test]
    fn embedded_image_data_child() {
        let unit = parse(
            r#"<xisf version="1.0">
                 <Image geometry="2:1:1" sampleFormat="UInt8" location="embedded">
                   <Data encoding="base16">beef</Data>
                 </Image>
               </xisf>"#,
        )
        .unwrap();
        assert_eq!(unit.images[0].data_block.data.as_slice(), &[0xbe, 0xef]);
    }

    #[test]
    fn attachment_image_stays_lazy() {
        let mut fetch = no_fetch();
        let unit = parse_unit(
            br#"<xisf version="1.0">
                  <Image geometry="8:10:1" sampleFormat="UInt16" location="attachment:4096:160"/>
                </xisf>"#,
            &mut fetch,
        )
        .unwrap();
        let block = &unit.images[0].data_block;
        assert_eq!(block.location, Location::Attachment);
        assert_eq!(block.attachment_pos, 4096);
        assert_eq!(block.attachment_size, 160);
        assert!(block.data.is_empty());
    }

    #[test]
    fn attachment_property_resolves_eagerly() {
        let payload: Vec<u8> = vec![23, 0, 45, 0, 86, 0];
        let mut fetch = move |pos: u64, size: u64| -> Result<Vec<u8>> {
            assert_eq!(pos, 100);
            assert_eq!(size, 6);
            Ok(payload.clone())
        };
        let unit = parse_unit(
            br#"<xisf version="1.0">
                  <Property id="Vec" type="UI16Vector" length="3" location="attachment:100:6"/>
                </xisf>"#,
            &mut fetch,
        )
        .unwrap();
        assert_eq!(
            unit.properties[0].value,
            Value::UI16Vector(vec![23, 45, 86])
        );
    }

    #[test]
    fn vector_length_mismatch_is_structural() {
        let err = parse(
            r#"<xisf version="1.0">
                 <Property id="Vec" type="UI16Vector" length="4" location="inline:base64">FwAtAFYA</Property>
               </xisf>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn unknown_property_type_aborts() {
        let err = parse(
            r#"<xisf version="1.0">
                 <Property id="X" type="Float128" value="1"/>
               </xisf>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn unknown_image_enums_fall_back_to_defaults() {
        let unit = parse(
            r#"<xisf version="1.0">
                 <Image geometry="1:1:1" sampleFormat="Float128" colorSpace="HSV"
                        imageType="Mystery" location="inline:base64">AAA=</Image>
               </xisf>"#,
        )
        .unwrap();
        let image = &unit.images[0];
        assert_eq!(image.sample_format(), SampleFormat::UInt16);
        assert_eq!(image.color_space, ColorSpace::Gray);
        assert_eq!(image.pixel_storage(), PixelStorage::Planar);
        assert_eq!(image.image_type, ImageType::Light);
    }

    #[test]
    fn bad_geometry_is_rejected() {
        assert!(matches!(
            parse(r#"<xisf version="1.0"><Image geometry="4:4:4:1" location="embedded"/></xisf>"#),
            Err(Error::UnsupportedFeature(_))
        ));
        assert!(matches!(
            parse(r#"<xisf version="1.0"><Image geometry="0:4:1" location="embedded"/></xisf>"#),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn string_property_value_attribute_wins() {
        let unit = parse(
            r#"<xisf version="1.0">
                 <Property id="S" type="String" value="attr form"/>
               </xisf>"#,
        )
        .unwrap();
        assert_eq!(unit.properties[0].value, Value::String("attr form".into()));
    }
}
