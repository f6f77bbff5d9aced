use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::block::Location;
use crate::bytes::ByteBuffer;
use crate::error::{Error, Result};
use crate::image::{self, Image, Property};
use crate::value::{TimePoint, Value};

/// Placeholder offset for every attachment; its decimal length gives the
/// back-patch pass room for any real offset.
pub(crate) const ATTACHMENT_SENTINEL: &str = "2147483648";

const XISF_NAMESPACE: &str = "http://www.pixinsight.com/xisf";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://www.pixinsight.com/xisf http://pixinsight.com/xisf/xisf-1.0.xsd";

/// <xisf>
pub(crate) fn build_header(
    images: &[Image],
    properties: &[Property],
    creator: &str,
    creation_time: TimePoint,
) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    emit(
        &mut writer,
        Event::Comment(BytesText::new(
            "\nExtensible Image Serialization Format - XISF version 1.0\n",
        )),
    )?;

    let mut root = BytesStart::new("xisf");
    root.push_attribute(("version", "1.0"));
    root.push_attribute(("xmlns", XISF_NAMESPACE));
    root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    emit(&mut writer, Event::Start(root))?;

    for image in images {
        write_image(&mut writer, image)?;
    }
    write_metadata(&mut writer, properties, creator, creation_time)?;

    emit(&mut writer, Event::End(BytesEnd::new("xisf")))?;
    Ok(writer.into_inner())
}

/// <Image>
fn write_image(writer: &mut Writer<Vec<u8>>, image: &Image) -> Result<()> {
    let mut tag = BytesStart::new("Image");
    tag.push_attribute((
        "geometry",
        format!(
            "{}:{}:{}",
            image.width(),
            image.height(),
            image.channel_count()
        )
        .as_str(),
    ));
    tag.push_attribute(("sampleFormat", image.sample_format().name()));
    if image.bounds != image::DEFAULT_BOUNDS && image.sample_format().is_float() {
        tag.push_attribute((
            "bounds",
            format!("{}:{}", image.bounds.0, image.bounds.1).as_str(),
        ));
    }
    tag.push_attribute(("colorSpace", image.color_space.name()));
    tag.push_attribute(("pixelStorage", image.pixel_storage().name()));
    tag.push_attribute(("imageType", image.image_type.name()));
    push_block_attributes(&mut tag, &image.data_block);

    emit(writer, Event::Start(tag))?;

    if !image.icc_profile.is_empty() {
        let mut icc = BytesStart::new("ICCProfile");
        icc.push_attribute(("location", "inline:base64"));
        emit(writer, Event::Start(icc))?;
        emit(
            writer,
            Event::Text(BytesText::new(&base64_text(&image.icc_profile))),
        )?;
        emit(writer, Event::End(BytesEnd::new("ICCProfile")))?;
    }

    if let Some(cfa) = &image.cfa {
        let mut tag = BytesStart::new("ColorFilterArray");
        tag.push_attribute(("pattern", cfa.pattern.as_str()));
        tag.push_attribute(("width", cfa.width.to_string().as_str()));
        tag.push_attribute(("height", cfa.height.to_string().as_str()));
        emit(writer, Event::Empty(tag))?;
    }

    for keyword in image.fits_keywords() {
        let mut tag = BytesStart::new("FITSKeyword");
        tag.push_attribute(("name", keyword.name.as_str()));
        tag.push_attribute(("value", keyword.value.as_str()));
        tag.push_attribute(("comment", keyword.comment.as_str()));
        emit(writer, Event::Empty(tag))?;
    }

    for property in image.properties() {
        write_property(writer, property)?;
    }

    match image.data_block.location {
        Location::Embedded => {
            let mut data = BytesStart::new("Data");
            data.push_attribute(("encoding", "base64"));
            emit(writer, Event::Start(data))?;
            emit(
                writer,
                Event::Text(BytesText::new(&base64_text(&image.data_block.data))),
            )?;
            emit(writer, Event::End(BytesEnd::new("Data")))?;
        }
        Location::Inline => {
            emit(
                writer,
                Event::Text(BytesText::new(&base64_text(&image.data_block.data))),
            )?;
        }
        Location::Attachment => {}
    }

    emit(writer, Event::End(BytesEnd::new("Image")))?;
    Ok(())
}

/// <Property>
fn write_property(writer: &mut Writer<Vec<u8>>, property: &Property) -> Result<()> {
    let mut tag = BytesStart::new("Property");
    tag.push_attribute(("id", property.id.as_str()));
    tag.push_attribute(("type", property.value.type_name()));
    if !property.format.is_empty() {
        tag.push_attribute(("format", property.format.as_str()));
    }
    if !property.comment.is_empty() {
        tag.push_attribute(("comment", property.comment.as_str()));
    }

    if let Value::String(text) = &property.value {
        emit(writer, Event::Start(tag))?;
        emit(writer, Event::Text(BytesText::new(text)))?;
        emit(writer, Event::End(BytesEnd::new("Property")))?;
        return Ok(());
    }

    if let Some(text) = property.value.format_scalar() {
        tag.push_attribute(("value", text.as_str()));
        emit(writer, Event::Empty(tag))?;
        return Ok(());
    }

    if let Some(length) = property.value.vector_len() {
        tag.push_attribute(("length", length.to_string().as_str()));
    } else if let Some((rows, cols)) = property.value.matrix_dims() {
        tag.push_attribute(("rows", rows.to_string().as_str()));
        tag.push_attribute(("columns", cols.to_string().as_str()));
    } else {
        // Monostate
        emit(writer, Event::Empty(tag))?;
        return Ok(());
    }

    let bytes = property.value.block_bytes().unwrap_or_default();
    tag.push_attribute(("location", "inline:base64"));
    emit(writer, Event::Start(tag))?;
    emit(
        writer,
        Event::Text(BytesText::new(&base64_text(&ByteBuffer::from_vec(bytes)))),
    )?;
    emit(writer, Event::End(BytesEnd::new("Property")))?;
    Ok(())
}

/// <Metadata>
fn write_metadata(
    writer: &mut Writer<Vec<u8>>,
    properties: &[Property],
    creator: &str,
    creation_time: TimePoint,
) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("Metadata")))?;

    write_property(
        writer,
        &Property::new("XISF:CreationTime", Value::TimePoint(creation_time)),
    )?;
    write_property(
        writer,
        &Property::new("XISF:CreatorApplication", Value::String(creator.to_string())),
    )?;
    for property in properties {
        write_property(writer, property)?;
    }

    emit(writer, Event::End(BytesEnd::new("Metadata")))?;
    Ok(())
}

fn push_block_attributes(tag: &mut BytesStart, block: &crate::block::DataBlock) {
    if let Some(attr) = block.compression_attribute() {
        tag.push_attribute(("compression", attr.as_str()));
    }
    if let Some(attr) = block.sub_blocks_attribute() {
        tag.push_attribute(("subblocks", attr.as_str()));
    }
    let location = match block.location {
        Location::Embedded => "embedded".to_string(),
        Location::Inline => "inline:base64".to_string(),
        Location::Attachment => {
            format!("attachment:{ATTACHMENT_SENTINEL}:{}", block.data.len())
        }
    };
    tag.push_attribute(("location", location.as_str()));
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::MalformedHeader(format!("header serialization failed: {e}")))
}

fn base64_text(data: &ByteBuffer) -> String {
    let mut encoded = data.clone();
    encoded.encode_base64();
    String::from_utf8_lossy(encoded.as_slice()).into_owned()
}
