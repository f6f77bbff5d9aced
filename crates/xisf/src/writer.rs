use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use tracing::debug;

use crate::block::Location;
use crate::codec::CompressionCodec;
use crate::error::{Error, Result};
use crate::image::{Image, Property};
use crate::reader::SIGNATURE;
use crate::xml::{self, write::ATTACHMENT_SENTINEL};

const SIGNATURE_AREA: usize = 16;
const IO_CHUNK: usize = 1 << 30;
/// Offset substitution starts past the signature area and the XML
/// declaration, where no attachment location can occur.
const PATCH_START: usize = 32;

/// Serializes queued images into a unit: header XML with placeholder
/// offsets, a back-patch pass once the header length is known, then the
/// concatenated attachment payloads.
pub struct XISFWriter {
    images: Vec<Image>,
    properties: Vec<Property>,
    creator_application: String,
}

impl Default for XISFWriter {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            properties: Vec::new(),
            creator_application: concat!("xisf-rs ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl XISFWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text identifier written as `XISF:CreatorApplication`.
    pub fn set_creator_application(&mut self, name: &str) {
        self.creator_application = name.to_string();
    }

    /// Queue a file-level metadata property.
    pub fn add_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Queue an image; its pixel block runs the write pipeline now so the
    /// header can carry final compressed sizes.
    pub fn write_image(&mut self, image: &Image) -> Result<()> {
        let mut image = image.clone();
        let item_size = image.sample_format().sample_size();
        if image.data_block.codec == CompressionCodec::None {
            // the compression attribute is the only carrier of the
            // shuffle item size
            image.data_block.byte_shuffling = 0;
        } else if image.data_block.byte_shuffling > 1 {
            image.data_block.byte_shuffling = item_size;
        }
        image.verify_pixel_block()?;
        image.data_block.compress_in_place(item_size)?;
        if image.data_block.location == Location::Attachment {
            image.data_block.attachment_size = image.data_block.data.len() as u64;
        }
        self.images.push(image);
        Ok(())
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        self.save_io(&mut file)
    }

    pub fn save_buffer(&self, out: &mut Vec<u8>) -> Result<()> {
        self.save_io(out)
    }

    pub fn save_io<W: Write>(&self, io: &mut W) -> Result<()> {
        let header = self.build_header()?;
        debug!(
            header = header.len(),
            images = self.images.len(),
            "writing XISF unit"
        );
        io.write_all(&header)?;

        for image in &self.images {
            if image.data_block.location != Location::Attachment {
                continue;
            }
            for chunk in image.data_block.data.as_slice().chunks(IO_CHUNK) {
                io.write_all(chunk)?;
            }
        }
        Ok(())
    }

    fn build_header(&self) -> Result<Vec<u8>> {
        let xml = xml::write::build_header(
            &self.images,
            &self.properties,
            &self.creator_application,
            Utc::now(),
        )?;

        let mut out = Vec::with_capacity(SIGNATURE_AREA + xml.len());
        out.extend_from_slice(SIGNATURE);
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&xml);

        // the emitted length is final: substitution can only shrink the
        // buffer and the pad below restores it
        let size = out.len();

        let needle = format!("attachment:{ATTACHMENT_SENTINEL}");
        let mut cursor = PATCH_START.min(size);
        let mut offset = size as u64;
        for image in &self.images {
            if image.data_block.location != Location::Attachment {
                continue;
            }
            let found = find_subslice(&out, needle.as_bytes(), cursor).ok_or_else(|| {
                Error::MalformedHeader("attachment placeholder not found".into())
            })?;
            let digits = found + "attachment:".len()..found + needle.len();
            let replacement = offset.to_string();
            cursor = digits.start + replacement.len();
            out.splice(digits, replacement.into_bytes());
            offset += image.data_block.data.len() as u64;
        }

        out.resize(size, 0);
        let header_size = (size - SIGNATURE_AREA) as u32;
        out[8..12].copy_from_slice(&header_size.to_le_bytes());
        Ok(out)
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|p| p + from)
}
