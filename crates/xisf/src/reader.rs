use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::block::Location;
use crate::error::{Error, Result};
use crate::image::{Image, Property};
use crate::xml;

pub(crate) const SIGNATURE: &[u8; 8] = b"XISF0100";

/// Attachment reads are chunked to stay below single-call limits of some
/// stream layers.
const IO_CHUNK: usize = 1 << 30;

pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Loads a unit: signature check, header XML, then on-demand attachment
/// fetches. Not safe for concurrent use; independent readers share nothing.
#[derive(Default)]
pub struct XISFReader {
    io: Option<Box<dyn ReadSeek>>,
    images: Vec<Image>,
    properties: Vec<Property>,
    thumbnail: Option<Image>,
}

impl XISFReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        self.open_io(Box::new(file))
    }

    pub fn open_data(&mut self, data: &[u8]) -> Result<()> {
        self.open_io(Box::new(Cursor::new(data.to_vec())))
    }

    pub fn open_io(&mut self, mut io: Box<dyn ReadSeek>) -> Result<()> {
        self.close();

        let mut signature = [0u8; 8];
        io.read_exact(&mut signature)?;
        if &signature != SIGNATURE {
            return Err(Error::MalformedHeader(format!(
                "bad signature {:?}",
                String::from_utf8_lossy(&signature)
            )));
        }

        let mut prefix = [0u8; 8];
        io.read_exact(&mut prefix)?;
        let header_size = u32::from_le_bytes(prefix[0..4].try_into().unwrap());

        let header = read_chunked(&mut io, header_size as u64)?;

        let mut fetch = |pos: u64, size: u64| -> Result<Vec<u8>> {
            io.seek(SeekFrom::Start(pos))?;
            read_chunked(&mut io, size)
        };
        let unit = xml::read::parse_unit(&header, &mut fetch)?;

        debug!(
            images = unit.images.len(),
            properties = unit.properties.len(),
            header_size,
            "opened XISF unit"
        );

        self.images = unit.images;
        self.properties = unit.properties;
        self.thumbnail = unit.thumbnail;
        self.io = Some(io);
        Ok(())
    }

    /// Drop the stream and all cached state.
    pub fn close(&mut self) {
        self.io = None;
        self.images.clear();
        self.properties.clear();
        self.thumbnail = None;
    }

    pub fn images_count(&self) -> usize {
        self.images.len()
    }

    /// Image `n`; with `read_pixels` the attachment payload is fetched,
    /// decoded and cached on first access.
    pub fn get_image(&mut self, n: usize, read_pixels: bool) -> Result<&Image> {
        if n >= self.images.len() {
            return Err(Error::OutOfBounds(format!(
                "image index {n}, unit has {}",
                self.images.len()
            )));
        }

        let image = &mut self.images[n];
        if read_pixels
            && image.data_block.location == Location::Attachment
            && image.data_block.attachment_pos != 0
        {
            let io = self.io.as_mut().ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "reader is closed",
                ))
            })?;
            debug!(
                index = n,
                pos = image.data_block.attachment_pos,
                size = image.data_block.attachment_size,
                "fetching attachment"
            );
            io.seek(SeekFrom::Start(image.data_block.attachment_pos))?;
            let bytes = read_chunked(io, image.data_block.attachment_size)?;
            image.data_block.decompress_from(&bytes, None)?;
            image.verify_pixel_block()?;
        }

        Ok(&self.images[n])
    }

    /// File-level metadata properties, in header order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn thumbnail(&self) -> Option<&Image> {
        self.thumbnail.as_ref()
    }
}

fn read_chunked(io: &mut Box<dyn ReadSeek>, len: u64) -> Result<Vec<u8>> {
    let mut out = vec![0u8; len as usize];
    for chunk in out.chunks_mut(IO_CHUNK) {
        io.read_exact(chunk)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_checked() {
        let mut reader = XISFReader::new();
        let err = reader.open_data(b"XISF0099\0\0\0\0\0\0\0\0").unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)), "{err}");
    }

    #[test]
    fn short_file_is_an_io_error() {
        let mut reader = XISFReader::new();
        let err = reader.open_data(b"XIS").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn header_length_prefix_is_honored() {
        let xml = br#"<xisf version="1.0"></xisf>"#;
        let mut data = Vec::new();
        data.extend_from_slice(SIGNATURE);
        data.extend_from_slice(&(xml.len() as u32).to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(xml);

        let mut reader = XISFReader::new();
        reader.open_data(&data).unwrap();
        assert_eq!(reader.images_count(), 0);

        reader.close();
        assert_eq!(reader.images_count(), 0);
    }

    #[test]
    fn wrong_version_is_malformed() {
        let xml = br#"<xisf version="2.0"></xisf>"#;
        let mut data = Vec::new();
        data.extend_from_slice(SIGNATURE);
        data.extend_from_slice(&(xml.len() as u32).to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(xml);

        let mut reader = XISFReader::new();
        assert!(matches!(
            reader.open_data(&data),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn image_index_is_bounds_checked() {
        let xml = br#"<xisf version="1.0"></xisf>"#;
        let mut data = Vec::new();
        data.extend_from_slice(SIGNATURE);
        data.extend_from_slice(&(xml.len() as u32).to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(xml);

        let mut reader = XISFReader::new();
        reader.open_data(&data).unwrap();
        assert!(matches!(
            reader.get_image(0, true),
            Err(Error::OutOfBounds(_))
        ));
    }
}
