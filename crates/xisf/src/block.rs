use crate::bytes::ByteBuffer;
use crate::codec::{self, CompressionCodec, SubBlock};
use crate::error::{Error, Result};
use crate::shuffle;

/// Where a block's payload lives in the persisted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    /// Text inside the owning element, transport-encoded.
    Inline,
    /// A `<Data encoding="...">` child element.
    Embedded,
    /// Past the header, at an absolute byte offset.
    #[default]
    Attachment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineEncoding {
    Base64,
    Base16,
}

/// Parsed form of the `location` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocationAttr {
    Embedded,
    Inline(InlineEncoding),
    Attachment { pos: u64, size: u64 },
}

/// A located, optionally compressed and shuffled payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    pub location: Location,
    /// Item size for byte shuffling; 0 or 1 disables.
    pub byte_shuffling: usize,
    /// Absolute byte offset of an attachment, counted from file start.
    /// Zero once the payload is resident.
    pub attachment_pos: u64,
    /// Compressed byte length of an attachment.
    pub attachment_size: u64,
    pub uncompressed_size: u64,
    pub codec: CompressionCodec,
    /// Codec-specific level; `-1` requests the library default.
    pub compress_level: i32,
    pub sub_blocks: Vec<SubBlock>,
    pub data: ByteBuffer,
}

impl Default for DataBlock {
    fn default() -> Self {
        Self {
            location: Location::default(),
            byte_shuffling: 0,
            attachment_pos: 0,
            attachment_size: 0,
            uncompressed_size: 0,
            codec: CompressionCodec::None,
            compress_level: -1,
            sub_blocks: Vec::new(),
            data: ByteBuffer::default(),
        }
    }
}

impl DataBlock {
    /// Run the read pipeline: transport decode (inline), codec, inverse
    /// shuffle. The block is fully resident afterwards.
    pub fn decompress_from(&mut self, input: &[u8], encoding: Option<InlineEncoding>) -> Result<()> {
        let mut transport = ByteBuffer::from_slice(input);
        match encoding {
            Some(InlineEncoding::Base64) => transport.decode_base64(),
            Some(InlineEncoding::Base16) => transport.decode_base16(),
            None => {}
        }

        let raw = if self.codec == CompressionCodec::None {
            transport.to_vec()
        } else {
            codec::decompress(
                self.codec,
                transport.as_slice(),
                self.uncompressed_size as usize,
                &self.sub_blocks,
            )?
        };

        let out = if self.byte_shuffling > 1 {
            shuffle::unshuffle(&raw, self.byte_shuffling)
        } else {
            raw
        };

        self.data = ByteBuffer::from_vec(out);
        self.attachment_pos = 0;
        Ok(())
    }

    /// Run the write pipeline: record the uncompressed size, apply the
    /// process-wide override, shuffle, compress. `item_size` is the sample
    /// width of the owning payload, used when the override turns
    /// shuffling on.
    pub fn compress_in_place(&mut self, item_size: usize) -> Result<()> {
        self.uncompressed_size = self.data.len() as u64;

        if let Some(or) = codec::compression_override() {
            self.codec = or.codec;
            self.compress_level = or.level;
            self.byte_shuffling = if or.shuffle { item_size } else { 0 };
        }

        let shuffled = if self.byte_shuffling > 1 {
            shuffle::shuffle(self.data.as_slice(), self.byte_shuffling)
        } else {
            self.data.to_vec()
        };

        let (out, sub_blocks) = codec::compress(self.codec, &shuffled, self.compress_level)?;
        self.sub_blocks = sub_blocks;
        self.data = ByteBuffer::from_vec(out);
        Ok(())
    }

    pub(crate) fn apply_location(&mut self, attr: LocationAttr) {
        match attr {
            LocationAttr::Embedded => self.location = Location::Embedded,
            LocationAttr::Inline(_) => self.location = Location::Inline,
            LocationAttr::Attachment { pos, size } => {
                self.location = Location::Attachment;
                self.attachment_pos = pos;
                self.attachment_size = size;
            }
        }
    }

    /// Parse `codecName("+sh")?":"uncompressedSize(":"itemSize)?`.
    pub(crate) fn parse_compression(&mut self, attr: &str) -> Result<()> {
        let fields: Vec<&str> = attr.split(':').collect();
        if fields.len() < 2 {
            return Err(Error::InvalidValue(format!(
                "compression attribute {attr:?} needs a codec and a size"
            )));
        }

        let (name, shuffled) = match fields[0].strip_suffix("+sh") {
            Some(stripped) => (stripped, true),
            None => (fields[0], false),
        };
        self.codec = CompressionCodec::from_wire_name(name)
            .ok_or_else(|| Error::UnsupportedFeature(format!("unknown codec {name:?}")))?;

        self.uncompressed_size = fields[1]
            .parse()
            .map_err(|_| Error::InvalidValue(format!("bad uncompressed size {:?}", fields[1])))?;

        if shuffled {
            let item = fields.get(2).ok_or_else(|| {
                Error::InvalidValue("+sh compression is missing its item size".into())
            })?;
            self.byte_shuffling = item
                .parse()
                .map_err(|_| Error::InvalidValue(format!("bad shuffle item size {item:?}")))?;
        }
        Ok(())
    }

    /// Serialized `compression` attribute; `None` when uncompressed.
    pub(crate) fn compression_attribute(&self) -> Option<String> {
        if self.codec == CompressionCodec::None {
            return None;
        }
        let mut out = self.codec.wire_name().to_string();
        if self.byte_shuffling > 1 {
            out.push_str("+sh");
        }
        out.push(':');
        out.push_str(&self.uncompressed_size.to_string());
        if self.byte_shuffling > 1 {
            out.push(':');
            out.push_str(&self.byte_shuffling.to_string());
        }
        Some(out)
    }

    /// Parse the `subblocks` attribute: a `:`-separated list of
    /// `compressedLen,decompressedLen` pairs.
    pub(crate) fn parse_sub_blocks(&mut self, attr: &str) -> Result<()> {
        let mut out = Vec::new();
        for pair in attr.split(':') {
            let (c, d) = pair.split_once(',').ok_or_else(|| {
                Error::InvalidValue(format!("bad sub-block pair {pair:?}"))
            })?;
            out.push(SubBlock {
                compressed: c
                    .parse()
                    .map_err(|_| Error::InvalidValue(format!("bad sub-block length {c:?}")))?,
                uncompressed: d
                    .parse()
                    .map_err(|_| Error::InvalidValue(format!("bad sub-block length {d:?}")))?,
            });
        }
        self.sub_blocks = out;
        Ok(())
    }

    pub(crate) fn sub_blocks_attribute(&self) -> Option<String> {
        if self.sub_blocks.is_empty() {
            return None;
        }
        Some(
            self.sub_blocks
                .iter()
                .map(|s| format!("{},{}", s.compressed, s.uncompressed))
                .collect::<Vec<_>>()
                .join(":"),
        )
    }
}

pub(crate) fn parse_location(attr: &str) -> Result<LocationAttr> {
    let fields: Vec<&str> = attr.split(':').collect();
    match fields.as_slice() {
        ["embedded"] => Ok(LocationAttr::Embedded),
        ["inline", "base64"] => Ok(LocationAttr::Inline(InlineEncoding::Base64)),
        ["inline", "base16"] => Ok(LocationAttr::Inline(InlineEncoding::Base16)),
        ["attachment", pos, size] => {
            let pos = pos
                .parse()
                .map_err(|_| Error::InvalidReference(format!("bad attachment offset {pos:?}")))?;
            let size = size
                .parse()
                .map_err(|_| Error::InvalidReference(format!("bad attachment length {size:?}")))?;
            Ok(LocationAttr::Attachment { pos, size })
        }
        _ => Err(Error::InvalidReference(format!(
            "bad location attribute {attr:?}"
        ))),
    }
}
