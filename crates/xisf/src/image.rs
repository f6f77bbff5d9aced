use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::block::DataBlock;
use crate::bytes::ByteBuffer;
use crate::error::{Error, Result};
use crate::fits::{self, FitsKeyword};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SampleFormat {
    UInt8,
    #[default]
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex32,
    Complex64,
}

impl SampleFormat {
    /// Bytes per sample; this is also the word size used when transposing
    /// pixel storage.
    pub fn sample_size(self) -> usize {
        match self {
            SampleFormat::UInt8 => 1,
            SampleFormat::UInt16 => 2,
            SampleFormat::UInt32 | SampleFormat::Float32 => 4,
            SampleFormat::UInt64 | SampleFormat::Float64 | SampleFormat::Complex32 => 8,
            SampleFormat::Complex64 => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleFormat::UInt8 => "UInt8",
            SampleFormat::UInt16 => "UInt16",
            SampleFormat::UInt32 => "UInt32",
            SampleFormat::UInt64 => "UInt64",
            SampleFormat::Float32 => "Float32",
            SampleFormat::Float64 => "Float64",
            SampleFormat::Complex32 => "Complex32",
            SampleFormat::Complex64 => "Complex64",
        }
    }

    /// Unknown names fall back to the default.
    pub fn from_name(name: &str) -> Self {
        match name {
            "UInt8" => SampleFormat::UInt8,
            "UInt16" => SampleFormat::UInt16,
            "UInt32" => SampleFormat::UInt32,
            "UInt64" => SampleFormat::UInt64,
            "Float32" => SampleFormat::Float32,
            "Float64" => SampleFormat::Float64,
            "Complex32" => SampleFormat::Complex32,
            "Complex64" => SampleFormat::Complex64,
            _ => SampleFormat::default(),
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::Float32 | SampleFormat::Float64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    Gray,
    RGB,
    CIELab,
}

impl ColorSpace {
    pub fn name(self) -> &'static str {
        match self {
            ColorSpace::Gray => "Gray",
            ColorSpace::RGB => "RGB",
            ColorSpace::CIELab => "CIELab",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "RGB" => ColorSpace::RGB,
            "CIELab" => ColorSpace::CIELab,
            _ => ColorSpace::Gray,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelStorage {
    /// All channel-0 samples, then all channel-1 samples, ...
    #[default]
    Planar,
    /// Channel-interleaved samples per pixel.
    Normal,
}

impl PixelStorage {
    pub fn name(self) -> &'static str {
        match self {
            PixelStorage::Planar => "Planar",
            PixelStorage::Normal => "Normal",
        }
    }

    pub fn from_name(name: &str) -> Self {
        if name == "Normal" {
            PixelStorage::Normal
        } else {
            PixelStorage::Planar
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageType {
    Bias,
    Dark,
    Flat,
    #[default]
    Light,
    MasterBias,
    MasterDark,
    MasterFlat,
    DefectMap,
    RejectionMapHigh,
    RejectionMapLow,
    BinaryRejectionMapHigh,
    BinaryRejectionMapLow,
    SlopeMap,
    WeightMap,
}

impl ImageType {
    pub fn name(self) -> &'static str {
        match self {
            ImageType::Bias => "Bias",
            ImageType::Dark => "Dark",
            ImageType::Flat => "Flat",
            ImageType::Light => "Light",
            ImageType::MasterBias => "MasterBias",
            ImageType::MasterDark => "MasterDark",
            ImageType::MasterFlat => "MasterFlat",
            ImageType::DefectMap => "DefectMap",
            ImageType::RejectionMapHigh => "RejectionMapHigh",
            ImageType::RejectionMapLow => "RejectionMapLow",
            ImageType::BinaryRejectionMapHigh => "BinaryRejectionMapHigh",
            ImageType::BinaryRejectionMapLow => "BinaryRejectionMapLow",
            ImageType::SlopeMap => "SlopeMap",
            ImageType::WeightMap => "WeightMap",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "Bias" => ImageType::Bias,
            "Dark" => ImageType::Dark,
            "Flat" => ImageType::Flat,
            "Light" => ImageType::Light,
            "MasterBias" => ImageType::MasterBias,
            "MasterDark" => ImageType::MasterDark,
            "MasterFlat" => ImageType::MasterFlat,
            "DefectMap" => ImageType::DefectMap,
            "RejectionMapHigh" => ImageType::RejectionMapHigh,
            "RejectionMapLow" => ImageType::RejectionMapLow,
            "BinaryRejectionMapHigh" => ImageType::BinaryRejectionMapHigh,
            "BinaryRejectionMapLow" => ImageType::BinaryRejectionMapLow,
            "SlopeMap" => ImageType::SlopeMap,
            "WeightMap" => ImageType::WeightMap,
            _ => ImageType::default(),
        }
    }
}

const CFA_ALPHABET: &[u8] = b"0RGBWCMY";

/// Sensor mosaic description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorFilterArray {
    pub width: u32,
    pub height: u32,
    pub pattern: String,
}

impl ColorFilterArray {
    pub fn new(width: u32, height: u32, pattern: &str) -> Result<Self> {
        validate_cfa_pattern(pattern)?;
        Ok(Self {
            width,
            height,
            pattern: pattern.to_string(),
        })
    }
}

pub(crate) fn validate_cfa_pattern(pattern: &str) -> Result<()> {
    for byte in pattern.bytes() {
        if !CFA_ALPHABET.contains(&byte) {
            return Err(Error::InvalidValue(format!(
                "CFA pattern {pattern:?} contains {:?}",
                byte as char
            )));
        }
    }
    Ok(())
}

/// A named, typed metadata value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Colon-separated path, e.g. `Observation:Center:RA`.
    pub id: String,
    pub value: Value,
    pub comment: String,
    /// Optional printf-style display hint.
    pub format: String,
}

impl Property {
    pub fn new(id: &str, value: Value) -> Self {
        Self {
            id: id.to_string(),
            value,
            ..Self::default()
        }
    }
}

/// One image of the unit: geometry, sample layout, metadata, and the pixel
/// payload block. `data.len() == width * height * channels * sample_size`
/// whenever the pixels are resident.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u64,
    height: u64,
    channel_count: u64,
    /// Representable sample range, serialized only when non-default for
    /// float formats.
    pub bounds: (f64, f64),
    pub image_type: ImageType,
    pixel_storage: PixelStorage,
    sample_format: SampleFormat,
    pub color_space: ColorSpace,
    pub icc_profile: ByteBuffer,
    pub cfa: Option<ColorFilterArray>,
    properties: Vec<Property>,
    property_index: FxHashMap<String, usize>,
    fits_keywords: Vec<FitsKeyword>,
    pub data_block: DataBlock,
}

pub(crate) const DEFAULT_BOUNDS: (f64, f64) = (0.0, 1.0);

impl Default for Image {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            channel_count: 0,
            bounds: DEFAULT_BOUNDS,
            image_type: ImageType::default(),
            pixel_storage: PixelStorage::default(),
            sample_format: SampleFormat::default(),
            color_space: ColorSpace::default(),
            icc_profile: ByteBuffer::default(),
            cfa: None,
            properties: Vec::new(),
            property_index: FxHashMap::default(),
            fits_keywords: Vec::new(),
            data_block: DataBlock::default(),
        }
    }
}

impl Image {
    /// New image with a zero-filled pixel buffer of the right size.
    pub fn new(width: u64, height: u64, channel_count: u64) -> Result<Self> {
        let mut image = Image::default();
        image.set_geometry(width, height, channel_count)?;
        Ok(image)
    }

    #[inline]
    pub fn width(&self) -> u64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u64 {
        self.height
    }

    #[inline]
    pub fn channel_count(&self) -> u64 {
        self.channel_count
    }

    /// Change geometry; the pixel buffer is rescaled to match.
    pub fn set_geometry(&mut self, width: u64, height: u64, channel_count: u64) -> Result<()> {
        if width == 0 || height == 0 || channel_count == 0 {
            return Err(Error::InvalidValue(format!(
                "image geometry {width}:{height}:{channel_count} must be positive"
            )));
        }
        self.width = width;
        self.height = height;
        self.channel_count = channel_count;
        self.rescale_data();
        Ok(())
    }

    #[inline]
    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    /// Change the sample format; the pixel buffer is rescaled and an active
    /// shuffle item size follows the new sample width.
    pub fn set_sample_format(&mut self, format: SampleFormat) {
        self.sample_format = format;
        self.rescale_data();
    }

    #[inline]
    pub fn pixel_storage(&self) -> PixelStorage {
        self.pixel_storage
    }

    pub(crate) fn set_pixel_storage_tag(&mut self, storage: PixelStorage) {
        self.pixel_storage = storage;
    }

    pub fn expected_data_size(&self) -> usize {
        (self.width * self.height * self.channel_count) as usize * self.sample_format.sample_size()
    }

    fn rescale_data(&mut self) {
        self.data_block.data.resize(self.expected_data_size());
        if self.data_block.byte_shuffling > 1 {
            self.data_block.byte_shuffling = self.sample_format.sample_size();
        }
    }

    /// Deep transpose between planar and channel-interleaved layouts.
    /// Single-channel images only retag.
    pub fn convert_pixel_storage_to(&mut self, storage: PixelStorage) {
        if self.pixel_storage == storage {
            return;
        }
        if self.channel_count <= 1 || self.data_block.data.len() != self.expected_data_size() {
            self.pixel_storage = storage;
            return;
        }

        let word = self.sample_format.sample_size();
        let pixels = (self.width * self.height) as usize;
        let channels = self.channel_count as usize;
        let src = self.data_block.data.as_slice();
        let mut out = vec![0u8; src.len()];
        for c in 0..channels {
            for i in 0..pixels {
                let planar = (c * pixels + i) * word;
                let normal = (i * channels + c) * word;
                let (s, d) = if storage == PixelStorage::Normal {
                    (planar, normal)
                } else {
                    (normal, planar)
                };
                out[d..d + word].copy_from_slice(&src[s..s + word]);
            }
        }
        self.data_block.data = ByteBuffer::from_vec(out);
        self.pixel_storage = storage;
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, id: &str) -> Option<&Property> {
        self.property_index.get(id).map(|&i| &self.properties[i])
    }

    /// Append a property; a duplicate id is an error.
    pub fn add_property(&mut self, property: Property) -> Result<()> {
        if self.property_index.contains_key(&property.id) {
            return Err(Error::DuplicateProperty(property.id));
        }
        self.property_index
            .insert(property.id.clone(), self.properties.len());
        self.properties.push(property);
        Ok(())
    }

    /// Replace an existing property in place or append a new one.
    pub fn update_property(&mut self, property: Property) {
        match self.property_index.get(&property.id) {
            Some(&i) => self.properties[i] = property,
            None => {
                self.property_index
                    .insert(property.id.clone(), self.properties.len());
                self.properties.push(property);
            }
        }
    }

    #[inline]
    pub fn fits_keywords(&self) -> &[FitsKeyword] {
        &self.fits_keywords
    }

    /// Keywords are not deduplicated; repeated names are kept in order.
    pub fn add_fits_keyword(&mut self, keyword: FitsKeyword) {
        self.fits_keywords.push(keyword);
    }

    /// Adopt a FITS keyword as a typed property when its name is mapped.
    /// Unmapped names are ignored; a value that fails to parse per the
    /// mapped type is an error.
    pub fn add_fits_keyword_as_property(&mut self, keyword: &FitsKeyword) -> Result<()> {
        let Some(mapping) = fits::keyword_mapping(&keyword.name) else {
            return Ok(());
        };
        let value = fits::parse_keyword_value(mapping, &keyword.value)?;
        let mut property = Property::new(mapping.property_id, value);
        property.comment = keyword.comment.clone();
        self.update_property(property);
        Ok(())
    }

    /// Resident pixels must match the declared geometry, and an active
    /// shuffle item size must equal the sample width.
    pub(crate) fn verify_pixel_block(&self) -> Result<()> {
        if self.data_block.byte_shuffling > 1
            && self.data_block.byte_shuffling != self.sample_format.sample_size()
        {
            return Err(Error::InvalidValue(format!(
                "shuffle item size {} does not match {} samples",
                self.data_block.byte_shuffling,
                self.sample_format.name()
            )));
        }
        if self.data_block.data.len() != self.expected_data_size() {
            return Err(Error::InvalidValue(format!(
                "pixel payload is {} bytes, geometry {}:{}:{} of {} needs {}",
                self.data_block.data.len(),
                self.width,
                self.height,
                self.channel_count,
                self.sample_format.name(),
                self.expected_data_size()
            )));
        }
        Ok(())
    }
}
