pub mod block;
pub mod bytes;
pub mod codec;
pub mod error;
pub mod fits;
pub mod image;
pub mod reader;
pub mod shuffle;
pub mod value;
pub mod writer;
mod xml;

pub use block::{DataBlock, InlineEncoding, Location};
pub use bytes::ByteBuffer;
pub use codec::{CompressionCodec, CompressionOverride, SubBlock};
pub use error::{Error, Result};
pub use fits::FitsKeyword;
pub use image::{
    ColorFilterArray, ColorSpace, Image, ImageType, PixelStorage, Property, SampleFormat,
};
pub use reader::XISFReader;
pub use value::{Complex32, Complex64, Matrix, TimePoint, Value, ValueKind};
pub use writer::XISFWriter;
