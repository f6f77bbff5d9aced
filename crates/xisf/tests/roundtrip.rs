use xisf::{
    ColorFilterArray, ColorSpace, CompressionCodec, Complex32, Complex64, Error, FitsKeyword,
    Image, ImageType, Location, Matrix, PixelStorage, Property, SampleFormat, Value, ValueKind,
    XISFReader, XISFWriter,
};

fn noise(len: usize, mut seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        out.push((seed >> 33) as u8);
    }
    out
}

fn scalar_properties() -> Vec<Property> {
    vec![
        Property::new("PropertyBoolean", Value::Boolean(true)),
        Property::new("PropertyInt8", Value::Int8(8)),
        Property::new("PropertyInt16", Value::Int16(16)),
        Property::new("PropertyInt32", Value::Int32(32)),
        Property::new("PropertyInt64", Value::Int64(64)),
        Property::new("PropertyUInt8", Value::UInt8(8)),
        Property::new("PropertyUInt16", Value::UInt16(16)),
        Property::new("PropertyUInt32", Value::UInt32(32)),
        Property::new("PropertyUInt64", Value::UInt64(64)),
        Property::new("PropertyFloat32", Value::Float32(0.32)),
        Property::new("PropertyFloat64", Value::Float64(0.64)),
        Property::new(
            "PropertyComplex32",
            Value::Complex32(Complex32 { real: 3.0, imag: -2.0 }),
        ),
        Property::new(
            "PropertyComplex64",
            Value::Complex64(Complex64 { real: -3.0, imag: 2.0 }),
        ),
        Property::new(
            "PropertyTimePoint",
            Value::parse_scalar(ValueKind::TimePoint, "2023-06-01T12:30:45Z").unwrap(),
        ),
        Property::new("PropertyString", Value::String("Hello XISF".to_string())),
    ]
}

fn minimal_image(location: Location) -> Image {
    let mut image = Image::new(5, 7, 1).unwrap();
    image.data_block.location = location;
    for property in scalar_properties() {
        image.add_property(property).unwrap();
    }
    image
}

fn round_trip(writer: &XISFWriter) -> (Vec<u8>, XISFReader) {
    let mut buffer = Vec::new();
    writer.save_buffer(&mut buffer).unwrap();
    let mut reader = XISFReader::new();
    reader.open_data(&buffer).unwrap();
    (buffer, reader)
}

#[test]
fn minimal_embedded_unit_round_trips() {
    let image = minimal_image(Location::Embedded);
    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();

    let (_, mut reader) = round_trip(&writer);
    assert_eq!(reader.images_count(), 1);

    let back = reader.get_image(0, true).unwrap();
    assert_eq!(back.width(), 5);
    assert_eq!(back.height(), 7);
    assert_eq!(back.channel_count(), 1);
    assert_eq!(back.sample_format(), SampleFormat::UInt16);
    assert_eq!(back.color_space, ColorSpace::Gray);
    assert_eq!(back.data_block.data, image.data_block.data);

    let expected = scalar_properties();
    assert_eq!(back.properties().len(), expected.len());
    for (got, want) in back.properties().iter().zip(&expected) {
        assert_eq!(got.id, want.id);
        assert_eq!(got.value, want.value, "property {}", want.id);
    }
}

#[test]
fn lz4_shuffled_attachment_round_trips() {
    let mut image = minimal_image(Location::Attachment);
    let pixels = noise(70, 2);
    image
        .data_block
        .data
        .as_mut_slice()
        .copy_from_slice(&pixels);
    image.data_block.codec = CompressionCodec::Lz4;
    image.data_block.byte_shuffling = 2;

    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();

    let (buffer, mut reader) = round_trip(&writer);
    let text = String::from_utf8_lossy(&buffer);
    assert!(text.contains("lz4+sh:70:2"), "compression attribute missing");

    let back = reader.get_image(0, true).unwrap();
    assert_eq!(back.data_block.data.as_slice(), pixels.as_slice());
}

#[test]
fn large_zlib_level9_noise_round_trips() {
    let mut image = Image::new(2048, 2048, 1).unwrap();
    let pixels = noise(2048 * 2048 * 2, 3);
    image
        .data_block
        .data
        .as_mut_slice()
        .copy_from_slice(&pixels);
    image.data_block.codec = CompressionCodec::Zlib;
    image.data_block.compress_level = 9;
    image.data_block.byte_shuffling = 2;

    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();

    let (buffer, mut reader) = round_trip(&writer);
    let header = String::from_utf8_lossy(&buffer[..4096.min(buffer.len())]);
    assert!(
        header.contains(r#"compression="zlib+sh:8388608:2""#),
        "got header {header}"
    );

    let back = reader.get_image(0, true).unwrap();
    assert_eq!(back.data_block.data.as_slice(), pixels.as_slice());
}

#[test]
fn vector_property_inline_base64() {
    let mut image = Image::new(1, 1, 1).unwrap();
    image.data_block.location = Location::Inline;
    image
        .add_property(Property::new("Vec", Value::UI16Vector(vec![23, 45, 86])))
        .unwrap();

    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();

    let (buffer, mut reader) = round_trip(&writer);
    assert!(String::from_utf8_lossy(&buffer).contains(r#"length="3""#));

    let back = reader.get_image(0, true).unwrap();
    assert_eq!(
        back.property("Vec").unwrap().value,
        Value::UI16Vector(vec![23, 45, 86])
    );
}

#[test]
fn matrix_property_round_trips_row_major() {
    let mut m = Matrix::<u16>::new(2, 3);
    m[(0, 0)] = 0;
    m[(0, 1)] = 1;
    m[(0, 2)] = 2;
    m[(1, 0)] = 10;

    let mut image = Image::new(1, 1, 1).unwrap();
    image.data_block.location = Location::Inline;
    image
        .add_property(Property::new("M", Value::UI16Matrix(m.clone())))
        .unwrap();

    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();

    let (buffer, mut reader) = round_trip(&writer);
    let text = String::from_utf8_lossy(&buffer);
    assert!(text.contains(r#"rows="2""#));
    assert!(text.contains(r#"columns="3""#));

    let back = reader.get_image(0, true).unwrap();
    match &back.property("M").unwrap().value {
        Value::UI16Matrix(got) => {
            assert_eq!(got.rows(), 2);
            assert_eq!(got.cols(), 3);
            assert_eq!(*got, m);
        }
        other => panic!("wrong variant {other:?}"),
    }
}

#[test]
fn inline_and_attachment_pixels_are_identical() {
    let pixels = noise(70, 11);
    let mut reconstructed = Vec::new();
    for location in [Location::Inline, Location::Embedded, Location::Attachment] {
        let mut image = Image::new(5, 7, 1).unwrap();
        image.data_block.location = location;
        image
            .data_block
            .data
            .as_mut_slice()
            .copy_from_slice(&pixels);

        let mut writer = XISFWriter::new();
        writer.write_image(&image).unwrap();
        let (_, mut reader) = round_trip(&writer);
        reconstructed.push(reader.get_image(0, true).unwrap().data_block.data.clone());
    }
    assert_eq!(reconstructed[0], reconstructed[1]);
    assert_eq!(reconstructed[1], reconstructed[2]);
    assert_eq!(reconstructed[0].as_slice(), pixels.as_slice());
}

#[test]
fn invalid_signature_and_version_are_malformed() {
    let mut writer = XISFWriter::new();
    writer.write_image(&Image::new(1, 1, 1).unwrap()).unwrap();
    let mut buffer = Vec::new();
    writer.save_buffer(&mut buffer).unwrap();

    // corrupt the signature
    let mut bad_signature = buffer.clone();
    bad_signature[7] = b'9';
    bad_signature[6] = b'9';
    let mut reader = XISFReader::new();
    assert!(matches!(
        reader.open_data(&bad_signature),
        Err(Error::MalformedHeader(_))
    ));

    // bump the version attribute on the root element, not the XML
    // declaration
    let mut bad_version = buffer.clone();
    let root = bad_version
        .windows(5)
        .position(|w| w == b"<xisf")
        .unwrap();
    let pos = root
        + bad_version[root..]
            .windows(13)
            .position(|w| w == br#"version="1.0""#)
            .unwrap();
    bad_version[pos + 9] = b'2';
    let mut reader = XISFReader::new();
    assert!(matches!(
        reader.open_data(&bad_version),
        Err(Error::MalformedHeader(_))
    ));
}

#[test]
fn two_image_unit_with_mixed_codecs() {
    // first image plain, second LZ4 with two-byte shuffle, same pixels
    let pixels = noise(70, 5);
    let mut first = minimal_image(Location::Attachment);
    first
        .data_block
        .data
        .as_mut_slice()
        .copy_from_slice(&pixels);
    first.add_fits_keyword(FitsKeyword::new(
        "RA",
        "226.9751163116387",
        "Right ascension of the center of the image (deg)",
    ));
    first.add_fits_keyword(FitsKeyword::new(
        "DEC",
        "62.02302376908295",
        "Declination of the center of the image (deg)",
    ));

    let mut second = first.clone();
    second.image_type = ImageType::Flat;
    second.data_block.codec = CompressionCodec::Lz4;
    second.data_block.byte_shuffling = 2;

    let mut writer = XISFWriter::new();
    writer.write_image(&first).unwrap();
    writer.write_image(&second).unwrap();

    let (_, mut reader) = round_trip(&writer);
    assert_eq!(reader.images_count(), 2);

    let img0 = reader.get_image(0, true).unwrap();
    assert_eq!(img0.properties().len(), scalar_properties().len());
    assert_eq!(img0.data_block.data.as_slice(), pixels.as_slice());
    assert_eq!(img0.fits_keywords().len(), 2);
    assert_eq!(img0.fits_keywords()[0].name, "RA");
    assert_eq!(img0.fits_keywords()[0].value, "226.9751163116387");
    let img0_pixels = img0.data_block.data.clone();

    let img1 = reader.get_image(1, true).unwrap();
    assert_eq!(img1.image_type, ImageType::Flat);
    assert_eq!(img1.data_block.data, img0_pixels);
}

#[test]
fn unit_metadata_and_file_properties_survive() {
    let mut writer = XISFWriter::new();
    writer.set_creator_application("roundtrip-suite");
    writer.add_property(Property::new(
        "Observation:Object:Name",
        Value::String("M 31".to_string()),
    ));
    writer.write_image(&Image::new(1, 1, 1).unwrap()).unwrap();

    let (_, reader) = round_trip(&writer);
    assert_eq!(
        reader.property("XISF:CreatorApplication").unwrap().value,
        Value::String("roundtrip-suite".to_string())
    );
    assert!(matches!(
        reader.property("XISF:CreationTime").unwrap().value,
        Value::TimePoint(_)
    ));
    assert_eq!(
        reader.property("Observation:Object:Name").unwrap().value,
        Value::String("M 31".to_string())
    );
}

#[test]
fn icc_profile_and_cfa_survive() {
    let mut image = Image::new(2, 2, 3).unwrap();
    image.color_space = ColorSpace::RGB;
    image.icc_profile = noise(64, 7).into();
    image.cfa = Some(ColorFilterArray::new(2, 2, "RGGB").unwrap());

    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();

    let (_, mut reader) = round_trip(&writer);
    let back = reader.get_image(0, false).unwrap();
    assert_eq!(back.icc_profile, image.icc_profile);
    assert_eq!(back.cfa, image.cfa);
}

#[test]
fn pixel_storage_is_always_written_and_read() {
    let mut image = Image::new(2, 2, 3).unwrap();
    image.convert_pixel_storage_to(PixelStorage::Normal);

    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();

    let (buffer, mut reader) = round_trip(&writer);
    assert!(String::from_utf8_lossy(&buffer).contains(r#"pixelStorage="Normal""#));
    assert_eq!(
        reader.get_image(0, true).unwrap().pixel_storage(),
        PixelStorage::Normal
    );
}

#[test]
fn lazy_pixels_are_not_fetched_until_asked() {
    let mut image = Image::new(5, 7, 1).unwrap();
    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();
    image.data_block.codec = CompressionCodec::Zlib;
    writer.write_image(&image).unwrap();

    let (_, mut reader) = round_trip(&writer);
    let lazy = reader.get_image(0, false).unwrap();
    assert!(lazy.data_block.data.is_empty());
    assert_ne!(lazy.data_block.attachment_pos, 0);

    let loaded = reader.get_image(0, true).unwrap();
    assert_eq!(loaded.data_block.data.len(), 70);
    assert_eq!(loaded.data_block.attachment_pos, 0);

    // second call returns the cached pixels
    let cached = reader.get_image(0, true).unwrap();
    assert_eq!(cached.data_block.data.len(), 70);
}

#[test]
fn file_backed_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unit.xisf");

    let mut image = minimal_image(Location::Attachment);
    image.data_block.codec = CompressionCodec::Zlib;
    image.data_block.byte_shuffling = 2;
    let pixels = noise(70, 13);
    image
        .data_block
        .data
        .as_mut_slice()
        .copy_from_slice(&pixels);

    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();
    writer.save_file(&path).unwrap();

    let mut reader = XISFReader::new();
    reader.open_file(&path).unwrap();
    let back = reader.get_image(0, true).unwrap();
    assert_eq!(back.data_block.data.as_slice(), pixels.as_slice());
    assert_eq!(back.properties().len(), scalar_properties().len());
}

#[cfg(feature = "zstd")]
#[test]
fn zstd_attachment_round_trips() {
    let mut image = Image::new(64, 64, 1).unwrap();
    let pixels = noise(64 * 64 * 2, 17);
    image
        .data_block
        .data
        .as_mut_slice()
        .copy_from_slice(&pixels);
    image.data_block.codec = CompressionCodec::Zstd;
    image.data_block.byte_shuffling = 2;

    let mut writer = XISFWriter::new();
    writer.write_image(&image).unwrap();

    let (buffer, mut reader) = round_trip(&writer);
    assert!(String::from_utf8_lossy(&buffer).contains("zstd+sh:8192:2"));
    let back = reader.get_image(0, true).unwrap();
    assert_eq!(back.data_block.data.as_slice(), pixels.as_slice());
}
