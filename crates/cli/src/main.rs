use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use xisf::{
    CompressionCodec, Image, Location, Property, Value, XISFReader, XISFWriter,
};

#[derive(Parser)]
#[command(name = "xisf", about = "Inspect and rewrite XISF 1.0 units", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Parse a unit and print a JSON summary
    Cat(CatArgs),
    /// Read a unit and write it back with different block settings
    Convert(ConvertArgs),
}

#[derive(Args)]
struct CatArgs {
    /// Input .xisf file
    #[arg(long = "file-path")]
    file_path: PathBuf,

    /// Include per-image property values
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Args)]
struct ConvertArgs {
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    output: PathBuf,

    /// none | zlib | lz4 | lz4hc | zstd
    #[arg(long, default_value = "none")]
    codec: String,

    /// Codec-specific level; -1 requests the library default
    #[arg(long, default_value_t = -1)]
    level: i32,

    /// Enable byte shuffling
    #[arg(long, default_value_t = false)]
    shuffle: bool,

    /// Store pixel payloads inline instead of as attachments
    #[arg(long, default_value_t = false)]
    inline: bool,
}

#[derive(Serialize)]
struct UnitSummary {
    images: Vec<ImageSummary>,
    properties: Vec<PropertySummary>,
}

#[derive(Serialize)]
struct ImageSummary {
    geometry: String,
    sample_format: &'static str,
    color_space: &'static str,
    pixel_storage: &'static str,
    image_type: &'static str,
    compressed: bool,
    fits_keywords: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    cfa_pattern: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    properties: Vec<PropertySummary>,
    property_count: usize,
}

#[derive(Serialize)]
struct PropertySummary {
    id: String,
    r#type: &'static str,
    value: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Cmd::Cat(args) => cat(&args),
        Cmd::Convert(args) => convert(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cat(args: &CatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = XISFReader::new();
    reader.open_file(&args.file_path)?;

    let mut images = Vec::with_capacity(reader.images_count());
    for n in 0..reader.images_count() {
        let image = reader.get_image(n, false)?;
        images.push(summarize_image(image, args.verbose));
    }

    let summary = UnitSummary {
        images,
        properties: reader.properties().iter().map(summarize_property).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn convert(args: &ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let codec = match args.codec.as_str() {
        "none" => CompressionCodec::None,
        name => CompressionCodec::from_wire_name(name)
            .ok_or_else(|| format!("unknown codec {name:?}"))?,
    };

    let mut reader = XISFReader::new();
    reader.open_file(&args.input)?;

    let mut writer = XISFWriter::new();
    for property in reader.properties() {
        writer.add_property(property.clone());
    }
    for n in 0..reader.images_count() {
        let image = reader.get_image(n, true)?;
        let mut image: Image = image.clone();
        image.data_block.codec = codec;
        image.data_block.compress_level = args.level;
        image.data_block.byte_shuffling = if args.shuffle {
            image.sample_format().sample_size()
        } else {
            0
        };
        image.data_block.location = if args.inline {
            Location::Inline
        } else {
            Location::Attachment
        };
        writer.write_image(&image)?;
    }

    writer.save_file(&args.output)?;
    Ok(())
}

fn summarize_image(image: &Image, verbose: bool) -> ImageSummary {
    ImageSummary {
        geometry: format!(
            "{}:{}:{}",
            image.width(),
            image.height(),
            image.channel_count()
        ),
        sample_format: image.sample_format().name(),
        color_space: image.color_space.name(),
        pixel_storage: image.pixel_storage().name(),
        image_type: image.image_type.name(),
        compressed: image.data_block.codec != CompressionCodec::None,
        fits_keywords: image.fits_keywords().len(),
        cfa_pattern: image.cfa.as_ref().map(|c| c.pattern.clone()),
        properties: if verbose {
            image.properties().iter().map(summarize_property).collect()
        } else {
            Vec::new()
        },
        property_count: image.properties().len(),
    }
}

fn summarize_property(property: &Property) -> PropertySummary {
    let value = match &property.value {
        Value::String(s) => s.clone(),
        Value::Monostate => String::new(),
        other => match other.format_scalar() {
            Some(text) => text,
            None => match (other.vector_len(), other.matrix_dims()) {
                (Some(len), _) => format!("[{len} elements]"),
                (_, Some((rows, cols))) => format!("[{rows}x{cols} matrix]"),
                _ => String::new(),
            },
        },
    };
    PropertySummary {
        id: property.id.clone(),
        r#type: property.value.type_name(),
        value,
    }
}
