mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{AppConfig, FormatName};
use log::debug;
use pagebook_adapters::{
    present_book, present_export_report, present_import_report, present_page_row,
    present_progress, FsBookStorage, FsThumbnailGenerator, RasterHost, SystemClock,
    WalkdirImageScanner,
};
use pagebook_application::{
    export_output_dir, AddPageCommand, BookService, CreateBookCommand, DuplicatePageCommand,
    ExportBookCommand, ImportFolderCommand, ImportPagesCommand, MovePageCommand,
    OpenBookCommand, Progress, RenamePageCommand, SetDisplayModeCommand,
};
use pagebook_domain::{
    Book, ColorMode, DctMethod, DisplayMode, ErrorPolicy, ExportFormat, ExportJob, FillMode,
    GifDither, Interpolation, JpegSubsampling, MarginFill, Margins, NamingScheme, NewBookSpec,
    PageRange, PsdCompression, RgbColor, Scale, TagFilter, TiffCompression, UntaggedPolicy,
};

#[derive(Debug, Parser)]
#[command(name = "pagebook")]
#[command(version, about = "Manage comic and storyboard books of layered pages", long_about = None)]
#[command(after_help = "EXAMPLES:
    pagebook new ~/books Comic --width 2480 --height 3508
    pagebook add ~/books/Comic/Comic.book Opening
    pagebook export ~/books/Comic/Comic.book ~/out --format png")]
struct Cli {
    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a book with a template page
    New(NewArgs),
    /// List the pages of a book
    Info { book: PathBuf },
    /// Add a page copied from the template
    Add {
        book: PathBuf,
        name: String,
        /// Insert position, defaults to the end
        #[arg(long)]
        at: Option<usize>,
    },
    /// Copy an existing page under a new name
    Duplicate {
        book: PathBuf,
        index: usize,
        name: String,
        /// Insert position, defaults to after the source page
        #[arg(long)]
        at: Option<usize>,
    },
    /// Import images, or every importable image in a folder, as pages
    Import {
        book: PathBuf,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        at: Option<usize>,
    },
    /// Rename a page
    Rename {
        book: PathBuf,
        index: usize,
        name: String,
    },
    /// Move a page to the book's trash folder
    Delete { book: PathBuf, index: usize },
    /// Reorder a page
    Move {
        book: PathBuf,
        from: usize,
        to: usize,
    },
    /// Switch between grid and flow display
    Mode { book: PathBuf, mode: ModeArg },
    /// Change the thumbnail size
    Zoom { book: PathBuf, direction: ZoomArg },
    /// Rebuild stale thumbnails
    Thumbs { book: PathBuf },
    /// Export pages to a folder named after the book
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct NewArgs {
    destination: PathBuf,
    name: String,
    #[arg(long, default_value_t = 800)]
    width: u32,
    #[arg(long, default_value_t = 1200)]
    height: u32,
    /// Pixels per inch
    #[arg(long, default_value_t = 300)]
    resolution: u32,
    #[arg(long)]
    grayscale: bool,
    #[arg(long, value_enum, default_value_t = FillArg::White)]
    fill: FillArg,
    #[arg(long, value_parser = parse_color, default_value = "#000000")]
    foreground: RgbColor,
    #[arg(long, value_parser = parse_color, default_value = "#ffffff")]
    background: RgbColor,
    #[arg(long, default_value_t = 0)]
    margin_top: u32,
    #[arg(long, default_value_t = 0)]
    margin_bottom: u32,
    #[arg(long, default_value_t = 0)]
    margin_sides: u32,
    #[arg(long, default_value_t = 0)]
    bleed: u32,
}

#[derive(Debug, Args)]
struct ExportArgs {
    book: PathBuf,
    destination: PathBuf,
    /// First page index, defaults to 0
    #[arg(long)]
    first: Option<usize>,
    /// Last page index, defaults to the last page
    #[arg(long)]
    last: Option<usize>,
    #[arg(long, value_enum, default_value_t = NamingArg::Book)]
    naming: NamingArg,
    /// File name used with `--naming custom`
    #[arg(long, required_if_eq("naming", "custom"))]
    custom_name: Option<String>,
    /// Comma separated tags whose layers are shown
    #[arg(long, default_value = "")]
    show: String,
    /// Comma separated tags whose layers are hidden
    #[arg(long, default_value = "")]
    hide: String,
    #[arg(long, value_enum, default_value_t = UntaggedArg::Leave)]
    untagged: UntaggedArg,
    #[arg(long, default_value_t = 0)]
    margin_top: u32,
    #[arg(long, default_value_t = 0)]
    margin_bottom: u32,
    /// Margin on the bound edge
    #[arg(long, default_value_t = 0)]
    margin_inner: u32,
    /// Margin on the free edge
    #[arg(long, default_value_t = 0)]
    margin_outer: u32,
    #[arg(long, default_value_t = 0)]
    bleed: u32,
    /// `page`, `black`, `white` or a `#rrggbb` colour
    #[arg(long, value_parser = parse_margin_fill, default_value = "page")]
    margin_fill: MarginFill,
    /// Scale in percent of the page size
    #[arg(long, conflicts_with = "size")]
    percent: Option<f64>,
    /// Height percent when it differs from `--percent`
    #[arg(long, conflicts_with = "size")]
    percent_height: Option<f64>,
    /// Scale to an exact size, `WIDTHxHEIGHT`
    #[arg(long, value_parser = parse_size)]
    size: Option<(u32, u32)>,
    #[arg(long, value_enum, default_value_t = InterpolationArg::Lanczos)]
    interpolation: InterpolationArg,
    /// Defaults to `PAGEBOOK_EXPORT_FORMAT` or jpeg
    #[arg(long, value_enum)]
    format: Option<FormatName>,
    #[command(flatten)]
    encoder: EncoderArgs,
    /// Stop at the first page that fails
    #[arg(long)]
    abort_on_error: bool,
    /// Write into an output folder that already holds files
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct EncoderArgs {
    /// JPEG quality, defaults to `PAGEBOOK_JPEG_QUALITY` or 85
    #[arg(long)]
    quality: Option<u8>,
    /// JPEG pre-smoothing, 0 to 1
    #[arg(long)]
    smoothing: Option<f32>,
    #[arg(long)]
    progressive: bool,
    /// Skip JPEG Huffman table optimisation
    #[arg(long)]
    no_optimize: bool,
    /// JPEG chroma subsampling
    #[arg(long, value_enum)]
    subsampling: Option<SubsamplingArg>,
    #[arg(long, value_enum)]
    dct: Option<DctArg>,
    /// JPEG restart interval in MCU rows
    #[arg(long)]
    restart_rows: Option<u16>,
    #[arg(long)]
    comment: Option<String>,
    /// GIF palette size, 2 to 256
    #[arg(long)]
    colors: Option<u16>,
    #[arg(long, value_enum)]
    dither: Option<DitherArg>,
    /// Grayscale GIF
    #[arg(long)]
    gray: bool,
    /// Interlaced GIF or PNG
    #[arg(long)]
    interlace: bool,
    /// PNG compression level, 0 to 9
    #[arg(long)]
    png_level: Option<u8>,
    /// Store a bKGD chunk
    #[arg(long)]
    png_background: bool,
    /// Store a gAMA chunk
    #[arg(long)]
    png_gamma: bool,
    /// Store an oFFs chunk with the layer offset
    #[arg(long)]
    png_offset: bool,
    #[arg(long)]
    no_png_resolution: bool,
    #[arg(long)]
    no_png_time: bool,
    /// Keep the colour of fully transparent PNG or TIFF pixels
    #[arg(long)]
    keep_transparent_color: bool,
    /// TIFF or PSD compression
    #[arg(long, value_enum)]
    compression: Option<CompressionArg>,
    /// Merge layers in layered formats
    #[arg(long)]
    flatten: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Grid,
    Flow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ZoomArg {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FillArg {
    Foreground,
    Background,
    White,
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NamingArg {
    Book,
    Page,
    Number,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum UntaggedArg {
    Leave,
    Show,
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InterpolationArg {
    None,
    Linear,
    Cubic,
    Lanczos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DitherArg {
    None,
    Fs,
    FsReduced,
    Positioned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SubsamplingArg {
    #[value(name = "444")]
    Chroma444,
    #[value(name = "422")]
    Chroma422,
    #[value(name = "440")]
    Chroma440,
    #[value(name = "420")]
    Chroma420,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DctArg {
    Fast,
    Integer,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CompressionArg {
    None,
    Lzw,
    Rle,
    Deflate,
    Jpeg,
}

#[derive(Debug, Clone)]
enum CommandError {
    Usage(String),
    Runtime(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("invalid configuration: {msg}");
            return ExitCode::from(2);
        }
    };
    logging::init_logging(&config.log_filter);
    debug!("{config:?}");

    let service = build_book_service();
    match run_command(cli.command, &service, &config, cli.quiet) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CommandError::Usage(msg)) => {
            eprintln!("{msg}");
            ExitCode::from(2)
        }
        Err(CommandError::Runtime(msg)) => {
            eprintln!("{msg}");
            ExitCode::from(1)
        }
    }
}

fn build_book_service() -> BookService {
    BookService::new(
        Box::new(FsBookStorage),
        Box::new(RasterHost),
        Box::new(FsThumbnailGenerator),
        Box::new(WalkdirImageScanner),
        Box::new(SystemClock),
    )
}

fn run_command(
    command: Command,
    service: &BookService,
    config: &AppConfig,
    quiet: bool,
) -> Result<(), CommandError> {
    let mut report_progress = |progress: &Progress| {
        if !quiet {
            eprintln!("{}", present_progress(progress));
        }
    };
    let progress: &mut dyn FnMut(&Progress) = &mut report_progress;

    match command {
        Command::New(args) => {
            let book = service
                .create_book(
                    CreateBookCommand {
                        destination: args.destination.clone(),
                        name: args.name.clone(),
                        spec: new_book_spec(&args),
                    },
                    progress,
                )
                .map_err(|error| CommandError::Runtime(format!("create failed: {error}")))?;
            println!("{}", present_book(&book));
            Ok(())
        }
        Command::Info { book } => {
            let book = open_book(service, book, progress)?;
            print_pages(&book);
            Ok(())
        }
        Command::Add { book, name, at } => {
            let mut book = open_book(service, book, progress)?;
            let insert_at = at.unwrap_or(book.page_count());
            let index = service
                .add_page(&mut book, AddPageCommand { name, insert_at })
                .map_err(|error| CommandError::Runtime(format!("add failed: {error}")))?;
            println!("added {} at {index}", page_name(&book, index));
            Ok(())
        }
        Command::Duplicate {
            book,
            index,
            name,
            at,
        } => {
            let mut book = open_book(service, book, progress)?;
            let insert_at = at.unwrap_or(index + 1);
            let index = service
                .duplicate_page(
                    &mut book,
                    DuplicatePageCommand {
                        source_index: index,
                        name,
                        insert_at,
                    },
                )
                .map_err(|error| CommandError::Runtime(format!("duplicate failed: {error}")))?;
            println!("added {} at {index}", page_name(&book, index));
            Ok(())
        }
        Command::Import { book, paths, at } => {
            let mut book = open_book(service, book, progress)?;
            let insert_at = at.unwrap_or(book.page_count());
            let folder = match paths.as_slice() {
                [folder] if folder.is_dir() => Some(folder.clone()),
                _ => None,
            };
            let report = match folder {
                Some(folder) => service.import_folder(
                    &mut book,
                    ImportFolderCommand { folder, insert_at },
                    progress,
                ),
                None => service.import_pages(
                    &mut book,
                    ImportPagesCommand {
                        files: paths,
                        insert_at,
                    },
                    progress,
                ),
            }
            .map_err(|error| CommandError::Runtime(format!("import failed: {error}")))?;
            println!("{}", present_import_report(&report));
            Ok(())
        }
        Command::Rename { book, index, name } => {
            let mut book = open_book(service, book, progress)?;
            let old = page_name(&book, index);
            select(service, &mut book, index)?;
            let new = service
                .rename_page(&mut book, RenamePageCommand { name })
                .map_err(|error| CommandError::Runtime(format!("rename failed: {error}")))?;
            println!("renamed {old} to {new}");
            Ok(())
        }
        Command::Delete { book, index } => {
            let mut book = open_book(service, book, progress)?;
            select(service, &mut book, index)?;
            let trashed = service
                .delete_page(&mut book)
                .map_err(|error| CommandError::Runtime(format!("delete failed: {error}")))?;
            println!("moved page to {}", trashed.display());
            Ok(())
        }
        Command::Move { book, from, to } => {
            let mut book = open_book(service, book, progress)?;
            service
                .move_page(&mut book, MovePageCommand { from, to })
                .map_err(|error| CommandError::Runtime(format!("move failed: {error}")))?;
            print_pages(&book);
            Ok(())
        }
        Command::Mode { book, mode } => {
            let mut book = open_book(service, book, progress)?;
            let mode = match mode {
                ModeArg::Grid => DisplayMode::Grid,
                ModeArg::Flow => DisplayMode::Flow,
            };
            service
                .set_display_mode(&mut book, SetDisplayModeCommand { mode })
                .map_err(|error| CommandError::Runtime(format!("mode failed: {error}")))?;
            println!("{}", present_book(&book));
            Ok(())
        }
        Command::Zoom { book, direction } => {
            let mut book = open_book(service, book, progress)?;
            let size = match direction {
                ZoomArg::In => service.zoom_in(&mut book, progress),
                ZoomArg::Out => service.zoom_out(&mut book, progress),
            }
            .map_err(|error| CommandError::Runtime(format!("zoom failed: {error}")))?;
            println!("thumbnails are {}px", size.get());
            Ok(())
        }
        Command::Thumbs { book } => {
            let book = open_book(service, book, progress)?;
            let thumbnails = service
                .refresh_thumbnails(&book, progress)
                .map_err(|error| CommandError::Runtime(format!("thumbnails failed: {error}")))?;
            for thumbnail in thumbnails {
                println!(
                    "{}\t{}x{}",
                    thumbnail.file_path.display(),
                    thumbnail.width,
                    thumbnail.height
                );
            }
            Ok(())
        }
        Command::Export(args) => {
            let book = open_book(service, args.book.clone(), progress)?;
            let job = export_job(&args, config, book.page_count())?;
            if !args.force && service.export_would_overwrite(&book, &job) {
                return Err(CommandError::Usage(format!(
                    "{} already holds files, pass --force to overwrite them",
                    export_output_dir(&book, &job).display()
                )));
            }
            let report = service
                .export_book(&book, ExportBookCommand { job }, progress)
                .map_err(|error| CommandError::Runtime(format!("export failed: {error}")))?;
            println!("{}", present_export_report(&report));
            if report.failures.is_empty() {
                Ok(())
            } else {
                Err(CommandError::Runtime(format!(
                    "{} pages failed to export",
                    report.failures.len()
                )))
            }
        }
    }
}

fn open_book(
    service: &BookService,
    book_file: PathBuf,
    progress: &mut dyn FnMut(&Progress),
) -> Result<Book, CommandError> {
    service
        .open_book(OpenBookCommand { book_file }, progress)
        .map_err(|error| CommandError::Runtime(format!("open failed: {error}")))
}

fn select(service: &BookService, book: &mut Book, index: usize) -> Result<(), CommandError> {
    service
        .select_page(book, Some(index))
        .map_err(|error| CommandError::Usage(format!("invalid page index: {error}")))
}

fn page_name(book: &Book, index: usize) -> String {
    book.page(index).unwrap_or_default().to_string()
}

fn print_pages(book: &Book) {
    println!("{}", present_book(book));
    for (index, page) in book.pages().iter().enumerate() {
        println!("{}", present_page_row(book, index, page));
    }
}

fn new_book_spec(args: &NewArgs) -> NewBookSpec {
    NewBookSpec {
        width: args.width,
        height: args.height,
        resolution: args.resolution,
        color_mode: if args.grayscale {
            ColorMode::Grayscale
        } else {
            ColorMode::Rgb
        },
        fill: match args.fill {
            FillArg::Foreground => FillMode::Foreground,
            FillArg::Background => FillMode::Background,
            FillArg::White => FillMode::White,
            FillArg::Transparent => FillMode::Transparent,
        },
        foreground: args.foreground,
        background: args.background,
        margin_top: args.margin_top,
        margin_bottom: args.margin_bottom,
        margin_sides: args.margin_sides,
        bleed: args.bleed,
    }
}

fn export_job(
    args: &ExportArgs,
    config: &AppConfig,
    page_count: usize,
) -> Result<ExportJob, CommandError> {
    let range = match (args.first, args.last) {
        (None, None) => None,
        (first, last) => Some(PageRange::new(
            first.unwrap_or(0),
            last.unwrap_or(page_count.saturating_sub(1)),
        )),
    };
    let naming = match args.naming {
        NamingArg::Book => NamingScheme::BookName,
        NamingArg::Page => NamingScheme::PageName,
        NamingArg::Number => NamingScheme::PageNumber,
        NamingArg::Custom => NamingScheme::Custom(args.custom_name.clone().unwrap_or_default()),
    };
    let scale = match (args.percent, args.percent_height, args.size) {
        (None, None, Some((width, height))) => Scale::Pixels { width, height },
        (None, None, None) => Scale::default(),
        (width, height, _) => Scale::Percent {
            width: width.unwrap_or(100.0),
            height: height.or(width).unwrap_or(100.0),
        },
    };

    let mut job = ExportJob::new(args.destination.clone());
    job.range = range;
    job.naming = naming;
    job.tags = TagFilter {
        show: TagFilter::parse_list(&args.show),
        hide: TagFilter::parse_list(&args.hide),
        untagged: match args.untagged {
            UntaggedArg::Leave => UntaggedPolicy::LeaveAsIs,
            UntaggedArg::Show => UntaggedPolicy::Show,
            UntaggedArg::Hide => UntaggedPolicy::Hide,
        },
    };
    job.margins = Margins {
        top: args.margin_top,
        bottom: args.margin_bottom,
        inner: args.margin_inner,
        outer: args.margin_outer,
        bleed: args.bleed,
    };
    job.margin_fill = args.margin_fill;
    job.scale = scale;
    job.interpolation = match args.interpolation {
        InterpolationArg::None => Interpolation::None,
        InterpolationArg::Linear => Interpolation::Linear,
        InterpolationArg::Cubic => Interpolation::Cubic,
        InterpolationArg::Lanczos => Interpolation::Lanczos,
    };
    job.format = export_format(
        args.format.unwrap_or(config.export_format),
        &args.encoder,
        config,
    )?;
    job.on_error = if args.abort_on_error {
        ErrorPolicy::Abort
    } else {
        ErrorPolicy::Continue
    };
    Ok(job)
}

fn export_format(
    name: FormatName,
    encoder: &EncoderArgs,
    config: &AppConfig,
) -> Result<ExportFormat, CommandError> {
    let mut format = name.default_format();
    match &mut format {
        ExportFormat::Jpeg(options) => {
            options.quality = encoder.quality.unwrap_or(config.jpeg_quality);
            options.smoothing = encoder.smoothing.unwrap_or(options.smoothing);
            options.progressive = encoder.progressive;
            options.optimize = !encoder.no_optimize;
            options.restart_rows = encoder.restart_rows;
            if let Some(subsampling) = encoder.subsampling {
                options.subsampling = match subsampling {
                    SubsamplingArg::Chroma444 => JpegSubsampling::Chroma444,
                    SubsamplingArg::Chroma422 => JpegSubsampling::Chroma422,
                    SubsamplingArg::Chroma440 => JpegSubsampling::Chroma440,
                    SubsamplingArg::Chroma420 => JpegSubsampling::Chroma420,
                };
            }
            if let Some(dct) = encoder.dct {
                options.dct = match dct {
                    DctArg::Fast => DctMethod::Fast,
                    DctArg::Integer => DctMethod::Integer,
                    DctArg::Float => DctMethod::Float,
                };
            }
            if let Some(comment) = &encoder.comment {
                options.comment = comment.clone();
            }
        }
        ExportFormat::Gif(options) => {
            options.palette_size = encoder.colors.unwrap_or(options.palette_size);
            options.grayscale = encoder.gray;
            options.interlace = encoder.interlace;
            options.dither = match encoder.dither.unwrap_or(DitherArg::None) {
                DitherArg::None => GifDither::None,
                DitherArg::Fs => GifDither::FloydSteinberg,
                DitherArg::FsReduced => GifDither::FloydSteinbergReduced,
                DitherArg::Positioned => GifDither::Positioned,
            };
        }
        ExportFormat::Png(options) => {
            options.interlace = encoder.interlace;
            options.compression_level = encoder.png_level.unwrap_or(options.compression_level);
            options.save_background = encoder.png_background;
            options.save_gamma = encoder.png_gamma;
            options.save_layer_offset = encoder.png_offset;
            options.save_resolution = !encoder.no_png_resolution;
            options.save_creation_time = !encoder.no_png_time;
            options.save_transparent_color = encoder.keep_transparent_color;
        }
        ExportFormat::Tiff(options) => {
            options.compression = match encoder.compression.unwrap_or(CompressionArg::None) {
                CompressionArg::None => TiffCompression::None,
                CompressionArg::Lzw => TiffCompression::Lzw,
                CompressionArg::Rle => TiffCompression::Rle,
                CompressionArg::Deflate => TiffCompression::Deflate,
                CompressionArg::Jpeg => TiffCompression::Jpeg,
            };
            options.save_transparent_color = encoder.keep_transparent_color;
        }
        ExportFormat::Psd(options) => {
            options.flatten = encoder.flatten;
            options.compression = match encoder.compression.unwrap_or(CompressionArg::None) {
                CompressionArg::None => PsdCompression::None,
                CompressionArg::Lzw => PsdCompression::Lzw,
                CompressionArg::Rle => PsdCompression::Rle,
                other => {
                    return Err(CommandError::Usage(format!(
                        "PSD does not support {other:?} compression"
                    )))
                }
            };
        }
        ExportFormat::OpenRaster(options) | ExportFormat::Native(options) => {
            options.flatten = encoder.flatten;
        }
    }
    Ok(format)
}

fn parse_color(input: &str) -> Result<RgbColor, String> {
    RgbColor::parse_hex(input).ok_or_else(|| format!("expected #rrggbb, got {input:?}"))
}

fn parse_margin_fill(input: &str) -> Result<MarginFill, String> {
    match input.to_ascii_lowercase().as_str() {
        "page" => Ok(MarginFill::PageBackground),
        "black" => Ok(MarginFill::Black),
        "white" => Ok(MarginFill::White),
        _ => parse_color(input).map(MarginFill::Custom),
    }
}

fn parse_size(input: &str) -> Result<(u32, u32), String> {
    let (width, height) = input
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {input:?}"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid size {input:?}"))
    };
    Ok((parse(width)?, parse(height)?))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pagebook_domain::{JpegOptions, PngOptions, TiffOptions};

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pagebook").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    fn export_args(args: &[&str]) -> ExportArgs {
        let mut full = vec!["export", "Comic/Comic.book", "out"];
        full.extend_from_slice(args);
        match parse(&full).command {
            Command::Export(args) => args,
            other => panic!("expected export, got {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_add_command() {
        let cli = parse(&["add", "Comic/Comic.book", "Opening", "--at", "1"]);
        assert!(matches!(
            cli.command,
            Command::Add { ref name, at: Some(1), .. } if name == "Opening"
        ));
    }

    #[test]
    fn parse_rejects_missing_import_paths() {
        let result = Cli::try_parse_from(["pagebook", "import", "Comic/Comic.book"]);
        assert!(result.is_err());
    }

    #[test]
    fn default_export_uses_configured_format() {
        let config = AppConfig {
            jpeg_quality: 70,
            ..AppConfig::default()
        };

        let job = export_job(&export_args(&[]), &config, 5).expect("job");

        assert_eq!(job.destination, PathBuf::from("out"));
        assert_eq!(job.range, None);
        assert_eq!(job.naming, NamingScheme::BookName);
        assert_eq!(job.on_error, ErrorPolicy::Continue);
        assert_eq!(
            job.format,
            ExportFormat::Jpeg(JpegOptions {
                quality: 70,
                ..JpegOptions::default()
            })
        );
    }

    #[test]
    fn export_flags_build_the_job() {
        let args = export_args(&[
            "--first",
            "1",
            "--naming",
            "custom",
            "--custom-name",
            "print",
            "--hide",
            "notes, wip",
            "--margin-inner",
            "40",
            "--margin-fill",
            "#102030",
            "--size",
            "600x900",
            "--format",
            "gif",
            "--colors",
            "16",
            "--dither",
            "fs-reduced",
            "--abort-on-error",
        ]);

        let job = export_job(&args, &AppConfig::default(), 5).expect("job");

        assert_eq!(job.range, Some(PageRange::new(1, 4)));
        assert_eq!(job.naming, NamingScheme::Custom("print".to_string()));
        assert!(job.tags.hide.contains("wip") && job.tags.hide.contains("notes"));
        assert_eq!(job.margins.inner, 40);
        assert_eq!(
            job.margin_fill,
            MarginFill::Custom(RgbColor::new(0x10, 0x20, 0x30))
        );
        assert_eq!(
            job.scale,
            Scale::Pixels {
                width: 600,
                height: 900
            }
        );
        assert_eq!(job.on_error, ErrorPolicy::Abort);
        match job.format {
            ExportFormat::Gif(options) => {
                assert_eq!(options.palette_size, 16);
                assert_eq!(options.dither, GifDither::FloydSteinbergReduced);
            }
            other => panic!("expected gif, got {other:?}"),
        }
    }

    #[test]
    fn encoder_flags_reach_jpeg_and_png_options() {
        let jpeg = export_job(
            &export_args(&[
                "--format",
                "jpeg",
                "--no-optimize",
                "--subsampling",
                "444",
                "--dct",
                "float",
                "--percent",
                "50",
                "--percent-height",
                "25",
            ]),
            &AppConfig::default(),
            1,
        )
        .expect("job");
        assert_eq!(
            jpeg.scale,
            Scale::Percent {
                width: 50.0,
                height: 25.0
            }
        );
        match jpeg.format {
            ExportFormat::Jpeg(options) => {
                assert!(!options.optimize);
                assert_eq!(options.subsampling, JpegSubsampling::Chroma444);
                assert_eq!(options.dct, DctMethod::Float);
            }
            other => panic!("expected jpeg, got {other:?}"),
        }

        let png = export_job(
            &export_args(&[
                "--format",
                "png",
                "--interlace",
                "--png-background",
                "--png-gamma",
                "--png-offset",
                "--no-png-resolution",
                "--no-png-time",
                "--keep-transparent-color",
            ]),
            &AppConfig::default(),
            1,
        )
        .expect("job");
        assert_eq!(
            png.format,
            ExportFormat::Png(PngOptions {
                interlace: true,
                save_background: true,
                save_gamma: true,
                save_layer_offset: true,
                save_resolution: false,
                save_creation_time: false,
                save_transparent_color: true,
                ..PngOptions::default()
            })
        );

        let tiff = export_job(
            &export_args(&[
                "--format",
                "tiff",
                "--compression",
                "jpeg",
                "--keep-transparent-color",
            ]),
            &AppConfig::default(),
            1,
        )
        .expect("job");
        assert_eq!(
            tiff.format,
            ExportFormat::Tiff(TiffOptions {
                compression: TiffCompression::Jpeg,
                save_transparent_color: true,
            })
        );
    }

    #[test]
    fn percent_height_alone_keeps_full_width() {
        let job = export_job(
            &export_args(&["--percent-height", "80"]),
            &AppConfig::default(),
            1,
        )
        .expect("job");

        assert_eq!(
            job.scale,
            Scale::Percent {
                width: 100.0,
                height: 80.0
            }
        );
    }

    #[test]
    fn psd_rejects_deflate() {
        let args = export_args(&["--format", "psd", "--compression", "deflate"]);

        let result = export_job(&args, &AppConfig::default(), 1);

        assert!(matches!(result, Err(CommandError::Usage(_))));
    }

    #[test]
    fn size_and_fill_parsers() {
        assert_eq!(parse_size("640X480"), Ok((640, 480)));
        assert!(parse_size("640").is_err());
        assert_eq!(parse_margin_fill("Page"), Ok(MarginFill::PageBackground));
        assert!(parse_margin_fill("blue").is_err());
    }
}
