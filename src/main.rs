#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use tallpdf::parse::{parse_aspect_ratio, CodecKind, ImageFormat, PngCompression};
use tallpdf::slice::{slice_image, SliceOptions};
use tallpdf::{
    default_output_path, probe_dimensions, worker, ConvertOptions, ConvertRequest, Destination,
    Event, LastPage, Outcome, PageLayout, PageUnit, SpoolKind,
};

#[derive(Parser)]
#[command(name = "tallpdf", version, about = "Slice a tall image into fixed-ratio PDF pages")]
struct Cli {
    /// suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// convert a tall image into a paginated PDF
    Convert {
        /// input image (png, jpg, tiff, bmp, gif, webp)
        input: PathBuf,

        /// output PDF path (default next to input), "-" for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// page height / width, e.g. 1.4142 or 297:210
        #[arg(short, long, default_value = "1.4142", value_parser = parse_aspect_ratio)]
        ratio: f64,

        /// DPI of the input image, used for page sizing (72 = one pixel per point)
        #[arg(short, long, default_value_t = 72, value_parser = clap::value_parser!(u32).range(1..=2400))]
        dpi: u32,

        /// how bands are stored in the PDF
        #[arg(short, long, default_value = "jpeg")]
        codec: CodecKind,

        /// JPEG quality (1-100)
        #[arg(long, default_value_t = 75, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        /// where encoded bands wait before assembly
        #[arg(long, default_value = "memory")]
        spool: SpoolKind,

        /// parent directory for disk spooling (default system temp dir)
        #[arg(long)]
        spool_dir: Option<PathBuf>,

        /// how the shorter last band fills its page
        #[arg(long, default_value = "stretch")]
        last_page: LastPage,

        /// PDF title metadata
        #[arg(long)]
        title: Option<String>,

        /// PDF author metadata
        #[arg(long)]
        author: Option<String>,
    },
    /// print the page layout without converting
    Plan {
        /// input image
        input: PathBuf,

        /// page height / width, e.g. 1.4142 or 297:210
        #[arg(short, long, default_value = "1.4142", value_parser = parse_aspect_ratio)]
        ratio: f64,

        /// DPI of the input image, used for page sizing
        #[arg(short, long, default_value_t = 72, value_parser = clap::value_parser!(u32).range(1..=2400))]
        dpi: u32,
    },
    /// write each page band as a separate image
    Slice {
        /// input image
        input: PathBuf,

        /// output dir (default next to input file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// page height / width, e.g. 1.4142 or 297:210
        #[arg(short, long, default_value = "1.4142", value_parser = parse_aspect_ratio)]
        ratio: f64,

        /// image format
        #[arg(short, long, default_value = "png")]
        format: ImageFormat,

        /// PNG compression: fast (speed) or small (filesize)
        #[arg(short, long, default_value = "fast")]
        compress: PngCompression,

        /// JPEG quality (1-100)
        #[arg(long, default_value_t = 75, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        /// how the shorter last band fills its page
        #[arg(long, default_value = "stretch")]
        last_page: LastPage,
    },
    /// generate shell completions
    Completions {
        /// shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn print_progress(percent: u8) {
    eprint!("\r  {:>3}%", percent);
    let _ = std::io::stderr().flush();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tallpdf::logger::init_cli_logger(cli.verbose, cli.quiet);

    let quiet = cli.quiet;

    match cli.command {
        Commands::Convert {
            input,
            output,
            ratio,
            dpi,
            codec,
            quality,
            spool,
            spool_dir,
            last_page,
            title,
            author,
        } => {
            let output = output.unwrap_or_else(|| default_output_path(&input));
            let destination = Destination::from_arg(&output);
            if !quiet {
                eprintln!("Converting {} -> {}", input.display(), destination);
            }
            let start = std::time::Instant::now();

            let request = ConvertRequest::new(input, destination).with_options(ConvertOptions {
                aspect_ratio: ratio,
                unit: PageUnit { dpi },
                codec: codec.with_quality(quality),
                spool,
                spool_dir,
                last_page,
                title,
                author,
            });
            let handle = worker::spawn(request).context("Failed to start conversion worker")?;
            for event in handle.events().iter() {
                if let Event::Progress(percent) = event {
                    if !quiet {
                        print_progress(percent);
                    }
                }
            }
            if !quiet {
                eprintln!();
            }

            match handle.join() {
                Outcome::Success(path) => {
                    if !quiet {
                        eprintln!(
                            "Done. PDF saved to {} in {:.2}s",
                            path.display(),
                            start.elapsed().as_secs_f64()
                        );
                    }
                }
                Outcome::Failure(message) => anyhow::bail!(message),
            }
        }
        Commands::Plan { input, ratio, dpi } => {
            let (width, height) = probe_dimensions(&input)?;
            let layout = PageLayout::compute(width, height, ratio)?;
            let size = layout.page_size(PageUnit { dpi });
            println!("image   {}x{} px", width, height);
            println!(
                "page    {}x{:.2} px, {:.2}x{:.2} pt",
                layout.page_width_px(),
                layout.page_height_px(),
                size.width_pt,
                size.height_pt
            );
            println!("pages   {}", layout.page_count());
            for region in layout.regions() {
                println!(
                    "  {:>4}  rows {:>7}..{:<7} {:>6} px",
                    region.index + 1,
                    region.top,
                    region.bottom,
                    region.height()
                );
            }
        }
        Commands::Slice {
            input,
            output,
            ratio,
            format,
            compress,
            quality,
            last_page,
        } => {
            let output_dir = output.unwrap_or_else(|| {
                input
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .to_path_buf()
            });
            let opts = SliceOptions {
                aspect_ratio: ratio,
                format,
                compress,
                quality,
                last_page,
            };
            let progress = |percent: u8| {
                if !quiet {
                    print_progress(percent);
                }
            };
            let written = slice_image(&input, &output_dir, &opts, &progress)?;
            if !quiet {
                eprintln!();
                eprintln!("Wrote {} page(s) to {}", written.len(), output_dir.display());
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "tallpdf",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
