use clap::{Parser, Subcommand};
use filmstrip::browser::{Browser, BrowserError, BrowserEvent};
use filmstrip::cache::DEFAULT_CAPACITY;
use filmstrip::config::{BrowserConfig, DEFAULT_THUMBNAIL_WIDTH};
use filmstrip::imaging::{DecodedImage, RustBackend};
use filmstrip::output;
use filmstrip::sort::{SortDirection, SortKey};
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Flags that size the browser; shared by every command.
#[derive(clap::Args, Clone)]
struct BrowserArgs {
    /// Maximum thumbnail width in pixels
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_WIDTH, global = true)]
    thumbnail_width: u32,

    /// Entries kept per cache pool (thumbnails, full size)
    #[arg(long, default_value_t = DEFAULT_CAPACITY, global = true)]
    cache_capacity: usize,

    /// Decode worker threads (default: all cores)
    #[arg(long, global = true)]
    jobs: Option<usize>,
}

#[derive(Parser)]
#[command(name = "filmstrip")]
#[command(about = "Browse, inspect and export folders of photos")]
#[command(long_about = "\
Browse, inspect and export folders of photos

Scans one directory (non-recursive) for JPEG, PNG, GIF, BMP and camera RAW
files (RAW, NEF, CR2, ARW, DNG), decodes width-bounded thumbnails in
parallel, and reads EXIF metadata. RAW thumbnails come from the embedded
camera preview when one is present.

Thumbnails and full-size images are kept in a bounded in-memory cache;
the oldest entry is evicted first.")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    browser: BrowserArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a directory's images with their metadata
    Scan {
        dir: PathBuf,
        /// Sort key
        #[arg(long, value_enum, default_value_t = SortKey::Name)]
        sort: SortKey,
        /// Reverse the sort order
        #[arg(long)]
        descending: bool,
        /// Print the items as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Decode one image at full size, optionally rotate and save it
    Show {
        file: PathBuf,
        /// Quarter turns clockwise
        #[arg(long, default_value_t = 0)]
        rotate: u32,
        /// Write the displayed image to this file (format from extension)
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Select files in a directory and copy them to a destination
    Export {
        dir: PathBuf,
        /// Destination directory (must exist)
        #[arg(long)]
        to: Option<PathBuf>,
        /// File names inside DIR to select
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let args = cli.browser;

    match cli.command {
        Command::Scan {
            dir,
            sort,
            descending,
            json,
        } => {
            let direction = if descending {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            // JSON goes to stdout untouched, so progress lines are suppressed.
            let (items, stats) = with_printer(!json, |events| {
                let mut browser = open_browser(&args, events)?;
                browser.open_directory(&dir)?;
                browser.wait_idle();
                browser.sort(sort, direction);
                Ok((browser.items().to_vec(), browser.cache_stats()))
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                output::print_scan_output(&dir, &items, &stats);
            }
        }
        Command::Show { file, rotate, save } => {
            let shown = with_printer(true, |events| {
                let mut browser = open_browser(&args, events)?;
                let mut shown = browser.open_image(&file)?;
                for _ in 0..rotate % 4 {
                    browser.begin_rotation()?;
                    browser.wait_idle();
                    if let Some(image) = browser.displayed() {
                        shown = Arc::clone(image);
                    }
                }
                Ok(shown)
            })?;

            output::print_image_output(&file, &shown);
            if let Some(out) = save {
                save_image(&shown, &out)?;
                println!("Saved {}", out.display());
            }
        }
        Command::Export { dir, to, files } => {
            let report = with_printer(true, |events| {
                let mut browser = open_browser(&args, events)?;
                browser.open_directory(&dir)?;
                browser.wait_idle();
                for name in &files {
                    let path = dir.join(name);
                    if browser.item(&path).is_none() {
                        return Err(format!(
                            "{} is not a browsable image in {}",
                            name.display(),
                            dir.display()
                        )
                        .into());
                    }
                    browser.toggle(&path);
                }
                Ok(browser.export(to.as_deref())?)
            })?;

            output::print_export_report(&report);
        }
    }

    Ok(())
}

/// Build a browser from the command-line flags.
fn open_browser(args: &BrowserArgs, events: Option<Sender<BrowserEvent>>) -> Result<Browser, BrowserError> {
    let config = BrowserConfig {
        thumbnail_width: args.thumbnail_width,
        cache_capacity: args.cache_capacity,
        max_workers: args.jobs,
    };
    let browser = Browser::new(config, Arc::new(RustBackend::new()))?;
    Ok(match events {
        Some(tx) => browser.with_events(tx),
        None => browser,
    })
}

/// Run `f` with a progress printer thread attached.
///
/// The printer exits once every sender is dropped, which happens when the
/// browser created inside `f` goes out of scope.
fn with_printer<T>(
    enabled: bool,
    f: impl FnOnce(Option<Sender<BrowserEvent>>) -> CliResult<T>,
) -> CliResult<T> {
    if !enabled {
        return f(None);
    }

    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = f(Some(tx));
    printer.join().map_err(|_| "progress printer panicked")?;
    result
}

/// Encode the displayed image. JPEG has no alpha channel, so it gets RGB.
fn save_image(image: &DecodedImage, out: &Path) -> CliResult<()> {
    let dynamic = image.to_dynamic();
    match ImageFormat::from_path(out)? {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(dynamic.to_rgb8()).save(out)?,
        _ => dynamic.save(out)?,
    }
    Ok(())
}
