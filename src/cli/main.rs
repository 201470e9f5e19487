mod prompt;
mod table;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::ErrorKind;
use std::path::PathBuf;

use exif_edit::config::Config;
use exif_edit::session::{Command, Session, State};
use exif_edit::tags::TagMap;
use exif_edit::{acquire, exif, media};
use prompt::{MenuChoice, Source};

/// Exit status after Ctrl+C, as a shell would report SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "exif-edit",
    version,
    about = "Download or open an image, inspect its EXIF/GPS metadata, edit it and save a modified JPEG copy"
)]
struct Cli {
    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    match run(&config).await {
        Err(e) if is_interrupt(&e) => {
            // dialoguer hides the cursor inside Select; show it again.
            print!("\x1b[?25h");
            println!();
            std::process::exit(EXIT_INTERRUPTED);
        }
        other => other,
    }
}

async fn run(config: &Config) -> Result<()> {
    let path = match prompt::ask_source()? {
        Source::Download => match fetch(config).await? {
            Some(path) => path,
            None => return Ok(()),
        },
        Source::Local => prompt::ask_local_path()?,
    };

    let image = media::load_image(&path)
        .with_context(|| format!("Could not open {}", path.display()))?;
    let tags = exif::read_tags(&path).unwrap_or_else(|e| {
        log::warn!("Could not read metadata from {}: {e}", path.display());
        TagMap::new()
    });

    let mut session = Session::new(image, tags, config.output.clone());

    if prompt::confirm("View metadata?", true)? {
        table::print_tags(&path, session.image(), session.tags());
    }

    if !prompt::confirm("Modify metadata?", false)? {
        session.apply(Command::Exit)?;
        return Ok(());
    }

    if session.tags().is_empty() && prompt::confirm("No metadata found. Create new metadata?", true)? {
        let fields = prompt::ask_fields()?;
        session.replace_tags(TagMap::create_from_fields(fields))?;
    } else {
        session.begin_editing()?;
    }

    loop {
        let command = match prompt::menu()? {
            MenuChoice::UpdateTag => {
                let (tag, value) = prompt::ask_tag_value()?;
                Command::Update { tag, value }
            }
            MenuChoice::SetGps => Command::SetGps(prompt::ask_coordinate()?),
            MenuChoice::RemoveGps => Command::RemoveGps,
            MenuChoice::ClearAll => {
                if !prompt::confirm("Remove all metadata?", false)? {
                    continue;
                }
                Command::ClearAll
            }
            MenuChoice::View => {
                table::print_tags(&path, session.image(), session.tags());
                continue;
            }
            MenuChoice::SaveAndExit => {
                let dest = session.destination();
                if dest.exists()
                    && !prompt::confirm(&format!("{} exists. Overwrite?", dest.display()), false)?
                {
                    continue;
                }
                Command::Save
            }
            MenuChoice::ExitWithoutSaving => Command::Exit,
        };

        match session.apply(command) {
            Ok(State::Saved(report)) => {
                table::print_save_report(report);
                break;
            }
            Ok(State::Exited) => {
                println!("Exited without saving.");
                break;
            }
            Ok(_) => {}
            Err(e) if e.is_recoverable() => eprintln!("  {e}"),
            Err(e) => return Err(e).context("Could not apply the change"),
        }
    }

    Ok(())
}

/// Ask for a URL and file name and download. `None` when the user gives up
/// after a failed download.
async fn fetch(config: &Config) -> Result<Option<PathBuf>> {
    loop {
        let url = prompt::ask_url()?;
        let dest = loop {
            let dest = PathBuf::from(prompt::ask_filename()?);
            if !dest.exists()
                || prompt::confirm(&format!("{} exists. Overwrite?", dest.display()), false)?
            {
                break dest;
            }
        };

        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {bytes}/{total_bytes} ({eta})")?
                .progress_chars("=> "),
        );
        let progress = |done: u64, total: Option<u64>| {
            if let Some(total) = total {
                bar.set_length(total);
            }
            bar.set_position(done);
        };

        // Dropping the download future discards its temp file.
        let result = tokio::select! {
            result = acquire::download(&url, &dest, &config.download, progress) => result,
            _ = tokio::signal::ctrl_c() => {
                bar.abandon();
                return Err(std::io::Error::from(ErrorKind::Interrupted).into());
            }
        };
        bar.finish_and_clear();

        match result {
            Ok(report) => {
                log::info!("Downloaded {} ({} bytes, {:?})", report.path.display(), report.bytes, report.format);
                return Ok(Some(report.path));
            }
            Err(e) => {
                eprintln!("Download failed: {e}");
                if !prompt::confirm("Try another URL?", true)? {
                    return Ok(None);
                }
            }
        }
    }
}

fn is_interrupt(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == ErrorKind::Interrupted)
    })
}
