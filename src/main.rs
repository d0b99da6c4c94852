//! Sealed Gallery - CLI
//!
//! Command-line front end for sealing, browsing and tagging images.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use sealed_gallery::{
    CategoryIndex, EvictionPolicy, GalleryConfig, GalleryKey, NavigationSession, SealedImageCrypto,
};

#[derive(Parser)]
#[command(name = "sealed-gallery")]
#[command(version = sealed_gallery::VERSION)]
#[command(about = "Sealed Gallery - browse individually-encrypted images")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Settings {
    /// JSON config file (optional)
    #[arg(long, global = true, default_value = "./gallery.json")]
    config: PathBuf,

    /// Transient plaintext directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Category store
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Root that tagged paths are stored relative to
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Max decoded images kept in memory
    #[arg(long, global = true)]
    capacity: Option<usize>,

    /// Evict least recently used images instead of flushing the whole cache
    #[arg(long, global = true)]
    lru: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new private key file
    Keygen {
        /// Output key file
        out: PathBuf,
    },

    /// Encrypt an image into the sealed format
    Seal {
        /// Private key file
        #[arg(short, long)]
        key: PathBuf,

        /// Plaintext image
        input: PathBuf,

        /// Sealed output (keep the image extension so it is scanned)
        output: PathBuf,
    },

    /// List the images a directory would show
    Scan {
        /// Directory of sealed images
        dir: PathBuf,
    },

    /// List categories and their entry counts
    Categories,

    /// Decrypt a single image and save it
    Export {
        /// Private key file
        #[arg(short, long)]
        key: PathBuf,

        /// Directory of sealed images
        #[arg(short, long)]
        dir: PathBuf,

        /// File name inside the directory
        file: String,

        /// Plaintext output path
        output: PathBuf,
    },

    /// Interactive browsing session
    Browse {
        /// Private key file
        #[arg(short, long)]
        key: PathBuf,

        /// Directory of sealed images
        #[arg(short, long)]
        dir: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(settings: &Settings) -> anyhow::Result<GalleryConfig> {
    let mut config = GalleryConfig::load(&settings.config)
        .with_context(|| format!("reading config {}", settings.config.display()))?;

    if let Some(dir) = &settings.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(store) = &settings.store {
        config.category_store = store.clone();
    }
    if let Some(root) = &settings.root {
        config.root = root.clone();
    }
    if let Some(capacity) = settings.capacity {
        config.cache_capacity = capacity;
    }
    if settings.lru {
        config.eviction = EvictionPolicy::LeastRecentlyUsed;
    }

    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.settings)?;

    match cli.command {
        Commands::Keygen { out } => {
            if out.exists() {
                anyhow::bail!("{} already exists", out.display());
            }
            GalleryKey::generate().save(&out)?;
            println!("Key written to {}", out.display());
        }

        Commands::Seal { key, input, output } => {
            let key = GalleryKey::load(&key)?;
            let size = SealedImageCrypto::new().encrypt(&key, &input, &output)?;
            println!("Sealed {} -> {} ({} bytes)", input.display(), output.display(), size);
        }

        Commands::Scan { dir } => {
            let files = sealed_gallery::scanner::scan(&dir)?;
            for file in &files {
                println!("{}", file);
            }
            println!("{} images", files.len());
        }

        Commands::Categories => {
            let index = CategoryIndex::load(&config.category_store, &config.root)?;
            if index.is_empty() {
                println!("No categories");
            }
            for (name, count) in index.summaries() {
                println!("{} ({} entries)", name, count);
            }
        }

        Commands::Export { key, dir, file, output } => {
            let mut session = NavigationSession::open(SealedImageCrypto::new(), &key, &config)?;
            let exported = export_one(&mut session, &dir, &file, &output);
            session.teardown()?;
            exported?;
            println!("Exported {} to {}", file, output.display());
        }

        Commands::Browse { key, dir } => {
            let mut session = NavigationSession::open(SealedImageCrypto::new(), &key, &config)?;
            if let Err(e) = session.load_directory(&dir) {
                println!("{}", e);
            }
            let browsed = browse(&mut session);
            session.teardown()?;
            browsed?;
        }
    }

    Ok(())
}

fn export_one(
    session: &mut NavigationSession<SealedImageCrypto>,
    dir: &Path,
    file: &str,
    output: &Path,
) -> anyhow::Result<()> {
    session.load_directory(dir)?;
    let position = session
        .working_list()
        .iter()
        .position(|f| f == file)
        .with_context(|| format!("{} is not an image in {}", file, dir.display()))?;

    session.goto_index(position + 1)?;
    session.export_current(output)?;
    Ok(())
}

const HELP: &str = "\
commands:
  f | b            step forward / backward
  goto N           jump to position N (1-based)
  rand K           sample K random images
  cat NAME [global] show images tagged NAME
  all              show every image again
  cats             list categories
  tag NAME         tag the current image
  untag NAME       remove one tag from the current image
  rm               delete the current image
  save PATH        save the current image decrypted
  open DIR         switch directory
  rescan           scan the last requested directory again
  info             show status
  quit";

fn browse(session: &mut NavigationSession<SealedImageCrypto>) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    show(session);
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("info");
        let arg = words.next();

        let outcome: sealed_gallery::GalleryResult<()> = match (command, arg) {
            ("q" | "quit" | "exit", _) => break,
            ("help" | "?", _) => {
                println!("{}", HELP);
                continue;
            }
            ("f" | "forward", _) => {
                session.step_forward();
                Ok(())
            }
            ("b" | "backward", _) => {
                session.step_backward();
                Ok(())
            }
            ("goto", Some(n)) => match n.parse() {
                Ok(n) => session.goto_index(n),
                Err(_) => {
                    println!("goto expects a number");
                    continue;
                }
            },
            ("rand", Some(k)) => match k.parse() {
                Ok(k) => session.sample_random(k).map(|_| println!("Sampled {} files!", k)),
                Err(_) => {
                    println!("rand expects a number");
                    continue;
                }
            },
            ("cat", Some(name)) => {
                let global = words.next() == Some("global");
                session
                    .filter_by_category(name, global)
                    .map(|n| println!("Loaded cat \"{}\" ({} files)", name, n))
            }
            ("all", _) => {
                session.show_all();
                Ok(())
            }
            ("cats", _) => {
                for (name, count) in session.categories().summaries() {
                    println!("{} ({} entries)", name, count);
                }
                continue;
            }
            ("tag", Some(name)) => session.tag(name).map(|rel| println!("Tagged {} as {}", rel, name)),
            ("untag", Some(name)) => session.untag(name).map(|removed| {
                if !removed {
                    println!("Not tagged {}", name);
                }
            }),
            ("rm", _) => {
                if confirm("Delete image?")? {
                    session.remove_current().map(|name| println!("Deleted {}", name))
                } else {
                    continue;
                }
            }
            ("save", Some(path)) => session.export_current(path),
            ("open", Some(dir)) => session.load_directory(dir).map(|_| ()),
            ("rescan", _) => session.rescan().map(|_| ()),
            ("info", _) => Ok(()),
            _ => {
                println!("unknown command, try help");
                continue;
            }
        };

        match outcome {
            Ok(()) => show(session),
            Err(e) => println!("{}", e),
        }
    }

    Ok(())
}

/// Decrypt the current image (if any) and print the status line
fn show(session: &mut NavigationSession<SealedImageCrypto>) {
    if !session.is_empty() {
        if let Err(e) = session.current_image() {
            println!("{}", e);
        }
    }
    println!("{}", session.status());
}

fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
