use clap::{Parser, Subcommand};
use quillgen::{build, config, scaffold};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Incremental static site generator for writers")]
#[command(long_about = "\
Incremental static site generator for writers

Your filesystem is the database. Markdown documents with a metadata block
become canonical JSON records, records aggregate into a site catalog, and
MiniJinja templates turn both into published pages. Nothing rebuilds
unless its input changed.

Archive structure after a build:

  content/                         # Authoring directory (sync source)
  └── field-notes/
      └── first-post.md            # Metadata block + markdown body
  build/
  ├── _index.json                  # Catalog of all published records
  └── field-notes/
      ├── first-post.md            # Synced source
      ├── first-post.json          # Canonical record
      └── first-post.html          # Rendered output, one per format

Templates resolve by itemtype specificity: an Item/Page/Article record
tries Item_Page_Article.html.j2, then Item_Page.html.j2, then
Item.html.j2.

Run 'quill gen-config' to generate a documented quillgen.toml.")]
#[command(version)]
struct Cli {
    /// Site configuration file
    #[arg(long, default_value = "quillgen.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: sync → normalize → index → render
    Build {
        /// Publish records dated in the future
        #[arg(long)]
        include_future: bool,
    },
    /// Validate every source document without writing anything
    Check,
    /// Create a starter document in the authoring directory
    New {
        /// Kind of document: article, page, or catalog
        kind: String,
        /// Title for the new document
        title: Option<String>,
    },
    /// Print a stock quillgen.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load(&cli.config)?;

    match cli.command {
        Command::Build { include_future } => {
            let report = build::build(&config, include_future)?;
            println!("==> Build complete: {report}");
        }
        Command::Check => {
            println!("==> Checking {}", config.options.source.display());
            let (checked, failed) = build::check(&config)?;
            if failed > 0 {
                return Err(format!("{failed} of {checked} documents failed validation").into());
            }
            println!("==> {checked} documents valid");
        }
        Command::New { kind, title } => {
            let itemtype = scaffold::itemtype_for(&kind)
                .ok_or_else(|| format!("unknown document kind: {kind} (try article, page, or catalog)"))?;
            let document = scaffold::new_markdown(itemtype, title.as_deref(), config.zone()?);
            let slug = scaffold::slugify(title.as_deref().unwrap_or("untitled"));
            let path = config.options.source.join(format!("{slug}.md"));
            if path.exists() {
                return Err(format!("{} already exists", path.display()).into());
            }
            std::fs::create_dir_all(&config.options.source)?;
            std::fs::write(&path, document)?;
            println!("==> Created {}", path.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
