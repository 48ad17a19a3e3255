use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use jobboard_admin::config;
use jobboard_admin::console::{Console, Managed};
use jobboard_admin::model::{JobPosting, PopupConfig, Resource, ResourceId};
use jobboard_admin::notify::NotificationKind;
use jobboard_admin::session::{Credentials, View};
use jobboard_admin::upload::ImageFile;

#[derive(Debug, Parser)]
#[command(author, version, about = "Manage job postings and popups on the job board")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "JOBBOARD_PASSWORD")]
        password: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show whether a session token is stored
    Status,
    #[command(subcommand)]
    Jobs(JobsCommand),
    #[command(subcommand)]
    Popup(PopupCommand),
    /// Upload an image and print its hosted URL
    Upload { file: PathBuf },
}

#[derive(Debug, Subcommand)]
enum JobsCommand {
    /// List one page of jobs, optionally filtered
    List {
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Create a job
    Add(JobFields),
    /// Edit an existing job; omitted fields keep their current value
    Edit {
        id: String,
        #[command(flatten)]
        fields: JobFields,
    },
    Delete { id: String },
}

#[derive(Debug, ClapArgs)]
struct JobFields {
    #[arg(long)]
    company_name: Option<String>,
    #[arg(long)]
    title: Option<String>,
    /// Points separated by '#'
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    apply_link: Option<String>,
    #[arg(long)]
    image_link: Option<String>,
    /// Upload this image and use its URL as the image link
    #[arg(long, conflicts_with = "image_link")]
    image: Option<PathBuf>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    salary: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    job_type: Option<String>,
    #[arg(long)]
    experience: Option<String>,
    #[arg(long)]
    batch: Option<String>,
}

impl JobFields {
    fn values(&self) -> Vec<(&'static str, &Option<String>)> {
        vec![
            ("companyname", &self.company_name),
            ("title", &self.title),
            ("description", &self.description),
            ("apply_link", &self.apply_link),
            ("image_link", &self.image_link),
            ("url", &self.url),
            ("salary", &self.salary),
            ("location", &self.location),
            ("job_type", &self.job_type),
            ("experience", &self.experience),
            ("batch", &self.batch),
        ]
    }
}

#[derive(Debug, Subcommand)]
enum PopupCommand {
    /// Show the current popup(s)
    Show,
    /// Create or update a popup. With --id (or in single mode) the existing
    /// popup is updated.
    Save {
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        fields: PopupFields,
    },
    /// Delete a popup (the current one in single mode when no id is given)
    Delete { id: Option<String> },
}

#[derive(Debug, ClapArgs)]
struct PopupFields {
    #[arg(long)]
    heading: Option<String>,
    #[arg(long)]
    text: Option<String>,
    #[arg(long)]
    image_link: Option<String>,
    #[arg(long, conflicts_with = "image_link")]
    image: Option<PathBuf>,
    #[arg(long)]
    routing_link: Option<String>,
    #[arg(long)]
    below_text: Option<String>,
}

impl PopupFields {
    fn values(&self) -> Vec<(&'static str, &Option<String>)> {
        vec![
            ("popup_heading", &self.heading),
            ("popup_text", &self.text),
            ("popup_link", &self.image_link),
            ("popup_routing_link", &self.routing_link),
            ("popup_belowtext", &self.below_text),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let mut console = Console::from_config(&cfg).context("failed to build console")?;
    let outcome = run(&mut console, args.command).await;
    print_notification(&console);
    outcome
}

async fn run(console: &mut Console, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            console.login(&Credentials { username, password }).await?;
        }
        Command::Logout => {
            console.logout();
        }
        Command::Status => {
            let state = if console.is_authenticated() { "logged in" } else { "logged out" };
            println!("{}", state);
        }
        Command::Jobs(cmd) => run_jobs(console, cmd).await?,
        Command::Popup(cmd) => run_popup(console, cmd).await?,
        Command::Upload { file } => {
            enter(console, View::Jobs).await?;
            let image = ImageFile::from_path(&file).await?;
            if let Some(url) = console.upload_image::<JobPosting>(&image).await? {
                println!("{}", url);
            }
        }
    }
    Ok(())
}

/// Mount a gated view, failing when the session does not admit it.
async fn enter(console: &mut Console, view: View) -> Result<()> {
    if console.navigate(view).await != view {
        bail!("not logged in; run `login` first");
    }
    Ok(())
}

async fn run_jobs(console: &mut Console, cmd: JobsCommand) -> Result<()> {
    enter(console, View::Jobs).await?;
    match cmd {
        JobsCommand::List {
            company,
            title,
            description,
            page,
        } => {
            for (field, value) in [("companyname", company), ("title", title), ("description", description)] {
                if let Some(value) = value {
                    console.set_query::<JobPosting>(field, value)?;
                }
            }
            console.go_to_page::<JobPosting>(page);
            print_jobs(console);
        }
        JobsCommand::Add(fields) => {
            apply_fields::<JobPosting>(console, &fields.values(), fields.image.as_ref()).await?;
            console.submit::<JobPosting>().await?;
        }
        JobsCommand::Edit { id, fields } => {
            let id = ResourceId::from(id.as_str());
            if !console.begin_edit::<JobPosting>(&id) {
                bail!("job {} not found", id);
            }
            apply_fields::<JobPosting>(console, &fields.values(), fields.image.as_ref()).await?;
            console.submit::<JobPosting>().await?;
        }
        JobsCommand::Delete { id } => {
            console.delete::<JobPosting>(&ResourceId::from(id.as_str())).await?;
        }
    }
    Ok(())
}

async fn run_popup(console: &mut Console, cmd: PopupCommand) -> Result<()> {
    enter(console, View::Popups).await?;
    match cmd {
        PopupCommand::Show => print_popups(console),
        PopupCommand::Save { id, fields } => {
            if let Some(id) = id {
                let id = ResourceId::from(id.as_str());
                if !console.begin_edit::<PopupConfig>(&id) {
                    bail!("popup {} not found", id);
                }
            }
            apply_fields::<PopupConfig>(console, &fields.values(), fields.image.as_ref()).await?;
            console.submit::<PopupConfig>().await?;
        }
        PopupCommand::Delete { id } => {
            let id = match id {
                Some(id) => ResourceId::from(id.as_str()),
                None => console
                    .workspace::<PopupConfig>()
                    .store()
                    .items()
                    .first()
                    .and_then(|p| p.id().cloned())
                    .context("no popup to delete")?,
            };
            console.delete::<PopupConfig>(&id).await?;
        }
    }
    Ok(())
}

async fn apply_fields<R: Managed>(
    console: &mut Console,
    values: &[(&'static str, &Option<String>)],
    image: Option<&PathBuf>,
) -> Result<()> {
    for (field, value) in values {
        if let Some(value) = value {
            console.set_field::<R>(field, value.clone())?;
        }
    }
    if let Some(path) = image {
        let file = ImageFile::from_path(path).await?;
        console.upload_image::<R>(&file).await?;
    }
    Ok(())
}

fn print_jobs(console: &Console) {
    let ws = console.workspace::<JobPosting>();
    if let Some(err) = ws.store().error() {
        println!("Error: {}", err);
    }
    let page = ws.page();
    for job in &page.items {
        let id = job.id().map(ToString::to_string).unwrap_or_default();
        println!(
            "[{}] {} - {}",
            id,
            job.field("companyname").unwrap_or(""),
            job.field("title").unwrap_or("")
        );
        for point in job.description_points() {
            println!("    - {}", point);
        }
        for field in ["url", "salary", "location", "job_type", "experience", "batch"] {
            match job.field(field) {
                Some(value) if !value.is_empty() => println!("    {}: {}", field, value),
                _ => {}
            }
        }
    }
    println!(
        "page {}/{} ({} matching)",
        page.state.current_page, page.state.total_pages, page.filtered_count
    );
}

fn print_popups(console: &Console) {
    let ws = console.workspace::<PopupConfig>();
    if let Some(err) = ws.store().error() {
        println!("Error: {}", err);
    }
    if ws.store().items().is_empty() {
        println!("no popup configured");
    }
    for popup in ws.store().items() {
        let id = popup.id().map(ToString::to_string).unwrap_or_default();
        println!("[{}]", id);
        for field in PopupConfig::FIELDS {
            println!("    {}: {}", field, popup.field(field).unwrap_or(""));
        }
    }
}

fn print_notification(console: &Console) {
    if let Some(n) = console.notifier().current() {
        match n.kind {
            NotificationKind::Info => println!("{}", n.text),
            NotificationKind::Error => eprintln!("error: {}", n.text),
        }
    }
}
