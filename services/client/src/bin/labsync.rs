//! services/client/src/bin/labsync.rs

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use labsync_client::{
    adapters::{FileTokenStore, HttpApi},
    config::Config,
    error::ClientError,
};
use labsync_core::{
    controllers::{
        labs::DEFAULT_LINK_SOURCE, AdminController, AssistantController, InventoryController,
        LabsController, ScheduleController, SyllabusController,
    },
    domain::{FileUpload, IssueKind, IssueReport, NewSchedule, Role, SimulationLink},
    guard::{GuardDecision, RouteGuard},
    navigation::{nav_links, session_control, Page, SessionControl},
    ports::Clock,
    SessionSnapshot, SessionStore, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "labsync", version, about = "Command-line client for the LabSync lab management backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show who is signed in and which pages they can open.
    Whoami,
    #[command(subcommand)]
    Inventory(InventoryCommand),
    #[command(subcommand)]
    Schedule(ScheduleCommand),
    #[command(subcommand)]
    Syllabus(SyllabusCommand),
    /// Ask the lab assistant a question.
    Chat { message: Vec<String> },
    #[command(subcommand)]
    Colleges(CollegeCommand),
    #[command(subcommand)]
    Departments(DepartmentCommand),
    #[command(subcommand)]
    Labs(LabsCommand),
}

#[derive(Subcommand)]
enum InventoryCommand {
    List {
        #[arg(long)]
        college: Option<i64>,
        #[arg(long)]
        department: Option<i64>,
    },
    Search { query: String },
    /// Report faulty or missing equipment.
    Report {
        #[arg(long)]
        item: i64,
        #[arg(long, value_enum)]
        kind: IssueArg,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
        #[arg(long, default_value = "")]
        description: String,
        /// Required when not signed in.
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IssueArg {
    Faulty,
    Missing,
}

impl From<IssueArg> for IssueKind {
    fn from(arg: IssueArg) -> Self {
        match arg {
            IssueArg::Faulty => IssueKind::Faulty,
            IssueArg::Missing => IssueKind::Missing,
        }
    }
}

#[derive(Subcommand)]
enum ScheduleCommand {
    List,
    Rooms,
    /// Book a lab slot. Times are local, e.g. 2026-03-04T09:00:00.
    Book {
        #[arg(long)]
        lab: String,
        #[arg(long)]
        start: NaiveDateTime,
        #[arg(long)]
        end: NaiveDateTime,
        #[arg(long)]
        course: String,
        #[arg(long)]
        batch: String,
        #[arg(long)]
        instructor: Option<String>,
        #[arg(long)]
        room: Option<String>,
    },
    Cancel { id: i64 },
}

#[derive(clap::Args)]
struct SaveTarget {
    /// File the result into the Virtual Labs catalog under this college.
    #[arg(long)]
    college: Option<i64>,
    #[arg(long)]
    department: Option<i64>,
    #[arg(long)]
    semester: Option<u8>,
}

impl SaveTarget {
    fn requested(&self) -> bool {
        self.college.is_some() || self.department.is_some() || self.semester.is_some()
    }
}

#[derive(Subcommand)]
enum SyllabusCommand {
    /// Parse a syllabus PDF into experiments.
    Upload {
        path: PathBuf,
        #[command(flatten)]
        save: SaveTarget,
    },
    /// Map typed topics to experiments.
    Manual {
        #[arg(long)]
        subject: String,
        #[arg(long = "topic")]
        topics: Vec<String>,
        #[command(flatten)]
        save: SaveTarget,
    },
}

#[derive(Subcommand)]
enum CollegeCommand {
    List,
    Add { name: String },
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum DepartmentCommand {
    List {
        #[arg(long)]
        college: Option<i64>,
    },
    Add {
        name: String,
        #[arg(long)]
        college: i64,
    },
}

#[derive(Subcommand)]
enum LabsCommand {
    /// List the subjects of a department for one semester.
    Subjects {
        #[arg(long)]
        department: i64,
        #[arg(long)]
        semester: u8,
    },
    AddSubject {
        name: String,
        #[arg(long)]
        department: i64,
        #[arg(long)]
        semester: u8,
        #[arg(long, default_value = "")]
        code: String,
        /// Online compiler opened from the subject's experiments.
        #[arg(long, default_value = "")]
        compiler: String,
    },
    DeleteSubject { id: i64 },
    /// List the experiments of a subject.
    Experiments { subject: i64 },
    AddExperiment {
        #[arg(long)]
        subject: i64,
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "")]
        unit: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        simulation: String,
        /// Simulation link as `source=url`, or a bare URL.
        #[arg(long = "link")]
        links: Vec<String>,
    },
    DeleteExperiment { id: i64 },
    /// Attach a lab manual PDF to a subject.
    UploadManual { subject: i64, path: PathBuf },
}

fn parse_link(raw: &str) -> SimulationLink {
    match raw.split_once('=') {
        Some((source, url)) if !source.contains("://") => SimulationLink {
            source: source.trim().to_string(),
            url: url.trim().to_string(),
            description: None,
        },
        _ => SimulationLink {
            source: DEFAULT_LINK_SOURCE.to_string(),
            url: raw.trim().to_string(),
            description: None,
        },
    }
}

/// Everything a command needs: the resolved session and the shared adapters.
struct Context {
    session: SessionStore,
    api: Arc<HttpApi>,
    clock: Arc<dyn Clock>,
}

impl Context {
    fn token(&self) -> Option<String> {
        self.session.token().map(str::to_string)
    }

    fn require(&self, guard: RouteGuard) -> Result<(), ClientError> {
        let decision = guard.evaluate(&self.session.snapshot());
        match decision {
            GuardDecision::Allowed => Ok(()),
            denied => Err(ClientError::AccessDenied(
                denied.denial_message().unwrap_or_default(),
            )),
        }
    }

    fn require_page(&self, page: Page) -> Result<(), ClientError> {
        match page.guard() {
            Some(guard) => self.require(guard),
            None => Ok(()),
        }
    }

    fn admin(&self) -> AdminController {
        AdminController::new(self.api.clone(), self.api.clone(), self.clock.clone(), self.token())
    }
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!(api_url = %config.api_url, "Configuration loaded");

    // --- 2. Build the Adapters & Resolve the Stored Session ---
    let api = Arc::new(HttpApi::new(config.api_url.clone())?);
    let tokens = Arc::new(FileTokenStore::new(config.token_path.clone()));
    let mut session = SessionStore::new(api.clone(), tokens);
    session.initialize().await;

    let mut ctx = Context {
        session,
        api,
        clock: Arc::new(SystemClock),
    };

    // --- 3. Run the Command ---
    match cli.command {
        Command::Login { email, password } => {
            let response = ctx.session.login(&email, &password).await?;
            println!("Signed in as {} ({})", response.user.email, response.user.role);
        }
        Command::Logout => {
            ctx.session.logout();
            println!("Signed out");
        }
        Command::Whoami => print_whoami(&ctx.session.snapshot()),
        Command::Inventory(cmd) => run_inventory(&ctx, cmd).await?,
        Command::Schedule(cmd) => run_schedule(&ctx, cmd).await?,
        Command::Syllabus(cmd) => run_syllabus(&ctx, cmd).await?,
        Command::Chat { message } => {
            let assistant = AssistantController::new(ctx.api.clone());
            if let Some(reply) = assistant.send(&message.join(" ")).await {
                println!("{}", reply.content);
            }
        }
        Command::Colleges(cmd) => run_colleges(&ctx, cmd).await?,
        Command::Departments(cmd) => run_departments(&ctx, cmd).await?,
        Command::Labs(cmd) => run_labs(&ctx, cmd).await?,
    }
    Ok(())
}

fn print_whoami(snapshot: &SessionSnapshot) {
    match session_control(snapshot) {
        SessionControl::SignIn => println!("Not signed in"),
        SessionControl::SignedIn { email, role } => println!("{} ({})", email, role),
    }
    let pages: Vec<&str> = nav_links(snapshot).into_iter().map(Page::title).collect();
    println!("Pages: {}", pages.join(", "));
}

async fn run_inventory(ctx: &Context, cmd: InventoryCommand) -> Result<(), ClientError> {
    let inventory =
        InventoryController::new(ctx.api.clone(), ctx.api.clone(), ctx.clock.clone(), ctx.token());
    match cmd {
        InventoryCommand::List { college, department } => {
            match (college, department) {
                (None, None) => inventory.load().await?,
                (college, department) => {
                    inventory.select_college(college).await?;
                    if department.is_some() {
                        inventory.select_department(department).await?;
                    }
                }
            }
            print_items(&inventory);
        }
        InventoryCommand::Search { query } => {
            inventory.search(&query).await?;
            print_items(&inventory);
        }
        InventoryCommand::Report {
            item,
            kind,
            quantity,
            description,
            name,
        } => {
            inventory
                .report_issue(IssueReport {
                    item_id: item,
                    issue_type: kind.into(),
                    quantity,
                    description,
                    reporter_name: name,
                })
                .await?;
            println!("Issue reported. Thank you!");
        }
    }
    Ok(())
}

fn print_items(inventory: &InventoryController) {
    let items = inventory.items_with_status();
    if items.is_empty() {
        println!("No items found");
    }
    for (item, status) in items {
        println!(
            "{:>5}  {:<32} {:>5}/{:<5} {:<12} {}",
            item.id,
            item.name,
            item.available_quantity,
            item.total_quantity,
            status.label(),
            item.location
        );
    }
}

async fn run_schedule(ctx: &Context, cmd: ScheduleCommand) -> Result<(), ClientError> {
    let schedule = ScheduleController::new(ctx.api.clone(), ctx.clock.clone(), ctx.token());
    match cmd {
        ScheduleCommand::List => {
            schedule.load().await?;
            let entries = schedule.snapshot().schedules;
            if entries.is_empty() {
                println!("No bookings yet");
            }
            for entry in entries {
                println!(
                    "{:>5}  {}  {}-{}  {:<12} {} ({})",
                    entry.id,
                    entry.start_time.format("%a %d %b %Y"),
                    entry.start_time.format("%H:%M"),
                    entry.end_time.format("%H:%M"),
                    entry.lab_name,
                    entry.course_name,
                    entry.batch
                );
            }
        }
        ScheduleCommand::Rooms => {
            for room in schedule.lab_rooms().await? {
                println!("{}", room);
            }
        }
        ScheduleCommand::Book {
            lab,
            start,
            end,
            course,
            batch,
            instructor,
            room,
        } => {
            ctx.require(RouteGuard::new(Role::Assistant))?;
            let booked_by_id = ctx.session.user().map(|user| user.id);
            let created = schedule
                .create(NewSchedule {
                    lab_name: lab,
                    start_time: start,
                    end_time: end,
                    course_name: course,
                    batch,
                    booked_by_id,
                    instructor_name: instructor,
                    lab_room: room,
                })
                .await?;
            println!("Booked {} (#{})", created.lab_name, created.id);
        }
        ScheduleCommand::Cancel { id } => {
            ctx.require(RouteGuard::new(Role::Assistant))?;
            schedule.delete(id).await?;
            println!("Cancelled booking #{}", id);
        }
    }
    Ok(())
}

async fn run_syllabus(ctx: &Context, cmd: SyllabusCommand) -> Result<(), ClientError> {
    let syllabus = SyllabusController::new(
        ctx.api.clone(),
        ctx.api.clone(),
        ctx.clock.clone(),
        ctx.token(),
    );
    let save = match cmd {
        SyllabusCommand::Upload { path, save } => {
            let bytes = tokio::fs::read(&path).await?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "syllabus.pdf".to_string());
            syllabus.upload(FileUpload::pdf(file_name, bytes)).await?;
            save
        }
        SyllabusCommand::Manual {
            subject,
            topics,
            save,
        } => {
            syllabus.submit_manual(&subject, &topics).await?;
            save
        }
    };

    for group in syllabus.grouped() {
        println!("{}", group.subject);
        for unit in group.units {
            println!("  {}", unit.label);
            for exp in unit.experiments {
                match exp.suggested_simulation {
                    Some(sim) => println!("    - {} [{}]", exp.topic, sim),
                    None => println!("    - {}", exp.topic),
                }
            }
        }
    }

    if save.requested() {
        ctx.require(RouteGuard::new(Role::Assistant))?;
        syllabus
            .save_to_catalog(save.college, save.department, save.semester)
            .await?;
        println!("Saved to Virtual Labs");
    }
    Ok(())
}

async fn run_colleges(ctx: &Context, cmd: CollegeCommand) -> Result<(), ClientError> {
    let admin = ctx.admin();
    match cmd {
        CollegeCommand::List => {
            admin.load().await?;
            for college in admin.snapshot().colleges {
                println!("{:>5}  {}", college.id, college.name);
            }
        }
        CollegeCommand::Add { name } => {
            ctx.require_page(Page::Admin)?;
            let college = admin.add_college(&name).await?;
            println!("Added college {} (#{})", college.name, college.id);
        }
        CollegeCommand::Delete { id } => {
            ctx.require_page(Page::Admin)?;
            admin.load().await?;
            let college = admin
                .snapshot()
                .colleges
                .into_iter()
                .find(|c| c.id == id)
                .ok_or_else(|| ClientError::Internal(format!("No college with id {}", id)))?;
            admin.delete_college(&college).await?;
            println!("Deleted college {}", college.name);
        }
    }
    Ok(())
}

async fn run_departments(ctx: &Context, cmd: DepartmentCommand) -> Result<(), ClientError> {
    let admin = ctx.admin();
    match cmd {
        DepartmentCommand::List { college } => {
            admin.load().await?;
            let state = admin.snapshot();
            for department in state
                .departments
                .iter()
                .filter(|d| college.map_or(true, |c| d.college_id == c))
            {
                let college_name = state
                    .colleges
                    .iter()
                    .find(|c| c.id == department.college_id)
                    .map_or("?", |c| c.name.as_str());
                println!("{:>5}  {:<24} {}", department.id, department.name, college_name);
            }
        }
        DepartmentCommand::Add { name, college } => {
            ctx.require_page(Page::Admin)?;
            let department = admin.add_department(&name, Some(college)).await?;
            println!("Added department {} (#{})", department.name, department.id);
        }
    }
    Ok(())
}

async fn run_labs(ctx: &Context, cmd: LabsCommand) -> Result<(), ClientError> {
    let labs = LabsController::new(ctx.api.clone(), ctx.clock.clone(), ctx.token());
    match cmd {
        LabsCommand::Subjects {
            department,
            semester,
        } => {
            labs.select_department(Some(department)).await?;
            labs.select_semester(Some(semester)).await?;
            let subjects = labs.snapshot().subjects;
            if subjects.is_empty() {
                println!("No subjects found.");
            }
            for subject in subjects {
                println!(
                    "{:>5}  {:<10} {}",
                    subject.id,
                    subject.code.unwrap_or_default(),
                    subject.name
                );
            }
        }
        LabsCommand::AddSubject {
            name,
            department,
            semester,
            code,
            compiler,
        } => {
            ctx.require_page(Page::Admin)?;
            labs.select_department(Some(department)).await?;
            labs.select_semester(Some(semester)).await?;
            labs.begin_add_subject();
            labs.update_subject_form(|form| {
                form.name = name;
                form.code = code;
                form.default_compiler = compiler;
            });
            let subject = labs.save_subject().await?;
            println!("Added subject {} (#{})", subject.name, subject.id);
        }
        LabsCommand::DeleteSubject { id } => {
            ctx.require_page(Page::Admin)?;
            labs.delete_subject(id).await?;
            println!("Deleted subject #{}", id);
        }
        LabsCommand::Experiments { subject } => {
            labs.toggle_subject(subject).await?;
            for exp in labs.snapshot().experiments {
                let unit = exp.unit.map_or_else(|| "-".to_string(), |u| u.to_string());
                println!("{:>5}  unit {:<3} {}", exp.id, unit, exp.topic);
                for link in exp.simulation_links {
                    println!("         {}: {}", link.source, link.url);
                }
            }
        }
        LabsCommand::AddExperiment {
            subject,
            topic,
            unit,
            description,
            simulation,
            links,
        } => {
            ctx.require_page(Page::Admin)?;
            labs.open_experiment_form(subject, None);
            labs.update_experiment_form(|form| {
                form.topic = topic;
                form.unit = unit;
                form.description = description;
                form.suggested_simulation = simulation;
                if !links.is_empty() {
                    form.links = links.iter().map(|raw| parse_link(raw)).collect();
                }
            });
            let experiment = labs.save_experiment().await?;
            println!("Added experiment {} (#{})", experiment.topic, experiment.id);
        }
        LabsCommand::DeleteExperiment { id } => {
            ctx.require_page(Page::Admin)?;
            labs.delete_experiment(id).await?;
            println!("Deleted experiment #{}", id);
        }
        LabsCommand::UploadManual { subject, path } => {
            ctx.require_page(Page::Admin)?;
            let bytes = tokio::fs::read(&path).await?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "lab-manual.pdf".to_string());
            labs.upload_lab_manual(subject, FileUpload::pdf(file_name, bytes))
                .await?;
            println!("Lab manual uploaded");
        }
    }
    Ok(())
}
