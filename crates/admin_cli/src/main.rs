use std::{error::Error, io::Write};

use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{CompetitionNew, Engine, users};
use migration::MigratorTrait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

#[derive(Parser, Debug)]
#[command(name = "bigtip_admin")]
#[command(about = "Admin utilities for The Big Tip (bootstrap users/competitions)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./bigtip.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Competition(Competition),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    /// Grant or revoke site administration.
    Admin(UserAdminArgs),
    List,
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    admin: bool,
}

#[derive(Args, Debug)]
struct UserAdminArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    revoke: bool,
}

#[derive(Args, Debug)]
struct Competition {
    #[command(subcommand)]
    command: CompetitionCommand,
}

#[derive(Subcommand, Debug)]
enum CompetitionCommand {
    Create(CompetitionCreateArgs),
}

#[derive(Args, Debug)]
struct CompetitionCreateArgs {
    /// Username of the owner, who becomes its first commissioner.
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    public: bool,
    #[arg(long, default_value_t = 30)]
    days: i64,
    /// Entry fee in minor currency units.
    #[arg(long, default_value_t = 0)]
    entry_fee: i64,
    #[arg(long, default_value_t = 0)]
    prize_pool: i64,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn find_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<users::Model, Box<dyn Error + Send + Sync>> {
    let username = username.trim().to_ascii_lowercase();
    users::Entity::find()
        .filter(users::Column::Username.eq(username.clone()))
        .one(db)
        .await?
        .ok_or_else(|| format!("user not found: {username}").into())
}

async fn set_admin(
    db: &DatabaseConnection,
    user: users::Model,
    is_admin: bool,
) -> Result<users::Model, Box<dyn Error + Send + Sync>> {
    let mut active: users::ActiveModel = user.into();
    active.is_admin = Set(is_admin);
    Ok(active.update(db).await?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db.clone()).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let mut user = engine
                .register_user(&args.username, &args.email, &password)
                .await?;
            if args.admin {
                user = set_admin(&db, user, true).await?;
            }
            println!(
                "created user: {} ({}){}",
                user.username,
                user.id,
                if user.is_admin { " [admin]" } else { "" }
            );
        }
        Command::User(User {
            command: UserCommand::Admin(args),
        }) => {
            let user = find_user(&db, &args.username).await?;
            let user = set_admin(&db, user, !args.revoke).await?;
            println!("{}: admin = {}", user.username, user.is_admin);
        }
        Command::User(User {
            command: UserCommand::List,
        }) => {
            let users = users::Entity::find()
                .order_by_asc(users::Column::CreatedAt)
                .all(&db)
                .await?;
            for user in users {
                println!(
                    "{}\t{}\t{}\tadmin={}\tmfa={}",
                    user.id, user.username, user.email, user.is_admin, user.mfa_enabled
                );
            }
        }
        Command::Competition(Competition {
            command: CompetitionCommand::Create(args),
        }) => {
            if args.days <= 0 {
                eprintln!("--days must be positive");
                std::process::exit(2);
            }
            let owner = find_user(&db, &args.owner).await?;
            let starts_at = Utc::now();
            let competition = engine
                .create_competition(
                    &owner.id,
                    CompetitionNew {
                        name: args.name,
                        description: args.description,
                        is_public: args.public,
                        starts_at,
                        ends_at: starts_at + Duration::days(args.days),
                        entry_fee_minor: args.entry_fee,
                        prize_pool_minor: args.prize_pool,
                    },
                )
                .await?;
            println!(
                "created competition: {} ({}) invite code {}",
                competition.name, competition.id, competition.invite_code
            );
        }
    }

    Ok(())
}
