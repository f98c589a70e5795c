use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, EngineError, UserId};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, DbErr};

#[derive(Parser, Debug)]
#[command(name = "billsplit_admin")]
#[command(about = "Admin utilities for BillSplit (bootstrap users/groups)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./billsplit.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Group(Group),
    /// Apply or inspect schema migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Roll back the last applied migration.
    Down,
    /// Drop all tables and apply every migration again.
    Fresh,
    /// List applied and pending migrations.
    Status,
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Group {
    #[command(subcommand)]
    command: GroupCommand,
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    Create(GroupCreateArgs),
}

#[derive(Args, Debug)]
struct GroupCreateArgs {
    /// Username of the owner.
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    /// Username of a member; repeat for several members.
    #[arg(long = "member")]
    members: Vec<String>,
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

const PASSWORD_ATTEMPTS: usize = 3;

fn notice(out: &mut impl Write, message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(message),
        Print("\r\n")
    )?;
    Ok(())
}

/// Asks for a new password until two entries match.
fn read_new_password(username: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..PASSWORD_ATTEMPTS {
        let first = prompt_password(&format!("Password for {username}: "))?;
        if first.trim().is_empty() {
            notice(&mut out, "Password must not be blank.")?;
            continue;
        }

        if prompt_password("Repeat password: ")? == first {
            return Ok(first);
        }
        notice(&mut out, "Passwords differ, try again.")?;
    }

    Err(format!("no password set for {username}").into())
}

async fn migrate(db: &DatabaseConnection, command: MigrateCommand) -> Result<(), DbErr> {
    match command {
        MigrateCommand::Up => Migrator::up(db, None).await,
        MigrateCommand::Down => Migrator::down(db, Some(1)).await,
        MigrateCommand::Fresh => Migrator::fresh(db).await,
        MigrateCommand::Status => Migrator::status(db).await,
    }
}

/// Brings the schema up to date and builds the engine on top of it.
async fn open_engine(db: DatabaseConnection) -> Result<Engine, Box<dyn Error + Send + Sync>> {
    Migrator::up(&db, None).await?;
    Ok(Engine::builder().database(db).build().await?)
}

/// Resolves a username, exiting with a message when it is unknown.
async fn user_id(engine: &Engine, username: &str) -> Result<UserId, Box<dyn Error + Send + Sync>> {
    match engine.user_by_username(username).await {
        Ok(user) => Ok(user.id),
        Err(EngineError::KeyNotFound(_)) => {
            eprintln!("user not found: {username}");
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = Database::connect(&cli.database_url).await?;

    match cli.command {
        Command::Migrate(command) => {
            migrate(&db, command).await?;
            if command != MigrateCommand::Status {
                println!("migrate {command:?}: done");
            }
        }
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let engine = open_engine(db).await?;
            let password = read_new_password(args.username.trim())?;

            match engine.create_user(&args.username, &password).await {
                Ok(user) => println!("created user: {} ({})", user.username, user.id),
                Err(EngineError::ExistingKey(username)) => {
                    eprintln!("user already exists: {username}");
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Group(Group {
            command: GroupCommand::Create(args),
        }) => {
            let engine = open_engine(db).await?;
            let owner = user_id(&engine, &args.owner).await?;
            let mut members = Vec::with_capacity(args.members.len());
            for username in &args.members {
                members.push(user_id(&engine, username).await?);
            }

            let group = engine
                .new_group(&owner, &args.name, args.description.as_deref(), &members)
                .await?;
            println!(
                "created group: {} ({}) with {} members",
                group.name,
                group.id,
                group.members.len()
            );
        }
    }

    Ok(())
}
