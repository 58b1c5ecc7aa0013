use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use migration::{Migrator, MigratorTrait};
use platform_api::{normalize_email, validate_display_name};
use platform_db::{DatabaseSettings, DbPool, NewUser, connect};
use platform_obs::{ObsConfig, init_tracing};
use server::{
    AppConfig, AppState,
    graphql::schema_sdl,
    http::{self, ServeConfig},
    session::hash_password,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "console-server", version, about = "Admin console server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Run database migrations.
    Migrate {
        #[arg(value_enum, default_value_t = MigrateAction::Up)]
        action: MigrateAction,
    },
    /// Create an administrator, or promote an existing account.
    Seed(SeedCommand),
    /// Print the GraphQL schema.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MigrateAction {
    /// Apply pending migrations.
    Up,
    /// Roll back the most recent migration.
    Down,
    /// Roll back everything and reapply.
    Reset,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

#[derive(Args, Debug)]
struct SeedCommand {
    #[arg(long, env = "SEED_ADMIN_EMAIL")]
    email: String,
    #[arg(long, env = "SEED_ADMIN_PASSWORD")]
    password: String,
    #[arg(long, default_value = "Administrator")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env("console-server"))?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Migrate { action } => migrate(action).await,
        Command::Seed(cmd) => run_seed(cmd).await,
        Command::SchemaPrint { output } => schema_print(output),
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let config = Arc::new(AppConfig::load()?);
    info!(?config, "configuration loaded");
    let pool = setup_pool().await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let state = AppState::new(pool, config);
    http::serve(ServeConfig::from(cmd.bind), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        bail!(
            "{} pending migrations; run `console-server migrate up` or pass --allow-dirty",
            pending.len()
        );
    }
    Ok(())
}

async fn migrate(action: MigrateAction) -> Result<()> {
    let pool = setup_pool().await?;
    match action {
        MigrateAction::Up => {
            Migrator::up(&pool, None).await?;
            info!("database migrations applied");
        }
        MigrateAction::Down => {
            Migrator::down(&pool, Some(1)).await?;
            info!("most recent migration rolled back");
        }
        MigrateAction::Reset => {
            Migrator::refresh(&pool).await?;
            info!("database reset");
        }
    }
    Ok(())
}

async fn run_seed(cmd: SeedCommand) -> Result<()> {
    let email = normalize_email(&cmd.email)?;
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;

    if let Some(existing) = platform_db::find_user_by_email(&pool, &email).await? {
        if !existing.system_admin {
            platform_db::set_system_admin(&pool, existing.id, true).await?;
        }
        info!(user = %existing.id, "existing account is an administrator");
        return Ok(());
    }

    let password_hash = hash_password(&cmd.password)
        .map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))?;
    let user = platform_db::insert_user(
        &pool,
        NewUser {
            email,
            display_name: validate_display_name(&cmd.name)?,
            system_admin: true,
            password_hash: Some(password_hash),
        },
    )
    .await?;
    info!(user = %user.id, "administrator created");
    Ok(())
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let sdl = schema_sdl();
    match path {
        Some(path) => {
            std::fs::write(&path, sdl)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "schema written");
        }
        None => println!("{sdl}"),
    }
    Ok(())
}
