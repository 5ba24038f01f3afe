//! mddb - Read-only and administrative access to the market data database.

mod cli;

use cli::{Cli, Command};
use mddb::{Admin, Config, Reader, Result, Role};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // PG* variables may come from a .env file
    dotenvy::dotenv().ok();
    mddb::logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let role = cli.role();
    let credentials = cli.resolve_credentials(&config, role)?;
    info!("Connection ({role}): {}", credentials.display_string());

    match &cli.command {
        Command::Query {
            statement,
            params,
            format,
            ..
        } => {
            let params = cli::to_params(params);
            let result = match role {
                Role::Reader => {
                    Reader::new(credentials)
                        .query(statement, None, &params)
                        .await?
                }
                Role::Admin => Admin::new(credentials).query(statement, None, &params).await?,
            };
            info!("{} rows in {:?}", result.row_count, result.execution_time);
            println!("{}", cli::render(&result, *format)?);
        }
        Command::RunSqlFile { path } => {
            Admin::new(credentials).run_sql_file(path, None).await?;
            info!("Committed {}", path.display());
        }
    }

    Ok(())
}
