/// CLI: пакетная трансформация train/test, применение артефакта и API сервер

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use student_prep::{artifact, data, load_config, server, DataTransformation};

#[derive(Parser, Debug)]
#[command(name = "student-prep", version, about, long_about = None)]
struct Cli {
    /// Путь к файлу конфигурации (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Обучить препроцессор на train, применить к train и test, сохранить артефакт
    Run {
        #[arg(long)]
        train: PathBuf,
        #[arg(long)]
        test: PathBuf,
        /// Каталог для преобразованных массивов (train.csv, test.csv)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Применить сохранённый препроцессор к CSV
    Transform {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Запустить HTTP API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Run {
            train,
            test,
            output_dir,
        } => {
            let target_name = config.columns.target.clone();
            let output = DataTransformation::new(config)
                .initiate_data_transformation(&train, &test)
                .context("data transformation failed")?;

            if let Some(dir) = output_dir {
                let mut header = output.feature_names.clone();
                header.push(target_name);
                data::write_csv(dir.join("train.csv"), &header, &output.train)?;
                data::write_csv(dir.join("test.csv"), &header, &output.test)?;
                tracing::info!(dir = %dir.display(), "Transformed arrays written");
            }

            println!(
                "train: {:?}, test: {:?}, preprocessor: {}",
                output.train.shape(),
                output.test.shape(),
                output.preprocessor_path.display()
            );
        }
        Command::Transform { input, output } => {
            let preprocessor = artifact::load_preprocessor(&config.artifacts.preprocessor_path)
                .context("failed to load preprocessor")?;
            let table = data::read_csv(&input)?;
            let matrix = preprocessor.transform(&table)?;
            data::write_csv(&output, &preprocessor.feature_names_out()?, &matrix)?;
            tracing::info!(
                rows = matrix.nrows(),
                output = %output.display(),
                "Transformed features written"
            );
        }
        Command::Serve { port } => {
            let state = server::AppState::load(config.artifacts.preprocessor_path.clone());
            let app = server::router(state);

            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", config.server.host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {}", addr))?;
            tracing::info!("Server listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
