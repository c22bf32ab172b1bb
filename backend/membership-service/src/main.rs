use anyhow::{bail, Context};
use entity_ordering::{
    EntityOrderingService, ManualJobScheduler, OrderingJobService, OrderingMetrics, PgUnitOfWork,
    ReorderItem,
};
use membership_service::{db, Article, ArticlePlacement, ArticleService, Config, NewArticle};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  membership-service list");
    eprintln!("  membership-service create <title> [first|last|<position>]");
    eprintln!("  membership-service delete <id>");
    eprintln!("  membership-service reorder <id>=<position> [<id>=<position> ...]");
    eprintln!("  membership-service validate-order");
    eprintln!("  membership-service check-order");
    std::process::exit(1);
}

fn parse_reorder_item(arg: &str) -> anyhow::Result<ReorderItem> {
    let (id, position) = arg
        .split_once('=')
        .with_context(|| format!("expected <id>=<position>, got '{}'", arg))?;
    let position = position
        .parse()
        .with_context(|| format!("invalid position in '{}'", arg))?;
    Ok(ReorderItem::new(id, position))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(anyhow::Error::msg)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.app.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    info!(env = %config.app.env, database = ?config.database, "Starting membership-service");
    config.ordering.log_config();

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let ordering = Arc::new(
        EntityOrderingService::<Article, _>::with_config(
            PgUnitOfWork::from_config(pool.clone(), &config.ordering),
            config.ordering.clone(),
        )
        .with_metrics(OrderingMetrics::new()),
    );
    // Jobs run before the process exits instead of on detached tasks.
    let scheduler = Arc::new(ManualJobScheduler::new());
    let jobs = OrderingJobService::new(ordering, scheduler.clone());
    let articles = ArticleService::new(pool, jobs);

    match (args[1].as_str(), &args[2..]) {
        ("list", []) => {
            for article in articles.list_articles().await? {
                println!("{:>4}  {}  {}", article.display_order, article.id, article.title);
            }
        }
        ("create", [title, rest @ ..]) if rest.len() <= 1 => {
            let placement = match rest.first() {
                Some(raw) => raw.parse::<ArticlePlacement>().map_err(anyhow::Error::msg)?,
                None => ArticlePlacement::Last,
            };
            let article = articles
                .create_article(NewArticle::new(title.as_str()), placement)
                .await?;
            println!("Created {} at position {}", article.id, article.display_order);
        }
        ("delete", [id]) => {
            let job_id = articles.delete_article(id).await?;
            println!("Deleted {} (reorder job {})", id, job_id);
        }
        ("reorder", items) if !items.is_empty() => {
            let items = items
                .iter()
                .map(String::as_str)
                .map(parse_reorder_item)
                .collect::<anyhow::Result<Vec<_>>>()?;
            let job_id = articles.reorder_articles(items);
            println!("Scheduled reorder job {}", job_id);
        }
        ("validate-order", []) => {
            let job_id = articles.repair_order();
            println!("Scheduled validate-and-fix job {}", job_id);
        }
        ("check-order", []) => {
            let report = articles.check_order().await?;
            println!("{} articles, {} out of place", report.total, report.misplaced);
            if !report.is_contiguous() {
                bail!("display order is not contiguous; run validate-order");
            }
        }
        _ => usage(),
    }

    let ran = scheduler.run_pending().await;
    if ran > 0 {
        info!(jobs = ran, "Background ordering jobs finished");
    }

    Ok(())
}
