//! Federation Demo - federated queries over sample data sources
//!
//! Runs logical plans against the in-memory `sales` and `crm` sources
//! through the full optimize, convert and execute path.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package fedra-playground --bin federation-demo -- --help
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use common_config::FedraConfig;
use common_error::FedraResult;
use fedra_engine::QueryEngine;
use fedra_logical::{AggCall, LogicalPlan, PlanBuilder, SortKey, col, lit};

use fedra_playground::{
    CUSTOMER_COLUMNS, Federation, ORDER_COLUMNS, create_retail_federation, print_divider,
    print_header, print_results,
};

/// Federation demo CLI.
#[derive(Parser, Debug)]
#[command(name = "federation-demo")]
#[command(about = "Run federated queries against sample data sources")]
#[command(version)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Per-query intermediate result limit (0 = unlimited)
    #[arg(long, global = true)]
    row_limit: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the orders table
    Scan {
        /// Maximum results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Filter orders by amount
    Filter {
        /// Amount to compare against
        #[arg(short, long)]
        value: f64,

        /// Comparison operator (gt, lt, eq, ge, le)
        #[arg(short, long, default_value = "gt")]
        op: String,
    },

    /// Join orders with customers and total the amounts per customer
    Totals,

    /// Print the optimized and physical plans of the totals query
    Explain,

    /// Show the discovered catalog
    Catalog,

    /// Run all demo queries
    Demo,
}

#[tokio::main]
async fn main() -> FedraResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FedraConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => FedraConfig::default(),
    };
    if let Some(limit) = args.row_limit {
        config.execution.intermediate_result_limit = limit;
    }

    let federation = create_retail_federation().await?;
    let engine = QueryEngine::new(
        federation.registry.clone(),
        federation.connectors.clone(),
        &config,
    );

    match args.command {
        Commands::Scan { limit } => run_scan(&engine, limit).await,
        Commands::Filter { value, op } => run_filter(&engine, value, &op).await,
        Commands::Totals => run_query(&engine, "Customer totals", totals_plan()).await,
        Commands::Explain => {
            print_header("Customer totals plan");
            println!("{}", engine.explain(totals_plan())?);
            let optimized = engine.optimize(totals_plan())?;
            println!("Cost improved: {}", optimized.improved());
            print!("{}", optimized.format_trace());
            Ok(())
        }
        Commands::Catalog => {
            show_catalog(&federation);
            Ok(())
        }
        Commands::Demo => run_demo(&engine, &federation).await,
    }
}

fn orders() -> PlanBuilder {
    PlanBuilder::table("orders", ORDER_COLUMNS)
}

/// Total amount and order count per customer name, largest total first.
fn totals_plan() -> LogicalPlan {
    orders()
        .join(PlanBuilder::table("customers", CUSTOMER_COLUMNS), col(1).eq(col(4)))
        .aggregate(
            vec![5],
            vec![AggCall::sum(3, "total"), AggCall::count_star("orders")],
        )
        .sort(vec![SortKey::desc(1)])
        .build()
}

async fn run_scan(engine: &QueryEngine, limit: Option<usize>) -> FedraResult<()> {
    let mut plan = orders();
    if let Some(n) = limit {
        plan = plan.limit(0, Some(n));
    }
    run_query(engine, "Scanning orders", plan.build()).await
}

async fn run_filter(engine: &QueryEngine, value: f64, op: &str) -> FedraResult<()> {
    let amount = col(3);
    let predicate = match op {
        "gt" => amount.gt(lit(value)),
        "lt" => amount.lt(lit(value)),
        "eq" => amount.eq(lit(value)),
        "ge" | "gte" => amount.gt_eq(lit(value)),
        "le" | "lte" => amount.lt_eq(lit(value)),
        _ => {
            eprintln!("Unknown operator: {}. Using 'gt'", op);
            amount.gt(lit(value))
        }
    };
    let plan = orders().filter(predicate).build();
    run_query(engine, &format!("Orders where amount {} {}", op, value), plan).await
}

async fn run_query(engine: &QueryEngine, title: &str, plan: LogicalPlan) -> FedraResult<()> {
    print_header(title);
    let result = engine.execute(plan).await;
    print_results(&result);
    if let Some(metrics) = result.metrics() {
        print!("{}", metrics.format_analyze());
        println!(
            "Rows received from data sources: {} (operator time {:?})",
            metrics.remote_rows(),
            metrics.total_time()
        );
    }
    Ok(())
}

fn show_catalog(federation: &Federation) {
    print_header("Discovered catalog");
    for ds in federation.registry.list_data_sources() {
        println!("{} ({}): {:?}", ds.id, ds.name, ds.kind);
    }
    print_divider();
    for table in federation.registry.list_tables() {
        println!("{}", table);
    }
}

async fn run_demo(engine: &QueryEngine, federation: &Federation) -> FedraResult<()> {
    show_catalog(federation);

    println!("\n1. Top five orders by amount:");
    let top = orders()
        .sort(vec![SortKey::desc(3)])
        .limit(0, Some(5))
        .build();
    run_query(engine, "Top orders", top).await?;

    println!("\n2. Open orders:");
    let open = orders()
        .filter(col(2).eq(lit("open")))
        .project_columns(&[0, 3])
        .build();
    run_query(engine, "Open orders", open).await?;

    println!("\n3. Totals per customer across sources:");
    run_query(engine, "Customer totals", totals_plan()).await?;

    println!("\nQueries sent to data sources:");
    for (ds, sql) in federation.memory.issued_queries() {
        println!("  [{}] {}", ds, sql);
    }

    println!("\nDemo complete!");
    Ok(())
}
