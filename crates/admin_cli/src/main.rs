use std::error::Error;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{Category, Engine, ExpenseFilter, ExpenseInput, Money, YearMonth};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub username: String,
        pub telegram_id: Option<String>,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "expensemate_admin")]
#[command(about = "Admin utilities for ExpenseMate (users, expenses, budgets, badges)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./expensemate.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Expense(Expense),
    Budget(Budget),
    Badge(Badge),
    /// Run one of the scheduled jobs once.
    Sweep(Sweep),
    /// Clear budget alert flags (all months, or only `--month`).
    ResetAlerts {
        #[arg(long)]
        month: Option<YearMonth>,
    },
    /// Print a JSON report of a user's month.
    Report {
        user: String,
        #[arg(long)]
        month: Option<YearMonth>,
    },
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: u64,
    },
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
    #[arg(long)]
    telegram_id: Option<String>,
}

#[derive(Args, Debug)]
struct Expense {
    #[command(subcommand)]
    command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    Add(ExpenseAddArgs),
    Edit(ExpenseEditArgs),
    Delete {
        #[arg(long)]
        user: String,
        id: i64,
    },
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        month: Option<YearMonth>,
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        /// Case-insensitive substring of the description.
        #[arg(long)]
        search: Option<String>,
        /// Only expenses of the last N days. Ignores the other filters.
        #[arg(long, conflicts_with_all = ["month", "category", "search", "limit"])]
        recent: Option<u32>,
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct ExpenseAddArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    amount: Money,
    #[arg(long, value_parser = parse_category)]
    category: Category,
    /// Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct ExpenseEditArgs {
    #[arg(long)]
    user: String,
    id: i64,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    amount: Option<Money>,
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct Budget {
    #[command(subcommand)]
    command: BudgetCommand,
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    Set {
        #[arg(long)]
        user: String,
        #[arg(long)]
        month: Option<YearMonth>,
        #[arg(long)]
        amount: Money,
    },
    Show {
        #[arg(long)]
        user: String,
        #[arg(long)]
        month: Option<YearMonth>,
    },
    Recompute {
        #[arg(long)]
        user: String,
        #[arg(long)]
        month: Option<YearMonth>,
    },
}

#[derive(Args, Debug)]
struct Badge {
    #[command(subcommand)]
    command: BadgeCommand,
}

#[derive(Subcommand, Debug)]
enum BadgeCommand {
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        all: bool,
    },
    Revoke {
        #[arg(long)]
        user: String,
        id: i64,
    },
}

#[derive(Args, Debug)]
struct Sweep {
    #[command(subcommand)]
    command: SweepCommand,
}

#[derive(Subcommand, Debug)]
enum SweepCommand {
    Alerts,
    Badges,
    Daily,
}

fn parse_category(raw: &str) -> Result<Category, String> {
    Category::try_from(raw).map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter("engine=info,expensemate_admin=info")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;

    if let Command::User(User {
        command: UserCommand::Create(args),
    }) = &cli.command
    {
        if users::Entity::find_by_id(args.username.clone())
            .one(&db)
            .await?
            .is_some()
        {
            eprintln!("user already exists: {}", args.username);
            std::process::exit(1);
        }

        let user = users::ActiveModel {
            username: Set(args.username.clone()),
            telegram_id: Set(args.telegram_id.clone()),
            created_at: Set(Utc::now()),
        };
        users::Entity::insert(user).exec(&db).await?;

        println!("created user: {}", args.username);
        return Ok(());
    }

    let engine = Engine::builder().database(db).build().await?;
    let this_month = engine.clock().current_month();

    match cli.command {
        Command::User(_) => {}
        Command::Expense(Expense { command }) => match command {
            ExpenseCommand::Add(args) => {
                let input = ExpenseInput {
                    description: args.description,
                    amount: Some(args.amount),
                    category: Some(args.category),
                    date: Some(args.date.unwrap_or_else(|| engine.clock().today())),
                    notes: args.notes,
                };
                let expense = engine.create_expense(&args.user, input).await?;
                println!(
                    "created expense {}: {} {} ({})",
                    expense.id, expense.description, expense.amount, expense.category
                );
            }
            ExpenseCommand::Edit(args) => {
                let current = engine.expense(args.id, &args.user).await?;
                let input = ExpenseInput {
                    description: args.description.unwrap_or(current.description),
                    amount: Some(args.amount.unwrap_or(current.amount)),
                    category: Some(args.category.unwrap_or(current.category)),
                    date: Some(args.date.unwrap_or(current.date)),
                    notes: args.notes.or(current.notes),
                };
                let expense = engine.update_expense(args.id, &args.user, input).await?;
                println!("updated expense {}", expense.id);
            }
            ExpenseCommand::Delete { user, id } => {
                engine.delete_expense(id, &user).await?;
                println!("deleted expense {id}");
            }
            ExpenseCommand::List {
                user,
                month,
                category,
                search,
                recent,
                limit,
            } => {
                let expenses = match recent {
                    Some(days) => engine.recent_expenses(&user, days).await?,
                    None => {
                        let mut filter = month.map(ExpenseFilter::month).unwrap_or_default();
                        filter.category = category;
                        filter.search = search;
                        filter.limit = limit;
                        engine.list_expenses(&user, &filter).await?
                    }
                };
                for expense in expenses {
                    println!(
                        "{:>6}  {}  {:>10}  {:<14}  {}",
                        expense.id,
                        expense.date,
                        expense.amount,
                        expense.category.as_str(),
                        expense.description
                    );
                }
            }
        },
        Command::Budget(Budget { command }) => match command {
            BudgetCommand::Set {
                user,
                month,
                amount,
            } => {
                let budget = engine
                    .save_budget(&user, month.unwrap_or(this_month), amount)
                    .await?;
                println!(
                    "budget {} for {}: {} (spent {})",
                    budget.id, budget.period, budget.amount, budget.spent
                );
            }
            BudgetCommand::Show { user, month } => {
                let ym = month.unwrap_or(this_month);
                match engine.budget(&user, ym).await? {
                    Some(budget) => println!(
                        "{}: spent {} of {} ({:.1}%, {}), alerts 80={} 100={}",
                        budget.period,
                        budget.spent,
                        budget.amount,
                        budget.spent_percentage(),
                        budget.status().as_str(),
                        budget.alert80_sent,
                        budget.alert100_sent
                    ),
                    None => println!("no budget for {ym}"),
                }
            }
            BudgetCommand::Recompute { user, month } => {
                let budget = engine
                    .recompute_spent(&user, month.unwrap_or(this_month))
                    .await?;
                println!("{}: spent {}", budget.period, budget.spent);
            }
        },
        Command::Badge(Badge { command }) => match command {
            BadgeCommand::List { user, all } => {
                for badge in engine.badges(&user, !all).await? {
                    println!(
                        "{:>6}  {}  {:<18}  {}",
                        badge.id,
                        badge.earned_at.format("%Y-%m-%d"),
                        badge.badge_type.as_str(),
                        if badge.active { "active" } else { "revoked" }
                    );
                }
            }
            BadgeCommand::Revoke { user, id } => {
                engine.deactivate_badge(id, &user).await?;
                println!("revoked badge {id}");
            }
        },
        Command::Sweep(Sweep { command }) => match command {
            SweepCommand::Alerts => {
                let sweep = engine.process_pending_alerts().await?;
                println!("alerts sent: 80%={} 100%={}", sweep.sent80, sweep.sent100);
            }
            SweepCommand::Badges => {
                let sweep = engine.process_all_eligible_badges().await?;
                println!(
                    "eligible={} awarded={} failed={}",
                    sweep.eligible, sweep.awarded, sweep.failed
                );
            }
            SweepCommand::Daily => {
                let sweep = engine.process_daily_badges().await?;
                println!(
                    "eligible={} awarded={} failed={}",
                    sweep.eligible, sweep.awarded, sweep.failed
                );
            }
        },
        Command::ResetAlerts { month } => {
            let cleared = match month {
                Some(ym) => engine.reset_alert_flags_for(ym).await?,
                None => engine.reset_all_alert_flags().await?,
            };
            println!("reset alert flags on {cleared} budgets");
        }
        Command::Report { user, month } => {
            let ym = month.unwrap_or(this_month);
            let categories: serde_json::Map<String, serde_json::Value> = engine
                .category_spending(&user, ym)
                .await?
                .into_iter()
                .map(|(category, amount)| {
                    (category.as_str().to_string(), amount.to_string().into())
                })
                .collect();
            let daily: serde_json::Map<String, serde_json::Value> = engine
                .daily_breakdown_for(&user, ym)
                .await?
                .into_iter()
                .map(|(day, amount)| (day.to_string(), amount.to_string().into()))
                .collect();
            let trend: serde_json::Map<String, serde_json::Value> = engine
                .monthly_trend(&user)
                .await?
                .into_iter()
                .map(|(month, amount)| (month, amount.to_string().into()))
                .collect();
            let top: Vec<serde_json::Value> = engine
                .top_expenses(&user, Some(ym), 5)
                .await?
                .into_iter()
                .map(|expense| {
                    serde_json::json!({
                        "id": expense.id,
                        "date": expense.date.to_string(),
                        "description": expense.description,
                        "amount": expense.amount.to_string(),
                        "category": expense.category.as_str(),
                    })
                })
                .collect();
            let top_categories: Vec<serde_json::Value> = engine
                .top_spending_categories(&user, ym, 3)
                .await?
                .into_iter()
                .map(|(category, amount)| {
                    serde_json::json!({
                        "category": category.as_str(),
                        "amount": amount.to_string(),
                    })
                })
                .collect();
            let usage: serde_json::Map<String, serde_json::Value> = engine
                .category_usage(&user)
                .await?
                .into_iter()
                .map(|(category, count)| (category.as_str().to_string(), count.into()))
                .collect();
            let stats = engine.expense_stats(&user).await?;
            let budget = engine.budget(&user, ym).await?.map(|budget| {
                serde_json::json!({
                    "amount": budget.amount.to_string(),
                    "spent": budget.spent.to_string(),
                    "remaining": budget.remaining().to_string(),
                    "percentage": budget.spent_percentage(),
                    "status": budget.status().as_str(),
                })
            });

            print_json(&serde_json::json!({
                "user": user,
                "month": ym.to_string(),
                "total": engine.monthly_total(&user, ym).await?.to_string(),
                "average_daily": engine.average_daily_spending(&user, ym).await?.to_string(),
                "budget": budget,
                "categories": categories,
                "top_categories": top_categories,
                "category_usage": usage,
                "daily": daily,
                "trend": trend,
                "top_expenses": top,
                "streak_days": engine.current_streak(&user).await?,
                "expense_stats": {
                    "total_count": stats.total_count,
                    "current_month_count": stats.current_month_count,
                    "total_amount": stats.total_amount.to_string(),
                    "current_month_total": stats.current_month_total.to_string(),
                    "average_daily": stats.average_daily.to_string(),
                    "top_category": stats.top_category.map(Category::as_str),
                },
                "budget_stats": serde_json::to_value(engine.budget_stats(&user).await?)?,
                "badges": serde_json::to_value(engine.badge_summary(&user).await?)?,
            }))?;
        }
        Command::Leaderboard { limit } => {
            for entry in engine.leaderboard(limit).await? {
                println!(
                    "{:>3}. {:<20} {:>5} pts  {}",
                    entry.rank,
                    entry.user_id,
                    entry.points,
                    entry.level.as_str()
                );
            }
        }
    }

    Ok(())
}
